//! GPU plumbing: device setup, error monitoring, shader assembly,
//! binding helpers and readback.

pub mod binding;
pub mod context;
pub mod error_recovery;
pub mod readback;
pub mod shader;

pub use binding::{create_buffer_bind_group, div_ceil, linear_dispatch, storage_entry, uniform_entry};
pub use context::{create_instance, request_context, request_headless_context, GpuContext};
pub use error_recovery::GpuErrorMonitor;
pub use readback::{read_buffer_words, read_texture_rgba8};
pub use shader::{create_validated_shader, ShaderModuleDesc};
