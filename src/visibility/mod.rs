//! Visibility renderer
//!
//! Five interchangeable ways of resolving which surface is nearest per
//! pixel, sharing one geometry store, one depth pyramid and one frame
//! orchestrator:
//! - wireframe: edges only, no visibility
//! - naive Z: atomic-min depth buffer in two passes
//! - scanline: per-row spans resolved under per-pixel spinlocks
//! - naive Hi-Z: Z-prepass, depth pyramid, one test per triangle
//! - optimized Hi-Z: the same pyramid tested against a loose octree

pub mod depth_pyramid_data;
pub mod depth_pyramid_operations;
pub mod frame_plan;
pub mod gpu_types;
pub mod hiz_data;
pub mod hiz_operations;
pub mod octree_data;
pub mod octree_operations;
pub mod orchestrator_data;
pub mod orchestrator_operations;
pub mod pipeline_data;
pub mod pipeline_operations;
pub mod render_mode;
pub mod scanline_data;
pub mod scanline_operations;
pub mod shading;
pub mod stats;

pub use frame_plan::{build_frame_plan, FramePlan, PhaseWork};
pub use orchestrator_data::FrameOrchestrator;
pub use orchestrator_operations::{
    create_orchestrator, load_mesh, record_frame, render_frame, resize,
};
pub use render_mode::RenderMode;
pub use stats::{read_frame_stats, FrameStats, FrameTimer};
