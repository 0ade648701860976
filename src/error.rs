//! Error handling for the visibility renderer
//!
//! Resource-creation and device failures are fatal and bubble up to the
//! binary. Capacity overflow is never an error (see `FrameStats`), and
//! transient surface conditions are handled inside the viewer loop.

use std::path::PathBuf;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum VisibilityError {
    #[error("No compatible GPU adapter found")]
    AdapterNotFound,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("Surface is not supported by the selected adapter")]
    SurfaceUnsupported,

    #[error("Shader '{label}' failed validation: {message}")]
    ShaderValidation { label: String, message: String },

    #[error("Fatal GPU error: {message}")]
    GpuFatal { message: String },

    #[error("Buffer mapping failed for {buffer}: {message}")]
    BufferMapping { buffer: String, message: String },

    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid mesh: {reason}")]
    InvalidMesh { reason: String },

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Window creation failed: {0}")]
    WindowCreation(#[from] winit::error::OsError),
}

/// Result type for fallible renderer operations
pub type VisibilityResult<T> = Result<T, VisibilityError>;

/// Attach a component label to foreign errors, turning them into fatal GPU errors
pub trait ErrorContext<T> {
    fn gpu_context(self, context: &str) -> VisibilityResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn gpu_context(self, context: &str) -> VisibilityResult<T> {
        self.map_err(|e| VisibilityError::GpuFatal {
            message: format!("{}: {}", context, e),
        })
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn gpu_context(self, context: &str) -> VisibilityResult<T> {
        self.ok_or_else(|| VisibilityError::GpuFatal {
            message: context.to_string(),
        })
    }
}

/// Create an invalid mesh error
pub fn invalid_mesh(reason: impl Into<String>) -> VisibilityError {
    VisibilityError::InvalidMesh {
        reason: reason.into(),
    }
}
