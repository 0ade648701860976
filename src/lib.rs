// Hi-Z Visibility - Data-Oriented Programming (DOP) Architecture
//
// GPU depth visibility renderer with five interchangeable modes: wireframe,
// naive Z-buffer, scanline Z-buffer, and two hierarchical Z-buffer variants.
// - Data lives in *_data modules (no methods)
// - Transformations live in *_operations modules (pure functions)
// - The host reference model mirrors every GPU kernel for testing

// Constants module
pub mod constants;

// Core modules
pub mod error;

// Collaborators
pub mod camera;
pub mod config;
pub mod geometry;

// GPU and visibility systems
pub mod gpu;
pub mod visibility;

// Host reference model
pub mod reference;

// Window and input
pub mod viewer;

pub use camera::CameraData;
pub use config::{load_config, ViewerConfig};
pub use error::{ErrorContext, VisibilityError, VisibilityResult};
pub use geometry::{build_scene, MeshData, SceneKind, AABB};
pub use viewer::run_viewer;
pub use visibility::{
    create_orchestrator, load_mesh, read_frame_stats, record_frame, render_frame, resize,
    FrameOrchestrator, FrameStats, RenderMode,
};

// Re-export wgpu for callers that render into their own targets
pub use wgpu;
