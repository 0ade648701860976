//! Interactive viewer
//!
//! winit window around the frame orchestrator: orbit camera, mode keys,
//! scene regeneration and the FPS title.

pub mod viewer_data;
pub mod viewer_operations;

pub use viewer_data::{DragState, ViewerCommand, ViewerState};
pub use viewer_operations::{command_for_key, run_viewer, window_title};
