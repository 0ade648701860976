//! Viewer data structures - Pure DOP
//!
//! NO METHODS. Just data.

use crate::camera::CameraData;
use crate::config::ViewerConfig;
use crate::geometry::SceneKind;
use crate::gpu::GpuContext;
use crate::visibility::{FrameOrchestrator, FrameTimer, RenderMode};
use std::sync::Arc;
use std::time::Instant;

/// What a key press asks the viewer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    SelectMode(RenderMode),
    CycleMode,
    Reseed,
    PrintStats,
    Quit,
}

/// Left-button orbit drag
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    pub active: bool,
    pub last_cursor: Option<(f64, f64)>,
}

pub struct ViewerState {
    pub config: ViewerConfig,
    pub window: Arc<winit::window::Window>,

    pub context: GpuContext,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,

    pub orchestrator: FrameOrchestrator,
    pub camera: CameraData,
    pub mode: RenderMode,
    pub scene: SceneKind,

    pub drag: DragState,
    /// Zero-sized window; nothing is rendered until the next non-zero resize
    pub paused: bool,

    pub timer: FrameTimer,
    pub last_title_update: Instant,
}
