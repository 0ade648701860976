//! Viewer operations
//!
//! Window, surface and input plumbing around the frame orchestrator.
//! Surface loss and timeouts are handled here; anything else that fails
//! ends the event loop and is returned from `run_viewer`.

use super::viewer_data::{DragState, ViewerCommand, ViewerState};
use crate::camera::{
    build_view_projection, init_camera_for_bounds, orbit_camera, refit_camera, update_aspect_ratio,
    zoom_camera,
};
use crate::config::ViewerConfig;
use crate::error::{VisibilityError, VisibilityResult};
use crate::geometry::{build_scene, reseed_scene, triangle_count};
use crate::gpu::{create_instance, request_context};
use crate::visibility::{
    create_orchestrator, load_mesh, read_frame_stats, render_frame, resize, FrameTimer, RenderMode,
};
use cgmath::Vector3;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

const TITLE_INTERVAL: Duration = Duration::from_secs(1);
const TIMER_WINDOW: usize = 120;
const PIXELS_PER_NOTCH: f32 = 40.0;

// ============================================================================
// PURE HELPERS
// ============================================================================

pub fn command_for_key(key: KeyCode) -> Option<ViewerCommand> {
    let select = |index| RenderMode::from_index(index).map(ViewerCommand::SelectMode);
    match key {
        KeyCode::Digit1 | KeyCode::Numpad1 => select(0),
        KeyCode::Digit2 | KeyCode::Numpad2 => select(1),
        KeyCode::Digit3 | KeyCode::Numpad3 => select(2),
        KeyCode::Digit4 | KeyCode::Numpad4 => select(3),
        KeyCode::Digit5 | KeyCode::Numpad5 => select(4),
        KeyCode::Tab => Some(ViewerCommand::CycleMode),
        KeyCode::KeyR => Some(ViewerCommand::Reseed),
        KeyCode::KeyS => Some(ViewerCommand::PrintStats),
        KeyCode::Escape => Some(ViewerCommand::Quit),
        _ => None,
    }
}

pub fn window_title(width: u32, height: u32, fps: f32, mode: RenderMode) -> String {
    format!("{}x{} | {:.1} FPS | {}", width, height, fps, mode.display_name())
}

/// Wheel delta in notches, positive toward the target
pub fn scroll_notches(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_NOTCH,
    }
}

/// Cursor movement since the last event while dragging
pub fn drag_delta(drag: &DragState, cursor: (f64, f64)) -> Option<(f32, f32)> {
    if !drag.active {
        return None;
    }
    drag.last_cursor
        .map(|(x, y)| ((cursor.0 - x) as f32, (cursor.1 - y) as f32))
}

/// Linear format preferred so the packed colours reach the screen unchanged
pub fn select_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first().copied())
}

fn select_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

// ============================================================================
// SETUP
// ============================================================================

fn create_viewer_state(
    window: Arc<winit::window::Window>,
    config: ViewerConfig,
) -> VisibilityResult<ViewerState> {
    let instance = create_instance();
    let surface = instance.create_surface(window.clone())?;
    let context = pollster::block_on(request_context(instance, Some(&surface)))?;

    let capabilities = surface.get_capabilities(&context.adapter);
    let format =
        select_surface_format(&capabilities.formats).ok_or(VisibilityError::SurfaceUnsupported)?;
    let size = window.inner_size();
    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: select_present_mode(&capabilities.present_modes, config.vsync),
        alpha_mode: capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&context.device, &surface_config);
    log::info!(
        "[Viewer] Surface {:?} {}x{} ({:?})",
        format,
        surface_config.width,
        surface_config.height,
        surface_config.present_mode
    );

    let mut orchestrator = create_orchestrator(
        &context,
        format,
        surface_config.width,
        surface_config.height,
        Vector3::from(config.light_direction),
    )?;

    let mesh = build_scene(&config.scene)?;
    load_mesh(&mut orchestrator, &mesh);
    let camera = init_camera_for_bounds(
        &mesh.bounds,
        surface_config.width as f32 / surface_config.height as f32,
    );

    Ok(ViewerState {
        mode: config.mode,
        scene: config.scene,
        config,
        window,
        context,
        surface,
        surface_config,
        orchestrator,
        camera,
        drag: DragState::default(),
        paused: size.width == 0 || size.height == 0,
        timer: FrameTimer::new(TIMER_WINDOW),
        last_title_update: Instant::now(),
    })
}

// ============================================================================
// EVENTS
// ============================================================================

fn reconfigure_surface(state: &ViewerState) {
    state
        .surface
        .configure(&state.context.device, &state.surface_config);
}

fn resize_viewer(state: &mut ViewerState, size: PhysicalSize<u32>) {
    if size.width == 0 || size.height == 0 {
        if !state.paused {
            log::info!("[Viewer] Window minimized, rendering paused");
        }
        state.paused = true;
        return;
    }

    state.paused = false;
    state.surface_config.width = size.width;
    state.surface_config.height = size.height;
    reconfigure_surface(state);
    resize(&mut state.orchestrator, size.width, size.height);
    state.camera = update_aspect_ratio(&state.camera, size.width, size.height);
}

fn log_frame_stats(state: &ViewerState) -> VisibilityResult<()> {
    let Some(stats) = read_frame_stats(&state.orchestrator, state.mode)? else {
        log::info!("[Viewer] No mesh loaded");
        return Ok(());
    };

    log::info!(
        "[Viewer] {} | {} triangles | {:.2} ms ({:.1} FPS)",
        stats.mode.display_name(),
        stats.triangle_count,
        state.timer.average_frame_time().as_secs_f64() * 1000.0,
        state.timer.fps()
    );
    match stats.mode {
        RenderMode::Scanline => log::info!(
            "[Viewer] Spans: {} of {} capacity, {} dropped",
            stats.span_count,
            stats.span_capacity,
            stats.spans_dropped
        ),
        RenderMode::NaiveHiZ | RenderMode::OptimHiZ => {
            log::info!(
                "[Viewer] Hi-Z survivors: {} emitted, {} culled",
                stats.emitted_triangles,
                stats.culled_triangles()
            );
            if stats.mode == RenderMode::OptimHiZ {
                log::info!(
                    "[Viewer] Octree: {} faces allocated, {} dropped, per level {:?}",
                    stats.octree_allocated,
                    stats.octree_dropped,
                    stats.octree_per_level
                );
            }
        }
        RenderMode::Wireframe | RenderMode::NaiveZ => {}
    }
    Ok(())
}

/// Apply a command; `Ok(false)` ends the event loop
fn apply_command(state: &mut ViewerState, command: ViewerCommand) -> VisibilityResult<bool> {
    match command {
        ViewerCommand::SelectMode(mode) => state.mode = mode,
        ViewerCommand::CycleMode => state.mode = state.mode.next(),
        ViewerCommand::Reseed => {
            state.scene = reseed_scene(&state.scene);
            let mesh = build_scene(&state.scene)?;
            load_mesh(&mut state.orchestrator, &mesh);
            state.camera = refit_camera(&state.camera, &mesh.bounds);
            log::info!(
                "[Viewer] Regenerated {:?} ({} triangles)",
                state.scene,
                triangle_count(&mesh)
            );
        }
        ViewerCommand::PrintStats => log_frame_stats(state)?,
        ViewerCommand::Quit => return Ok(false),
    }

    if matches!(command, ViewerCommand::SelectMode(_) | ViewerCommand::CycleMode) {
        log::info!("[Viewer] Mode: {}", state.mode.display_name());
    }
    Ok(true)
}

fn redraw(state: &mut ViewerState) -> VisibilityResult<()> {
    if state.paused {
        return Ok(());
    }

    let frame = match state.surface.get_current_texture() {
        Ok(frame) => frame,
        Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
            log::debug!("[Viewer] Surface outdated, reconfiguring");
            reconfigure_surface(state);
            return Ok(());
        }
        Err(wgpu::SurfaceError::Timeout) => {
            log::warn!("[Viewer] Surface timeout, skipping frame");
            return Ok(());
        }
        Err(wgpu::SurfaceError::OutOfMemory) => {
            log::error!("[Viewer] Surface out of memory");
            return Err(VisibilityError::GpuFatal {
                message: "surface out of memory".to_string(),
            });
        }
    };

    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    render_frame(
        &mut state.orchestrator,
        &view,
        state.mode,
        build_view_projection(&state.camera),
    )?;

    let suboptimal = frame.suboptimal;
    frame.present();
    if suboptimal {
        reconfigure_surface(state);
    }

    state.timer.tick();
    let interval = state.config.stats_interval as u64;
    if interval > 0 && state.orchestrator.frame_count % interval == 0 {
        log_frame_stats(state)?;
    }
    if state.last_title_update.elapsed() >= TITLE_INTERVAL {
        state.window.set_title(&window_title(
            state.surface_config.width,
            state.surface_config.height,
            state.timer.fps(),
            state.mode,
        ));
        state.last_title_update = Instant::now();
    }
    Ok(())
}

fn handle_window_event(
    state: &mut ViewerState,
    event: WindowEvent,
    target: &EventLoopWindowTarget<()>,
) -> VisibilityResult<()> {
    match event {
        WindowEvent::CloseRequested => target.exit(),
        WindowEvent::Resized(size) => resize_viewer(state, size),
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(key),
                    state: ElementState::Pressed,
                    repeat: false,
                    ..
                },
            ..
        } => {
            if let Some(command) = command_for_key(key) {
                if !apply_command(state, command)? {
                    target.exit();
                }
            }
        }
        WindowEvent::MouseInput {
            state: button_state,
            button: MouseButton::Left,
            ..
        } => {
            state.drag.active = button_state == ElementState::Pressed;
        }
        WindowEvent::CursorMoved { position, .. } => {
            let cursor = (position.x, position.y);
            if let Some((dx, dy)) = drag_delta(&state.drag, cursor) {
                state.camera = orbit_camera(&state.camera, dx, dy);
            }
            state.drag.last_cursor = Some(cursor);
        }
        WindowEvent::MouseWheel { delta, .. } => {
            state.camera = zoom_camera(&state.camera, scroll_notches(delta));
        }
        WindowEvent::RedrawRequested => redraw(state)?,
        _ => {}
    }
    Ok(())
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Open the window and run until it is closed or a fatal error occurs
pub fn run_viewer(config: ViewerConfig) -> VisibilityResult<()> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(window_title(config.width, config.height, 0.0, config.mode))
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)?,
    );

    let mut state = create_viewer_state(window, config)?;
    let mut fatal: Option<VisibilityError> = None;
    log::info!("[Viewer] Starting in {}", state.mode.display_name());

    event_loop.run(|event, target| {
        target.set_control_flow(ControlFlow::Poll);
        let result = match event {
            Event::WindowEvent { event, .. } => handle_window_event(&mut state, event, target),
            Event::AboutToWait => {
                state.window.request_redraw();
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(error) = result {
            log::error!("[Viewer] Fatal: {}", error);
            fatal = Some(error);
            target.exit();
        }
    })?;

    match fatal {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_number_keys_select_modes() {
        assert_eq!(
            command_for_key(KeyCode::Digit1),
            Some(ViewerCommand::SelectMode(RenderMode::Wireframe))
        );
        assert_eq!(
            command_for_key(KeyCode::Digit5),
            Some(ViewerCommand::SelectMode(RenderMode::OptimHiZ))
        );
        assert_eq!(command_for_key(KeyCode::Tab), Some(ViewerCommand::CycleMode));
        assert_eq!(command_for_key(KeyCode::Escape), Some(ViewerCommand::Quit));
        assert_eq!(command_for_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_title_format() {
        assert_eq!(
            window_title(800, 600, 59.94, RenderMode::Scanline),
            "800x600 | 59.9 FPS | scanline Z-Buffer"
        );
    }

    #[test]
    fn test_drag_delta_needs_active_drag() {
        let mut drag = DragState::default();
        assert_eq!(drag_delta(&drag, (10.0, 10.0)), None);

        drag.active = true;
        assert_eq!(drag_delta(&drag, (10.0, 10.0)), None);
        drag.last_cursor = Some((4.0, 12.0));
        assert_eq!(drag_delta(&drag, (10.0, 10.0)), Some((6.0, -2.0)));
    }

    #[test]
    fn test_scroll_notches() {
        assert_eq!(scroll_notches(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0));
        assert_eq!(scroll_notches(pixels), 2.0);
    }

    #[test]
    fn test_surface_format_prefers_linear() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(select_surface_format(&formats), Some(wgpu::TextureFormat::Bgra8Unorm));
        assert_eq!(
            select_surface_format(&[wgpu::TextureFormat::Rgba8UnormSrgb]),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(select_surface_format(&[]), None);
    }

    #[test]
    fn test_present_mode_fallback() {
        assert_eq!(
            select_present_mode(&[wgpu::PresentMode::Fifo], false),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            select_present_mode(&[wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox], false),
            wgpu::PresentMode::Mailbox
        );
        assert_eq!(
            select_present_mode(&[wgpu::PresentMode::Mailbox], true),
            wgpu::PresentMode::Fifo
        );
    }
}
