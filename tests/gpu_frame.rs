//! End-to-end frames on a real device
//!
//! Without an adapter every test logs an error and returns early. Set
//! `HIZ_REQUIRE_GPU=1` to turn a missing adapter into a failure instead;
//! shader validation itself is covered device-free in `gpu::shader`.

use cgmath::Vector3;
use hiz_visibility::geometry::{build_scene, triangle_positions, unit_face_normal, SceneKind};
use hiz_visibility::gpu::{read_buffer_words, read_texture_rgba8, request_headless_context, GpuContext};
use hiz_visibility::reference::front_screen;
use hiz_visibility::visibility::shading::{pack_rgba8, shade_normal, unpack_rgba8};
use hiz_visibility::{
    create_orchestrator, load_mesh, read_frame_stats, render_frame, resize, FrameOrchestrator,
    RenderMode,
};

const REQUIRE_GPU: &str = "HIZ_REQUIRE_GPU";

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const DEPTH_MODES: [RenderMode; 4] = [
    RenderMode::NaiveZ,
    RenderMode::Scanline,
    RenderMode::NaiveHiZ,
    RenderMode::OptimHiZ,
];

fn light() -> Vector3<f32> {
    Vector3::new(-0.6, 0.3, 1.0)
}

fn context() -> Option<GpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match request_headless_context() {
        Ok(context) => Some(context),
        Err(e) if std::env::var_os(REQUIRE_GPU).is_some() => {
            panic!("[Test] {} is set but no device is available: {}", REQUIRE_GPU, e)
        }
        Err(e) => {
            log::error!("[Test] SKIPPED, nothing was rendered: {} (set {} to fail instead)", e, REQUIRE_GPU);
            None
        }
    }
}

fn create_target(context: &GpuContext, width: u32, height: u32) -> wgpu::Texture {
    context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn overlap_orchestrator(context: &GpuContext, width: u32, height: u32) -> FrameOrchestrator {
    let mut orchestrator =
        create_orchestrator(context, TARGET_FORMAT, width, height, light()).unwrap();
    load_mesh(&mut orchestrator, &build_scene(&SceneKind::OverlapPair).unwrap());
    orchestrator
}

/// Render one frame and read the whole target back
fn render(
    context: &GpuContext,
    orchestrator: &mut FrameOrchestrator,
    width: u32,
    height: u32,
    mode: RenderMode,
) -> Vec<[u8; 4]> {
    let target = create_target(context, width, height);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    render_frame(orchestrator, &view, mode, front_screen(width, height).view_proj).unwrap();
    read_texture_rgba8(&context.device, &context.queue, &target).unwrap()
}

fn near_shade() -> [u8; 4] {
    let mesh = build_scene(&SceneKind::OverlapPair).unwrap();
    let normal = unit_face_normal(&triangle_positions(&mesh, 1));
    unpack_rgba8(pack_rgba8(shade_normal(normal, light())))
}

fn assert_close(actual: [u8; 4], expected: [u8; 4], what: &str) {
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!(
            (*a as i32 - *e as i32).abs() <= 2,
            "{}: got {:?}, expected {:?}",
            what,
            actual,
            expected
        );
    }
}

#[test]
fn overlap_pair_shows_near_triangle_in_every_depth_mode() {
    let Some(context) = context() else { return };
    let (width, height) = (64, 64);
    let mut orchestrator = overlap_orchestrator(&context, width, height);

    for mode in DEPTH_MODES {
        let pixels = render(&context, &mut orchestrator, width, height, mode);
        let centre = pixels[(height / 2 * width + width / 2) as usize];
        assert_close(centre, near_shade(), mode.display_name());
    }
}

#[test]
fn one_by_one_target() {
    let Some(context) = context() else { return };
    let mut orchestrator = overlap_orchestrator(&context, 64, 64);
    resize(&mut orchestrator, 1, 1);
    assert_eq!(orchestrator.screen.pyramid.layout.levels.len(), 1);

    for mode in DEPTH_MODES {
        let pixels = render(&context, &mut orchestrator, 1, 1, mode);
        assert_close(pixels[0], near_shade(), mode.display_name());
    }
}

#[test]
fn pyramid_is_identical_across_frames() {
    let Some(context) = context() else { return };
    let (width, height) = (48, 40);
    let mut orchestrator = overlap_orchestrator(&context, width, height);

    let read_pyramid = |orchestrator: &FrameOrchestrator| {
        let pyramid = &orchestrator.screen.pyramid;
        read_buffer_words(
            &context.device,
            &context.queue,
            &pyramid.buffer,
            0,
            pyramid.layout.texel_count as u64 * 2 * 4,
            "pyramid",
        )
        .unwrap()
    };

    render(&context, &mut orchestrator, width, height, RenderMode::NaiveHiZ);
    let first = read_pyramid(&orchestrator);
    render(&context, &mut orchestrator, width, height, RenderMode::NaiveHiZ);
    let second = read_pyramid(&orchestrator);
    assert_eq!(first, second);

    let stats = read_frame_stats(&orchestrator, RenderMode::NaiveHiZ)
        .unwrap()
        .unwrap();
    assert!(stats.emitted_triangles >= 1);
    assert!(stats.emitted_triangles <= stats.triangle_count);
}

#[test]
fn switching_modes_leaves_no_state_behind() {
    let Some(context) = context() else { return };
    let (width, height) = (64, 48);
    let mut orchestrator = overlap_orchestrator(&context, width, height);

    let before = render(&context, &mut orchestrator, width, height, RenderMode::NaiveZ);
    for mode in [
        RenderMode::Scanline,
        RenderMode::OptimHiZ,
        RenderMode::Wireframe,
        RenderMode::NaiveHiZ,
    ] {
        render(&context, &mut orchestrator, width, height, mode);
    }
    let after = render(&context, &mut orchestrator, width, height, RenderMode::NaiveZ);
    assert_eq!(before, after);

    let stats = read_frame_stats(&orchestrator, RenderMode::Scanline)
        .unwrap()
        .unwrap();
    assert_eq!(stats.spans_dropped, 0);
    assert!(stats.span_count > 0);
}

#[test]
fn reloading_a_mesh_keeps_rendering() {
    let Some(context) = context() else { return };
    let (width, height) = (32, 32);
    let mut orchestrator = overlap_orchestrator(&context, width, height);

    load_mesh(
        &mut orchestrator,
        &build_scene(&SceneKind::BoxField { count: 64, seed: 2 }).unwrap(),
    );
    render(&context, &mut orchestrator, width, height, RenderMode::OptimHiZ);
    let stats = read_frame_stats(&orchestrator, RenderMode::OptimHiZ)
        .unwrap()
        .unwrap();
    assert_eq!(stats.triangle_count, 64 * 12);
    assert_eq!(stats.octree_dropped, 0);
    assert_eq!(stats.octree_allocated, stats.triangle_count);
}
