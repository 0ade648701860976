//! Frame orchestrator operations
//!
//! Owns resource (re)creation on mesh load and resize, builds the frame
//! uniform, and records a `FramePlan` into a command encoder. Each plan
//! phase becomes its own pass, so every phase boundary is a full barrier.

use super::depth_pyramid_data::PyramidLayout;
use super::depth_pyramid_operations::{create_depth_pyramid, mip_table, record_reduction};
use super::frame_plan::{build_frame_plan, count_dispatches, ComputeOp, PhaseWork, RenderOp, TransferOp};
use super::gpu_types::{
    DrawArgs, FillParams, FrameUniforms, SpanCounter, DRAW_ARGS_RESET, SPAN_COUNTER_RESET,
};
use super::hiz_operations::{create_hiz_output, record_survivor_draw, record_triangle_test};
use super::octree_data::OctreeLayout;
use super::octree_operations::{
    create_octree_index, octree_level_table, record_level_test, record_octree_build,
};
use super::orchestrator_data::{
    FillJob, FrameBindGroups, FrameOrchestrator, MeshResources, MeshSizing, ScreenResources,
};
use super::pipeline_data::{VisibilityLayouts, VisibilityPipelines};
use super::pipeline_operations::create_pipelines;
use super::render_mode::RenderMode;
use super::scanline_operations::{
    create_pixel_buffers, create_span_buffers, record_scanline_init, record_scanline_work,
};
use crate::constants::octree::EMPTY_HEAD;
use crate::constants::pyramid::DEPTH_SENTINEL;
use crate::error::VisibilityResult;
use crate::geometry::{create_geometry_store, MeshData};
use crate::gpu::{create_buffer_bind_group, linear_dispatch, GpuContext};
use cgmath::{Matrix4, Vector3};
use std::mem::size_of;
use wgpu::util::DeviceExt;

const SPAN_RESET_OFFSET: u64 = 0;
const DRAW_ARGS_RESET_OFFSET: u64 = size_of::<SpanCounter>() as u64;

pub const DEFAULT_CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

// ============================================================================
// CREATION
// ============================================================================

pub fn create_orchestrator(
    context: &GpuContext,
    target_format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    light_direction: Vector3<f32>,
) -> VisibilityResult<FrameOrchestrator> {
    let device = context.device.clone();
    let pipelines = create_pipelines(&device, target_format)?;

    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Frame Uniform Buffer"),
        size: size_of::<FrameUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut templates = Vec::new();
    templates.extend_from_slice(bytemuck::bytes_of(&SPAN_COUNTER_RESET));
    templates.extend_from_slice(bytemuck::bytes_of(&DRAW_ARGS_RESET));
    let reset_templates = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Counter Reset Templates"),
        contents: &templates,
        usage: wgpu::BufferUsages::COPY_SRC,
    });

    let screen = create_screen_resources(&device, &pipelines.layouts, width, height);

    Ok(FrameOrchestrator {
        device,
        queue: context.queue.clone(),
        monitor: context.monitor.clone(),
        pipelines,
        uniform_buffer,
        reset_templates,
        light_direction,
        clear_color: DEFAULT_CLEAR_COLOR,
        mesh: None,
        screen,
        bind_groups: None,
        frame_count: 0,
    })
}

fn create_fill_job(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    target: &wgpu::Buffer,
    params: FillParams,
) -> FillJob {
    let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(&params),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let bind_group = create_buffer_bind_group(device, label, layout, &[(0, &params_buffer), (1, target)]);

    FillJob {
        params_buffer,
        bind_group,
        groups: linear_dispatch(params.count),
    }
}

fn create_screen_resources(
    device: &wgpu::Device,
    layouts: &VisibilityLayouts,
    width: u32,
    height: u32,
) -> ScreenResources {
    let (width, height) = (width.max(1), height.max(1));
    let pyramid = create_depth_pyramid(device, width, height, &layouts.pass_params);
    let pixels = create_pixel_buffers(device, width, height);

    let pixel_count = width * height;
    let empty_depth = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Survivor Depth Buffer"),
        size: pixel_count as u64 * 4,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let pyramid_fill = create_fill_job(
        device,
        &layouts.fill,
        "Pyramid Fill",
        &pyramid.buffer,
        FillParams {
            value: DEPTH_SENTINEL,
            count: pyramid.layout.texel_count * 2,
            stride: 1,
            first: 0,
        },
    );
    let empty_depth_fill = create_fill_job(
        device,
        &layouts.fill,
        "Survivor Depth Fill",
        &empty_depth,
        FillParams {
            value: DEPTH_SENTINEL,
            count: pixel_count,
            stride: 1,
            first: 0,
        },
    );

    ScreenResources {
        width,
        height,
        pyramid,
        pixels,
        empty_depth,
        pyramid_fill,
        empty_depth_fill,
    }
}

fn create_mesh_resources(
    device: &wgpu::Device,
    layouts: &VisibilityLayouts,
    mesh: &MeshData,
) -> MeshResources {
    let geometry = create_geometry_store(device, mesh);
    let spans = create_span_buffers(device, geometry.triangle_count, &geometry.bounds);
    let octree = create_octree_index(device, geometry.triangle_count, &layouts.pass_params);
    let hiz = create_hiz_output(device, geometry.triangle_count);

    let cell_count = octree.layout.cell_count;
    let octree_head_fill = create_fill_job(
        device,
        &layouts.fill,
        "Octree Head Fill",
        &octree.cells,
        FillParams {
            value: EMPTY_HEAD,
            count: cell_count,
            stride: 2,
            first: 0,
        },
    );
    let octree_marker_fill = create_fill_job(
        device,
        &layouts.fill,
        "Octree Marker Fill",
        &octree.cells,
        FillParams {
            value: 0,
            count: cell_count,
            stride: 2,
            first: 1,
        },
    );

    MeshResources {
        sizing: MeshSizing {
            bounds: geometry.bounds,
            triangle_count: geometry.triangle_count,
            span_capacity: spans.capacity,
            pool_capacity: octree.pool_capacity,
        },
        geometry,
        spans,
        octree,
        hiz,
        octree_head_fill,
        octree_marker_fill,
    }
}

fn create_frame_bind_groups(
    device: &wgpu::Device,
    layouts: &VisibilityLayouts,
    uniform: &wgpu::Buffer,
    mesh: &MeshResources,
    screen: &ScreenResources,
) -> FrameBindGroups {
    let vertices = &mesh.geometry.vertex_buffer;
    let indices = &mesh.geometry.index_buffer;
    let pyramid = &screen.pyramid.buffer;
    let group = |label: &str, layout: &wgpu::BindGroupLayout, buffers: &[(u32, &wgpu::Buffer)]| {
        create_buffer_bind_group(device, label, layout, buffers)
    };

    FrameBindGroups {
        wireframe: group("Wireframe Bind Group", &layouts.wireframe, &[(0, uniform)]),
        mesh_surface: group(
            "Mesh Surface Bind Group",
            &layouts.surface,
            &[(0, uniform), (1, vertices), (2, indices), (3, pyramid)],
        ),
        survivor_surface: group(
            "Survivor Surface Bind Group",
            &layouts.surface,
            &[(0, uniform), (1, vertices), (2, indices), (3, &screen.empty_depth)],
        ),
        blit: group(
            "Blit Bind Group",
            &layouts.blit,
            &[(0, uniform), (7, &screen.pixels.color)],
        ),
        scanline_init: group(
            "Scanline Init Bind Group",
            &layouts.scanline_init,
            &[
                (0, uniform),
                (1, vertices),
                (2, indices),
                (4, &mesh.spans.spans),
                (5, &mesh.spans.counter),
            ],
        ),
        scanline_work: group(
            "Scanline Work Bind Group",
            &layouts.scanline_work,
            &[
                (0, uniform),
                (3, pyramid),
                (4, &mesh.spans.spans),
                (5, &mesh.spans.counter),
                (6, &screen.pixels.locks),
                (7, &screen.pixels.color),
            ],
        ),
        reduce: group(
            "Pyramid Reduce Bind Group",
            &layouts.reduce,
            &[(0, uniform), (3, pyramid)],
        ),
        hiz_naive: group(
            "Naive Hi-Z Bind Group",
            &layouts.hiz_naive,
            &[
                (0, uniform),
                (1, vertices),
                (2, indices),
                (3, pyramid),
                (11, &mesh.hiz.survivors),
                (12, &mesh.hiz.draw_args),
            ],
        ),
        octree_build: group(
            "Octree Build Bind Group",
            &layouts.octree_build,
            &[
                (0, uniform),
                (1, vertices),
                (2, indices),
                (8, &mesh.octree.cells),
                (9, &mesh.octree.pool),
                (10, &mesh.octree.counters),
            ],
        ),
        hiz_octree: group(
            "Octree Hi-Z Bind Group",
            &layouts.hiz_octree,
            &[
                (0, uniform),
                (1, vertices),
                (2, indices),
                (3, pyramid),
                (8, &mesh.octree.cells),
                (9, &mesh.octree.pool),
                (11, &mesh.hiz.survivors),
                (12, &mesh.hiz.draw_args),
            ],
        ),
    }
}

fn rebuild_bind_groups(orchestrator: &mut FrameOrchestrator) {
    orchestrator.bind_groups = orchestrator.mesh.as_ref().map(|mesh| {
        create_frame_bind_groups(
            &orchestrator.device,
            &orchestrator.pipelines.layouts,
            &orchestrator.uniform_buffer,
            mesh,
            &orchestrator.screen,
        )
    });
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Replace the loaded mesh. Waits for in-flight frames before releasing
/// the previous mesh's buffers.
pub fn load_mesh(orchestrator: &mut FrameOrchestrator, mesh: &MeshData) {
    orchestrator.device.poll(wgpu::Maintain::Wait);

    orchestrator.bind_groups = None;
    orchestrator.mesh = Some(create_mesh_resources(
        &orchestrator.device,
        &orchestrator.pipelines.layouts,
        mesh,
    ));
    rebuild_bind_groups(orchestrator);

    log::info!(
        "[Frame Orchestrator] Loaded mesh with {} triangles",
        orchestrator.mesh.as_ref().map_or(0, |m| m.sizing.triangle_count)
    );
}

/// Recreate screen-sized resources; zero sizes are clamped to 1
pub fn resize(orchestrator: &mut FrameOrchestrator, width: u32, height: u32) {
    let (width, height) = (width.max(1), height.max(1));
    if orchestrator.screen.width == width && orchestrator.screen.height == height {
        return;
    }

    orchestrator.device.poll(wgpu::Maintain::Wait);
    orchestrator.bind_groups = None;
    orchestrator.screen = create_screen_resources(
        &orchestrator.device,
        &orchestrator.pipelines.layouts,
        width,
        height,
    );
    rebuild_bind_groups(orchestrator);

    log::info!("[Frame Orchestrator] Resized to {}x{}", width, height);
}

// ============================================================================
// FRAME
// ============================================================================

pub fn build_frame_uniforms(
    view_proj: Matrix4<f32>,
    light_direction: Vector3<f32>,
    pyramid: &PyramidLayout,
    sizing: &MeshSizing,
    octree: &OctreeLayout,
) -> FrameUniforms {
    FrameUniforms {
        view_proj: view_proj.into(),
        light_dir: [light_direction.x, light_direction.y, light_direction.z, 0.0],
        bound_min: [sizing.bounds.min.x, sizing.bounds.min.y, sizing.bounds.min.z, 1.0],
        bound_max: [sizing.bounds.max.x, sizing.bounds.max.y, sizing.bounds.max.z, 1.0],
        screen: [
            pyramid.width,
            pyramid.height,
            pyramid.levels.len() as u32,
            sizing.triangle_count,
        ],
        capacity: [
            sizing.span_capacity,
            sizing.pool_capacity,
            pyramid.texel_count,
            octree.cell_count,
        ],
        mips: mip_table(pyramid),
        octree_levels: octree_level_table(octree),
    }
}

fn record_fill<'a>(
    pass: &mut wgpu::ComputePass<'a>,
    pipeline: &'a wgpu::ComputePipeline,
    job: &'a FillJob,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, &job.bind_group, &[]);
    pass.dispatch_workgroups(job.groups.0, job.groups.1, 1);
}

fn record_transfer(
    encoder: &mut wgpu::CommandEncoder,
    orchestrator: &FrameOrchestrator,
    mesh: &MeshResources,
    op: TransferOp,
) {
    let screen = &orchestrator.screen;
    match op {
        TransferOp::ClearPixelLocks => encoder.clear_buffer(&screen.pixels.locks, 0, None),
        TransferOp::ClearColor => encoder.clear_buffer(&screen.pixels.color, 0, None),
        TransferOp::ResetSpanCounter => encoder.copy_buffer_to_buffer(
            &orchestrator.reset_templates,
            SPAN_RESET_OFFSET,
            &mesh.spans.counter,
            0,
            size_of::<SpanCounter>() as u64,
        ),
        TransferOp::ResetDrawArgs => encoder.copy_buffer_to_buffer(
            &orchestrator.reset_templates,
            DRAW_ARGS_RESET_OFFSET,
            &mesh.hiz.draw_args,
            0,
            size_of::<DrawArgs>() as u64,
        ),
        TransferOp::ClearOctreeCounters => encoder.clear_buffer(&mesh.octree.counters, 0, None),
    }
}

fn record_compute<'a>(
    pass: &mut wgpu::ComputePass<'a>,
    orchestrator: &'a FrameOrchestrator,
    mesh: &'a MeshResources,
    groups: &'a FrameBindGroups,
    op: ComputeOp,
) {
    let pipelines: &'a VisibilityPipelines = &orchestrator.pipelines;
    let screen = &orchestrator.screen;
    let triangles = mesh.sizing.triangle_count;

    match op {
        ComputeOp::FillPyramid => record_fill(pass, &pipelines.fill, &screen.pyramid_fill),
        ComputeOp::FillEmptyDepth => record_fill(pass, &pipelines.fill, &screen.empty_depth_fill),
        ComputeOp::FillOctreeCells => {
            record_fill(pass, &pipelines.fill, &mesh.octree_head_fill);
            record_fill(pass, &pipelines.fill, &mesh.octree_marker_fill);
        }
        ComputeOp::ScanlineInit => {
            record_scanline_init(pass, &pipelines.scanline_init, &groups.scanline_init, triangles)
        }
        ComputeOp::ScanlineWork => {
            record_scanline_work(pass, &pipelines.scanline_work, &groups.scanline_work, &mesh.spans)
        }
        ComputeOp::ReducePyramid { source_level } => {
            if let Some(reduction) = screen
                .pyramid
                .reduction_passes
                .iter()
                .find(|r| r.source_level == source_level)
            {
                record_reduction(pass, &pipelines.reduce, &groups.reduce, reduction);
            }
        }
        ComputeOp::BuildOctree => {
            record_octree_build(pass, &pipelines.build_octree, &groups.octree_build, triangles)
        }
        ComputeOp::TestTriangles => {
            record_triangle_test(pass, &pipelines.test_triangles, &groups.hiz_naive, triangles)
        }
        ComputeOp::TestOctreeLevel { level } => {
            if let Some(level_pass) = mesh.octree.level_passes.iter().find(|p| p.level == level) {
                record_level_test(pass, &pipelines.test_octree_level, &groups.hiz_octree, level_pass);
            }
        }
    }
}

fn record_render<'a>(
    pass: &mut wgpu::RenderPass<'a>,
    pipelines: &'a VisibilityPipelines,
    mesh: &'a MeshResources,
    groups: &'a FrameBindGroups,
    op: RenderOp,
) {
    let geometry = &mesh.geometry;
    let mesh_vertices = 0..geometry.triangle_count * 3;

    match op {
        RenderOp::Wireframe => {
            if geometry.edge_index_count == 0 {
                return;
            }
            pass.set_pipeline(&pipelines.wireframe);
            pass.set_bind_group(0, &groups.wireframe, &[]);
            pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
            pass.set_index_buffer(geometry.edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..geometry.edge_index_count, 0, 0..1);
        }
        RenderOp::MeshDepth => {
            pass.set_pipeline(&pipelines.mesh_depth);
            pass.set_bind_group(0, &groups.mesh_surface, &[]);
            pass.draw(mesh_vertices, 0..1);
        }
        RenderOp::MeshShade => {
            pass.set_pipeline(&pipelines.mesh_shade);
            pass.set_bind_group(0, &groups.mesh_surface, &[]);
            pass.draw(mesh_vertices, 0..1);
        }
        RenderOp::ScanlineBlit => {
            pass.set_pipeline(&pipelines.blit);
            pass.set_bind_group(0, &groups.blit, &[]);
            pass.draw(0..3, 0..1);
        }
        RenderOp::SurvivorDepth => {
            record_survivor_draw(pass, &pipelines.survivor_depth, &groups.survivor_surface, &mesh.hiz)
        }
        RenderOp::SurvivorShade => {
            record_survivor_draw(pass, &pipelines.survivor_shade, &groups.survivor_surface, &mesh.hiz)
        }
    }
}

fn begin_target_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    label: &str,
    target: &'a wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Record one frame of `mode` into `encoder`. The target must match the
/// size passed to the last `resize`.
pub fn record_frame(
    orchestrator: &FrameOrchestrator,
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    mode: RenderMode,
    view_proj: Matrix4<f32>,
) {
    let (Some(mesh), Some(groups)) = (&orchestrator.mesh, &orchestrator.bind_groups) else {
        // Nothing loaded: present the clear colour only
        drop(begin_target_pass(
            encoder,
            "Empty Frame",
            target,
            wgpu::LoadOp::Clear(orchestrator.clear_color),
        ));
        return;
    };

    let uniforms = build_frame_uniforms(
        view_proj,
        orchestrator.light_direction,
        &orchestrator.screen.pyramid.layout,
        &mesh.sizing,
        &mesh.octree.layout,
    );
    orchestrator
        .queue
        .write_buffer(&orchestrator.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

    let plan = build_frame_plan(mode, orchestrator.screen.pyramid.layout.levels.len() as u32);
    log::trace!(
        "[Frame Orchestrator] Frame {} in {}: {} phases, {} dispatches",
        orchestrator.frame_count,
        mode.display_name(),
        plan.phases.len(),
        count_dispatches(&plan)
    );
    let mut target_cleared = false;

    for phase in &plan.phases {
        match &phase.work {
            PhaseWork::Transfer(ops) => {
                for &op in ops {
                    record_transfer(encoder, orchestrator, mesh, op);
                }
            }
            PhaseWork::Compute(ops) => {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(phase.label),
                    timestamp_writes: None,
                });
                for &op in ops {
                    record_compute(&mut pass, orchestrator, mesh, groups, op);
                }
            }
            PhaseWork::Render(op) => {
                let load = if target_cleared {
                    wgpu::LoadOp::Load
                } else {
                    wgpu::LoadOp::Clear(orchestrator.clear_color)
                };
                target_cleared = true;
                let mut pass = begin_target_pass(encoder, phase.label, target, load);
                record_render(&mut pass, &orchestrator.pipelines, mesh, groups, *op);
            }
        }
    }
}

/// Record, submit, and surface any device error raised so far
pub fn render_frame(
    orchestrator: &mut FrameOrchestrator,
    target: &wgpu::TextureView,
    mode: RenderMode,
    view_proj: Matrix4<f32>,
) -> VisibilityResult<()> {
    let mut encoder = orchestrator
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
    record_frame(orchestrator, &mut encoder, target, mode, view_proj);
    orchestrator.queue.submit(Some(encoder.finish()));
    orchestrator.frame_count += 1;

    orchestrator.monitor.check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AABB;
    use crate::visibility::depth_pyramid_operations::create_pyramid_layout;
    use crate::visibility::octree_operations::create_octree_layout;
    use cgmath::{Point3, SquareMatrix};

    fn sizing() -> MeshSizing {
        MeshSizing {
            bounds: AABB {
                min: Point3::new(-1.0, -2.0, -3.0),
                max: Point3::new(1.0, 2.0, 3.0),
            },
            triangle_count: 12,
            span_capacity: 1 << 16,
            pool_capacity: 12,
        }
    }

    #[test]
    fn test_uniform_screen_and_capacity() {
        let pyramid = create_pyramid_layout(640, 480);
        let octree = create_octree_layout();
        let uniforms = build_frame_uniforms(
            Matrix4::identity(),
            Vector3::new(0.0, 0.0, 1.0),
            &pyramid,
            &sizing(),
            &octree,
        );
        assert_eq!(uniforms.screen, [640, 480, 10, 12]);
        assert_eq!(uniforms.capacity, [1 << 16, 12, pyramid.texel_count, octree.cell_count]);
        assert_eq!(uniforms.bound_min, [-1.0, -2.0, -3.0, 1.0]);
        assert_eq!(uniforms.light_dir[3], 0.0);
        assert_eq!(uniforms.mips[0], [0, 640, 480, 0]);
        assert_eq!(uniforms.octree_levels[3], [0, 8, 0, 0]);
    }

    #[test]
    fn test_uniform_matrix_is_column_major() {
        let translation = Matrix4::from_translation(Vector3::new(3.0, 4.0, 5.0));
        let uniforms = build_frame_uniforms(
            translation,
            Vector3::unit_z(),
            &create_pyramid_layout(1, 1),
            &sizing(),
            &create_octree_layout(),
        );
        assert_eq!(uniforms.view_proj[3], [3.0, 4.0, 5.0, 1.0]);
        assert_eq!(uniforms.screen[2], 1);
    }

    #[test]
    fn test_reset_template_offsets() {
        assert_eq!(SPAN_RESET_OFFSET % 4, 0);
        assert_eq!(DRAW_ARGS_RESET_OFFSET, 16);
    }
}
