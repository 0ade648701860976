//! Pipeline construction
//!
//! Shader modules are composed from the shared WGSL chunks and validated
//! before any pipeline is built, so a bad kernel fails here with its label
//! instead of surfacing later as an uncaptured device error.

use super::hiz_operations::survivor_vertex_layout;
use super::pipeline_data::{VisibilityLayouts, VisibilityPipelines};
use crate::error::VisibilityResult;
use crate::gpu::shader::{
    BLIT_MODULE, FILL_MODULE, HIZ_NAIVE_MODULE, HIZ_OCTREE_MODULE, OCTREE_BUILD_MODULE,
    PYRAMID_REDUCE_MODULE, SCANLINE_INIT_MODULE, SCANLINE_WORK_MODULE, SURFACE_MODULE,
    WIREFRAME_MODULE,
};
use crate::gpu::{create_validated_shader, storage_entry, uniform_entry};
use std::mem::size_of;
use wgpu::ShaderStages;

const COMPUTE: ShaderStages = ShaderStages::COMPUTE;

fn layout(
    device: &wgpu::Device,
    label: &str,
    entries: &[wgpu::BindGroupLayoutEntry],
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries,
    })
}

pub fn create_layouts(device: &wgpu::Device) -> VisibilityLayouts {
    let raster = ShaderStages::VERTEX | ShaderStages::FRAGMENT;

    VisibilityLayouts {
        surface: layout(
            device,
            "Surface Layout",
            &[
                uniform_entry(0, raster),
                storage_entry(1, ShaderStages::VERTEX, true),
                storage_entry(2, ShaderStages::VERTEX, true),
                // Fragment-only: vertex-stage writable storage is an optional feature
                storage_entry(3, ShaderStages::FRAGMENT, false),
            ],
        ),
        wireframe: layout(device, "Wireframe Layout", &[uniform_entry(0, raster)]),
        blit: layout(
            device,
            "Blit Layout",
            &[
                uniform_entry(0, raster),
                storage_entry(7, ShaderStages::FRAGMENT, true),
            ],
        ),
        scanline_init: layout(
            device,
            "Scanline Init Layout",
            &[
                uniform_entry(0, COMPUTE),
                storage_entry(1, COMPUTE, true),
                storage_entry(2, COMPUTE, true),
                storage_entry(4, COMPUTE, false),
                storage_entry(5, COMPUTE, false),
            ],
        ),
        scanline_work: layout(
            device,
            "Scanline Work Layout",
            &[
                uniform_entry(0, COMPUTE),
                storage_entry(3, COMPUTE, false),
                storage_entry(4, COMPUTE, true),
                storage_entry(5, COMPUTE, true),
                storage_entry(6, COMPUTE, false),
                storage_entry(7, COMPUTE, false),
            ],
        ),
        reduce: layout(
            device,
            "Pyramid Reduce Layout",
            &[uniform_entry(0, COMPUTE), storage_entry(3, COMPUTE, false)],
        ),
        pass_params: layout(device, "Pass Params Layout", &[uniform_entry(0, COMPUTE)]),
        hiz_naive: layout(
            device,
            "Naive Hi-Z Layout",
            &[
                uniform_entry(0, COMPUTE),
                storage_entry(1, COMPUTE, true),
                storage_entry(2, COMPUTE, true),
                storage_entry(3, COMPUTE, true),
                storage_entry(11, COMPUTE, false),
                storage_entry(12, COMPUTE, false),
            ],
        ),
        octree_build: layout(
            device,
            "Octree Build Layout",
            &[
                uniform_entry(0, COMPUTE),
                storage_entry(1, COMPUTE, true),
                storage_entry(2, COMPUTE, true),
                storage_entry(8, COMPUTE, false),
                storage_entry(9, COMPUTE, false),
                storage_entry(10, COMPUTE, false),
            ],
        ),
        hiz_octree: layout(
            device,
            "Octree Hi-Z Layout",
            &[
                uniform_entry(0, COMPUTE),
                storage_entry(1, COMPUTE, true),
                storage_entry(2, COMPUTE, true),
                storage_entry(3, COMPUTE, true),
                storage_entry(8, COMPUTE, false),
                storage_entry(9, COMPUTE, true),
                storage_entry(11, COMPUTE, false),
                storage_entry(12, COMPUTE, false),
            ],
        ),
        fill: layout(
            device,
            "Fill Layout",
            &[uniform_entry(0, COMPUTE), storage_entry(1, COMPUTE, false)],
        ),
    }
}

fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    entry_point: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module,
        entry_point,
    })
}

struct RasterDesc<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    write_mask: wgpu::ColorWrites,
}

fn render_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    desc: RasterDesc,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: desc.vertex_entry,
            buffers: desc.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.module,
            entry_point: desc.fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: desc.write_mask,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Visibility is resolved by depth alone; both faces rasterize
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

/// Compile every kernel and pipeline for one render target format
pub fn create_pipelines(
    device: &wgpu::Device,
    target_format: wgpu::TextureFormat,
) -> VisibilityResult<VisibilityPipelines> {
    let layouts = create_layouts(device);

    let surface = create_validated_shader(device, &SURFACE_MODULE)?;
    let wireframe = create_validated_shader(device, &WIREFRAME_MODULE)?;
    let blit = create_validated_shader(device, &BLIT_MODULE)?;
    let fill = create_validated_shader(device, &FILL_MODULE)?;
    let scanline_init = create_validated_shader(device, &SCANLINE_INIT_MODULE)?;
    let scanline_work = create_validated_shader(device, &SCANLINE_WORK_MODULE)?;
    let reduce = create_validated_shader(device, &PYRAMID_REDUCE_MODULE)?;
    let hiz_naive = create_validated_shader(device, &HIZ_NAIVE_MODULE)?;
    let octree_build = create_validated_shader(device, &OCTREE_BUILD_MODULE)?;
    let hiz_octree = create_validated_shader(device, &HIZ_OCTREE_MODULE)?;

    let wire_attributes = [wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x4,
        offset: 0,
        shader_location: 0,
    }];
    let wire_buffers = [wgpu::VertexBufferLayout {
        array_stride: size_of::<[f32; 4]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wire_attributes,
    }];
    let survivor_buffers = [survivor_vertex_layout()];

    let raster = |layout: &wgpu::BindGroupLayout, desc: RasterDesc| {
        render_pipeline(device, layout, target_format, desc)
    };

    let pipelines = VisibilityPipelines {
        wireframe: raster(
            &layouts.wireframe,
            RasterDesc {
                label: "Wireframe Pipeline",
                module: &wireframe,
                vertex_entry: "vs_wire",
                fragment_entry: "fs_wire",
                buffers: &wire_buffers,
                topology: wgpu::PrimitiveTopology::LineList,
                write_mask: wgpu::ColorWrites::ALL,
            },
        ),
        mesh_depth: raster(
            &layouts.surface,
            RasterDesc {
                label: "Mesh Depth Pipeline",
                module: &surface,
                vertex_entry: "vs_mesh",
                fragment_entry: "fs_depth",
                buffers: &[],
                topology: wgpu::PrimitiveTopology::TriangleList,
                write_mask: wgpu::ColorWrites::empty(),
            },
        ),
        mesh_shade: raster(
            &layouts.surface,
            RasterDesc {
                label: "Mesh Shade Pipeline",
                module: &surface,
                vertex_entry: "vs_mesh",
                fragment_entry: "fs_shade",
                buffers: &[],
                topology: wgpu::PrimitiveTopology::TriangleList,
                write_mask: wgpu::ColorWrites::ALL,
            },
        ),
        survivor_depth: raster(
            &layouts.surface,
            RasterDesc {
                label: "Survivor Depth Pipeline",
                module: &surface,
                vertex_entry: "vs_survivor",
                fragment_entry: "fs_depth",
                buffers: &survivor_buffers,
                topology: wgpu::PrimitiveTopology::TriangleList,
                write_mask: wgpu::ColorWrites::empty(),
            },
        ),
        survivor_shade: raster(
            &layouts.surface,
            RasterDesc {
                label: "Survivor Shade Pipeline",
                module: &surface,
                vertex_entry: "vs_survivor",
                fragment_entry: "fs_shade",
                buffers: &survivor_buffers,
                topology: wgpu::PrimitiveTopology::TriangleList,
                write_mask: wgpu::ColorWrites::ALL,
            },
        ),
        blit: raster(
            &layouts.blit,
            RasterDesc {
                label: "Scanline Blit Pipeline",
                module: &blit,
                vertex_entry: "vs_fullscreen",
                fragment_entry: "fs_blit",
                buffers: &[],
                topology: wgpu::PrimitiveTopology::TriangleList,
                write_mask: wgpu::ColorWrites::ALL,
            },
        ),

        fill: compute_pipeline(device, "Fill Pipeline", &fill, "fill_words", &[&layouts.fill]),
        scanline_init: compute_pipeline(
            device,
            "Scanline Init Pipeline",
            &scanline_init,
            "scanline_init",
            &[&layouts.scanline_init],
        ),
        scanline_work: compute_pipeline(
            device,
            "Scanline Work Pipeline",
            &scanline_work,
            "scanline_work",
            &[&layouts.scanline_work],
        ),
        reduce: compute_pipeline(
            device,
            "Pyramid Reduce Pipeline",
            &reduce,
            "reduce_pyramid",
            &[&layouts.reduce, &layouts.pass_params],
        ),
        test_triangles: compute_pipeline(
            device,
            "Naive Hi-Z Pipeline",
            &hiz_naive,
            "test_triangles",
            &[&layouts.hiz_naive],
        ),
        build_octree: compute_pipeline(
            device,
            "Octree Build Pipeline",
            &octree_build,
            "build_octree",
            &[&layouts.octree_build],
        ),
        test_octree_level: compute_pipeline(
            device,
            "Octree Hi-Z Pipeline",
            &hiz_octree,
            "test_octree_level",
            &[&layouts.hiz_octree, &layouts.pass_params],
        ),

        layouts,
        target_format,
    };

    log::info!("[Pipelines] Built visibility pipelines for {:?}", target_format);
    Ok(pipelines)
}
