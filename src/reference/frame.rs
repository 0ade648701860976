//! Host frames
//!
//! Whole-frame composition of the reference pieces, one function per
//! depth mode, for checking the GPU output and the culling invariants.

use super::octree::{build_octree, test_octree};
use super::pyramid::{build_pyramid, hiz_box_visible};
use super::raster::{
    all_faces, depth_pass, generate_spans, rasterize_two_pass, resolve_spans, PixelImage,
    ScreenTransform,
};
use crate::geometry::{triangle_bounds, triangle_count, MeshData};
use crate::visibility::depth_pyramid_data::PyramidLayout;
use crate::visibility::depth_pyramid_operations::create_pyramid_layout;
use crate::visibility::RenderMode;
use cgmath::Vector3;
use rayon::prelude::*;

/// Buffer capacities the GPU would allocate for the same mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceLimits {
    pub span_capacity: u32,
    pub pool_capacity: u32,
}

impl ReferenceLimits {
    pub fn unbounded(mesh: &MeshData) -> Self {
        Self {
            span_capacity: u32::MAX,
            pool_capacity: triangle_count(mesh),
        }
    }
}

/// One box test per triangle against the pyramid
pub fn naive_hiz_test(
    mesh: &MeshData,
    screen: &ScreenTransform,
    pyramid: &[u32],
    layout: &PyramidLayout,
) -> Vec<u32> {
    (0..triangle_count(mesh))
        .into_par_iter()
        .filter(|&face| {
            let bounds = triangle_bounds(mesh, face);
            hiz_box_visible(screen, pyramid, layout, bounds.min, bounds.max)
        })
        .collect()
}

/// Faces a Hi-Z mode would pass to the survivor draw
pub fn hiz_survivors(
    mode: RenderMode,
    mesh: &MeshData,
    screen: &ScreenTransform,
    limits: ReferenceLimits,
) -> Vec<u32> {
    let prepass = generate_spans(mesh, &all_faces(mesh), screen, u32::MAX);
    let depth = depth_pass(&prepass.spans, screen.width, screen.height);
    let layout = create_pyramid_layout(screen.width, screen.height);
    let pyramid = build_pyramid(&depth, &layout);

    match mode {
        RenderMode::OptimHiZ => {
            let octree = build_octree(mesh, limits.pool_capacity);
            test_octree(&octree, mesh, screen, &pyramid, &layout)
        }
        _ => naive_hiz_test(mesh, screen, &pyramid, &layout),
    }
}

/// Final depth and colour of `mode`; `None` for wireframe, which resolves nothing
pub fn render_reference(
    mode: RenderMode,
    mesh: &MeshData,
    screen: &ScreenTransform,
    light_direction: Vector3<f32>,
    limits: ReferenceLimits,
) -> Option<PixelImage> {
    let (width, height) = (screen.width, screen.height);
    match mode {
        RenderMode::Wireframe => None,
        RenderMode::NaiveZ => {
            let list = generate_spans(mesh, &all_faces(mesh), screen, u32::MAX);
            Some(rasterize_two_pass(&list.spans, width, height, light_direction))
        }
        RenderMode::Scanline => {
            let list = generate_spans(mesh, &all_faces(mesh), screen, limits.span_capacity);
            Some(resolve_spans(&list.spans, width, height, light_direction))
        }
        RenderMode::NaiveHiZ | RenderMode::OptimHiZ => {
            let survivors = hiz_survivors(mode, mesh, screen, limits);
            let list = generate_spans(mesh, &survivors, screen, u32::MAX);
            Some(rasterize_two_pass(&list.spans, width, height, light_direction))
        }
    }
}
