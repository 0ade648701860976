//! Host depth pyramid and box test
//!
//! Same buffer layout as the GPU pyramid: near channel at mip offsets, far
//! channel `texel_count` words later, mip 0 holding the rasterized depth.

use super::raster::{project_point, ScreenTransform};
use crate::constants::pyramid::{DEPTH_SENTINEL, HIZ_DEPTH_BIAS};
use crate::visibility::depth_pyramid_data::PyramidLayout;
use crate::visibility::shading::depth_bits;
use cgmath::Point3;
use rayon::prelude::*;

/// (near, far) of one texel, neutral outside the mip
fn read_texel(pyramid: &[u32], layout: &PyramidLayout, level: usize, x: u32, y: u32) -> (u32, u32) {
    let mip = layout.levels[level];
    if x >= mip.width || y >= mip.height {
        return (DEPTH_SENTINEL, 0);
    }
    let i = (mip.offset + y * mip.width + x) as usize;
    if level == 0 {
        (pyramid[i], pyramid[i])
    } else {
        (pyramid[i], pyramid[layout.texel_count as usize + i])
    }
}

/// Full pyramid from a mip-0 depth image of `layout.width * layout.height` words
pub fn build_pyramid(depth: &[u32], layout: &PyramidLayout) -> Vec<u32> {
    let texels = layout.texel_count as usize;
    let mut pyramid = vec![DEPTH_SENTINEL; texels * 2];
    pyramid[..depth.len()].copy_from_slice(depth);

    for level in 1..layout.levels.len() {
        let mip = layout.levels[level];
        let reduced: Vec<(u32, u32)> = (0..mip.width * mip.height)
            .into_par_iter()
            .map(|i| {
                let (x, y) = (i % mip.width, i / mip.width);
                let children = [
                    read_texel(&pyramid, layout, level - 1, x * 2, y * 2),
                    read_texel(&pyramid, layout, level - 1, x * 2 + 1, y * 2),
                    read_texel(&pyramid, layout, level - 1, x * 2, y * 2 + 1),
                    read_texel(&pyramid, layout, level - 1, x * 2 + 1, y * 2 + 1),
                ];
                children
                    .iter()
                    .fold((DEPTH_SENTINEL, 0), |(n, f), &(cn, cf)| (n.min(cn), f.max(cf)))
            })
            .collect();

        for (i, (near, far)) in reduced.into_iter().enumerate() {
            let index = mip.offset as usize + i;
            pyramid[index] = near;
            pyramid[texels + index] = far;
        }
    }
    pyramid
}

/// Farthest depth under texel (x, y) of `level`, coordinates clamped to the mip
pub fn pyramid_far(pyramid: &[u32], layout: &PyramidLayout, level: usize, x: u32, y: u32) -> u32 {
    let mip = layout.levels[level];
    let i = (mip.offset + y.min(mip.height - 1) * mip.width + x.min(mip.width - 1)) as usize;
    if level == 0 {
        pyramid[i]
    } else {
        pyramid[layout.texel_count as usize + i]
    }
}

/// False only when the box is provably hidden by the pyramid or off screen
pub fn hiz_box_visible(
    screen: &ScreenTransform,
    pyramid: &[u32],
    layout: &PyramidLayout,
    lo: Point3<f32>,
    hi: Point3<f32>,
) -> bool {
    let mut screen_min = [f32::MAX; 2];
    let mut screen_max = [f32::MIN; 2];
    let mut nearest = f32::MAX;

    for i in 0..8 {
        let corner = Point3::new(
            if i & 1 != 0 { hi.x } else { lo.x },
            if i & 2 != 0 { hi.y } else { lo.y },
            if i & 4 != 0 { hi.z } else { lo.z },
        );
        let Some(p) = project_point(screen, corner) else {
            return true;
        };
        if p.z < 0.0 {
            return true;
        }
        screen_min = [screen_min[0].min(p.x), screen_min[1].min(p.y)];
        screen_max = [screen_max[0].max(p.x), screen_max[1].max(p.y)];
        nearest = nearest.min(p.z);
    }

    if nearest > 1.0 {
        return false;
    }
    let size = [screen.width as f32, screen.height as f32];
    if screen_max[0] < 0.0 || screen_max[1] < 0.0 || screen_min[0] > size[0] || screen_min[1] > size[1] {
        return false;
    }

    let pixel = |v: f32, axis: usize| v.floor().clamp(0.0, size[axis] - 1.0) as u32;
    let (x0, y0) = (pixel(screen_min[0], 0), pixel(screen_min[1], 1));
    let (x1, y1) = (pixel(screen_max[0], 0), pixel(screen_max[1], 1));
    let extent = (x1 - x0).max(y1 - y0) + 1;
    let level = ((31 - extent.leading_zeros()) as usize).min(layout.levels.len() - 1);

    let mut farthest = 0;
    for ty in (y0 >> level)..=(y1 >> level) {
        for tx in (x0 >> level)..=(x1 >> level) {
            farthest = farthest.max(pyramid_far(pyramid, layout, level, tx, ty));
        }
    }
    depth_bits(nearest - HIZ_DEPTH_BIAS) <= farthest
}
