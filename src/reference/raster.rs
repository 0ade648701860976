//! Host rasterization model
//!
//! Span generation and the two per-pixel resolve schemes (spinlocked
//! scanline, two-pass atomic min), run on the rayon pool. Numerics follow
//! common.wgsl and scanline_init.wgsl step for step.

use crate::constants::pyramid::DEPTH_SENTINEL;
use crate::constants::scanline::{LOCKED, UNLOCKED};
use crate::constants::CLIP_W_EPSILON;
use crate::geometry::mesh_operations::face_normal;
use crate::geometry::{triangle_count, triangle_positions, MeshData};
use crate::visibility::gpu_types::GpuSpan;
use crate::visibility::shading::{depth_bits, pack_rgba8, shade_normal};
use cgmath::{Matrix4, Point3, Vector3, Vector4};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Camera transform and target size of one reference frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    pub view_proj: Matrix4<f32>,
    pub width: u32,
    pub height: u32,
}

/// Final per-pixel depth bits and packed colour; 0 colour means untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    pub width: u32,
    pub height: u32,
    pub depth: Vec<u32>,
    pub color: Vec<u32>,
}

impl PixelImage {
    pub fn pixel(&self, x: u32, y: u32) -> (u32, u32) {
        let i = (y * self.width + x) as usize;
        (self.depth[i], self.color[i])
    }
}

/// Spans produced for a frame; `span_count` keeps counting past capacity
#[derive(Debug, Clone, PartialEq)]
pub struct SpanList {
    pub spans: Vec<GpuSpan>,
    pub span_count: u32,
}

/// Pixel x, y (origin top-left) and NDC depth; `None` behind the eye
pub fn project_point(screen: &ScreenTransform, p: Point3<f32>) -> Option<Point3<f32>> {
    let clip = screen.view_proj * Vector4::new(p.x, p.y, p.z, 1.0);
    if clip.w <= CLIP_W_EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Point3::new(
        (ndc.x * 0.5 + 0.5) * screen.width as f32,
        (0.5 - ndc.y * 0.5) * screen.height as f32,
        ndc.z,
    ))
}

/// Crossing x of edge p-q with row centre `yc`, half-open in y
fn edge_crossing(p: Point3<f32>, q: Point3<f32>, yc: f32) -> Option<f32> {
    if (p.y <= yc) == (q.y <= yc) {
        return None;
    }
    let (a, b) = if q.y < p.y { (q, p) } else { (p, q) };
    let t = (yc - a.y) / (b.y - a.y);
    Some(a.x + t * (b.x - a.x))
}

/// One span per covered pixel row of a triangle
pub fn triangle_spans(screen: &ScreenTransform, corners: &[Point3<f32>; 3]) -> Vec<GpuSpan> {
    let projected: Option<Vec<Point3<f32>>> =
        corners.iter().map(|&c| project_point(screen, c)).collect();
    let Some(s) = projected else {
        return Vec::new();
    };
    let z_min = s[0].z.min(s[1].z).min(s[2].z);
    if z_min < 0.0 || z_min > 1.0 {
        return Vec::new();
    }

    let det = (s[1].x - s[0].x) * (s[2].y - s[0].y) - (s[2].x - s[0].x) * (s[1].y - s[0].y);
    if det.abs() < 1.0e-12 {
        return Vec::new();
    }
    let dzdx = ((s[1].z - s[0].z) * (s[2].y - s[0].y) - (s[2].z - s[0].z) * (s[1].y - s[0].y)) / det;
    let dzdy = ((s[2].z - s[0].z) * (s[1].x - s[0].x) - (s[1].z - s[0].z) * (s[2].x - s[0].x)) / det;

    let (width, height) = (screen.width as f32, screen.height as f32);
    let y_lo = ((s[0].y.min(s[1].y).min(s[2].y)) - 0.5).ceil().clamp(0.0, height);
    let y_hi = ((s[0].y.max(s[1].y).max(s[2].y)) - 0.5).floor().clamp(-1.0, height - 1.0);
    let n = face_normal(corners);

    let mut spans = Vec::new();
    for y in y_lo as i32..=y_hi as i32 {
        let yc = y as f32 + 0.5;
        let crossings = [
            edge_crossing(s[0], s[1], yc),
            edge_crossing(s[1], s[2], yc),
            edge_crossing(s[2], s[0], yc),
        ];
        let (x_left, x_right) = crossings
            .iter()
            .flatten()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        if x_right < x_left {
            continue;
        }

        let x_start = (x_left - 0.5).ceil().clamp(0.0, width) as i32;
        let x_end = ((x_right - 0.5).ceil() - 1.0).clamp(-1.0, width - 1.0) as i32;
        if x_start > x_end {
            continue;
        }

        spans.push(GpuSpan {
            normal: [n.x, n.y, n.z],
            x_start,
            x_end,
            y,
            z_start: s[0].z + dzdx * (x_start as f32 + 0.5 - s[0].x) + dzdy * (yc - s[0].y),
            dzdx,
        });
    }
    spans
}

/// Spans of the listed faces, truncated to `capacity` like Phase Init
pub fn generate_spans(
    mesh: &MeshData,
    faces: &[u32],
    screen: &ScreenTransform,
    capacity: u32,
) -> SpanList {
    let mut spans: Vec<GpuSpan> = faces
        .par_iter()
        .flat_map_iter(|&face| triangle_spans(screen, &triangle_positions(mesh, face)))
        .collect();
    let span_count = spans.len() as u32;
    spans.truncate(capacity as usize);
    SpanList { spans, span_count }
}

pub fn all_faces(mesh: &MeshData) -> Vec<u32> {
    (0..triangle_count(mesh)).collect()
}

fn atomic_words(count: usize, value: u32) -> Vec<AtomicU32> {
    (0..count).map(|_| AtomicU32::new(value)).collect()
}

fn into_words(words: Vec<AtomicU32>) -> Vec<u32> {
    words.into_iter().map(AtomicU32::into_inner).collect()
}

fn span_depths(span: &GpuSpan) -> impl Iterator<Item = (i32, u32)> + '_ {
    (span.x_start..=span.x_end).filter_map(move |x| {
        let z = span.z_start + span.dzdx * (x - span.x_start) as f32;
        (z <= 1.0).then(|| (x, depth_bits(z)))
    })
}

/// Phase Work: every span in parallel, per-pixel spinlock around the
/// depth and colour read-modify-write
pub fn resolve_spans(
    spans: &[GpuSpan],
    width: u32,
    height: u32,
    light_direction: Vector3<f32>,
) -> PixelImage {
    let pixels = (width * height) as usize;
    let locks = atomic_words(pixels, UNLOCKED);
    let depth = atomic_words(pixels, DEPTH_SENTINEL);
    let color = atomic_words(pixels, 0);

    spans.par_iter().for_each(|span| {
        let packed = pack_rgba8(shade_normal(Vector3::from(span.normal), light_direction));
        let row = span.y as u32 * width;

        for (x, bits) in span_depths(span) {
            let pixel = (row + x as u32) as usize;
            loop {
                if locks[pixel]
                    .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    let stored_depth = depth[pixel].load(Ordering::Relaxed);
                    let stored_color = color[pixel].load(Ordering::Relaxed);
                    if bits < stored_depth || (bits == stored_depth && packed < stored_color) {
                        depth[pixel].store(bits, Ordering::Relaxed);
                        color[pixel].store(packed, Ordering::Relaxed);
                    }
                    locks[pixel].store(UNLOCKED, Ordering::Release);
                    break;
                }
                std::hint::spin_loop();
            }
        }
    });

    PixelImage {
        width,
        height,
        depth: into_words(depth),
        color: into_words(color),
    }
}

/// Depth pass only: atomic min of every covered pixel
pub fn depth_pass(spans: &[GpuSpan], width: u32, height: u32) -> Vec<u32> {
    let depth = atomic_words((width * height) as usize, DEPTH_SENTINEL);
    spans.par_iter().for_each(|span| {
        let row = span.y as u32 * width;
        for (x, bits) in span_depths(span) {
            depth[(row + x as u32) as usize].fetch_min(bits, Ordering::Relaxed);
        }
    });
    into_words(depth)
}

/// Two-pass resolve: atomic-min depth, then shade fragments equal to it
pub fn rasterize_two_pass(
    spans: &[GpuSpan],
    width: u32,
    height: u32,
    light_direction: Vector3<f32>,
) -> PixelImage {
    let depth = depth_pass(spans, width, height);
    let color = atomic_words((width * height) as usize, 0);

    spans.par_iter().for_each(|span| {
        let packed = pack_rgba8(shade_normal(Vector3::from(span.normal), light_direction));
        let row = span.y as u32 * width;
        for (x, bits) in span_depths(span) {
            let pixel = (row + x as u32) as usize;
            if depth[pixel] == bits {
                color[pixel].store(packed, Ordering::Relaxed);
            }
        }
    });

    PixelImage {
        width,
        height,
        depth,
        color: into_words(color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{build_scene, unit_face_normal, SceneKind};
    use crate::reference::front_screen;

    fn light() -> Vector3<f32> {
        Vector3::new(-0.6, 0.3, 1.0)
    }

    #[test]
    fn test_projection_centre_and_depth_order() {
        let screen = front_screen(64, 64);
        let centre = project_point(&screen, Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert!((centre.x - 32.0).abs() < 1e-3 && (centre.y - 32.0).abs() < 1e-3);
        let near = project_point(&screen, Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert!(near.z < centre.z);
        assert!(project_point(&screen, Point3::new(0.0, 0.0, 3.0)).is_none());
    }

    #[test]
    fn test_adjacent_triangles_share_no_pixels() {
        let screen = front_screen(32, 32);
        let quad = [
            Point3::new(-0.5, -0.5, 0.0),
            Point3::new(0.5, -0.5, 0.0),
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(-0.5, 0.5, 0.0),
        ];
        let first = triangle_spans(&screen, &[quad[0], quad[1], quad[2]]);
        let second = triangle_spans(&screen, &[quad[0], quad[2], quad[3]]);

        let mut covered = std::collections::HashSet::new();
        for span in first.iter().chain(second.iter()) {
            for x in span.x_start..=span.x_end {
                assert!(covered.insert((x, span.y)), "pixel ({}, {}) drawn twice", x, span.y);
            }
        }
        // Quad covers a quarter of the view in each axis: 8x8 pixels
        assert_eq!(covered.len(), 64);
    }

    #[test]
    fn test_triangle_behind_eye_is_skipped() {
        let screen = front_screen(16, 16);
        let behind = [
            Point3::new(-1.0, -1.0, 3.0),
            Point3::new(1.0, -1.0, 3.0),
            Point3::new(0.0, 1.0, 3.0),
        ];
        assert!(triangle_spans(&screen, &behind).is_empty());
    }

    #[test]
    fn test_overlap_resolves_to_near_colour_in_any_order() {
        let mesh = build_scene(&SceneKind::OverlapPair).unwrap();
        let screen = front_screen(64, 64);
        let list = generate_spans(&mesh, &all_faces(&mesh), &screen, u32::MAX);
        let near_color = pack_rgba8(shade_normal(
            unit_face_normal(&triangle_positions(&mesh, 1)),
            light(),
        ));

        let forward = resolve_spans(&list.spans, 64, 64, light());
        let mut reversed_spans = list.spans.clone();
        reversed_spans.reverse();
        let reversed = resolve_spans(&reversed_spans, 64, 64, light());

        assert_eq!(forward, reversed);
        assert_eq!(forward.pixel(32, 32).1, near_color);
    }

    #[test]
    fn test_scanline_matches_two_pass_depth() {
        let mesh = build_scene(&SceneKind::BoxField { count: 64, seed: 3 }).unwrap();
        let screen = front_screen(96, 64);
        let list = generate_spans(&mesh, &all_faces(&mesh), &screen, u32::MAX);

        let scanline = resolve_spans(&list.spans, 96, 64, light());
        let two_pass = rasterize_two_pass(&list.spans, 96, 64, light());
        assert_eq!(scanline.depth, two_pass.depth);
    }

    #[test]
    fn test_truncated_spans_never_go_nearer() {
        let mesh = build_scene(&SceneKind::BoxField { count: 64, seed: 5 }).unwrap();
        let screen = front_screen(64, 64);
        let full = generate_spans(&mesh, &all_faces(&mesh), &screen, u32::MAX);
        let capped = generate_spans(&mesh, &all_faces(&mesh), &screen, full.span_count / 2);
        assert_eq!(capped.span_count, full.span_count);
        assert_eq!(capped.spans.len() as u32, full.span_count / 2);

        let exact = resolve_spans(&full.spans, 64, 64, light()).depth;
        let truncated = resolve_spans(&capped.spans, 64, 64, light()).depth;
        for (t, e) in truncated.iter().zip(exact.iter()) {
            assert!(t >= e);
        }
    }
}
