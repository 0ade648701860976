//! Host octree model
//!
//! Concurrent insertion with a bump allocator and head exchange, and the
//! coarse-to-fine level tester, both on the rayon pool. Cell layout and
//! marker bits are shared with the GPU index.

use super::pyramid::hiz_box_visible;
use super::raster::ScreenTransform;
use crate::constants::octree::{
    resolution, EMPTY_HEAD, LEVEL_COUNT, MARKER_CULLED, MARKER_OCCUPIED, MARKER_OVERSIZE,
    START_LEVEL,
};
use crate::geometry::{triangle_bounds, triangle_count, MeshData};
use crate::visibility::depth_pyramid_data::PyramidLayout;
use crate::visibility::octree_data::OctreeLayout;
use crate::visibility::octree_operations::{
    cell_coords, cell_index, create_octree_layout, loose_cell_bounds, marker_count,
    marker_is_culled, marker_is_occupied, marker_is_oversize, place_triangle, to_unit,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

fn atomic_words(count: usize, value: u32) -> Vec<AtomicU32> {
    (0..count).map(|_| AtomicU32::new(value)).collect()
}

/// Host mirror of the cell buffer, node pool and counters
pub struct CpuOctree {
    pub layout: OctreeLayout,
    pub heads: Vec<AtomicU32>,
    pub markers: Vec<AtomicU32>,
    pub pool_face: Vec<AtomicU32>,
    pub pool_next: Vec<AtomicU32>,
    pub allocated: AtomicU32,
    pub dropped: AtomicU32,
}

impl CpuOctree {
    pub fn pool_capacity(&self) -> u32 {
        self.pool_face.len() as u32
    }

    /// Slots actually holding a node
    pub fn stored(&self) -> u32 {
        self.allocated.load(Ordering::Acquire).min(self.pool_capacity())
    }
}

fn insert_face(octree: &CpuOctree, mesh: &MeshData, face: u32) {
    let bounds = triangle_bounds(mesh, face);
    let placement = place_triangle(to_unit(bounds.min, &mesh.bounds), to_unit(bounds.max, &mesh.bounds));
    let index = cell_index(&octree.layout, placement.level, placement.cell) as usize;

    let slot = octree.allocated.fetch_add(1, Ordering::AcqRel);
    if slot >= octree.pool_capacity() {
        octree.dropped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // The slot is exclusively ours until the swap publishes it
    octree.pool_face[slot as usize].store(face, Ordering::Relaxed);
    let previous = octree.heads[index].swap(slot, Ordering::AcqRel);
    octree.pool_next[slot as usize].store(previous, Ordering::Release);

    let mut flags = MARKER_OCCUPIED;
    if placement.oversize {
        flags |= MARKER_OVERSIZE;
    }
    octree.markers[index].fetch_add(1, Ordering::Relaxed);
    octree.markers[index].fetch_or(flags, Ordering::Relaxed);

    let (mut level, mut cell) = (placement.level, placement.cell);
    while level > START_LEVEL {
        level -= 1;
        cell = [cell[0] / 2, cell[1] / 2, cell[2] / 2];
        let ancestor = cell_index(&octree.layout, level, cell) as usize;
        if octree.markers[ancestor].fetch_or(MARKER_OCCUPIED, Ordering::Relaxed) & MARKER_OCCUPIED != 0 {
            break;
        }
    }
}

/// Insert every face of `mesh` concurrently into a pool of `pool_capacity` nodes
pub fn build_octree(mesh: &MeshData, pool_capacity: u32) -> CpuOctree {
    let layout = create_octree_layout();
    let cells = layout.cell_count as usize;
    let octree = CpuOctree {
        layout,
        heads: atomic_words(cells, EMPTY_HEAD),
        markers: atomic_words(cells, 0),
        pool_face: atomic_words(pool_capacity as usize, 0),
        pool_next: atomic_words(pool_capacity as usize, EMPTY_HEAD),
        allocated: AtomicU32::new(0),
        dropped: AtomicU32::new(0),
    };

    (0..triangle_count(mesh))
        .into_par_iter()
        .for_each(|face| insert_face(&octree, mesh, face));
    octree
}

/// Faces in a cell's list; `None` if the walk exceeds the pool size (a cycle)
pub fn cell_list(octree: &CpuOctree, index: usize) -> Option<Vec<u32>> {
    let mut faces = Vec::new();
    let mut node = octree.heads[index].load(Ordering::Acquire);
    while node != EMPTY_HEAD {
        if faces.len() as u32 >= octree.pool_capacity() {
            return None;
        }
        faces.push(octree.pool_face[node as usize].load(Ordering::Relaxed));
        node = octree.pool_next[node as usize].load(Ordering::Acquire);
    }
    Some(faces)
}

/// The first `marker_count` faces of a cell's list, as the level tester walks them
pub fn counted_cell_list(octree: &CpuOctree, index: usize) -> Vec<u32> {
    let marker = octree.markers[index].load(Ordering::Relaxed);
    let mut faces = Vec::new();
    let mut node = octree.heads[index].load(Ordering::Acquire);
    let stored = marker_count(marker).min(octree.pool_capacity());
    while (faces.len() as u32) < stored && node != EMPTY_HEAD {
        faces.push(octree.pool_face[node as usize].load(Ordering::Relaxed));
        node = octree.pool_next[node as usize].load(Ordering::Acquire);
    }
    faces
}

/// Level-by-level tester; returns the emitted faces. Leaves CULLED set on
/// the markers it rejected, as the GPU pass does.
pub fn test_octree(
    octree: &CpuOctree,
    mesh: &MeshData,
    screen: &ScreenTransform,
    pyramid: &[u32],
    pyramid_layout: &PyramidLayout,
) -> Vec<u32> {
    let mut emitted = Vec::new();

    for level in START_LEVEL..LEVEL_COUNT {
        let r = resolution(level);
        let offset = octree.layout.levels[level as usize].offset;

        let level_faces: Vec<u32> = (0..r * r * r)
            .into_par_iter()
            .flat_map_iter(|local| {
                let cell = cell_coords(r, local);
                let index = (offset + local) as usize;
                let mut faces = Vec::new();

                if level > START_LEVEL {
                    let parent = cell_index(&octree.layout, level - 1, [cell[0] / 2, cell[1] / 2, cell[2] / 2]);
                    if marker_is_culled(octree.markers[parent as usize].load(Ordering::Relaxed)) {
                        octree.markers[index].fetch_or(MARKER_CULLED, Ordering::Relaxed);
                        return faces.into_iter();
                    }
                }

                let marker = octree.markers[index].load(Ordering::Relaxed);
                if !marker_is_occupied(marker) {
                    return faces.into_iter();
                }

                let oversize = marker_is_oversize(marker);
                let loose = loose_cell_bounds(&mesh.bounds, level, cell);
                if !hiz_box_visible(screen, pyramid, pyramid_layout, loose.min, loose.max) {
                    octree.markers[index].fetch_or(MARKER_CULLED, Ordering::Relaxed);
                    if !oversize {
                        return faces.into_iter();
                    }
                }

                for face in counted_cell_list(octree, index) {
                    let bounds = triangle_bounds(mesh, face);
                    if !oversize || hiz_box_visible(screen, pyramid, pyramid_layout, bounds.min, bounds.max) {
                        faces.push(face);
                    }
                }
                faces.into_iter()
            })
            .collect();

        emitted.extend(level_faces);
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{build_scene, SceneKind};
    use crate::reference::front_screen;
    use crate::visibility::depth_pyramid_operations::create_pyramid_layout;
    use crate::constants::pyramid::DEPTH_SENTINEL;
    use crate::reference::pyramid::build_pyramid;
    use std::collections::HashMap;

    fn box_field() -> MeshData {
        build_scene(&SceneKind::BoxField { count: 300, seed: 11 }).unwrap()
    }

    #[test]
    fn test_every_face_reachable_exactly_once() {
        let mesh = box_field();
        let octree = build_octree(&mesh, triangle_count(&mesh));
        assert_eq!(octree.dropped.load(Ordering::Relaxed), 0);

        let mut seen: HashMap<u32, usize> = HashMap::new();
        let mut total = 0;
        for index in 0..octree.layout.cell_count as usize {
            let faces = cell_list(&octree, index).expect("cycle in cell list");
            total += faces.len();
            for face in faces {
                *seen.entry(face).or_default() += 1;
            }
        }
        assert_eq!(total as u32, octree.stored());
        assert_eq!(seen.len() as u32, triangle_count(&mesh));
        assert!(seen.values().all(|&n| n == 1));
    }

    #[test]
    fn test_marker_count_matches_list_length() {
        let mesh = box_field();
        for capacity in [triangle_count(&mesh), triangle_count(&mesh) / 4] {
            let octree = build_octree(&mesh, capacity);
            let mut counted = 0;
            for index in 0..octree.layout.cell_count as usize {
                let marker = octree.markers[index].load(Ordering::Relaxed);
                let faces = cell_list(&octree, index).unwrap();
                assert_eq!(marker_count(marker) as usize, faces.len(), "cell {}", index);
                assert_eq!(counted_cell_list(&octree, index), faces);
                if marker_count(marker) > 0 {
                    assert!(marker_is_occupied(marker));
                }
                counted += marker_count(marker);
            }
            assert_eq!(counted, octree.stored());
        }
    }

    #[test]
    fn test_occupied_propagates_to_ancestors() {
        let mesh = box_field();
        let octree = build_octree(&mesh, triangle_count(&mesh));
        for level in (START_LEVEL + 1)..LEVEL_COUNT {
            let r = resolution(level);
            let offset = octree.layout.levels[level as usize].offset;
            for local in 0..r * r * r {
                let marker = octree.markers[(offset + local) as usize].load(Ordering::Relaxed);
                if !marker_is_occupied(marker) {
                    continue;
                }
                let c = cell_coords(r, local);
                let parent = cell_index(&octree.layout, level - 1, [c[0] / 2, c[1] / 2, c[2] / 2]);
                assert!(marker_is_occupied(octree.markers[parent as usize].load(Ordering::Relaxed)));
            }
        }
    }

    #[test]
    fn test_full_pool_drops_and_counts() {
        let mesh = box_field();
        let capacity = triangle_count(&mesh) / 3;
        let octree = build_octree(&mesh, capacity);
        assert_eq!(octree.stored(), capacity);
        assert_eq!(
            octree.dropped.load(Ordering::Relaxed),
            triangle_count(&mesh) - capacity
        );
    }

    #[test]
    fn test_empty_cells_emit_nothing() {
        let mesh = box_field();
        let octree = build_octree(&mesh, 0);
        assert!(octree.heads.iter().all(|h| h.load(Ordering::Relaxed) == EMPTY_HEAD));

        let layout = create_pyramid_layout(64, 64);
        let pyramid = build_pyramid(&vec![DEPTH_SENTINEL; 64 * 64], &layout);
        let emitted = test_octree(&octree, &mesh, &front_screen(64, 64), &pyramid, &layout);
        assert!(emitted.is_empty());
    }

    #[test]
    fn test_empty_pyramid_keeps_every_face() {
        let mesh = box_field();
        let octree = build_octree(&mesh, triangle_count(&mesh));
        let layout = create_pyramid_layout(64, 64);
        let pyramid = build_pyramid(&vec![DEPTH_SENTINEL; 64 * 64], &layout);

        // Camera far enough back that the whole field is on screen and in front
        let mut screen = front_screen(64, 64);
        screen.view_proj = screen.view_proj * cgmath::Matrix4::from_translation(cgmath::Vector3::new(0.0, 0.0, -4.0));

        let mut emitted = test_octree(&octree, &mesh, &screen, &pyramid, &layout);
        emitted.sort_unstable();
        assert_eq!(emitted, (0..triangle_count(&mesh)).collect::<Vec<_>>());
    }
}
