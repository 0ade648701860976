/// Procedural Test Scenes
///
/// Mesh loading from files is not part of this crate; these generators
/// stand in for a loader and return the same (positions, indices, bounds)
/// triple a loader would.
use super::mesh_data::MeshData;
use super::mesh_operations::create_mesh;
use crate::error::VisibilityResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Which procedural mesh to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneKind {
    /// Two stacked triangles, the near one fully covering the centre of the far one
    OverlapPair,
    /// Unit cube spanning [-1, 1]
    Cube,
    /// Random axis-aligned boxes inside [-1, 1]
    BoxField { count: u32, seed: u64 },
}

impl Default for SceneKind {
    fn default() -> Self {
        SceneKind::BoxField {
            count: 2048,
            seed: 7,
        }
    }
}

/// Build the mesh for a scene
pub fn build_scene(kind: &SceneKind) -> VisibilityResult<MeshData> {
    match *kind {
        SceneKind::OverlapPair => overlap_pair(),
        SceneKind::Cube => {
            let mut positions = Vec::new();
            let mut indices = Vec::new();
            push_box(&mut positions, &mut indices, [-1.0; 3], [1.0; 3]);
            create_mesh(&positions, indices)
        }
        SceneKind::BoxField { count, seed } => box_field(count, seed),
    }
}

/// Same scene with a different random seed; non-random scenes are returned unchanged
pub fn reseed_scene(kind: &SceneKind) -> SceneKind {
    match *kind {
        SceneKind::BoxField { count, seed } => SceneKind::BoxField {
            count,
            seed: seed.wrapping_add(1),
        },
        other => other,
    }
}

/// Near triangle in the plane z = 1 facing +Z, far triangle tilted through the
/// origin. Seen from (0, 0, 2) the two sit at distances 1 and about 2.
fn overlap_pair() -> VisibilityResult<MeshData> {
    let positions = [
        // Near
        [-0.5, -0.5, 1.0],
        [0.5, -0.5, 1.0],
        [0.0, 0.5, 1.0],
        // Far, plane z = -x / 2
        [-0.9, -0.9, 0.45],
        [0.9, -0.9, -0.45],
        [0.0, 0.9, 0.0],
    ];
    // Far first so the near triangle cannot win by submission order
    create_mesh(&positions, vec![3, 4, 5, 0, 1, 2])
}

fn box_field(count: u32, seed: u64) -> VisibilityResult<MeshData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = count.max(1);
    let mut positions = Vec::with_capacity(count as usize * 8);
    let mut indices = Vec::with_capacity(count as usize * 36);

    for _ in 0..count {
        let half: f32 = rng.gen_range(0.01..0.12);
        let center = [
            rng.gen_range(-1.0 + half..1.0 - half),
            rng.gen_range(-1.0 + half..1.0 - half),
            rng.gen_range(-1.0 + half..1.0 - half),
        ];
        push_box(
            &mut positions,
            &mut indices,
            [center[0] - half, center[1] - half, center[2] - half],
            [center[0] + half, center[1] + half, center[2] + half],
        );
    }

    create_mesh(&positions, indices)
}

/// Append a closed box with outward counter-clockwise faces
fn push_box(positions: &mut Vec<[f32; 3]>, indices: &mut Vec<u32>, min: [f32; 3], max: [f32; 3]) {
    let base = positions.len() as u32;
    for i in 0..8u32 {
        positions.push([
            if i & 1 == 0 { min[0] } else { max[0] },
            if i & 2 == 0 { min[1] } else { max[1] },
            if i & 4 == 0 { min[2] } else { max[2] },
        ]);
    }

    const FACES: [[u32; 4]; 6] = [
        [0, 2, 3, 1], // -Z
        [4, 5, 7, 6], // +Z
        [0, 1, 5, 4], // -Y
        [2, 6, 7, 3], // +Y
        [0, 4, 6, 2], // -X
        [1, 3, 7, 5], // +X
    ];
    for [a, b, c, d] in FACES {
        indices.extend_from_slice(&[base + a, base + b, base + c, base + a, base + c, base + d]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_operations::{triangle_count, triangle_positions, unit_face_normal};
    use cgmath::{EuclideanSpace, InnerSpace, Point3};

    #[test]
    fn test_cube_normals_point_outward() {
        let mesh = build_scene(&SceneKind::Cube).unwrap();
        assert_eq!(triangle_count(&mesh), 12);
        for face in 0..12 {
            let corners = triangle_positions(&mesh, face);
            let centroid = Point3::centroid(&corners);
            let n = unit_face_normal(&corners);
            assert!(n.dot(centroid.to_vec()) > 0.0, "face {} points inward", face);
        }
    }

    #[test]
    fn test_box_field_is_deterministic() {
        let kind = SceneKind::BoxField { count: 32, seed: 3 };
        let a = build_scene(&kind).unwrap();
        let b = build_scene(&kind).unwrap();
        assert_eq!(a.positions, b.positions);
        assert_eq!(triangle_count(&a), 32 * 12);
        assert!(a.bounds.min.x >= -1.0 && a.bounds.max.z <= 1.0);

        let c = build_scene(&reseed_scene(&kind)).unwrap();
        assert_ne!(a.positions, c.positions);
    }

    #[test]
    fn test_overlap_pair_bounds() {
        let mesh = build_scene(&SceneKind::OverlapPair).unwrap();
        assert_eq!(triangle_count(&mesh), 2);
        assert!(mesh.bounds.min.x >= -1.0 && mesh.bounds.max.z <= 1.0);
    }
}
