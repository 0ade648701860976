//! Mesh operations - Pure DOP functions
//!
//! Validation, derived data (bounds, edges, face normals) and upload of a
//! mesh into its GPU geometry store.

use super::aabb::{aabb_from_points, AABB};
use super::mesh_data::{GeometryStore, MeshData};
use crate::error::{invalid_mesh, VisibilityResult};
use cgmath::{InnerSpace, Point3, Vector3};
use std::collections::HashSet;
use wgpu::util::DeviceExt;

// ============================================================================
// CONSTRUCTION
// ============================================================================

/// Validate positions and indices and compute the bounding box
pub fn create_mesh(positions: &[[f32; 3]], indices: Vec<u32>) -> VisibilityResult<MeshData> {
    if positions.is_empty() {
        return Err(invalid_mesh("mesh has no vertices"));
    }
    if indices.is_empty() || indices.len() % 3 != 0 {
        return Err(invalid_mesh(format!(
            "index count {} is not a non-zero multiple of three",
            indices.len()
        )));
    }
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(invalid_mesh(format!(
            "index {} out of range for {} vertices",
            bad,
            positions.len()
        )));
    }
    if positions.iter().flatten().any(|c| !c.is_finite()) {
        return Err(invalid_mesh("vertex positions must be finite"));
    }

    let bounds = aabb_from_points(indices.iter().map(|&i| {
        let p = positions[i as usize];
        Point3::new(p[0], p[1], p[2])
    }));

    Ok(MeshData {
        positions: positions.iter().map(|p| [p[0], p[1], p[2], 1.0]).collect(),
        indices,
        bounds,
    })
}

// ============================================================================
// QUERIES
// ============================================================================

pub fn triangle_count(mesh: &MeshData) -> u32 {
    (mesh.indices.len() / 3) as u32
}

/// World-space corners of a triangle
pub fn triangle_positions(mesh: &MeshData, face: u32) -> [Point3<f32>; 3] {
    let base = face as usize * 3;
    let fetch = |i: usize| {
        let p = mesh.positions[mesh.indices[base + i] as usize];
        Point3::new(p[0], p[1], p[2])
    };
    [fetch(0), fetch(1), fetch(2)]
}

/// Bounds of a single triangle
pub fn triangle_bounds(mesh: &MeshData, face: u32) -> AABB {
    aabb_from_points(triangle_positions(mesh, face))
}

/// Unnormalised geometric normal of counter-clockwise winding
pub fn face_normal(corners: &[Point3<f32>; 3]) -> Vector3<f32> {
    (corners[1] - corners[0]).cross(corners[2] - corners[0])
}

/// Unit face normal, falling back to +Z for degenerate triangles
pub fn unit_face_normal(corners: &[Point3<f32>; 3]) -> Vector3<f32> {
    let n = face_normal(corners);
    if n.magnitude2() > 0.0 {
        n.normalize()
    } else {
        Vector3::unit_z()
    }
}

/// Line list over every distinct undirected triangle edge
pub fn build_edge_indices(indices: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(indices.len());
    let mut edges = Vec::with_capacity(indices.len() * 2);

    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            if a != b && seen.insert(key) {
                edges.push(a);
                edges.push(b);
            }
        }
    }

    edges
}

// ============================================================================
// GPU UPLOAD
// ============================================================================

/// Upload a mesh. Buffers are immutable until the next load.
pub fn create_geometry_store(device: &wgpu::Device, mesh: &MeshData) -> GeometryStore {
    let edges = build_edge_indices(&mesh.indices);

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Geometry Vertex Buffer"),
        contents: bytemuck::cast_slice(&mesh.positions),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Geometry Index Buffer"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDEX,
    });

    let edge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Geometry Edge Buffer"),
        contents: bytemuck::cast_slice(&edges),
        usage: wgpu::BufferUsages::INDEX,
    });

    log::info!(
        "[Geometry] Uploaded {} vertices, {} triangles, {} edges",
        mesh.positions.len(),
        triangle_count(mesh),
        edges.len() / 2
    );

    GeometryStore {
        vertex_buffer,
        index_buffer,
        edge_buffer,
        vertex_count: mesh.positions.len() as u32,
        triangle_count: triangle_count(mesh),
        edge_index_count: edges.len() as u32,
        bounds: mesh.bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        create_mesh(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn test_create_mesh_bounds() {
        let mesh = quad();
        assert_eq!(triangle_count(&mesh), 2);
        assert_eq!(mesh.bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.bounds.max, Point3::new(1.0, 1.0, 0.0));
        assert!(mesh.positions.iter().all(|p| p[3] == 1.0));
    }

    #[test]
    fn test_rejects_bad_indices() {
        assert!(create_mesh(&[[0.0; 3]; 3], vec![0, 1]).is_err());
        assert!(create_mesh(&[[0.0; 3]; 3], vec![0, 1, 3]).is_err());
        assert!(create_mesh(&[], vec![0, 1, 2]).is_err());
        assert!(create_mesh(&[[f32::NAN, 0.0, 0.0]; 3], vec![0, 1, 2]).is_err());
    }

    #[test]
    fn test_edges_are_deduplicated() {
        // The shared diagonal 0-2 appears once
        let edges = build_edge_indices(&quad().indices);
        assert_eq!(edges.len(), 5 * 2);
    }

    #[test]
    fn test_face_normal_winding() {
        let mesh = quad();
        let n = unit_face_normal(&triangle_positions(&mesh, 0));
        assert!((n - Vector3::unit_z()).magnitude() < 1e-6);
        let degenerate = [Point3::new(0.0, 0.0, 0.0); 3];
        assert_eq!(unit_face_normal(&degenerate), Vector3::unit_z());
    }
}
