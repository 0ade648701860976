//! Mesh data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Construction and validation live in mesh_operations.rs

use super::aabb::AABB;

/// A loaded, validated triangle mesh
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Vertex positions, `w` is always 1 so shaders can pull them as `vec4<f32>`
    pub positions: Vec<[f32; 4]>,

    /// Triangle list indices, length is a multiple of three
    pub indices: Vec<u32>,

    /// Bounds of all referenced vertices
    pub bounds: AABB,
}

/// GPU-resident copy of a mesh, recreated on every mesh load
pub struct GeometryStore {
    /// Positions, bound as storage for vertex pulling and as a vertex buffer for wireframe
    pub vertex_buffer: wgpu::Buffer,

    /// Triangle indices, bound as storage
    pub index_buffer: wgpu::Buffer,

    /// Deduplicated undirected edges as a line list
    pub edge_buffer: wgpu::Buffer,

    pub vertex_count: u32,
    pub triangle_count: u32,
    pub edge_index_count: u32,
    pub bounds: AABB,
}
