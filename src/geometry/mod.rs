//! Geometry Store
//!
//! Immutable per-load mesh data and its GPU buffers.

pub mod aabb;
pub mod mesh_data;
pub mod mesh_operations;
pub mod scenes;

pub use aabb::AABB;
pub use mesh_data::{GeometryStore, MeshData};
pub use mesh_operations::{
    build_edge_indices, create_geometry_store, create_mesh, triangle_bounds, triangle_count,
    triangle_positions, unit_face_normal,
};
pub use scenes::{build_scene, reseed_scene, SceneKind};
