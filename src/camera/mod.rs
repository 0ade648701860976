//! Orbit camera - DOP style
//!
//! Data in camera_data.rs, pure transforms in camera_operations.rs.

pub mod camera_data;
pub mod camera_operations;

pub use camera_data::CameraData;
pub use camera_operations::{
    build_projection_matrix, build_view_matrix, build_view_projection, camera_eye,
    init_camera_for_bounds, orbit_camera, refit_camera, update_aspect_ratio, zoom_camera,
};
