//! Camera data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in camera_operations.rs

use crate::constants;
use cgmath::Point3;

/// Orbit camera around a target point
#[derive(Debug, Clone, Copy)]
pub struct CameraData {
    /// Point the camera looks at (usually the mesh centre)
    pub target: Point3<f32>,

    /// Eye distance from the target
    pub distance: f32,

    /// Yaw rotation (radians, around Y axis). Zero puts the eye on +Z.
    pub yaw_radians: f32,

    /// Pitch rotation (radians). Positive raises the eye.
    pub pitch_radians: f32,

    /// Field of view (vertical, radians)
    pub fov_radians: f32,

    /// Aspect ratio (width / height)
    pub aspect_ratio: f32,

    /// Near clipping plane distance
    pub near_plane: f32,

    /// Far clipping plane distance
    pub far_plane: f32,

    /// Rotation sensitivity (radians per pixel)
    pub rotation_sensitivity: f32,

    /// Fraction of the distance removed per wheel notch
    pub zoom_sensitivity: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            target: Point3::new(0.0, 0.0, 0.0),
            distance: 2.0,
            yaw_radians: 0.0,
            pitch_radians: 0.0,
            fov_radians: constants::camera::FOV_DEGREES.to_radians(),
            aspect_ratio: 1.0,
            near_plane: constants::camera::NEAR_PLANE,
            far_plane: constants::camera::FAR_PLANE,
            rotation_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
        }
    }
}
