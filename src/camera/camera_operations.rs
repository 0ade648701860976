//! Camera operations - Pure DOP functions
//!
//! All functions are pure: they take data, return new data, no side effects.
//! No methods, no self, just transformations.

use super::camera_data::CameraData;
use crate::geometry::aabb::{aabb_center, aabb_diagonal_length, AABB};
use cgmath::{Matrix4, Point3, Rad, Vector3};

/// Maps cgmath's OpenGL clip depth [-1, 1] to wgpu's [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const MAX_PITCH: f32 = 1.55;
const MIN_DISTANCE: f32 = 1.0e-3;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Frame a bounding box from slightly above the +Z side
pub fn init_camera_for_bounds(bounds: &AABB, aspect_ratio: f32) -> CameraData {
    let radius = (aabb_diagonal_length(bounds) * 0.5).max(MIN_DISTANCE);
    let defaults = CameraData::default();
    // Sphere of `radius` fits the vertical fov
    let distance = radius / (defaults.fov_radians * 0.5).sin();

    CameraData {
        target: aabb_center(bounds),
        distance,
        yaw_radians: 0.6,
        pitch_radians: 0.4,
        aspect_ratio,
        ..defaults
    }
}

/// Frame new bounds but keep the current orbit angles
pub fn refit_camera(camera: &CameraData, bounds: &AABB) -> CameraData {
    CameraData {
        yaw_radians: camera.yaw_radians,
        pitch_radians: camera.pitch_radians,
        ..init_camera_for_bounds(bounds, camera.aspect_ratio)
    }
}

// ============================================================================
// VIEW/PROJECTION MATRICES
// ============================================================================

/// Eye position implied by the orbit parameters
pub fn camera_eye(camera: &CameraData) -> Point3<f32> {
    let (sin_yaw, cos_yaw) = camera.yaw_radians.sin_cos();
    let (sin_pitch, cos_pitch) = camera.pitch_radians.sin_cos();
    camera.target
        + Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * camera.distance
}

/// Build view matrix from camera data
pub fn build_view_matrix(camera: &CameraData) -> Matrix4<f32> {
    Matrix4::look_at_rh(camera_eye(camera), camera.target, Vector3::unit_y())
}

/// Build projection matrix from camera data, wgpu depth range
pub fn build_projection_matrix(camera: &CameraData) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX
        * cgmath::perspective(
            Rad(camera.fov_radians),
            camera.aspect_ratio,
            camera.near_plane,
            camera.far_plane,
        )
}

pub fn build_view_projection(camera: &CameraData) -> Matrix4<f32> {
    build_projection_matrix(camera) * build_view_matrix(camera)
}

// ============================================================================
// INPUT TRANSFORMS
// ============================================================================

/// Rotate around the target by a mouse delta in pixels
pub fn orbit_camera(camera: &CameraData, delta_x: f32, delta_y: f32) -> CameraData {
    CameraData {
        yaw_radians: camera.yaw_radians - delta_x * camera.rotation_sensitivity,
        pitch_radians: (camera.pitch_radians + delta_y * camera.rotation_sensitivity)
            .clamp(-MAX_PITCH, MAX_PITCH),
        ..*camera
    }
}

/// Move toward (positive notches) or away from the target
pub fn zoom_camera(camera: &CameraData, notches: f32) -> CameraData {
    let scale = (1.0 - camera.zoom_sensitivity).powf(notches);
    CameraData {
        distance: (camera.distance * scale).max(camera.near_plane * 2.0),
        ..*camera
    }
}

/// Update aspect ratio after a resize. Zero-sized windows keep the old value.
pub fn update_aspect_ratio(camera: &CameraData, width: u32, height: u32) -> CameraData {
    if width == 0 || height == 0 {
        return *camera;
    }
    CameraData {
        aspect_ratio: width as f32 / height as f32,
        ..*camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    #[test]
    fn test_default_eye_on_positive_z() {
        let camera = CameraData::default();
        let eye = camera_eye(&camera);
        assert!((eye - Point3::new(0.0, 0.0, 2.0)).magnitude() < 1e-6);
    }

    #[test]
    fn test_projection_depth_range() {
        let camera = CameraData::default();
        let vp = build_view_projection(&camera);
        // Point one unit in front of the eye
        let clip = vp * Vector4::new(0.0, 0.0, 1.0, 1.0);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
        // Farther points get larger depth
        let far = vp * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(far.z / far.w > depth);
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let camera = orbit_camera(&CameraData::default(), 0.0, 1.0e6);
        assert!(camera.pitch_radians <= MAX_PITCH);
    }

    #[test]
    fn test_zero_sized_resize_keeps_aspect() {
        let camera = update_aspect_ratio(&CameraData::default(), 0, 0);
        assert_eq!(camera.aspect_ratio, 1.0);
        let camera = update_aspect_ratio(&camera, 1280, 720);
        assert!((camera.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
    }
}
