//! Host Reference Model
//!
//! CPU versions of every visibility kernel over the same buffer layouts
//! and numerics, used to check invariants without a GPU and to compare
//! against readbacks in the integration tests.

pub mod frame;
pub mod octree;
pub mod pyramid;
pub mod raster;

pub use frame::{hiz_survivors, naive_hiz_test, render_reference, ReferenceLimits};
pub use raster::{PixelImage, ScreenTransform};

use crate::camera::{build_view_projection, CameraData};
use cgmath::Point3;

/// Screen transform of the default orbit camera (eye at (0, 0, 2) looking at the origin)
pub fn front_screen(width: u32, height: u32) -> ScreenTransform {
    let camera = CameraData {
        target: Point3::new(0.0, 0.0, 0.0),
        aspect_ratio: width as f32 / height as f32,
        ..Default::default()
    };
    ScreenTransform {
        view_proj: build_view_projection(&camera),
        width,
        height,
    }
}
