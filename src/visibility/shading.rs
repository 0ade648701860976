//! Host copies of the small numeric helpers in common.wgsl

use cgmath::{InnerSpace, Vector3};

const BASE_COLOR: [f32; 3] = [0.95, 0.85, 0.7];

/// Flat Lambert colour of a face, same formula as `shade` in WGSL
pub fn shade_normal(normal: Vector3<f32>, light_dir: Vector3<f32>) -> [f32; 4] {
    let n = if normal.magnitude2() > 0.0 {
        normal.normalize()
    } else {
        Vector3::unit_z()
    };
    let intensity = 0.2 + 0.8 * n.dot(light_dir.normalize()).max(0.0);
    [
        BASE_COLOR[0] * intensity,
        BASE_COLOR[1] * intensity,
        BASE_COLOR[2] * intensity,
        1.0,
    ]
}

/// `pack4x8unorm`
pub fn pack_rgba8(color: [f32; 4]) -> u32 {
    color
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.clamp(0.0, 1.0) * 255.0 + 0.5).floor() as u32) << (i * 8))
        .fold(0, |acc, byte| acc | byte)
}

pub fn unpack_rgba8(packed: u32) -> [u8; 4] {
    packed.to_le_bytes()
}

/// `depth_bits`: non-negative depth as order-preserving bits
pub fn depth_bits(z: f32) -> u32 {
    z.max(0.0).to_bits() & 0x7FFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_matches_unorm_rounding() {
        let packed = pack_rgba8([1.0, 0.0, 0.5, 1.0]);
        assert_eq!(unpack_rgba8(packed), [255, 0, 128, 255]);
    }

    #[test]
    fn test_depth_bits_preserve_order() {
        let depths = [0.0f32, 1.0e-7, 0.25, 0.5, 0.999, 1.0];
        for pair in depths.windows(2) {
            assert!(depth_bits(pair[0]) < depth_bits(pair[1]));
        }
        assert_eq!(depth_bits(-0.0), 0);
        assert!(depth_bits(1.0) < crate::constants::pyramid::DEPTH_SENTINEL);
    }

    #[test]
    fn test_back_facing_gets_ambient() {
        let color = shade_normal(-Vector3::unit_z(), Vector3::unit_z());
        assert!((color[0] - 0.95 * 0.2).abs() < 1e-6);
    }
}
