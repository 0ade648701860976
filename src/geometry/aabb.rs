/// Data-Oriented Axis-Aligned Bounding Box
///
/// Pure functions over bounds data - no methods, just data transformations.
use cgmath::{InnerSpace, Point3, Vector3};

/// Axis-Aligned Bounding Box - pure data structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

/// Create new AABB from min/max points
pub fn create_aabb(min: Point3<f32>, max: Point3<f32>) -> AABB {
    AABB { min, max }
}

/// Inverted bounds that any extend operation replaces
pub fn empty_aabb() -> AABB {
    AABB {
        min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
        max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
    }
}

/// Grow AABB to contain a point (mutating)
pub fn aabb_extend(aabb: &mut AABB, point: Point3<f32>) {
    aabb.min.x = aabb.min.x.min(point.x);
    aabb.min.y = aabb.min.y.min(point.y);
    aabb.min.z = aabb.min.z.min(point.z);
    aabb.max.x = aabb.max.x.max(point.x);
    aabb.max.y = aabb.max.y.max(point.y);
    aabb.max.z = aabb.max.z.max(point.z);
}

/// Bounds of a point set. Returns the empty AABB for no points.
pub fn aabb_from_points<I>(points: I) -> AABB
where
    I: IntoIterator<Item = Point3<f32>>,
{
    let mut aabb = empty_aabb();
    for point in points {
        aabb_extend(&mut aabb, point);
    }
    aabb
}

/// Get center point of AABB
pub fn aabb_center(aabb: &AABB) -> Point3<f32> {
    Point3::new(
        (aabb.min.x + aabb.max.x) * 0.5,
        (aabb.min.y + aabb.max.y) * 0.5,
        (aabb.min.z + aabb.max.z) * 0.5,
    )
}

/// Full edge lengths of AABB
pub fn aabb_extent(aabb: &AABB) -> Vector3<f32> {
    aabb.max - aabb.min
}

/// Length of the AABB diagonal
pub fn aabb_diagonal_length(aabb: &AABB) -> f32 {
    aabb_extent(aabb).magnitude()
}

/// Test if AABB contains a point (inclusive)
pub fn aabb_contains_point(aabb: &AABB, point: Point3<f32>) -> bool {
    point.x >= aabb.min.x && point.x <= aabb.max.x &&
    point.y >= aabb.min.y && point.y <= aabb.max.y &&
    point.z >= aabb.min.z && point.z <= aabb.max.z
}

/// Test if `outer` fully contains `inner` (inclusive)
pub fn aabb_contains_aabb(outer: &AABB, inner: &AABB) -> bool {
    aabb_contains_point(outer, inner.min) && aabb_contains_point(outer, inner.max)
}

/// The eight corners of AABB
pub fn aabb_corners(aabb: &AABB) -> [Point3<f32>; 8] {
    let (a, b) = (aabb.min, aabb.max);
    [
        Point3::new(a.x, a.y, a.z),
        Point3::new(b.x, a.y, a.z),
        Point3::new(a.x, b.y, a.z),
        Point3::new(b.x, b.y, a.z),
        Point3::new(a.x, a.y, b.z),
        Point3::new(b.x, a.y, b.z),
        Point3::new(a.x, b.y, b.z),
        Point3::new(b.x, b.y, b.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let aabb = aabb_from_points([
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 3.0),
        ]);
        assert_eq!(aabb.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb_center(&aabb), Point3::new(0.0, 0.0, 1.5));
    }

    #[test]
    fn test_diagonal_length() {
        let aabb = create_aabb(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert!((aabb_diagonal_length(&aabb) - 12.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_contains() {
        let outer = create_aabb(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0));
        let inner = create_aabb(Point3::new(1.0, 1.0, 1.0), Point3::new(4.0, 2.0, 2.0));
        assert!(aabb_contains_aabb(&outer, &inner));
        assert!(!aabb_contains_aabb(&inner, &outer));
    }
}
