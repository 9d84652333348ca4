//! World-space axis-aligned bounding boxes for regions and their meshes.

use glam::DVec3;

/// An axis-aligned bounding box in world space.
///
/// Invariant: `min <= max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: DVec3,
    /// Maximum corner of the bounding box.
    pub max: DVec3,
}

impl Aabb {
    /// Create an AABB from two corners, sorting components so that
    /// `min <= max` on every axis.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// A cube of edge length `size` centred on `center`.
    pub fn from_center_size(center: DVec3, size: f64) -> Self {
        let half = DVec3::splat(size * 0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents (half-size along each axis).
    pub fn extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns the size along each axis.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Volume of the box.
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns true if `other` lies entirely inside this box.
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Volume shared by the two boxes. Touching faces share zero volume.
    pub fn overlap_volume(&self, other: &Aabb) -> f64 {
        let lo = self.min.max(other.min);
        let hi = self.max.min(other.max);
        let d = (hi - lo).max(DVec3::ZERO);
        d.x * d.y * d.z
    }

    /// Returns the smallest AABB enclosing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_corners() {
        let aabb = Aabb::new(DVec3::new(5.0, -1.0, 3.0), DVec3::new(-2.0, 4.0, 0.0));
        assert_eq!(aabb.min, DVec3::new(-2.0, -1.0, 0.0));
        assert_eq!(aabb.max, DVec3::new(5.0, 4.0, 3.0));
    }

    #[test]
    fn test_from_center_size() {
        let aabb = Aabb::from_center_size(DVec3::new(10.0, 0.0, 0.0), 4.0);
        assert_eq!(aabb.min, DVec3::new(8.0, -2.0, -2.0));
        assert_eq!(aabb.max, DVec3::new(12.0, 2.0, 2.0));
        assert_eq!(aabb.center(), DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(aabb.extents(), DVec3::splat(2.0));
        assert_eq!(aabb.volume(), 64.0);
    }

    #[test]
    fn test_contains_point_includes_boundary() {
        let aabb = Aabb::from_center_size(DVec3::ZERO, 2.0);
        assert!(aabb.contains_point(DVec3::new(1.0, 1.0, 1.0)));
        assert!(!aabb.contains_point(DVec3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(1.0));
        let b = Aabb::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        assert_eq!(a.overlap_volume(&b), 0.0);
        assert_eq!(a.union(&b).volume(), 2.0);
    }

    #[test]
    fn test_overlap_volume() {
        let a = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        let b = Aabb::new(DVec3::splat(1.0), DVec3::splat(3.0));
        assert_eq!(a.overlap_volume(&b), 1.0);
        assert!(a.union(&b).contains_aabb(&a));
    }
}
