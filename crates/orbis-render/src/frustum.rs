//! World-space frustum culling of region bounds.
//!
//! Planes are extracted from a view-projection matrix with a `[0, 1]` depth
//! range (the wgpu/D3D convention, `DMat4::perspective_rh`). Everything runs
//! in `f64` so planet-scale coordinates need no rebasing.

use glam::{DMat4, DVec3, DVec4};
use orbis_mesh::Aabb;

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Six inward-facing planes of a view frustum.
#[derive(Clone, Debug)]
pub struct Frustum {
    /// `(a, b, c, d)` with unit inward normal `(a, b, c)`.
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract the planes of a combined view-projection matrix
    /// (Griggs-Hartmann).
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // Depth runs 0..1, so the near plane is z >= 0.
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Perspective frustum of a camera at `eye` looking at `target`.
    ///
    /// `up` must not be parallel to the view direction.
    pub fn looking_at(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y_radians: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let view = DMat4::look_at_rh(eye, target, up);
        let proj = DMat4::perspective_rh(fov_y_radians, aspect, near, far);
        Self::from_view_projection(&(proj * view))
    }

    /// Whether `aabb` is at least partly inside the frustum.
    ///
    /// Conservative: boxes near frustum corners may pass while outside, but a
    /// visible box is never rejected.
    pub fn is_visible(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            // Corner furthest along the plane normal.
            let p = DVec3::select(normal.cmpge(DVec3::ZERO), aabb.max, aabb.min);
            normal.dot(p) + plane.w >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_frustum() -> Frustum {
        Frustum::looking_at(
            DVec3::ZERO,
            DVec3::NEG_Z,
            DVec3::Y,
            std::f64::consts::FRAC_PI_4,
            16.0 / 9.0,
            0.1,
            1000.0,
        )
    }

    fn aabb(min: [f64; 3], max: [f64; 3]) -> Aabb {
        Aabb::new(DVec3::from_array(min), DVec3::from_array(max))
    }

    #[test]
    fn test_object_in_front_visible() {
        let frustum = default_frustum();
        assert!(frustum.is_visible(&aabb([-1.0, -1.0, -5.0], [1.0, 1.0, -3.0])));
    }

    #[test]
    fn test_object_behind_camera_not_visible() {
        let frustum = default_frustum();
        assert!(!frustum.is_visible(&aabb([-1.0, -1.0, 5.0], [1.0, 1.0, 10.0])));
    }

    #[test]
    fn test_partially_inside_is_visible() {
        let frustum = default_frustum();
        assert!(frustum.is_visible(&aabb([-100.0, -1.0, -10.0], [1.0, 1.0, -5.0])));
    }

    #[test]
    fn test_all_six_planes_reject() {
        let frustum = default_frustum();
        let outside = [
            aabb([10.0, 10.0, 10.0], [20.0, 20.0, 20.0]),
            aabb([-1000.0, 0.0, -5.0], [-999.0, 1.0, -4.0]),
            aabb([999.0, 0.0, -5.0], [1000.0, 1.0, -4.0]),
            aabb([0.0, 999.0, -5.0], [1.0, 1000.0, -4.0]),
            aabb([0.0, -1000.0, -5.0], [1.0, -999.0, -4.0]),
            aabb([0.0, 0.0, -2000.0], [1.0, 1.0, -1500.0]),
        ];
        for b in outside {
            assert!(!frustum.is_visible(&b), "{b:?} should be culled");
        }
    }

    /// Planet-scale coordinates keep full precision.
    #[test]
    fn test_far_from_origin() {
        let eye = DVec3::new(1.0e7, 2.0e6, -3.0e6);
        let frustum = Frustum::looking_at(
            eye,
            eye + DVec3::X,
            DVec3::Y,
            std::f64::consts::FRAC_PI_2,
            1.0,
            0.5,
            5000.0,
        );
        let ahead = Aabb::from_center_size(eye + DVec3::new(100.0, 0.0, 0.0), 4.0);
        let behind = Aabb::from_center_size(eye - DVec3::new(100.0, 0.0, 0.0), 4.0);
        assert!(frustum.is_visible(&ahead));
        assert!(!frustum.is_visible(&behind));
    }

    #[test]
    fn test_planes_are_normalized() {
        let frustum = default_frustum();
        for plane in &frustum.planes {
            let len = plane.truncate().length();
            assert!((len - 1.0).abs() < 1e-9, "plane normal not normalized: {len}");
        }
    }
}
