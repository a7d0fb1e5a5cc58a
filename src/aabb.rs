//! Axis-aligned bounding boxes.
//!
//! A mesh computes its [`Aabb`] once, from its raw vertex extrema, and never
//! updates it. The box lives in the mesh's local space and moves rigidly with
//! the mesh: queries either bring the ray into local space or map the corners
//! out through the current transform, but the box itself is never rewritten.

use glam::{DMat4, DVec3};

use crate::picking::Ray;

/// An axis-aligned box in its owner's local space.
///
/// # Example
///
/// ```
/// use meshpick::{Aabb, DVec3, Ray};
///
/// let bounds = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0));
/// let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
///
/// assert_eq!(bounds.intersect(&ray, 1e-12), Some(4.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    min: DVec3,
    max: DVec3,
    center: DVec3,
    half_extents: DVec3,
    corners: [DVec3; 8],
}

impl Aabb {
    /// Index pairs into [`Aabb::corners`] forming the 12 wireframe edges.
    #[rustfmt::skip]
    pub const EDGES: [(usize, usize); 12] = [
        (0, 1), (1, 2), (2, 3), (3, 0),
        (4, 5), (5, 6), (6, 7), (7, 4),
        (0, 4), (1, 5), (2, 6), (3, 7),
    ];

    /// Builds a box from two opposite corners, in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        let center = (max + min) * 0.5;
        let half_extents = (max - min) * 0.5;

        #[rustfmt::skip]
        let corners = [
            // bottom (min z), counter-clockwise seen from +z
            DVec3::new(min.x, min.y, min.z),
            DVec3::new(max.x, min.y, min.z),
            DVec3::new(max.x, max.y, min.z),
            DVec3::new(min.x, max.y, min.z),
            // top (max z), same order
            DVec3::new(min.x, min.y, max.z),
            DVec3::new(max.x, min.y, max.z),
            DVec3::new(max.x, max.y, max.z),
            DVec3::new(min.x, max.y, max.z),
        ];

        Self {
            min,
            max,
            center,
            half_extents,
            corners,
        }
    }

    /// The tightest box around a point set, or `None` if the set is empty.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        Some(Self::new(min, max))
    }

    #[inline]
    pub fn min(&self) -> DVec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> DVec3 {
        self.max
    }

    #[inline]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    #[inline]
    pub fn half_extents(&self) -> DVec3 {
        self.half_extents
    }

    /// Full edge lengths.
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// The 8 corners in a fixed order; see [`Aabb::EDGES`] for the wireframe.
    pub fn corners(&self) -> &[DVec3; 8] {
        &self.corners
    }

    /// The corners carried through `matrix`, for drawing the box as it sits
    /// in the world.
    pub fn transformed_corners(&self, matrix: &DMat4) -> [DVec3; 8] {
        self.corners.map(|c| matrix.transform_point3(c))
    }

    /// Whether `point` lies inside or on the box.
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test against a ray in this box's space.
    ///
    /// Returns the distance along the ray to the first non-negative crossing
    /// (the exit distance when the origin is inside the box), or `None` on a
    /// miss. Direction components below `parallel_epsilon` are treated as
    /// parallel to that slab.
    pub fn intersect(&self, ray: &Ray, parallel_epsilon: f64) -> Option<f64> {
        if ray.direction == DVec3::ZERO {
            return None;
        }

        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for axis in 0..3 {
            let offset = self.center[axis] - ray.origin[axis];
            let half = self.half_extents[axis];
            let dir = ray.direction[axis];

            if dir.abs() < parallel_epsilon {
                // Parallel to this slab: either always inside it or never.
                if offset.abs() > half {
                    return None;
                }
                continue;
            }

            let mut t1 = (offset - half) / dir;
            let mut t2 = (offset + half) / dir;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);

            if t_min > t_max || t_max < 0.0 {
                return None;
            }
        }

        if t_min >= 0.0 { Some(t_min) } else { Some(t_max) }
    }

    /// Like [`Aabb::intersect`], returning the crossing point instead.
    pub fn hit_test(&self, ray: &Ray, parallel_epsilon: f64) -> Option<DVec3> {
        self.intersect(ray, parallel_epsilon).map(|t| ray.point_at(t))
    }
}
