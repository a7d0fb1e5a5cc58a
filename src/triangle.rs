//! Triangles and the per-mesh triangle collection.
//!
//! A [`TriangleCollection`] materializes every `(v0, v1, v2)` triple of a mesh
//! once, at construction, so hit tests can scan triangles without chasing
//! indices. Triangles hold their positions by value and never change.

use glam::DVec3;
use rayon::prelude::*;

use crate::picking::Ray;

/// A triangle in its owner's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    vertices: [DVec3; 3],
}

/// Where a ray crossed a triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray.
    pub t: f64,
    /// The crossing point, in the same space as the triangle.
    pub point: DVec3,
    /// Weights of `(v0, v1, v2)` at the crossing point.
    pub barycentric: DVec3,
}

impl Triangle {
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[DVec3; 3] {
        &self.vertices
    }

    pub fn centroid(&self) -> DVec3 {
        let [a, b, c] = self.vertices;
        (a + b + c) / 3.0
    }

    /// Unit face normal following the winding, or zero for a degenerate
    /// triangle.
    pub fn normal(&self) -> DVec3 {
        self.cross().normalize_or_zero()
    }

    pub fn area(&self) -> f64 {
        self.cross().length() * 0.5
    }

    /// True when the triangle has (nearly) no area.
    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        self.cross().length_squared() <= epsilon * epsilon
    }

    fn cross(&self) -> DVec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a)
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// Returns `None` when the ray is within `epsilon` of parallel to the
    /// triangle's plane (degenerate triangles included), when the crossing
    /// lies outside the triangle, or when it lies behind the ray origin
    /// (`t <= epsilon`). Both faces are hittable.
    pub fn intersect(&self, ray: &Ray, epsilon: f64) -> Option<TriangleHit> {
        let [v0, v1, v2] = self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = ray.direction.cross(edge2);
        let det = edge1.dot(h);
        // |det| is at most |edge1| |edge2| for a unit direction
        if det.abs() <= epsilon * edge1.length() * edge2.length() {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - v0;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = inv_det * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(q);
        if t <= epsilon {
            return None;
        }

        Some(TriangleHit {
            t,
            point: ray.point_at(t),
            barycentric: DVec3::new(1.0 - u - v, u, v),
        })
    }
}

/// Read-only, index-addressable triangles of one mesh.
///
/// # Example
///
/// ```
/// use meshpick::{DVec3, TriangleCollection};
///
/// let vertices = [DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z];
/// let indices = [0, 1, 2, 0, 2, 3];
/// let triangles = TriangleCollection::from_indexed(&vertices, &indices);
///
/// assert_eq!(triangles.len(), 2);
/// assert_eq!(triangles[1].vertices()[2], DVec3::Z);
/// assert_eq!(triangles.flattened().len(), 18);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TriangleCollection {
    triangles: Vec<Triangle>,
    flattened: Vec<f64>,
}

impl TriangleCollection {
    /// Builds the collection from a shared vertex buffer and a triangle index
    /// buffer.
    ///
    /// Indices must already be validated; a trailing partial triple is
    /// ignored.
    pub fn from_indexed(vertices: &[DVec3], indices: &[u32]) -> Self {
        let triangles: Vec<Triangle> = indices
            .chunks_exact(3)
            .map(|tri| {
                Triangle::new(
                    vertices[tri[0] as usize],
                    vertices[tri[1] as usize],
                    vertices[tri[2] as usize],
                )
            })
            .collect();

        let flattened = triangles
            .iter()
            .flat_map(|t| t.vertices.iter().flat_map(|v| v.to_array()))
            .collect();

        Self {
            triangles,
            flattened,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Triangle> {
        self.triangles.iter()
    }

    pub fn par_iter(&self) -> rayon::slice::Iter<'_, Triangle> {
        self.triangles.par_iter()
    }

    pub fn as_slice(&self) -> &[Triangle] {
        &self.triangles
    }

    /// All coordinates, 9 per triangle: `v0.x v0.y v0.z v1.x ... v2.z`.
    pub fn flattened(&self) -> &[f64] {
        &self.flattened
    }
}

impl std::ops::Index<usize> for TriangleCollection {
    type Output = Triangle;

    fn index(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }
}

impl<'a> IntoIterator for &'a TriangleCollection {
    type Item = &'a Triangle;
    type IntoIter = std::slice::Iter<'a, Triangle>;

    fn into_iter(self) -> Self::IntoIter {
        self.triangles.iter()
    }
}
