//! Rays, hit results, and the [`Hittable`] capability.
//!
//! Picking is analytic: a ray is filtered by a mesh's bounding box and then
//! tested against every triangle. This module holds the pieces shared by all
//! drawables:
//!
//! - [`Ray`]: origin + direction, in whatever space the caller chose
//! - [`PickConfig`]: the epsilons used by the box and triangle tests
//! - [`HitQuery`]: per-call context (camera position, local→world matrix)
//! - [`MeshHit`]: what a successful hit reports
//! - [`Hittable`]: implemented by every drawable variant
//!
//! # Example
//!
//! ```
//! use meshpick::{DVec3, IdGenerator, Ray, TriangleMesh};
//!
//! let ids = IdGenerator::new();
//! let cube = TriangleMesh::cube(&ids, 2.0);
//!
//! let camera = DVec3::new(0.0, 0.0, 5.0);
//! let ray = Ray::new(camera, DVec3::new(0.0, 0.0, -1.0));
//!
//! let hit = cube.hit_test(&ray, camera).expect("ray points at the cube");
//! assert!((hit.local_point.z - 1.0).abs() < 1e-9);
//! ```

use glam::{DMat4, DVec3};

use crate::ids::MeshId;
use crate::triangle::Triangle;

/// A ray in 3D space.
///
/// The direction is normalized on construction, so `t` in [`Ray::point_at`]
/// is a distance in the ray's own space. A zero direction stays zero and
/// never hits anything.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: DVec3,
    /// The normalized direction of the ray.
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray with the given origin and direction.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray from `origin` through `target`.
    pub fn through(origin: DVec3, target: DVec3) -> Self {
        Self::new(origin, target - origin)
    }

    /// Get a point along the ray at the given distance from the origin.
    #[inline]
    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Maps the ray through an affine matrix.
    ///
    /// Used to move a world-space picking ray into a node's local space with
    /// the inverse of the node's world matrix.
    pub fn transformed(&self, matrix: &DMat4) -> Self {
        Self::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.direction),
        )
    }
}

/// Tolerances for the picking tests.
///
/// # Example
///
/// ```
/// use meshpick::PickConfig;
///
/// let config = PickConfig::new().triangle_epsilon(1e-6);
/// assert_eq!(config.triangle_epsilon, 1e-6);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickConfig {
    /// Rejects triangles nearly parallel to the ray and hits behind (or at)
    /// the ray origin.
    pub triangle_epsilon: f64,
    /// A direction component smaller than this is treated as parallel to the
    /// bounding-box slab on that axis.
    pub parallel_epsilon: f64,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            triangle_epsilon: 1e-9,
            parallel_epsilon: 1e-12,
        }
    }
}

impl PickConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_epsilon(mut self, epsilon: f64) -> Self {
        self.triangle_epsilon = epsilon;
        self
    }

    pub fn parallel_epsilon(mut self, epsilon: f64) -> Self {
        self.parallel_epsilon = epsilon;
        self
    }
}

/// Per-call context for a hit test.
///
/// The ray handed to [`Hittable::hit_test`] is already in the drawable's local
/// space; `to_world` maps local hit points back out so candidates can be ranked
/// by their distance to `camera_position`.
#[derive(Clone, Copy, Debug)]
pub struct HitQuery {
    /// World-space eye position used to rank candidate hits.
    pub camera_position: DVec3,
    /// Local → world matrix of the drawable being tested.
    pub to_world: DMat4,
    pub config: PickConfig,
}

impl HitQuery {
    pub fn new(camera_position: DVec3, to_world: DMat4) -> Self {
        Self {
            camera_position,
            to_world,
            config: PickConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PickConfig) -> Self {
        self.config = config;
        self
    }
}

/// A resolved ray/mesh intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshHit {
    /// The mesh that was hit.
    pub mesh: MeshId,
    /// Index of the hit triangle within the mesh's triangle collection.
    pub triangle_index: usize,
    /// The hit triangle, in local space.
    pub triangle: Triangle,
    /// Hit position in the mesh's local (untransformed) space.
    pub local_point: DVec3,
    /// Hit position in world space.
    pub world_point: DVec3,
    /// Squared distance from the camera to `world_point`.
    pub camera_distance_sq: f64,
}

/// Something a picking ray can be tested against.
///
/// Every drawable variant implements this; drawables without geometry simply
/// report no hit.
pub trait Hittable {
    /// Tests a local-space ray, returning the camera-nearest hit.
    fn hit_test(&self, ray: &Ray, query: &HitQuery) -> Option<MeshHit>;
}

/// Picks the hit whose world point is closest to the camera.
pub(crate) fn nearest_to_camera<I>(hits: I) -> Option<MeshHit>
where
    I: IntoIterator<Item = MeshHit>,
{
    hits.into_iter()
        .min_by(|a, b| a.camera_distance_sq.total_cmp(&b.camera_distance_sq))
}
