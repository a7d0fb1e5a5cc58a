//! Triangle meshes: shared vertices, triangle indices, and everything derived
//! from them.
//!
//! A [`TriangleMesh`] is built once from a vertex buffer and an index buffer.
//! At construction it validates the indices and derives:
//!
//! - its centroid (mean of the vertices), which becomes the transform pivot
//! - its local-space [`Aabb`]
//! - its [`TriangleCollection`]
//!
//! None of these are recomputed afterwards. Moving, rotating, or scaling a
//! mesh only changes its [`PivotTransform`]; the vertex data is never
//! rewritten, and the transform is applied when vertices are read out or a
//! hit point is mapped to world space.
//!
//! # Example
//!
//! ```
//! use meshpick::{DVec3, IdGenerator, TriangleMesh};
//!
//! let ids = IdGenerator::new();
//! let positions = vec![
//!     DVec3::new(0.0, 1.0, 0.0),
//!     DVec3::new(-1.0, -1.0, 0.0),
//!     DVec3::new(1.0, -1.0, 0.0),
//! ];
//! let mut triangle = TriangleMesh::new(&ids, positions, vec![0, 1, 2]).unwrap();
//! assert_eq!(triangle.name(), "Mesh-1");
//!
//! triangle.translate_by(DVec3::new(0.0, 0.0, -5.0));
//! assert_eq!(triangle.transformed_vertices()[0], DVec3::new(0.0, 1.0, -5.0));
//! // raw positions are untouched
//! assert_eq!(triangle.positions()[0], DVec3::new(0.0, 1.0, 0.0));
//! ```

use glam::{DMat4, DVec3};
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::color::{Color, RenderVertex};
use crate::error::{MeshError, MeshResult};
use crate::ids::{IdGenerator, MeshId};
use crate::picking::{HitQuery, Hittable, MeshHit, PickConfig, Ray, nearest_to_camera};
use crate::transform::PivotTransform;
use crate::triangle::TriangleCollection;

/// An indexed triangle mesh with its own transform.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    id: MeshId,
    name: String,
    positions: Vec<DVec3>,
    colors: Vec<Color>,
    has_color: bool,
    indices: Vec<u32>,
    centroid: DVec3,
    bounds: Option<Aabb>,
    triangles: TriangleCollection,
    transform: PivotTransform,
}

impl TriangleMesh {
    /// Builds an uncolored mesh; every vertex gets [`Color::UNCOLORED`].
    ///
    /// # Errors
    ///
    /// Fails if `indices` is not a whole number of triangles or references a
    /// vertex that does not exist.
    pub fn new(ids: &IdGenerator, positions: Vec<DVec3>, indices: Vec<u32>) -> MeshResult<Self> {
        let colors = vec![Color::UNCOLORED; positions.len()];
        Self::build(ids, positions, colors, false, indices)
    }

    /// Builds a mesh with one color per vertex.
    ///
    /// # Errors
    ///
    /// As [`TriangleMesh::new`], and also fails if `colors` and `positions`
    /// differ in length.
    pub fn with_colors(
        ids: &IdGenerator,
        positions: Vec<DVec3>,
        colors: Vec<Color>,
        indices: Vec<u32>,
    ) -> MeshResult<Self> {
        if colors.len() != positions.len() {
            return Err(MeshError::ColorCount {
                colors: colors.len(),
                vertices: positions.len(),
            });
        }
        Self::build(ids, positions, colors, true, indices)
    }

    fn build(
        ids: &IdGenerator,
        positions: Vec<DVec3>,
        colors: Vec<Color>,
        has_color: bool,
        indices: Vec<u32>,
    ) -> MeshResult<Self> {
        validate_indices(&indices, positions.len())?;

        let centroid = if positions.is_empty() {
            DVec3::ZERO
        } else {
            positions.iter().sum::<DVec3>() / positions.len() as f64
        };
        let bounds = Aabb::from_points(&positions);
        let triangles = TriangleCollection::from_indexed(&positions, &indices);
        let id = ids.next_id();

        Ok(Self {
            id,
            name: id.default_label(),
            positions,
            colors,
            has_color,
            indices,
            centroid,
            bounds,
            triangles,
            transform: PivotTransform::with_pivot(centroid),
        })
    }

    /// A cube centered at the origin with edge length `size`.
    ///
    /// The 8 corners are shared between faces; the 12 triangles wind
    /// counter-clockwise seen from outside. Faces are listed +Z, -Z, +X, -X,
    /// +Y, -Y, two triangles each.
    pub fn cube(ids: &IdGenerator, size: f64) -> Self {
        let h = size * 0.5;

        #[rustfmt::skip]
        let positions = vec![
            DVec3::new(-h, -h, -h), DVec3::new( h, -h, -h),
            DVec3::new( h,  h, -h), DVec3::new(-h,  h, -h),
            DVec3::new(-h, -h,  h), DVec3::new( h, -h,  h),
            DVec3::new( h,  h,  h), DVec3::new(-h,  h,  h),
        ];

        #[rustfmt::skip]
        let indices = vec![
            4, 5, 6, 6, 7, 4, // +z
            1, 0, 3, 3, 2, 1, // -z
            1, 2, 6, 6, 5, 1, // +x
            0, 4, 7, 7, 3, 0, // -x
            3, 7, 6, 6, 2, 3, // +y
            0, 1, 5, 5, 4, 0, // -y
        ];

        Self::build_trusted(ids, positions, indices)
    }

    /// A square on the XZ plane, centered at the origin, facing +Y.
    pub fn plane(ids: &IdGenerator, size: f64) -> Self {
        let h = size * 0.5;
        let positions = vec![
            DVec3::new(-h, 0.0, -h),
            DVec3::new(h, 0.0, -h),
            DVec3::new(h, 0.0, h),
            DVec3::new(-h, 0.0, h),
        ];
        Self::build_trusted(ids, positions, vec![0, 2, 1, 2, 0, 3])
    }

    /// A latitude/longitude sphere of the given radius centered at the origin.
    ///
    /// Produces `(segments + 1) × (rings + 1)` vertices (the seam is
    /// duplicated) and `segments × rings × 2` triangles.
    pub fn sphere(ids: &IdGenerator, radius: f64, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut positions = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = std::f64::consts::PI * ring as f64 / rings as f64;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = std::f64::consts::TAU * seg as f64 / segments as f64;
                let unit = DVec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                positions.push(unit * radius);
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        Self::build_trusted(ids, positions, indices)
    }

    // Primitives generate their own indices, so they cannot be out of range.
    fn build_trusted(ids: &IdGenerator, positions: Vec<DVec3>, indices: Vec<u32>) -> Self {
        match Self::new(ids, positions, indices) {
            Ok(mesh) => mesh,
            Err(e) => unreachable!("primitive generator produced invalid indices: {e}"),
        }
    }

    #[inline]
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Display label; `Mesh-<n>` unless renamed (the loader uses the file name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Raw vertex positions in local space.
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    /// One color per vertex.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Whether the colors came from the source data rather than the default.
    pub fn has_color(&self) -> bool {
        self.has_color
    }

    /// Triangle indices, three per triangle.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Mean of the raw vertex positions, fixed at construction.
    pub fn centroid(&self) -> DVec3 {
        self.centroid
    }

    /// Local-space bounds, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<&Aabb> {
        self.bounds.as_ref()
    }

    pub fn triangles(&self) -> &TriangleCollection {
        &self.triangles
    }

    pub fn transform(&self) -> &PivotTransform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut PivotTransform {
        &mut self.transform
    }

    /// Vertex positions with the mesh's transform applied.
    pub fn transformed_vertices(&self) -> Vec<DVec3> {
        self.transformed_vertices_with(&self.transform.matrix())
    }

    /// Vertex positions mapped through an arbitrary matrix, e.g. a world
    /// matrix that includes parent transforms.
    pub fn transformed_vertices_with(&self, matrix: &DMat4) -> Vec<DVec3> {
        self.positions
            .par_iter()
            .map(|&p| matrix.transform_point3(p))
            .collect()
    }

    /// Transformed positions paired with colors, ready for buffer upload.
    pub fn render_vertices(&self) -> Vec<RenderVertex> {
        let matrix = self.transform.matrix();
        self.positions
            .par_iter()
            .zip(self.colors.par_iter())
            .map(|(&p, &c)| RenderVertex::new(matrix.transform_point3(p), c))
            .collect()
    }

    /// Moves the mesh in world space.
    pub fn translate_by(&mut self, delta: DVec3) {
        self.transform.translate_by(delta);
    }

    /// Rotates further about the centroid (radians, X then Y then Z).
    pub fn rotate_by(&mut self, rx: f64, ry: f64, rz: f64) {
        self.transform.rotate_by(rx, ry, rz, self.centroid);
    }

    /// Adds to the per-axis scale factors, scaling about the centroid.
    pub fn scale_by(&mut self, sx: f64, sy: f64, sz: f64) {
        self.transform.scale_by(sx, sy, sz, self.centroid);
    }

    /// Tests a local-space ray with default tolerances, ranking candidates by
    /// distance to `camera_position` through this mesh's own transform.
    ///
    /// Returns `None` when the ray misses, which is the common case.
    pub fn hit_test(&self, ray: &Ray, camera_position: DVec3) -> Option<MeshHit> {
        self.hit_test_with(ray, camera_position, PickConfig::default())
    }

    /// [`TriangleMesh::hit_test`] with explicit tolerances.
    pub fn hit_test_with(
        &self,
        ray: &Ray,
        camera_position: DVec3,
        config: PickConfig,
    ) -> Option<MeshHit> {
        let query = HitQuery::new(camera_position, self.transform.matrix()).with_config(config);
        Hittable::hit_test(self, ray, &query)
    }
}

impl Hittable for TriangleMesh {
    fn hit_test(&self, ray: &Ray, query: &HitQuery) -> Option<MeshHit> {
        let bounds = self.bounds.as_ref()?;
        if bounds.intersect(ray, query.config.parallel_epsilon).is_none() {
            tracing::trace!(mesh = %self.name, "ray rejected by bounding box");
            return None;
        }

        let epsilon = query.config.triangle_epsilon;
        let candidates: Vec<MeshHit> = self
            .triangles
            .par_iter()
            .enumerate()
            .filter_map(|(index, triangle)| {
                let hit = triangle.intersect(ray, epsilon)?;
                let world_point = query.to_world.transform_point3(hit.point);
                Some(MeshHit {
                    mesh: self.id,
                    triangle_index: index,
                    triangle: *triangle,
                    local_point: hit.point,
                    world_point,
                    camera_distance_sq: world_point.distance_squared(query.camera_position),
                })
            })
            .collect();

        tracing::trace!(mesh = %self.name, candidates = candidates.len(), "triangle scan finished");
        nearest_to_camera(candidates)
    }
}

fn validate_indices(indices: &[u32], vertex_count: usize) -> MeshResult<()> {
    if indices.len() % 3 != 0 {
        return Err(MeshError::IndexCount(indices.len()));
    }

    match indices.iter().position(|&i| i as usize >= vertex_count) {
        Some(at) => Err(MeshError::IndexOutOfRange {
            triangle: at / 3,
            index: indices[at],
            vertex_count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cube_has_shared_vertices() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 2.0);
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.triangles().len(), 12);
        assert_eq!(cube.centroid(), DVec3::ZERO);
        assert!(!cube.has_color());
        assert!(cube.colors().iter().all(|&c| c == Color::UNCOLORED));

        let bounds = cube.bounds().unwrap();
        assert_eq!(bounds.min(), DVec3::splat(-1.0));
        assert_eq!(bounds.max(), DVec3::splat(1.0));
    }

    #[test]
    fn cube_faces_point_outward() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 2.0);
        for triangle in cube.triangles() {
            let outward = triangle.centroid().normalize();
            assert!(triangle.normal().dot(outward) > 0.0);
        }
    }

    #[test]
    fn cube_hit_from_front_lands_on_plus_z_face() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 2.0);
        let camera = DVec3::new(0.0, 0.0, 5.0);
        let ray = Ray::new(camera, DVec3::new(0.0, 0.0, -1.0));

        let hit = cube.hit_test(&ray, camera).unwrap();
        assert!(hit.local_point.abs_diff_eq(DVec3::new(0.0, 0.0, 1.0), 1e-12));
        assert!(hit.triangle_index < 2, "hit triangle {}", hit.triangle_index);
        assert_eq!(hit.mesh, cube.id());
        assert_abs_diff_eq!(hit.camera_distance_sq, 16.0, epsilon = 1e-12);
    }

    #[test]
    fn ray_missing_the_box_is_rejected() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 2.0);
        let camera = DVec3::new(0.0, 0.0, 5.0);

        let away = Ray::new(camera, DVec3::Z);
        assert!(cube.hit_test(&away, camera).is_none());

        let beside = Ray::new(DVec3::new(3.0, 0.0, 5.0), DVec3::NEG_Z);
        assert!(cube.hit_test(&beside, camera).is_none());
    }

    #[test]
    fn nearest_hit_is_chosen_by_camera_distance() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 2.0);

        // shoot from behind but rank from a camera sitting on the +z side:
        // the +z face wins even though the ray reaches -z first
        let ray = Ray::new(DVec3::new(0.2, 0.3, -5.0), DVec3::Z);
        let hit = cube.hit_test(&ray, DVec3::new(0.0, 0.0, 10.0)).unwrap();
        assert_abs_diff_eq!(hit.local_point.z, 1.0, epsilon = 1e-12);

        let hit = cube.hit_test(&ray, DVec3::new(0.0, 0.0, -10.0)).unwrap();
        assert_abs_diff_eq!(hit.local_point.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn world_point_follows_transform_but_local_point_does_not() {
        let ids = IdGenerator::new();
        let mut cube = TriangleMesh::cube(&ids, 2.0);
        cube.translate_by(DVec3::new(10.0, 0.0, 0.0));
        cube.scale_by(1.0, 1.0, 1.0);

        let camera = DVec3::new(10.0, 0.0, 10.0);
        // local-space ray straight down the z axis
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::NEG_Z);
        let hit = cube.hit_test(&ray, camera).unwrap();

        assert!(hit.local_point.abs_diff_eq(DVec3::new(0.0, 0.0, 1.0), 1e-12));
        assert!(hit.world_point.abs_diff_eq(DVec3::new(10.0, 0.0, 2.0), 1e-12));
    }

    #[test]
    fn transformed_vertices_leave_raw_data_alone() {
        let ids = IdGenerator::new();
        let mut cube = TriangleMesh::cube(&ids, 2.0);
        cube.rotate_by(0.0, std::f64::consts::PI, 0.0);

        let moved = cube.transformed_vertices();
        assert!(moved[6].abs_diff_eq(DVec3::new(-1.0, 1.0, -1.0), 1e-12));
        assert_eq!(cube.positions()[6], DVec3::ONE);
        assert_eq!(cube.centroid(), DVec3::ZERO);

        let render = cube.render_vertices();
        assert_eq!(render.len(), 8);
        assert_eq!(render[6].color, [211, 211, 211, 255]);
    }

    #[test]
    fn rejects_bad_index_buffers() {
        let ids = IdGenerator::new();
        let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];

        let err = TriangleMesh::new(&ids, positions.clone(), vec![0, 1]).unwrap_err();
        assert_eq!(err, MeshError::IndexCount(2));

        let err = TriangleMesh::new(&ids, positions.clone(), vec![0, 1, 2, 2, 1, 3]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                triangle: 1,
                index: 3,
                vertex_count: 3
            }
        );

        let err = TriangleMesh::with_colors(&ids, positions, vec![Color::WHITE], vec![0, 1, 2])
            .unwrap_err();
        assert_eq!(err, MeshError::ColorCount { colors: 1, vertices: 3 });
    }

    #[test]
    fn ids_are_sequential_and_labels_overridable() {
        let ids = IdGenerator::new();
        let a = TriangleMesh::plane(&ids, 1.0);
        let mut b = TriangleMesh::plane(&ids, 1.0);
        assert_eq!(a.name(), "Mesh-1");
        assert_eq!(b.name(), "Mesh-2");
        b.set_name("floor.ply");
        assert_eq!(b.name(), "floor.ply");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn plane_faces_up_and_is_pickable() {
        let ids = IdGenerator::new();
        let plane = TriangleMesh::plane(&ids, 4.0);
        for triangle in plane.triangles() {
            assert!(triangle.normal().abs_diff_eq(DVec3::Y, 1e-12));
        }
        let camera = DVec3::new(0.5, 3.0, 0.5);
        let hit = plane.hit_test(&Ray::new(camera, DVec3::NEG_Y), camera).unwrap();
        assert!(hit.local_point.abs_diff_eq(DVec3::new(0.5, 0.0, 0.5), 1e-12));
    }

    #[test]
    fn sphere_hit_lies_on_surface() {
        let ids = IdGenerator::new();
        let sphere = TriangleMesh::sphere(&ids, 2.0, 32, 16);
        assert_eq!(sphere.vertex_count(), 33 * 17);
        assert_eq!(sphere.triangle_count(), 32 * 16 * 2);

        let camera = DVec3::new(0.3, 0.2, 10.0);
        let hit = sphere
            .hit_test(&Ray::through(camera, DVec3::ZERO), camera)
            .unwrap();
        // faceted, so slightly inside the true sphere
        let r = hit.local_point.length();
        assert!(r <= 2.0 + 1e-9 && r > 1.9, "radius {r}");
        assert!(hit.local_point.z > 0.0);
    }

    #[test]
    fn tiny_cube_is_still_pickable() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 1e-5);
        let camera = DVec3::new(1e-6, 2e-6, 1.0);

        let hit = cube.hit_test(&Ray::new(camera, DVec3::NEG_Z), camera).unwrap();
        assert!(hit.local_point.abs_diff_eq(DVec3::new(1e-6, 2e-6, 5e-6), 1e-15));
    }

    #[test]
    fn triangle_epsilon_rejects_shallow_hits() {
        let ids = IdGenerator::new();
        let positions = vec![
            DVec3::new(-1.0, -1.0, 0.0),
            DVec3::new(1.0, -1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let triangle = TriangleMesh::new(&ids, positions, vec![0, 1, 2]).unwrap();
        let camera = DVec3::new(-1.0, 0.0, 0.01);
        let ray = Ray::new(camera, DVec3::new(1.0, 0.0, -0.01));

        let hit = triangle.hit_test(&ray, camera).unwrap();
        assert_abs_diff_eq!(hit.local_point.x, 0.0, epsilon = 1e-9);

        let strict = PickConfig::new().triangle_epsilon(0.05);
        assert!(triangle.hit_test_with(&ray, camera, strict).is_none());
    }

    #[test]
    fn concurrent_hit_tests_match_sequential_ones() {
        let ids = IdGenerator::new();
        let cube = TriangleMesh::cube(&ids, 2.0);
        let mut sphere = TriangleMesh::sphere(&ids, 1.0, 24, 12);
        sphere.translate_by(DVec3::new(3.0, 0.0, 0.0));

        let camera = DVec3::new(0.1, 0.2, 8.0);
        let ray = Ray::new(camera, DVec3::NEG_Z);
        let expected = (cube.hit_test(&ray, camera), sphere.hit_test(&ray, camera));

        let together = rayon::join(
            || cube.hit_test(&ray, camera),
            || sphere.hit_test(&ray, camera),
        );
        assert_eq!(together, expected);
        assert!(together.0.is_some());
    }

    #[test]
    fn empty_mesh_never_hits() {
        let ids = IdGenerator::new();
        let empty = TriangleMesh::new(&ids, Vec::new(), Vec::new()).unwrap();
        assert!(empty.bounds().is_none());
        let ray = Ray::new(DVec3::Z, DVec3::NEG_Z);
        assert!(empty.hit_test(&ray, DVec3::Z).is_none());
    }
}
