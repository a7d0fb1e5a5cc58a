//! Scene node components and the [`Drawable`] capability.

use glam::{DMat4, DVec3};
use hecs::Entity;

use crate::aabb::Aabb;
use crate::mesh::TriangleMesh;
use crate::picking::{HitQuery, Hittable, MeshHit, Ray};
use crate::transform::PivotTransform;

/// Hierarchy links of one scene node.
///
/// Only the [`Scene`](crate::Scene) edits these, so parent and child lists
/// always agree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub(crate) parent: Option<Entity>,
    pub(crate) children: Vec<Entity>,
}

impl Node {
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }
}

/// Anything that can sit in a scene: it has a name and a transform, and it
/// can be hit-tested (possibly never hitting).
pub trait Drawable: Hittable + Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn transform(&self) -> &PivotTransform;

    fn transform_mut(&mut self) -> &mut PivotTransform;

    /// Local-space bounds, if the drawable has geometry.
    fn bounds(&self) -> Option<&Aabb> {
        None
    }

    /// Vertex positions carried through `matrix`.
    fn transformed_vertices_with(&self, _matrix: &DMat4) -> Vec<DVec3> {
        Vec::new()
    }

    fn as_mesh(&self) -> Option<&TriangleMesh> {
        None
    }

    fn as_mesh_mut(&mut self) -> Option<&mut TriangleMesh> {
        None
    }
}

impl Drawable for TriangleMesh {
    fn name(&self) -> &str {
        TriangleMesh::name(self)
    }

    fn transform(&self) -> &PivotTransform {
        TriangleMesh::transform(self)
    }

    fn transform_mut(&mut self) -> &mut PivotTransform {
        TriangleMesh::transform_mut(self)
    }

    fn bounds(&self) -> Option<&Aabb> {
        TriangleMesh::bounds(self)
    }

    fn transformed_vertices_with(&self, matrix: &DMat4) -> Vec<DVec3> {
        TriangleMesh::transformed_vertices_with(self, matrix)
    }

    fn as_mesh(&self) -> Option<&TriangleMesh> {
        Some(self)
    }

    fn as_mesh_mut(&mut self) -> Option<&mut TriangleMesh> {
        Some(self)
    }
}

/// A transform-only node used to move several children together.
///
/// # Example
///
/// ```
/// use meshpick::{DVec3, Group, Scene, TriangleMesh};
///
/// let mut scene = Scene::new();
/// let group = scene.spawn(Group::new("rig"));
/// let cube = TriangleMesh::cube(scene.ids(), 1.0);
/// let cube = scene.spawn(cube);
/// scene.attach(cube, group).unwrap();
///
/// scene.get_mut(group).unwrap().transform_mut().translate_by(DVec3::X * 3.0);
/// let moved = scene.transformed_vertices(cube).unwrap();
/// assert_eq!(moved[0], DVec3::new(2.5, -0.5, -0.5));
/// ```
#[derive(Clone, Debug)]
pub struct Group {
    name: String,
    transform: PivotTransform,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: PivotTransform::new(),
        }
    }
}

impl Hittable for Group {
    fn hit_test(&self, _ray: &Ray, _query: &HitQuery) -> Option<MeshHit> {
        None
    }
}

impl Drawable for Group {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> &PivotTransform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut PivotTransform {
        &mut self.transform
    }
}
