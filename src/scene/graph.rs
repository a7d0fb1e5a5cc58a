//! The [`Scene`] tree and scene-wide picking.

use std::path::Path;

use glam::{DMat4, DVec3};
use hecs::{Entity, World};

use crate::error::{SceneError, SceneResult};
use crate::ids::IdGenerator;
use crate::mesh::TriangleMesh;
use crate::picking::{HitQuery, MeshHit, PickConfig, Ray};
use crate::ply;
use crate::scene::node::{Drawable, Node};

/// Handle to a node in a [`Scene`].
pub type NodeId = Entity;

/// A picking hit resolved against a whole scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneHit {
    /// The node whose drawable was hit.
    pub node: NodeId,
    pub hit: MeshHit,
}

/// A tree of drawables stored in a `hecs` world.
///
/// Every node carries a [`Node`] (hierarchy links) and a boxed [`Drawable`].
/// A node's world matrix is its ancestors' transforms composed with its own,
/// root first. Attaching or detaching keeps the node's local transform, so the
/// node moves with its new parent.
///
/// # Example
///
/// ```
/// use meshpick::{DVec3, Ray, Scene, TriangleMesh};
///
/// let mut scene = Scene::new();
/// let mut cube = TriangleMesh::cube(scene.ids(), 2.0);
/// cube.translate_by(DVec3::new(0.0, 0.0, -10.0));
/// let cube = scene.spawn(cube);
///
/// let camera = DVec3::ZERO;
/// let hit = scene.pick(&Ray::new(camera, DVec3::NEG_Z), camera).unwrap();
/// assert_eq!(hit.node, cube);
/// assert!(hit.hit.world_point.abs_diff_eq(DVec3::new(0.0, 0.0, -9.0), 1e-9));
/// ```
#[derive(Default)]
pub struct Scene {
    world: World,
    ids: IdGenerator,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id generator meshes for this scene should be built with.
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Adds a drawable as a new root node.
    pub fn spawn(&mut self, drawable: impl Drawable + 'static) -> NodeId {
        let boxed: Box<dyn Drawable> = Box::new(drawable);
        let node = self.world.spawn((Node::default(), boxed));
        tracing::debug!(?node, "spawned node");
        node
    }

    /// Loads a PLY file and adds it as a new root node.
    pub fn load_mesh(&mut self, path: impl AsRef<Path>) -> SceneResult<NodeId> {
        let mesh = ply::load(path, &self.ids)?;
        Ok(self.spawn(mesh))
    }

    /// Saves a mesh node with its world matrix baked into the positions.
    pub fn save_mesh(&self, node: NodeId, path: impl AsRef<Path>) -> SceneResult<()> {
        let positions = self.transformed_vertices(node)?;
        let drawable = self.get(node)?;
        let mesh = drawable.as_mesh().ok_or(SceneError::NotAMesh(node))?;
        ply::save_positions(path, &positions, mesh.indices())?;
        Ok(())
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.world.contains(node)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every node, in no particular order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.world.iter().map(|e| e.entity()).collect()
    }

    /// Nodes without a parent, in no particular order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.world
            .query::<&Node>()
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn get(&self, node: NodeId) -> SceneResult<hecs::Ref<'_, Box<dyn Drawable>>> {
        self.world
            .get::<&Box<dyn Drawable>>(node)
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    pub fn get_mut(&mut self, node: NodeId) -> SceneResult<&mut dyn Drawable> {
        match self.world.query_one_mut::<&mut Box<dyn Drawable>>(node) {
            Ok(drawable) => Ok(&mut **drawable),
            Err(_) => Err(SceneError::NoSuchNode(node)),
        }
    }

    /// The mesh held by `node`, for editing.
    pub fn mesh_mut(&mut self, node: NodeId) -> SceneResult<&mut TriangleMesh> {
        self.get_mut(node)?
            .as_mesh_mut()
            .ok_or(SceneError::NotAMesh(node))
    }

    /// Runs `f` on the mesh held by `node`.
    pub fn with_mesh<R>(&self, node: NodeId, f: impl FnOnce(&TriangleMesh) -> R) -> SceneResult<R> {
        let drawable = self.get(node)?;
        let mesh = drawable.as_mesh().ok_or(SceneError::NotAMesh(node))?;
        Ok(f(mesh))
    }

    /// First node whose drawable has the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.world
            .query::<&Box<dyn Drawable>>()
            .iter()
            .find(|(_, d)| d.name() == name)
            .map(|(entity, _)| entity)
    }

    fn links(&self, node: NodeId) -> SceneResult<hecs::Ref<'_, Node>> {
        self.world
            .get::<&Node>(node)
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    fn links_mut(&mut self, node: NodeId) -> SceneResult<&mut Node> {
        self.world
            .query_one_mut::<&mut Node>(node)
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    pub fn parent(&self, node: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.links(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> SceneResult<Vec<NodeId>> {
        Ok(self.links(node)?.children.clone())
    }

    /// Makes `child` a child of `parent`, moving it from any previous parent.
    ///
    /// # Errors
    ///
    /// [`SceneError::Cycle`] if `parent` is `child` or one of its descendants.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> SceneResult<()> {
        self.links(child)?;

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::Cycle { child, parent });
            }
            ancestor = self.links(current)?.parent;
        }

        self.detach(child)?;
        self.links_mut(parent)?.children.push(child);
        self.links_mut(child)?.parent = Some(parent);
        tracing::debug!(?child, ?parent, "attached node");
        Ok(())
    }

    /// Makes `node` a root again. Does nothing if it already is one.
    pub fn detach(&mut self, node: NodeId) -> SceneResult<()> {
        let Some(parent) = self.links_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.links_mut(parent)?.children.retain(|&c| c != node);
        Ok(())
    }

    /// Removes `node` and its whole subtree, returning how many nodes went.
    pub fn remove(&mut self, node: NodeId) -> SceneResult<usize> {
        self.detach(node)?;

        let mut doomed = vec![node];
        let mut i = 0;
        while i < doomed.len() {
            doomed.extend(self.children(doomed[i])?);
            i += 1;
        }

        for &entity in &doomed {
            self.world
                .despawn(entity)
                .map_err(|_| SceneError::NoSuchNode(entity))?;
        }
        tracing::debug!(?node, removed = doomed.len(), "removed subtree");
        Ok(doomed.len())
    }

    /// Local → world matrix of `node`, parents applied outermost.
    pub fn world_matrix(&self, node: NodeId) -> SceneResult<DMat4> {
        let mut matrix = self.get(node)?.transform().matrix();
        let mut ancestor = self.links(node)?.parent;
        while let Some(current) = ancestor {
            matrix = self.get(current)?.transform().matrix() * matrix;
            ancestor = self.links(current)?.parent;
        }
        Ok(matrix)
    }

    /// Vertex positions of `node` in world space.
    pub fn transformed_vertices(&self, node: NodeId) -> SceneResult<Vec<DVec3>> {
        let matrix = self.world_matrix(node)?;
        Ok(self.get(node)?.transformed_vertices_with(&matrix))
    }

    /// Visits every node depth-first, parents before children, with its
    /// world matrix.
    pub fn walk(&self, mut visit: impl FnMut(NodeId, &dyn Drawable, &DMat4)) {
        let mut stack: Vec<(NodeId, DMat4)> = self
            .roots()
            .into_iter()
            .map(|root| (root, DMat4::IDENTITY))
            .collect();

        while let Some((node, parent_matrix)) = stack.pop() {
            let (Ok(drawable), Ok(links)) = (self.get(node), self.links(node)) else {
                continue;
            };
            let matrix = parent_matrix * drawable.transform().matrix();
            visit(node, &**drawable, &matrix);
            stack.extend(links.children.iter().rev().map(|&child| (child, matrix)));
        }
    }

    /// Casts a world-space ray through every node and returns the hit nearest
    /// to `camera_position`.
    pub fn pick(&self, ray: &Ray, camera_position: DVec3) -> Option<SceneHit> {
        self.pick_with(ray, camera_position, PickConfig::default())
    }

    /// [`Scene::pick`] with explicit tolerances.
    pub fn pick_with(
        &self,
        ray: &Ray,
        camera_position: DVec3,
        config: PickConfig,
    ) -> Option<SceneHit> {
        let mut best: Option<SceneHit> = None;

        self.walk(|node, drawable, to_world| {
            if drawable.bounds().is_none() {
                return;
            }
            let to_local = to_world.inverse();
            if !to_local.is_finite() {
                tracing::trace!(?node, "skipping node with collapsed transform");
                return;
            }

            let local_ray = ray.transformed(&to_local);
            let query = HitQuery::new(camera_position, *to_world).with_config(config);
            let Some(hit) = drawable.hit_test(&local_ray, &query) else {
                return;
            };

            if best.is_none_or(|b| hit.camera_distance_sq < b.hit.camera_distance_sq) {
                best = Some(SceneHit { node, hit });
            }
        });

        match &best {
            Some(found) => tracing::trace!(node = ?found.node, "pick resolved"),
            None => tracing::trace!("pick rejected"),
        }
        best
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.len())
            .field("meshes_issued", &self.ids.issued())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Group;
    use std::f64::consts::FRAC_PI_2;

    fn cube_at(scene: &mut Scene, offset: DVec3) -> NodeId {
        let mut cube = TriangleMesh::cube(scene.ids(), 2.0);
        cube.translate_by(offset);
        scene.spawn(cube)
    }

    #[test]
    fn attach_and_detach_keep_links_consistent() {
        let mut scene = Scene::new();
        let a = scene.spawn(Group::new("a"));
        let b = scene.spawn(Group::new("b"));
        let c = scene.spawn(Group::new("c"));

        scene.attach(c, a).unwrap();
        assert_eq!(scene.parent(c).unwrap(), Some(a));
        assert_eq!(scene.children(a).unwrap(), vec![c]);

        scene.attach(c, b).unwrap();
        assert!(scene.children(a).unwrap().is_empty());
        assert_eq!(scene.children(b).unwrap(), vec![c]);

        scene.detach(c).unwrap();
        assert_eq!(scene.parent(c).unwrap(), None);
        assert_eq!(scene.roots().len(), 3);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.spawn(Group::new("a"));
        let b = scene.spawn(Group::new("b"));
        scene.attach(b, a).unwrap();

        assert!(matches!(scene.attach(a, b), Err(SceneError::Cycle { .. })));
        assert!(matches!(scene.attach(a, a), Err(SceneError::Cycle { .. })));
        assert_eq!(scene.parent(a).unwrap(), None);
    }

    #[test]
    fn child_follows_parent_transform() {
        let mut scene = Scene::new();
        let parent = scene.spawn(Group::new("parent"));
        let child = cube_at(&mut scene, DVec3::new(2.0, 0.0, 0.0));
        scene.attach(child, parent).unwrap();

        scene
            .get_mut(parent)
            .unwrap()
            .transform_mut()
            .rotate_by(0.0, 0.0, FRAC_PI_2, DVec3::ZERO);

        // cube centre (2,0,0) swings to (0,2,0)
        let world = scene.world_matrix(child).unwrap();
        assert!(world.transform_point3(DVec3::ZERO).abs_diff_eq(DVec3::new(0.0, 2.0, 0.0), 1e-12));

        let vertices = scene.transformed_vertices(child).unwrap();
        let local = scene.with_mesh(child, |m| m.positions().to_vec()).unwrap();
        for (v, p) in vertices.iter().zip(&local) {
            assert!(v.abs_diff_eq(world.transform_point3(*p), 1e-12));
        }

        scene.detach(child).unwrap();
        let world = scene.world_matrix(child).unwrap();
        assert!(world.transform_point3(DVec3::ZERO).abs_diff_eq(DVec3::new(2.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn remove_takes_the_subtree() {
        let mut scene = Scene::new();
        let root = scene.spawn(Group::new("root"));
        let mid = scene.spawn(Group::new("mid"));
        let leaf = cube_at(&mut scene, DVec3::ZERO);
        let other = scene.spawn(Group::new("other"));
        scene.attach(mid, root).unwrap();
        scene.attach(leaf, mid).unwrap();

        assert_eq!(scene.remove(mid).unwrap(), 2);
        assert!(!scene.contains(leaf));
        assert!(scene.children(root).unwrap().is_empty());
        assert_eq!(scene.len(), 2);
        assert!(scene.contains(other));
        assert!(matches!(scene.remove(mid), Err(SceneError::NoSuchNode(_))));
    }

    #[test]
    fn walk_visits_parents_first() {
        let mut scene = Scene::new();
        let root = scene.spawn(Group::new("root"));
        let first = scene.spawn(Group::new("first"));
        let second = scene.spawn(Group::new("second"));
        let grandchild = scene.spawn(Group::new("grandchild"));
        scene.attach(first, root).unwrap();
        scene.attach(second, root).unwrap();
        scene.attach(grandchild, first).unwrap();

        let mut order = Vec::new();
        scene.walk(|node, drawable, _| order.push((node, drawable.name().to_string())));
        let names: Vec<&str> = order.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, ["root", "first", "grandchild", "second"]);
    }

    #[test]
    fn pick_returns_nearest_node() {
        let mut scene = Scene::new();
        let far = cube_at(&mut scene, DVec3::new(0.0, 0.0, -20.0));
        let near = cube_at(&mut scene, DVec3::new(0.0, 0.0, -10.0));
        let aside = cube_at(&mut scene, DVec3::new(5.0, 0.0, -5.0));

        let camera = DVec3::ZERO;
        let hit = scene.pick(&Ray::new(camera, DVec3::NEG_Z), camera).unwrap();
        assert_eq!(hit.node, near);
        assert!(hit.hit.world_point.abs_diff_eq(DVec3::new(0.0, 0.0, -9.0), 1e-9));
        assert!(hit.hit.local_point.abs_diff_eq(DVec3::new(0.0, 0.0, 1.0), 1e-9));

        scene.remove(near).unwrap();
        let hit = scene.pick(&Ray::new(camera, DVec3::NEG_Z), camera).unwrap();
        assert_eq!(hit.node, far);

        let hit = scene
            .pick(&Ray::new(DVec3::new(5.0, 0.0, 0.0), DVec3::NEG_Z), camera)
            .unwrap();
        assert_eq!(hit.node, aside);

        assert!(scene.pick(&Ray::new(camera, DVec3::Z), camera).is_none());
    }

    #[test]
    fn pick_goes_through_parent_scale() {
        let mut scene = Scene::new();
        let parent = scene.spawn(Group::new("scaled"));
        let child = cube_at(&mut scene, DVec3::ZERO);
        scene.attach(child, parent).unwrap();
        // additive: 1 + 1 = 2 on every axis
        scene
            .get_mut(parent)
            .unwrap()
            .transform_mut()
            .scale_by(1.0, 1.0, 1.0, DVec3::ZERO);

        let camera = DVec3::new(0.0, 0.0, 10.0);
        let hit = scene.pick(&Ray::new(camera, DVec3::NEG_Z), camera).unwrap();
        assert_eq!(hit.node, child);
        assert!(hit.hit.world_point.abs_diff_eq(DVec3::new(0.0, 0.0, 2.0), 1e-9));
        assert!(hit.hit.local_point.abs_diff_eq(DVec3::new(0.0, 0.0, 1.0), 1e-9));
    }

    #[test]
    fn tiny_scale_is_still_pickable() {
        let mut scene = Scene::new();
        let cube = cube_at(&mut scene, DVec3::ZERO);
        scene
            .mesh_mut(cube)
            .unwrap()
            .transform_mut()
            .set_scale(1e-6, 1e-6, 1e-6, DVec3::ZERO);

        let camera = DVec3::new(0.0, 0.0, 5.0);
        let hit = scene.pick(&Ray::new(camera, DVec3::NEG_Z), camera).unwrap();
        assert_eq!(hit.node, cube);
        assert!(hit.hit.world_point.abs_diff_eq(DVec3::new(0.0, 0.0, 1e-6), 1e-12));

        // fully collapsed: skipped, not a panic
        scene
            .mesh_mut(cube)
            .unwrap()
            .transform_mut()
            .set_scale(0.0, 1.0, 1.0, DVec3::ZERO);
        assert!(scene.pick(&Ray::new(camera, DVec3::NEG_Z), camera).is_none());
    }

    #[test]
    fn pick_with_uses_the_given_tolerances() {
        let mut scene = Scene::new();
        let floor = scene.spawn(TriangleMesh::plane(scene.ids(), 4.0));

        // skims the floor at a shallow angle
        let camera = DVec3::new(-1.5, 0.01, 0.3);
        let ray = Ray::new(camera, DVec3::new(1.0, -0.01, 0.0));

        let hit = scene.pick(&ray, camera).unwrap();
        assert_eq!(hit.node, floor);

        let strict = PickConfig::new().triangle_epsilon(0.05);
        assert!(scene.pick_with(&ray, camera, strict).is_none());
    }

    #[test]
    fn lookups_and_type_errors() {
        let mut scene = Scene::new();
        let group = scene.spawn(Group::new("rig"));
        let cube = cube_at(&mut scene, DVec3::ZERO);

        assert_eq!(scene.find_by_name("rig"), Some(group));
        assert_eq!(scene.find_by_name("Mesh-1"), Some(cube));
        assert_eq!(scene.find_by_name("nothing"), None);

        assert!(matches!(scene.mesh_mut(group), Err(SceneError::NotAMesh(_))));
        scene.mesh_mut(cube).unwrap().set_name("box");
        assert_eq!(scene.get(cube).unwrap().name(), "box");
        assert!(scene.transformed_vertices(group).unwrap().is_empty());
    }

    #[test]
    fn load_and_save_through_the_scene() {
        let dir = std::env::temp_dir().join(format!("meshpick-scene-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut scene = Scene::new();
        let parent = scene.spawn(Group::new("offset"));
        let cube = cube_at(&mut scene, DVec3::ZERO);
        scene.attach(cube, parent).unwrap();
        scene
            .get_mut(parent)
            .unwrap()
            .transform_mut()
            .translate_by(DVec3::new(0.0, 5.0, 0.0));

        let path = dir.join("baked.ply");
        scene.save_mesh(cube, &path).unwrap();
        assert!(matches!(scene.save_mesh(parent, &path), Err(SceneError::NotAMesh(_))));

        let loaded = scene.load_mesh(&path).unwrap();
        assert_eq!(scene.find_by_name("baked.ply"), Some(loaded));
        let positions = scene.with_mesh(loaded, |m| m.positions().to_vec()).unwrap();
        assert_eq!(positions, scene.transformed_vertices(cube).unwrap());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
