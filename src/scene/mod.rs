//! Scene graph: drawables arranged in a parent/child tree.
//!
//! A [`Scene`] owns its nodes in a `hecs` world. Each node holds a boxed
//! [`Drawable`], either a [`TriangleMesh`](crate::TriangleMesh) or a
//! transform-only [`Group`], and its effective transform is the chain of its
//! ancestors' transforms applied to its own.
//!
//! Picking goes through the whole tree: [`Scene::pick`] takes a world-space
//! ray, brings it into each node's local space with the inverse world matrix,
//! and returns the hit closest to the camera.

mod graph;
mod node;

pub use graph::{NodeId, Scene, SceneHit};
pub use node::{Drawable, Group, Node};
