//! # meshpick
//!
//! **Triangle meshes you can load, move, and click on.**
//!
//! Meshes keep their vertex data untouched and carry a pivot-based transform;
//! picking a mesh is an analytic ray test (bounding box, then every triangle)
//! that reports the hit closest to the camera.
//!
//! ## Quick Start
//!
//! ```
//! use meshpick::*;
//!
//! let mut scene = Scene::new();
//!
//! let mut cube = TriangleMesh::cube(scene.ids(), 2.0);
//! cube.rotate_by(0.0, 45f64.to_radians(), 0.0);
//! cube.translate_by(DVec3::new(0.0, 0.0, -6.0));
//! let cube = scene.spawn(cube);
//!
//! let camera = DVec3::ZERO;
//! let ray = Ray::new(camera, DVec3::NEG_Z);
//!
//! match scene.pick(&ray, camera) {
//!     Some(hit) => assert_eq!(hit.node, cube),
//!     None => unreachable!("the cube sits straight ahead"),
//! }
//! ```
//!
//! ## Pieces
//!
//! - **[`TriangleMesh`]**: shared vertices, per-vertex colors, triangle indices,
//!   with centroid, bounds, and triangles derived once at construction.
//! - **[`PivotTransform`]**: translation, rotation, and additive scale about a
//!   pivot, applied lazily.
//! - **[`ply`]**: ASCII PLY load and save. Saving bakes the transform in.
//! - **[`Scene`]**: a parent/child tree of drawables with scene-wide picking.
//!
//! Heavy per-vertex and per-triangle work runs on rayon's thread pool.

mod aabb;
mod color;
mod error;
mod ids;
mod mesh;
mod picking;
pub mod ply;
pub mod scene;
mod transform;
mod triangle;

pub use aabb::Aabb;
pub use color::{Color, RenderVertex};
pub use error::{MeshError, MeshResult, PlyError, PlyResult, SceneError, SceneResult};
pub use ids::{IdGenerator, MeshId};
pub use mesh::TriangleMesh;
pub use picking::{HitQuery, Hittable, MeshHit, PickConfig, Ray};
pub use scene::{Drawable, Group, Node, NodeId, Scene, SceneHit};
pub use transform::PivotTransform;
pub use triangle::{Triangle, TriangleCollection, TriangleHit};

// Re-export the math types used throughout the API
pub use glam::{DMat3, DMat4, DVec3};
