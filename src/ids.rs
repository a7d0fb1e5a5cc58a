//! Mesh identity.
//!
//! Every mesh gets a [`MeshId`] from an [`IdGenerator`] when it is built. The
//! generator is an ordinary value owned by whoever builds meshes (normally a
//! [`Scene`](crate::Scene)), so two scenes number their meshes independently.

use std::sync::atomic::{AtomicU64, Ordering};

/// Type-safe handle identifying one mesh.
///
/// Hit results report the mesh they struck through this handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) u64);

impl MeshId {
    /// Returns the raw sequence number.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// The label a mesh carries until something renames it, e.g. `Mesh-3`.
    pub fn default_label(self) -> String {
        format!("Mesh-{}", self.0)
    }
}

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out sequential [`MeshId`]s, starting at 1.
///
/// Safe to share between threads; ids stay unique per generator.
///
/// # Example
///
/// ```
/// use meshpick::IdGenerator;
///
/// let ids = IdGenerator::new();
/// assert_eq!(ids.next_id().default_label(), "Mesh-1");
/// assert_eq!(ids.next_id().default_label(), "Mesh-2");
/// ```
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Reserves the next id.
    pub fn next_id(&self) -> MeshId {
        MeshId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
