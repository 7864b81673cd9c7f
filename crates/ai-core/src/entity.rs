use core::fmt::Debug;
use core::hash::Hash;

/// Stable handle of a simulated entity.
///
/// Handles are plain values: they never own the entity and may outlive it.
/// Resolving a handle goes through [`crate::WorldView::contains`], which
/// yields "not found" once the entity is gone.
///
/// Deterministic simulation requires:
/// - stable ordering (`Ord`), used for tick order and map iteration
/// - a stable numeric ID (`stable_id`) for seeding and logs
pub trait EntityId: Copy + Ord + Eq + Hash + Debug + 'static {
    fn stable_id(self) -> u64;

    /// Inverse of `stable_id`, used when restoring saved state.
    fn from_stable_id(id: u64) -> Self;
}

impl EntityId for u64 {
    fn stable_id(self) -> u64 {
        self
    }

    fn from_stable_id(id: u64) -> Self {
        id
    }
}

impl EntityId for u32 {
    fn stable_id(self) -> u64 {
        u64::from(self)
    }

    fn from_stable_id(id: u64) -> Self {
        id as u32
    }
}
