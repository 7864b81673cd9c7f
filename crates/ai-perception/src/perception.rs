use ai_core::{EntityId, WorldView};
use serde::{Deserialize, Serialize};

/// Lifecycle of a perception across two consecutive sensor scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerceptionState {
    /// Detected in this scan but not in the previous one.
    Began,
    /// Detected in this scan and in the previous one.
    Continued,
    /// Detected in the previous scan only; kept for one scan as information.
    Ended,
}

impl PerceptionState {
    pub fn is_present(self) -> bool {
        !matches!(self, PerceptionState::Ended)
    }
}

/// A sensor's record of one detected entity.
///
/// `entity` is a non-owning handle; use [`Perception::resolve`] to find out whether the
/// entity still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception<A> {
    pub entity: A,
    pub state: PerceptionState,
}

impl<A: EntityId> Perception<A> {
    pub fn new(entity: A, state: PerceptionState) -> Self {
        Self { entity, state }
    }

    pub fn is_present(&self) -> bool {
        self.state.is_present()
    }

    pub fn resolve<W>(&self, world: &W) -> Option<A>
    where
        W: WorldView<Agent = A> + ?Sized,
    {
        world.contains(self.entity).then_some(self.entity)
    }
}
