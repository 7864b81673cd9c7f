use ai_core::{EntityId, StringHash};
use serde::{Deserialize, Serialize};

use crate::PerceptionState;

/// Transferable notification "`perceived_by` perceives `entity`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptionEvent<A> {
    pub event_id: StringHash,
    pub entity: A,
    pub perceived_by: A,
    pub state: PerceptionState,
}

impl<A: EntityId> PerceptionEvent<A> {
    pub fn new(event_id: StringHash, entity: A, perceived_by: A, state: PerceptionState) -> Self {
        Self {
            event_id,
            entity,
            perceived_by,
            state,
        }
    }

    /// The same event seen from the other side: `entity` and `perceived_by` exchanged.
    pub fn with_swapped_entities(&self) -> Self {
        Self {
            entity: self.perceived_by,
            perceived_by: self.entity,
            ..*self
        }
    }

    pub fn with_event_id(&self, event_id: StringHash) -> Self {
        Self { event_id, ..*self }
    }

    pub fn with_state(&self, state: PerceptionState) -> Self {
        Self { state, ..*self }
    }

    pub fn matches(&self, event_id: StringHash) -> bool {
        event_id.accepts(self.event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapping_exchanges_only_the_parties() {
        let event = PerceptionEvent::new(StringHash::new("seen"), 1u64, 2u64, PerceptionState::Began);
        let swapped = event.with_swapped_entities();
        assert_eq!(swapped.entity, 2);
        assert_eq!(swapped.perceived_by, 1);
        assert_eq!(swapped.event_id, event.event_id);
        assert_eq!(swapped.state, event.state);
        assert_eq!(swapped.with_swapped_entities(), event);
    }
}
