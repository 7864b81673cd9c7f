use ai_core::{EntityId, StringHash};
use serde::{Deserialize, Serialize};

use crate::PerceptionEvent;

/// Append-only event log for one tick scope (global, or one entity's local queue).
///
/// Iteration preserves push order. Whoever owns the queue decides when it is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptionEventQueue<A> {
    events: Vec<PerceptionEvent<A>>,
}

impl<A: EntityId> PerceptionEventQueue<A> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: PerceptionEvent<A>) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events whose id equals `event_id`, or all events for [`StringHash::ANY`].
    pub fn iter(&self, event_id: StringHash) -> impl Iterator<Item = &PerceptionEvent<A>> + '_ {
        self.events.iter().filter(move |event| event.matches(event_id))
    }

    pub fn first(&self, event_id: StringHash) -> Option<&PerceptionEvent<A>> {
        self.iter(event_id).next()
    }

    pub fn contains(&self, event_id: StringHash) -> bool {
        self.first(event_id).is_some()
    }

    pub fn as_slice(&self) -> &[PerceptionEvent<A>] {
        &self.events
    }
}

impl<A: EntityId> Default for PerceptionEventQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: EntityId> Extend<PerceptionEvent<A>> for PerceptionEventQueue<A> {
    fn extend<I: IntoIterator<Item = PerceptionEvent<A>>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}
