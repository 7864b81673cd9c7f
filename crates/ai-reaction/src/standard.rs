//! The "one event id from one source" rule shape shared by most built-in rules.

use ai_core::StringHash;
use ai_perception::PerceptionEvent;
use serde::{Deserialize, Serialize};

use crate::{EvaluationParameters, ReactionWorld};

/// Where a rule looks for its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventSource {
    /// The entity's own event queue.
    #[default]
    Local,
    /// The per-frame queue shared by every entity.
    Global,
    /// The current perceptions of the entity's sensors.
    Sensor,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFilter {
    pub event_id: StringHash,
    pub source: EventSource,
}

impl EventFilter {
    pub fn new(event_id: StringHash, source: EventSource) -> Self {
        Self { event_id, source }
    }

    pub fn local(event_id: &str) -> Self {
        Self::new(StringHash::new(event_id), EventSource::Local)
    }

    pub fn global(event_id: &str) -> Self {
        Self::new(StringHash::new(event_id), EventSource::Global)
    }

    pub fn sensor(event_id: &str) -> Self {
        Self::new(StringHash::new(event_id), EventSource::Sensor)
    }

    pub fn collect<W: ReactionWorld>(
        &self,
        params: &EvaluationParameters<'_, W>,
    ) -> Vec<PerceptionEvent<W::Agent>> {
        params.events(self.source, self.event_id)
    }

    /// Offer the matching events to `handler` in order until it accepts one.
    pub fn handle_first<W, F>(&self, params: &mut EvaluationParameters<'_, W>, mut handler: F) -> bool
    where
        W: ReactionWorld,
        F: FnMut(&mut EvaluationParameters<'_, W>, &PerceptionEvent<W::Agent>) -> bool,
    {
        for event in self.collect(params) {
            if handler(params, &event) {
                return true;
            }
        }
        false
    }
}

/// Asset tags selecting the event a rule listens to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventFilterProperties {
    pub event_id: String,
    pub event_source: Option<EventSource>,
}

impl EventFilterProperties {
    pub fn build(&self, default_source: EventSource) -> EventFilter {
        EventFilter::new(
            StringHash::new(&self.event_id),
            self.event_source.unwrap_or(default_source),
        )
    }
}
