//! Rendezvous: a stationary point catches one passer-by and tells it to wait.

use ai_core::{EntityId, StringHash};
use ai_perception::PerceptionState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{check_durations, push_turn_then, timed_activity};
use crate::rule::{parse_properties, parse_state};
use crate::standard::EventFilterProperties;
use crate::{
    EvaluationParameters, EventFilter, EventSource, ReactionError, ReactionRegistry, ReactionRule,
    ReactionWorld, RuleHeader, RuleProperties,
};

/// Runs on the waiting point. Catches the first entity its sensor perceives and forwards
/// `ForwardEventId` to it once. The catch is held while the entity stays perceived and
/// released when it is gone; a new entity is caught on a later evaluation.
#[derive(Debug, Clone)]
pub struct CheckWaitingPoint<A> {
    header: RuleHeader,
    filter: EventFilter,
    forward_event_id: StringHash,
    caught: Option<A>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CheckProperties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    #[serde(rename = "ForwardEventId")]
    forward_event_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatchMemory {
    caught: Option<u64>,
}

impl<A: EntityId> CheckWaitingPoint<A> {
    pub fn new(sensor_event_id: &str, forward_event_id: &str) -> Self {
        Self {
            header: RuleHeader::new("CheckWaitingPoint"),
            filter: EventFilter::sensor(sensor_event_id),
            forward_event_id: StringHash::new(forward_event_id),
            caught: None,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn caught(&self) -> Option<A> {
        self.caught
    }
}

impl<A: EntityId> Default for CheckWaitingPoint<A> {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl<W: ReactionWorld> ReactionRule<W> for CheckWaitingPoint<W::Agent> {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let events = self.filter.collect(params);

        if let Some(caught) = self.caught {
            let still_there = params.perceives(self.filter.event_id, caught)
                || events.iter().any(|e| e.entity == caught && e.state.is_present());
            if !still_there {
                debug!(point = ?params.entity, entity = ?caught, "waiting point released");
                self.caught = None;
            }
            return false;
        }

        let me = params.entity;
        let Some(event) = events
            .iter()
            .find(|e| e.entity != me && e.state.is_present())
        else {
            return false;
        };
        let notice = params.make_event(self.forward_event_id, event.entity, PerceptionState::Began);
        params.forward_event(event.entity, notice);
        self.caught = Some(event.entity);
        debug!(point = ?me, entity = ?event.entity, "waiting point caught entity");
        true
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: CheckProperties = parse_properties(self.header.name(), properties)?;
        if props.forward_event_id.is_empty() {
            return Err(ReactionError::InvalidProperties {
                name: self.header.name().to_owned(),
                reason: "ForwardEventId is required".into(),
            });
        }
        self.filter = props.filter.build(EventSource::Sensor);
        self.forward_event_id = StringHash::new(&props.forward_event_id);
        Ok(())
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(CatchMemory {
            caught: self.caught.map(EntityId::stable_id),
        })
        .unwrap_or(Value::Null)
    }

    fn load_state(&mut self, state: Value) -> Result<(), ReactionError> {
        let memory: CatchMemory = parse_state(self.header.name(), state)?;
        self.caught = memory.caught.map(EntityId::from_stable_id);
        Ok(())
    }
}

/// Runs on the caught entity: face the point and wait there for a random time.
#[derive(Debug, Clone)]
pub struct WaitAtWaitingPoint {
    header: RuleHeader,
    filter: EventFilter,
    min_duration: f32,
    max_duration: f32,
    animation_path: String,
    turn_reverse: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WaitProperties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    min_duration: f32,
    max_duration: f32,
    animation_path: String,
    turn_reverse: bool,
}

impl Default for WaitProperties {
    fn default() -> Self {
        Self {
            filter: EventFilterProperties::default(),
            min_duration: 2.0,
            max_duration: 5.0,
            animation_path: String::new(),
            turn_reverse: false,
        }
    }
}

impl WaitAtWaitingPoint {
    pub fn new(event_id: &str, min_duration: f32, max_duration: f32) -> Self {
        Self {
            header: RuleHeader::new("WaitAtWaitingPoint"),
            filter: EventFilter::local(event_id),
            min_duration,
            max_duration,
            animation_path: String::new(),
            turn_reverse: false,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn with_animation(mut self, path: &str) -> Self {
        self.animation_path = path.to_owned();
        self
    }
}

impl Default for WaitAtWaitingPoint {
    fn default() -> Self {
        let defaults = WaitProperties::default();
        Self::new("", defaults.min_duration, defaults.max_duration)
    }
}

impl<W: ReactionWorld> ReactionRule<W> for WaitAtWaitingPoint {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let Some(point) = self
            .filter
            .collect(params)
            .into_iter()
            .find(|e| e.state.is_present())
            .map(|e| e.entity)
        else {
            return false;
        };
        let seconds = params.random_range(self.min_duration, self.max_duration);
        let activity = timed_activity(&self.animation_path, seconds);
        if !push_turn_then(params, point, self.turn_reverse, self.header.priority, Some(activity)) {
            return false;
        }
        debug!(entity = ?params.entity, ?point, seconds, "waiting at waiting point");
        true
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: WaitProperties = parse_properties(self.header.name(), properties)?;
        check_durations(self.header.name(), props.min_duration, props.max_duration)?;
        self.filter = props.filter.build(EventSource::Local);
        self.min_duration = props.min_duration;
        self.max_duration = props.max_duration;
        self.animation_path = props.animation_path;
        self.turn_reverse = props.turn_reverse;
        Ok(())
    }
}
