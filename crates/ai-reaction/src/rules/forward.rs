use ai_core::StringHash;
use serde::Deserialize;
use tracing::debug;

use super::{check_durations, push_turn_then, timed_activity};
use crate::rule::parse_properties;
use crate::standard::EventFilterProperties;
use crate::{
    EvaluationParameters, EventFilter, EventSource, ReactionError, ReactionRegistry, ReactionRule,
    ReactionWorld, RuleHeader, RuleProperties,
};

/// Relays each matching event to the entity it is about, under a new event id.
///
/// One detector can notify every entity its sensor sees, so the receivers need no sensor
/// of their own. The relayed event is swapped: `entity` is the detector.
#[derive(Debug, Clone)]
pub struct ForwardLocalEvent {
    header: RuleHeader,
    filter: EventFilter,
    forward_event_id: StringHash,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForwardProperties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    #[serde(rename = "ForwardEventId")]
    forward_event_id: String,
}

impl ForwardLocalEvent {
    pub fn new(filter: EventFilter, forward_event_id: &str) -> Self {
        Self {
            header: RuleHeader::new("ForwardLocalEvent"),
            filter,
            forward_event_id: StringHash::new(forward_event_id),
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }
}

impl Default for ForwardLocalEvent {
    fn default() -> Self {
        Self::new(EventFilter::default(), "")
    }
}

impl<W: ReactionWorld> ReactionRule<W> for ForwardLocalEvent {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let mut forwarded = 0usize;
        for event in self.filter.collect(params) {
            if event.entity == params.entity {
                continue;
            }
            let relayed = event
                .with_swapped_entities()
                .with_event_id(self.forward_event_id);
            params.forward_event(event.entity, relayed);
            forwarded += 1;
        }
        if forwarded > 0 {
            debug!(entity = ?params.entity, forwarded, "forwarded local events");
        }
        forwarded > 0
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: ForwardProperties = parse_properties(self.header.name(), properties)?;
        self.filter = props.filter.build(EventSource::Local);
        self.forward_event_id = StringHash::new(&props.forward_event_id);
        Ok(())
    }
}

/// Receiving side of [`ForwardLocalEvent`]: turn towards (or away from) the sender, then
/// optionally play an animation.
#[derive(Debug, Clone)]
pub struct HandleForwardedLocalEvent {
    header: RuleHeader,
    filter: EventFilter,
    turn_reverse: bool,
    animation_path: String,
    min_duration: f32,
    max_duration: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct HandleProperties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    turn_reverse: bool,
    animation_path: String,
    min_duration: f32,
    max_duration: f32,
}

impl Default for HandleProperties {
    fn default() -> Self {
        Self {
            filter: EventFilterProperties::default(),
            turn_reverse: false,
            animation_path: String::new(),
            min_duration: 1.0,
            max_duration: 1.0,
        }
    }
}

impl HandleForwardedLocalEvent {
    pub fn new(event_id: &str) -> Self {
        Self {
            header: RuleHeader::new("HandleForwardedLocalEvent"),
            filter: EventFilter::local(event_id),
            turn_reverse: false,
            animation_path: String::new(),
            min_duration: 1.0,
            max_duration: 1.0,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn turning_away(mut self) -> Self {
        self.turn_reverse = true;
        self
    }

    pub fn with_animation(mut self, path: &str, min_duration: f32, max_duration: f32) -> Self {
        self.animation_path = path.to_owned();
        self.min_duration = min_duration;
        self.max_duration = max_duration;
        self
    }
}

impl Default for HandleForwardedLocalEvent {
    fn default() -> Self {
        Self::new("")
    }
}

impl<W: ReactionWorld> ReactionRule<W> for HandleForwardedLocalEvent {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let Some(event) = self
            .filter
            .collect(params)
            .into_iter()
            .find(|e| e.state.is_present())
        else {
            return false;
        };
        let follow_up = (!self.animation_path.is_empty()).then(|| {
            let seconds = params.random_range(self.min_duration, self.max_duration);
            timed_activity(&self.animation_path, seconds)
        });
        push_turn_then(params, event.entity, self.turn_reverse, self.header.priority, follow_up)
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: HandleProperties = parse_properties(self.header.name(), properties)?;
        check_durations(self.header.name(), props.min_duration, props.max_duration)?;
        self.filter = props.filter.build(EventSource::Local);
        self.turn_reverse = props.turn_reverse;
        self.animation_path = props.animation_path;
        self.min_duration = props.min_duration;
        self.max_duration = props.max_duration;
        Ok(())
    }
}
