use ai_core::StringHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::perception_event_action::act_on_first_present;
use crate::rule::{parse_properties, parse_state};
use crate::standard::EventFilterProperties;
use crate::{
    ActionPriority, ActionTemplate, EvaluationParameters, EventFilter, EventSource, ReactionError,
    ReactionRegistry, ReactionRule, ReactionWorld, RuleHeader, RuleProperties,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Properties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    #[serde(flatten)]
    action: ActionTemplate,
    #[serde(rename = "EndEventId")]
    end_event_id: String,
}

fn invalid(name: &str, reason: String) -> ReactionError {
    ReactionError::InvalidProperties {
        name: name.to_owned(),
        reason,
    }
}

/// Reacts to a broadcast once per occurrence with a templated action.
#[derive(Debug, Clone)]
pub struct GlobalEvent {
    header: RuleHeader,
    filter: EventFilter,
    action: ActionTemplate,
}

impl GlobalEvent {
    pub fn new(event_id: &str, action: ActionTemplate) -> Self {
        Self {
            header: RuleHeader::new("GlobalEvent"),
            filter: EventFilter::global(event_id),
            action,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }
}

impl Default for GlobalEvent {
    fn default() -> Self {
        Self::new("", ActionTemplate::default())
    }
}

impl<W: ReactionWorld> ReactionRule<W> for GlobalEvent {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        act_on_first_present(&self.header, self.filter, &self.action, params, |_| true)
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: Properties = parse_properties(self.header.name(), properties)?;
        props
            .action
            .validate()
            .map_err(|reason| invalid(self.header.name(), reason))?;
        self.filter = props.filter.build(EventSource::Global);
        self.action = props.action;
        Ok(())
    }
}

/// Starts an action on a start broadcast and clears it on the matching end broadcast.
///
/// End events are ignored until a start was seen.
#[derive(Debug, Clone)]
pub struct GlobalEventStartEnd {
    header: RuleHeader,
    start: EventFilter,
    end_event_id: StringHash,
    action: ActionTemplate,
    started: Option<ActionPriority>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StartEndMemory {
    started: Option<ActionPriority>,
}

impl GlobalEventStartEnd {
    pub fn new(start_event_id: &str, end_event_id: &str, action: ActionTemplate) -> Self {
        Self {
            header: RuleHeader::new("GlobalEventStartEnd"),
            start: EventFilter::global(start_event_id),
            end_event_id: StringHash::new(end_event_id),
            action,
            started: None,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    fn on_event_start<W: ReactionWorld>(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        let Some(event) = self.start.collect(params).into_iter().next() else {
            return false;
        };
        let request = self.action.build(event.entity, self.header.priority, &mut *params.rng);
        let priority = request.priority;
        if !params.push_action(request) {
            return false;
        }
        debug!(entity = ?params.entity, rule = self.header.name(), "global event started");
        self.started = Some(priority);
        true
    }

    fn on_event_end<W: ReactionWorld>(
        &mut self,
        params: &mut EvaluationParameters<'_, W>,
        priority: ActionPriority,
    ) -> bool {
        if params.events(self.start.source, self.end_event_id).is_empty() {
            return false;
        }
        let cleared = params.clear_actions(priority);
        debug!(entity = ?params.entity, rule = self.header.name(), cleared, "global event ended");
        self.started = None;
        true
    }
}

impl Default for GlobalEventStartEnd {
    fn default() -> Self {
        Self::new("", "", ActionTemplate::default())
    }
}

impl<W: ReactionWorld> ReactionRule<W> for GlobalEventStartEnd {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    /// The end event must be seen even while the started action outranks this rule.
    fn wants_handling_despite_of_lower_priority(&self) -> bool {
        self.started.is_some()
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        match self.started {
            None => self.on_event_start(params),
            Some(priority) => self.on_event_end(params, priority),
        }
    }

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>> {
        Box::new(self.clone())
    }

    fn configure(
        &mut self,
        properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        let props: Properties = parse_properties(self.header.name(), properties)?;
        props
            .action
            .validate()
            .map_err(|reason| invalid(self.header.name(), reason))?;
        if props.end_event_id.is_empty() {
            return Err(invalid(self.header.name(), "EndEventId is required".into()));
        }
        self.start = props.filter.build(EventSource::Global);
        self.end_event_id = StringHash::new(&props.end_event_id);
        self.action = props.action;
        Ok(())
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(StartEndMemory {
            started: self.started,
        })
        .unwrap_or(Value::Null)
    }

    fn load_state(&mut self, state: Value) -> Result<(), ReactionError> {
        let memory: StartEndMemory = parse_state(self.header.name(), state)?;
        self.started = memory.started;
        Ok(())
    }
}
