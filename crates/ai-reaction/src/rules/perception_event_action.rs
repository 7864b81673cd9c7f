use ai_perception::PerceptionEvent;
use tracing::debug;

use crate::rule::parse_properties;
use crate::standard::EventFilterProperties;
use crate::{
    ActionTemplate, EvaluationParameters, EventFilter, EventSource, ReactionError, ReactionRegistry,
    ReactionRule, ReactionWorld, RuleHeader, RuleProperties,
};

/// Pushes a configured action aimed at the entity of the first present matching event.
#[derive(Debug, Clone)]
pub struct PerceptionEventAction {
    header: RuleHeader,
    filter: EventFilter,
    action: ActionTemplate,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Properties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    #[serde(flatten)]
    action: ActionTemplate,
}

impl PerceptionEventAction {
    pub fn new(filter: EventFilter, action: ActionTemplate) -> Self {
        Self {
            header: RuleHeader::new("PerceptionEventAction"),
            filter,
            action,
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn filter(&self) -> EventFilter {
        self.filter
    }
}

impl Default for PerceptionEventAction {
    fn default() -> Self {
        Self::new(EventFilter::default(), ActionTemplate::default())
    }
}

/// Shared by the rules that answer one event with one templated action.
pub(crate) fn act_on_first_present<W: ReactionWorld>(
    header: &RuleHeader,
    filter: EventFilter,
    action: &ActionTemplate,
    params: &mut EvaluationParameters<'_, W>,
    accept: impl Fn(&PerceptionEvent<W::Agent>) -> bool,
) -> bool {
    filter.handle_first(params, |params, event| {
        if !accept(event) {
            return false;
        }
        let request = action.build(event.entity, header.priority, &mut *params.rng);
        if !params.push_action(request) {
            return false;
        }
        debug!(entity = ?params.entity, target = ?event.entity, rule = header.name(), "action pushed");
        true
    })
}

impl<W: ReactionWorld> ReactionRule<W> for PerceptionEventAction {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        act_on_first_present(&self.header, self.filter, &self.action, params, |e| e.state.is_present())
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
        props.action.validate().map_err(|reason| ReactionError::InvalidProperties {
            name: self.header.name().to_owned(),
            reason,
        })?;
        self.filter = props.filter.build(EventSource::Local);
        self.action = props.action;
        Ok(())
    }
}
