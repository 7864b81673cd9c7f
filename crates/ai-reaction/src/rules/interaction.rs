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

/// Partners remembered to avoid pairing with the same entity again right away.
pub const RECENT_PARTNERS: usize = 4;

pub const DEFAULT_ACKNOWLEDGE_TIMEOUT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionState {
    #[default]
    NoInteraction,
    InteractionStarted,
    StillInteracting,
    InteractionEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecentPartners<A> {
    slots: [Option<A>; RECENT_PARTNERS],
    next: usize,
}

impl<A: EntityId> RecentPartners<A> {
    fn new() -> Self {
        Self {
            slots: [None; RECENT_PARTNERS],
            next: 0,
        }
    }

    fn push(&mut self, partner: A) {
        self.slots[self.next] = Some(partner);
        self.next = (self.next + 1) % RECENT_PARTNERS;
    }

    fn contains(&self, partner: A) -> bool {
        self.slots.contains(&Some(partner))
    }

    /// Oldest first.
    fn to_vec(&self) -> Vec<A> {
        (0..RECENT_PARTNERS)
            .filter_map(|i| self.slots[(self.next + i) % RECENT_PARTNERS])
            .collect()
    }
}

/// Two-party interaction: pick a perceived partner, optionally agree on it through an
/// acknowledgement handshake, face each other and play an animation for a random time.
///
/// The handshake sends a request (`Began`) under `AcknowledgeEventId` to the partner's local
/// queue. An idle partner answers with `Continued` and starts at once; the requester starts
/// when the answer arrives, or gives up after the acknowledgement timeout.
#[derive(Debug, Clone)]
pub struct EntityInteraction<A> {
    header: RuleHeader,
    filter: EventFilter,
    acknowledge_event_id: StringHash,
    require_acknowledgement: bool,
    acknowledge_timeout: f32,
    min_duration: f32,
    max_duration: f32,
    animation_path: String,
    turn_reverse: bool,

    state: InteractionState,
    partner: Option<A>,
    end_time: f64,
    pending: Option<(A, f64)>,
    recent: RecentPartners<A>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Properties {
    #[serde(flatten)]
    filter: EventFilterProperties,
    acknowledge_event_id: String,
    require_acknowledgement: bool,
    acknowledge_timeout: f32,
    min_duration: f32,
    max_duration: f32,
    animation_path: String,
    turn_reverse: bool,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            filter: EventFilterProperties::default(),
            acknowledge_event_id: String::new(),
            require_acknowledgement: false,
            acknowledge_timeout: DEFAULT_ACKNOWLEDGE_TIMEOUT,
            min_duration: 2.0,
            max_duration: 4.0,
            animation_path: String::new(),
            turn_reverse: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InteractionMemory {
    state: InteractionState,
    partner: Option<u64>,
    end_time: f64,
    pending: Option<(u64, f64)>,
    recent: Vec<u64>,
}

impl<A: EntityId> EntityInteraction<A> {
    pub fn new(filter: EventFilter) -> Self {
        let defaults = Properties::default();
        Self {
            header: RuleHeader::new("EntityInteraction"),
            filter,
            acknowledge_event_id: StringHash::ANY,
            require_acknowledgement: false,
            acknowledge_timeout: defaults.acknowledge_timeout,
            min_duration: defaults.min_duration,
            max_duration: defaults.max_duration,
            animation_path: defaults.animation_path,
            turn_reverse: defaults.turn_reverse,
            state: InteractionState::NoInteraction,
            partner: None,
            end_time: 0.0,
            pending: None,
            recent: RecentPartners::new(),
        }
    }

    pub fn with_header(mut self, header: RuleHeader) -> Self {
        self.header = header;
        self
    }

    pub fn with_acknowledgement(mut self, event_id: &str) -> Self {
        self.acknowledge_event_id = StringHash::new(event_id);
        self.require_acknowledgement = true;
        self
    }

    pub fn with_duration(mut self, min_duration: f32, max_duration: f32) -> Self {
        self.min_duration = min_duration;
        self.max_duration = max_duration;
        self
    }

    pub fn with_animation(mut self, path: &str) -> Self {
        self.animation_path = path.to_owned();
        self
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn partner(&self) -> Option<A> {
        self.partner
    }

    pub fn pending_partner(&self) -> Option<A> {
        self.pending.map(|(partner, _)| partner)
    }

    pub fn recent_partners(&self) -> Vec<A> {
        self.recent.to_vec()
    }

    fn uses_handshake(&self) -> bool {
        self.require_acknowledgement && !self.acknowledge_event_id.is_any()
    }

    fn start<W>(&mut self, params: &mut EvaluationParameters<'_, W>, partner: A) -> bool
    where
        W: ReactionWorld<Agent = A>,
    {
        let seconds = params.random_range(self.min_duration, self.max_duration);
        let activity = timed_activity(&self.animation_path, seconds);
        if !push_turn_then(params, partner, self.turn_reverse, self.header.priority, Some(activity)) {
            return false;
        }
        debug!(entity = ?params.entity, ?partner, seconds, "interaction started");
        self.state = InteractionState::InteractionStarted;
        self.partner = Some(partner);
        self.pending = None;
        self.end_time = params.time() + f64::from(seconds);
        true
    }

    /// Answer handshake traffic in the local queue. Returns `Some` if it decided the tick.
    fn handle_acknowledgements<W>(&mut self, params: &mut EvaluationParameters<'_, W>) -> Option<bool>
    where
        W: ReactionWorld<Agent = A>,
    {
        let me = params.entity;
        for message in params.events(EventSource::Local, self.acknowledge_event_id) {
            let sender = message.entity;
            if sender == me || self.recent.contains(sender) {
                continue;
            }
            match message.state {
                PerceptionState::Began if self.pending.map_or(true, |(p, _)| p == sender) => {
                    let reply =
                        params.make_event(self.acknowledge_event_id, sender, PerceptionState::Continued);
                    params.forward_event(sender, reply);
                    return Some(self.start(params, sender));
                }
                PerceptionState::Continued if self.pending_partner() == Some(sender) => {
                    return Some(self.start(params, sender));
                }
                _ => {}
            }
        }
        None
    }

    fn look_for_partner<W>(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool
    where
        W: ReactionWorld<Agent = A>,
    {
        if self.uses_handshake() {
            if let Some(decided) = self.handle_acknowledgements(params) {
                return decided;
            }
            if let Some((partner, since)) = self.pending {
                if params.time() - since < f64::from(self.acknowledge_timeout) {
                    return false;
                }
                debug!(entity = ?params.entity, ?partner, "interaction request timed out");
                self.pending = None;
            }
        }

        let me = params.entity;
        let candidate = self
            .filter
            .collect(params)
            .into_iter()
            .map(|e| e.entity)
            .find(|&e| e != me && !self.recent.contains(e) && params.world.contains(e));
        let Some(partner) = candidate else {
            return false;
        };

        if self.uses_handshake() {
            let request = params.make_event(self.acknowledge_event_id, partner, PerceptionState::Began);
            params.forward_event(partner, request);
            self.pending = Some((partner, params.time()));
            debug!(entity = ?me, ?partner, "interaction requested");
            return true;
        }
        self.start(params, partner)
    }

    fn partner_lost<W>(&self, params: &EvaluationParameters<'_, W>, partner: A) -> bool
    where
        W: ReactionWorld<Agent = A>,
    {
        if !params.world.contains(partner) {
            return true;
        }
        match self.filter.source {
            EventSource::Sensor => !params.perceives(self.filter.event_id, partner),
            _ => self
                .filter
                .collect(params)
                .iter()
                .any(|e| e.entity == partner && e.state == PerceptionState::Ended),
        }
    }
}

impl<A: EntityId> Default for EntityInteraction<A> {
    fn default() -> Self {
        Self::new(EventFilter::new(StringHash::ANY, EventSource::Sensor))
    }
}

impl<W: ReactionWorld> ReactionRule<W> for EntityInteraction<W::Agent> {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    /// An ongoing interaction runs its own action, which would otherwise block its checks.
    fn wants_handling_despite_of_lower_priority(&self) -> bool {
        self.state != InteractionState::NoInteraction || self.pending.is_some()
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool {
        match self.state {
            InteractionState::NoInteraction => self.look_for_partner(params),
            InteractionState::InteractionStarted | InteractionState::StillInteracting => {
                let Some(partner) = self.partner else {
                    self.state = InteractionState::InteractionEnded;
                    return false;
                };
                if self.partner_lost(params, partner) || params.time() >= self.end_time {
                    debug!(entity = ?params.entity, ?partner, "interaction ended");
                    self.state = InteractionState::InteractionEnded;
                } else {
                    self.state = InteractionState::StillInteracting;
                }
                true
            }
            InteractionState::InteractionEnded => {
                if let Some(partner) = self.partner.take() {
                    self.recent.push(partner);
                }
                self.state = InteractionState::NoInteraction;
                false
            }
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
        check_durations(self.header.name(), props.min_duration, props.max_duration)?;
        if props.require_acknowledgement && props.acknowledge_event_id.is_empty() {
            return Err(ReactionError::InvalidProperties {
                name: self.header.name().to_owned(),
                reason: "RequireAcknowledgement needs an AcknowledgeEventId".into(),
            });
        }
        self.filter = props.filter.build(EventSource::Sensor);
        self.acknowledge_event_id = StringHash::new(&props.acknowledge_event_id);
        self.require_acknowledgement = props.require_acknowledgement;
        self.acknowledge_timeout = props.acknowledge_timeout.max(0.0);
        self.min_duration = props.min_duration;
        self.max_duration = props.max_duration;
        self.animation_path = props.animation_path;
        self.turn_reverse = props.turn_reverse;
        Ok(())
    }

    fn save_state(&self) -> Value {
        let memory = InteractionMemory {
            state: self.state,
            partner: self.partner.map(EntityId::stable_id),
            end_time: self.end_time,
            pending: self.pending.map(|(p, since)| (p.stable_id(), since)),
            recent: self.recent.to_vec().into_iter().map(EntityId::stable_id).collect(),
        };
        serde_json::to_value(memory).unwrap_or(Value::Null)
    }

    fn load_state(&mut self, state: Value) -> Result<(), ReactionError> {
        let memory: InteractionMemory = parse_state(self.header.name(), state)?;
        self.state = memory.state;
        self.partner = memory.partner.map(EntityId::from_stable_id);
        self.end_time = memory.end_time;
        self.pending = memory.pending.map(|(p, since)| (EntityId::from_stable_id(p), since));
        self.recent = RecentPartners::new();
        for partner in memory.recent {
            self.recent.push(EntityId::from_stable_id(partner));
        }
        Ok(())
    }
}
