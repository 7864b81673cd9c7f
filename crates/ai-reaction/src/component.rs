use ai_core::{SplitMix64, TickContext, UpdateInterval};
use ai_perception::{EventOutbox, PerceptionEvent, PerceptionEventQueue, SensorComponent};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    Effort, EvaluationParameters, ReactionComponentAsset, ReactionError, ReactionRegistry,
    ReactionRulesTable, ReactionWorld, RuleState,
};

/// What happens to the local event queue after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocalQueuePolicy {
    /// Events live until the next evaluation that actually runs.
    #[default]
    ClearAfterEvaluation,
    /// Rules or callers clear the queue themselves.
    Keep,
}

/// Saved runtime state of a [`ReactionComponent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionComponentState<A> {
    pub countdown: f32,
    pub local: Vec<PerceptionEvent<A>>,
    pub rules: Vec<RuleState>,
}

/// Per-entity reaction state: a rules table, a local event queue and an update timer.
pub struct ReactionComponent<W: ReactionWorld> {
    rules: ReactionRulesTable<W>,
    local: PerceptionEventQueue<W::Agent>,
    interval: UpdateInterval,
    min_priority: u32,
    local_queue_policy: LocalQueuePolicy,
    has_action_component: Option<bool>,
    rng: SplitMix64,
}

impl<W: ReactionWorld> ReactionComponent<W> {
    pub fn new(rules: ReactionRulesTable<W>) -> Self {
        Self {
            rules,
            local: PerceptionEventQueue::new(),
            interval: UpdateInterval::every_tick(),
            min_priority: 0,
            local_queue_policy: LocalQueuePolicy::default(),
            has_action_component: None,
            rng: SplitMix64::default(),
        }
    }

    /// Build from an asset, rejecting negative or non-finite timer values.
    pub fn from_asset(
        asset: &ReactionComponentAsset,
        registry: &ReactionRegistry<W>,
    ) -> Result<Self, ReactionError> {
        asset.validate()?;
        Ok(Self::new(ReactionRulesTable::from_entries(&asset.rules, registry))
            .with_update_interval(UpdateInterval::new(asset.update_interval, asset.update_jitter))
            .with_minimum_priority(asset.minimum_priority)
            .with_local_queue_policy(asset.local_queue_policy))
    }

    pub fn from_json(
        value: &serde_json::Value,
        registry: &ReactionRegistry<W>,
    ) -> Result<Self, ReactionError> {
        let asset = ReactionComponentAsset::from_json(value)?;
        Self::from_asset(&asset, registry)
    }

    pub fn with_update_interval(mut self, interval: UpdateInterval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_minimum_priority(mut self, min_priority: u32) -> Self {
        self.min_priority = min_priority;
        self
    }

    pub fn with_local_queue_policy(mut self, policy: LocalQueuePolicy) -> Self {
        self.local_queue_policy = policy;
        self
    }

    /// Reseed the evaluation randomness of this component and its rules table.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SplitMix64::new(seed);
        self.rules.reseed(ai_core::rng::mix64(seed));
        self
    }

    pub fn rules(&self) -> &ReactionRulesTable<W> {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut ReactionRulesTable<W> {
        &mut self.rules
    }

    pub fn local_queue(&self) -> &PerceptionEventQueue<W::Agent> {
        &self.local
    }

    pub fn local_queue_mut(&mut self) -> &mut PerceptionEventQueue<W::Agent> {
        &mut self.local
    }

    pub fn push_local_event(&mut self, event: PerceptionEvent<W::Agent>) {
        self.local.push(event);
    }

    pub fn minimum_priority(&self) -> u32 {
        self.min_priority
    }

    /// AI level-of-detail floor: rules below it only run if they insist.
    pub fn set_minimum_priority(&mut self, min_priority: u32) {
        self.min_priority = min_priority;
    }

    pub fn local_queue_policy(&self) -> LocalQueuePolicy {
        self.local_queue_policy
    }

    pub fn update_interval(&self) -> &UpdateInterval {
        &self.interval
    }

    /// Resolve the entity's action component. Runs once, on the first update at the latest.
    pub fn on_startup(&mut self, entity: W::Agent, world: &W) -> bool {
        let has = world.has_action_component(entity);
        if !has {
            warn!(?entity, "reaction component without action component; actions will be dropped");
        }
        self.has_action_component = Some(has);
        has
    }

    /// Scheduled evaluation. Returns `Trivial` when the timer is not due or no rule acted.
    pub fn update(
        &mut self,
        ctx: &TickContext,
        entity: W::Agent,
        world: &mut W,
        global: &PerceptionEventQueue<W::Agent>,
        sensors: Option<&mut SensorComponent<W::Agent>>,
        outbox: &mut EventOutbox<W::Agent>,
    ) -> Effort {
        let has_action_component = match self.has_action_component {
            Some(has) => has,
            None => self.on_startup(entity, world),
        };
        if !self.interval.poll(ctx.dt_seconds, &mut self.rng) {
            return Effort::Trivial;
        }

        let mut params = EvaluationParameters {
            ctx,
            entity,
            world,
            local: &self.local,
            global,
            sensors,
            outbox,
            rng: &mut self.rng,
            has_action_component,
        };
        let effort = self.rules.update(self.min_priority, &mut params);

        if self.local_queue_policy == LocalQueuePolicy::ClearAfterEvaluation {
            self.local.clear();
        }
        effort
    }

    pub fn save_state(&self) -> ReactionComponentState<W::Agent> {
        ReactionComponentState {
            countdown: self.interval.countdown(),
            local: self.local.as_slice().to_vec(),
            rules: self.rules.save_state(),
        }
    }

    pub fn load_state(&mut self, state: ReactionComponentState<W::Agent>) -> Result<(), ReactionError> {
        self.rules.load_state(state.rules)?;
        self.interval.set_countdown(state.countdown);
        self.local.clear();
        self.local.extend(state.local);
        Ok(())
    }
}

impl<W: ReactionWorld> Clone for ReactionComponent<W> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            local: self.local.clone(),
            interval: self.interval,
            min_priority: self.min_priority,
            local_queue_policy: self.local_queue_policy,
            has_action_component: self.has_action_component,
            rng: self.rng,
        }
    }
}
