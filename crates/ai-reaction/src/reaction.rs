//! Randomly chosen responses for situations that are detected elsewhere.
//!
//! A [`ReactionPool`] holds weighted [`Reaction`]s. The caller has already decided *that*
//! something should happen; the pool decides *what*.

use ai_core::{DeterministicRng, SplitMix64};
use ai_perception::PerceptionEvent;
use tracing::{debug, warn};

use crate::rule::parse_properties;
use crate::{
    ActionTemplate, EvaluationParameters, ReactionError, ReactionPoolAsset, ReactionRegistry,
    ReactionWorld, RuleEntry, RuleHeader, RuleProperties,
};

pub trait Reaction<W: ReactionWorld>: 'static {
    /// `priority` is the fallback action priority; `probability` the selection weight.
    fn header(&self) -> &RuleHeader;

    fn header_mut(&mut self) -> &mut RuleHeader;

    fn name(&self) -> &str {
        self.header().name()
    }

    fn probability(&self) -> f32 {
        self.header().probability
    }

    /// Act on behalf of `params.entity`; `trigger` is the event that led here, if any.
    fn handle(
        &mut self,
        params: &mut EvaluationParameters<'_, W>,
        trigger: Option<&PerceptionEvent<W::Agent>>,
    ) -> bool;

    fn clone_reaction(&self) -> Box<dyn Reaction<W>>;

    fn configure(&mut self, _properties: &RuleProperties) -> Result<(), ReactionError> {
        Ok(())
    }
}

impl<W: ReactionWorld> Clone for Box<dyn Reaction<W>> {
    fn clone(&self) -> Self {
        self.clone_reaction()
    }
}

/// Pushes one configured action, aimed at the trigger's entity or at the reacting entity.
#[derive(Debug, Clone)]
pub struct ActionReaction {
    header: RuleHeader,
    action: ActionTemplate,
}

impl ActionReaction {
    pub fn new(name: &str, action: ActionTemplate) -> Self {
        Self {
            header: RuleHeader::new(name),
            action,
        }
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.header.set_probability(probability);
        self
    }

    pub fn action(&self) -> &ActionTemplate {
        &self.action
    }
}

impl Default for ActionReaction {
    fn default() -> Self {
        Self::new("ActionReaction", ActionTemplate::default())
    }
}

impl<W: ReactionWorld> Reaction<W> for ActionReaction {
    fn header(&self) -> &RuleHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RuleHeader {
        &mut self.header
    }

    fn handle(
        &mut self,
        params: &mut EvaluationParameters<'_, W>,
        trigger: Option<&PerceptionEvent<W::Agent>>,
    ) -> bool {
        let target = trigger.map_or(params.entity, |e| e.entity);
        let request = self.action.build(target, self.header.priority, &mut *params.rng);
        params.push_action(request)
    }

    fn clone_reaction(&self) -> Box<dyn Reaction<W>> {
        Box::new(self.clone())
    }

    fn configure(&mut self, properties: &RuleProperties) -> Result<(), ReactionError> {
        let action: ActionTemplate = parse_properties(self.header.name(), properties)?;
        action.validate().map_err(|reason| ReactionError::InvalidProperties {
            name: self.header.name().to_owned(),
            reason,
        })?;
        self.action = action;
        Ok(())
    }
}

pub struct ReactionPool<W: ReactionWorld> {
    reactions: Vec<Box<dyn Reaction<W>>>,
    probability_range: Option<f32>,
    sorted: bool,
    rng: SplitMix64,
}

impl<W: ReactionWorld> ReactionPool<W> {
    pub fn new() -> Self {
        Self {
            reactions: Vec::new(),
            probability_range: None,
            sorted: true,
            rng: SplitMix64::default(),
        }
    }

    /// Build from asset entries; unknown or misconfigured reactions are logged and skipped.
    pub fn from_entries(
        entries: &[RuleEntry],
        probability_range: Option<f32>,
        registry: &ReactionRegistry<W>,
    ) -> Self {
        let mut pool = Self::new();
        pool.probability_range = probability_range;
        for entry in entries {
            let Some(mut reaction) = registry.create_reaction_by_name(&entry.name) else {
                warn!(name = %entry.name, "unknown reaction, skipping");
                continue;
            };
            if let Some(probability) = entry.probability {
                reaction.header_mut().set_probability(probability);
            }
            if let Some(priority) = entry.priority {
                reaction.header_mut().priority = priority;
            }
            if let Err(err) = reaction.configure(&entry.properties) {
                warn!(name = %entry.name, %err, "misconfigured reaction, skipping");
                continue;
            }
            pool.add_reaction(reaction);
        }
        pool
    }

    pub fn from_asset(asset: &ReactionPoolAsset, registry: &ReactionRegistry<W>) -> Self {
        Self::from_entries(&asset.reactions, asset.probability_range, registry)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SplitMix64::new(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = SplitMix64::new(seed);
    }

    pub fn add_reaction(&mut self, reaction: Box<dyn Reaction<W>>) {
        self.reactions.push(reaction);
        self.sorted = false;
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Reaction at `index` in selection order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn reaction(&mut self, index: usize) -> &dyn Reaction<W> {
        self.sort();
        assert!(
            index < self.reactions.len(),
            "reaction index {index} out of range (pool has {})",
            self.reactions.len()
        );
        self.reactions[index].as_ref()
    }

    pub fn probability_sum(&self) -> f32 {
        self.reactions.iter().map(|r| r.probability()).sum()
    }

    /// Upper bound of the selection draw: the explicit range, else the sum of probabilities.
    pub fn probability_range(&self) -> f32 {
        self.probability_range.unwrap_or_else(|| self.probability_sum())
    }

    /// A range above the probability sum leaves room for draws that select nothing.
    pub fn set_probability_range(&mut self, range: Option<f32>) {
        self.probability_range = range;
    }

    fn sort(&mut self) {
        if !self.sorted {
            self.reactions
                .sort_by(|a, b| b.probability().total_cmp(&a.probability()));
            self.sorted = true;
        }
    }

    /// Pick a reaction index by cumulative probability, most likely first.
    pub fn select_reaction(&mut self) -> Option<usize> {
        if self.reactions.is_empty() {
            return None;
        }
        self.sort();
        let mut draw = self.rng.next_f32_range(0.0, self.probability_range());
        for (index, reaction) in self.reactions.iter().enumerate() {
            draw -= reaction.probability();
            if draw < 0.0 {
                return Some(index);
            }
        }
        // Without an explicit range this is float rounding at the top end.
        match self.probability_range {
            Some(_) => None,
            None => Some(self.reactions.len() - 1),
        }
    }

    /// Select and run a reaction, drawing again up to `num_tries` times while the chosen
    /// reaction declines.
    pub fn execute_reaction(
        &mut self,
        params: &mut EvaluationParameters<'_, W>,
        trigger: Option<&PerceptionEvent<W::Agent>>,
        num_tries: u32,
    ) -> bool {
        for attempt in 0..num_tries.max(1) {
            let Some(index) = self.select_reaction() else {
                continue;
            };
            let reaction = &mut self.reactions[index];
            if reaction.handle(params, trigger) {
                debug!(entity = ?params.entity, reaction = reaction.name(), attempt, "reaction executed");
                return true;
            }
        }
        false
    }
}

impl<W: ReactionWorld> Default for ReactionPool<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: ReactionWorld> Clone for ReactionPool<W> {
    fn clone(&self) -> Self {
        Self {
            reactions: self.reactions.clone(),
            probability_range: self.probability_range,
            sorted: self.sorted,
            rng: self.rng,
        }
    }
}
