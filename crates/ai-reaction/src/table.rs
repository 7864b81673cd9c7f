use ai_core::{rng, DeterministicRng, SplitMix64, StringHash};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{EvaluationParameters, ReactionError, ReactionRegistry, ReactionRule, ReactionWorld, RuleEntry};

/// How much work an evaluation did, for load balancing by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Effort {
    /// Nothing fired.
    Trivial,
    /// A rule acted.
    Regular,
}

/// Saved memory of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleState {
    pub id: StringHash,
    pub state: Value,
}

/// Priority-ordered decision list: the first eligible rule that acts wins the tick.
pub struct ReactionRulesTable<W: ReactionWorld> {
    rules: Vec<Box<dyn ReactionRule<W>>>,
    rng: SplitMix64,
}

impl<W: ReactionWorld> ReactionRulesTable<W> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            rng: SplitMix64::default(),
        }
    }

    /// Build from asset entries. Unknown or misconfigured rules are logged and left out.
    pub fn from_entries(entries: &[RuleEntry], registry: &ReactionRegistry<W>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            match registry.create_rule_from_entry(entry) {
                Ok(rule) => table.add_rule(rule),
                Err(err) => warn!(name = %entry.name, %err, "skipping reaction rule"),
            }
        }
        table
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    /// Reseed the probability gate and every rule's own randomness, each from its own stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SplitMix64::new(seed);
        for (index, rule) in self.rules.iter_mut().enumerate() {
            let stream = u64::from(rule.id().id()) ^ ((index as u64) << 32);
            rule.reseed(rng::derive_seed(seed, stream, 0x4EAC_0002));
        }
    }

    /// Insert keeping descending priority; equal priorities keep insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn ReactionRule<W>>) {
        let index = self
            .rules
            .iter()
            .position(|r| r.priority() < rule.priority())
            .unwrap_or(self.rules.len());
        self.rules.insert(index, rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ReactionRule<W>> + '_ {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn find(&self, id: StringHash) -> Option<&dyn ReactionRule<W>> {
        self.iter().find(|r| r.id() == id)
    }

    pub fn find_mut(&mut self, id: StringHash) -> Option<&mut Box<dyn ReactionRule<W>>> {
        self.rules.iter_mut().find(|r| r.id() == id)
    }

    pub fn is_eligible(rule: &dyn ReactionRule<W>, min_priority: u32, current_action: Option<u32>) -> bool {
        if rule.wants_handling_despite_of_lower_priority() {
            return true;
        }
        rule.priority() >= min_priority && current_action.map_or(true, |current| rule.priority() > current)
    }

    /// Evaluate the rules in order until one acts.
    ///
    /// Rules below `min_priority` or not above the running action's priority are skipped
    /// unless they ask to be handled anyway; the rest pass a probability gate first.
    pub fn update(&mut self, min_priority: u32, params: &mut EvaluationParameters<'_, W>) -> Effort {
        for rule in &mut self.rules {
            let current = params.current_action_priority();
            if !Self::is_eligible(rule.as_ref(), min_priority, current) {
                continue;
            }
            let draw = self.rng.next_f32_unit();
            if draw >= rule.probability() {
                trace!(rule = rule.name(), draw, "probability gate rejected rule");
                continue;
            }
            if rule.handle(params) {
                debug!(entity = ?params.entity, rule = rule.name(), priority = rule.priority(), "reaction rule fired");
                return Effort::Regular;
            }
        }
        Effort::Trivial
    }

    pub fn save_state(&self) -> Vec<RuleState> {
        self.rules
            .iter()
            .map(|r| RuleState {
                id: r.id(),
                state: r.save_state(),
            })
            .collect()
    }

    /// Restore rule memory; the saved list must match this table rule for rule.
    pub fn load_state(&mut self, states: Vec<RuleState>) -> Result<(), ReactionError> {
        if states.len() != self.rules.len() {
            return Err(ReactionError::StateMismatch(format!(
                "expected {} rule states, found {}",
                self.rules.len(),
                states.len()
            )));
        }
        if let Some((rule, state)) = self.rules.iter().zip(&states).find(|(r, s)| r.id() != s.id) {
            return Err(ReactionError::StateMismatch(format!(
                "rule `{}` does not match saved id {}",
                rule.name(),
                state.id
            )));
        }
        for (rule, state) in self.rules.iter_mut().zip(states) {
            rule.load_state(state.state)?;
        }
        Ok(())
    }
}

impl<W: ReactionWorld> Default for ReactionRulesTable<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: ReactionWorld> Clone for ReactionRulesTable<W> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            rng: self.rng,
        }
    }
}
