use ai_core::StringHash;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{EvaluationParameters, ReactionError, ReactionRegistry, ReactionWorld};

pub const DEFAULT_RULE_PRIORITY: u32 = 10;
pub const DEFAULT_RULE_PROBABILITY: f32 = 1.0;

/// Rule-specific asset tags, everything of a rule entry except `Name`, `Priority` and `Probability`.
pub type RuleProperties = Map<String, Value>;

/// Identity and gating data shared by every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHeader {
    name: String,
    id: StringHash,
    pub priority: u32,
    /// Chance in `[0, 1]` that the rule is considered on a given evaluation.
    pub probability: f32,
}

impl RuleHeader {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            id: StringHash::new(name),
            priority: DEFAULT_RULE_PRIORITY,
            probability: DEFAULT_RULE_PROBABILITY,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.set_probability(probability);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> StringHash {
        self.id
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_owned();
        self.id = StringHash::new(name);
    }

    pub fn set_probability(&mut self, probability: f32) {
        self.probability = probability.clamp(0.0, 1.0);
    }
}

/// One entry of a [`crate::ReactionRulesTable`].
///
/// `handle` returns `true` when the rule acted; the table then stops evaluating lower
/// priority rules for this tick. Returning `false` is the normal "nothing to do" outcome.
pub trait ReactionRule<W: ReactionWorld>: 'static {
    fn header(&self) -> &RuleHeader;

    fn header_mut(&mut self) -> &mut RuleHeader;

    fn name(&self) -> &str {
        self.header().name()
    }

    fn id(&self) -> StringHash {
        self.header().id()
    }

    fn priority(&self) -> u32 {
        self.header().priority
    }

    fn probability(&self) -> f32 {
        self.header().probability
    }

    /// Bypass both the priority floor and the running-action check.
    fn wants_handling_despite_of_lower_priority(&self) -> bool {
        false
    }

    fn handle(&mut self, params: &mut EvaluationParameters<'_, W>) -> bool;

    /// Reseed randomness the rule owns beyond the evaluation rng, e.g. a reaction pool.
    fn reseed(&mut self, _seed: u64) {}

    fn clone_rule(&self) -> Box<dyn ReactionRule<W>>;

    /// Apply rule-specific asset tags. `registry` resolves nested reactions.
    fn configure(
        &mut self,
        _properties: &RuleProperties,
        _registry: &ReactionRegistry<W>,
    ) -> Result<(), ReactionError> {
        Ok(())
    }

    /// Runtime memory for snapshots; `Null` for stateless rules.
    fn save_state(&self) -> Value {
        Value::Null
    }

    fn load_state(&mut self, _state: Value) -> Result<(), ReactionError> {
        Ok(())
    }
}

impl<W: ReactionWorld> Clone for Box<dyn ReactionRule<W>> {
    fn clone(&self) -> Self {
        self.clone_rule()
    }
}

/// Deserialize a rule's tag struct from its asset properties.
pub fn parse_properties<T: DeserializeOwned>(
    name: &str,
    properties: &RuleProperties,
) -> Result<T, ReactionError> {
    serde_json::from_value(Value::Object(properties.clone())).map_err(|err| {
        ReactionError::InvalidProperties {
            name: name.to_owned(),
            reason: err.to_string(),
        }
    })
}

/// Deserialize saved rule memory, mapping failures to a snapshot mismatch.
pub fn parse_state<T: DeserializeOwned>(name: &str, state: Value) -> Result<T, ReactionError> {
    serde_json::from_value(state)
        .map_err(|err| ReactionError::StateMismatch(format!("rule `{name}`: {err}")))
}
