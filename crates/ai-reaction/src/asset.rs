//! Reaction assets: JSON property trees with PascalCase tags, like the sensor assets.

use ai_perception::AssetError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LocalQueuePolicy, ReactionError, RuleProperties};

pub const DEFAULT_REACTION_UPDATE_INTERVAL: f32 = 0.25;
pub const DEFAULT_REACTION_UPDATE_JITTER: f32 = 0.05;
pub const DEFAULT_MINIMUM_PRIORITY: u32 = 0;

/// One rule or reaction of an asset list. Tags other than `Name`, `Priority` and
/// `Probability` are handed to the rule's `configure`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub probability: Option<f32>,
    #[serde(flatten)]
    pub properties: RuleProperties,
}

impl RuleEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn with_property(mut self, tag: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(tag.to_owned(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReactionComponentAsset {
    pub update_interval: f32,
    pub update_jitter: f32,
    pub minimum_priority: u32,
    pub local_queue_policy: LocalQueuePolicy,
    pub rules: Vec<RuleEntry>,
}

impl Default for ReactionComponentAsset {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_REACTION_UPDATE_INTERVAL,
            update_jitter: DEFAULT_REACTION_UPDATE_JITTER,
            minimum_priority: DEFAULT_MINIMUM_PRIORITY,
            local_queue_policy: LocalQueuePolicy::default(),
            rules: Vec::new(),
        }
    }
}

impl ReactionComponentAsset {
    pub fn from_json(value: &Value) -> Result<Self, ReactionError> {
        let asset: Self = serde_json::from_value(value.clone())?;
        asset.validate()?;
        Ok(asset)
    }

    pub fn validate(&self) -> Result<(), AssetError> {
        for (tag, value) in [
            ("UpdateInterval", self.update_interval),
            ("UpdateJitter", self.update_jitter),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(AssetError::InvalidValue {
                    tag,
                    reason: format!("must be finite and >= 0 (got {value})"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReactionPoolAsset {
    pub probability_range: Option<f32>,
    pub reactions: Vec<RuleEntry>,
}

impl ReactionPoolAsset {
    pub fn from_json(value: &Value) -> Result<Self, ReactionError> {
        Ok(serde_json::from_value(value.clone())?)
    }
}
