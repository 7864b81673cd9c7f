//! Scenario files: the bodies of a sandbox world plus their sensor and reaction assets.

use std::collections::BTreeSet;
use std::path::Path;

use ai_perception::PerceptionState;
use anyhow::{bail, Context, Result};
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_DT: f32 = 0.1;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default)]
    pub seed: u64,
    pub entities: Vec<EntityDesc>,
    /// Events pushed to the global queue before the frame of their tick.
    #[serde(default)]
    pub global_events: Vec<ScheduledEvent>,
    /// Teleports applied before the frame of their tick.
    #[serde(default)]
    pub moves: Vec<ScheduledMove>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityDesc {
    pub id: u64,
    pub position: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub tags: String,
    #[serde(default = "yes")]
    pub solid: bool,
    /// Actors get an action queue; props only exist spatially.
    #[serde(default = "yes")]
    pub actor: bool,
    /// Sensor asset, single or `Sensors` list.
    #[serde(default)]
    pub sensors: Option<Value>,
    /// Reaction component asset.
    #[serde(default)]
    pub reactions: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduledEvent {
    pub tick: u64,
    pub event_id: String,
    pub entity: u64,
    #[serde(default = "began")]
    pub state: PerceptionState,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduledMove {
    pub tick: u64,
    pub entity: u64,
    pub position: Vec3,
}

fn default_dt() -> f32 {
    DEFAULT_DT
}

fn default_radius() -> f32 {
    0.5
}

fn yes() -> bool {
    true
}

fn began() -> PerceptionState {
    PerceptionState::Began
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("loading scenario {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(text).context("parsing scenario JSON")?;
        scenario.check()?;
        Ok(scenario)
    }

    fn check(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            bail!("Dt must be a positive number (got {})", self.dt);
        }
        let mut ids = BTreeSet::new();
        for entity in &self.entities {
            if !ids.insert(entity.id) {
                bail!("entity {} is declared twice", entity.id);
            }
        }
        let referenced = self
            .global_events
            .iter()
            .map(|e| e.entity)
            .chain(self.moves.iter().map(|m| m.entity));
        for id in referenced {
            if !ids.contains(&id) {
                bail!("scheduled entry refers to unknown entity {id}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scenario_parses() {
        let scenario = Scenario::parse(include_str!("../scenarios/waiting_point.json")).unwrap();
        assert_eq!(scenario.entities.len(), 3);
        assert!(scenario.entities.iter().any(|e| !e.actor));
    }

    #[test]
    fn defaults_apply() {
        let scenario = Scenario::parse(r#"{ "Entities": [ { "Id": 4, "Position": [1, 2, 3] } ] }"#)
            .unwrap();
        assert!((scenario.dt - DEFAULT_DT).abs() < f32::EPSILON);
        let entity = &scenario.entities[0];
        assert!(entity.actor && entity.solid);
        assert_eq!(entity.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(entity.sensors.is_none());
    }

    #[test]
    fn rejects_duplicates_and_dangling_references() {
        let duplicate = r#"{ "Entities": [
            { "Id": 1, "Position": [0, 0, 0] },
            { "Id": 1, "Position": [1, 0, 0] }
        ] }"#;
        assert!(Scenario::parse(duplicate).is_err());

        let dangling = r#"{
            "Entities": [ { "Id": 1, "Position": [0, 0, 0] } ],
            "GlobalEvents": [ { "Tick": 0, "EventId": "Alarm", "Entity": 9 } ]
        }"#;
        assert!(Scenario::parse(dangling).is_err());

        assert!(Scenario::parse(r#"{ "Dt": 0, "Entities": [] }"#).is_err());
    }
}
