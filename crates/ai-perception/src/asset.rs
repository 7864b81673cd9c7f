//! Sensor assets: JSON property trees with PascalCase tags.
//!
//! Missing tags take the `DEFAULT_*` values from [`crate::sensor`]; unknown tags are ignored.

use ai_core::{EntityId, StringHash, UpdateInterval};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sensor::*;
use crate::{AssetError, SensorConfiguration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SensorConfigurationAsset {
    pub automatic_update: bool,
    pub line_of_sight_required: bool,
    pub record_ending_perceptions: bool,
    pub fire_event_on_began: bool,
    pub fire_event_on_continued: bool,
    pub fire_event_on_ended: bool,
    pub auto_push_events: bool,
    pub auto_push_events_to_perceived_entities: bool,
    pub interpret_aspects_as_class_names: bool,
    pub event_id: String,
    pub offset: Vec3,
    pub radius: f32,
    pub line_of_sight_offset: Vec3,
    pub ignore_obstacles_smaller_than: f32,
    pub aspect_tags: String,
    pub ignored_obstacles_aspect: String,
    pub update_interval: f32,
    pub update_jitter: f32,
}

impl Default for SensorConfigurationAsset {
    fn default() -> Self {
        Self {
            automatic_update: DEFAULT_AUTOMATIC_UPDATE,
            line_of_sight_required: DEFAULT_LINE_OF_SIGHT_REQUIRED,
            record_ending_perceptions: DEFAULT_RECORD_ENDING_PERCEPTIONS,
            fire_event_on_began: DEFAULT_FIRE_EVENT_ON_BEGAN,
            fire_event_on_continued: DEFAULT_FIRE_EVENT_ON_CONTINUED,
            fire_event_on_ended: DEFAULT_FIRE_EVENT_ON_ENDED,
            auto_push_events: DEFAULT_AUTO_PUSH_EVENTS,
            auto_push_events_to_perceived_entities: DEFAULT_AUTO_PUSH_EVENTS_TO_PERCEIVED_ENTITIES,
            interpret_aspects_as_class_names: DEFAULT_INTERPRET_ASPECTS_AS_CLASS_NAMES,
            event_id: String::new(),
            offset: Vec3::ZERO,
            radius: DEFAULT_RADIUS,
            line_of_sight_offset: Vec3::ZERO,
            ignore_obstacles_smaller_than: DEFAULT_IGNORE_OBSTACLES_SMALLER_THAN,
            aspect_tags: String::new(),
            ignored_obstacles_aspect: String::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            update_jitter: DEFAULT_UPDATE_JITTER,
        }
    }
}

impl SensorConfigurationAsset {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn build<A: EntityId>(&self) -> Result<SensorConfiguration<A>, AssetError> {
        if !self.radius.is_finite() {
            return Err(AssetError::InvalidValue {
                tag: "Radius",
                reason: format!("{} is not finite", self.radius),
            });
        }
        if !(self.update_interval >= 0.0) {
            return Err(AssetError::InvalidValue {
                tag: "UpdateInterval",
                reason: format!("{} is negative", self.update_interval),
            });
        }
        if !(self.update_jitter >= 0.0) {
            return Err(AssetError::InvalidValue {
                tag: "UpdateJitter",
                reason: format!("{} is negative", self.update_jitter),
            });
        }

        let flags = SensorFlags {
            automatic_update: self.automatic_update,
            line_of_sight_required: self.line_of_sight_required,
            record_ending_perceptions: self.record_ending_perceptions,
            fire_event_on_began: self.fire_event_on_began,
            fire_event_on_continued: self.fire_event_on_continued,
            fire_event_on_ended: self.fire_event_on_ended,
            auto_push_events: self.auto_push_events,
            auto_push_events_to_perceived_entities: self.auto_push_events_to_perceived_entities,
            interpret_aspects_as_class_names: self.interpret_aspects_as_class_names,
        };

        let mut sensor = SensorConfiguration::new(StringHash::new(&self.event_id), self.radius)
            .with_flags(flags)
            .with_offset(self.offset)
            .with_aspect_tags(&self.aspect_tags)
            .with_ignored_obstacles_aspect(&self.ignored_obstacles_aspect)
            .with_update_interval(UpdateInterval::new(self.update_interval, self.update_jitter));
        sensor.set_line_of_sight_offset(self.line_of_sight_offset);
        sensor.set_ignore_obstacles_smaller_than(self.ignore_obstacles_smaller_than);
        Ok(sensor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MultipleSensorsAsset {
    #[serde(default)]
    pub sensors: Vec<SensorConfigurationAsset>,
}
