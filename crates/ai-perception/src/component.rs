use ai_core::{EntityId, SplitMix64, StringHash};
use serde_json::Value;
use tracing::warn;

use crate::{
    AssetError, MultipleSensorsAsset, Perception, PerceptionEventSink, PerceptionWorldView,
    ProcessingParameters, SensorConfiguration, SensorConfigurationAsset, SensorState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Exactly one sensor.
    Single,
    /// An ordered list of sensors, usually loaded from an asset.
    Multiple,
}

/// Per-entity attachment point owning one or many sensors.
#[derive(Debug, Clone)]
pub struct SensorComponent<A> {
    kind: SensorKind,
    sensors: Vec<SensorConfiguration<A>>,
    rng: SplitMix64,
}

impl<A: EntityId> SensorComponent<A> {
    pub fn single(sensor: SensorConfiguration<A>) -> Self {
        Self {
            kind: SensorKind::Single,
            sensors: vec![sensor],
            rng: SplitMix64::default(),
        }
    }

    pub fn multiple(sensors: Vec<SensorConfiguration<A>>) -> Self {
        Self {
            kind: SensorKind::Multiple,
            sensors,
            rng: SplitMix64::default(),
        }
    }

    /// Build from an asset document: an object with a `Sensors` list yields a multiple-sensors
    /// component, any other object a single sensor.
    pub fn from_asset(asset: &Value) -> Result<Self, AssetError> {
        if asset.get("Sensors").is_some() {
            let asset: MultipleSensorsAsset = serde_json::from_value(asset.clone())?;
            let mut sensors = Vec::with_capacity(asset.sensors.len());
            for (index, sensor) in asset.sensors.iter().enumerate() {
                match sensor.build() {
                    Ok(sensor) => sensors.push(sensor),
                    Err(err) => warn!(index, %err, "skipping invalid sensor configuration"),
                }
            }
            Ok(Self::multiple(sensors))
        } else {
            let asset: SensorConfigurationAsset = serde_json::from_value(asset.clone())?;
            Ok(Self::single(asset.build()?))
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SplitMix64::new(seed);
        self
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn sensors(&self) -> &[SensorConfiguration<A>] {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut [SensorConfiguration<A>] {
        &mut self.sensors
    }

    /// Append a sensor. Single-sensor components refuse.
    pub fn add_sensor(&mut self, sensor: SensorConfiguration<A>) -> bool {
        if self.kind == SensorKind::Single {
            warn!("cannot add a sensor to a single-sensor component");
            return false;
        }
        self.sensors.push(sensor);
        true
    }

    pub fn sensor_for_event(&self, event_id: StringHash) -> Option<&SensorConfiguration<A>> {
        self.sensors.iter().find(|s| event_id.accepts(s.event_id()))
    }

    /// Sum of perception counts over all sensors.
    pub fn perception_count(&self) -> usize {
        self.sensors.iter().map(SensorConfiguration::perception_count).sum()
    }

    pub fn may_have_events(&self) -> bool {
        self.sensors.iter().any(SensorConfiguration::may_have_events)
    }

    /// Perceptions of every sensor producing `event_id` (all sensors for the wildcard).
    pub fn perceptions(&self, event_id: StringHash) -> impl Iterator<Item = &Perception<A>> + '_ {
        self.sensors
            .iter()
            .filter(move |s| event_id.accepts(s.event_id()))
            .flat_map(|s| s.perceptions().iter())
    }

    /// Update every sensor selected by `params`. Returns `true` if any sensor scanned.
    pub fn update<W, S>(&mut self, params: &ProcessingParameters<'_, W>, sink: &mut S) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
        S: PerceptionEventSink<A> + ?Sized,
    {
        let mut updated = false;
        for sensor in &mut self.sensors {
            updated |= sensor.update(params, &mut self.rng, sink);
        }
        updated
    }

    /// Force an immediate scan of the sensors producing `event_id`.
    pub fn update_for_event<W, S>(
        &mut self,
        perceiver: A,
        world: &W,
        event_id: StringHash,
        sink: &mut S,
    ) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
        S: PerceptionEventSink<A> + ?Sized,
    {
        let params = ProcessingParameters::forced(perceiver, world).with_event_id(event_id);
        self.update(&params, sink)
    }

    pub fn save_state(&self) -> Vec<SensorState<A>> {
        self.sensors.iter().map(SensorConfiguration::save_state).collect()
    }

    /// Restore per-sensor state; extra entries on either side are ignored.
    pub fn load_state(&mut self, states: Vec<SensorState<A>>) {
        if states.len() != self.sensors.len() {
            warn!(
                expected = self.sensors.len(),
                found = states.len(),
                "sensor state count mismatch"
            );
        }
        for (sensor, state) in self.sensors.iter_mut().zip(states) {
            sensor.load_state(state);
        }
    }
}
