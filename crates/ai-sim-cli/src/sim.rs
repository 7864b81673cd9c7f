//! Builds a sandbox world from a [`Scenario`] and steps it frame by frame.

use ai_core::{StringHash, TickContext};
use ai_perception::{PerceptionEvent, SandboxBody, SensorComponent, SensorPerceptionSystem};
use ai_reaction::{
    tick_frame, ActionRequest, ReactionComponentAsset, ReactionRegistry, ReactionSandbox,
    ReactionSystem,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::scenario::Scenario;

/// What happened in one frame.
#[derive(Debug, Serialize)]
pub struct Frame {
    pub tick: u64,
    pub time: f64,
    /// Entities whose rules acted.
    pub acted: usize,
    pub started: Vec<(u64, ActionRequest<u64>)>,
    pub finished: Vec<(u64, ActionRequest<u64>)>,
}

/// Per-entity outcome of building the reaction assets.
#[derive(Debug, Serialize)]
pub struct ComponentReport {
    pub entity: u64,
    pub sensors: usize,
    pub declared_rules: usize,
    pub built_rules: usize,
}

pub struct Simulation {
    scenario: Scenario,
    world: ReactionSandbox,
    sensors: SensorPerceptionSystem<u64>,
    reactions: ReactionSystem<ReactionSandbox>,
    reports: Vec<ComponentReport>,
    seed: u64,
    tick: u64,
}

impl Simulation {
    pub fn build(scenario: Scenario, seed: Option<u64>) -> Result<Self> {
        let seed = seed.unwrap_or(scenario.seed);
        let mut world = ReactionSandbox::new();
        let mut sensors = SensorPerceptionSystem::new().with_seed(seed);
        let mut reactions = ReactionSystem::new(ReactionRegistry::with_builtins()).with_seed(seed);
        let mut reports = Vec::new();

        for desc in &scenario.entities {
            let mut body = SandboxBody::new(desc.position).with_radius(desc.radius);
            if !desc.tags.is_empty() {
                body = body.with_tags(&desc.tags);
            }
            if !desc.solid {
                body = body.non_solid();
            }
            if desc.actor {
                world.insert_actor(desc.id, body);
            } else {
                world.insert_prop(desc.id, body);
            }

            let mut report = ComponentReport {
                entity: desc.id,
                sensors: 0,
                declared_rules: 0,
                built_rules: 0,
            };
            if let Some(asset) = &desc.sensors {
                let component = SensorComponent::from_asset(asset)
                    .with_context(|| format!("sensors of entity {}", desc.id))?;
                report.sensors = component.sensors().len();
                sensors.insert(desc.id, component);
            }
            if let Some(asset) = &desc.reactions {
                report.declared_rules = ReactionComponentAsset::from_json(asset)
                    .with_context(|| format!("reactions of entity {}", desc.id))?
                    .rules
                    .len();
                reactions
                    .insert_from_asset(desc.id, asset)
                    .with_context(|| format!("reactions of entity {}", desc.id))?;
                report.built_rules = reactions.get(desc.id).map_or(0, |c| c.rules().len());
            }
            debug!(entity = desc.id, sensors = report.sensors, rules = report.built_rules, "entity built");
            reports.push(report);
        }

        info!(
            scenario = %scenario.name,
            entities = scenario.entities.len(),
            sensors = sensors.len(),
            reactions = reactions.len(),
            seed,
            "scenario loaded"
        );
        Ok(Self {
            scenario,
            world,
            sensors,
            reactions,
            reports,
            seed,
            tick: 0,
        })
    }

    pub fn reports(&self) -> &[ComponentReport] {
        &self.reports
    }

    /// Fail if any declared rule was dropped while building.
    pub fn ensure_complete(&self) -> Result<()> {
        let incomplete: Vec<_> = self
            .reports
            .iter()
            .filter(|r| r.built_rules != r.declared_rules)
            .map(|r| format!("entity {} ({}/{} rules)", r.entity, r.built_rules, r.declared_rules))
            .collect();
        if !incomplete.is_empty() {
            bail!("rules were skipped for {}", incomplete.join(", "));
        }
        Ok(())
    }

    pub fn set_dt(&mut self, dt: f32) -> Result<()> {
        if !(dt > 0.0 && dt.is_finite()) {
            bail!("dt must be a positive number (got {dt})");
        }
        self.scenario.dt = dt;
        Ok(())
    }

    pub fn step(&mut self) -> Frame {
        let tick = self.tick;
        for scheduled in self.scenario.moves.iter().filter(|m| m.tick == tick) {
            self.world.set_position(scheduled.entity, scheduled.position);
        }
        for scheduled in self.scenario.global_events.iter().filter(|e| e.tick == tick) {
            self.reactions.push_global_event(PerceptionEvent::new(
                StringHash::new(&scheduled.event_id),
                scheduled.entity,
                scheduled.entity,
                scheduled.state,
            ));
        }

        let dt = self.scenario.dt;
        let ctx = TickContext::new(tick, dt, self.seed);
        let acted = tick_frame(&ctx, &mut self.world, &mut self.sensors, &mut self.reactions);
        let started = self.world.take_pushed();
        let finished = self.world.tick_actions(dt);
        self.tick += 1;

        Frame {
            tick,
            time: ctx.time_seconds,
            acted,
            started,
            finished,
        }
    }
}
