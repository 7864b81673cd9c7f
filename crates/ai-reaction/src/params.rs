use ai_core::{DeterministicRng, SplitMix64, StringHash, TickContext};
use ai_perception::{
    EventOutbox, PerceptionEvent, PerceptionEventQueue, PerceptionEventSink, PerceptionState,
    SensorComponent,
};
use tracing::debug;

use crate::{ActionPriority, ActionRequest, EventSource, ReactionWorld};

/// Everything one rule evaluation can see and touch.
///
/// Events produced by rules go to `outbox` and are delivered by the scheduler once the
/// evaluating component has released its borrows.
pub struct EvaluationParameters<'a, W: ReactionWorld> {
    pub ctx: &'a TickContext,
    pub entity: W::Agent,
    pub world: &'a mut W,
    pub local: &'a PerceptionEventQueue<W::Agent>,
    pub global: &'a PerceptionEventQueue<W::Agent>,
    pub sensors: Option<&'a mut SensorComponent<W::Agent>>,
    pub outbox: &'a mut EventOutbox<W::Agent>,
    pub rng: &'a mut SplitMix64,
    /// Resolved once when the owning component started.
    pub has_action_component: bool,
}

impl<'a, W: ReactionWorld> EvaluationParameters<'a, W> {
    pub fn time(&self) -> f64 {
        self.ctx.time_seconds
    }

    /// Events with `event_id` from `source`, in queue order.
    ///
    /// `Sensor` synthesizes one event per perception of the sensors producing `event_id`,
    /// with this entity as the perceiver. `DontCare` concatenates local, global and sensor.
    pub fn events(&self, source: EventSource, event_id: StringHash) -> Vec<PerceptionEvent<W::Agent>> {
        let mut out = Vec::new();
        if matches!(source, EventSource::Local | EventSource::DontCare) {
            out.extend(self.local.iter(event_id).copied());
        }
        if matches!(source, EventSource::Global | EventSource::DontCare) {
            out.extend(self.global.iter(event_id).copied());
        }
        if matches!(source, EventSource::Sensor | EventSource::DontCare) {
            if let Some(sensors) = self.sensors.as_deref() {
                for sensor in sensors.sensors() {
                    if !event_id.accepts(sensor.event_id()) {
                        continue;
                    }
                    out.extend(sensor.perception_events(self.entity));
                }
            }
        }
        out
    }

    /// `true` if a sensor producing `event_id` currently has `entity` in a present state.
    pub fn perceives(&self, event_id: StringHash, entity: W::Agent) -> bool {
        self.sensors.as_deref().is_some_and(|sensors| {
            sensors
                .perceptions(event_id)
                .any(|p| p.entity == entity && p.is_present())
        })
    }

    pub fn current_action_priority(&self) -> Option<ActionPriority> {
        self.world.current_action_priority(self.entity)
    }

    pub fn push_action(&mut self, request: ActionRequest<W::Agent>) -> bool {
        if !self.has_action_component {
            debug!(entity = ?self.entity, "no action component, dropping action");
            return false;
        }
        self.world.push_action(self.entity, request)
    }

    /// Drop this entity's queued actions of exactly `priority`.
    pub fn clear_actions(&mut self, priority: ActionPriority) -> usize {
        if !self.has_action_component {
            return 0;
        }
        self.world.clear_actions(self.entity, priority)
    }

    /// Queue `event` for the local queue of `target`.
    pub fn forward_event(&mut self, target: W::Agent, event: PerceptionEvent<W::Agent>) {
        self.outbox.push_local(target, event);
    }

    pub fn broadcast(&mut self, event: PerceptionEvent<W::Agent>) {
        self.outbox.push_global(event);
    }

    /// Event telling `receiver` about this entity: `entity` is us, `perceived_by` the receiver.
    pub fn make_event(
        &self,
        event_id: StringHash,
        receiver: W::Agent,
        state: PerceptionState,
    ) -> PerceptionEvent<W::Agent> {
        PerceptionEvent::new(event_id, self.entity, receiver, state)
    }

    /// Rescan the sensors producing `event_id` right now, ignoring their timers.
    pub fn update_sensor_now(&mut self, event_id: StringHash) -> bool {
        match self.sensors.as_deref_mut() {
            Some(sensors) => {
                sensors.update_for_event(self.entity, &*self.world, event_id, &mut *self.outbox)
            }
            None => false,
        }
    }

    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        self.rng.next_f32_range(min, max)
    }
}
