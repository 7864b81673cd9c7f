use std::collections::BTreeMap;

use ai_core::{rng, EntityId, StringHash, TickContext};
use tracing::debug;

use crate::{PerceptionEventSink, PerceptionWorldView, ProcessingParameters, SensorComponent};

/// Scheduler for all sensor components of one world.
///
/// Components are ticked in entity order, so a run is reproducible for a given seed.
#[derive(Debug, Clone)]
pub struct SensorPerceptionSystem<A> {
    components: BTreeMap<A, SensorComponent<A>>,
    seed: u64,
}

impl<A: EntityId> SensorPerceptionSystem<A> {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            seed: 0,
        }
    }

    /// World seed mixed into the per-entity seeds of components inserted afterwards.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Attach `component` to `entity`, replacing any previous one.
    ///
    /// The component's timer jitter is reseeded from the entity id so equally configured
    /// sensors do not all fire on the same frame.
    pub fn insert(&mut self, entity: A, component: SensorComponent<A>) -> Option<SensorComponent<A>> {
        let seed = rng::derive_seed(self.seed, entity.stable_id(), 0x5E45_0001);
        self.components.insert(entity, component.with_seed(seed))
    }

    pub fn remove(&mut self, entity: A) -> Option<SensorComponent<A>> {
        self.components.remove(&entity)
    }

    pub fn get(&self, entity: A) -> Option<&SensorComponent<A>> {
        self.components.get(&entity)
    }

    pub fn get_mut(&mut self, entity: A) -> Option<&mut SensorComponent<A>> {
        self.components.get_mut(&entity)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = A> + '_ {
        self.components.keys().copied()
    }

    /// Scheduled update of one component. Returns `true` if any of its sensors scanned.
    pub fn update_component<W, S>(
        &mut self,
        ctx: &TickContext,
        entity: A,
        world: &W,
        sink: &mut S,
    ) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
        S: PerceptionEventSink<A> + ?Sized,
    {
        let Some(component) = self.components.get_mut(&entity) else {
            return false;
        };
        let params = ProcessingParameters::scheduled(entity, world, ctx);
        component.update(&params, sink)
    }

    /// Forced update of the sensors of `entity` producing `event_id`, ignoring timers.
    pub fn update_sensor_now<W, S>(
        &mut self,
        entity: A,
        event_id: StringHash,
        world: &W,
        sink: &mut S,
    ) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
        S: PerceptionEventSink<A> + ?Sized,
    {
        match self.components.get_mut(&entity) {
            Some(component) => component.update_for_event(entity, world, event_id, sink),
            None => false,
        }
    }

    /// Scheduled update of every component. Returns the number of components that scanned.
    pub fn update_all<W, S>(&mut self, ctx: &TickContext, world: &W, sink: &mut S) -> usize
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
        S: PerceptionEventSink<A> + ?Sized,
    {
        let mut updated = 0;
        for (&entity, component) in self.components.iter_mut() {
            let params = ProcessingParameters::scheduled(entity, world, ctx);
            if component.update(&params, sink) {
                updated += 1;
            }
        }
        updated
    }

    /// Once-per-frame housekeeping: drop components whose entity no longer resolves.
    pub fn update_globals<W>(&mut self, world: &W)
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
    {
        self.components.retain(|&entity, _| {
            let alive = world.contains(entity);
            if !alive {
                debug!(?entity, "dropping sensor component of destroyed entity");
            }
            alive
        });
    }
}

impl<A: EntityId> Default for SensorPerceptionSystem<A> {
    fn default() -> Self {
        Self::new()
    }
}
