use std::collections::BTreeMap;

use ai_core::{rng, EntityId, TickContext};
use ai_perception::{
    EventOutbox, PerceptionEvent, PerceptionEventQueue, PerceptionEventSink, SensorPerceptionSystem,
};
use serde_json::Value;
use tracing::debug;

use crate::{Effort, ReactionComponent, ReactionError, ReactionRegistry, ReactionWorld};

/// Scheduler for all reaction components of one world.
///
/// Owns the rule registry and the global event queue. Events produced while a component
/// evaluates are delivered right after it, so components later in entity order see them
/// in the same frame.
pub struct ReactionSystem<W: ReactionWorld> {
    registry: ReactionRegistry<W>,
    components: BTreeMap<W::Agent, ReactionComponent<W>>,
    global: PerceptionEventQueue<W::Agent>,
    outbox: EventOutbox<W::Agent>,
    seed: u64,
}

impl<W: ReactionWorld> ReactionSystem<W> {
    pub fn new(registry: ReactionRegistry<W>) -> Self {
        Self {
            registry,
            components: BTreeMap::new(),
            global: PerceptionEventQueue::new(),
            outbox: EventOutbox::new(),
            seed: 0,
        }
    }

    /// World seed mixed into the per-entity seeds of components inserted afterwards.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn registry(&self) -> &ReactionRegistry<W> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ReactionRegistry<W> {
        &mut self.registry
    }

    /// Attach `component` to `entity`, reseeded from the entity id.
    pub fn insert(
        &mut self,
        entity: W::Agent,
        component: ReactionComponent<W>,
    ) -> Option<ReactionComponent<W>> {
        let seed = rng::derive_seed(self.seed, rng::mix64(entity.stable_id()), 0x4EAC_0001);
        self.components.insert(entity, component.with_seed(seed))
    }

    /// Build a component from a JSON asset with this system's registry and attach it.
    pub fn insert_from_asset(&mut self, entity: W::Agent, asset: &Value) -> Result<(), ReactionError> {
        let component = ReactionComponent::from_json(asset, &self.registry)?;
        self.insert(entity, component);
        Ok(())
    }

    pub fn remove(&mut self, entity: W::Agent) -> Option<ReactionComponent<W>> {
        self.components.remove(&entity)
    }

    pub fn get(&self, entity: W::Agent) -> Option<&ReactionComponent<W>> {
        self.components.get(&entity)
    }

    pub fn get_mut(&mut self, entity: W::Agent) -> Option<&mut ReactionComponent<W>> {
        self.components.get_mut(&entity)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = W::Agent> + '_ {
        self.components.keys().copied()
    }

    pub fn global_queue(&self) -> &PerceptionEventQueue<W::Agent> {
        &self.global
    }

    pub fn push_global_event(&mut self, event: PerceptionEvent<W::Agent>) {
        self.global.push(event);
    }

    /// Scheduled evaluation of one component.
    pub fn update_component(
        &mut self,
        ctx: &TickContext,
        entity: W::Agent,
        world: &mut W,
        sensors: &mut SensorPerceptionSystem<W::Agent>,
    ) -> Effort {
        let Some(component) = self.components.get_mut(&entity) else {
            return Effort::Trivial;
        };
        let effort = component.update(
            ctx,
            entity,
            world,
            &self.global,
            sensors.get_mut(entity),
            &mut self.outbox,
        );
        self.deliver_outbox();
        effort
    }

    /// Evaluate every component in entity order. Returns how many had a rule act.
    pub fn update_all(
        &mut self,
        ctx: &TickContext,
        world: &mut W,
        sensors: &mut SensorPerceptionSystem<W::Agent>,
    ) -> usize {
        let entities: Vec<W::Agent> = self.components.keys().copied().collect();
        let mut acted = 0;
        for entity in entities {
            if self.update_component(ctx, entity, world, sensors) == Effort::Regular {
                acted += 1;
            }
        }
        acted
    }

    /// Once-per-frame housekeeping: clear the global queue and drop components of
    /// destroyed entities.
    pub fn update_globals(&mut self, world: &W) {
        self.global.clear();
        self.components.retain(|&entity, _| {
            let alive = world.contains(entity);
            if !alive {
                debug!(?entity, "dropping reaction component of destroyed entity");
            }
            alive
        });
    }

    fn deliver_outbox(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        let mut outbox = std::mem::take(&mut self.outbox);
        outbox.deliver(self);
        self.outbox = outbox;
    }
}

impl<W: ReactionWorld> PerceptionEventSink<W::Agent> for ReactionSystem<W> {
    fn push_local(&mut self, target: W::Agent, event: PerceptionEvent<W::Agent>) -> bool {
        match self.components.get_mut(&target) {
            Some(component) => {
                component.push_local_event(event);
                true
            }
            None => {
                debug!(?target, event_id = %event.event_id, "no reaction component, dropping event");
                false
            }
        }
    }

    fn push_global(&mut self, event: PerceptionEvent<W::Agent>) {
        self.global.push(event);
    }
}

/// One simulation frame: sensors scan and push their events, reactions evaluate, then
/// both systems do their per-frame housekeeping. Returns the number of entities that acted.
pub fn tick_frame<W: ReactionWorld>(
    ctx: &TickContext,
    world: &mut W,
    sensors: &mut SensorPerceptionSystem<W::Agent>,
    reactions: &mut ReactionSystem<W>,
) -> usize {
    sensors.update_all(ctx, &*world, reactions);
    let acted = reactions.update_all(ctx, world, sensors);
    sensors.update_globals(&*world);
    reactions.update_globals(&*world);
    acted
}
