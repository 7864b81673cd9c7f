//! In-memory backend pairing the perception sandbox with per-entity [`ActionPlan`]s.

use std::collections::{BTreeMap, VecDeque};

use ai_core::{StringHash, WorldMut, WorldView};
use ai_perception::{AspectTags, PerceptionWorldView, RayHit, SandboxBody, SandboxWorld, Transform};
use glam::Vec3;
use tracing::debug;

use crate::{ActionPlan, ActionPriority, ActionRequest, ActionWorldMut};

/// Most recent pushes kept for [`ReactionSandbox::take_pushed`]; older ones are dropped.
pub const PUSHED_LOG_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct ReactionSandbox {
    spatial: SandboxWorld,
    plans: BTreeMap<u64, ActionPlan<u64>>,
    pushed: VecDeque<(u64, ActionRequest<u64>)>,
}

impl ReactionSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity that can take actions.
    pub fn insert_actor(&mut self, entity: u64, body: SandboxBody) {
        self.spatial.insert(entity, body);
        self.plans.insert(entity, ActionPlan::new());
    }

    /// Entity without an action queue, e.g. a waiting point or an obstacle.
    pub fn insert_prop(&mut self, entity: u64, body: SandboxBody) {
        self.spatial.insert(entity, body);
        self.plans.remove(&entity);
    }

    pub fn remove(&mut self, entity: u64) {
        self.spatial.remove(entity);
        self.plans.remove(&entity);
    }

    pub fn spatial(&self) -> &SandboxWorld {
        &self.spatial
    }

    pub fn spatial_mut(&mut self) -> &mut SandboxWorld {
        &mut self.spatial
    }

    pub fn set_position(&mut self, entity: u64, position: Vec3) -> bool {
        self.spatial.set_position(entity, position)
    }

    pub fn plan(&self, entity: u64) -> Option<&ActionPlan<u64>> {
        self.plans.get(&entity)
    }

    /// Actions pushed since the last call, in push order. Only the latest
    /// [`PUSHED_LOG_CAPACITY`] are kept if the log is not drained.
    pub fn take_pushed(&mut self) -> Vec<(u64, ActionRequest<u64>)> {
        self.pushed.drain(..).collect()
    }

    /// Advance every plan, returning the actions that finished.
    pub fn tick_actions(&mut self, dt_seconds: f32) -> Vec<(u64, ActionRequest<u64>)> {
        self.plans
            .iter_mut()
            .filter_map(|(&entity, plan)| plan.tick(dt_seconds).map(|done| (entity, done)))
            .collect()
    }
}

impl WorldView for ReactionSandbox {
    type Agent = u64;

    fn contains(&self, entity: u64) -> bool {
        self.spatial.contains(entity)
    }
}

impl WorldMut for ReactionSandbox {}

impl PerceptionWorldView for ReactionSandbox {
    fn transform(&self, entity: u64) -> Option<Transform> {
        self.spatial.transform(entity)
    }

    fn aspect_tags(&self, entity: u64) -> Option<&AspectTags> {
        self.spatial.aspect_tags(entity)
    }

    fn has_component(&self, entity: u64, type_name: StringHash) -> bool {
        self.spatial.has_component(entity, type_name)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<u64> {
        self.spatial.overlap_sphere(center, radius)
    }

    fn cast_ray(&self, from: Vec3, to: Vec3) -> Vec<RayHit<u64>> {
        self.spatial.cast_ray(from, to)
    }
}

impl ActionWorldMut for ReactionSandbox {
    fn has_action_component(&self, entity: u64) -> bool {
        self.plans.contains_key(&entity)
    }

    fn current_action_priority(&self, entity: u64) -> Option<ActionPriority> {
        self.plans.get(&entity).and_then(ActionPlan::current_priority)
    }

    fn push_action(&mut self, entity: u64, request: ActionRequest<u64>) -> bool {
        let Some(plan) = self.plans.get_mut(&entity) else {
            return false;
        };
        debug!(entity, ?request, "action queued");
        plan.push(request.clone());
        if self.pushed.len() == PUSHED_LOG_CAPACITY {
            self.pushed.pop_front();
        }
        self.pushed.push_back((entity, request));
        true
    }

    fn clear_actions(&mut self, entity: u64, priority: ActionPriority) -> usize {
        self.plans
            .get_mut(&entity)
            .map_or(0, |plan| plan.clear_priority(priority))
    }
}
