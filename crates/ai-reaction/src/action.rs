//! The action seam: what a reaction asks the owning entity to do.
//!
//! Rules never run actions themselves. They hand an [`ActionRequest`] to the world through
//! [`ActionWorldMut::push_action`]; the world owns the action queue and decides when the
//! action ends. [`ActionPlan`] is a small reference queue used by the sandbox backend.

use std::collections::VecDeque;

use ai_core::{DeterministicRng, EntityId, WorldMut};
use ai_perception::PerceptionWorldView;
use serde::{Deserialize, Serialize};

pub type ActionPriority = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind<A> {
    Wait { seconds: f32 },
    /// `seconds == None` plays until the action is cleared.
    PlayAnimation { path: String, seconds: Option<f32> },
    /// Face `target`, or turn away from it when `reverse` is set.
    TurnTo { target: A, reverse: bool },
}

impl<A> ActionKind<A> {
    /// Time the action occupies the queue; `None` means open-ended.
    pub fn duration(&self) -> Option<f32> {
        match self {
            ActionKind::Wait { seconds } => Some(*seconds),
            ActionKind::PlayAnimation { seconds, .. } => *seconds,
            ActionKind::TurnTo { .. } => Some(0.0),
        }
    }
}

/// Where a new action goes relative to the queued ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Insertion {
    #[default]
    Append,
    Prepend,
    /// Drop everything queued and run only this action.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest<A> {
    pub kind: ActionKind<A>,
    pub priority: ActionPriority,
    pub insertion: Insertion,
}

impl<A> ActionRequest<A> {
    pub fn new(kind: ActionKind<A>, priority: ActionPriority) -> Self {
        Self {
            kind,
            priority,
            insertion: Insertion::Append,
        }
    }

    pub fn with_insertion(mut self, insertion: Insertion) -> Self {
        self.insertion = insertion;
        self
    }
}

/// Action queue access needed by reaction rules.
pub trait ActionWorldMut: WorldMut {
    fn has_action_component(&self, agent: Self::Agent) -> bool;

    /// Priority of the action currently executing for `agent`, if any.
    fn current_action_priority(&self, agent: Self::Agent) -> Option<ActionPriority>;

    /// Queue an action. Returns `false` if `agent` cannot take actions.
    fn push_action(&mut self, agent: Self::Agent, request: ActionRequest<Self::Agent>) -> bool;

    /// Remove queued actions of exactly `priority`, returning how many were removed.
    fn clear_actions(&mut self, agent: Self::Agent, priority: ActionPriority) -> usize;
}

/// Everything a reaction rule may touch.
pub trait ReactionWorld: PerceptionWorldView + ActionWorldMut + 'static {}

impl<T> ReactionWorld for T where T: PerceptionWorldView + ActionWorldMut + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionType {
    #[default]
    Wait,
    PlayAnimation,
    TurnTo,
}

pub const DEFAULT_MIN_DURATION: f32 = 1.0;
pub const DEFAULT_MAX_DURATION: f32 = 1.0;

/// Asset-configured action, instantiated per use with a target and a random duration.
///
/// Rule property structs flatten this, so its tags sit next to the rule's own tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ActionTemplate {
    pub action: ActionType,
    pub animation_path: String,
    pub min_duration: f32,
    /// A `PlayAnimation` with a non-positive maximum loops until cleared.
    pub max_duration: f32,
    pub turn_reverse: bool,
    /// Falls back to the priority of the rule that pushes the action.
    pub action_priority: Option<ActionPriority>,
    pub insertion: Insertion,
}

impl Default for ActionTemplate {
    fn default() -> Self {
        Self {
            action: ActionType::Wait,
            animation_path: String::new(),
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            turn_reverse: false,
            action_priority: None,
            insertion: Insertion::Append,
        }
    }
}

impl ActionTemplate {
    pub fn wait(min_duration: f32, max_duration: f32) -> Self {
        Self {
            action: ActionType::Wait,
            min_duration,
            max_duration,
            ..Self::default()
        }
    }

    pub fn animation(path: &str, min_duration: f32, max_duration: f32) -> Self {
        Self {
            action: ActionType::PlayAnimation,
            animation_path: path.to_owned(),
            min_duration,
            max_duration,
            ..Self::default()
        }
    }

    pub fn turn_to(reverse: bool) -> Self {
        Self {
            action: ActionType::TurnTo,
            turn_reverse: reverse,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.action_priority = Some(priority);
        self
    }

    pub fn with_insertion(mut self, insertion: Insertion) -> Self {
        self.insertion = insertion;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_duration >= 0.0 && self.min_duration.is_finite()) {
            return Err(format!("MinDuration must be finite and >= 0 (got {})", self.min_duration));
        }
        if !self.max_duration.is_finite() {
            return Err(format!("MaxDuration must be finite (got {})", self.max_duration));
        }
        Ok(())
    }

    /// Draw a duration in `[min_duration, max_duration)`.
    pub fn sample_duration<R: DeterministicRng>(&self, rng: &mut R) -> f32 {
        rng.next_f32_range(self.min_duration, self.max_duration)
    }

    pub fn build<A, R>(&self, target: A, rule_priority: ActionPriority, rng: &mut R) -> ActionRequest<A>
    where
        A: EntityId,
        R: DeterministicRng,
    {
        let kind = match self.action {
            ActionType::Wait => ActionKind::Wait {
                seconds: self.sample_duration(rng),
            },
            ActionType::PlayAnimation => ActionKind::PlayAnimation {
                path: self.animation_path.clone(),
                seconds: (self.max_duration > 0.0).then(|| self.sample_duration(rng)),
            },
            ActionType::TurnTo => ActionKind::TurnTo {
                target,
                reverse: self.turn_reverse,
            },
        };
        ActionRequest::new(kind, self.action_priority.unwrap_or(rule_priority))
            .with_insertion(self.insertion)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PlannedAction<A> {
    request: ActionRequest<A>,
    remaining: Option<f32>,
}

/// Reference action queue: the front action runs, the rest wait.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan<A> {
    queue: VecDeque<PlannedAction<A>>,
    pushed: u64,
}

impl<A: EntityId> ActionPlan<A> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            pushed: 0,
        }
    }

    pub fn push(&mut self, request: ActionRequest<A>) {
        let planned = PlannedAction {
            remaining: request.kind.duration(),
            request,
        };
        match planned.request.insertion {
            Insertion::Append => self.queue.push_back(planned),
            Insertion::Prepend => self.queue.push_front(planned),
            Insertion::Replace => {
                self.queue.clear();
                self.queue.push_back(planned);
            }
        }
        self.pushed += 1;
    }

    pub fn current(&self) -> Option<&ActionRequest<A>> {
        self.queue.front().map(|a| &a.request)
    }

    pub fn current_priority(&self) -> Option<ActionPriority> {
        self.current().map(|r| r.priority)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total number of actions ever pushed.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionRequest<A>> + '_ {
        self.queue.iter().map(|a| &a.request)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn clear_priority(&mut self, priority: ActionPriority) -> usize {
        let before = self.queue.len();
        self.queue.retain(|a| a.request.priority != priority);
        before - self.queue.len()
    }

    /// Advance the running action by `dt_seconds` and pop it once its time is up.
    pub fn tick(&mut self, dt_seconds: f32) -> Option<ActionRequest<A>> {
        let front = self.queue.front_mut()?;
        let remaining = front.remaining.as_mut()?;
        *remaining -= dt_seconds;
        if *remaining > 0.0 {
            return None;
        }
        self.queue.pop_front().map(|a| a.request)
    }
}

impl<A: EntityId> Default for ActionPlan<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_core::SplitMix64;

    fn wait(seconds: f32, priority: ActionPriority) -> ActionRequest<u64> {
        ActionRequest::new(ActionKind::Wait { seconds }, priority)
    }

    #[test]
    fn insertion_modes() {
        let mut plan = ActionPlan::new();
        plan.push(wait(1.0, 1));
        plan.push(wait(1.0, 2));
        plan.push(wait(1.0, 3).with_insertion(Insertion::Prepend));
        assert_eq!(plan.current_priority(), Some(3));
        assert_eq!(plan.len(), 3);

        plan.push(wait(1.0, 4).with_insertion(Insertion::Replace));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.current_priority(), Some(4));
        assert_eq!(plan.pushed(), 4);
    }

    #[test]
    fn tick_pops_finished_and_keeps_open_ended() {
        let mut plan = ActionPlan::new();
        plan.push(wait(0.5, 1));
        plan.push(ActionRequest::new(
            ActionKind::PlayAnimation {
                path: "idle".into(),
                seconds: None,
            },
            1,
        ));

        assert!(plan.tick(0.25).is_none());
        assert!(plan.tick(0.25).is_some());
        for _ in 0..100 {
            assert!(plan.tick(1.0).is_none());
        }
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn clear_priority_keeps_other_priorities() {
        let mut plan = ActionPlan::new();
        plan.push(wait(1.0, 10));
        plan.push(wait(1.0, 5));
        plan.push(wait(1.0, 20));
        plan.push(wait(1.0, 10));
        assert_eq!(plan.clear_priority(10), 2);
        assert_eq!(plan.current_priority(), Some(5));
        assert_eq!(plan.iter().map(|r| r.priority).collect::<Vec<_>>(), vec![5, 20]);
    }

    #[test]
    fn template_falls_back_to_rule_priority() {
        let mut rng = SplitMix64::new(1);
        let request = ActionTemplate::wait(2.0, 4.0).build(7u64, 30, &mut rng);
        assert_eq!(request.priority, 30);
        match request.kind {
            ActionKind::Wait { seconds } => assert!((2.0..4.0).contains(&seconds)),
            other => panic!("unexpected action {other:?}"),
        }

        let request = ActionTemplate::turn_to(true).with_priority(3).build(7u64, 30, &mut rng);
        assert_eq!(request.priority, 3);
        assert_eq!(request.kind, ActionKind::TurnTo { target: 7, reverse: true });
    }

    #[test]
    fn looping_animation_without_max_duration() {
        let mut rng = SplitMix64::new(1);
        let request = ActionTemplate::animation("dance", 0.0, 0.0).build(1u64, 1, &mut rng);
        assert_eq!(request.kind.duration(), None);
    }
}
