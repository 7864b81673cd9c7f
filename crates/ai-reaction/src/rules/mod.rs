//! Built-in rule families.

mod forward;
mod global_event;
mod interaction;
mod perception_event_action;
mod pool;
mod random_interruption;
mod waiting_point;

pub use forward::{ForwardLocalEvent, HandleForwardedLocalEvent};
pub use global_event::{GlobalEvent, GlobalEventStartEnd};
pub use interaction::{EntityInteraction, InteractionState};
pub use perception_event_action::PerceptionEventAction;
pub use pool::ReactionPoolRule;
pub use random_interruption::RandomInterruption;
pub use waiting_point::{CheckWaitingPoint, WaitAtWaitingPoint};

use crate::{ActionKind, ActionPriority, ActionRequest, EvaluationParameters, Insertion, ReactionError, ReactionWorld};

/// Face (or turn away from) `target`, then run `follow_up`. The turn replaces queued actions.
fn push_turn_then<W: ReactionWorld>(
    params: &mut EvaluationParameters<'_, W>,
    target: W::Agent,
    reverse: bool,
    priority: ActionPriority,
    follow_up: Option<ActionKind<W::Agent>>,
) -> bool {
    let turn = ActionRequest::new(ActionKind::TurnTo { target, reverse }, priority)
        .with_insertion(Insertion::Replace);
    if !params.push_action(turn) {
        return false;
    }
    if let Some(kind) = follow_up {
        params.push_action(ActionRequest::new(kind, priority));
    }
    true
}

/// `Wait` for `seconds`, or play `animation_path` for that long when one is set.
fn timed_activity<A>(animation_path: &str, seconds: f32) -> ActionKind<A> {
    if animation_path.is_empty() {
        ActionKind::Wait { seconds }
    } else {
        ActionKind::PlayAnimation {
            path: animation_path.to_owned(),
            seconds: Some(seconds),
        }
    }
}

fn check_durations(name: &str, min: f32, max: f32) -> Result<(), ReactionError> {
    if min >= 0.0 && min.is_finite() && max.is_finite() {
        return Ok(());
    }
    Err(ReactionError::InvalidProperties {
        name: name.to_owned(),
        reason: format!("durations must be finite and >= 0 (got {min}..{max})"),
    })
}
