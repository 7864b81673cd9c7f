//! Reaction rules: turning perception events into actions.
//!
//! Every entity with a [`ReactionComponent`] owns a [`ReactionRulesTable`], a priority-ordered
//! list of [`ReactionRule`]s. On each scheduled evaluation the table walks its rules from
//! the highest priority down and stops at the first one that acts. Rules read events from
//! the entity's local queue, the shared global queue or straight from its sensors, and push
//! [`ActionRequest`]s through the [`ActionWorldMut`] seam.
//!
//! Rules are instantiated by name from a [`ReactionRegistry`] so tables can be described
//! in JSON assets. The [`ReactionSystem`] schedules components in entity order and delivers
//! events between them, which keeps a run reproducible for a given seed.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod asset;
pub mod component;
pub mod error;
pub mod params;
pub mod reaction;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod sandbox;
pub mod standard;
pub mod system;
pub mod table;

pub use action::{
    ActionKind, ActionPlan, ActionPriority, ActionRequest, ActionTemplate, ActionType,
    ActionWorldMut, Insertion, ReactionWorld,
};
pub use asset::{ReactionComponentAsset, ReactionPoolAsset, RuleEntry};
pub use component::{LocalQueuePolicy, ReactionComponent, ReactionComponentState};
pub use error::ReactionError;
pub use params::EvaluationParameters;
pub use reaction::{ActionReaction, Reaction, ReactionPool};
pub use registry::{ReactionRegistry, RegisterFunction};
pub use rule::{ReactionRule, RuleHeader, RuleProperties};
pub use sandbox::ReactionSandbox;
pub use standard::{EventFilter, EventSource};
pub use system::{tick_frame, ReactionSystem};
pub use table::{Effort, ReactionRulesTable, RuleState};
