//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! `core` holds the deterministic primitives, `perception` the sensors and perception events,
//! and `reaction` the priority-ordered reaction rules that consume those events.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "perception")]
#[cfg_attr(docsrs, doc(cfg(feature = "perception")))]
pub use ai_perception as perception;

#[cfg(feature = "reaction")]
#[cfg_attr(docsrs, doc(cfg(feature = "reaction")))]
pub use ai_reaction as reaction;

/// Common imports for wiring sensors and reactions into a game loop.
#[cfg(feature = "reaction")]
#[cfg_attr(docsrs, doc(cfg(feature = "reaction")))]
pub mod prelude {
    pub use ai_core::{EntityId, StringHash, TickContext, UpdateInterval};
    pub use ai_perception::{
        PerceptionEvent, PerceptionState, PerceptionWorldView, SensorComponent,
        SensorConfiguration, SensorPerceptionSystem,
    };
    pub use ai_reaction::{
        tick_frame, ActionRequest, ActionWorldMut, ReactionComponent, ReactionRegistry,
        ReactionRule, ReactionSystem, ReactionWorld,
    };
}
