//! Deterministic, engine-agnostic primitives shared by the perception and reaction crates.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod entity;
pub mod hash;
pub mod interval;
pub mod rng;
pub mod tick;
pub mod world;

pub use entity::EntityId;
pub use hash::StringHash;
pub use interval::UpdateInterval;
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;
pub use world::{WorldMut, WorldView};
