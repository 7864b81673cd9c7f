//! Sensor-based perception for deterministic game AI.
//!
//! A [`SensorConfiguration`] scans the world around its owner, filters candidates by
//! [`AspectTags`] and optional line of sight, and diffs the result against the previous scan
//! to produce [`Perception`]s in state `Began`, `Continued` or `Ended`. State transitions are
//! turned into [`PerceptionEvent`]s and handed to a [`PerceptionEventSink`], usually the
//! reaction system that owns the per-entity event queues.
//!
//! The crate never talks to a physics engine directly: spatial queries go through the
//! [`PerceptionWorldView`] extension trait.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod aspect;
pub mod asset;
pub mod component;
pub mod error;
pub mod event;
pub mod perception;
pub mod queue;
pub mod sandbox;
pub mod sensor;
pub mod sink;
pub mod system;
pub mod world;

pub use aspect::AspectTags;
pub use asset::{MultipleSensorsAsset, SensorConfigurationAsset};
pub use component::{SensorComponent, SensorKind};
pub use error::AssetError;
pub use event::PerceptionEvent;
pub use perception::{Perception, PerceptionState};
pub use queue::PerceptionEventQueue;
pub use sandbox::{SandboxBody, SandboxWorld};
pub use sensor::{ProcessingParameters, SensorConfiguration, SensorFlags, SensorState};
pub use sink::{EventOutbox, NullEventSink, PerceptionEventSink};
pub use system::SensorPerceptionSystem;
pub use world::{PerceptionWorldView, RayHit, Transform};
