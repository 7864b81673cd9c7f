//! Sensor configuration and the detection pass.
//!
//! One detection pass:
//! 1. place the sensor center at the owner's position plus the transformed offset,
//! 2. collect colliders overlapping the sensor sphere whose aspect matches the target filter,
//! 3. optionally drop candidates hidden behind a large enough, non-ignored obstacle,
//! 4. diff against the previous scan (`Began` / `Continued`, plus `Ended` records),
//! 5. emit one event per perception whose state is enabled for events.

use std::collections::BTreeSet;

use ai_core::{DeterministicRng, EntityId, StringHash, TickContext, UpdateInterval};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    AspectTags, Perception, PerceptionEvent, PerceptionEventSink, PerceptionState,
    PerceptionWorldView, Transform,
};

pub const DEFAULT_AUTOMATIC_UPDATE: bool = true;
pub const DEFAULT_LINE_OF_SIGHT_REQUIRED: bool = false;
pub const DEFAULT_RECORD_ENDING_PERCEPTIONS: bool = true;
pub const DEFAULT_FIRE_EVENT_ON_BEGAN: bool = true;
pub const DEFAULT_FIRE_EVENT_ON_CONTINUED: bool = false;
pub const DEFAULT_FIRE_EVENT_ON_ENDED: bool = true;
pub const DEFAULT_AUTO_PUSH_EVENTS: bool = true;
pub const DEFAULT_AUTO_PUSH_EVENTS_TO_PERCEIVED_ENTITIES: bool = false;
pub const DEFAULT_INTERPRET_ASPECTS_AS_CLASS_NAMES: bool = false;
pub const DEFAULT_RADIUS: f32 = 10.0;
pub const DEFAULT_IGNORE_OBSTACLES_SMALLER_THAN: f32 = 0.0;
pub const DEFAULT_UPDATE_INTERVAL: f32 = 0.5;
pub const DEFAULT_UPDATE_JITTER: f32 = 0.1;

/// Behavior switches of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFlags {
    /// Update from the scheduler; otherwise only forced updates run.
    pub automatic_update: bool,
    pub line_of_sight_required: bool,
    /// Keep vanished entities for one scan with state `Ended`.
    pub record_ending_perceptions: bool,
    pub fire_event_on_began: bool,
    pub fire_event_on_continued: bool,
    pub fire_event_on_ended: bool,
    /// Push events into the owner's local queue.
    pub auto_push_events: bool,
    /// Push swapped events into each perceived entity's local queue.
    pub auto_push_events_to_perceived_entities: bool,
    /// Match aspect tags against component type names instead of aspect components.
    pub interpret_aspects_as_class_names: bool,
}

impl SensorFlags {
    pub fn fires_for(&self, state: PerceptionState) -> bool {
        match state {
            PerceptionState::Began => self.fire_event_on_began,
            PerceptionState::Continued => self.fire_event_on_continued,
            PerceptionState::Ended => self.fire_event_on_ended,
        }
    }
}

impl Default for SensorFlags {
    fn default() -> Self {
        Self {
            automatic_update: DEFAULT_AUTOMATIC_UPDATE,
            line_of_sight_required: DEFAULT_LINE_OF_SIGHT_REQUIRED,
            record_ending_perceptions: DEFAULT_RECORD_ENDING_PERCEPTIONS,
            fire_event_on_began: DEFAULT_FIRE_EVENT_ON_BEGAN,
            fire_event_on_continued: DEFAULT_FIRE_EVENT_ON_CONTINUED,
            fire_event_on_ended: DEFAULT_FIRE_EVENT_ON_ENDED,
            auto_push_events: DEFAULT_AUTO_PUSH_EVENTS,
            auto_push_events_to_perceived_entities: DEFAULT_AUTO_PUSH_EVENTS_TO_PERCEIVED_ENTITIES,
            interpret_aspects_as_class_names: DEFAULT_INTERPRET_ASPECTS_AS_CLASS_NAMES,
        }
    }
}

/// Inputs of one detection pass.
///
/// `job == None` forces the pass regardless of the update timer and the automatic-update flag.
/// A non-wildcard `event_id` restricts the pass to sensors producing that event.
pub struct ProcessingParameters<'a, W>
where
    W: PerceptionWorldView + ?Sized,
{
    pub perceiver: W::Agent,
    pub world: &'a W,
    pub job: Option<&'a TickContext>,
    pub event_id: StringHash,
}

impl<'a, W> ProcessingParameters<'a, W>
where
    W: PerceptionWorldView + ?Sized,
{
    pub fn scheduled(perceiver: W::Agent, world: &'a W, job: &'a TickContext) -> Self {
        Self {
            perceiver,
            world,
            job: Some(job),
            event_id: StringHash::ANY,
        }
    }

    pub fn forced(perceiver: W::Agent, world: &'a W) -> Self {
        Self {
            perceiver,
            world,
            job: None,
            event_id: StringHash::ANY,
        }
    }

    pub fn with_event_id(mut self, event_id: StringHash) -> Self {
        self.event_id = event_id;
        self
    }
}

/// Runtime state of a sensor, for save games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState<A> {
    pub current: Vec<Perception<A>>,
    pub previous: Vec<Perception<A>>,
    pub countdown: f32,
    pub may_have_events: bool,
}

/// One spatial sensor: geometry, filters, timer and the two perception buffers.
#[derive(Debug, Clone)]
pub struct SensorConfiguration<A> {
    flags: SensorFlags,
    event_id: StringHash,
    offset: Vec3,
    uses_offset: bool,
    radius: f32,
    line_of_sight_offset: Vec3,
    ignore_obstacles_smaller_than: f32,
    aspect_tags: AspectTags,
    ignored_obstacles_aspect: AspectTags,
    interval: UpdateInterval,
    current: Vec<Perception<A>>,
    previous: Vec<Perception<A>>,
    occluded: Vec<A>,
    may_have_events: bool,
}

impl<A: EntityId> SensorConfiguration<A> {
    pub fn new(event_id: StringHash, radius: f32) -> Self {
        Self {
            flags: SensorFlags::default(),
            event_id,
            offset: Vec3::ZERO,
            uses_offset: false,
            radius,
            line_of_sight_offset: Vec3::ZERO,
            ignore_obstacles_smaller_than: DEFAULT_IGNORE_OBSTACLES_SMALLER_THAN,
            aspect_tags: AspectTags::default(),
            ignored_obstacles_aspect: AspectTags::default(),
            interval: UpdateInterval::new(DEFAULT_UPDATE_INTERVAL, DEFAULT_UPDATE_JITTER),
            current: Vec::new(),
            previous: Vec::new(),
            occluded: Vec::new(),
            may_have_events: false,
        }
    }

    // Builders

    pub fn with_flags(mut self, flags: SensorFlags) -> Self {
        self.set_flags(flags);
        self
    }

    pub fn with_aspect_tags(mut self, tags: &str) -> Self {
        self.set_aspect_tags(tags);
        self
    }

    pub fn with_ignored_obstacles_aspect(mut self, tags: &str) -> Self {
        self.set_ignored_obstacles_aspect(tags);
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.set_offset(offset);
        self
    }

    pub fn with_line_of_sight(mut self, offset: Vec3, ignore_obstacles_smaller_than: f32) -> Self {
        self.flags.line_of_sight_required = true;
        self.line_of_sight_offset = offset;
        self.ignore_obstacles_smaller_than = ignore_obstacles_smaller_than;
        self.touch();
        self
    }

    pub fn with_update_interval(mut self, interval: UpdateInterval) -> Self {
        self.interval = interval;
        self
    }

    // Properties

    pub fn flags(&self) -> &SensorFlags {
        &self.flags
    }

    pub fn set_flags(&mut self, flags: SensorFlags) {
        self.flags = flags;
        self.touch();
    }

    pub fn event_id(&self) -> StringHash {
        self.event_id
    }

    pub fn set_event_id(&mut self, event_id: StringHash) {
        self.event_id = event_id;
        self.touch();
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec3) {
        self.offset = offset;
        self.uses_offset = offset != Vec3::ZERO;
        self.touch();
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.touch();
    }

    pub fn line_of_sight_offset(&self) -> Vec3 {
        self.line_of_sight_offset
    }

    pub fn set_line_of_sight_offset(&mut self, offset: Vec3) {
        self.line_of_sight_offset = offset;
        self.touch();
    }

    pub fn ignore_obstacles_smaller_than(&self) -> f32 {
        self.ignore_obstacles_smaller_than
    }

    pub fn set_ignore_obstacles_smaller_than(&mut self, extent: f32) {
        self.ignore_obstacles_smaller_than = extent;
        self.touch();
    }

    pub fn aspect_tags(&self) -> &AspectTags {
        &self.aspect_tags
    }

    pub fn set_aspect_tags(&mut self, tags: &str) {
        self.aspect_tags.set_tags(tags);
        self.touch();
    }

    pub fn ignored_obstacles_aspect(&self) -> &AspectTags {
        &self.ignored_obstacles_aspect
    }

    pub fn set_ignored_obstacles_aspect(&mut self, tags: &str) {
        self.ignored_obstacles_aspect.set_tags(tags);
        self.touch();
    }

    pub fn update_interval(&self) -> &UpdateInterval {
        &self.interval
    }

    pub fn set_update_interval(&mut self, interval: UpdateInterval) {
        self.interval = interval;
    }

    // Perception access

    /// Perceptions of the latest scan, in scan order.
    pub fn perceptions(&self) -> &[Perception<A>] {
        &self.current
    }

    pub fn previous_perceptions(&self) -> &[Perception<A>] {
        &self.previous
    }

    /// Candidates dropped by the line-of-sight check in the latest scan.
    pub fn occluded_perceptions(&self) -> &[A] {
        &self.occluded
    }

    pub fn perception_count(&self) -> usize {
        self.current.len()
    }

    pub fn find_perception(&self, entity: A) -> Option<&Perception<A>> {
        self.current.iter().find(|p| p.entity == entity)
    }

    pub fn perceives(&self, entity: A) -> bool {
        self.find_perception(entity).is_some_and(Perception::is_present)
    }

    pub fn may_have_events(&self) -> bool {
        self.may_have_events
    }

    /// The current perceptions as events, as if the owner had perceived them just now.
    pub fn perception_events(&self, perceiver: A) -> impl Iterator<Item = PerceptionEvent<A>> + '_ {
        self.current
            .iter()
            .map(move |p| PerceptionEvent::new(self.event_id, p.entity, perceiver, p.state))
    }

    // Timing

    pub fn is_it_time_to_update(&self) -> bool {
        self.interval.is_due()
    }

    pub fn update_trigger_timer<R: DeterministicRng>(&mut self, dt_seconds: f32, rng: &mut R) -> bool {
        self.interval.poll(dt_seconds, rng)
    }

    /// Changed properties take effect on the next scheduled update.
    fn touch(&mut self) {
        self.interval.set_countdown(0.0);
    }

    // Detection

    /// Run the detection pass if it is due. Returns `true` if a scan happened.
    pub fn update<W, R, S>(
        &mut self,
        params: &ProcessingParameters<'_, W>,
        rng: &mut R,
        sink: &mut S,
    ) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
        R: DeterministicRng,
        S: PerceptionEventSink<A> + ?Sized,
    {
        if !params.event_id.is_any() && params.event_id != self.event_id {
            return false;
        }

        if let Some(job) = params.job {
            if !self.flags.automatic_update {
                return false;
            }
            if !self.update_trigger_timer(job.dt_seconds, rng) {
                return false;
            }
        }

        let Some(transform) = params.world.transform(params.perceiver) else {
            warn!(
                perceiver = ?params.perceiver,
                "sensor owner has no transform, skipping detection"
            );
            return false;
        };

        self.scan(params.world, params.perceiver, &transform);
        self.emit_events(params.perceiver, sink);
        true
    }

    fn scan<W>(&mut self, world: &W, perceiver: A, transform: &Transform)
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
    {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
        self.occluded.clear();

        let previously_present: BTreeSet<A> = self
            .previous
            .iter()
            .filter(|p| p.is_present())
            .map(|p| p.entity)
            .collect();

        if self.radius > 0.0 {
            let center = if self.uses_offset {
                transform.transform_offset(self.offset)
            } else {
                transform.position
            };
            let eye = transform.position + self.line_of_sight_offset;

            let mut seen = BTreeSet::new();
            for candidate in world.overlap_sphere(center, self.radius) {
                if candidate == perceiver || !seen.insert(candidate) {
                    continue;
                }
                if !self.matches_target(world, candidate) {
                    continue;
                }
                if self.flags.line_of_sight_required
                    && self.is_occluded(world, perceiver, candidate, eye)
                {
                    trace!(?perceiver, ?candidate, "candidate occluded");
                    self.occluded.push(candidate);
                    continue;
                }

                let state = if previously_present.contains(&candidate) {
                    PerceptionState::Continued
                } else {
                    PerceptionState::Began
                };
                self.current.push(Perception::new(candidate, state));
            }
        }

        let still_present: BTreeSet<A> = self.current.iter().map(|p| p.entity).collect();
        let mut any_ended = false;
        for &entity in &previously_present {
            if still_present.contains(&entity) {
                continue;
            }
            any_ended = true;
            if self.flags.record_ending_perceptions {
                self.current.push(Perception::new(entity, PerceptionState::Ended));
            }
        }

        self.may_have_events = !self.current.is_empty() || any_ended;
        debug!(
            ?perceiver,
            event_id = %self.event_id,
            perceptions = self.current.len(),
            occluded = self.occluded.len(),
            "sensor scan"
        );
    }

    fn matches_target<W>(&self, world: &W, candidate: A) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
    {
        if self.flags.interpret_aspects_as_class_names {
            return self.aspect_tags.matches_components(world, candidate);
        }
        world
            .aspect_tags(candidate)
            .is_some_and(|tags| self.aspect_tags.matches(tags))
    }

    fn is_occluded<W>(&self, world: &W, perceiver: A, candidate: A, eye: Vec3) -> bool
    where
        W: PerceptionWorldView<Agent = A> + ?Sized,
    {
        let Some(target) = world.transform(candidate) else {
            return true;
        };

        world.cast_ray(eye, target.position).iter().any(|hit| {
            if hit.entity == perceiver || hit.entity == candidate {
                return false;
            }
            if hit.extent <= self.ignore_obstacles_smaller_than {
                return false;
            }
            let ignored = !self.ignored_obstacles_aspect.is_empty()
                && world
                    .aspect_tags(hit.entity)
                    .is_some_and(|tags| self.ignored_obstacles_aspect.intersects(tags));
            !ignored
        })
    }

    fn emit_events<S>(&self, perceiver: A, sink: &mut S)
    where
        S: PerceptionEventSink<A> + ?Sized,
    {
        if !self.flags.auto_push_events && !self.flags.auto_push_events_to_perceived_entities {
            return;
        }

        for perception in &self.current {
            if !self.flags.fires_for(perception.state) {
                continue;
            }
            let event =
                PerceptionEvent::new(self.event_id, perception.entity, perceiver, perception.state);
            if self.flags.auto_push_events && !sink.push_local(perceiver, event) {
                trace!(?perceiver, "owner has no event queue, event dropped");
            }
            if self.flags.auto_push_events_to_perceived_entities {
                sink.push_local(perception.entity, event.with_swapped_entities());
            }
        }
    }

    // Save / load

    pub fn save_state(&self) -> SensorState<A> {
        SensorState {
            current: self.current.clone(),
            previous: self.previous.clone(),
            countdown: self.interval.countdown(),
            may_have_events: self.may_have_events,
        }
    }

    pub fn load_state(&mut self, state: SensorState<A>) {
        self.current = state.current;
        self.previous = state.previous;
        self.interval.set_countdown(state.countdown);
        self.may_have_events = state.may_have_events;
        self.occluded.clear();
    }
}
