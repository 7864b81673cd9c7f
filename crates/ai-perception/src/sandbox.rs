//! Brute-force in-memory perception backend.
//!
//! Every body is a sphere collider. Good enough for tests, benches and scenario tooling;
//! real games implement [`PerceptionWorldView`] on top of their physics engine.

use std::collections::BTreeMap;

use ai_core::{StringHash, WorldMut, WorldView};
use glam::Vec3;

use crate::{AspectTags, PerceptionWorldView, RayHit, Transform};

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxBody {
    pub transform: Transform,
    /// Collider radius.
    pub radius: f32,
    pub tags: Option<AspectTags>,
    /// Hashed type names of attached components.
    pub components: Vec<StringHash>,
    /// Non-solid bodies are found by overlap queries but never block rays.
    pub solid: bool,
}

impl SandboxBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            transform: Transform::from_position(position),
            radius: 0.5,
            tags: None,
            components: Vec::new(),
            solid: true,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = Some(AspectTags::new(tags));
        self
    }

    pub fn with_component(mut self, type_name: &str) -> Self {
        self.components.push(StringHash::new(type_name));
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn non_solid(mut self) -> Self {
        self.solid = false;
        self
    }

    /// Distance along the unit ray `origin + t * dir` at which it enters this sphere.
    fn ray_entry(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let oc = origin - self.transform.position;
        let c = oc.length_squared() - self.radius * self.radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        let b = oc.dot(dir);
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        (t >= 0.0).then_some(t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    bodies: BTreeMap<u64, SandboxBody>,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: u64, body: SandboxBody) -> Option<SandboxBody> {
        self.bodies.insert(entity, body)
    }

    pub fn remove(&mut self, entity: u64) -> Option<SandboxBody> {
        self.bodies.remove(&entity)
    }

    pub fn body(&self, entity: u64) -> Option<&SandboxBody> {
        self.bodies.get(&entity)
    }

    pub fn body_mut(&mut self, entity: u64) -> Option<&mut SandboxBody> {
        self.bodies.get_mut(&entity)
    }

    pub fn set_position(&mut self, entity: u64, position: Vec3) -> bool {
        match self.bodies.get_mut(&entity) {
            Some(body) => {
                body.transform.position = position;
                true
            }
            None => false,
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = u64> + '_ {
        self.bodies.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl WorldView for SandboxWorld {
    type Agent = u64;

    fn contains(&self, entity: u64) -> bool {
        self.bodies.contains_key(&entity)
    }
}

impl WorldMut for SandboxWorld {}

impl PerceptionWorldView for SandboxWorld {
    fn transform(&self, entity: u64) -> Option<Transform> {
        self.bodies.get(&entity).map(|body| body.transform)
    }

    fn aspect_tags(&self, entity: u64) -> Option<&AspectTags> {
        self.bodies.get(&entity).and_then(|body| body.tags.as_ref())
    }

    fn has_component(&self, entity: u64, type_name: StringHash) -> bool {
        self.bodies
            .get(&entity)
            .is_some_and(|body| body.components.contains(&type_name))
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<u64> {
        self.bodies
            .iter()
            .filter(|(_, body)| {
                let reach = radius + body.radius;
                body.transform.position.distance_squared(center) <= reach * reach
            })
            .map(|(&entity, _)| entity)
            .collect()
    }

    fn cast_ray(&self, from: Vec3, to: Vec3) -> Vec<RayHit<u64>> {
        let delta = to - from;
        let length = delta.length();
        if length < 1e-4 {
            return Vec::new();
        }
        let dir = delta / length;

        let mut hits: Vec<RayHit<u64>> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.solid)
            .filter_map(|(&entity, body)| {
                let distance = body.ray_entry(from, dir)?;
                (distance <= length).then_some(RayHit {
                    entity,
                    distance,
                    extent: body.radius * 2.0,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
