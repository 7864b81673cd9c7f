use ai_core::{StringHash, WorldView};
use glam::{Quat, Vec3};

use crate::AspectTags;

/// World-space placement of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Map a local-space offset to world space (scale, then rotate, then translate).
    pub fn transform_offset(&self, offset: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * offset)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

/// One collider crossed by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<A> {
    pub entity: A,
    /// Distance from the ray origin to the hit.
    pub distance: f32,
    /// Largest extent of the hit collider, compared against the obstacle size threshold.
    pub extent: f32,
}

/// Spatial queries a perception backend has to answer.
pub trait PerceptionWorldView: WorldView {
    fn transform(&self, entity: Self::Agent) -> Option<Transform>;

    /// Tags of the entity's aspect component, `None` if it has none.
    fn aspect_tags(&self, entity: Self::Agent) -> Option<&AspectTags>;

    /// Whether a component whose type name hashes to `type_name` is attached to `entity`.
    fn has_component(&self, _entity: Self::Agent, _type_name: StringHash) -> bool {
        false
    }

    /// Entities whose colliders overlap the sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32) -> Vec<Self::Agent>;

    /// All colliders crossed by the segment `from -> to`, nearest first.
    fn cast_ray(&self, from: Vec3, to: Vec3) -> Vec<RayHit<Self::Agent>>;
}
