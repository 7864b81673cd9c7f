use crate::EntityId;

/// Read-only world access.
///
/// Specific subsystems (perception, actions) define extension traits on top
/// of this one instead of growing it.
pub trait WorldView {
    type Agent: EntityId;

    /// Resolve an entity handle. Backends without entity lifetimes may keep the default.
    fn contains(&self, _entity: Self::Agent) -> bool {
        true
    }
}

/// Write access / effect sink.
pub trait WorldMut: WorldView {}
