use ai_core::StringHash;
use serde::{Deserialize, Serialize};

use crate::PerceptionWorldView;

/// A small sorted set of hashed tags, parsed from a comma-separated list.
///
/// The empty set is a wildcard: it matches every other set, and every set matches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AspectTags {
    source: String,
    hashes: Vec<StringHash>,
}

impl AspectTags {
    pub fn new(tags: &str) -> Self {
        let mut aspect = Self::default();
        aspect.set_tags(tags);
        aspect
    }

    /// Replace all tags. Whitespace around tags and empty entries are ignored.
    pub fn set_tags(&mut self, tags: &str) {
        self.source = tags.to_owned();
        self.hashes = tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(StringHash::new)
            .collect();
        self.hashes.sort_unstable();
        self.hashes.dedup();
    }

    pub fn tags(&self) -> &str {
        &self.source
    }

    pub fn hashes(&self) -> &[StringHash] {
        &self.hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn contains(&self, tag: StringHash) -> bool {
        self.hashes.binary_search(&tag).is_ok()
    }

    /// Wildcard-aware match: true if either side is empty or the sets intersect.
    pub fn matches(&self, other: &AspectTags) -> bool {
        self.is_empty() || other.is_empty() || self.intersects(other)
    }

    /// Strict intersection test without the wildcard rule.
    pub fn intersects(&self, other: &AspectTags) -> bool {
        let (mut a, mut b) = (self.hashes.iter(), other.hashes.iter());
        let (mut x, mut y) = (a.next(), b.next());
        while let (Some(l), Some(r)) = (x, y) {
            match l.cmp(r) {
                core::cmp::Ordering::Less => x = a.next(),
                core::cmp::Ordering::Greater => y = b.next(),
                core::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Match tags against the component type names attached to `entity`.
    pub fn matches_components<W>(&self, world: &W, entity: W::Agent) -> bool
    where
        W: PerceptionWorldView + ?Sized,
    {
        self.is_empty()
            || self
                .hashes
                .iter()
                .any(|&type_name| world.has_component(entity, type_name))
    }
}

impl From<String> for AspectTags {
    fn from(tags: String) -> Self {
        Self::new(&tags)
    }
}

impl From<&str> for AspectTags {
    fn from(tags: &str) -> Self {
        Self::new(tags)
    }
}

impl From<AspectTags> for String {
    fn from(aspect: AspectTags) -> Self {
        aspect.source
    }
}
