use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of a name, used for tags, event ids and rule ids.
///
/// The empty name hashes to `0`, which event filters treat as "any event".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct StringHash(u32);

impl StringHash {
    pub const ANY: StringHash = StringHash(0);

    pub const fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Self::ANY;
        }
        let mut hash = FNV_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    pub const fn from_id(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }

    pub const fn is_any(self) -> bool {
        self.0 == 0
    }

    /// True if `self` is the wildcard or equal to `other`.
    pub fn accepts(self, other: StringHash) -> bool {
        self.is_any() || self == other
    }
}

impl From<&str> for StringHash {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<u32> for StringHash {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringHash({:#010x})", self.0)
    }
}

impl fmt::Display for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
