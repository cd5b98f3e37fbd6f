//! Newtype identifiers for dataset elements.
//!
//! Keeping class ids and image keys as distinct types stops a registry index
//! or a file stem from being passed where the other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A semantic class identifier, stable across the whole dataset.
///
/// This is the integer written at the start of every YOLO label line.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Creates a new ClassId.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ClassId {
    fn from(id: u32) -> Self {
        ClassId::new(id)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an image: its path relative to `images/`, without extension,
/// with `/` separators (e.g. `train/000042`).
///
/// The label file and the copied image in the output share this stem.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    /// Creates a key, normalising Windows separators to `/`.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({:?})", self.0)
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
