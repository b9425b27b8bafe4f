use std::fmt;
use std::sync::Arc;

/// Identifier of a reaction template within a synthon space.
///
/// Reaction ids are compared and ordered lexicographically; the ordering is
/// the canonical iteration order used by every component that walks a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionId(Arc<str>);

impl ReactionId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReactionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ReactionId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Identifier of a single fragment record, unique within its [`FragType`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId(Arc<str>);

impl FragmentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FragmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FragmentId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// One interchangeable synthon role of a reaction: the (reaction, position) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragType {
    pub reaction: ReactionId,
    pub position: usize,
}

impl FragType {
    pub fn new(reaction: impl Into<ReactionId>, position: usize) -> Self {
        Self {
            reaction: reaction.into(),
            position,
        }
    }
}

impl fmt::Display for FragType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reaction, self.position)
    }
}
