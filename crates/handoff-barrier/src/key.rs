use std::{borrow::Borrow, fmt, str::FromStr, sync::Arc};

use uuid::Uuid;

use crate::BarrierError;

/// Opaque identifier naming one unit of in-flight work.
///
/// Keys are cheap to clone and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(Arc<str>);

impl TaskKey {
    /// Build a key from caller-supplied text.
    pub fn new(key: impl Into<String>) -> Result<Self, BarrierError> {
        let key = key.into();
        if key.is_empty() {
            return Err(BarrierError::EmptyKey);
        }
        Ok(Self(Arc::from(key)))
    }

    /// Generate a fresh key of the form `"{prefix}-{uuid}"`.
    ///
    /// An empty prefix yields the bare uuid.
    pub fn unique(prefix: &str) -> Self {
        let id = Uuid::new_v4();
        if prefix.is_empty() {
            Self(Arc::from(id.to_string()))
        } else {
            Self(Arc::from(format!("{prefix}-{id}")))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TaskKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for TaskKey {
    type Err = BarrierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for TaskKey {
    type Error = BarrierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for TaskKey {
    type Error = BarrierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(TaskKey::new(""), Err(BarrierError::EmptyKey));
        assert_eq!("".parse::<TaskKey>(), Err(BarrierError::EmptyKey));
    }

    #[test]
    fn key_keeps_text() {
        let key = TaskKey::new("fetch-avatar").unwrap();
        assert_eq!(key.as_str(), "fetch-avatar");
        assert_eq!(key.to_string(), "fetch-avatar");
    }

    #[test]
    fn unique_keys_carry_prefix_and_differ() {
        let a = TaskKey::unique("profile");
        let b = TaskKey::unique("profile");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("profile-"));
    }

    #[test]
    fn unique_without_prefix_is_bare_uuid() {
        let key = TaskKey::unique("");
        assert!(Uuid::parse_str(key.as_str()).is_ok());
    }

    #[test]
    fn set_lookup_by_str() {
        let mut set = HashSet::new();
        set.insert(TaskKey::new("a").unwrap());
        assert!(set.contains("a"));
        assert!(!set.contains("b"));
    }
}
