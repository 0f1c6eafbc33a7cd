use std::{
    any::{TypeId, type_name},
    fmt,
};

use serde::Deserialize;

/// Rule picking the background queue of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopePolicy {
    /// One concurrent queue for the whole process.
    #[default]
    SharedQueue,
    /// One concurrent queue per owning type.
    ClassQueue,
    /// A serial queue private to the context.
    InstanceQueue,
}

impl ScopePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopePolicy::SharedQueue => "shared",
            ScopePolicy::ClassQueue => "class",
            ScopePolicy::InstanceQueue => "instance",
        }
    }
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared owner type of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    id: TypeId,
    name: &'static str,
}

impl Owner {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, without generics.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Profile;

    #[test]
    fn owner_names() {
        let owner = Owner::of::<Profile>();
        assert_eq!(owner.short_name(), "Profile");
        assert!(owner.name().ends_with("Profile"));
        assert_eq!(Owner::of::<Vec<u8>>().short_name(), "Vec");
    }

    #[test]
    fn owners_compare_by_type() {
        assert_eq!(Owner::of::<Profile>(), Owner::of::<Profile>());
        assert_ne!(Owner::of::<Profile>(), Owner::of::<u8>());
    }

    #[test]
    fn policy_from_json() {
        let p: ScopePolicy = serde_json::from_str(r#""instanceQueue""#).unwrap();
        assert_eq!(p, ScopePolicy::InstanceQueue);
        assert_eq!(ScopePolicy::default(), ScopePolicy::SharedQueue);
        assert_eq!(p.to_string(), "instance");
    }
}
