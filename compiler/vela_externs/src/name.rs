//! Module and declaration names.
//!
//! Both name types are cheap-to-clone `Arc<str>` newtypes: the planner keys
//! every one of its maps by [`ModuleName`] and clones names across worker
//! threads, so copies must not allocate.

use std::fmt;
use std::sync::Arc;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Unique identifier of a module, e.g. `data.list`.
///
/// The key for every per-module mapping in the build planner.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ModuleName(Arc<str>);

impl ModuleName {
    /// Create a module name.
    pub fn new(name: impl AsRef<str>) -> Self {
        ModuleName(Arc::from(name.as_ref()))
    }

    /// The dotted name as written in source.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleName({})", self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(name: &str) -> Self {
        ModuleName::new(name)
    }
}

impl From<String> for ModuleName {
    fn from(name: String) -> Self {
        ModuleName(name.into())
    }
}

// Serialized as a bare string: externs files and the cache database store
// names, not pointer identities.
impl Serialize for ModuleName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ModuleName::from)
    }
}

/// Name of a single exported declaration within a module.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ident(Arc<str>);

impl Ident {
    /// Create an identifier.
    pub fn new(name: impl AsRef<str>) -> Self {
        Ident(Arc::from(name.as_ref()))
    }

    /// The identifier as written in source.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({})", self.0)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

impl Serialize for Ident {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Ident::new)
    }
}
