//! Best-effort type metadata for frame classification
//!
//! Class names in a stack trace are only strings. When the embedding runtime
//! can say more (for example that `com.acme.MySubject` extends the library's
//! subject base type), it exposes that through [`TypeHierarchy`]. The
//! classifier never requires this: an unresolvable class simply falls back
//! to name-based matching.
//!
//! # Example TOML
//!
//! ```toml
//! [types]
//! "com.acme.MySubject" = ["com.google.common.truth.Subject"]
//! "com.acme.MyRunner" = ["org.junit.runners.BlockJUnit4ClassRunner"]
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Source of subtype relationships between classes
pub trait TypeHierarchy {
    /// Whether `class_name` is `target` or one of its subtypes.
    ///
    /// Returns `None` when nothing is known about `class_name`, which the
    /// classifier treats as "class not loadable".
    fn is_assignable(&self, class_name: &str, target: &str) -> Option<bool>;
}

impl<T: TypeHierarchy + ?Sized> TypeHierarchy for &T {
    fn is_assignable(&self, class_name: &str, target: &str) -> Option<bool> {
        (**self).is_assignable(class_name, target)
    }
}

/// No type metadata at all; every lookup is unresolved
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypeInfo;

impl TypeHierarchy for NoTypeInfo {
    fn is_assignable(&self, _class_name: &str, _target: &str) -> Option<bool> {
        None
    }
}

/// Table of direct supertypes, walked transitively
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTable {
    /// Class name -> direct supertypes (superclass and interfaces)
    #[serde(default)]
    pub types: HashMap<String, Vec<String>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `class_name` directly extends or implements each of `supertypes`
    pub fn with_type<I, S>(mut self, class_name: impl Into<String>, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types
            .entry(class_name.into())
            .or_default()
            .extend(supertypes.into_iter().map(Into::into));
        self
    }

    /// Load a table from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            bail!("Type table file not found: {}", path_ref.display());
        }

        let contents = fs::read_to_string(path_ref).context("Failed to read type table file")?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: TypeTable = toml::from_str(contents).context("Invalid type table TOML")?;

        if let Some(empty) = table.types.keys().find(|k| k.trim().is_empty()) {
            bail!("Invalid type table: empty class name {:?}", empty);
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeHierarchy for TypeTable {
    fn is_assignable(&self, class_name: &str, target: &str) -> Option<bool> {
        if !self.types.contains_key(class_name) {
            return None;
        }

        // Supertype graphs from user input may contain cycles
        let mut visited = HashSet::new();
        let mut pending = vec![class_name];
        while let Some(current) = pending.pop() {
            if current == target {
                return Some(true);
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(supers) = self.types.get(current) {
                pending.extend(supers.iter().map(String::as_str));
            }
        }
        Some(false)
    }
}
