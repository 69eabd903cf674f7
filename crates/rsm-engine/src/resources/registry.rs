use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, Result};

/// Namespace a registry belongs to. Names only collide within one category.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Category {
    Mesh,
    Model,
    Shader,
    Texture,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Mesh => "mesh",
            Category::Model => "model",
            Category::Shader => "shader",
            Category::Texture => "texture",
        };
        f.write_str(s)
    }
}

/// Name → shared object map for one category.
///
/// `add` overwrites: the last write wins and the displaced object is returned.
/// Anything still holding an `Arc` to a displaced or removed object keeps it
/// alive; the registry only drops its own reference.
pub struct Registry<T> {
    category: Category,
    entries: HashMap<String, Arc<T>>,
}

impl<T> Registry<T> {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: HashMap::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn add(&mut self, name: impl Into<String>, object: impl Into<Arc<T>>) -> Option<Arc<T>> {
        self.entries.insert(name.into(), object.into())
    }

    /// Removes `name`. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Result<&Arc<T>> {
        self.entries
            .get(name)
            .ok_or_else(|| EngineError::ResourceNotFound {
                category: self.category,
                name: name.to_owned(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("category", &self.category)
            .field("names", &self.names())
            .finish()
    }
}
