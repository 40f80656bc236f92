// src/store.rs

//! Result storage shared between missions.
//!
//! A [`ResultStore`] holds the values produced by completed missions. It is
//! used in two scopes:
//! - the aggregate store returned by a run (every mission's result), and
//! - the per-node input store handed to a mission (only the results of its
//!   *direct* dependencies).
//!
//! Values can be looked up by producer name or by runtime type. The type
//! index tolerates more than one producer of the same type, but a lookup of
//! such a type fails with [`MissionDagError::AmbiguousType`] rather than
//! picking one of them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{MissionDagError, Result};
use crate::mission::MissionName;

/// A value produced by a mission.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wrap a concrete value as a [`Value`].
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

#[derive(Clone, Default)]
pub struct ResultStore {
    by_name: HashMap<MissionName, Value>,
    /// Producer names per runtime type, in registration order.
    by_type: HashMap<TypeId, Vec<MissionName>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of name-keyed entries.
    pub fn count(&self) -> usize {
        self.by_name.len()
    }

    pub fn len(&self) -> usize {
        self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Producer names currently stored (unordered).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|s| s.as_str())
    }

    /// Look up a value by the name of the mission that produced it.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| MissionDagError::NotFound(name.to_string()))
    }

    /// Look up a value by producer name and downcast it to `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.get(name)?
            .downcast::<T>()
            .map_err(|_| MissionDagError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Look up the single stored value whose runtime type is `T`.
    pub fn get_by_type<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let type_name = std::any::type_name::<T>();
        let names = self
            .by_type
            .get(&TypeId::of::<T>())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match names {
            [] => Err(MissionDagError::NotFound(type_name.to_string())),
            [name] => self.get_as::<T>(name),
            _ => Err(MissionDagError::AmbiguousType(type_name)),
        }
    }

    /// Register the result of mission `name`.
    ///
    /// An absent result is ignored. Registering the same name twice fails
    /// with [`MissionDagError::DuplicateKey`] and leaves the store unchanged.
    pub fn register_result(&mut self, name: &str, result: Option<Value>) -> Result<()> {
        let Some(value) = result else {
            return Ok(());
        };

        if self.by_name.contains_key(name) {
            return Err(MissionDagError::DuplicateKey(name.to_string()));
        }

        let any: &dyn Any = &*value;
        self.by_type
            .entry(any.type_id())
            .or_default()
            .push(name.to_string());
        self.by_name.insert(name.to_string(), value);

        Ok(())
    }

    /// Typed convenience over [`ResultStore::register_result`].
    pub fn insert<T: Any + Send + Sync>(&mut self, name: &str, v: T) -> Result<()> {
        self.register_result(name, Some(value(v)))
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_type.clear();
    }
}

impl fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ResultStore")
            .field("names", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_is_rejected() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();

        let err = store.insert("Misha", "Jelly").unwrap_err();
        assert!(matches!(err, MissionDagError::DuplicateKey(ref n) if n == "Misha"));
        assert_eq!(store.get_as::<i32>("Misha").unwrap().as_ref(), &5);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn absent_result_is_a_no_op() {
        let mut store = ResultStore::new();
        store.register_result("Misha", None).unwrap();

        assert_eq!(store.count(), 0);
        assert!(matches!(store.get("Misha"), Err(MissionDagError::NotFound(_))));

        // The name slot stays free.
        store.insert("Misha", 1u8).unwrap();
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn count_tracks_registered_values() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();
        store.insert("Rambo", "Who").unwrap();
        store.insert("Pi", 2.5f64).unwrap();

        assert_eq!(store.count(), 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn get_by_missing_name_fails() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();

        assert!(matches!(store.get("Rambo"), Err(MissionDagError::NotFound(ref n)) if n == "Rambo"));
    }

    #[test]
    fn get_by_name_returns_value() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();

        let raw = store.get("Misha").unwrap();
        assert_eq!(raw.downcast_ref::<i32>(), Some(&5));
        assert!(matches!(
            store.get_as::<String>("Misha"),
            Err(MissionDagError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn get_by_type_returns_unique_value() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();
        store.insert("Pi", 2.5f64).unwrap();

        assert_eq!(*store.get_by_type::<i32>().unwrap(), 5);
        assert_eq!(*store.get_by_type::<f64>().unwrap(), 2.5);
        assert!(matches!(
            store.get_by_type::<String>(),
            Err(MissionDagError::NotFound(_))
        ));
    }

    #[test]
    fn type_collision_is_reported_on_lookup() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();
        store.insert("Rambo", 7i32).unwrap();

        assert!(matches!(
            store.get_by_type::<i32>(),
            Err(MissionDagError::AmbiguousType(_))
        ));
        // Name lookups are unaffected.
        assert_eq!(*store.get_as::<i32>("Rambo").unwrap(), 7);
    }

    #[test]
    fn clear_removes_all_values() {
        let mut store = ResultStore::new();
        store.insert("Misha", 5i32).unwrap();

        store.clear();

        assert_eq!(store.count(), 0);
        assert!(store.get("Misha").is_err());
        assert!(store.get_by_type::<i32>().is_err());
    }
}
