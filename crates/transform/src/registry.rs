//! Factory registry - type name to constructor
//!
//! Every extensible component (converter, processor, condition, and in the
//! pipeline crate outputter, subscriber, data outputter) is built from a
//! config whose `type` string selects a factory registered here. Unknown
//! names all fail the same way, naming the component and the types that
//! are available.
//!
//! # Example
//!
//! ```
//! use live_transform::default_processor_registry;
//!
//! let registry = default_processor_registry();
//! assert!(registry.contains("dropFields"));
//!
//! let err = registry.get("bogus").err().unwrap();
//! assert!(err.to_string().contains("unknown processor type 'bogus'"));
//! ```

use std::collections::HashMap;

use crate::{TransformError, TransformResult};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Registry of factories of one component kind
///
/// `F` is the factory trait object, e.g. `dyn ProcessorFactory`.
pub struct Registry<F: ?Sized> {
    component: &'static str,
    factories: HashMap<String, Box<F>>,
}

impl<F: ?Sized> Registry<F> {
    /// Create an empty registry for a component kind (used in error messages)
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            factories: HashMap::new(),
        }
    }

    /// Component kind this registry builds
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Register a factory
    ///
    /// # Panics
    /// Panics if a factory is already registered with this name.
    /// Use `try_register` for fallible registration.
    pub fn register(&mut self, type_name: &str, factory: Box<F>) {
        if !self.try_register(type_name, factory) {
            panic!("{} factory '{}' already registered", self.component, type_name);
        }
    }

    /// Try to register a factory
    ///
    /// Returns `false` if a factory is already registered with this name.
    pub fn try_register(&mut self, type_name: &str, factory: Box<F>) -> bool {
        if self.factories.contains_key(type_name) {
            return false;
        }
        self.factories.insert(type_name.to_string(), factory);
        true
    }

    /// Look up the factory for a type name
    ///
    /// # Errors
    /// `TransformError::UnknownType` naming the type and the available ones.
    pub fn get(&self, type_name: &str) -> TransformResult<&F> {
        self.factories
            .get(type_name)
            .map(|f| &**f)
            .ok_or_else(|| TransformError::UnknownType {
                component: self.component,
                type_name: type_name.to_string(),
                available: self.available_types().join(", "),
            })
    }

    /// Check if a type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Fail with `TooDeep` once `depth` reaches the nesting limit
pub fn check_depth(component: &'static str, depth: usize) -> TransformResult<()> {
    if depth >= live_config::MAX_NESTING_DEPTH {
        return Err(TransformError::TooDeep {
            component,
            limit: live_config::MAX_NESTING_DEPTH,
        });
    }
    Ok(())
}
