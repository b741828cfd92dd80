// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Registry of known modules

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::module::Module;
use super::resolver::ModuleId;
use crate::error::{LoaderError, Result};

/// Thread-safe registry mapping module ids to their records.
///
/// The registry holds the only owning handles to modules; dependency links
/// between modules are weak.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: DashMap<ModuleId, Module>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new module, failing if the id is taken
    pub fn create(&self, id: ModuleId) -> Result<Module> {
        match self.modules.entry(id) {
            Entry::Occupied(entry) => Err(LoaderError::DuplicateModule(entry.key().clone())),
            Entry::Vacant(entry) => {
                let module = Module::new(entry.key().clone());
                entry.insert(module.clone());
                Ok(module)
            }
        }
    }

    /// Return the module for `id`, registering it first if needed.
    ///
    /// The flag reports whether this call created it.
    pub fn get_or_create(&self, id: ModuleId) -> (Module, bool) {
        match self.modules.entry(id) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let module = Module::new(entry.key().clone());
                entry.insert(module.clone());
                (module, true)
            }
        }
    }

    /// Check if a module is registered
    pub fn has(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// Get a registered module
    pub fn get(&self, id: &ModuleId) -> Result<Module> {
        self.find(id)
            .ok_or_else(|| LoaderError::NotFound(id.clone()))
    }

    /// Look up a module without treating absence as an error
    pub fn find(&self, id: &ModuleId) -> Option<Module> {
        self.modules.get(id).map(|entry| entry.clone())
    }

    /// Forget every module
    pub fn clear(&self) {
        self.modules.clear();
    }

    /// Get all registered ids, sorted
    pub fn ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<_> = self.modules.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get the number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ModuleId {
        ModuleId::parse(path)
    }

    #[test]
    fn test_create_and_get() {
        let registry = ModuleRegistry::new();
        let module = registry.create(id("a")).unwrap();
        assert!(registry.has(&id("a")));
        assert!(registry.get(&id("a")).unwrap().ptr_eq(&module));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_create_fails() {
        let registry = ModuleRegistry::new();
        registry.create(id("a")).unwrap();
        let err = registry.create(id("a")).unwrap_err();
        assert!(matches!(err, LoaderError::DuplicateModule(dup) if dup == id("a")));
    }

    #[test]
    fn test_get_missing() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.get(&id("nope")),
            Err(LoaderError::NotFound(_))
        ));
        assert!(registry.find(&id("nope")).is_none());
    }

    #[test]
    fn test_get_or_create() {
        let registry = ModuleRegistry::new();
        let (first, created) = registry.get_or_create(id("a"));
        assert!(created);
        let (second, created) = registry.get_or_create(id("a"));
        assert!(!created);
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn test_clear_and_ids() {
        let registry = ModuleRegistry::new();
        registry.create(id("b")).unwrap();
        registry.create(id("a/x")).unwrap();
        assert_eq!(registry.ids(), vec![id("a/x"), id("b")]);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.has(&id("b")));
        // Ids become available again after a reset
        assert!(registry.create(id("b")).is_ok());
    }
}
