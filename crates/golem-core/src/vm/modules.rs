// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module table shared by every interpreter of a runtime.
//!
//! Modules registered by the host are found first. Otherwise a module named
//! `m` is read from `<dir>/m.<ext>` in the first search path that has it.
//! Each module is initialized at most once: the first importer runs its
//! init function while holding the module's latch, and concurrent importers
//! block until the contents are ready.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::runtime::Value;

/// Initialization state of one file-backed module.
#[derive(Debug, Default)]
pub(crate) struct ModuleSlot {
    /// The module contents, once initialized
    pub value: OnceLock<Value>,
    /// Held while initializing; the flag is set on the initializing thread
    pub init: ReentrantMutex<Cell<bool>>,
}

/// Resolves module names to module values.
#[derive(Debug)]
pub struct ModuleRegistry {
    search_paths: RwLock<Vec<PathBuf>>,
    extension: String,
    registered: RwLock<FxHashMap<String, Value>>,
    slots: Mutex<FxHashMap<String, Arc<ModuleSlot>>>,
}

impl ModuleRegistry {
    /// Creates a registry using the search paths and extension of `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            search_paths: RwLock::new(config.search_paths.clone()),
            extension: config.extension.clone(),
            registered: RwLock::new(FxHashMap::default()),
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    /// Makes `value` importable as `name`, ahead of any file.
    pub fn register(&self, name: impl Into<String>, value: Value) {
        self.registered.write().insert(name.into(), value);
    }

    /// Returns the host-registered module `name`.
    pub fn registered(&self, name: &str) -> Option<Value> {
        self.registered.read().get(name).cloned()
    }

    /// Appends a directory to search, unless it is already searched.
    pub fn add_search_path(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let mut paths = self.search_paths.write();
        if !paths.contains(&dir) {
            tracing::debug!(dir = %dir.display(), "added module search path");
            paths.push(dir);
        }
    }

    /// The directories searched, in order.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.read().clone()
    }

    /// Finds the source file of module `name`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.{}", self.extension);
        self.search_paths
            .read()
            .iter()
            .map(|dir| dir.join(&file))
            .find(|path| path.is_file())
    }

    /// Returns the initialization slot of module `name`, creating it.
    pub(crate) fn slot(&self, name: &str) -> Arc<ModuleSlot> {
        self.slots
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Returns the contents of module `name` if it was already loaded.
    pub fn loaded(&self, name: &str) -> Option<Value> {
        self.registered(name).or_else(|| {
            let slots = self.slots.lock();
            slots.get(name).and_then(|slot| slot.value.get().cloned())
        })
    }
}

/// Derives a module name from a file path: its stem.
pub fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_modules() {
        let registry = ModuleRegistry::new(&Config::new());
        registry.register("host", Value::Int(1));
        assert_eq!(registry.registered("host"), Some(Value::Int(1)));
        assert_eq!(registry.loaded("host"), Some(Value::Int(1)));
        assert!(registry.registered("other").is_none());
    }

    #[test]
    fn test_resolve_searches_paths_in_order() {
        let dir = std::env::temp_dir().join(format!("golem-modules-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("util.glm"), "let x = 1").unwrap();

        let registry = ModuleRegistry::new(&Config::new().with_search_path("/nonexistent"));
        assert!(registry.resolve("util").is_none());
        registry.add_search_path(&dir);
        registry.add_search_path(&dir);
        assert_eq!(registry.search_paths().len(), 2);
        assert_eq!(registry.resolve("util"), Some(dir.join("util.glm")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_slots_are_shared() {
        let registry = ModuleRegistry::new(&Config::new());
        let a = registry.slot("m");
        let b = registry.slot("m");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.loaded("m").is_none());
    }

    #[test]
    fn test_module_name_from_path() {
        assert_eq!(module_name(Path::new("/a/b/util.glm")), "util");
    }
}
