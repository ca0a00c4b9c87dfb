// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.

use std::env;
use std::path::PathBuf;

/// Environment variable holding extra module search paths.
pub const PATH_VAR: &str = "GOLEM_PATH";

/// Environment variable overriding the maximum call depth.
pub const MAX_DEPTH_VAR: &str = "GOLEM_MAX_DEPTH";

/// Default maximum number of active call frames.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 4096;

/// Default maximum number of calls the host makes back into the
/// interpreter while a native frame is on the Rust stack: property
/// accessors and callbacks such as `map` each take one level.
pub const DEFAULT_MAX_NESTED_CALLS: usize = 64;

/// Default file extension of Golem source files, without the dot.
pub const DEFAULT_EXTENSION: &str = "glm";

/// Settings shared by every interpreter of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directories searched, in order, when importing a module
    pub search_paths: Vec<PathBuf>,
    /// Maximum number of active call frames per evaluation
    pub max_call_depth: usize,
    /// Maximum nesting of calls made from Rust code back into the
    /// interpreter, such as getters, setters and list callbacks
    pub max_nested_calls: usize,
    /// Extension of module source files, without the dot
    pub extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nested_calls: DEFAULT_MAX_NESTED_CALLS,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Config {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `GOLEM_PATH` and `GOLEM_MAX_DEPTH` on top of the defaults.
    ///
    /// `GOLEM_PATH` uses the platform's path-list syntax. An unparsable
    /// `GOLEM_MAX_DEPTH` is ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(paths) = env::var_os(PATH_VAR) {
            config.search_paths.extend(env::split_paths(&paths));
        }

        if let Ok(depth) = env::var(MAX_DEPTH_VAR) {
            match depth.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_call_depth = depth,
                _ => tracing::warn!(value = %depth, "ignoring invalid {MAX_DEPTH_VAR}"),
            }
        }

        config
    }

    /// Appends a module search path.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Sets the maximum call depth.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Sets the maximum nesting of calls made back into the interpreter
    /// from native code.
    pub fn with_max_nested_calls(mut self, depth: usize) -> Self {
        self.max_nested_calls = depth;
        self
    }

    /// Sets the module file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert!(config.search_paths.is_empty());
        assert_eq!(config.max_call_depth, 4096);
        assert_eq!(config.max_nested_calls, 64);
        assert_eq!(config.extension, "glm");
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_search_path("/tmp/lib")
            .with_max_call_depth(16)
            .with_max_nested_calls(8)
            .with_extension("golem");
        assert_eq!(config.search_paths, vec![PathBuf::from("/tmp/lib")]);
        assert_eq!(config.max_call_depth, 16);
        assert_eq!(config.max_nested_calls, 8);
        assert_eq!(config.extension, "golem");
    }
}
