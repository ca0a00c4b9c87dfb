// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode virtual machine.
//!
//! This module contains the interpreter that executes compiled templates,
//! along with the state it shares with tasks started by `go`.
//!
//! ## Structure
//!
//! - `interpreter` - Dispatch loop, calls, error unwinding, imports
//! - `frame` - Call frames and active try handlers
//! - `arith` - Operator semantics
//! - `comparison` - Equality and ordering
//! - `indexing` - Indexing and slicing
//! - `modules` - The module table
//! - `tasks` - Threads started by `go`

mod frame;
mod interpreter;

pub mod arith;
pub mod comparison;
pub mod indexing;
pub mod modules;
pub mod tasks;

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::builtins::Builtins;
use crate::config::Config;

pub use interpreter::Interpreter;
pub use modules::ModuleRegistry;
pub use tasks::TaskTracker;

/// Where `print` and `println` write.
pub type Output = Box<dyn Write + Send>;

/// State shared by every interpreter of one engine, including those
/// running `go` tasks.
pub struct Runtime {
    /// Engine configuration
    pub config: Config,
    /// The builtin table, fixed once the runtime is created
    pub builtins: Builtins,
    /// Loaded and registered modules
    pub modules: ModuleRegistry,
    /// Running `go` tasks
    pub tasks: TaskTracker,
    output: Mutex<Output>,
}

impl Runtime {
    /// Creates a runtime that prints to standard output.
    pub fn new(config: Config, builtins: Builtins) -> Self {
        Self::with_output(config, builtins, Box::new(io::stdout()))
    }

    /// Creates a runtime that prints to `output`.
    pub fn with_output(config: Config, builtins: Builtins, output: Output) -> Self {
        let modules = ModuleRegistry::new(&config);
        Self {
            config,
            builtins,
            modules,
            tasks: TaskTracker::new(),
            output: Mutex::new(output),
        }
    }

    /// Writes program output.
    pub fn write_output(&self, text: &str) -> io::Result<()> {
        let mut output = self.output.lock();
        output.write_all(text.as_bytes())?;
        output.flush()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("modules", &self.modules)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}
