// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # golem-core
//!
//! Compiler and bytecode interpreter for the Golem programming language.
//!
//! ## Overview
//!
//! Source text flows through a fixed pipeline:
//! - Scanner and parser produce an AST
//! - The scope analyzer resolves every identifier to a local slot, a
//!   capture slot or a builtin
//! - The compiler emits a [`Module`](compiler::Module) of function templates
//! - The interpreter runs the module's init function on an explicit frame
//!   stack, with try/catch/finally, closures and `go` tasks
//!
//! ## Quick Start
//!
//! ```rust
//! use golem_core::{Engine, Value};
//!
//! let engine = Engine::new();
//! let result = engine.eval("let a = 20\na + 22").unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

#[cfg(any(feature = "async", feature = "parallel"))]
pub mod async_engine;

use std::path::Path;
use std::sync::Arc;

pub use builtins::Builtins;
pub use config::Config;
pub use error::{Error, ErrorKind, Result, RuntimeError};
pub use runtime::Value;
pub use vm::{Interpreter, Runtime};

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;
#[cfg(feature = "parallel")]
pub use async_engine::ParallelCompiler;

use compiler::{CompileOptions, Module};
use runtime::FieldRead;
use vm::Output;

/// Module name given to code passed to [`Engine::eval`].
pub const EVAL_MODULE: &str = "<eval>";

/// A Golem engine: a builtin table, a module table and the tasks started
/// by `go`, shared by every evaluation it performs.
///
/// Cloning an engine yields a handle to the same runtime.
#[derive(Debug, Clone)]
pub struct Engine {
    runtime: Arc<Runtime>,
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Creates an engine with `config` and the standard builtins.
    pub fn with_config(config: Config) -> Self {
        Self {
            runtime: Arc::new(Runtime::new(config, Builtins::standard())),
        }
    }

    /// Creates an engine whose `print` output goes to `output`.
    pub fn with_output(config: Config, output: Output) -> Self {
        Self {
            runtime: Arc::new(Runtime::with_output(config, Builtins::standard(), output)),
        }
    }

    /// The shared runtime.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Compiles `source` as module `name` without running it.
    pub fn compile(&self, source: &str, name: &str) -> Result<Module> {
        compiler::compile(
            source,
            name,
            name,
            &self.runtime.builtins,
            CompileOptions::default(),
        )
    }

    /// Evaluates `source`, returning the value of its trailing expression
    /// statement, or `null` without one.
    pub fn eval(&self, source: &str) -> Result<Value> {
        let module = compiler::compile(
            source,
            EVAL_MODULE,
            EVAL_MODULE,
            &self.runtime.builtins,
            CompileOptions { eval: true },
        )?;
        let (value, _) = self.interpreter().run_module(Arc::new(module))?;
        Ok(value)
    }

    /// Runs the script at `path` and returns its module contents.
    ///
    /// The script's directory becomes a module search path.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.run_source(&source, path)
    }

    /// Runs `source` as the script at `path` and returns its module
    /// contents.
    pub fn run_source(&self, source: &str, path: &Path) -> Result<Value> {
        if let Some(dir) = path.parent() {
            let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
            self.runtime.modules.add_search_path(dir);
        }

        let name = vm::modules::module_name(path);
        let module = compiler::compile(
            source,
            &name,
            &path.display().to_string(),
            &self.runtime.builtins,
            CompileOptions::default(),
        )?;
        let (_, contents) = self.interpreter().run_module(Arc::new(module))?;
        Ok(contents)
    }

    /// Runs the script at `path`, then its `main` function if it has one.
    ///
    /// `main` receives `args` as a list of strings, unless it takes no
    /// parameters. Returns what `main` returns, or `null` without a `main`.
    pub fn run_main(&self, path: impl AsRef<Path>, args: &[String]) -> Result<Value> {
        let contents = self.run_file(path)?;
        let Some(main) = main_function(&contents) else {
            return Ok(Value::Null);
        };

        let argv = Value::list(args.iter().map(|arg| Value::str(arg)).collect());
        let call_args = match main.as_func() {
            Ok(func) if func.arity().check(0).is_ok() && func.arity().check(1).is_err() => {
                Vec::new()
            }
            _ => vec![argv],
        };

        tracing::debug!(args = args.len(), "calling main");
        Ok(self.interpreter().call_value(&main, call_args)?)
    }

    /// Makes `value` importable as module `name`.
    pub fn register_module(&self, name: &str, value: Value) {
        self.runtime.modules.register(name, value);
    }

    /// Blocks until every task started by `go` has finished.
    pub fn join_tasks(&self) {
        self.runtime.tasks.join();
    }

    fn interpreter(&self) -> Interpreter {
        Interpreter::new(self.runtime.clone())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn main_function(contents: &Value) -> Option<Value> {
    let Value::Struct(module) = contents else {
        return None;
    };
    match module.get("main") {
        Ok(FieldRead::Value(main @ Value::Func(_))) => Some(main),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_trailing_expression() {
        let engine = Engine::new();
        assert_eq!(engine.eval("1 + 2").unwrap(), Value::Int(3));
        assert_eq!(engine.eval("let a = 1").unwrap(), Value::Null);
    }

    #[test]
    fn test_eval_reports_each_stage() {
        let engine = Engine::new();
        assert!(matches!(engine.eval("let = 1"), Err(Error::Syntax(_))));
        assert!(matches!(engine.eval("missing + 1"), Err(Error::Analysis(_))));
        assert!(matches!(engine.eval("1 / 0"), Err(Error::Runtime(_))));
    }

    #[test]
    fn test_compile_does_not_run() {
        let engine = Engine::new();
        let module = engine.compile("assert(false)", "m").unwrap();
        assert_eq!(module.name.as_ref(), "m");
    }

    #[test]
    fn test_main_function_lookup() {
        let engine = Engine::new();
        let module = engine.compile("fn main() { }", "m").unwrap();
        let (_, contents) = engine
            .interpreter()
            .run_module(Arc::new(module))
            .unwrap();
        assert!(main_function(&contents).is_some());
        assert!(main_function(&Value::Int(1)).is_none());
    }
}
