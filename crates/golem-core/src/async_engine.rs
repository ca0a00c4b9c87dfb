// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Asynchronous and parallel engine APIs.
//!
//! # Features
//!
//! - `async`: [`AsyncEngine`] reads sources with tokio and evaluates them on
//!   the blocking pool, so evaluation never stalls the async executor
//! - `parallel`: [`ParallelCompiler`] compiles many modules at once on a
//!   rayon pool
//!
//! # Example
//!
//! ```ignore
//! use golem_core::AsyncEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncEngine::new();
//!     let contents = engine.run_file("script.glm").await.unwrap();
//!     println!("{}", contents);
//! }
//! ```

#[cfg(feature = "async")]
use std::path::{Path, PathBuf};

#[cfg(feature = "async")]
use tokio::fs;

#[cfg(feature = "parallel")]
use crate::compiler::{self, CompileOptions, Module};
#[cfg(feature = "parallel")]
use crate::Builtins;
use crate::Result;
#[cfg(feature = "async")]
use crate::{Engine, Error, Value};

/// An engine with async entry points.
///
/// Evaluation itself is synchronous; each call runs on tokio's blocking
/// pool against a shared [`Engine`].
#[cfg(feature = "async")]
#[derive(Debug, Clone, Default)]
pub struct AsyncEngine {
    engine: Engine,
}

#[cfg(feature = "async")]
impl AsyncEngine {
    /// Creates an async engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing engine.
    pub fn with_engine(engine: Engine) -> Self {
        Self { engine }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Engine) -> Result<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || work(engine))
            .await
            .map_err(|err| Error::Task(err.to_string()))?
    }

    /// Evaluates `source`, returning its trailing expression's value.
    pub async fn eval(&self, source: &str) -> Result<Value> {
        let source = source.to_string();
        self.blocking(move |engine| engine.eval(&source)).await
    }

    /// Runs the script at `path`, returning its module contents.
    ///
    /// Uses tokio's async file I/O for the read.
    pub async fn run_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let source = fs::read_to_string(&path).await?;
        self.blocking(move |engine| engine.run_source(&source, &path))
            .await
    }

    /// Runs the script at `path`, then its `main` with `args`.
    pub async fn run_main(&self, path: impl AsRef<Path>, args: Vec<String>) -> Result<Value> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.blocking(move |engine| engine.run_main(&path, &args))
            .await
    }

    /// Runs several scripts concurrently. Results are in input order.
    pub async fn run_files(&self, paths: &[impl AsRef<Path>]) -> Vec<Result<Value>> {
        let runs = paths.iter().map(|path| self.run_file(path));
        futures::future::join_all(runs).await
    }

    /// Waits for every task started by `go`.
    pub async fn join_tasks(&self) -> Result<()> {
        self.blocking(|engine| {
            engine.join_tasks();
            Ok(())
        })
        .await
    }
}

/// Compiles independent modules in parallel.
#[cfg(feature = "parallel")]
#[derive(Debug)]
pub struct ParallelCompiler {
    pool: Option<rayon::ThreadPool>,
    builtins: Builtins,
}

#[cfg(feature = "parallel")]
impl ParallelCompiler {
    /// Creates a compiler that uses rayon's global pool.
    pub fn new(builtins: Builtins) -> Self {
        Self {
            pool: None,
            builtins,
        }
    }

    /// Creates a compiler with its own pool of `num_threads` threads.
    pub fn with_threads(
        builtins: Builtins,
        num_threads: usize,
    ) -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("golem-compile-{i}"))
            .build()?;
        Ok(Self {
            pool: Some(pool),
            builtins,
        })
    }

    /// Compiles each `(name, source)` pair. Results are in input order.
    pub fn compile_all(&self, sources: &[(&str, &str)]) -> Vec<Result<Module>> {
        use rayon::prelude::*;

        let work = || {
            sources
                .par_iter()
                .map(|(name, source)| {
                    compiler::compile(source, name, name, &self.builtins, CompileOptions::default())
                })
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

#[cfg(all(test, feature = "async"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_eval() {
        let engine = AsyncEngine::new();
        let result = engine.eval("1 + 2").await.unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[tokio::test]
    async fn test_async_errors_are_reported() {
        let engine = AsyncEngine::new();
        let err = engine.eval("[1][5]").await.unwrap_err();
        assert_eq!(err.as_runtime().unwrap().kind.name(), "IndexOutOfBounds");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let engine = AsyncEngine::new();
        let err = engine.run_file("/nonexistent/none.glm").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
