// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loading, module contents and `main`.

use std::fs;
use std::path::PathBuf;
use std::sync::Barrier;
use std::thread;

use golem_core::{Config, Engine, Error, Value};

/// A scratch directory of module files, removed on drop.
struct ModuleDir(PathBuf);

impl ModuleDir {
    fn new(test: &str, files: &[(&str, &str)]) -> Self {
        let dir = std::env::temp_dir().join(format!("golem-{test}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for (name, source) in files {
            fs::write(dir.join(format!("{name}.glm")), source).unwrap();
        }
        Self(dir)
    }

    fn engine(&self) -> Engine {
        Engine::with_config(Config::new().with_search_path(&self.0))
    }
}

impl Drop for ModuleDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn runtime_kind(result: golem_core::Result<Value>) -> &'static str {
    match result {
        Err(Error::Runtime(err)) => err.kind.name(),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn test_import_exposes_top_level_declarations() {
    let dir = ModuleDir::new(
        "contents",
        &[(
            "util",
            "let counter = 0\nconst limit = 3\nfn bump() { counter++; return counter }",
        )],
    );
    let engine = dir.engine();
    let source = "
        import util
        util.bump()
        util.counter = util.counter + 10
        [util.bump(), util.counter, util.limit]";
    let expected = Value::list(vec![Value::Int(12), Value::Int(12), Value::Int(3)]);
    assert_eq!(engine.eval(source).unwrap(), expected);
}

#[test]
fn test_module_constants_and_functions_are_readonly() {
    let dir = ModuleDir::new("readonly", &[("util", "const limit = 3\nfn f() { }")]);
    let engine = dir.engine();
    assert_eq!(runtime_kind(engine.eval("import util\nutil.limit = 4")), "ReadonlyField");
    assert_eq!(runtime_kind(engine.eval("import util\nutil.f = null")), "ReadonlyField");
}

#[test]
fn test_module_initializes_once() {
    let dir = ModuleDir::new(
        "once",
        &[
            ("counter", "let loads = 0\nloads++"),
            ("a", "import counter\nconst n = counter.loads"),
            ("b", "import counter\nconst n = counter.loads"),
        ],
    );
    let engine = dir.engine();
    let result = engine.eval("import a, b, counter\n[a.n, b.n, counter.loads]").unwrap();
    assert_eq!(result, Value::list(vec![Value::Int(1); 3]));
}

#[test]
fn test_concurrent_first_import_initializes_once() {
    let dir = ModuleDir::new(
        "concurrent",
        &[
            ("tally", "let n = 0"),
            (
                "counter",
                "import tally\nlet spin = 0\nwhile spin < 2000 { spin++ }\ntally.n = tally.n + 1\nconst done = tally.n",
            ),
        ],
    );
    const THREADS: usize = 8;

    for _ in 0..5 {
        let engine = dir.engine();
        let barrier = Barrier::new(THREADS);
        let results: Vec<Value> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let engine = engine.clone();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        engine.eval("import counter, tally\n[counter.done, tally.n]").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in results {
            assert_eq!(result, Value::list(vec![Value::Int(1), Value::Int(1)]));
        }
    }
}

#[test]
fn test_circular_import_is_an_error() {
    let dir = ModuleDir::new("cycle", &[("ping", "import pong"), ("pong", "import ping")]);
    let engine = dir.engine();
    assert_eq!(runtime_kind(engine.eval("import ping")), "CircularImport");
}

#[test]
fn test_missing_and_invalid_modules() {
    let dir = ModuleDir::new("invalid", &[("broken", "let = 1")]);
    let engine = dir.engine();
    assert_eq!(runtime_kind(engine.eval("import nowhere")), "UndefinedModule");
    assert_eq!(runtime_kind(engine.eval("import broken")), "InvalidModule");
}

#[test]
fn test_registered_module_wins() {
    let dir = ModuleDir::new("registered", &[("config", "const debug = false")]);
    let engine = dir.engine();
    engine.register_module("config", Value::str("host"));
    assert_eq!(engine.eval("import config\nconfig").unwrap(), Value::str("host"));
}

#[test]
fn test_run_main_receives_arguments() {
    let dir = ModuleDir::new(
        "main",
        &[
            ("helper", "fn greet(name) { return 'hi ' + name }"),
            (
                "app",
                "import helper\nfn main(args) { return helper.greet(args.join(' ')) }",
            ),
        ],
    );
    // The script directory is searched even without a configured path.
    let engine = Engine::new();
    let args = vec!["a".to_string(), "b".to_string()];
    let result = engine.run_main(dir.0.join("app.glm"), &args).unwrap();
    assert_eq!(result, Value::str("hi a b"));
}

#[test]
fn test_run_main_without_parameters_or_main() {
    let dir = ModuleDir::new(
        "nomain",
        &[("zero", "fn main() { return 7 }"), ("plain", "let x = 1")],
    );
    let engine = Engine::new();
    assert_eq!(engine.run_main(dir.0.join("zero.glm"), &[]).unwrap(), Value::Int(7));
    assert_eq!(engine.run_main(dir.0.join("plain.glm"), &[]).unwrap(), Value::Null);
}

#[test]
fn test_run_file_returns_contents() {
    let dir = ModuleDir::new("contents-file", &[("lib", "let answer = 6 * 7")]);
    let contents = Engine::new().run_file(dir.0.join("lib.glm")).unwrap();
    let Value::Struct(module) = contents else {
        panic!("module contents should be a struct");
    };
    assert_eq!(module.name(), Some("lib"));
    assert!(module.has_field("answer"));
}

#[test]
fn test_missing_script_is_io_error() {
    let err = Engine::new().run_file("/nonexistent/script.glm").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
