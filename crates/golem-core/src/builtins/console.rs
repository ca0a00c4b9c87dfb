// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `print` and `println`.
//!
//! Arguments are displayed and joined by single spaces. Output goes through
//! the runtime, so hosts can capture it.

use crate::error::{ErrorKind, Fault};
use crate::runtime::Value;
use crate::vm::Interpreter;

fn join(args: &[Value]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn write(interp: &mut Interpreter, text: &str) -> Result<Value, Fault> {
    interp
        .runtime()
        .write_output(text)
        .map_err(|err| ErrorKind::invalid_argument(format!("cannot write output: {err}")))?;
    Ok(Value::Null)
}

/// Prints its arguments without a trailing newline.
pub fn print(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let text = join(args);
    write(interp, &text)
}

/// Prints its arguments followed by a newline.
pub fn println(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let mut text = join(args);
    text.push('\n');
    write(interp, &text)
}
