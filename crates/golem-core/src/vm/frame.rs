// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Call frames and the try-handler state they carry.

use std::sync::Arc;

use crate::error::{RuntimeError, TraceEntry};
use crate::runtime::{BytecodeFunc, Ref, Value};

/// What to do once a `finally` block finishes.
#[derive(Debug, Clone)]
pub(crate) enum Completion {
    /// Continue at this offset
    Resume(usize),
    /// Re-raise the error that interrupted the protected code
    Throw(RuntimeError),
    /// Finish the `return` that was interrupted
    Return(Value),
}

/// Which part of a try construct is executing.
#[derive(Debug, Clone)]
pub(crate) enum Phase {
    /// The protected body
    Try,
    /// The catch clause
    Catch,
    /// The finally clause, with what happens after it
    Finally(Completion),
}

/// A pushed, not yet popped, error handler.
#[derive(Debug, Clone)]
pub(crate) struct ActiveHandler {
    /// Index into the template's handler table
    pub index: usize,
    /// Operand stack height when the handler was pushed
    pub stack_len: usize,
    pub phase: Phase,
}

/// One function activation.
pub(crate) struct Frame {
    pub func: Arc<BytecodeFunc>,
    pub locals: Vec<Ref>,
    pub stack: Vec<Value>,
    pub handlers: Vec<ActiveHandler>,
    pub ip: usize,
}

impl Frame {
    pub fn new(func: Arc<BytecodeFunc>, locals: Vec<Ref>) -> Self {
        Self {
            func,
            locals,
            stack: Vec::with_capacity(16),
            handlers: Vec::new(),
            ip: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(value) => value,
            None => unreachable!("operand stack underflow in '{}'", self.func.template().name),
        }
    }

    /// Pops the top `n` values, returned bottom first.
    pub fn pop_n(&mut self, n: usize) -> Vec<Value> {
        assert!(self.stack.len() >= n, "operand stack underflow");
        self.stack.split_off(self.stack.len() - n)
    }

    #[inline]
    pub fn peek(&self, depth: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - depth]
    }

    pub fn local(&self, slot: u16) -> &Ref {
        &self.locals[slot as usize]
    }

    pub fn capture(&self, slot: u16) -> &Ref {
        &self.func.captures[slot as usize]
    }

    /// The trace line for the instruction this frame is executing.
    pub fn trace_entry(&self) -> TraceEntry {
        TraceEntry {
            module: self.func.module.path.clone(),
            line: self.func.template().line_at(self.ip),
        }
    }
}
