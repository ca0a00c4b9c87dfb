// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Variables, captures and per-function scope layout.

use rustc_hash::FxHashMap;

/// Storage assigned to one declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    /// Slot number among the function's locals or captures
    pub index: u32,
    /// Whether this lives in the function's captures rather than its locals
    pub is_capture: bool,
    /// Whether the name was declared `const` (or is a function or import)
    pub is_const: bool,
}

impl Variable {
    /// Creates a true local.
    pub fn local(index: u32, is_const: bool) -> Self {
        Self {
            index,
            is_capture: false,
            is_const,
        }
    }

    /// Creates a capture slot.
    pub fn capture(index: u32, is_const: bool) -> Self {
        Self {
            index,
            is_capture: true,
            is_const,
        }
    }
}

/// A capture slot in a function and the variable of the immediately
/// enclosing function it aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    /// The slot in the capturing function
    pub child: Variable,
    /// A local or capture of the enclosing function
    pub parent: Variable,
}

/// The storage layout of one function, as computed by the analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncScope {
    /// Number of true local slots, parameters included
    pub num_locals: u32,
    /// Captures, ordered by child index
    pub captures: Vec<Capture>,
}

/// Resolves names that refer to builtin functions.
///
/// Builtins are consulted only after every enclosing scope, so user
/// declarations shadow them.
pub trait BuiltinLookup {
    /// Returns the builtin table index for `name`, if any.
    fn lookup(&self, name: &str) -> Option<u16>;
}

impl BuiltinLookup for [&str] {
    fn lookup(&self, name: &str) -> Option<u16> {
        self.iter()
            .position(|b| *b == name)
            .and_then(|i| u16::try_from(i).ok())
    }
}

impl BuiltinLookup for FxHashMap<String, u16> {
    fn lookup(&self, name: &str) -> Option<u16> {
        self.get(name).copied()
    }
}

/// Block scopes and capture bookkeeping for the function being analyzed.
#[derive(Debug, Default)]
pub(super) struct FuncContext {
    blocks: Vec<FxHashMap<String, Variable>>,
    num_locals: u32,
    captures: Vec<Capture>,
    capture_map: FxHashMap<String, Variable>,
    pub(super) loop_depth: usize,
}

impl FuncContext {
    pub(super) fn new() -> Self {
        Self {
            blocks: vec![FxHashMap::default()],
            ..Self::default()
        }
    }

    pub(super) fn push_block(&mut self) {
        self.blocks.push(FxHashMap::default());
    }

    pub(super) fn pop_block(&mut self) {
        self.blocks.pop();
    }

    /// Allocates a fresh local slot that no name refers to.
    pub(super) fn hidden_local(&mut self) -> Variable {
        let var = Variable::local(self.num_locals, false);
        self.num_locals += 1;
        var
    }

    /// Declares `name` in the innermost block. Returns `None` if the block
    /// already declares it.
    pub(super) fn declare(&mut self, name: &str, is_const: bool) -> Option<Variable> {
        if self.blocks.last().is_some_and(|b| b.contains_key(name)) {
            return None;
        }
        let var = Variable::local(self.num_locals, is_const);
        self.num_locals += 1;
        self.blocks.last_mut()?.insert(name.to_string(), var);
        Some(var)
    }

    /// Finds `name` among this function's own blocks and existing captures.
    pub(super) fn find(&self, name: &str) -> Option<Variable> {
        self.blocks
            .iter()
            .rev()
            .find_map(|b| b.get(name))
            .or_else(|| self.capture_map.get(name))
            .copied()
    }

    /// Adds a capture aliasing `parent` in the enclosing function.
    pub(super) fn add_capture(&mut self, name: &str, parent: Variable) -> Variable {
        let child = Variable::capture(self.captures.len() as u32, parent.is_const);
        self.captures.push(Capture { child, parent });
        self.capture_map.insert(name.to_string(), child);
        child
    }

    pub(super) fn finish(self) -> FuncScope {
        let mut captures = self.captures;
        captures.sort_by_key(|c| c.child.index);
        FuncScope {
            num_locals: self.num_locals,
            captures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_assigns_consecutive_slots() {
        let mut ctx = FuncContext::new();
        assert_eq!(ctx.declare("a", false), Some(Variable::local(0, false)));
        assert_eq!(ctx.declare("b", true), Some(Variable::local(1, true)));
        assert_eq!(ctx.hidden_local(), Variable::local(2, false));
        assert_eq!(ctx.finish().num_locals, 3);
    }

    #[test]
    fn test_redeclare_in_same_block() {
        let mut ctx = FuncContext::new();
        ctx.declare("a", false);
        assert_eq!(ctx.declare("a", false), None);
    }

    #[test]
    fn test_shadowing_in_inner_block() {
        let mut ctx = FuncContext::new();
        ctx.declare("a", false);
        ctx.push_block();
        let inner = ctx.declare("a", true).expect("shadowing is allowed");
        assert_eq!(ctx.find("a"), Some(inner));
        ctx.pop_block();
        assert_eq!(ctx.find("a"), Some(Variable::local(0, false)));
    }

    #[test]
    fn test_capture_lookup() {
        let mut ctx = FuncContext::new();
        let child = ctx.add_capture("x", Variable::local(4, true));
        assert_eq!(child, Variable::capture(0, true));
        assert_eq!(ctx.find("x"), Some(child));
        assert_eq!(ctx.finish().captures.len(), 1);
    }

    #[test]
    fn test_builtin_lookup_on_slice() {
        let builtins: &[&str] = &["print", "len"];
        assert_eq!(builtins.lookup("len"), Some(1));
        assert_eq!(builtins.lookup("nope"), None);
    }
}
