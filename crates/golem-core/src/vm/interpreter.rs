// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.
//!
//! Frames live on an explicit stack. Calling a bytecode function pushes a
//! frame and leaves the caller's instruction pointer on the `Invoke`; the
//! return advances it. Errors unwind that stack by hand, consulting the
//! try handlers each frame has pushed.
//!
//! A try handler moves through three phases. While the protected body runs
//! it is in `Try`. An error switches it to `Catch` (or straight to `Finally`
//! without a catch clause). Leaving the body or the catch clause with a
//! `finally` present switches it to `Finally`, remembering whether to
//! resume, re-raise or return once the `finally` block reaches its end.

use std::sync::Arc;

use parking_lot::RwLock;

use super::arith;
use super::frame::{ActiveHandler, Completion, Frame, Phase};
use super::indexing;
use super::Runtime;
use crate::compiler::bytecode::decode;
use crate::compiler::{self, Arity, CompileOptions, Constant, FieldKind, Module, Opcode};
use crate::error::{ErrorKind, Fault, RuntimeError};
use crate::runtime::iterator::iterate;
use crate::runtime::methods;
use crate::runtime::{
    new_ref, BytecodeFunc, Dict, Field, FieldRead, FieldWrite, Func, NativeFunc, Ref, Set,
    Struct, Value,
};

/// Width of the `Invoke` instruction a returning call resumes after.
const INVOKE_WIDTH: usize = 3;

/// Result of checking whether a handler region just ended.
enum RegionEnd {
    /// Keep executing instructions
    Inside,
    /// A catch clause ended and its finally clause starts here
    Advanced,
    /// A region ended and its handler was popped
    Completed(Completion),
}

/// Executes compiled Golem code.
///
/// An interpreter is one thread of evaluation. Interpreters created for
/// `go` tasks share the [`Runtime`] of the one that spawned them.
pub struct Interpreter {
    runtime: Arc<Runtime>,
    frames: Vec<Frame>,
    /// Dispatch loops currently running on the Rust stack
    nested: usize,
}

impl Interpreter {
    /// Creates an interpreter with no active frames.
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            frames: Vec::new(),
            nested: 0,
        }
    }

    /// The shared runtime.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Runs the init function of `module`.
    ///
    /// Returns the init function's result together with the module
    /// contents value, whose fields alias the module's top-level variables.
    pub fn run_module(&mut self, module: Arc<Module>) -> Result<(Value, Value), RuntimeError> {
        let func = Arc::new(BytecodeFunc {
            module: module.clone(),
            template: 0,
            captures: Vec::new(),
        });
        let floor = self.frames.len();
        if let Err(fault) = self.push_frame(func, Vec::new()) {
            return Err(self.raise(fault));
        }
        let locals = self.frames[floor].locals.clone();

        tracing::debug!(module = %module.name, path = %module.path, "running module init");
        let result = self.run(floor)?;
        Ok((result, module_contents(&module, &locals)))
    }

    /// Calls `callee` with `args` and runs it to completion.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Func(Func::Native(native)) => {
                let result = self.call_native(native, args);
                result.map_err(|fault| self.raise(fault))
            }
            Value::Func(Func::Bytecode(func)) => {
                // Every call from here nests a dispatch loop on the Rust
                // stack, which the frame limit alone does not bound.
                let max = self.runtime.config.max_nested_calls;
                if self.nested >= max {
                    return Err(self.raise(ErrorKind::StackOverflow(max).into()));
                }
                let floor = self.frames.len();
                if let Err(fault) = self.push_frame(func.clone(), args) {
                    return Err(self.raise(fault));
                }
                self.nested += 1;
                let result = self.run(floor);
                self.nested -= 1;
                result
            }
            _ => Err(self.raise(ErrorKind::type_mismatch("Func").into())),
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    fn push_frame(&mut self, func: Arc<BytecodeFunc>, mut args: Vec<Value>) -> Result<(), Fault> {
        let max = self.runtime.config.max_call_depth;
        if self.frames.len() >= max {
            return Err(ErrorKind::StackOverflow(max).into());
        }

        let template = func.template();
        template.arity.check(args.len())?;
        match template.arity {
            Arity::Fixed(_) => {}
            Arity::Variadic { required } => {
                let rest = args.split_off(required as usize);
                args.push(Value::list(rest));
            }
            Arity::Multiple { required, .. } => {
                let given = args.len() - required as usize;
                args.extend(template.defaults[given..].iter().map(constant_value));
            }
        }

        let mut args = args.into_iter();
        let locals: Vec<Ref> = (0..template.num_locals)
            .map(|_| new_ref(args.next().unwrap_or_default()))
            .collect();

        self.frames.push(Frame::new(func, locals));
        Ok(())
    }

    fn frame_mut(&mut self) -> &mut Frame {
        top(&mut self.frames)
    }

    fn push(&mut self, value: Value) {
        self.frame_mut().push(value);
    }

    /// Attaches the current stack trace to a new error.
    fn raise(&self, fault: Fault) -> RuntimeError {
        match fault {
            Fault::Error(err) => err,
            Fault::Kind(kind) => {
                let trace = self.frames.iter().rev().map(Frame::trace_entry).collect();
                RuntimeError::new(kind, trace)
            }
        }
    }

    // ========================================================================
    // Dispatch loop
    // ========================================================================

    /// Runs until the frame at index `floor` returns.
    fn run(&mut self, floor: usize) -> Result<Value, RuntimeError> {
        loop {
            let outcome = match self.region_end() {
                RegionEnd::Inside => self.step(floor),
                RegionEnd::Advanced => continue,
                RegionEnd::Completed(completion) => self.complete(completion, floor),
            };
            match outcome {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(fault) => {
                    let err = self.raise(fault);
                    self.handle_error(err, floor)?;
                }
            }
        }
    }

    /// Detects the end of the catch or finally region being executed.
    fn region_end(&mut self) -> RegionEnd {
        let frame = self.frame_mut();
        let Some(active) = frame.handlers.last_mut() else {
            return RegionEnd::Inside;
        };
        let handler = frame.func.template().handlers[active.index];

        match active.phase {
            Phase::Try => RegionEnd::Inside,
            Phase::Catch => {
                let Some(catch) = handler.catch else {
                    unreachable!("catch phase without a catch region");
                };
                if frame.ip != catch.end as usize {
                    return RegionEnd::Inside;
                }
                if handler.finally.is_some() {
                    active.phase = Phase::Finally(Completion::Resume(handler.end as usize));
                    RegionEnd::Advanced
                } else {
                    frame.handlers.pop();
                    RegionEnd::Completed(Completion::Resume(handler.end as usize))
                }
            }
            Phase::Finally(_) => {
                let Some(finally) = handler.finally else {
                    unreachable!("finally phase without a finally region");
                };
                if frame.ip != finally.end as usize {
                    return RegionEnd::Inside;
                }
                match frame.handlers.pop() {
                    Some(ActiveHandler {
                        phase: Phase::Finally(completion),
                        ..
                    }) => RegionEnd::Completed(completion),
                    _ => unreachable!("finally handler vanished"),
                }
            }
        }
    }

    fn complete(&mut self, completion: Completion, floor: usize) -> Result<Option<Value>, Fault> {
        match completion {
            Completion::Resume(ip) => {
                self.frame_mut().ip = ip;
                Ok(None)
            }
            Completion::Throw(err) => Err(Fault::Error(err)),
            Completion::Return(value) => self.unwind_return(value, floor),
        }
    }

    /// Executes one instruction. Returns the result of the frame at
    /// `floor` once it returns.
    fn step(&mut self, floor: usize) -> Result<Option<Value>, Fault> {
        let frame = top(&mut self.frames);
        let Some(instr) = decode(&frame.func.template().bytecode, frame.ip) else {
            unreachable!(
                "invalid instruction at offset {} of '{}'",
                frame.ip,
                frame.func.template().name
            );
        };
        let next = frame.ip + instr.opcode.width();

        match instr.opcode {
            // Stack operations
            Opcode::Pop => {
                frame.pop();
            }
            Opcode::Dup => {
                let value = frame.peek(0).clone();
                frame.push(value);
            }
            Opcode::Dup2 => {
                let a = frame.peek(1).clone();
                let b = frame.peek(0).clone();
                frame.push(a);
                frame.push(b);
            }
            Opcode::LoadNull => frame.push(Value::Null),
            Opcode::LoadTrue => frame.push(Value::Bool(true)),
            Opcode::LoadFalse => frame.push(Value::Bool(false)),
            Opcode::LoadZero => frame.push(Value::Int(0)),
            Opcode::LoadOne => frame.push(Value::Int(1)),
            Opcode::LoadNegOne => frame.push(Value::Int(-1)),
            Opcode::LoadConst => {
                let value = constant_value(&frame.func.module.pool.constants[instr.a as usize]);
                frame.push(value);
            }
            Opcode::LoadBuiltin => {
                let value = self.runtime.builtins.value(instr.a).clone();
                frame.push(value);
            }

            // Variables
            Opcode::LoadLocal => {
                let value = frame.local(instr.a).read().clone();
                frame.push(value);
            }
            Opcode::LoadCapture => {
                let value = frame.capture(instr.a).read().clone();
                frame.push(value);
            }
            Opcode::StoreLocal => {
                let value = frame.pop();
                *frame.local(instr.a).write() = value;
            }
            Opcode::StoreCapture => {
                let value = frame.pop();
                *frame.capture(instr.a).write() = value;
            }

            // Control flow
            Opcode::Jump => {
                frame.ip = instr.a as usize;
                return Ok(None);
            }
            Opcode::JumpTrue | Opcode::JumpFalse => {
                let cond = frame.pop().as_bool()?;
                if cond == (instr.opcode == Opcode::JumpTrue) {
                    frame.ip = instr.a as usize;
                    return Ok(None);
                }
            }
            Opcode::Break | Opcode::Continue | Opcode::FuncLocal | Opcode::FuncCapture => {
                unreachable!("{:?} executed outside of its context", instr.opcode)
            }

            // Functions
            Opcode::Invoke => {
                self.invoke(instr.a as usize)?;
                return Ok(None);
            }
            Opcode::Go => self.go(instr.a as usize)?,
            Opcode::Return => {
                let value = frame.pop();
                return self.return_from_frame(value, floor);
            }
            Opcode::TryReturn => {
                let value = frame.pop();
                return self.unwind_return(value, floor);
            }
            Opcode::NewFunc => {
                let code = &frame.func.template().bytecode;
                let mut offset = next;
                let mut captures = Vec::with_capacity(instr.b as usize);
                for _ in 0..instr.b {
                    let cell = match decode(code, offset) {
                        Some(op) if op.opcode == Opcode::FuncLocal => frame.local(op.a).clone(),
                        Some(op) if op.opcode == Opcode::FuncCapture => frame.capture(op.a).clone(),
                        other => unreachable!("expected a capture operand, found {other:?}"),
                    };
                    captures.push(cell);
                    offset += Opcode::FuncLocal.width();
                }
                let func = BytecodeFunc {
                    module: frame.func.module.clone(),
                    template: instr.a as usize,
                    captures,
                };
                frame.push(Value::Func(Func::Bytecode(Arc::new(func))));
                frame.ip = offset;
                return Ok(None);
            }

            // Errors
            Opcode::Throw => {
                return Err(match frame.pop() {
                    Value::Error(err) => Fault::Error((*err).clone()),
                    value => ErrorKind::Thrown(value).into(),
                });
            }
            Opcode::PushTry => {
                let stack_len = frame.stack.len();
                frame.handlers.push(ActiveHandler {
                    index: instr.a as usize,
                    stack_len,
                    phase: Phase::Try,
                });
            }
            Opcode::PopTry => {
                let Some(active) = frame.handlers.last_mut() else {
                    unreachable!("PopTry without an active handler");
                };
                let handler = frame.func.template().handlers[active.index];
                let pending = matches!(active.phase, Phase::Try | Phase::Catch);
                match handler.finally {
                    Some(finally) if pending => {
                        active.phase = Phase::Finally(Completion::Resume(next));
                        frame.ip = finally.begin as usize;
                        return Ok(None);
                    }
                    _ => {
                        frame.handlers.pop();
                    }
                }
            }

            // Operators
            Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Lte
            | Opcode::Gt
            | Opcode::Gte
            | Opcode::Cmp
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Rem
            | Opcode::BitAnd
            | Opcode::BitOr
            | Opcode::BitXor
            | Opcode::LeftShift
            | Opcode::RightShift => {
                let b = frame.pop();
                let a = frame.pop();
                frame.push(arith::binary(instr.opcode, &a, &b)?);
            }
            Opcode::Negate => {
                let value = frame.pop();
                frame.push(arith::negate(&value)?);
            }
            Opcode::Complement => {
                let value = frame.pop();
                frame.push(arith::complement(&value)?);
            }
            Opcode::Not => {
                let value = frame.pop();
                frame.push(arith::not(&value)?);
            }

            // Fields and indexing
            Opcode::GetField => {
                let name = frame.func.module.name_at(instr.a).clone();
                let object = frame.pop();
                let value = self.get_field(&object, &name)?;
                self.push(value);
            }
            Opcode::SetField => {
                let name = frame.func.module.name_at(instr.a).clone();
                let value = frame.pop();
                let object = frame.pop();
                self.set_field(&object, &name, value.clone())?;
                self.push(value);
            }
            Opcode::IncField => {
                let name = frame.func.module.name_at(instr.a).clone();
                let delta = frame.pop();
                let object = frame.pop();
                let old = self.get_field(&object, &name)?;
                let new = arith::binary(Opcode::Add, &old, &delta)?;
                self.set_field(&object, &name, new)?;
                self.push(old);
            }
            Opcode::GetIndex => {
                let index = frame.pop();
                let object = frame.pop();
                frame.push(indexing::get_index(&object, &index)?);
            }
            Opcode::SetIndex => {
                let value = frame.pop();
                let index = frame.pop();
                let object = frame.pop();
                indexing::set_index(&object, &index, value.clone())?;
                frame.push(value);
            }
            Opcode::IncIndex => {
                let delta = frame.pop();
                let index = frame.pop();
                let object = frame.pop();
                let old = indexing::get_index(&object, &index)?;
                let new = arith::binary(Opcode::Add, &old, &delta)?;
                indexing::set_index(&object, &index, new)?;
                frame.push(old);
            }
            Opcode::Slice => {
                let to = frame.pop();
                let from = frame.pop();
                let object = frame.pop();
                frame.push(indexing::slice(&object, Some(&from), Some(&to))?);
            }
            Opcode::SliceFrom => {
                let from = frame.pop();
                let object = frame.pop();
                frame.push(indexing::slice(&object, Some(&from), None)?);
            }
            Opcode::SliceTo => {
                let to = frame.pop();
                let object = frame.pop();
                frame.push(indexing::slice(&object, None, Some(&to))?);
            }

            // Literals
            Opcode::NewStruct => {
                let module = frame.func.module.clone();
                let def = &module.pool.struct_defs[instr.a as usize];
                let mut values = frame.pop_n(def.arity()).into_iter();
                let mut next_value = || values.next().unwrap_or_default();
                let fields = def
                    .fields
                    .iter()
                    .map(|(name, kind)| {
                        let field = match kind {
                            FieldKind::Field => Field::plain(next_value(), false),
                            FieldKind::Readonly => Field::plain(next_value(), true),
                            FieldKind::Property { .. } => {
                                let getter = next_value();
                                let setter = next_value();
                                Field::Property {
                                    getter,
                                    setter: (!setter.is_null()).then_some(setter),
                                }
                            }
                        };
                        (name.clone(), field)
                    })
                    .collect();
                frame.push(Value::Struct(Arc::new(Struct::new(fields))));
            }
            Opcode::NewDict => {
                let items = frame.pop_n(instr.a as usize * 2);
                let mut dict = Dict::new();
                for pair in items.chunks_exact(2) {
                    dict.insert(pair[0].to_key()?, pair[1].clone());
                }
                frame.push(Value::Dict(Arc::new(RwLock::new(dict))));
            }
            Opcode::NewList => {
                let items = frame.pop_n(instr.a as usize);
                frame.push(Value::list(items));
            }
            Opcode::NewSet => {
                let items = frame.pop_n(instr.a as usize);
                let set = items.iter().map(Value::to_key).collect::<Result<Set, _>>()?;
                frame.push(Value::Set(Arc::new(RwLock::new(set))));
            }
            Opcode::NewTuple => {
                let items = frame.pop_n(instr.a as usize);
                frame.push(Value::tuple(items));
            }
            Opcode::CheckTuple => match frame.peek(0) {
                Value::Tuple(items) if items.len() == instr.a as usize => {}
                _ => {
                    return Err(
                        ErrorKind::type_mismatch(format!("tuple of {} elements", instr.a)).into(),
                    )
                }
            },

            // Iteration
            Opcode::NewIter => {
                let iterable = frame.pop();
                frame.push(iterate(&iterable)?);
            }
            Opcode::IterNext => match frame.pop() {
                Value::Iter(iter) => {
                    let more = iter.lock().advance();
                    frame.push(Value::Bool(more));
                }
                _ => return Err(ErrorKind::type_mismatch("Iter").into()),
            },
            Opcode::IterGet => match frame.pop() {
                Value::Iter(iter) => {
                    let current = iter.lock().current();
                    frame.push(current);
                }
                _ => return Err(ErrorKind::type_mismatch("Iter").into()),
            },

            // Modules
            Opcode::ImportModule => {
                let name = frame.func.module.name_at(instr.a).clone();
                let module = self.import(&name)?;
                self.push(module);
            }
        }

        self.frame_mut().ip = next;
        Ok(None)
    }

    // ========================================================================
    // Calls and returns
    // ========================================================================

    fn invoke(&mut self, argc: usize) -> Result<(), Fault> {
        let frame = self.frame_mut();
        let args = frame.pop_n(argc);
        let callee = frame.pop();
        match callee {
            Value::Func(Func::Bytecode(func)) => self.push_frame(func, args),
            Value::Func(Func::Native(native)) => {
                let result = self.call_native(&native, args)?;
                let frame = self.frame_mut();
                frame.push(result);
                frame.ip += INVOKE_WIDTH;
                Ok(())
            }
            Value::Null => Err(ErrorKind::NullValue.into()),
            _ => Err(ErrorKind::type_mismatch("Func").into()),
        }
    }

    fn call_native(&mut self, native: &NativeFunc, args: Vec<Value>) -> Result<Value, Fault> {
        native.arity.check(args.len())?;
        let args = match &native.receiver {
            Some(receiver) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(receiver.clone());
                full.extend(args);
                full
            }
            None => args,
        };
        (native.func)(self, &args)
    }

    /// Starts a call on its own thread. Errors the task does not handle are
    /// logged and dropped.
    fn go(&mut self, argc: usize) -> Result<(), Fault> {
        let frame = self.frame_mut();
        let args = frame.pop_n(argc);
        let callee = frame.pop();
        let func = callee.as_func()?.clone();
        func.arity().check(args.len())?;

        let name = format!("golem-go-{}", func.name());
        let runtime = self.runtime.clone();
        let spawned = self.runtime.tasks.spawn(name, move || {
            let mut interp = Interpreter::new(runtime);
            if let Err(err) = interp.call_value(&Value::Func(func), args) {
                tracing::error!(kind = err.kind.name(), "uncaught error in go task: {err}");
            }
        });
        spawned.map_err(|err| ErrorKind::invalid_argument(format!("cannot start task: {err}")))?;
        Ok(())
    }

    /// Pops the current frame, handing `value` to the caller.
    fn return_from_frame(&mut self, value: Value, floor: usize) -> Result<Option<Value>, Fault> {
        self.frames.pop();
        if self.frames.len() <= floor {
            return Ok(Some(value));
        }
        let caller = self.frame_mut();
        caller.push(value);
        caller.ip += INVOKE_WIDTH;
        Ok(None)
    }

    /// Returns through the active handlers, running the innermost pending
    /// `finally` block first.
    fn unwind_return(&mut self, value: Value, floor: usize) -> Result<Option<Value>, Fault> {
        let frame = self.frame_mut();
        while let Some(active) = frame.handlers.last_mut() {
            let handler = frame.func.template().handlers[active.index];
            let pending = matches!(active.phase, Phase::Try | Phase::Catch);
            match handler.finally {
                Some(finally) if pending => {
                    frame.stack.truncate(active.stack_len);
                    active.phase = Phase::Finally(Completion::Return(value));
                    frame.ip = finally.begin as usize;
                    return Ok(None);
                }
                _ => {
                    frame.handlers.pop();
                }
            }
        }
        self.return_from_frame(value, floor)
    }

    /// Transfers control to the innermost handler able to take `err`,
    /// popping frames down to `floor`. Returns the error if none is found.
    fn handle_error(&mut self, err: RuntimeError, floor: usize) -> Result<(), RuntimeError> {
        while self.frames.len() > floor {
            let frame = self.frame_mut();
            while let Some(active) = frame.handlers.last_mut() {
                let handler = frame.func.template().handlers[active.index];
                match active.phase {
                    Phase::Try => {
                        frame.stack.truncate(active.stack_len);
                        if let Some(catch) = handler.catch {
                            active.phase = Phase::Catch;
                            frame.stack.push(err.into_value());
                            frame.ip = catch.begin as usize;
                        } else if let Some(finally) = handler.finally {
                            active.phase = Phase::Finally(Completion::Throw(err));
                            frame.ip = finally.begin as usize;
                        } else {
                            unreachable!("try without catch or finally");
                        }
                        return Ok(());
                    }
                    Phase::Catch => {
                        if let Some(finally) = handler.finally {
                            frame.stack.truncate(active.stack_len);
                            active.phase = Phase::Finally(Completion::Throw(err));
                            frame.ip = finally.begin as usize;
                            return Ok(());
                        }
                        frame.handlers.pop();
                    }
                    Phase::Finally(_) => {
                        frame.handlers.pop();
                    }
                }
            }
            self.frames.pop();
        }
        Err(err)
    }

    // ========================================================================
    // Fields
    // ========================================================================

    fn get_field(&mut self, object: &Value, name: &str) -> Result<Value, Fault> {
        match object {
            Value::Struct(s) => match s.get(name)? {
                FieldRead::Value(value) => Ok(value),
                FieldRead::Getter(getter) => Ok(self.call_value(&getter, Vec::new())?),
            },
            other => Ok(methods::get_field(other, name)?),
        }
    }

    fn set_field(&mut self, object: &Value, name: &str, value: Value) -> Result<(), Fault> {
        match object {
            Value::Struct(s) => match s.set(name, value.clone())? {
                FieldWrite::Stored => Ok(()),
                FieldWrite::Setter(setter) => {
                    self.call_value(&setter, vec![value])?;
                    Ok(())
                }
            },
            Value::Null => Err(ErrorKind::NullValue.into()),
            _ => Err(ErrorKind::type_mismatch("Struct").into()),
        }
    }

    // ========================================================================
    // Modules
    // ========================================================================

    /// Returns the contents of module `name`, initializing it on first use.
    fn import(&mut self, name: &str) -> Result<Value, Fault> {
        let runtime = self.runtime.clone();
        if let Some(value) = runtime.modules.registered(name) {
            return Ok(value);
        }

        let slot = runtime.modules.slot(name);
        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }

        let latch = slot.init.lock();
        // Another thread may have finished while this one waited.
        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }
        if latch.get() {
            tracing::warn!(module = name, "circular import");
            return Err(ErrorKind::CircularImport(name.to_string()).into());
        }

        latch.set(true);
        let loaded = self.load_module(name);
        latch.set(false);

        let value = loaded?;
        Ok(slot.value.get_or_init(|| value).clone())
    }

    fn load_module(&mut self, name: &str) -> Result<Value, Fault> {
        let Some(path) = self.runtime.modules.resolve(name) else {
            return Err(ErrorKind::UndefinedModule(name.to_string()).into());
        };
        let invalid = |reason: String| ErrorKind::InvalidModule {
            name: name.to_string(),
            reason,
        };

        let source = std::fs::read_to_string(&path).map_err(|err| invalid(err.to_string()))?;
        let module = compiler::compile(
            &source,
            name,
            &path.display().to_string(),
            &self.runtime.builtins,
            CompileOptions::default(),
        )
        .map_err(|err| invalid(err.to_string()))?;

        tracing::debug!(module = name, path = %path.display(), "loading module");
        let (_, contents) = self.run_module(Arc::new(module))?;
        Ok(contents)
    }
}

fn top(frames: &mut [Frame]) -> &mut Frame {
    match frames.last_mut() {
        Some(frame) => frame,
        None => unreachable!("no active frame"),
    }
}

/// Converts a pool constant into a value.
pub(crate) fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Null => Value::Null,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(n) => Value::Int(*n),
        Constant::Float(n) => Value::Float(*n),
        Constant::Str(s) => Value::Str(s.clone()),
    }
}

/// Builds the value an importer sees: one field per top-level declaration,
/// aliasing the init function's variable cells.
fn module_contents(module: &Module, locals: &[Ref]) -> Value {
    let fields = module
        .contents
        .iter()
        .map(|entry| {
            let field = Field::Cell {
                cell: locals[entry.slot as usize].clone(),
                readonly: entry.kind.is_readonly(),
            };
            (entry.name.clone(), field)
        })
        .collect();
    Value::Struct(Arc::new(Struct::module(module.name.clone(), fields)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::config::Config;

    fn runtime() -> Arc<Runtime> {
        Arc::new(Runtime::new(Config::new(), Builtins::standard()))
    }

    fn eval_in(runtime: Arc<Runtime>, source: &str) -> Result<Value, RuntimeError> {
        let module = compiler::compile(
            source,
            "test",
            "test.glm",
            &runtime.builtins,
            CompileOptions { eval: true },
        )
        .unwrap();
        Interpreter::new(runtime)
            .run_module(Arc::new(module))
            .map(|(value, _)| value)
    }

    fn eval(source: &str) -> Result<Value, RuntimeError> {
        eval_in(runtime(), source)
    }

    fn eval_ok(source: &str) -> Value {
        match eval(source) {
            Ok(value) => value,
            Err(err) => panic!("evaluation failed: {err}"),
        }
    }

    #[test]
    fn test_arithmetic_and_locals() {
        assert_eq!(eval_ok("let a = 2; let b = a * 3 + 1; b"), Value::Int(7));
        assert_eq!(eval_ok("let s = 'a'; s += 1; s"), Value::str("a1"));
    }

    #[test]
    fn test_loops_with_break_and_continue() {
        let source = "
            let total = 0
            for i in range(10) {
                if i == 7 { break }
                if i % 2 == 0 { continue }
                total += i
            }
            total";
        assert_eq!(eval_ok(source), Value::Int(1 + 3 + 5));
    }

    #[test]
    fn test_calls_and_recursion() {
        let source = "
            fn fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2) }
            fib(15)";
        assert_eq!(eval_ok(source), Value::Int(610));
    }

    #[test]
    fn test_catch_binds_error_value() {
        let source = "
            let kind = null
            try { let x = 1 / 0 } catch e { kind = e.kind }
            kind";
        assert_eq!(eval_ok(source), Value::str("DivideByZero"));
    }

    #[test]
    fn test_thrown_values_are_caught_as_themselves() {
        assert_eq!(eval_ok("let v = 0; try { throw 42 } catch e { v = e }; v"), Value::Int(42));
    }

    #[test]
    fn test_error_crosses_frames() {
        let source = "
            fn inner() { throw 'boom' }
            fn outer() { inner(); return 1 }
            let r = null
            try { outer() } catch e { r = e }
            r";
        assert_eq!(eval_ok(source), Value::str("boom"));
    }

    #[test]
    fn test_finally_runs_on_normal_path() {
        assert_eq!(eval_ok("let a = 0; try { a++ } finally { a++ }; a"), Value::Int(2));
    }

    #[test]
    fn test_finally_rethrows() {
        let source = "
            let log = []
            try {
                try { throw 'x' } finally { log.add('inner') }
            } catch e { log.add(e) }
            log";
        assert_eq!(
            eval_ok(source),
            Value::list(vec![Value::str("inner"), Value::str("x")])
        );
    }

    #[test]
    fn test_return_runs_finally() {
        let source = "
            let log = []
            fn f() {
                try { return 1 } finally { log.add('finally') }
                return 2
            }
            let r = f()
            [r, log]";
        let expected = Value::list(vec![
            Value::Int(1),
            Value::list(vec![Value::str("finally")]),
        ]);
        assert_eq!(eval_ok(source), expected);
    }

    #[test]
    fn test_nested_try_routes_to_innermost_handler() {
        let source = "
            let seen = ''
            try {
                try { throw 'x' } catch e { seen += 'inner' }
                seen += '-after'
            } catch e { seen += 'outer' }
            seen";
        assert_eq!(eval_ok(source), Value::str("inner-after"));
    }

    #[test]
    fn test_break_out_of_try_runs_finally() {
        let source = "
            let n = 0
            while true {
                try { break } finally { n++ }
            }
            n";
        assert_eq!(eval_ok(source), Value::Int(1));
    }

    #[test]
    fn test_uncaught_error_has_trace() {
        let source = "fn f() {\n  return 1 / 0\n}\nf()";
        let err = eval(source).unwrap_err();
        assert_eq!(err.kind.name(), "DivideByZero");
        let lines: Vec<_> = err.stack_trace.iter().map(|e| e.line).collect();
        assert_eq!(lines, [2, 4]);
    }

    #[test]
    fn test_rethrow_keeps_original_trace() {
        let source = "fn f() {\n  return [][0]\n}\ntry { f() } catch e {\n  throw e\n}";
        let err = eval(source).unwrap_err();
        assert_eq!(err.kind.name(), "IndexOutOfBounds");
        assert_eq!(err.stack_trace[0].line, 2);
    }

    #[test]
    fn test_struct_fields_and_properties() {
        let source = "
            let s = struct { a: 1, const b: 2, prop c: (|| => this.a * 10, |v| => { this.a = v }) }
            s.c = 4
            s.a++
            [s.a, s.b, s.c]";
        assert_eq!(
            eval_ok(source),
            Value::list(vec![Value::Int(5), Value::Int(2), Value::Int(50)])
        );
        let err = eval("let s = struct { const b: 2 }; s.b = 3").unwrap_err();
        assert_eq!(err.kind.name(), "ReadonlyField");
    }

    #[test]
    fn test_stack_overflow_is_an_error() {
        let runtime = Arc::new(Runtime::new(
            Config::new().with_max_call_depth(64),
            Builtins::standard(),
        ));
        let err = eval_in(runtime, "fn f() { return f() }; f()").unwrap_err();
        assert_eq!(err.kind.to_string(), "StackOverflow: maximum call depth of 64 exceeded");
    }

    #[test]
    fn test_recursive_getter_is_a_stack_overflow() {
        let err = eval("let s = struct { prop a: (|| => this.a) }\ns.a").unwrap_err();
        assert_eq!(err.kind.name(), "StackOverflow");
        assert_eq!(err.kind.to_string(), "StackOverflow: maximum call depth of 64 exceeded");
    }

    #[test]
    fn test_recursion_through_callbacks_is_a_stack_overflow() {
        let source = "fn f(n) { return n == 0 ? 0 : [n].map(|x| => f(x - 1))[0] }\nf(3000)";
        let err = eval(source).unwrap_err();
        assert_eq!(err.kind.name(), "StackOverflow");

        // Shallow recursion through callbacks still works and can be caught.
        assert_eq!(
            eval_ok("fn f(n) { return n == 0 ? 0 : [n].map(|x| => f(x - 1))[0] + 1 }\nf(20)"),
            Value::Int(20)
        );
        let caught = "let s = struct { prop a: (|| => this.a) }\ntry { s.a } catch e { e.kind }";
        assert_eq!(eval_ok(caught), Value::str("StackOverflow"));
    }

    #[test]
    fn test_nested_call_limit_is_configurable() {
        let runtime = Arc::new(Runtime::new(
            Config::new().with_max_nested_calls(4),
            Builtins::standard(),
        ));
        let source = "fn f(n) { return n == 0 ? 0 : [n].map(|x| => f(x - 1))[0] }\nf(10)";
        let err = eval_in(runtime, source).unwrap_err();
        assert_eq!(err.kind.to_string(), "StackOverflow: maximum call depth of 4 exceeded");
    }

    #[test]
    fn test_conditions_require_bool() {
        let err = eval("if 1 { }").unwrap_err();
        assert_eq!(err.kind.to_string(), "TypeMismatch: expected Bool");
    }

    #[test]
    fn test_native_callbacks() {
        let source = "[1, 2, 3, 4].filter(|x| => x % 2 == 0).map(|x| => x * x).reduce(0, |a, b| => a + b)";
        assert_eq!(eval_ok(source), Value::Int(4 + 16));
    }

    #[test]
    fn test_undefined_module() {
        let err = eval("import nowhere\nnowhere").unwrap_err();
        assert_eq!(err.kind.name(), "UndefinedModule");
    }

    #[test]
    fn test_registered_module() {
        let runtime = runtime();
        runtime.modules.register("answers", Value::Int(42));
        assert_eq!(eval_in(runtime, "import answers\nanswers + 0").unwrap(), Value::Int(42));
    }
}
