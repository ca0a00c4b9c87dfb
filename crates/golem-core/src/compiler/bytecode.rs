// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! Every instruction is one opcode byte followed by zero, one or two
//! big-endian `u16` parameters, so instructions are 1, 3 or 5 bytes wide.
//! Jump targets are absolute offsets into the same function's bytecode.

macro_rules! opcodes {
    ($($(#[$doc:meta])* $name:ident = $width:literal,)*) => {
        /// Operation codes for the VM.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$doc])* $name,)*
        }

        impl Opcode {
            const ALL: &'static [Opcode] = &[$(Opcode::$name,)*];

            /// Decodes an opcode byte.
            pub fn from_u8(byte: u8) -> Option<Opcode> {
                Self::ALL.get(byte as usize).copied()
            }

            /// Total instruction width in bytes: 1, 3 or 5.
            pub fn width(self) -> usize {
                match self {
                    $(Opcode::$name => $width,)*
                }
            }

            /// The opcode's name, as shown by the disassembler.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }
        }
    };
}

opcodes! {
    // Stack operations
    /// Discard the top value
    Pop = 1,
    /// Duplicate the top value
    Dup = 1,
    /// Duplicate the top two values, preserving their order
    Dup2 = 1,
    /// Push `null`
    LoadNull = 1,
    /// Push `true`
    LoadTrue = 1,
    /// Push `false`
    LoadFalse = 1,
    /// Push the integer 0
    LoadZero = 1,
    /// Push the integer 1
    LoadOne = 1,
    /// Push the integer -1
    LoadNegOne = 1,
    /// Push constant `[index]`
    LoadConst = 3,
    /// Push builtin `[index]`
    LoadBuiltin = 3,

    // Variables
    /// Push the value of local `[slot]`
    LoadLocal = 3,
    /// Push the value of capture `[slot]`
    LoadCapture = 3,
    /// Pop a value into local `[slot]`
    StoreLocal = 3,
    /// Pop a value into capture `[slot]`
    StoreCapture = 3,

    // Control flow
    /// Jump to `[target]`
    Jump = 3,
    /// Pop a Bool and jump to `[target]` if it is true
    JumpTrue = 3,
    /// Pop a Bool and jump to `[target]` if it is false
    JumpFalse = 3,
    /// Placeholder for `break`, rewritten to `Jump` once the loop is compiled
    Break = 3,
    /// Placeholder for `continue`, rewritten to `Jump` once the loop is compiled
    Continue = 3,

    // Functions
    /// Call the value below `[argc]` arguments
    Invoke = 3,
    /// Like `Invoke`, but run the call on its own thread and push nothing
    Go = 3,
    /// Return the top value from the current frame
    Return = 1,
    /// Return from inside a try construct, running pending `finally` blocks
    TryReturn = 1,
    /// Create a closure of template `[index]` with `[count]` captures. The
    /// captures are given by the `count` instructions that follow.
    NewFunc = 5,
    /// Capture operand: share local `[slot]` of the creating frame
    FuncLocal = 3,
    /// Capture operand: share capture `[slot]` of the creating frame
    FuncCapture = 3,

    // Errors
    /// Throw the top value
    Throw = 1,
    /// Activate error handler `[index]`
    PushTry = 3,
    /// Deactivate the innermost error handler, running its `finally`
    PopTry = 1,

    // Operators
    /// `==`
    Eq = 1,
    /// `!=`
    Ne = 1,
    /// `<`
    Lt = 1,
    /// `<=`
    Lte = 1,
    /// `>`
    Gt = 1,
    /// `>=`
    Gte = 1,
    /// `<=>`
    Cmp = 1,
    /// `+`
    Add = 1,
    /// `-`
    Sub = 1,
    /// `*`
    Mul = 1,
    /// `/`
    Div = 1,
    /// `%`
    Rem = 1,
    /// `&`
    BitAnd = 1,
    /// `|`
    BitOr = 1,
    /// `^`
    BitXor = 1,
    /// `<<`
    LeftShift = 1,
    /// `>>`
    RightShift = 1,
    /// Unary `-`
    Negate = 1,
    /// Unary `~`
    Complement = 1,
    /// Unary `!`
    Not = 1,

    // Fields and indexing
    /// Replace an object with its field named by constant `[name]`
    GetField = 3,
    /// Pop object and value, set field `[name]`, push the value
    SetField = 3,
    /// Pop object and delta, add the delta to field `[name]`, push the old value
    IncField = 3,
    /// Pop object and index, push the element
    GetIndex = 1,
    /// Pop object, index and value, store the element, push the value
    SetIndex = 1,
    /// Pop object, index and delta, add the delta to the element, push the old value
    IncIndex = 1,
    /// Pop object, from and to, push `object[from:to]`
    Slice = 1,
    /// Pop object and from, push `object[from:]`
    SliceFrom = 1,
    /// Pop object and to, push `object[:to]`
    SliceTo = 1,

    // Literals
    /// Build a struct from the values of struct definition `[index]`
    NewStruct = 3,
    /// Build a dict from `[count]` key/value pairs
    NewDict = 3,
    /// Build a list from `[count]` values
    NewList = 3,
    /// Build a set from `[count]` values
    NewSet = 3,
    /// Build a tuple from `[count]` values
    NewTuple = 3,
    /// Check that the top value is a tuple of `[len]` elements
    CheckTuple = 3,

    // Iteration
    /// Replace an iterable with an iterator over it
    NewIter = 1,
    /// Pop an iterator, advance it, push whether it produced a value
    IterNext = 1,
    /// Pop an iterator, push its current value
    IterGet = 1,

    // Modules
    /// Push the module named by constant `[name]`, loading it on first use
    ImportModule = 3,
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte
    pub offset: usize,
    /// The operation
    pub opcode: Opcode,
    /// First parameter, or 0
    pub a: u16,
    /// Second parameter, or 0
    pub b: u16,
}

/// Reads the big-endian `u16` at `offset`.
#[inline]
pub fn read_u16(code: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([code[offset], code[offset + 1]])
}

/// Overwrites the big-endian `u16` at `offset`.
#[inline]
pub fn write_u16(code: &mut [u8], offset: usize, value: u16) {
    code[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Decodes the instruction at `offset`.
///
/// Returns `None` past the end of the code or on a byte that is not an
/// opcode.
pub fn decode(code: &[u8], offset: usize) -> Option<Instruction> {
    let opcode = Opcode::from_u8(*code.get(offset)?)?;
    let width = opcode.width();
    if offset + width > code.len() {
        return None;
    }
    let a = if width >= 3 { read_u16(code, offset + 1) } else { 0 };
    let b = if width == 5 { read_u16(code, offset + 3) } else { 0 };
    Some(Instruction {
        offset,
        opcode,
        a,
        b,
    })
}

/// Iterates over the instructions of `code` in order.
pub fn instructions(code: &[u8]) -> impl Iterator<Item = Instruction> + '_ {
    let mut offset = 0;
    std::iter::from_fn(move || {
        let instr = decode(code, offset)?;
        offset += instr.opcode.width();
        Some(instr)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op as u8, byte);
            }
        }
        assert_eq!(Opcode::from_u8(Opcode::ImportModule as u8), Some(Opcode::ImportModule));
        assert_eq!(Opcode::from_u8(Opcode::ImportModule as u8 + 1), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(Opcode::Pop.width(), 1);
        assert_eq!(Opcode::Jump.width(), 3);
        assert_eq!(Opcode::NewFunc.width(), 5);
        assert_eq!(Opcode::TryReturn.width(), 1);
    }

    #[test]
    fn test_big_endian_params() {
        let code = [Opcode::NewFunc as u8, 0x01, 0x02, 0x00, 0x03];
        let instr = decode(&code, 0).expect("valid instruction");
        assert_eq!(instr.a, 0x0102);
        assert_eq!(instr.b, 3);
    }

    #[test]
    fn test_truncated_instruction() {
        let code = [Opcode::Jump as u8, 0x00];
        assert_eq!(decode(&code, 0), None);
    }

    #[test]
    fn test_instruction_iteration() {
        let code = [
            Opcode::LoadConst as u8,
            0,
            7,
            Opcode::Pop as u8,
            Opcode::Return as u8,
        ];
        let ops: Vec<_> = instructions(&code).map(|i| (i.offset, i.opcode)).collect();
        assert_eq!(
            ops,
            [(0, Opcode::LoadConst), (3, Opcode::Pop), (4, Opcode::Return)]
        );
    }
}
