// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Golem runtime types.
//!
//! ## Structure
//!
//! - `value` - The `Value` enum and variable cells (`Ref`)
//! - `collections` - Ordered dicts and sets, integer ranges
//! - `structure` - Struct instances and module contents
//! - `function` - Closures and native functions
//! - `iterator` - Iteration over iterable values
//! - `methods` - Intrinsic methods of the built-in types

pub mod collections;
pub mod function;
pub mod iterator;
pub mod methods;
pub mod structure;
pub mod value;

pub use collections::{Dict, RangeValue, Set};
pub use function::{BytecodeFunc, Func, NativeFn, NativeFunc};
pub use iterator::Iter;
pub use structure::{Field, FieldRead, FieldWrite, Struct};
pub use value::{new_ref, HashKey, Ref, Value};
