// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime types shared between the interpreter and its host.

pub mod environment;
pub mod function;
pub mod object;
pub mod value;

pub use environment::Environment;
pub use function::{Callable, NativeFunction, ScriptFunction};
pub use object::{Object, ObjectRef};
pub use value::Value;
