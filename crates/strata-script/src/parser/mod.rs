// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Recursive descent parser producing [`crate::ast::Program`] values.

#[allow(clippy::module_inception)]
mod parser;

pub use parser::Parser;
