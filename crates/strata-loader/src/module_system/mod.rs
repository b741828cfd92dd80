// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS module system over an asynchronous transport
//!
//! - `resolver` - identifier normalization
//! - `scanner` - static `require()` discovery
//! - `registry` - id → module records
//! - `module` - the per-module lifecycle
//! - `loader` - the entry point tying them together

mod loader;
mod module;
mod registry;
mod resolver;
mod scanner;

pub use loader::Loader;
pub use module::{LoadContext, Module, ModuleStatus, Require, WeakModule};
pub use registry::ModuleRegistry;
pub use resolver::{DEFAULT_LOCATION, ModuleId, PathResolver, resolve_from};
pub use scanner::{scan_requires, unique_requires};
