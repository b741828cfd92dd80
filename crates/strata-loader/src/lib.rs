// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # strata-loader
//!
//! A CommonJS module loader that runs synchronous `require()` semantics on
//! top of an asynchronous source transport.
//!
//! Loading an entry module:
//!
//! - fetches its source through a [`Transport`]
//! - scans it for `require('...')` literals
//! - fetches every dependency concurrently, recursively, once per id
//! - runs the entry body; each `require` runs its dependency on first use
//!   and returns that module's `module.exports`
//!
//! Circular requires see the partially built exports of the module that is
//! still running.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_loader::{Loader, MemoryTransport};
//! use strata_script::Value;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> strata_loader::Result<()> {
//! let transport = MemoryTransport::new()
//!     .with_file("/module.js", "module.exports = 1")
//!     .with_file("/main.js", "module.exports = require('./module') + 2");
//! let loader = Loader::new(Arc::new(transport));
//!
//! let exports = loader.use_common_js_module("main").await?;
//! assert_eq!(exports, Some(Value::Number(3.0)));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod module_system;
pub mod transport;

// Re-exports
pub use config::{LoaderConfig, TransportConfig, TransportKind};
pub use error::{LoaderError, Result};
pub use module_system::{Loader, Module, ModuleId, ModuleRegistry, ModuleStatus, PathResolver};
pub use transport::{FetchError, FsTransport, HttpTransport, MemoryTransport, Transport};

/// Version of the strata loader
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
