// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Transports deliver module source text by path.
//!
//! - [`MemoryTransport`] serves fixtures held in memory
//! - [`FsTransport`] serves files under a root directory
//! - [`HttpTransport`] issues GET requests against a base URL

mod fs;
mod http;
mod memory;

pub use fs::FsTransport;
pub use http::{DEFAULT_TIMEOUT_SECS, HttpTransport};
pub use memory::MemoryTransport;

use async_trait::async_trait;
use thiserror::Error;

/// A failed fetch.
///
/// `status` is the HTTP-style status code; `0` means the request never
/// produced a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch {path}: {status} {status_text}")]
pub struct FetchError {
    /// The path that was requested
    pub path: String,
    /// Status code, 0 for transport-level failures
    pub status: u16,
    /// Human-readable status
    pub status_text: String,
}

impl FetchError {
    /// Creates a fetch error.
    pub fn new(path: impl Into<String>, status: u16, status_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            status_text: status_text.into(),
        }
    }

    /// A 404 for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(path, 404, "Not Found")
    }
}

/// Fetches module source text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the text at `path` (always starting with `/`).
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError>;
}
