// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! In-memory transport for fixtures and tests.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{FetchError, Transport};

/// Serves source text from memory, counting every request.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    files: DashMap<String, String>,
    delays: DashMap<String, Duration>,
    fetch_counts: DashMap<String, usize>,
    /// Paths in the order their fetches completed
    completed: Mutex<Vec<String>>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, builder style.
    pub fn with_file(self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    /// Adds or replaces a file.
    pub fn insert(&self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    /// Removes a file so later fetches of it fail with 404.
    pub fn remove(&self, path: &str) -> Option<String> {
        self.files.remove(path).map(|(_, source)| source)
    }

    /// Delays every fetch of `path` by `delay`.
    pub fn set_delay(&self, path: impl Into<String>, delay: Duration) {
        self.delays.insert(path.into(), delay);
    }

    /// How many times `path` has been requested.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetch_counts.get(path).map(|count| *count).unwrap_or(0)
    }

    /// Total number of requests across all paths.
    pub fn total_fetches(&self) -> usize {
        self.fetch_counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Paths in the order their fetches completed.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        *self.fetch_counts.entry(path.to_string()).or_insert(0) += 1;

        let delay = self.delays.get(path).map(|delay| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .files
            .get(path)
            .map(|source| source.clone())
            .ok_or_else(|| FetchError::not_found(path));
        debug!(path, ok = result.is_ok(), "memory fetch");

        self.completed.lock().push(path.to_string());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_and_counts() {
        let transport = MemoryTransport::new().with_file("/a.js", "module.exports = 1");
        assert_eq!(
            transport.fetch_text("/a.js").await.unwrap(),
            "module.exports = 1"
        );
        transport.fetch_text("/a.js").await.unwrap();
        assert_eq!(transport.fetch_count("/a.js"), 2);
        assert_eq!(transport.total_fetches(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let transport = MemoryTransport::new();
        let err = transport.fetch_text("/missing.js").await.unwrap_err();
        assert_eq!(err, FetchError::not_found("/missing.js"));
        assert_eq!(transport.fetch_count("/missing.js"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_reorder_completion() {
        let transport = MemoryTransport::new()
            .with_file("/slow.js", "")
            .with_file("/fast.js", "");
        transport.set_delay("/slow.js", Duration::from_millis(50));

        let (slow, fast) = tokio::join!(
            transport.fetch_text("/slow.js"),
            transport.fetch_text("/fast.js")
        );
        assert!(slow.is_ok() && fast.is_ok());
        assert_eq!(transport.completion_order(), vec!["/fast.js", "/slow.js"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let transport = MemoryTransport::new().with_file("/a.js", "x");
        assert_eq!(transport.remove("/a.js").as_deref(), Some("x"));
        assert!(transport.fetch_text("/a.js").await.is_err());
    }
}
