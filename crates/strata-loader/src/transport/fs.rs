// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Filesystem transport.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{FetchError, Transport};

/// Serves files under a root directory, like a static file server.
#[derive(Debug, Clone)]
pub struct FsTransport {
    root: PathBuf,
}

impl FsTransport {
    /// Creates a transport rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory files are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path onto the root, ignoring `.`/`..` segments so
    /// requests cannot escape it.
    fn file_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !matches!(*segment, "" | "." | ".."))
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }
}

#[async_trait]
impl Transport for FsTransport {
    #[instrument(skip(self))]
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let file = self.file_path(path);
        debug!("Reading {}", file.display());

        tokio::fs::read_to_string(&file).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => FetchError::not_found(path),
            _ => FetchError::new(path, 500, err.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_stays_under_root() {
        let transport = FsTransport::new("/srv/app");
        assert_eq!(
            transport.file_path("/lib/a.js"),
            PathBuf::from("/srv/app/lib/a.js")
        );
        assert_eq!(
            transport.file_path("/../../etc/passwd"),
            PathBuf::from("/srv/app/etc/passwd")
        );
    }

    #[tokio::test]
    async fn test_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/a.js"), "module.exports = 1").unwrap();

        let transport = FsTransport::new(dir.path());
        assert_eq!(
            transport.fetch_text("/lib/a.js").await.unwrap(),
            "module.exports = 1"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FsTransport::new(dir.path());
        let err = transport.fetch_text("/nope.js").await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.path, "/nope.js");
    }

    #[tokio::test]
    async fn test_directory_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub.js")).unwrap();
        let transport = FsTransport::new(dir.path());
        let err = transport.fetch_text("/sub.js").await.unwrap_err();
        assert_eq!(err.status, 500);
    }
}
