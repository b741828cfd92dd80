// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::{FetchError, Transport};
use crate::error::Result;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches module source with GET requests against a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with the given client timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // Without a trailing slash, Url::join would replace the last segment
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("strata/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> std::result::Result<Url, FetchError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| FetchError::new(path, 0, err.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self))]
    async fn fetch_text(&self, path: &str) -> std::result::Result<String, FetchError> {
        let url = self.url_for(path)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::new(path, 0, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                path,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
            ));
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::new(path, 0, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(DEFAULT_TIMEOUT_SECS)).unwrap()
    }

    #[test]
    fn test_urls_keep_base_path() {
        let transport = transport("http://localhost:8080/app");
        assert_eq!(transport.base_url().as_str(), "http://localhost:8080/app/");
        assert_eq!(
            transport.url_for("/lib/a.js").unwrap().as_str(),
            "http://localhost:8080/app/lib/a.js"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpTransport::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, crate::LoaderError::Url(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_status_zero() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = transport.fetch_text("/a.js").await.unwrap_err();
        assert_eq!(err.status, 0);
        assert_eq!(err.path, "/a.js");
    }
}
