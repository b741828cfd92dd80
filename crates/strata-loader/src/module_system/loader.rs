// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - the public entry point

use std::sync::Arc;

use strata_script::Value;
use tracing::{debug, error, instrument};

use super::module::LoadContext;
use super::registry::ModuleRegistry;
use super::resolver::{DEFAULT_LOCATION, PathResolver};
use crate::config::{DEFAULT_EXTENSION, LoaderConfig};
use crate::error::Result;
use crate::transport::Transport;

/// Loads entry modules and everything they require.
///
/// Each loader owns its registry, so separate loaders never share modules.
pub struct Loader {
    registry: Arc<ModuleRegistry>,
    transport: Arc<dyn Transport>,
    resolver: PathResolver,
    extension: Arc<str>,
}

impl Loader {
    /// Create a loader over `transport` with default settings
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: Arc::new(ModuleRegistry::new()),
            transport,
            resolver: PathResolver::new(DEFAULT_LOCATION),
            extension: Arc::from(DEFAULT_EXTENSION),
        }
    }

    /// Create a loader from configuration, building its transport
    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        let transport = config.build_transport()?;
        Ok(Self::new(transport)
            .with_location(&config.location)
            .with_extension(&config.extension))
    }

    /// Set the document location entry ids resolve against
    pub fn with_location(mut self, location: &str) -> Self {
        self.resolver = PathResolver::new(location);
        self
    }

    /// Set the module file extension
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Arc::from(extension);
        self
    }

    /// The module registry
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The path resolver
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn context(&self) -> LoadContext {
        LoadContext {
            registry: Arc::clone(&self.registry),
            transport: Arc::clone(&self.transport),
            extension: Arc::clone(&self.extension),
        }
    }

    /// Load, link and run `main`, returning its exports.
    ///
    /// A failed fetch of `main` itself is logged and yields `Ok(None)`.
    /// Errors raised while running module bodies are returned as `Err`.
    /// Modules already in the registry are reused without refetching.
    #[instrument(skip(self))]
    pub async fn use_common_js_module(&self, main: &str) -> Result<Option<Value>> {
        let id = self.resolver.resolve(main, None);
        let (module, created) = self.registry.get_or_create(id.clone());
        if !created {
            debug!(module = %id, "reusing registered module");
        }

        if !module.is_loaded()
            && let Err(err) = module.load(self.transport.as_ref(), &self.extension).await
        {
            error!(module = %id, "{}", err);
            return Ok(None);
        }

        module.analyse()?;
        module.load_requires(&self.context()).await;

        if !module.has_record() {
            module.run()?;
        }

        Ok(module.exports())
    }

    /// Callback form of [`Loader::use_common_js_module`].
    ///
    /// `callback` runs exactly once when loading completes, with `None` if
    /// `main` could not be fetched. It is not called when a module body
    /// fails; that error is returned instead.
    pub async fn use_common_js_module_with<F>(&self, main: &str, callback: F) -> Result<()>
    where
        F: FnOnce(Option<Value>),
    {
        let exports = self.use_common_js_module(main).await?;
        callback(exports);
        Ok(())
    }

    /// Forget every module so later loads fetch again
    pub fn clear_cache(&self) {
        debug!(modules = self.registry.len(), "clearing module registry");
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn loader(transport: MemoryTransport) -> (Loader, Arc<MemoryTransport>) {
        let transport = Arc::new(transport);
        (Loader::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_entry_resolves_against_location() {
        let transport = Arc::new(MemoryTransport::new().with_file("/app/main.js", "module.exports = 'hi'"));
        let loader = Loader::new(transport.clone()).with_location("/app/index.html");

        let exports = loader.use_common_js_module("./main").await.unwrap();
        assert_eq!(exports, Some(Value::from("hi")));
        assert_eq!(transport.fetch_count("/app/main.js"), 1);
    }

    #[tokio::test]
    async fn test_custom_extension() {
        let (loader, transport) = loader(MemoryTransport::new().with_file("/a.cjs", "module.exports = 1"));
        let loader = loader.with_extension(".cjs");
        assert_eq!(
            loader.use_common_js_module("a").await.unwrap(),
            Some(Value::Number(1.0))
        );
        assert_eq!(transport.fetch_count("/a.cjs"), 1);
    }

    #[tokio::test]
    async fn test_root_fetch_failure_yields_none() {
        let (loader, _) = loader(MemoryTransport::new());
        assert_eq!(loader.use_common_js_module("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_root_retried_after_failure() {
        let (loader, transport) = loader(MemoryTransport::new());
        assert_eq!(loader.use_common_js_module("late").await.unwrap(), None);

        transport.insert("/late.js", "module.exports = 2");
        assert_eq!(
            loader.use_common_js_module("late").await.unwrap(),
            Some(Value::Number(2.0))
        );
    }

    #[tokio::test]
    async fn test_callback_form() {
        let (loader, _) = loader(MemoryTransport::new().with_file("/a.js", "module.exports = 5"));
        let mut seen = Vec::new();
        loader
            .use_common_js_module_with("a", |exports| seen.push(exports))
            .await
            .unwrap();
        assert_eq!(seen, vec![Some(Value::Number(5.0))]);

        let mut missing = Vec::new();
        loader
            .use_common_js_module_with("nope", |exports| missing.push(exports))
            .await
            .unwrap();
        assert_eq!(missing, vec![None]);
    }

    #[tokio::test]
    async fn test_callback_not_called_on_script_error() {
        let (loader, _) = loader(MemoryTransport::new().with_file("/a.js", "oops()"));
        let mut called = false;
        let result = loader
            .use_common_js_module_with("a", |_| called = true)
            .await;
        assert!(result.is_err());
        assert!(!called);
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "module.exports = 'fs'").unwrap();

        let mut config = LoaderConfig::default();
        config
            .set("transport.root", &dir.path().display().to_string())
            .unwrap();
        let loader = Loader::from_config(&config).unwrap();
        assert_eq!(
            loader.use_common_js_module("main").await.unwrap(),
            Some(Value::from("fs"))
        );
    }
}
