// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader.

use thiserror::Error;

use crate::module_system::ModuleId;
use crate::transport::FetchError;

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Main error type for the loader.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The transport could not deliver a module's source
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A module with this id is already registered
    #[error("Module already registered: {0}")]
    DuplicateModule(ModuleId),

    /// No module with this id is registered
    #[error("Module not found: {0}")]
    NotFound(ModuleId),

    /// The module's source has not been fetched yet
    #[error("Module {0} has not been loaded")]
    NotLoaded(ModuleId),

    /// `require` was called with a literal the scanner never saw
    #[error("Module {module} requires '{specifier}', which was not found when it was analysed")]
    UnknownRequire {
        /// The requiring module
        module: ModuleId,
        /// The literal passed to `require`
        specifier: String,
    },

    /// `require` named a dependency whose source never arrived
    #[error("Module {module} requires '{specifier}', which could not be loaded")]
    UnloadedModule {
        /// The requiring module
        module: ModuleId,
        /// The literal passed to `require`
        specifier: String,
    },

    /// `require` was invoked as a method instead of a plain function
    #[error("require() in {module} must be called as a plain function")]
    InvalidContext {
        /// The requiring module
        module: ModuleId,
    },

    /// A module body failed to parse or threw while running
    #[error("Error in module body: {0}")]
    Script(strata_script::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid base URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client error
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<strata_script::Error> for LoaderError {
    /// Loader errors raised inside `require` cross module bodies as opaque
    /// host errors; unwrap them back to their original variant.
    fn from(err: strata_script::Error) -> Self {
        match err {
            strata_script::Error::Host(inner) => match inner.downcast::<LoaderError>() {
                Ok(loader_error) => *loader_error,
                Err(other) => LoaderError::Script(strata_script::Error::Host(other)),
            },
            other => LoaderError::Script(other),
        }
    }
}

impl From<LoaderError> for strata_script::Error {
    fn from(err: LoaderError) -> Self {
        strata_script::Error::host(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_round_trips_to_original_variant() {
        let original = LoaderError::InvalidContext {
            module: ModuleId::parse("a"),
        };
        let script_error: strata_script::Error = original.into();
        let recovered = LoaderError::from(script_error);
        assert!(matches!(recovered, LoaderError::InvalidContext { module } if module.as_str() == "a"));
    }

    #[test]
    fn test_script_errors_stay_script_errors() {
        let err = LoaderError::from(strata_script::Error::Reference("x is not defined".into()));
        assert_eq!(
            err.to_string(),
            "Error in module body: ReferenceError: x is not defined"
        );
    }
}
