// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution
//!
//! Identifiers are `/`-separated paths without an extension. Relative
//! identifiers (starting with `.`) resolve against the requiring module's
//! directory; anything else resolves from the root.

use std::fmt;

/// Default document location used when no requiring module is given.
pub const DEFAULT_LOCATION: &str = "index.html";

/// A normalized module identifier.
///
/// Never contains `.`, `..`, or empty segments, so two identifiers are
/// equal exactly when they name the same module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Normalizes `path` as an absolute identifier.
    pub fn parse(path: &str) -> Self {
        resolve_from(path, "")
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolves `relative` against the identifier `current`.
pub fn resolve_from(relative: &str, current: &str) -> ModuleId {
    let mut segments: Vec<&str> = Vec::new();

    if relative.starts_with('.') {
        segments.extend(current.split('/'));
        // Drop the file name to get the directory
        segments.pop();
    }

    segments.extend(relative.split('/'));

    let mut normalized: Vec<&str> = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            "" | "." => {}
            // Popping an empty list is a no-op, so `..` at the root vanishes
            ".." => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    ModuleId(normalized.join("/"))
}

/// Resolves identifiers against a configured document location.
#[derive(Debug, Clone)]
pub struct PathResolver {
    location: String,
}

impl PathResolver {
    /// Creates a resolver for the given document location.
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let location = location.strip_prefix('/').unwrap_or(&location).to_string();
        Self { location }
    }

    /// The document location, without its leading `/`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Resolves `relative` against `current`, or against the document
    /// location when no current module is given.
    pub fn resolve(&self, relative: &str, current: Option<&str>) -> ModuleId {
        resolve_from(relative, current.unwrap_or(&self.location))
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling() {
        assert_eq!(resolve_from("./a", "x/y.js").as_str(), "x/a");
    }

    #[test]
    fn test_parent() {
        assert_eq!(resolve_from("../a", "x/y/z.js").as_str(), "x/a");
    }

    #[test]
    fn test_parent_above_root_is_dropped() {
        assert_eq!(resolve_from("../a", "y.js").as_str(), "a");
        assert_eq!(resolve_from("../../../a", "x/y").as_str(), "a");
    }

    #[test]
    fn test_absolute_ignores_current() {
        assert_eq!(resolve_from("/abs/a", "x/y/z").as_str(), "abs/a");
        assert_eq!(resolve_from("lib/util", "x/y/z").as_str(), "lib/util");
    }

    #[test]
    fn test_empty_and_dot_segments() {
        assert_eq!(resolve_from("./a//b/./c", "x/y").as_str(), "x/a/b/c");
        assert_eq!(resolve_from("a/../b", "").as_str(), "b");
    }

    #[test]
    fn test_resolver_uses_location_by_default() {
        let resolver = PathResolver::new("/app/index.html");
        assert_eq!(resolver.location(), "app/index.html");
        assert_eq!(resolver.resolve("./main", None).as_str(), "app/main");
        assert_eq!(resolver.resolve("/abs/a", None).as_str(), "abs/a");
        assert_eq!(resolver.resolve("./b", Some("lib/a")).as_str(), "lib/b");
    }

    #[test]
    fn test_default_location_is_root() {
        let resolver = PathResolver::default();
        assert_eq!(resolver.resolve("./module", None).as_str(), "module");
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(ModuleId::parse("/a/./b/../c"), ModuleId::parse("a/c"));
    }
}
