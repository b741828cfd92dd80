// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static discovery of `require('...')` calls in module source.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// `require ( 'x' )` or `require ( "x" )` with a non-empty, single-line literal.
static REQUIRE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\s*\(\s*(?:'([^'\n]+?)'|"([^"\n]+?)")\s*\)"#)
        .expect("require pattern is valid")
});

/// Returns every required literal in order of textual occurrence.
///
/// Matching is purely textual: calls inside comments, strings, or dead code
/// are reported too.
pub fn scan_requires(content: &str) -> Vec<String> {
    REQUIRE_CALL
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|literal| literal.as_str().to_string())
        .collect()
}

/// Like [`scan_requires`], keeping only the first occurrence of each literal.
pub fn unique_requires(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    scan_requires(content)
        .into_iter()
        .filter(|literal| seen.insert(literal.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_quote_styles() {
        assert_eq!(
            scan_requires(r#"require("a"); require('b')"#),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_whitespace_inside_call() {
        assert_eq!(
            scan_requires("var x = require (\n  './x'  \n);"),
            vec!["./x"]
        );
    }

    #[test]
    fn test_mismatched_quotes_are_ignored() {
        assert!(scan_requires(r#"require('a")"#).is_empty());
        assert!(scan_requires("require('')").is_empty());
        assert!(scan_requires("require(name)").is_empty());
    }

    #[test]
    fn test_multiline_literal_is_ignored() {
        assert!(scan_requires("require('a\nb')").is_empty());
    }

    #[test]
    fn test_dead_code_is_still_reported() {
        let src = "if (false) { require('./never') } // require('./commented')";
        assert_eq!(scan_requires(src), vec!["./never", "./commented"]);
    }

    #[test]
    fn test_duplicates() {
        let src = "require('./a'); require('./b'); require(\"./a\")";
        assert_eq!(scan_requires(src), vec!["./a", "./b", "./a"]);
        assert_eq!(unique_requires(src), vec!["./a", "./b"]);
    }
}
