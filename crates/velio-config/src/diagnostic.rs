// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rich configuration error reporting.
//!
//! Figment deserialization failures are translated into miette diagnostics:
//! unknown keys get a source span into the offending TOML file, the list of
//! accepted keys for the section, and a "did you mean?" suggestion picked by
//! Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A typo must score above this Jaro-Winkler similarity to be suggested.
/// Catches slips like `keywrods` -> `keywords` or `respond_too_all` ->
/// `respond_to_all` without proposing unrelated keys.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, carrying whatever context miette needs to
/// render it with spans and help text.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(velio::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest accepted key, when one scores above the threshold.
        suggestion: Option<String>,
        /// Comma-separated accepted keys for the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(velio::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(velio::config::missing_key),
        help("add `{key} = <value>` to your velio.toml")
    )]
    MissingKey { key: String },

    /// Semantic validation failure (see `validation::validate_config`).
    #[error("validation error: {message}")]
    #[diagnostic(code(velio::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(velio::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(key) => format!("did you mean `{key}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Translates a figment error (which may aggregate several problems) into
/// one [`ConfigError`] per problem.
///
/// `toml_sources` pairs file paths with their contents so unknown-key
/// errors can point into the file the key came from.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| translate(e, toml_sources))
        .collect()
}

fn translate(error: figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, accepted) => {
            let accepted: Vec<&str> = accepted.to_vec();
            let (span, src) = span_for_key(&error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, &accepted),
                valid_keys: accepted.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.clone().into_owned(),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: error.path.join("."),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.to_string(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Resolves the span of an offending key inside the TOML file figment
/// attributes the error to. Returns `(None, None)` when the file is not
/// among the collected sources or the key cannot be located.
fn span_for_key(
    error: &figment::Error,
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let attributed = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let Some(path) = attributed else {
        return (None, None);
    };
    let Some((_, content)) = toml_sources.iter().find(|(p, _)| *p == path) else {
        return (None, None);
    };

    let section = error.path.first().map(String::as_str);
    match locate_key(content, section, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` at the start of a line within `section` (or before
/// the first section header when `section` is `None`).
fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut in_section = section.is_none();
    let mut offset = 0;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.trim_start_matches('[').trim_end().trim_end_matches(']');
            in_section = section == Some(name);
        } else if in_section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len() + 1;
    }

    None
}

/// Best fuzzy match for `unknown` among `candidates`, if any clears the
/// similarity threshold.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Renders each error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_the_closest_key() {
        let valid = &["keywords", "respond_to_all", "system_prompt"];
        assert_eq!(suggest_key("keywrods", valid), Some("keywords".to_string()));
        assert_eq!(
            suggest_key("respond_too_all", valid),
            Some("respond_to_all".to_string())
        );
    }

    #[test]
    fn distant_typos_get_no_suggestion() {
        let valid = &["keywords", "respond_to_all"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn locates_a_key_inside_its_section() {
        let content = "[agent]\nname = \"velio\"\n\n[assistant]\nkeywrods = [\"prix\"]\n";
        let offset = locate_key(content, Some("assistant"), "keywrods").unwrap();
        assert_eq!(&content[offset..offset + 8], "keywrods");
    }

    #[test]
    fn does_not_match_a_key_from_another_section() {
        let content = "[agent]\nname = \"velio\"\n";
        assert!(locate_key(content, Some("assistant"), "name").is_none());
    }

    #[test]
    fn locates_top_level_keys_before_the_first_header() {
        let content = "stray = 1\n[agent]\nname = \"velio\"\n";
        assert_eq!(locate_key(content, None, "stray"), Some(0));
        assert!(locate_key(content, None, "name").is_none());
    }
}
