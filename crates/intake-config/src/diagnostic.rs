// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Turns figment extraction failures into miette reports that point at the
//! offending key in the TOML file and, for misspelled keys, propose the
//! closest accepted key by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity a candidate key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem found while loading configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(intake::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Keys the enclosing section accepts, comma separated.
        valid_keys: String,
        #[label("not accepted in this section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(intake::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(intake::config::missing_key),
        help("set `{key}` in intake.toml or through an INTAKE_* variable")
    )]
    MissingKey { key: String },

    /// The file parsed but a value is out of range or inconsistent.
    #[error("validation error: {message}")]
    #[diagnostic(code(intake::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(intake::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let listing = format!("accepted keys: {valid_keys}");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {listing}"),
        None => listing,
    }
}

/// Split a figment error into one diagnostic per underlying problem.
///
/// `toml_sources` holds `(path, content)` pairs for every file that took
/// part in the merge, so spans can be attached.
pub fn figment_to_config_errors(
    err: FigmentError,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &FigmentError, toml_sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(field, accepted) => {
            let (span, src) = locate(error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, accepted),
                valid_keys: accepted.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: qualified(error, field),
        },
        Kind::InvalidType(actual, expected) => {
            let key = dotted_path(error);
            let (span, src) = match error.path.last() {
                Some(leaf) => locate(error, leaf, toml_sources),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key,
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted_path(error: &FigmentError) -> String {
    error.path.join(".")
}

fn qualified(error: &FigmentError, field: &str) -> String {
    if error.path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", dotted_path(error))
    }
}

/// Attach a span for `key` if the error can be traced back to a known file.
fn locate(
    error: &FigmentError,
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| s.file_path())
        .map(|p| p.display().to_string());

    // Inline strings carry no path; a lone source is unambiguous.
    let source = match (file, toml_sources) {
        (Some(file), _) => toml_sources.iter().find(|(p, _)| *p == file),
        (None, [only]) => Some(only),
        (None, _) => None,
    };
    let Some((path, content)) = source else {
        return (None, None);
    };

    // For unknown fields the error path names the enclosing section; for
    // type errors it ends with the key itself.
    let section = match error.path.split_last() {
        Some((leaf, parent)) if leaf == key => parent,
        _ => error.path.as_slice(),
    };

    match find_key_offset(content, section, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside the `[section]` table of `content`.
///
/// With an empty `path` the key is looked up among the top-level entries.
/// The search stops at the next table header.
pub fn find_key_offset(content: &str, path: &[String], key: &str) -> Option<usize> {
    let mut in_section = path.is_empty();
    let wanted = path.join(".");
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let body = line.trim_start();
        let indent = line.len() - body.len();

        if let Some(header) = body.strip_prefix('[') {
            let name = header.split(']').next().unwrap_or_default().trim();
            in_section = name == wanted;
            continue;
        }
        if !in_section {
            continue;
        }

        let is_key = body
            .strip_prefix(key)
            .is_some_and(|rest| rest.trim_start().starts_with('='));
        if is_key {
            return Some(start + indent);
        }
    }

    None
}

/// Closest accepted key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr as a miette graphical report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
