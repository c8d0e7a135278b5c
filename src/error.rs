//! Error types.
//!
//! `ConfigurationError` is the only thing key enumeration ever raises; it is
//! fatal for the root being enumerated. `SchemaError` covers loading a type
//! graph document into a [`crate::ir::Schema`].
use std::fmt;
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// SOURCE LOCATIONS
// ————————————————————————————————————————————————————————————————————————————

/// Where a declaration came from in the IDL source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} in {}", self.line, self.file)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONFIGURATION ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// A key annotation that cannot be honored.
///
/// Renders as `Error on line <L> in <file>: <message>` when the offending
/// declaration has a known location, otherwise as the bare message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render(.location.as_ref(), .message))]
pub struct ConfigurationError {
    pub location: Option<Location>,
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { location: None, message: message.into() }
    }

    pub fn at(location: Option<Location>, message: impl Into<String>) -> Self {
        Self { location, message: message.into() }
    }
}

fn render(location: Option<&Location>, message: &str) -> String {
    match location {
        Some(loc) => format!("Error on line {} in {}: {message}", loc.line, loc.file),
        None => message.to_string(),
    }
}

pub(crate) const FIELD_WITHOUT_KEYS: &str =
    "field is marked as key, but does not contain any keys.";
pub(crate) const MULTIDIMENSIONAL_ARRAY: &str =
    "using multidimensional arrays as keys is unsupported.";
pub(crate) const ARRAY_WITHOUT_KEYS: &str =
    "array type is marked as key, but its base type does not contain any keys.";
pub(crate) const UNKEYED_DISCRIMINATOR: &str =
    "union type is marked as key, but its discriminator isn't.";
pub(crate) const RECURSIVE_KEY: &str =
    "field is marked as key, but its type contains itself through key members.";
pub(crate) const INVALID_PATH: &str =
    "cannot render path for an invalid enumerator position";

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA LOADING ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed document; `path` is the JSON path of the offending node.
    #[error("at JSON path {path} → {message}")]
    Json { path: String, message: String },

    #[error("JSON pointer {0} does not select anything")]
    PointerMiss(String),

    #[error("unknown type `{name}` referenced from `{context}`")]
    UnknownType { name: String, context: String },

    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),

    #[error("`{0}` is not a valid identifier")]
    BadIdentifier(String),

    #[error("array `{0}` declares no dimensions")]
    EmptyDimensions(String),

    #[error("alias chain starting at `{0}` never reaches a concrete type")]
    AliasCycle(String),

    /// Key member `field` of `ty` leads back to a type it is nested in.
    #[error("key member `{ty}.{field}` contains its own type")]
    RecursiveKey { ty: String, field: String },
}
