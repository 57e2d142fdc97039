//! # Error Handling
//!
//! This module defines the centralized error type for the `repolish`
//! library. It uses `thiserror` to derive a single `Error` enum covering every
//! failure mode of the provider orchestrator, the text merge engine, the
//! configuration layer and the hydration pipeline.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries the context needed to
//!   locate the problem (provider id, operation name, schema name, pattern
//!   name) and, where useful, a `hint` rendered on its own line.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants fall into a few families:
//!
//! - Contract failures raised while loading or evaluating providers
//!   (`Signature`, `ContractViolation`, `Validation`, `Runtime`, `Provider`).
//! - Malformed marker patterns in template text (`Pattern`).
//! - Configuration, path and filesystem problems.
//! - Wrapped errors from `std::io`, `serde_yaml`, `serde_json` and `walkdir`.
//!
//! Absence conditions (no local match, unresolved recipient, missing provider
//! location) are never errors; they are logged and treated as "no
//! contribution".

use thiserror::Error;

fn render_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// Main error type for repolish operations
#[derive(Error, Debug)]
pub enum Error {
    /// A provider operation was declared with an unsupported number of
    /// parameters.
    #[error("Signature error in provider {provider}: {operation} takes {found} argument(s), expected {expected}")]
    Signature {
        provider: String,
        operation: String,
        expected: String,
        found: usize,
    },

    /// A provider returned (or exposed) a value of the wrong shape.
    #[error("Contract violation in provider {provider}: {message}")]
    ContractViolation { provider: String, message: String },

    /// An input payload did not conform to the recipient's inputs schema.
    #[error("Validation error for schema {schema}: {message}")]
    Validation { schema: String, message: String },

    /// A marker pattern declared in template text failed to compile.
    #[error("Pattern error in {kind}[{name}]: {message}")]
    Pattern {
        kind: String,
        name: String,
        message: String,
    },

    /// A provider failed a runtime requirement (for example strict mode
    /// demanding explicit file mappings).
    #[error("Runtime error in provider {provider}: {message}{}", render_hint(hint))]
    Runtime {
        provider: String,
        message: String,
        /// Optional hint for how to resolve the problem
        hint: Option<String>,
    },

    /// Provider code itself reported a failure; propagated unmodified.
    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// An error occurred while parsing the `repolish.yaml` configuration file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", render_hint(hint))]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred with an in-memory filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An error occurred with a path-related operation.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// A `post_process` command could not be parsed, started or exited
    /// with a failure status.
    #[error("Post-process command '{command}' failed: {message}")]
    PostProcess { command: String, message: String },

    /// A provider's link command failed or produced unusable output.
    #[error("Link failed for provider {provider}: {message}")]
    Link { provider: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON conversion error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walkdir(#[from] walkdir::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
