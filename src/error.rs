//! Error types shared by the batch orchestrator and the plugin half.

use std::path::PathBuf;

/// Error type for batch generation and plugin dispatch.
///
/// Every variant is fatal: there is no retry policy and no partial-success
/// mode. A failure anywhere aborts the whole generation pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Startup configuration is unusable (e.g. missing proto root).
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to decode a code generator request from stdin.
    #[error("failed to decode code generator request: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Failed to encode a code generator response to stdout.
    #[error("failed to encode code generator response: {0}")]
    Encode(#[from] prost::EncodeError),

    /// A spawned subprocess exited with a non-zero status.
    #[error("executing: {command}\n{output}")]
    Subprocess {
        /// The full command line that failed.
        command: String,
        /// Combined stdout/stderr of the failed command.
        output: String,
    },

    /// A backend name that no generator implements.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// Code generation failed inside a backend.
    #[error("code generation error: {0}")]
    CodeGen(String),

    /// A staged file fell outside the directory being walked.
    #[error("path {path} is not under {root}")]
    PathNotUnderRoot {
        /// The offending path.
        path: PathBuf,
        /// The root it was expected to live under.
        root: PathBuf,
    },

    /// Filesystem failure while staging or syncing.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Directory walk failure.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Malformed `cargo metadata` output.
    #[error("failed to parse cargo metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
