//! Typed failure kinds surfaced by the surveyor and the locator.
//!
//! Operations return [`anyhow::Result`] like the rest of the crate; these
//! variants are wrapped inside it so callers (and tests) can recover the
//! kind with [`anyhow::Error::downcast_ref`].

use std::path::PathBuf;

/// The four fatal error kinds. Every one maps to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum BedrockError {
    /// Bad CLI input: unknown bot alias, malformed build number, missing
    /// source directory.
    #[error("{0}")]
    UserInput(String),

    /// A collaborator (git, CI, build graph) failed. The message is the
    /// collaborator's own, prefixed by the operation that was running.
    #[error("{operation}: {message}")]
    Oracle { operation: String, message: String },

    /// The output file could not be created or written.
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Nothing new failed between the good and bad builds and no site was
    /// supplied on the command line.
    #[error("{0}")]
    EmptyRegression(String),
}

impl BedrockError {
    pub fn user_input(message: impl Into<String>) -> Self {
        BedrockError::UserInput(message.into())
    }

    pub fn oracle(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        BedrockError::Oracle {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Tag a collaborator failure with the operation that was running. Errors
/// that already carry a [`BedrockError`] kind pass through untouched.
pub fn oracle_failure(operation: &str, err: anyhow::Error) -> anyhow::Error {
    if err.downcast_ref::<BedrockError>().is_some() {
        return err;
    }
    BedrockError::oracle(operation, format!("{:#}", err)).into()
}
