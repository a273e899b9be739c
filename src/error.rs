use std::{io, path::PathBuf};

use thiserror::Error;

/// Reasons a task form is rejected. The messages are shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Task title is required.")]
    MissingTitle,

    #[error("Task description is required.")]
    MissingDescription,

    #[error("Please select a date for the task.")]
    MissingDate,

    #[error("Cannot select past date. Please choose correct date.")]
    PastDate,

    #[error("User is not authenticated.")]
    NotAuthenticated,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No task with id {0}")]
    NotFound(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed task data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email address.")]
    InvalidEmail,

    #[error("Password should be at least {} characters.", crate::auth::MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("Email is already in use.")]
    EmailInUse,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed account data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that reach the binary's entry point.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] Box<dyn std::error::Error + Send + Sync>),
}
