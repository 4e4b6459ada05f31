// src/elab/error.rs
//! Error type for calls against the eLabFTW API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElabError {
    /// The API answered with a status other than 200/201/204.
    #[error("{method} {path} -> {status}: {detail}")]
    Api { method: String, path: String, status: u16, detail: String },

    /// Connection, TLS, timeout or body-read failure.
    #[error("request to eLabFTW failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body was not what the endpoint promises.
    #[error("unexpected response from {path}: {reason}")]
    BadResponse { path: String, reason: String },

    #[error("could not extract the id of the created resource from the API response")]
    MissingId,

    #[error("template '{title}' and fallback template (id {fallback}) were not found")]
    TemplateNotFound { title: String, fallback: u64 },

    #[error("template '{0}' has an empty body")]
    EmptyTemplate(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl ElabError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ElabError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type ElabResult<T> = Result<T, ElabError>;
