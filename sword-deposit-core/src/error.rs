//! Error taxonomy shared by the deposit workflow and its collaborators.
//!
//! Every failure a run can hit maps to exactly one [`SwordError`] variant, so
//! callers can decide between aborting the run (configuration, discovery,
//! single deposits) and recording the failure and moving on (batch deposits).

use std::io;
use std::path::PathBuf;

pub type Result<T, E = SwordError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SwordError {
    /// Configuration file missing, unreadable, unparsable or lacking a required key.
    #[error("configuration error in {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// The remote service could not be reached or refused to serve the request.
    #[error("unable to connect to SWORD server at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// The server answered, but with something that is not a usable SWORD document.
    #[error("SWORD server protocol violation: {0}")]
    Protocol(String),

    /// The server explicitly rejected the deposit.
    /// `summary` is the server's error description, or the HTTP reason phrase.
    #[error("SWORD server was unable to process the request, received response code {status} ({summary})")]
    Deposit { status: u16, summary: String },

    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("collection index {index} is out of range, {count} collections are available")]
    Selection { index: usize, count: usize },

    #[error("{0}")]
    Usage(String),

    #[error("terminal prompt failed: {0}")]
    Prompt(String),
}

impl SwordError {
    pub fn missing_key(path: impl Into<PathBuf>, key: &str) -> Self {
        SwordError::Config {
            path: path.into(),
            reason: format!("required key `{key}` is missing or empty"),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SwordError::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status carried by a rejected deposit, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SwordError::Deposit { status, .. } => Some(*status),
            _ => None,
        }
    }
}
