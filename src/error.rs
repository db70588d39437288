//! Error types for media-dl
//!
//! This module provides the error taxonomy for the acquisition pipeline:
//! - Resolver errors (no acceptable variant, malformed manifest, fetch failures)
//! - Account errors (access denied during preflight, every account exhausted)
//! - Path and transfer errors raised while writing an item to disk
//! - Context information (item id, account name, path) for diagnosis

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Per-item errors are caught at the worker boundary and turned into a status row;
/// only [`Error::NoWorkingAccounts`] and setup failures abort a whole batch.
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest held no variant the resolver could accept
    #[error("no acceptable variant: {reason}")]
    NoVariant {
        /// Which selection came up empty (e.g., "music video audio")
        reason: String,
    },

    /// Manifest document was malformed or not a master playlist
    #[error("manifest parse failure: {0}")]
    ParseFailure(String),

    /// Manifest or collection could not be retrieved
    #[error("fetch failure: {0}")]
    FetchFailure(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Account lacks entitlement for the probed content
    #[error("account {account} cannot access content: {reason}")]
    AccessDenied {
        /// Display name of the rejected account
        account: String,
        /// Underlying probe failure
        reason: String,
    },

    /// Preflight found no account able to access the collection
    #[error("no working account can access collection {collection_id}, batch aborted")]
    NoWorkingAccounts {
        /// The collection that every account failed to probe
        collection_id: String,
    },

    /// Every working account failed for an item after retries
    #[error("all {accounts} available accounts failed for item {item_id}: {last}")]
    AllAccountsExhausted {
        /// The item that could not be acquired
        item_id: String,
        /// Number of accounts tried
        accounts: usize,
        /// Last error observed on the last account
        last: Box<Error>,
    },

    /// The path deriver could not fit the path within the limit
    ///
    /// Non-fatal: the best-effort path is still used.
    #[error("path {path} exceeds {max_len} characters after shortening")]
    PathUnshortenable {
        /// Best-effort path that still overflows
        path: PathBuf,
        /// Configured maximum length
        max_len: usize,
    },

    /// Delegated transfer or decryption failed
    #[error("transfer failed: {0}")]
    TransferFailure(String),

    /// Protected content requested without a media user token
    #[error("account {account} has no media user token for protected content")]
    MissingMediaToken {
        /// Display name of the account lacking the token
        account: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "accounts")
        key: Option<String>,
    },

    /// Catalog URL or track selection could not be understood
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// The innermost error, looking through [`Error::AllAccountsExhausted`]
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::AllAccountsExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}
