//! Per-item retry with account failover
//!
//! An item is tried on one account up to [`RetryPolicy::max_attempts`] times with a
//! fixed pause between attempts. When an account is exhausted the next one in the
//! rotation takes over after [`RetryPolicy::account_pause`]. The rotation starts at
//! an item-specific offset, so items spread their first attempts across accounts.
//!
//! # Example
//!
//! ```no_run
//! use media_dl::retry::{RetryPolicy, run_with_failover};
//! use media_dl::error::Error;
//!
//! # async fn example() {
//! let policy = RetryPolicy::default();
//! let accounts = vec!["us", "jp"];
//! let result = run_with_failover(
//!     &policy,
//!     &accounts,
//!     1,
//!     |account, _attempt| async move { Ok::<_, Error>(account.len()) },
//!     |account, error| async move {
//!         eprintln!("{account} failed: {error}");
//!     },
//! )
//! .await;
//! # let _ = result;
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, transfer resets) should return `true`.
/// Permanent failures (malformed manifest, missing token) should return `false`;
/// the failover loop then skips straight to the next account.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::TransferFailure(_) | Error::FetchFailure(_) => true,
            Error::Network(e) => !e.is_builder() && !e.is_redirect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            // The item may still be reachable from another storefront
            Error::AccessDenied { .. } => false,
            Error::NoVariant { .. }
            | Error::ParseFailure(_)
            | Error::MissingMediaToken { .. }
            | Error::PathUnshortenable { .. }
            | Error::Config { .. }
            | Error::InvalidTarget(_)
            | Error::Serialization(_)
            | Error::NoWorkingAccounts { .. }
            | Error::AllAccountsExhausted { .. } => false,
            Error::Other(_) => false,
        }
    }
}

/// Retry semantics for one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts on one account before rotating
    pub max_attempts: u32,
    /// Pause between attempts on the same account
    pub attempt_delay: Duration,
    /// Pause after an account is exhausted, before the next one starts
    pub account_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_delay: config.attempt_delay,
            account_pause: config.account_pause,
        }
    }
}

impl RetryPolicy {
    /// Account indices in the order they are tried for an item starting at `start`
    pub fn rotation(&self, start: usize, accounts: usize) -> impl Iterator<Item = usize> {
        (0..accounts).map(move |i| (start + i) % accounts)
    }
}

/// Failure of [`run_with_failover`]
#[derive(Debug)]
pub enum FailoverError<E> {
    /// There was no account to try
    NoAccounts,
    /// Every account failed; `last` is the final error observed
    Exhausted {
        /// Number of accounts tried
        accounts: usize,
        /// Last error from the last account
        last: E,
    },
}

/// Run `operation` across `accounts` following `policy`
///
/// `operation` receives the account and the 1-based attempt number on that account.
/// `on_exhausted` fires exactly once for every account that gives up while another
/// account is still left to try, after the account pause has elapsed.
pub async fn run_with_failover<A, T, E, F, Fut, W, WFut>(
    policy: &RetryPolicy,
    accounts: &[A],
    start: usize,
    mut operation: F,
    mut on_exhausted: W,
) -> Result<T, FailoverError<E>>
where
    A: Clone,
    F: FnMut(A, u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    W: FnMut(A, String) -> WFut,
    WFut: Future<Output = ()>,
{
    if accounts.is_empty() {
        return Err(FailoverError::NoAccounts);
    }

    let max_attempts = policy.max_attempts.max(1);
    let order: Vec<usize> = policy.rotation(start, accounts.len()).collect();
    let mut last_error = None;

    for (position, &account_index) in order.iter().enumerate() {
        let account = &accounts[account_index];

        for attempt in 1..=max_attempts {
            match operation(account.clone(), attempt).await {
                Ok(value) => {
                    if attempt > 1 || position > 0 {
                        tracing::info!(
                            account_index,
                            attempt,
                            accounts_tried = position + 1,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::warn!(
                        error = %e,
                        account_index,
                        attempt,
                        max_attempts,
                        retryable,
                        "Attempt failed"
                    );
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                    if attempt < max_attempts {
                        tokio::time::sleep(policy.attempt_delay).await;
                    }
                }
            }
        }

        if position + 1 < order.len() {
            tokio::time::sleep(policy.account_pause).await;
            let message = last_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            on_exhausted(account.clone(), message).await;
        }
    }

    match last_error {
        Some(last) => {
            tracing::error!(
                error = %last,
                accounts = order.len(),
                "All accounts exhausted"
            );
            Err(FailoverError::Exhausted {
                accounts: order.len(),
                last,
            })
        }
        None => Err(FailoverError::NoAccounts),
    }
}
