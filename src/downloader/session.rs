//! Whole-batch reruns until a clean pass
//!
//! A session runs a list of batch requests in order. When a pass ends with any
//! failure the operator is asked whether to go again; the completion ledger is
//! shared across passes, so a rerun only touches what is still missing.

use super::context::CompletionLedger;
use super::{BatchRequest, Downloader};
use crate::types::{BatchReport, Counters};
use async_trait::async_trait;
use std::sync::Arc;

/// Operator decision between passes
#[async_trait]
pub trait Acknowledge: Send + Sync {
    /// Whether to rerun after pass `pass` (1-based) ended with `failed` failures
    async fn confirm_retry(&self, pass: usize, failed: usize) -> bool;
}

/// Rerun automatically until `max_passes` passes have been made
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryUpTo {
    /// Total passes allowed, including the first
    pub max_passes: usize,
}

#[async_trait]
impl Acknowledge for RetryUpTo {
    async fn confirm_retry(&self, pass: usize, _failed: usize) -> bool {
        pass < self.max_passes
    }
}

/// Outcome of a session
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionReport {
    /// Passes made
    pub passes: usize,
    /// Batch reports of the last pass, one per request that got past setup
    pub reports: Vec<BatchReport>,
    /// Counters of the last pass summed over its batches
    pub totals: Counters,
    /// Failures of the last pass, batch-fatal errors included
    pub failures: usize,
}

impl SessionReport {
    /// Whether the last pass finished without failures
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Batch list runner with a ledger shared across passes
pub struct Session {
    downloader: Downloader,
    ledger: Arc<CompletionLedger>,
}

impl Session {
    /// Session with a fresh ledger
    pub fn new(downloader: Downloader) -> Self {
        Self::with_ledger(downloader, Arc::new(CompletionLedger::new()))
    }

    /// Session reusing `ledger`
    pub fn with_ledger(downloader: Downloader, ledger: Arc<CompletionLedger>) -> Self {
        Self { downloader, ledger }
    }

    /// Ledger shared by every pass
    pub fn ledger(&self) -> &Arc<CompletionLedger> {
        &self.ledger
    }

    /// Run `requests` until a pass is clean or `ack` declines another one
    ///
    /// The progress table is suspended while `ack` is consulted.
    pub async fn run(&self, requests: &[BatchRequest], ack: &dyn Acknowledge) -> SessionReport {
        let mut pass = 0;
        loop {
            pass += 1;
            let mut report = self.run_pass(requests).await;
            report.passes = pass;
            tracing::info!(
                pass,
                failures = report.failures,
                "Pass finished: {}",
                report.totals.summary_line()
            );
            if report.is_clean() {
                return report;
            }

            let control = self.downloader.render_control();
            control.suspend();
            let again = ack.confirm_retry(pass, report.failures).await;
            control.resume();
            if !again {
                return report;
            }
            tracing::info!(pass = pass + 1, "Retrying failed items");
        }
    }

    async fn run_pass(&self, requests: &[BatchRequest]) -> SessionReport {
        let mut report = SessionReport::default();
        for request in requests {
            match self.downloader.run_batch(request, self.ledger.clone()).await {
                Ok(batch) => {
                    report.totals.absorb(&batch.counters);
                    report.failures += batch.counters.failed;
                    report.reports.push(batch);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        collection_id = %request.collection.id,
                        "Batch failed"
                    );
                    report.failures += 1;
                }
            }
        }
        report
    }
}
