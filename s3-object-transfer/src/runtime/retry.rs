/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::time::Duration;

use aws_smithy_types::error::display::DisplayErrorContext;

use crate::config::RetryConfig;
use crate::error::{self, Error};
use crate::metrics::TransferMetrics;
use crate::runtime::cancel::Cancellation;

/// Retries failed requests a bounded number of times with a fixed delay between attempts.
///
/// A failed attempt is classified as:
///
/// * cancellation: the operation was cancelled, its deadline passed, or the error is a
///   cancellation. Returned as is, never retried.
/// * transient: any other error while retries remain. The request is sent again after `interval`.
/// * exhausted: any other error once every retry has been used. Returned as
///   [`ErrorKind::RetriesExhausted`](crate::error::ErrorKind::RetriesExhausted).
///
/// The retry budget belongs to the policy value, not to a single call. Reusing one policy for
/// several requests (e.g. every page of a listing) makes them share the budget.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    interval: Duration,
    retries_used: u32,
    cancel: Cancellation,
    metrics: TransferMetrics,
}

impl RetryPolicy {
    pub(crate) fn new(config: &RetryConfig, cancel: impl Into<Cancellation>) -> Self {
        Self {
            max_retries: config.max_retries(),
            interval: config.interval(),
            retries_used: 0,
            cancel: cancel.into(),
            metrics: TransferMetrics::default(),
        }
    }

    pub(crate) fn with_metrics(mut self, metrics: TransferMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Number of retries left in the budget
    #[cfg(test)]
    pub(crate) fn remaining(&self) -> u32 {
        self.max_retries - self.retries_used
    }

    /// Run `request` until it succeeds, is cancelled, or the retry budget is spent.
    ///
    /// `request` is invoked once per attempt and must perform the whole remote call, including
    /// reading any response body, so a failed attempt is repeated from scratch.
    pub(crate) async fn call<T, F, Fut>(
        &mut self,
        operation: &'static str,
        mut request: F,
    ) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempts: u32 = 0;
        loop {
            self.cancel.check()?;

            attempts += 1;
            let result = tokio::select! {
                biased;
                err = self.cancel.cancelled() => Err(err),
                result = request() => result,
            };

            let err = match result {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };

            if err.is_cancellation() {
                tracing::debug!(operation, attempts, "request cancelled");
                return Err(err);
            }

            if self.retries_used >= self.max_retries {
                tracing::error!(
                    operation,
                    attempts,
                    "request failed, no retries left: {}",
                    DisplayErrorContext(&err)
                );
                return Err(error::retries_exhausted(attempts, err));
            }

            self.retries_used += 1;
            self.metrics.increment_retries();
            tracing::warn!(
                operation,
                attempts,
                retry = self.retries_used,
                max_retries = self.max_retries,
                "request failed, retrying in {:?}: {}",
                self.interval,
                DisplayErrorContext(&err)
            );

            tokio::select! {
                biased;
                err = self.cancel.cancelled() => return Err(err),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
