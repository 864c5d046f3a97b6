/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tokio::time::Instant;

use crate::metrics::TransferMetrics;
use crate::runtime::cancel::Cancellation;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::token_bucket::RateLimiter;
use crate::store::SharedObjectStore;

/// Types for enumerating the objects of a bucket
pub mod list_objects;

/// Single object metadata and content download
pub(crate) mod get_object;

/// Single object content and access control upload
pub(crate) mod put_object;

/// Container for maintaining context required to carry out a single operation.
///
/// The operation deadline, if any, starts counting when the context is created.
#[derive(Debug, Clone)]
pub(crate) struct TransferContext {
    handle: Arc<crate::client::Handle>,
    cancel: Cancellation,
}

impl TransferContext {
    pub(crate) fn new(handle: Arc<crate::client::Handle>) -> Self {
        let config = &handle.config;
        let deadline = config
            .operation_timeout()
            .map(|timeout| Instant::now() + timeout);
        let cancel = Cancellation::new(config.cancellation_token().clone(), deadline);
        Self { handle, cancel }
    }

    /// The store to send requests to
    pub(crate) fn store(&self) -> &SharedObjectStore {
        self.handle.config.store()
    }

    pub(crate) fn bucket(&self) -> &str {
        self.handle.config.bucket()
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        self.handle.config.rate_limiter()
    }

    pub(crate) fn metrics(&self) -> &TransferMetrics {
        &self.handle.metrics
    }

    pub(crate) fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// A retry policy with a fresh budget for this operation
    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.handle.config.retry_config(), self.cancel.clone())
            .with_metrics(self.handle.metrics.clone())
    }

    pub(crate) fn config(&self) -> &crate::Config {
        &self.handle.config
    }
}
