/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};
use crate::metrics::Throughput;
use crate::runtime::token_bucket::RateLimiter;
use crate::store::{ObjectStore, SharedObjectStore};

/// Environment-backed configuration loading
pub mod loader;

/// Default number of keys requested per listing page
pub(crate) const DEFAULT_KEYS_PER_REQUEST: i32 = 10;

/// Default number of retries after the first attempt of a request
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between attempts of a request
pub(crate) const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Configuration for a [`Client`](crate::client::Client)
#[derive(Debug, Clone)]
pub struct Config {
    bucket: String,
    prefix: Option<String>,
    keys_per_request: i32,
    retry: RetryConfig,
    rate_limiter: RateLimiter,
    operation_timeout: Option<Duration>,
    cancellation_token: CancellationToken,
    store: SharedObjectStore,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The bucket every operation is sent to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix that listings are restricted to
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Maximum number of keys requested per listing page
    pub fn keys_per_request(&self) -> i32 {
        self.keys_per_request
    }

    /// Retry settings applied to every request
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Rate limiter shared by every body read and written
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Upper bound on the duration of a single operation, including retries
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    /// Token that cancels every in-flight and future operation of the client when fired
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// The object store requests are sent to
    pub fn store(&self) -> &SharedObjectStore {
        &self.store
    }
}

/// How many times a failed request is retried and how long to wait in between.
///
/// A request is attempted at most `max_retries + 1` times. The delay is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    max_retries: u32,
    interval: Duration,
}

impl RetryConfig {
    /// Create a retry configuration
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Never retry a failed request
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Number of retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL)
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    bucket: Option<String>,
    prefix: Option<String>,
    keys_per_request: Option<i32>,
    retry: RetryConfig,
    rate_limiter: RateLimiter,
    operation_timeout: Option<Duration>,
    cancellation_token: Option<CancellationToken>,
    store: Option<SharedObjectStore>,
}

impl Builder {
    /// The bucket every operation is sent to. Required.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Only list keys starting with this prefix
    pub fn prefix(self, prefix: impl Into<String>) -> Self {
        self.set_prefix(Some(prefix.into()))
    }

    /// Only list keys starting with this prefix
    pub fn set_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Maximum number of keys requested per listing page.
    ///
    /// Default is 10. Must be at least one.
    pub fn keys_per_request(mut self, keys: i32) -> Self {
        self.keys_per_request = Some(keys);
        self
    }

    /// Number of retries and delay between attempts for every request.
    ///
    /// Default is 3 retries, 3 seconds apart.
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Cap the aggregate throughput of body reads and writes.
    ///
    /// Default is unlimited.
    pub fn bandwidth_limit(self, limit: Throughput) -> Self {
        self.rate_limiter(RateLimiter::new(limit))
    }

    /// Use an existing rate limiter, e.g. to share one limit between several clients.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// Abandon an operation that has not completed after `timeout`, retries included.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Token used to cancel the client's operations. A fresh token is created if not set.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Set an explicit S3 client to use.
    ///
    /// The client's own retry strategy is disabled; see [`S3ObjectStore`](crate::store::s3::S3ObjectStore).
    pub fn client(mut self, client: aws_sdk_s3::Client) -> Self {
        self.store = Some(SharedObjectStore::from(client));
        self
    }

    /// Send requests to a custom [`ObjectStore`] instead of an S3 client.
    pub fn store(mut self, store: impl ObjectStore + 'static) -> Self {
        self.store = Some(SharedObjectStore::new(store));
        self
    }

    /// Consumes the builder and constructs a [`Config`]
    pub fn build(self) -> Result<Config, Error> {
        let bucket = match self.bucket {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => return Err(error::invalid_input("bucket must be set")),
        };

        let store = self
            .store
            .ok_or_else(|| error::invalid_input("an S3 client or object store must be set"))?;

        let keys_per_request = self.keys_per_request.unwrap_or(DEFAULT_KEYS_PER_REQUEST);
        if keys_per_request < 1 {
            return Err(error::invalid_input(format!(
                "keys_per_request must be at least 1, got {keys_per_request}"
            )));
        }

        Ok(Config {
            bucket,
            prefix: self.prefix,
            keys_per_request,
            retry: self.retry,
            rate_limiter: self.rate_limiter,
            operation_timeout: self.operation_timeout,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            store,
        })
    }
}
