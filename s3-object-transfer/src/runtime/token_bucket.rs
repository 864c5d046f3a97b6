/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::metrics::unit::ByteCount;
use crate::metrics::Throughput;

/// Smallest slice of bytes a transfer is split into when rate limited.
const MIN_CHUNK_SIZE: u64 = 1024;

/// Largest slice of bytes a transfer is split into when rate limited.
const MAX_CHUNK_SIZE: u64 = 64 * 1024;

/// Bounds the aggregate number of bytes per second read and written by a client.
///
/// Every object body downloaded or uploaded draws from the same bucket. The bucket starts full
/// and refills continuously at the configured rate up to its capacity (the burst size). A
/// transfer that asks for more tokens than are available is delayed until the deficit has been
/// refilled, so over any window of `W` seconds at most `capacity + rate * W` bytes pass.
///
/// `RateLimiter` is internally reference-counted and can be freely cloned; clones share tokens.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    bucket: Option<Arc<Mutex<TokenBucket>>>,
}

#[derive(Debug)]
struct TokenBucket {
    bytes_per_sec: f64,
    capacity: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.bytes_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take `amount` tokens, possibly going into debt, and return how long the caller has to
    /// wait before the tokens are actually available.
    fn reserve(&mut self, now: Instant, amount: u64) -> Duration {
        self.refill(now);
        self.tokens -= amount as f64;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.bytes_per_sec)
        }
    }
}

impl RateLimiter {
    /// A limiter that never delays a transfer
    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    /// Limit throughput to `limit` with a burst of one second worth of bytes.
    ///
    /// Limits below one byte per second are raised to one byte per second.
    pub fn new(limit: Throughput) -> Self {
        let bytes_per_sec = limit.as_bytes_per_sec().max(1.0);
        Self::with_burst(limit, bytes_per_sec as u64)
    }

    /// Limit throughput to `limit` allowing bursts of up to `burst` bytes.
    pub fn with_burst(limit: Throughput, burst: u64) -> Self {
        let bytes_per_sec = limit.as_bytes_per_sec().max(1.0);
        let capacity = burst.max(1) as f64;
        tracing::debug!(
            "limiting transfers to {limit} with bursts of up to {}",
            ByteCount(capacity)
        );
        let bucket = TokenBucket {
            bytes_per_sec,
            capacity,
            tokens: capacity,
            last_refill: Instant::now(),
        };
        Self {
            bucket: Some(Arc::new(Mutex::new(bucket))),
        }
    }

    /// Returns true if this limiter never delays transfers
    pub fn is_unlimited(&self) -> bool {
        self.bucket.is_none()
    }

    /// The configured limit, if any
    pub fn limit(&self) -> Option<Throughput> {
        self.bucket.as_ref().map(|bucket| {
            let bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            Throughput::new_bytes_per_sec(bucket.bytes_per_sec as u64)
        })
    }

    /// Size of the slices a body is split into before drawing tokens: the burst capacity,
    /// bounded to `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]`.
    pub(crate) fn chunk_size(&self) -> usize {
        let size = match &self.bucket {
            None => MAX_CHUNK_SIZE,
            Some(bucket) => {
                let bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
                (bucket.capacity as u64).clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
            }
        };
        size as usize
    }

    /// Reserve `bytes` tokens and return how long to wait before using them.
    pub(crate) fn reserve(&self, bytes: u64) -> Duration {
        match &self.bucket {
            None => Duration::ZERO,
            Some(bucket) => {
                let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
                bucket.reserve(Instant::now(), bytes)
            }
        }
    }

    /// Wait until `bytes` can be transferred without exceeding the limit.
    pub async fn acquire(&self, bytes: u64) {
        let delay = self.reserve(bytes);
        if !delay.is_zero() {
            tracing::trace!("rate limited: waiting {delay:?} for {bytes} bytes");
            tokio::time::sleep(delay).await;
        }
    }
}
