/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Units of measurement
pub mod unit {
    use std::fmt;

    /// Binary byte units
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ByteUnit {
        /// 1 byte
        Byte,
        /// 2<sup>10</sup> bytes.
        Kibibyte,
        /// 2<sup>20</sup> bytes.
        Mebibyte,
        /// 2<sup>30</sup> bytes.
        Gibibyte,
    }

    impl ByteUnit {
        /// The number of bytes represented by this unit
        pub const fn as_bytes_u64(&self) -> u64 {
            match self {
                ByteUnit::Byte => 1,
                ByteUnit::Kibibyte => 1 << 10,
                ByteUnit::Mebibyte => 1 << 20,
                ByteUnit::Gibibyte => 1 << 30,
            }
        }

        /// Largest unit that `bytes` amounts to at least one of
        pub(crate) fn for_bytes(bytes: f64) -> ByteUnit {
            [ByteUnit::Gibibyte, ByteUnit::Mebibyte, ByteUnit::Kibibyte]
                .into_iter()
                .find(|unit| bytes >= unit.as_bytes_u64() as f64)
                .unwrap_or(ByteUnit::Byte)
        }

        pub(crate) const fn as_str(&self) -> &'static str {
            match self {
                ByteUnit::Byte => "B",
                ByteUnit::Kibibyte => "KiB",
                ByteUnit::Mebibyte => "MiB",
                ByteUnit::Gibibyte => "GiB",
            }
        }
    }

    /// A byte count rendered in the largest unit it fills, e.g. `1.50 MiB`
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct ByteCount(pub(crate) f64);

    impl fmt::Display for ByteCount {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let unit = ByteUnit::for_bytes(self.0);
            if unit == ByteUnit::Byte {
                return write!(f, "{} B", self.0.round());
            }
            let precision = f.precision().unwrap_or(2);
            let value = self.0 / unit.as_bytes_u64() as f64;
            write!(f, "{value:.precision$} {}", unit.as_str())
        }
    }
}

/// Bytes transferred over some duration, used for bandwidth limits
#[derive(Debug, Clone, Copy)]
pub struct Throughput {
    bytes_transferred: u64,
    elapsed: Duration,
}

impl Throughput {
    /// Create a throughput of `bytes_transferred` bytes over `elapsed`
    pub const fn new(bytes_transferred: u64, elapsed: Duration) -> Throughput {
        Throughput {
            bytes_transferred,
            elapsed,
        }
    }

    /// Create a throughput of `bytes_transferred` bytes per second
    ///
    /// ```
    /// use std::time::Duration;
    /// use s3_object_transfer::metrics::{unit, Throughput};
    /// let bytes_transferred = 5 * unit::ByteUnit::Mebibyte.as_bytes_u64();
    /// assert_eq!(
    ///     Throughput::new(2 * bytes_transferred, Duration::from_secs(2)),
    ///     Throughput::new_bytes_per_sec(bytes_transferred)
    /// );
    /// ```
    pub const fn new_bytes_per_sec(bytes_transferred: u64) -> Throughput {
        Self::new(bytes_transferred, Duration::from_secs(1))
    }

    /// Convert this throughput into bytes / sec
    pub fn as_bytes_per_sec(&self) -> f64 {
        self.bytes_transferred as f64 / self.elapsed.as_secs_f64()
    }
}

impl PartialEq for Throughput {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes_per_sec() == other.as_bytes_per_sec()
    }
}

impl PartialOrd for Throughput {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.as_bytes_per_sec()
            .partial_cmp(&other.as_bytes_per_sec())
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&unit::ByteCount(self.as_bytes_per_sec()), f)?;
        f.write_str("/s")
    }
}

/// A monotonically increasing numeric value.
#[derive(Debug, Clone, Default)]
struct IncreasingCounter {
    value: Arc<AtomicU64>,
}

impl IncreasingCounter {
    fn increment(&self, amount: u64) -> u64 {
        self.value.fetch_add(amount, Ordering::Relaxed) + amount
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters aggregated across every operation issued by a [`Client`](crate::Client)
///
/// Cloning shares the underlying counters.
#[derive(Debug, Clone, Default)]
pub struct TransferMetrics {
    objects_listed: IncreasingCounter,
    pages_listed: IncreasingCounter,
    bytes_downloaded: IncreasingCounter,
    bytes_uploaded: IncreasingCounter,
    retries: IncreasingCounter,
    failed_operations: IncreasingCounter,
}

impl TransferMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_objects_listed(&self, count: u64) {
        self.objects_listed.increment(count);
        self.pages_listed.increment(1);
    }

    pub(crate) fn add_bytes_downloaded(&self, bytes: u64) {
        self.bytes_downloaded.increment(bytes);
    }

    pub(crate) fn add_bytes_uploaded(&self, bytes: u64) {
        self.bytes_uploaded.increment(bytes);
    }

    pub(crate) fn increment_retries(&self) {
        self.retries.increment(1);
    }

    pub(crate) fn increment_failed_operations(&self) {
        self.failed_operations.increment(1);
    }

    /// Number of objects produced by listing
    pub fn objects_listed(&self) -> u64 {
        self.objects_listed.value()
    }

    /// Number of listing pages fetched
    pub fn pages_listed(&self) -> u64 {
        self.pages_listed.value()
    }

    /// Object body bytes downloaded
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.value()
    }

    /// Object body bytes uploaded
    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded.value()
    }

    /// Number of retried requests
    pub fn retries(&self) -> u64 {
        self.retries.value()
    }

    /// Number of operations that ended in an error
    pub fn failed_operations(&self) -> u64 {
        self.failed_operations.value()
    }

    /// One line summary of every counter
    pub(crate) fn summary(&self) -> String {
        format!(
            "objects listed: {}, pages listed: {}, downloaded: {}, uploaded: {}, retries: {}, failed operations: {}",
            self.objects_listed(),
            self.pages_listed(),
            unit::ByteCount(self.bytes_downloaded() as f64),
            unit::ByteCount(self.bytes_uploaded() as f64),
            self.retries(),
            self.failed_operations()
        )
    }
}
