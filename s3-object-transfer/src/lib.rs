/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! An Amazon S3 object transfer client with bounded retries and a bandwidth cap.
//!
//! The client enumerates the objects of a bucket, downloads their metadata or content and
//! uploads objects (and their access control policies) back. Every remote call is retried a
//! bounded number of times with a fixed delay, every object body read or written is throttled
//! by a shared token bucket, and every operation can be cancelled.
//!
//! # Examples
//!
//! Load the configuration from the environment:
//!
//! ```no_run
//! # async fn example() -> Result<(), s3_object_transfer::error::Error> {
//! let config = s3_object_transfer::from_env()
//!     .bucket("my-bucket")
//!     .load()
//!     .await?;
//! let client = s3_object_transfer::Client::new(config);
//! # Ok(())
//! # }
//! ```
//!
//! Copy every object under a prefix to another bucket at no more than 10 MiB/s:
//!
//! ```no_run
//! use s3_object_transfer::metrics::{unit::ByteUnit, Throughput};
//!
//! # async fn example() -> Result<(), s3_object_transfer::error::Error> {
//! let limit = Throughput::new_bytes_per_sec(10 * ByteUnit::Mebibyte.as_bytes_u64());
//! let source = s3_object_transfer::Client::new(
//!     s3_object_transfer::from_env()
//!         .bucket("source-bucket")
//!         .prefix("reports/")
//!         .bandwidth_limit(limit)
//!         .load()
//!         .await?,
//! );
//! let destination = s3_object_transfer::Client::new(
//!     s3_object_transfer::from_env()
//!         .bucket("destination-bucket")
//!         .load()
//!         .await?,
//! );
//!
//! for mut object in source.list().await? {
//!     source.get_object_content(&mut object).await?;
//!     destination.put_object_content(&object).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! See the documentation for each client operation for more information:
//!
//! * [`list`](crate::Client::list) - collect every object in the bucket/prefix
//! * [`list_to`](crate::Client::list_to) - stream objects into a channel
//! * [`list_stream`](crate::Client::list_stream) - pull objects incrementally
//! * [`get_object_meta`](crate::Client::get_object_meta) - fetch object metadata
//! * [`get_object_content`](crate::Client::get_object_content) - download an object
//! * [`put_object_content`](crate::Client::put_object_content) - upload an object
//! * [`put_object_acl`](crate::Client::put_object_acl) - replace an object's access control policy

/// Error types emitted by `s3-object-transfer`
pub mod error;

/// Common types used by `s3-object-transfer`
pub mod types;

/// Object store abstraction the client sends requests to
pub mod store;

/// Transfer client
pub mod client;

/// Transfer operations
pub mod operation;

/// Transfer client configuration
pub mod config;

/// Rate limited body adapters
pub(crate) mod io;

/// HTTP related components and utils
pub(crate) mod http;

/// Internal runtime components
pub(crate) mod runtime;

/// Metrics
pub mod metrics;

pub use self::client::Client;
pub use self::config::loader::ConfigLoader;
pub use self::config::Config;
pub use self::runtime::token_bucket::RateLimiter;
pub use self::types::TransferObject;

/// Create a config loader
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
