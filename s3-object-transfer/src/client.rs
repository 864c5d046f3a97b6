/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::sync::Arc;

use async_channel::Sender;

use crate::error::Error;
use crate::metrics::TransferMetrics;
use crate::operation::list_objects::{self, ListError, ListObjectsStream};
use crate::operation::{get_object, put_object, TransferContext};
use crate::types::TransferObject;
use crate::Config;

/// Object transfer client for Amazon Simple Storage Service (or any [`ObjectStore`]).
///
/// Every remote call is retried according to the configured
/// [`RetryConfig`](crate::config::RetryConfig), every body read or written is throttled by the
/// configured [`RateLimiter`](crate::RateLimiter), and every operation stops early once the
/// client is [cancelled](Client::cancel) or its operation timeout elapses.
///
/// `Client` is cheap to clone; clones share configuration, rate limit, metrics and
/// cancellation.
///
/// [`ObjectStore`]: crate::store::ObjectStore
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) handle: Arc<Handle>,
}

/// Whatever is needed to carry out operations, e.g. config, store, metrics
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) config: crate::Config,
    pub(crate) metrics: TransferMetrics,
}

impl Drop for Handle {
    fn drop(&mut self) {
        // Log final metrics summary when the client is dropped
        tracing::debug!("Client metrics summary - {}", self.metrics.summary());
    }
}

impl Client {
    /// Creates a new client from a transfer config.
    pub fn new(config: Config) -> Client {
        let handle = Arc::new(Handle {
            config,
            metrics: TransferMetrics::new(),
        });
        Client { handle }
    }

    /// Returns the client's configuration
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Returns the client's metrics
    pub fn metrics(&self) -> &TransferMetrics {
        &self.handle.metrics
    }

    /// Cancel every in-flight operation and fail every future one.
    ///
    /// Operations stop at the next request, body slice or retry delay and return
    /// [`ErrorKind::OperationCancelled`](crate::error::ErrorKind::OperationCancelled).
    pub fn cancel(&self) {
        tracing::debug!("cancelling client operations");
        self.handle.config.cancellation_token().cancel();
    }

    fn context(&self) -> TransferContext {
        TransferContext::new(self.handle.clone())
    }

    async fn track<T, E>(&self, operation: impl Future<Output = Result<T, E>>) -> Result<T, E> {
        let result = operation.await;
        if result.is_err() {
            self.handle.metrics.increment_failed_operations();
        }
        result
    }

    /// List every object in the configured bucket (and prefix), in store order.
    ///
    /// Listing requests share one retry budget. On failure the objects listed so far are
    /// returned along with the error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use s3_object_transfer::error::Error;
    ///
    /// async fn print_keys(client: &s3_object_transfer::Client) -> Result<(), Error> {
    ///     let objects = client.list().await?;
    ///     for object in &objects {
    ///         println!("{}", object.key());
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn list(&self) -> Result<Vec<TransferObject>, ListError> {
        self.track(list_objects::list_all(self.context())).await
    }

    /// List every object into a channel, returning the number of objects sent.
    ///
    /// With a bounded channel, listing pauses while the channel is full. If every receiver is
    /// dropped the listing stops early and returns successfully.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use s3_object_transfer::error::Error;
    ///
    /// async fn fetch_all(client: &s3_object_transfer::Client) -> Result<(), Error> {
    ///     let (tx, rx) = async_channel::bounded(16);
    ///     let lister = client.clone();
    ///     let producer = tokio::spawn(async move { lister.list_to(&tx).await });
    ///
    ///     while let Ok(mut object) = rx.recv().await {
    ///         client.get_object_content(&mut object).await?;
    ///     }
    ///     producer.await??;
    ///     Ok(())
    /// }
    /// ```
    pub async fn list_to(&self, tx: &Sender<TransferObject>) -> Result<u64, Error> {
        self.track(list_objects::list_to(self.context(), tx)).await
    }

    /// List objects incrementally, fetching pages as the returned stream is consumed.
    pub fn list_stream(&self) -> ListObjectsStream {
        ListObjectsStream::new(self.context())
    }

    /// Fetch the metadata of `object` (by key and version id) without its body.
    ///
    /// On success the object's metadata fields are replaced with the ones returned; on failure
    /// the object is left untouched.
    pub async fn get_object_meta(&self, object: &mut TransferObject) -> Result<(), Error> {
        self.track(get_object::get_object_meta(self.context(), object)).await
    }

    /// Download the body and metadata of `object` (by key and version id).
    ///
    /// On success `object.body` holds the object data and the metadata fields are replaced
    /// with the ones returned; on failure the object is left untouched.
    pub async fn get_object_content(&self, object: &mut TransferObject) -> Result<(), Error> {
        self.track(get_object::get_object_content(self.context(), object)).await
    }

    /// Upload `object` as the latest version of its key.
    ///
    /// The body is required. If the object carries an access control policy it is applied
    /// with a separate request once the body is uploaded; if that request fails the error has
    /// kind [`AclNotApplied`](crate::error::ErrorKind::AclNotApplied) and the uploaded body is
    /// kept.
    pub async fn put_object_content(&self, object: &TransferObject) -> Result<(), Error> {
        self.track(put_object::put_object_content(self.context(), object)).await
    }

    /// Replace the access control policy of an existing object with `object`'s.
    pub async fn put_object_acl(&self, object: &TransferObject) -> Result<(), Error> {
        self.track(put_object::put_object_acl(self.context(), object)).await
    }
}
