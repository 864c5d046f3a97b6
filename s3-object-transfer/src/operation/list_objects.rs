/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;
use std::fmt;
use std::mem;

use async_channel::Sender;
use tracing::Instrument;

use crate::error::{self, Error, ErrorKind};
use crate::http::url_decode;
use crate::runtime::retry::RetryPolicy;
use crate::store::{ListEntry, ListObjectsPage, ListObjectsRequest};
use crate::types::TransferObject;

use super::TransferContext;

/// Paginator for the `ListObjects` operation.
///
/// Each page request goes through the same [`RetryPolicy`], so a failure mid listing retries
/// the page that failed (with the same marker) and every page draws from one retry budget.
#[derive(Debug)]
pub(crate) struct ListObjectsPaginator {
    context: TransferContext,
    retry: RetryPolicy,
    state: State,
}

#[derive(Debug, PartialEq)]
enum State {
    Paginating { marker: Option<String> },
    Done,
}

impl State {
    fn next_state(self, page: &ListObjectsPage) -> Result<State, Error> {
        let marker = match self {
            State::Done => return Ok(State::Done),
            State::Paginating { marker } => marker,
        };

        if page.is_last_page {
            return Ok(State::Done);
        }

        if let Some(next_marker) = &page.next_marker {
            return Ok(State::Paginating {
                marker: Some(next_marker.clone()),
            });
        }

        // no marker given, resume after the last key of the page
        match page.entries.last() {
            Some(last) => {
                let next_marker = url_decode(&last.key)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|| last.key.clone());
                Ok(State::Paginating {
                    marker: Some(next_marker),
                })
            }
            None => Err(Error::new(
                ErrorKind::RuntimeError,
                format!(
                    "store returned no continuation marker for a truncated empty page (marker: {})",
                    marker.as_deref().unwrap_or("<none>")
                ),
            )),
        }
    }
}

impl ListObjectsPaginator {
    pub(crate) fn new(context: TransferContext) -> Self {
        let retry = context.retry_policy();
        Self {
            context,
            retry,
            state: State::Paginating { marker: None },
        }
    }

    /// Fetch the next page of objects, `None` once the listing is complete.
    ///
    /// After an error the paginator is done; a new paginator starts over from the first page.
    pub(crate) async fn next_page(&mut self) -> Option<Result<Vec<TransferObject>, Error>> {
        let marker = match &self.state {
            State::Done => return None,
            State::Paginating { marker } => marker.clone(),
        };

        let config = self.context.config();
        let request = ListObjectsRequest {
            bucket: config.bucket().to_owned(),
            prefix: config.prefix().map(str::to_owned),
            marker,
            max_keys: config.keys_per_request(),
        };

        let store = self.context.store();
        let result = self
            .retry
            .call("ListObjects", || store.list_objects(request.clone()))
            .instrument(tracing::debug_span!("send-list-objects"))
            .await;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.state = State::Done;
                return Some(Err(err));
            }
        };

        let prev_state = mem::replace(&mut self.state, State::Done);
        match prev_state.next_state(&page) {
            Ok(next_state) => self.state = next_state,
            Err(err) => return Some(Err(err)),
        }

        tracing::debug!(
            bucket = request.bucket,
            count = page.entries.len(),
            is_last_page = page.is_last_page,
            "listed page"
        );
        self.context
            .metrics()
            .add_objects_listed(page.entries.len() as u64);

        let objects = page.entries.into_iter().map(transfer_object).collect();
        Some(Ok(objects))
    }
}

/// Convert a listing entry, percent-decoding its key
fn transfer_object(entry: ListEntry) -> TransferObject {
    let decoded = url_decode(&entry.key).map(Cow::into_owned);
    let key = match decoded {
        Some(key) => key,
        None => {
            tracing::warn!(
                key = entry.key,
                "listed key is not valid percent-encoded UTF-8, keeping it as returned"
            );
            entry.key
        }
    };

    TransferObject {
        key,
        content_length: entry.size,
        e_tag: entry.e_tag,
        last_modified: entry.last_modified,
        storage_class: entry.storage_class,
        is_latest: Some(true),
        ..Default::default()
    }
}

/// An incremental listing of the objects in a bucket.
///
/// Returned by [`Client::list_stream`](crate::Client::list_stream). Pages are requested lazily
/// as objects are consumed.
#[derive(Debug)]
pub struct ListObjectsStream {
    paginator: ListObjectsPaginator,
    current: std::vec::IntoIter<TransferObject>,
}

impl ListObjectsStream {
    pub(crate) fn new(context: TransferContext) -> Self {
        Self {
            paginator: ListObjectsPaginator::new(context),
            current: Vec::new().into_iter(),
        }
    }

    /// Pull the next object from the stream, `None` once every object has been returned.
    ///
    /// After an error is returned the stream is finished.
    pub async fn next(&mut self) -> Option<Result<TransferObject, Error>> {
        loop {
            if let Some(object) = self.current.next() {
                return Some(Ok(object));
            }

            match self.paginator.next_page().await? {
                Ok(page) => self.current = page.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// A listing that stopped before reaching the last page.
///
/// Carries the objects collected before the failure along with the cause.
#[derive(Debug)]
pub struct ListError {
    objects: Vec<TransferObject>,
    source: Error,
}

impl ListError {
    /// Objects listed before the failure, in store order
    pub fn objects(&self) -> &[TransferObject] {
        &self.objects
    }

    /// The error that stopped the listing
    pub fn error(&self) -> &Error {
        &self.source
    }

    /// The category of the error that stopped the listing
    pub fn kind(&self) -> &ErrorKind {
        self.source.kind()
    }

    /// Split into the partial results and the cause
    pub fn into_parts(self) -> (Vec<TransferObject>, Error) {
        (self.objects, self.source)
    }
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listing stopped after {} objects", self.objects.len())
    }
}

impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<ListError> for Error {
    fn from(value: ListError) -> Self {
        value.source
    }
}

/// List every object, collecting them in store order
#[tracing::instrument(skip_all, level = "debug", name = "list-objects")]
pub(crate) async fn list_all(context: TransferContext) -> Result<Vec<TransferObject>, ListError> {
    let mut paginator = ListObjectsPaginator::new(context);
    let mut objects = Vec::new();
    while let Some(page) = paginator.next_page().await {
        match page {
            Ok(page) => objects.extend(page),
            Err(source) => {
                tracing::error!(
                    listed = objects.len(),
                    "listing failed: {}",
                    aws_smithy_types::error::display::DisplayErrorContext(&source)
                );
                return Err(ListError { objects, source });
            }
        }
    }
    Ok(objects)
}

/// List every object into `tx`, returning the number of objects delivered.
///
/// Stops early, without error, once every receiver has been dropped.
#[tracing::instrument(skip_all, level = "debug", name = "list-objects-to-channel")]
pub(crate) async fn list_to(
    context: TransferContext,
    tx: &Sender<TransferObject>,
) -> Result<u64, Error> {
    let cancel = context.cancellation().clone();
    let mut paginator = ListObjectsPaginator::new(context);
    let mut delivered: u64 = 0;

    while let Some(page) = paginator.next_page().await {
        for object in page? {
            tokio::select! {
                biased;
                err = cancel.cancelled() => {
                    tracing::debug!(delivered, "listing cancelled while waiting on receivers");
                    return Err(err);
                }
                sent = tx.send(object) => {
                    if sent.is_err() {
                        tracing::debug!(delivered, "all receivers dropped, stopping listing early");
                        return Ok(delivered);
                    }
                    delivered += 1;
                }
            }
        }
    }

    Ok(delivered)
}
