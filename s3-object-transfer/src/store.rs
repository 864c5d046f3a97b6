/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{AccessControlPolicy, ObjectCannedAcl, StorageClass};
use aws_smithy_types::DateTime;

use crate::error::Error;

/// [`ObjectStore`] implementation backed by the Amazon S3 SDK
pub mod s3;

/// The remote object store operations the transfer client is built on.
///
/// Each method performs exactly one remote call; retries, cancellation and rate limiting are
/// layered on top by the [`Client`](crate::Client). Implementations should not retry
/// internally.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// List up to `max_keys` entries after `marker`.
    ///
    /// Entry keys are returned percent-encoded, the way S3 returns them when asked for
    /// `EncodingType=url`.
    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ListObjectsPage, Error>;

    /// Fetch object metadata without the body.
    async fn head_object(&self, request: ObjectRequest) -> Result<ObjectMetadata, Error>;

    /// Fetch object metadata and a stream of the body.
    async fn get_object(&self, request: ObjectRequest) -> Result<GetObjectResponse, Error>;

    /// Write an object as the latest version.
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), Error>;

    /// Replace the access control policy of an existing object.
    async fn put_object_acl(&self, request: PutObjectAclRequest) -> Result<(), Error>;
}

/// A reference-counted [`ObjectStore`] that can be shared between clients.
#[derive(Clone, Debug)]
pub struct SharedObjectStore(Arc<dyn ObjectStore>);

impl SharedObjectStore {
    /// Wrap an [`ObjectStore`] implementation
    pub fn new(store: impl ObjectStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl std::ops::Deref for SharedObjectStore {
    type Target = dyn ObjectStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl From<aws_sdk_s3::Client> for SharedObjectStore {
    fn from(value: aws_sdk_s3::Client) -> Self {
        SharedObjectStore::new(s3::S3ObjectStore::new(value))
    }
}

/// Input for [`ObjectStore::list_objects`]
#[derive(Debug, Clone, PartialEq)]
pub struct ListObjectsRequest {
    /// Bucket to list
    pub bucket: String,
    /// Only list keys starting with this prefix
    pub prefix: Option<String>,
    /// Start listing after this key
    pub marker: Option<String>,
    /// Maximum number of keys to return
    pub max_keys: i32,
}

/// A single entry in a listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListEntry {
    /// Percent-encoded key
    pub key: String,
    /// Entity tag
    pub e_tag: Option<String>,
    /// Last modified time
    pub last_modified: Option<DateTime>,
    /// Storage class
    pub storage_class: Option<StorageClass>,
    /// Size in bytes
    pub size: Option<i64>,
}

/// Output of [`ObjectStore::list_objects`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListObjectsPage {
    /// Entries in store order
    pub entries: Vec<ListEntry>,
    /// Marker to send with the next request, usable as is
    pub next_marker: Option<String>,
    /// True when there are no more pages
    pub is_last_page: bool,
}

/// Identifies one object (version) in a bucket
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRequest {
    /// Bucket containing the object
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Object version, `None` for the latest
    pub version_id: Option<String>,
}

/// Object metadata as returned by HEAD/GET and as sent with PUT
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMetadata {
    /// Content length in bytes
    pub content_length: Option<i64>,
    /// MIME type
    pub content_type: Option<String>,
    /// Content disposition
    pub content_disposition: Option<String>,
    /// Content encoding
    pub content_encoding: Option<String>,
    /// Content language
    pub content_language: Option<String>,
    /// Cache control
    pub cache_control: Option<String>,
    /// Entity tag
    pub e_tag: Option<String>,
    /// Last modified time
    pub last_modified: Option<DateTime>,
    /// Storage class
    pub storage_class: Option<StorageClass>,
    /// User-defined metadata
    pub metadata: HashMap<String, String>,
}

/// Output of [`ObjectStore::get_object`]
#[derive(Debug)]
pub struct GetObjectResponse {
    /// Object metadata
    pub metadata: ObjectMetadata,
    /// Object data
    pub body: ByteStream,
}

/// Input for [`ObjectStore::put_object`]
#[derive(Debug)]
pub struct PutObjectRequest {
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub key: String,
    /// Metadata to store with the object. `content_length` must be set.
    pub metadata: ObjectMetadata,
    /// Canned ACL
    pub acl: Option<ObjectCannedAcl>,
    /// Object data
    pub body: ByteStream,
}

/// Input for [`ObjectStore::put_object_acl`]
#[derive(Debug, Clone, PartialEq)]
pub struct PutObjectAclRequest {
    /// Bucket containing the object
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Policy replacing the current one
    pub policy: AccessControlPolicy,
}
