/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;

use aws_sdk_s3::types::{AccessControlPolicy, ObjectCannedAcl, StorageClass};
use aws_smithy_types::DateTime;
use bytes::Bytes;

use crate::error;
use crate::store::ObjectMetadata;

/// A single object (version) in a bucket along with its metadata and, once fetched, its body.
///
/// `TransferObject` is a plain value. Listing produces them, the get operations hydrate them in
/// place and the put operations read them; the client never holds on to one after a call
/// returns.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct TransferObject {
    /// Object key. Never empty for objects produced by listing.
    pub key: String,

    /// Version to operate on. `None` means the latest version.
    pub version_id: Option<String>,

    /// Object data. Only populated by a successful
    /// [`get_object_content`](crate::Client::get_object_content).
    pub body: Option<Bytes>,

    /// Content length advertised by the store on the last metadata or content fetch.
    pub content_length: Option<i64>,

    /// A standard MIME type describing the format of the object data.
    pub content_type: Option<String>,

    /// Presentational information for the object.
    pub content_disposition: Option<String>,

    /// Content encodings applied to the object data.
    pub content_encoding: Option<String>,

    /// The language the content is in.
    pub content_language: Option<String>,

    /// Caching behavior along the request/reply chain.
    pub cache_control: Option<String>,

    /// Entity tag, an opaque fingerprint of the object data.
    pub e_tag: Option<String>,

    /// Creation date of the object.
    pub last_modified: Option<DateTime>,

    /// Storage class of the object.
    pub storage_class: Option<StorageClass>,

    /// Whether this is the latest version of the object.
    pub is_latest: Option<bool>,

    /// User-defined metadata.
    pub metadata: HashMap<String, String>,

    /// Canned ACL sent along with the object body on upload.
    pub acl: Option<ObjectCannedAcl>,

    /// Access control policy applied with a separate request after the body is uploaded.
    pub access_control_policy: Option<AccessControlPolicy>,
}

impl TransferObject {
    /// Create a new object with the given key and no metadata
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Creates a new builder-style object to manufacture [`TransferObject`].
    pub fn builder() -> TransferObjectBuilder {
        TransferObjectBuilder::default()
    }

    /// Object key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Object body, if it has been fetched
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Size of the object body, if it has been fetched
    pub fn body_len(&self) -> Option<usize> {
        self.body.as_ref().map(Bytes::len)
    }

    /// Replace every metadata field with the ones returned by the store.
    ///
    /// Fields the store did not return are cleared rather than kept from before.
    pub(crate) fn apply_metadata(&mut self, meta: ObjectMetadata) {
        self.content_length = meta.content_length;
        self.content_type = meta.content_type;
        self.content_disposition = meta.content_disposition;
        self.content_encoding = meta.content_encoding;
        self.content_language = meta.content_language;
        self.cache_control = meta.cache_control;
        self.e_tag = meta.e_tag;
        self.last_modified = meta.last_modified;
        self.storage_class = meta.storage_class;
        self.metadata = meta.metadata;
    }

    /// The metadata to send along with the object body on upload
    pub(crate) fn upload_metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            content_length: self.body_len().and_then(|len| len.try_into().ok()),
            content_type: self.content_type.clone(),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            content_language: self.content_language.clone(),
            cache_control: self.cache_control.clone(),
            storage_class: self.storage_class.clone(),
            metadata: self.metadata.clone(),
            ..Default::default()
        }
    }

    pub(crate) fn validate_key(&self) -> Result<(), error::Error> {
        if self.key.is_empty() {
            return Err(error::invalid_input("object key must not be empty"));
        }
        Ok(())
    }
}

/// A builder for [`TransferObject`].
#[derive(Debug, Clone, Default)]
pub struct TransferObjectBuilder {
    inner: TransferObject,
    key: Option<String>,
}

impl TransferObjectBuilder {
    /// Object key. This field is required.
    pub fn key(mut self, input: impl Into<String>) -> Self {
        self.key = Some(input.into());
        self
    }

    /// Object key. This field is required.
    pub fn set_key(mut self, input: Option<String>) -> Self {
        self.key = input;
        self
    }

    /// Version of the object to read.
    pub fn version_id(mut self, input: impl Into<String>) -> Self {
        self.inner.version_id = Some(input.into());
        self
    }

    /// Version of the object to read.
    pub fn set_version_id(mut self, input: Option<String>) -> Self {
        self.inner.version_id = input;
        self
    }

    /// Object data to upload.
    pub fn body(mut self, input: impl Into<Bytes>) -> Self {
        self.inner.body = Some(input.into());
        self
    }

    /// Object data to upload.
    pub fn set_body(mut self, input: Option<Bytes>) -> Self {
        self.inner.body = input;
        self
    }

    /// A standard MIME type describing the format of the object data.
    pub fn content_type(mut self, input: impl Into<String>) -> Self {
        self.inner.content_type = Some(input.into());
        self
    }

    /// A standard MIME type describing the format of the object data.
    pub fn set_content_type(mut self, input: Option<String>) -> Self {
        self.inner.content_type = input;
        self
    }

    /// Presentational information for the object.
    pub fn content_disposition(mut self, input: impl Into<String>) -> Self {
        self.inner.content_disposition = Some(input.into());
        self
    }

    /// Presentational information for the object.
    pub fn set_content_disposition(mut self, input: Option<String>) -> Self {
        self.inner.content_disposition = input;
        self
    }

    /// Content encodings applied to the object data.
    pub fn content_encoding(mut self, input: impl Into<String>) -> Self {
        self.inner.content_encoding = Some(input.into());
        self
    }

    /// Content encodings applied to the object data.
    pub fn set_content_encoding(mut self, input: Option<String>) -> Self {
        self.inner.content_encoding = input;
        self
    }

    /// The language the content is in.
    pub fn content_language(mut self, input: impl Into<String>) -> Self {
        self.inner.content_language = Some(input.into());
        self
    }

    /// The language the content is in.
    pub fn set_content_language(mut self, input: Option<String>) -> Self {
        self.inner.content_language = input;
        self
    }

    /// Caching behavior along the request/reply chain.
    pub fn cache_control(mut self, input: impl Into<String>) -> Self {
        self.inner.cache_control = Some(input.into());
        self
    }

    /// Caching behavior along the request/reply chain.
    pub fn set_cache_control(mut self, input: Option<String>) -> Self {
        self.inner.cache_control = input;
        self
    }

    /// Storage class to store the object with.
    pub fn storage_class(mut self, input: StorageClass) -> Self {
        self.inner.storage_class = Some(input);
        self
    }

    /// Storage class to store the object with.
    pub fn set_storage_class(mut self, input: Option<StorageClass>) -> Self {
        self.inner.storage_class = input;
        self
    }

    /// Adds a key-value pair to the user-defined metadata.
    pub fn metadata(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.inner.metadata.insert(k.into(), v.into());
        self
    }

    /// Replaces the user-defined metadata.
    pub fn set_metadata(mut self, input: Option<HashMap<String, String>>) -> Self {
        self.inner.metadata = input.unwrap_or_default();
        self
    }

    /// Canned ACL to apply to the object on upload.
    pub fn acl(mut self, input: ObjectCannedAcl) -> Self {
        self.inner.acl = Some(input);
        self
    }

    /// Canned ACL to apply to the object on upload.
    pub fn set_acl(mut self, input: Option<ObjectCannedAcl>) -> Self {
        self.inner.acl = input;
        self
    }

    /// Access control policy to apply after the object is uploaded.
    pub fn access_control_policy(mut self, input: AccessControlPolicy) -> Self {
        self.inner.access_control_policy = Some(input);
        self
    }

    /// Access control policy to apply after the object is uploaded.
    pub fn set_access_control_policy(mut self, input: Option<AccessControlPolicy>) -> Self {
        self.inner.access_control_policy = input;
        self
    }

    /// Consumes the builder and constructs a [`TransferObject`].
    pub fn build(self) -> Result<TransferObject, error::Error> {
        let key = self
            .key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| error::invalid_input("object key is required"))?;
        Ok(TransferObject { key, ..self.inner })
    }
}
