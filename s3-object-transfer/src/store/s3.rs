/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::types::{EncodingType, StorageClass};

use super::{
    GetObjectResponse, ListEntry, ListObjectsPage, ListObjectsRequest, ObjectMetadata,
    ObjectRequest, ObjectStore, PutObjectAclRequest, PutObjectRequest,
};
use crate::error::Error;
use crate::http::url_decode;

/// An [`ObjectStore`] that sends requests to Amazon S3 (or an S3 compatible endpoint).
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Create a store from an S3 client.
    ///
    /// The SDK's own retry strategy is disabled on the given client; retries are handled by the
    /// transfer [`Client`](crate::Client) so every attempt counts against a single budget.
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        let conf = client
            .config()
            .to_builder()
            .retry_config(RetryConfig::disabled())
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(conf),
        }
    }

    /// The underlying S3 client
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ListObjectsPage, Error> {
        let output = self
            .client
            .list_objects()
            .bucket(request.bucket)
            .set_prefix(request.prefix)
            .set_marker(request.marker)
            .max_keys(request.max_keys)
            .encoding_type(EncodingType::Url)
            .send()
            .await?;

        let entries: Vec<ListEntry> = output
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?;
                Some(ListEntry {
                    key: key.to_owned(),
                    e_tag: obj.e_tag().map(str::to_owned),
                    last_modified: obj.last_modified().cloned(),
                    storage_class: obj.storage_class().map(|sc| StorageClass::from(sc.as_str())),
                    size: obj.size(),
                })
            })
            .collect();

        let is_last_page = !output.is_truncated().unwrap_or(false);

        // ListObjects (v1) only returns NextMarker when a delimiter is set, otherwise the
        // last key of the page is the marker. Both come back url encoded.
        let next_marker = if is_last_page {
            None
        } else {
            output
                .next_marker()
                .or_else(|| entries.last().map(|entry| entry.key.as_str()))
                .map(|raw| match url_decode(raw) {
                    Some(decoded) => decoded.into_owned(),
                    None => raw.to_owned(),
                })
        };

        Ok(ListObjectsPage {
            entries,
            next_marker,
            is_last_page,
        })
    }

    async fn head_object(&self, request: ObjectRequest) -> Result<ObjectMetadata, Error> {
        let output = self
            .client
            .head_object()
            .bucket(request.bucket)
            .key(request.key)
            .set_version_id(request.version_id)
            .send()
            .await?;

        Ok(ObjectMetadata {
            content_length: output.content_length,
            content_type: output.content_type,
            content_disposition: output.content_disposition,
            content_encoding: output.content_encoding,
            content_language: output.content_language,
            cache_control: output.cache_control,
            e_tag: output.e_tag,
            last_modified: output.last_modified,
            storage_class: output.storage_class,
            metadata: output.metadata.unwrap_or_default(),
        })
    }

    async fn get_object(&self, request: ObjectRequest) -> Result<GetObjectResponse, Error> {
        let output = self
            .client
            .get_object()
            .bucket(request.bucket)
            .key(request.key)
            .set_version_id(request.version_id)
            .send()
            .await?;

        let metadata = ObjectMetadata {
            content_length: output.content_length,
            content_type: output.content_type,
            content_disposition: output.content_disposition,
            content_encoding: output.content_encoding,
            content_language: output.content_language,
            cache_control: output.cache_control,
            e_tag: output.e_tag,
            last_modified: output.last_modified,
            storage_class: output.storage_class,
            metadata: output.metadata.unwrap_or_default(),
        };

        Ok(GetObjectResponse {
            metadata,
            body: output.body,
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<(), Error> {
        let meta = request.metadata;
        let user_metadata = Some(meta.metadata).filter(|m| !m.is_empty());

        self.client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .body(request.body)
            .set_content_length(meta.content_length)
            .set_content_type(meta.content_type)
            .set_content_disposition(meta.content_disposition)
            .set_content_encoding(meta.content_encoding)
            .set_content_language(meta.content_language)
            .set_cache_control(meta.cache_control)
            .set_storage_class(meta.storage_class)
            .set_metadata(user_metadata)
            .set_acl(request.acl)
            .send()
            .await?;
        Ok(())
    }

    async fn put_object_acl(&self, request: PutObjectAclRequest) -> Result<(), Error> {
        self.client
            .put_object_acl()
            .bucket(request.bucket)
            .key(request.key)
            .access_control_policy(request.policy)
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::operation::get_object::GetObjectOutput;
    use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
    use aws_sdk_s3::operation::list_objects::ListObjectsOutput;
    use aws_sdk_s3::operation::put_object::PutObjectOutput;
    use aws_sdk_s3::operation::put_object_acl::PutObjectAclOutput;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::{
        AccessControlPolicy, EncodingType, Grant, Grantee, Object, ObjectCannedAcl,
        ObjectStorageClass, Permission, StorageClass, Type,
    };
    use aws_smithy_mocks_experimental::{mock, mock_client, RuleMode};
    use std::collections::HashMap;

    use super::S3ObjectStore;
    use crate::error::ErrorKind;
    use crate::store::{
        ListObjectsRequest, ObjectMetadata, ObjectRequest, ObjectStore, PutObjectAclRequest,
        PutObjectRequest,
    };

    fn list_request(marker: Option<&str>) -> ListObjectsRequest {
        ListObjectsRequest {
            bucket: "test-bucket".to_owned(),
            prefix: Some("photos/".to_owned()),
            marker: marker.map(str::to_owned),
            max_keys: 2,
        }
    }

    #[tokio::test]
    async fn test_list_objects_truncated_page_uses_last_key_as_marker() {
        let list = mock!(aws_sdk_s3::Client::list_objects)
            .match_requests(|r| {
                r.encoding_type() == Some(&EncodingType::Url)
                    && r.max_keys() == Some(2)
                    && r.prefix() == Some("photos/")
                    && r.marker().is_none()
            })
            .then_output(|| {
                ListObjectsOutput::builder()
                    .is_truncated(true)
                    .contents(
                        Object::builder()
                            .key("photos/a+b.jpg")
                            .e_tag("\"etag-1\"")
                            .storage_class(ObjectStorageClass::Standard)
                            .build(),
                    )
                    .contents(Object::builder().key("photos/c%2Fd.jpg").build())
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&list]);
        let store = S3ObjectStore::new(client);

        let page = store.list_objects(list_request(None)).await.unwrap();
        assert!(!page.is_last_page);
        assert_eq!(2, page.entries.len());
        // keys are left encoded, the paginator decodes them
        assert_eq!("photos/a+b.jpg", page.entries[0].key);
        assert_eq!(Some("\"etag-1\""), page.entries[0].e_tag.as_deref());
        assert_eq!(Some(StorageClass::Standard), page.entries[0].storage_class);
        assert_eq!(Some("photos/c/d.jpg"), page.next_marker.as_deref());
    }

    #[tokio::test]
    async fn test_list_objects_prefers_next_marker() {
        let list = mock!(aws_sdk_s3::Client::list_objects)
            .match_requests(|r| r.marker() == Some("photos/x"))
            .then_output(|| {
                ListObjectsOutput::builder()
                    .is_truncated(true)
                    .next_marker("photos/z%20z")
                    .contents(Object::builder().key("photos/y").build())
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&list]);
        let store = S3ObjectStore::new(client);

        let page = store
            .list_objects(list_request(Some("photos/x")))
            .await
            .unwrap();
        assert_eq!(Some("photos/z z"), page.next_marker.as_deref());
    }

    #[tokio::test]
    async fn test_list_objects_last_page() {
        let list = mock!(aws_sdk_s3::Client::list_objects).then_output(|| {
            ListObjectsOutput::builder()
                .is_truncated(false)
                .contents(Object::builder().key("photos/y").build())
                .build()
        });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&list]);
        let store = S3ObjectStore::new(client);

        let page = store.list_objects(list_request(None)).await.unwrap();
        assert!(page.is_last_page);
        assert_eq!(None, page.next_marker);
    }

    #[tokio::test]
    async fn test_head_object_maps_metadata() {
        let head = mock!(aws_sdk_s3::Client::head_object)
            .match_requests(|r| r.key() == Some("k") && r.version_id() == Some("v1"))
            .then_output(|| {
                HeadObjectOutput::builder()
                    .content_length(42)
                    .content_type("text/plain")
                    .cache_control("no-cache")
                    .e_tag("\"abc\"")
                    .storage_class(StorageClass::StandardIa)
                    .metadata("owner", "ops")
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&head]);
        let store = S3ObjectStore::new(client);

        let meta = store
            .head_object(ObjectRequest {
                bucket: "test-bucket".to_owned(),
                key: "k".to_owned(),
                version_id: Some("v1".to_owned()),
            })
            .await
            .unwrap();

        assert_eq!(Some(42), meta.content_length);
        assert_eq!(Some("text/plain"), meta.content_type.as_deref());
        assert_eq!(Some("no-cache"), meta.cache_control.as_deref());
        assert_eq!(Some(StorageClass::StandardIa), meta.storage_class);
        assert_eq!(Some("ops"), meta.metadata.get("owner").map(String::as_str));
    }

    #[tokio::test]
    async fn test_head_object_not_found() {
        let head = mock!(aws_sdk_s3::Client::head_object).then_error(|| {
            HeadObjectError::NotFound(aws_sdk_s3::types::error::NotFound::builder().build())
        });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&head]);
        let store = S3ObjectStore::new(client);

        let err = store
            .head_object(ObjectRequest {
                bucket: "test-bucket".to_owned(),
                key: "missing".to_owned(),
                version_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::NotFound, err.kind());
    }

    #[tokio::test]
    async fn test_get_object_returns_body() {
        let get = mock!(aws_sdk_s3::Client::get_object)
            .match_requests(|r| r.key() == Some("k") && r.version_id().is_none())
            .then_output(|| {
                GetObjectOutput::builder()
                    .content_length(5)
                    .content_type("text/plain")
                    .body(ByteStream::from_static(b"hello"))
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&get]);
        let store = S3ObjectStore::new(client);

        let resp = store
            .get_object(ObjectRequest {
                bucket: "test-bucket".to_owned(),
                key: "k".to_owned(),
                version_id: None,
            })
            .await
            .unwrap();

        assert_eq!(Some(5), resp.metadata.content_length);
        let data = resp.body.collect().await.unwrap().into_bytes();
        assert_eq!(&b"hello"[..], &data[..]);
    }

    #[tokio::test]
    async fn test_put_object_sends_metadata() {
        let put = mock!(aws_sdk_s3::Client::put_object)
            .match_requests(|r| {
                r.key() == Some("k")
                    && r.content_type() == Some("text/plain")
                    && r.content_length() == Some(5)
                    && r.acl() == Some(&ObjectCannedAcl::PublicRead)
                    && r.storage_class() == Some(&StorageClass::Standard)
                    && r.metadata().and_then(|m| m.get("owner")).map(String::as_str) == Some("ops")
            })
            .then_output(|| PutObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&put]);
        let store = S3ObjectStore::new(client);

        store
            .put_object(PutObjectRequest {
                bucket: "test-bucket".to_owned(),
                key: "k".to_owned(),
                metadata: ObjectMetadata {
                    content_length: Some(5),
                    content_type: Some("text/plain".to_owned()),
                    storage_class: Some(StorageClass::Standard),
                    metadata: HashMap::from([("owner".to_owned(), "ops".to_owned())]),
                    ..Default::default()
                },
                acl: Some(ObjectCannedAcl::PublicRead),
                body: ByteStream::from_static(b"hello"),
            })
            .await
            .unwrap();
        assert_eq!(1, put.num_calls());
    }

    #[tokio::test]
    async fn test_put_object_acl() {
        let put_acl = mock!(aws_sdk_s3::Client::put_object_acl)
            .match_requests(|r| {
                r.key() == Some("k")
                    && r.access_control_policy()
                        .map(|p| p.grants().len() == 1)
                        .unwrap_or(false)
            })
            .then_output(|| PutObjectAclOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&put_acl]);
        let store = S3ObjectStore::new(client);

        let policy = AccessControlPolicy::builder()
            .grants(
                Grant::builder()
                    .grantee(
                        Grantee::builder()
                            .r#type(Type::CanonicalUser)
                            .id("owner-id")
                            .build()
                            .unwrap(),
                    )
                    .permission(Permission::FullControl)
                    .build(),
            )
            .build();

        store
            .put_object_acl(PutObjectAclRequest {
                bucket: "test-bucket".to_owned(),
                key: "k".to_owned(),
                policy,
            })
            .await
            .unwrap();
        assert_eq!(1, put_acl.num_calls());
    }
}
