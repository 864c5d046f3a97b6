/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_s3::types::AccessControlPolicy;
use aws_smithy_types::error::display::DisplayErrorContext;
use tracing::Instrument;

use crate::error::{self, Error};
use crate::io::RateLimitedBody;
use crate::store::{PutObjectAclRequest, PutObjectRequest};
use crate::types::TransferObject;

use super::TransferContext;

/// Upload the body and metadata of `object`, then its access control policy if it has one.
///
/// The version id is never sent; the upload always creates the latest version.
#[tracing::instrument(skip_all, level = "debug", name = "put-object-content", fields(key = %object.key))]
pub(crate) async fn put_object_content(
    context: TransferContext,
    object: &TransferObject,
) -> Result<(), Error> {
    object.validate_key()?;
    let body = object.body.clone().ok_or_else(|| {
        error::invalid_input(format!("object `{}` has no body to upload", object.key))
    })?;
    if object.version_id.is_some() {
        tracing::trace!("ignoring version id on upload");
    }

    let bucket = context.bucket();
    let metadata = object.upload_metadata();
    let store = context.store();
    let limiter = context.limiter();
    context
        .retry_policy()
        .call("PutObject", || {
            let request = PutObjectRequest {
                bucket: bucket.to_owned(),
                key: object.key.clone(),
                metadata: metadata.clone(),
                acl: object.acl.clone(),
                body: RateLimitedBody::new(body.clone(), limiter.clone()).into_byte_stream(),
            };
            store.put_object(request)
        })
        .instrument(tracing::debug_span!("send-put-object"))
        .await?;

    tracing::trace!("uploaded {} bytes", body.len());
    context.metrics().add_bytes_uploaded(body.len() as u64);

    if let Some(policy) = &object.access_control_policy {
        put_acl(&context, object, policy).await.map_err(|err| {
            if err.is_cancellation() {
                return err;
            }
            tracing::error!(
                "object body uploaded but access control policy failed: {}",
                DisplayErrorContext(&err)
            );
            error::acl_not_applied(err)
        })?;
    }

    Ok(())
}

/// Replace the access control policy of an existing object with the one on `object`.
#[tracing::instrument(skip_all, level = "debug", name = "put-object-acl", fields(key = %object.key))]
pub(crate) async fn put_object_acl(
    context: TransferContext,
    object: &TransferObject,
) -> Result<(), Error> {
    object.validate_key()?;
    let policy = object.access_control_policy.as_ref().ok_or_else(|| {
        error::invalid_input(format!(
            "object `{}` has no access control policy to apply",
            object.key
        ))
    })?;
    put_acl(&context, object, policy).await
}

/// Send the policy with its own retry budget
async fn put_acl(
    context: &TransferContext,
    object: &TransferObject,
    policy: &AccessControlPolicy,
) -> Result<(), Error> {
    let request = PutObjectAclRequest {
        bucket: context.bucket().to_owned(),
        key: object.key.clone(),
        policy: policy.clone(),
    };
    let store = context.store();
    context
        .retry_policy()
        .call("PutObjectAcl", || store.put_object_acl(request.clone()))
        .instrument(tracing::debug_span!("send-put-object-acl"))
        .await
}
