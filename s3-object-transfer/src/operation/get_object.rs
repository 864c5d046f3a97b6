/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tracing::Instrument;

use crate::error::Error;
use crate::io::read_body;
use crate::store::ObjectRequest;
use crate::types::TransferObject;

use super::TransferContext;

fn object_request(context: &TransferContext, object: &TransferObject) -> ObjectRequest {
    ObjectRequest {
        bucket: context.bucket().to_owned(),
        key: object.key.clone(),
        version_id: object.version_id.clone(),
    }
}

/// Fetch the metadata of `object`, leaving it untouched on failure.
#[tracing::instrument(skip_all, level = "debug", name = "get-object-meta", fields(key = %object.key))]
pub(crate) async fn get_object_meta(
    context: TransferContext,
    object: &mut TransferObject,
) -> Result<(), Error> {
    object.validate_key()?;

    let request = object_request(&context, object);
    let store = context.store();
    let meta = context
        .retry_policy()
        .call("HeadObject", || store.head_object(request.clone()))
        .instrument(tracing::debug_span!("send-head-object"))
        .await?;

    object.apply_metadata(meta);
    Ok(())
}

/// Download the body and metadata of `object`, leaving it untouched on failure.
///
/// A failure while the body is streaming is retried with a new request.
#[tracing::instrument(skip_all, level = "debug", name = "get-object-content", fields(key = %object.key))]
pub(crate) async fn get_object_content(
    context: TransferContext,
    object: &mut TransferObject,
) -> Result<(), Error> {
    object.validate_key()?;

    let request = object_request(&context, object);
    let store = context.store();
    let limiter = context.limiter();
    let (meta, body) = context
        .retry_policy()
        .call("GetObject", || {
            let request = request.clone();
            async move {
                let response = store.get_object(request).await?;
                let body =
                    read_body(response.body, limiter, response.metadata.content_length).await?;
                Ok((response.metadata, body))
            }
        })
        .instrument(tracing::debug_span!("send-get-object"))
        .await?;

    tracing::trace!("downloaded {} bytes", body.len());
    context.metrics().add_bytes_downloaded(body.len() as u64);
    object.apply_metadata(meta);
    object.body = Some(body);
    Ok(())
}
