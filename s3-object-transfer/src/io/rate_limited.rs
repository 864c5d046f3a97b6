/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::body::SdkBody;
use bytes::{Bytes, BytesMut};
use pin_project_lite::pin_project;
use tokio::time::Sleep;

use crate::error::{BoxError, Error};
use crate::runtime::token_bucket::RateLimiter;

pin_project! {
    /// Upload body that hands out an in-memory payload in slices, drawing each slice from a
    /// [`RateLimiter`] before yielding it.
    #[derive(Debug)]
    pub(crate) struct RateLimitedBody {
        data: Bytes,
        limiter: RateLimiter,
        chunk_size: usize,
        // slice already paid for, released once the delay elapses
        delayed: Option<(Pin<Box<Sleep>>, Bytes)>,
    }
}

impl RateLimitedBody {
    pub(crate) fn new(data: Bytes, limiter: RateLimiter) -> Self {
        let chunk_size = limiter.chunk_size();
        Self {
            data,
            limiter,
            chunk_size,
            delayed: None,
        }
    }

    fn remaining(&self) -> u64 {
        let pending = self.delayed.as_ref().map_or(0, |(_, chunk)| chunk.len());
        (self.data.len() + pending) as u64
    }

    /// Wrap the body for use as a request payload
    pub(crate) fn into_byte_stream(self) -> ByteStream {
        ByteStream::new(SdkBody::from_body_1_x(self))
    }
}

impl http_body_1x::Body for RateLimitedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body_1x::Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        if let Some((delay, _)) = this.delayed.as_mut() {
            ready!(delay.as_mut().poll(cx));
            let chunk = this.delayed.take().map(|(_, chunk)| chunk).unwrap_or_default();
            return Poll::Ready(Some(Ok(http_body_1x::Frame::data(chunk))));
        }

        if this.data.is_empty() {
            return Poll::Ready(None);
        }

        let len = cmp::min(*this.chunk_size, this.data.len());
        let chunk = this.data.split_to(len);
        let wait = this.limiter.reserve(len as u64);
        if wait.is_zero() {
            return Poll::Ready(Some(Ok(http_body_1x::Frame::data(chunk))));
        }

        tracing::trace!("rate limited: delaying {len} byte upload slice by {wait:?}");
        let mut delay = Box::pin(tokio::time::sleep(wait));
        match delay.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Some(Ok(http_body_1x::Frame::data(chunk)))),
            Poll::Pending => {
                *this.delayed = Some((delay, chunk));
                Poll::Pending
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_empty() && self.delayed.is_none()
    }

    fn size_hint(&self) -> http_body_1x::SizeHint {
        http_body_1x::SizeHint::with_exact(self.remaining())
    }
}

/// Upper bound on the buffer allocated up front from an advertised content length.
const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// Read a response body to the end, drawing every slice from `limiter` before accepting it.
///
/// `content_length` pre-sizes the buffer when the store advertised it, up to
/// [`MAX_PREALLOCATION`]; past that the buffer grows as data arrives.
pub(crate) async fn read_body(
    mut body: ByteStream,
    limiter: &RateLimiter,
    content_length: Option<i64>,
) -> Result<Bytes, Error> {
    let capacity = content_length
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or_default()
        .min(MAX_PREALLOCATION);
    let mut buf = BytesMut::with_capacity(capacity);
    let chunk_size = limiter.chunk_size();

    while let Some(chunk) = body.try_next().await? {
        for slice in chunk.chunks(chunk_size) {
            limiter.acquire(slice.len() as u64).await;
            buf.extend_from_slice(slice);
        }
    }

    Ok(buf.freeze())
}
