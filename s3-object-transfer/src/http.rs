/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;

/// Decode a value returned by S3 with `EncodingType=url`.
///
/// S3 encodes spaces as `+` (a literal `+` comes back as `%2B`). Returns `None` if the decoded
/// bytes are not valid UTF-8.
pub(crate) fn url_decode(raw: &str) -> Option<Cow<'_, str>> {
    if !raw.contains(['%', '+']) {
        return Some(Cow::Borrowed(raw));
    }
    let unplussed = raw.replace('+', " ");
    urlencoding::decode(&unplussed)
        .ok()
        .map(|decoded| Cow::Owned(decoded.into_owned()))
}

/// Give `endpoint` a scheme if it has none: `http://` when TLS is disabled, `https://` otherwise.
pub(crate) fn endpoint_url(endpoint: &str, disable_tls: bool) -> String {
    if endpoint.contains("://") {
        return endpoint.to_owned();
    }
    let scheme = if disable_tls { "http" } else { "https" };
    format!("{scheme}://{endpoint}")
}
