/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod rate_limited;

pub(crate) use self::rate_limited::read_body;
pub(crate) use self::rate_limited::RateLimitedBody;
