/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

pub(crate) mod cancel;
pub(crate) mod retry;
pub(crate) mod token_bucket;
