/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use tokio_util::sync::CancellationToken;

use crate::config::{Builder, RetryConfig};
use crate::error::Error;
use crate::http;
use crate::metrics::Throughput;
use crate::Config;

/// Load transfer [`Config`] from the environment.
///
/// Region and credentials default to the standard AWS environment/profile chain unless
/// overridden here.
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
    region: Option<String>,
    endpoint_url: Option<String>,
    disable_tls: bool,
    force_path_style: bool,
    credentials: Option<SharedCredentialsProvider>,
}

impl ConfigLoader {
    /// The bucket every operation is sent to. Required.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.builder = self.builder.bucket(bucket);
        self
    }

    /// Only list keys starting with this prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.builder = self.builder.prefix(prefix);
        self
    }

    /// Maximum number of keys requested per listing page. Default is 10.
    pub fn keys_per_request(mut self, keys: i32) -> Self {
        self.builder = self.builder.keys_per_request(keys);
        self
    }

    /// Number of retries and delay between attempts for every request.
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.builder = self.builder.retry_config(retry);
        self
    }

    /// Cap the aggregate throughput of body reads and writes.
    pub fn bandwidth_limit(mut self, limit: Throughput) -> Self {
        self.builder = self.builder.bandwidth_limit(limit);
        self
    }

    /// Abandon an operation that has not completed after `timeout`, retries included.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.operation_timeout(timeout);
        self
    }

    /// Token used to cancel the client's operations
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.builder = self.builder.cancellation_token(token);
        self
    }

    /// Region to sign requests for
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Send requests to a custom S3 compatible endpoint.
    ///
    /// A bare `host[:port]` is given a scheme based on [`disable_tls`](Self::disable_tls).
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use `http://` for an endpoint given without a scheme
    pub fn disable_tls(mut self, disable_tls: bool) -> Self {
        self.disable_tls = disable_tls;
        self
    }

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    pub fn force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Credentials provider used to sign requests
    pub fn credentials_provider(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.credentials = Some(SharedCredentialsProvider::new(provider));
        self
    }

    /// Sign requests with a fixed access key pair
    pub fn static_credentials(
        self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "s3-object-transfer-static",
        );
        self.credentials_provider(credentials)
    }

    /// Load the configuration
    ///
    /// If fields have been overridden during builder construction, the override values will be
    /// used. Otherwise, the default values for each field will be provided.
    pub async fn load(self) -> Result<Config, Error> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = self.region {
            loader = loader.region(Region::new(region));
        }
        if let Some(credentials) = self.credentials {
            loader = loader.credentials_provider(credentials);
        }
        let shared_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(self.force_path_style)
            .retry_config(aws_config::retry::RetryConfig::disabled());
        if let Some(endpoint_url) = self.endpoint_url {
            let endpoint_url = http::endpoint_url(&endpoint_url, self.disable_tls);
            tracing::debug!("using custom endpoint {endpoint_url}");
            s3_config = s3_config.endpoint_url(endpoint_url);
        }

        let s3_client = aws_sdk_s3::Client::from_conf(s3_config.build());
        self.builder.client(s3_client).build()
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigLoader;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_load_with_static_settings() {
        let config = ConfigLoader::default()
            .bucket("test-bucket")
            .region("eu-west-1")
            .endpoint_url("localhost:9000")
            .disable_tls(true)
            .force_path_style(true)
            .static_credentials("AKID", "SECRET")
            .keys_per_request(100)
            .load()
            .await
            .unwrap();

        assert_eq!("test-bucket", config.bucket());
        assert_eq!(100, config.keys_per_request());
    }

    #[tokio::test]
    async fn test_load_requires_bucket() {
        let err = ConfigLoader::default()
            .region("eu-west-1")
            .static_credentials("AKID", "SECRET")
            .load()
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }
}
