// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use s3_upload::s3::Client;
use s3_upload::s3::creds::StaticProvider;
use s3_upload::s3::http::BaseUrl;

/// Connection settings of a live S3 server, read from the environment.
#[derive(Clone, Debug)]
pub struct TestContext {
    pub client: Client,
    pub base_url: BaseUrl,
    pub access_key: String,
    pub secret_key: String,
    /// Existing bucket the live tests write to
    pub bucket: String,
}

impl TestContext {
    pub fn new_from_env() -> Self {
        const DEFAULT_SERVER_ENDPOINT: &str = "http://localhost:9000/";
        const DEFAULT_ACCESS_KEY: &str = "minioadmin";
        const DEFAULT_SECRET_KEY: &str = "minioadmin";
        const DEFAULT_ENABLE_HTTPS: &str = "false";
        const DEFAULT_SERVER_REGION: &str = "";
        const DEFAULT_TEST_BUCKET: &str = "s3-upload-test";

        let host: String =
            std::env::var("SERVER_ENDPOINT").unwrap_or(DEFAULT_SERVER_ENDPOINT.to_string());
        log::debug!("SERVER_ENDPOINT={host}");
        let access_key: String =
            std::env::var("ACCESS_KEY").unwrap_or(DEFAULT_ACCESS_KEY.to_string());
        log::debug!("ACCESS_KEY={access_key}");
        let secret_key: String =
            std::env::var("SECRET_KEY").unwrap_or(DEFAULT_SECRET_KEY.to_string());
        log::debug!("SECRET_KEY=*****");
        let secure: bool = std::env::var("ENABLE_HTTPS")
            .unwrap_or(DEFAULT_ENABLE_HTTPS.to_string())
            .parse()
            .unwrap_or(false);
        log::debug!("ENABLE_HTTPS={secure}");
        let region: String =
            std::env::var("SERVER_REGION").unwrap_or(DEFAULT_SERVER_REGION.to_string());
        log::debug!("SERVER_REGION={region:?}");
        let bucket: String =
            std::env::var("TEST_BUCKET").unwrap_or(DEFAULT_TEST_BUCKET.to_string());
        log::debug!("TEST_BUCKET={bucket}");

        let mut base_url: BaseUrl = host.parse().unwrap();
        base_url.https = secure;
        base_url.region = region;

        let static_provider = StaticProvider::new(&access_key, &secret_key, None);
        let client = Client::new(base_url.clone(), Some(static_provider)).unwrap();

        Self {
            client,
            base_url,
            access_key,
            secret_key,
            bucket,
        }
    }
}
