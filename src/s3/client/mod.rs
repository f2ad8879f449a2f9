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

//! S3 client to upload objects.
//!
//! Requests are signed with AWS Signature Version 4 when a credential
//! provider is configured, and sent through an [`HttpTransport`]. The
//! default transport is a `reqwest` connection pool; tests plug in their own.
//!
//! # HTTP Version Support
//!
//! HTTP/2 is negotiated via ALPN when the `http2` feature is enabled (the
//! default) and the server supports it, otherwise HTTP/1.1 is used.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use http::Method;

use crate::s3::aws_chunked::{ChunkSigner, DEFAULT_CHUNK_SIZE, encoded_length};
use crate::s3::creds::Provider;
use crate::s3::error::{Error, ErrorResponse, S3ServerError};
use crate::s3::header_constants::*;
use crate::s3::http::BaseUrl;
use crate::s3::multimap_ext::{Multimap, MultimapExt};
use crate::s3::segmented_bytes::SegmentedBytes;
use crate::s3::signer::{SigningKeyCache, sign_v4_s3, sign_v4_s3_with_context};
use crate::s3::utils::{EMPTY_SHA256, sha256_hash_sb, to_amz_date, utc_now};

mod put_object;
pub mod transport;

pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestBody};

/// Region used when neither the request nor the endpoint names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for the HTTP connection pool.
///
/// # Example
///
/// ```
/// use s3_upload::s3::client::ConnectionPoolConfig;
/// use std::time::Duration;
///
/// // Many parallel part uploads
/// let config = ConnectionPoolConfig::default()
///     .max_idle_per_host(64)
///     .idle_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    /// Maximum number of idle connections per host. Default: 32
    pub max_idle_per_host: usize,

    /// How long idle connections are kept in the pool. Default: 90 seconds
    pub idle_timeout: Duration,

    /// TCP keepalive interval. Default: 60 seconds
    pub tcp_keepalive: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm). Default: true
    pub tcp_nodelay: bool,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 32,
            idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Duration::from_secs(60),
            tcp_nodelay: true,
        }
    }
}

impl ConnectionPoolConfig {
    /// Set the maximum number of idle connections per host.
    ///
    /// Should be at least the number of parts uploaded in parallel.
    pub fn max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn tcp_keepalive(mut self, interval: Duration) -> Self {
        self.tcp_keepalive = interval;
        self
    }

    pub fn tcp_nodelay(mut self, enable: bool) -> Self {
        self.tcp_nodelay = enable;
        self
    }
}

/// Client Builder manufactures a Client using given parameters.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: BaseUrl,
    /// Credential provider. Requests are anonymous without one.
    provider: Option<Arc<dyn Provider + Send + Sync + 'static>>,
    /// Transport replacing the default `reqwest` one.
    transport: Option<Arc<dyn HttpTransport>>,
    /// (app_name, app_version) pair appended to the user-agent.
    app_info: Option<(String, String)>,
    connection_pool_config: ConnectionPoolConfig,
}

impl ClientBuilder {
    /// Creates a builder given a base URL for the S3 compatible service.
    pub fn new(base_url: BaseUrl) -> Self {
        Self {
            base_url,
            provider: None,
            transport: None,
            app_info: None,
            connection_pool_config: ConnectionPoolConfig::default(),
        }
    }

    /// Set the credential provider. If not set, anonymous access is used.
    pub fn provider<P: Provider + Send + Sync + 'static>(mut self, provider: Option<P>) -> Self {
        self.provider = provider.map(|p| Arc::new(p) as Arc<dyn Provider + Send + Sync + 'static>);
        self
    }

    /// Send requests through `transport` instead of a `reqwest` client.
    ///
    /// The connection pool configuration is ignored when a transport is set.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the app info as an Option of (app_name, app_version) pair. This will
    /// show up in the client's user-agent.
    pub fn app_info(mut self, app_info: Option<(String, String)>) -> Self {
        self.app_info = app_info;
        self
    }

    pub fn connection_pool_config(mut self, config: ConnectionPoolConfig) -> Self {
        self.connection_pool_config = config;
        self
    }

    /// Build the Client.
    pub fn build(self) -> Result<Client, Error> {
        let mut user_agent = String::from("MinIO (")
            + std::env::consts::OS
            + "; "
            + std::env::consts::ARCH
            + ") s3-upload/"
            + env!("CARGO_PKG_VERSION");

        if let Some((app_name, app_version)) = self.app_info {
            user_agent.push_str(format!(" {app_name}/{app_version}").as_str());
        }

        let transport = match self.transport {
            Some(t) => t,
            None => {
                let pool_config = &self.connection_pool_config;
                let mut builder = reqwest::Client::builder()
                    .no_gzip()
                    .tcp_nodelay(pool_config.tcp_nodelay)
                    .tcp_keepalive(pool_config.tcp_keepalive)
                    .pool_max_idle_per_host(pool_config.max_idle_per_host)
                    .pool_idle_timeout(pool_config.idle_timeout);

                #[cfg(feature = "http2")]
                {
                    builder = builder.http2_adaptive_window(true);
                }

                Arc::new(ReqwestTransport::new(builder.build()?)) as Arc<dyn HttpTransport>
            }
        };

        Ok(Client {
            shared: Arc::new(SharedClientItems {
                base_url: self.base_url,
                provider: self.provider,
                transport,
                user_agent,
                signing_key_cache: SigningKeyCache::new(),
            }),
        })
    }
}

/// S3 client performing object uploads.
///
/// If credential provider is passed, all S3 operation requests are signed using
/// AWS Signature Version 4; else they are performed anonymously. Cloning is
/// cheap; clones share the connection pool and the signing key cache.
#[derive(Clone, Debug)]
pub struct Client {
    pub(crate) shared: Arc<SharedClientItems>,
}

#[derive(Debug)]
pub(crate) struct SharedClientItems {
    pub(crate) base_url: BaseUrl,
    pub(crate) provider: Option<Arc<dyn Provider + Send + Sync + 'static>>,
    transport: Arc<dyn HttpTransport>,
    user_agent: String,
    signing_key_cache: SigningKeyCache,
}

impl Client {
    /// Returns a S3 client with given base URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3_upload::s3::client::Client;
    /// use s3_upload::s3::creds::StaticProvider;
    /// use s3_upload::s3::http::BaseUrl;
    ///
    /// let base_url: BaseUrl = "play.min.io".parse().unwrap();
    /// let static_provider = StaticProvider::new(
    ///     "Q3AM3UQ867SPQQA43P2F",
    ///     "zuf+tfteSlswRu7BJ86wekitnifILbZam1KYY3TG",
    ///     None,
    /// );
    /// let client = Client::new(base_url, Some(static_provider)).unwrap();
    /// ```
    pub fn new<P: Provider + Send + Sync + 'static>(
        base_url: BaseUrl,
        provider: Option<P>,
    ) -> Result<Self, Error> {
        ClientBuilder::new(base_url).provider(provider).build()
    }

    /// Returns whether this client uses an AWS host.
    pub fn is_aws_host(&self) -> bool {
        self.shared.base_url.is_aws_host()
    }

    /// Returns the region to sign a request with: the requested one, else the
    /// endpoint's, else [`DEFAULT_REGION`].
    pub fn resolve_region(&self, region: Option<&str>) -> String {
        if let Some(r) = region.filter(|r| !r.is_empty()) {
            return r.to_string();
        }
        if !self.shared.base_url.region.is_empty() {
            return self.shared.base_url.region.clone();
        }
        DEFAULT_REGION.to_string()
    }

    /// Signs and sends one request, turning error responses into [`Error::S3Server`].
    ///
    /// With `signed_streaming` and credentials, a PUT or POST body is sent as
    /// an `aws-chunked` stream with a signature per chunk.
    pub(crate) async fn execute(
        &self,
        method: Method,
        region: &str,
        headers: &mut Multimap,
        query_params: &Multimap,
        bucket: &str,
        object: &str,
        body: Option<SegmentedBytes>,
        signed_streaming: bool,
    ) -> Result<HttpResponse, Error> {
        let object = (!object.is_empty()).then_some(object);
        let url = self.shared.base_url.build_url(query_params, bucket, object)?;

        headers.add(HOST, url.host_header_value());
        headers.add(USER_AGENT, self.shared.user_agent.as_str());

        let creds = self.shared.provider.as_ref().map(|p| p.fetch());
        let has_body = matches!(method, Method::PUT | Method::POST);
        let streaming = signed_streaming && has_body && creds.is_some();
        let body = body.unwrap_or_default();

        let sha256: String = if has_body {
            if !headers.contains_key_ignore_case(CONTENT_TYPE) {
                headers.add(CONTENT_TYPE, "application/octet-stream");
            }
            let raw_len = body.len() as u64;

            if streaming {
                headers.add(CONTENT_ENCODING, AWS_CHUNKED);
                headers.add(X_AMZ_DECODED_CONTENT_LENGTH, raw_len.to_string());
                headers.add(
                    CONTENT_LENGTH,
                    encoded_length(raw_len, DEFAULT_CHUNK_SIZE).to_string(),
                );
                STREAMING_AWS4_HMAC_SHA256_PAYLOAD.into()
            } else {
                headers.add(CONTENT_LENGTH, raw_len.to_string());
                if body.is_empty() {
                    EMPTY_SHA256.into()
                } else {
                    let clone = body.clone();
                    async_std::task::spawn_blocking(move || sha256_hash_sb(&clone)).await
                }
            }
        } else {
            EMPTY_SHA256.into()
        };
        headers.add(X_AMZ_CONTENT_SHA256, sha256.clone());

        let date = utc_now();
        headers.add(X_AMZ_DATE, to_amz_date(date));

        let mut chunk_signing_context = None;
        if let Some(creds) = creds {
            if let Some(token) = creds.session_token {
                headers.add(X_AMZ_SECURITY_TOKEN, token);
            }
            if streaming {
                chunk_signing_context = Some(sign_v4_s3_with_context(
                    &self.shared.signing_key_cache,
                    &method,
                    &url.path,
                    region,
                    headers,
                    query_params,
                    &creds.access_key,
                    &creds.secret_key,
                    &sha256,
                    date,
                ));
            } else {
                sign_v4_s3(
                    &self.shared.signing_key_cache,
                    &method,
                    &url.path,
                    region,
                    headers,
                    query_params,
                    &creds.access_key,
                    &creds.secret_key,
                    &sha256,
                    date,
                );
            }
        }

        let body = match chunk_signing_context {
            Some(context) => {
                let content_length = body.len() as u64;
                let source = stream::iter(body.into_iter().map(|b| -> Result<_, Error> { Ok(b) }));
                let signer = ChunkSigner::new(source, content_length, context);
                let length = signer.length();
                RequestBody::Stream {
                    stream: signer.boxed(),
                    length,
                }
            }
            None if body.is_empty() => RequestBody::Empty,
            None => RequestBody::Full(body),
        };

        log::debug!("{method} {url} ({} bytes)", body.len());

        let resp = self
            .shared
            .transport
            .send(HttpRequest {
                method: method.clone(),
                url: url.to_string(),
                headers: headers.clone(),
                body,
            })
            .await?;

        if resp.is_success() {
            return Ok(resp);
        }

        let err = error_from_response(&resp, bucket, object.unwrap_or_default());
        log::debug!("{method} {url} failed: {err}");
        Err(err)
    }
}

/// Converts a non-2xx response into an error, using the XML body when present.
pub(crate) fn error_from_response(resp: &HttpResponse, bucket: &str, object: &str) -> Error {
    if resp.body.is_empty() {
        return S3ServerError::HttpStatus {
            status: resp.status,
            body: String::new(),
        }
        .into();
    }

    match ErrorResponse::parse(&resp.body) {
        Ok(mut er) => {
            if er.request_id.is_empty()
                && let Some(id) = resp.header(X_AMZ_REQUEST_ID)
            {
                er.request_id = id.to_string();
            }
            if er.bucket_name.is_empty() {
                er.bucket_name = bucket.to_string();
            }
            if er.object_name.is_empty() {
                er.object_name = object.to_string();
            }
            S3ServerError::S3Error(Box::new(er)).into()
        }
        Err(_) => S3ServerError::InvalidResponse(
            resp.status,
            String::from_utf8_lossy(&resp.body).into_owned(),
        )
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn region_falls_back_to_endpoint_then_default() {
        let client = ClientBuilder::new("http://localhost:9000".parse().unwrap())
            .build()
            .unwrap();
        assert_eq!(client.resolve_region(None), DEFAULT_REGION);
        assert_eq!(client.resolve_region(Some("")), DEFAULT_REGION);
        assert_eq!(client.resolve_region(Some("eu-west-1")), "eu-west-1");

        let client = ClientBuilder::new("https://s3.ap-south-1.amazonaws.com".parse().unwrap())
            .build()
            .unwrap();
        assert_eq!(client.resolve_region(None), "ap-south-1");
    }

    #[test]
    fn xml_error_body_becomes_s3_error() {
        let resp = HttpResponse {
            status: 404,
            headers: Default::default(),
            body: Bytes::from_static(
                b"<Error><Code>NoSuchUpload</Code><Message>gone</Message><RequestId>r1</RequestId></Error>",
            ),
        };
        let err = error_from_response(&resp, "bucket", "key");
        assert_eq!(err.s3_code(), Some("NoSuchUpload"));
        match err {
            Error::S3Server(S3ServerError::S3Error(er)) => {
                assert_eq!(er.bucket_name, "bucket");
                assert_eq!(er.object_name, "key");
                assert_eq!(er.request_id, "r1");
            }
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn empty_error_body_keeps_status() {
        let resp = HttpResponse {
            status: 503,
            ..Default::default()
        };
        assert!(matches!(
            error_from_response(&resp, "b", "o"),
            Error::S3Server(S3ServerError::HttpStatus { status: 503, .. })
        ));
    }
}
