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

//! HTTP transport used to send signed requests

use crate::s3::error::{Error, NetworkError};
use crate::s3::multimap_ext::Multimap;
use crate::s3::segmented_bytes::SegmentedBytes;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use http::{HeaderMap, Method};
use reqwest::Body;
use std::fmt;

/// Body of an outgoing request.
pub enum RequestBody {
    Empty,
    /// A body held in memory
    Full(SegmentedBytes),
    /// A body produced while sending, such as a chunk-signed part
    Stream {
        stream: BoxStream<'static, Result<Bytes, Error>>,
        length: u64,
    },
}

impl RequestBody {
    /// Number of bytes the body puts on the wire.
    pub fn len(&self) -> u64 {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Full(sb) => sb.len() as u64,
            RequestBody::Stream { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the body into memory.
    pub async fn collect(self) -> Result<SegmentedBytes, Error> {
        match self {
            RequestBody::Empty => Ok(SegmentedBytes::new()),
            RequestBody::Full(sb) => Ok(sb),
            RequestBody::Stream { mut stream, .. } => {
                let mut sb = SegmentedBytes::new();
                while let Some(bytes) = stream.next().await {
                    sb.append(bytes?);
                }
                Ok(sb)
            }
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Full(sb) => write!(f, "Full({} bytes)", sb.len()),
            RequestBody::Stream { length, .. } => write!(f, "Stream({length} bytes)"),
        }
    }
}

/// A signed request ready to be sent.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Multimap,
    pub body: RequestBody,
}

/// A response with its body read into memory.
///
/// Every response of the upload APIs is either empty or a small XML document.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the value of header `name` if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends HTTP requests on behalf of a [`Client`](super::Client).
#[async_trait]
pub trait HttpTransport: fmt::Debug + Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// [`HttpTransport`] backed by a `reqwest` connection pool.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let mut req = self
            .http_client
            .request(request.method.clone(), request.url.as_str());

        for (key, values) in request.headers.iter_all() {
            for value in values {
                req = req.header(key, value);
            }
        }

        if request.method == Method::PUT || request.method == Method::POST {
            req = match request.body {
                RequestBody::Empty => req.body(Body::from(Bytes::new())),
                RequestBody::Full(sb) => {
                    let stream = stream::iter(sb.into_iter().map(|b| -> Result<_, Error> { Ok(b) }));
                    req.body(Body::wrap_stream(stream))
                }
                RequestBody::Stream { stream, .. } => req.body(Body::wrap_stream(stream)),
            };
        }

        let mut resp = req.send().await.map_err(NetworkError::from)?;
        let status = resp.status().as_u16();
        let headers = std::mem::take(resp.headers_mut());
        let body = resp.bytes().await.map_err(NetworkError::from)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
