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

//! In-memory [`HttpTransport`] that records requests and answers them like
//! an S3 server would.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method};
use parking_lot::Mutex;
use s3_upload::s3::client::{ClientBuilder, HttpRequest, HttpResponse, HttpTransport};
use s3_upload::s3::creds::StaticProvider;
use s3_upload::s3::error::Error;
use s3_upload::s3::multimap_ext::Multimap;
use s3_upload::s3::Client;
use std::fmt;
use std::sync::Arc;

pub const UPLOAD_ID: &str = "mock-upload-id";

/// A request as it reached the transport, body included.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Multimap,
    pub body: Bytes,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Raw value of query parameter `key`; `Some("")` for a bare key.
    pub fn query(&self, key: &str) -> Option<&str> {
        let (_, query) = self.url.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == key).then_some(v)
        })
    }

    pub fn part_number(&self) -> Option<u16> {
        self.query("partNumber").and_then(|v| v.parse().ok())
    }

    pub fn is_initiate(&self) -> bool {
        self.method == Method::POST && self.query("uploads").is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.method == Method::POST && self.query("uploadId").is_some()
    }

    pub fn is_abort(&self) -> bool {
        self.method == Method::DELETE
    }

    pub fn is_upload_part(&self) -> bool {
        self.method == Method::PUT && self.part_number().is_some()
    }

    pub fn is_put_object(&self) -> bool {
        self.method == Method::PUT && self.part_number().is_none()
    }
}

type Responder = dyn Fn(&RecordedRequest) -> HttpResponse + Send + Sync;

/// Transport that keeps every request and answers with `responder`.
#[derive(Clone)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(s3_response)
    }
}

impl MockTransport {
    pub fn new(responder: impl Fn(&RecordedRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
        Self {
            requests: Arc::default(),
            responder: Arc::new(responder),
        }
    }

    /// A client sending through this transport with static credentials.
    pub fn client(&self) -> Client {
        ClientBuilder::new("http://localhost:9000".parse().unwrap())
            .provider(Some(StaticProvider::new("minioadmin", "minioadmin", None)))
            .transport(Arc::new(self.clone()))
            .build()
            .unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&RecordedRequest) -> bool) -> usize {
        self.requests.lock().iter().filter(|r| pred(r)).count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let body = request.body.collect().await?.to_bytes();
        let recorded = RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
        };
        let resp = (self.responder)(&recorded);
        self.requests.lock().push(recorded);
        Ok(resp)
    }
}

pub fn response(status: u16, body: &'static str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: Bytes::from_static(body.as_bytes()),
    }
}

fn with_etag(mut resp: HttpResponse, etag: &str) -> HttpResponse {
    if let Ok(v) = HeaderValue::from_str(&format!("\"{etag}\"")) {
        resp.headers.insert("etag", v);
    }
    resp
}

/// Answers the upload APIs the way a healthy S3 server does. Part ETags are
/// `etag-<part number>`.
pub fn s3_response(req: &RecordedRequest) -> HttpResponse {
    if req.is_initiate() {
        return response(
            200,
            "<InitiateMultipartUploadResult><Bucket>bucket</Bucket><Key>key</Key>\
             <UploadId>mock-upload-id</UploadId></InitiateMultipartUploadResult>",
        );
    }
    if req.is_complete() {
        return response(
            200,
            "<CompleteMultipartUploadResult><ETag>&quot;final-etag&quot;</ETag>\
             </CompleteMultipartUploadResult>",
        );
    }
    if req.is_abort() {
        return response(204, "");
    }
    match req.part_number() {
        Some(n) => with_etag(response(200, ""), &format!("etag-{n}")),
        None => with_etag(response(200, ""), "put-etag"),
    }
}

/// A `500 InternalError` response as sent by S3.
pub fn internal_error() -> HttpResponse {
    response(
        500,
        "<Error><Code>InternalError</Code><Message>We encountered an internal error.</Message>\
         <RequestId>req-1</RequestId></Error>",
    )
}
