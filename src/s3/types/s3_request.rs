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

//! S3Request struct and implementation for executing HTTP requests.

use crate::s3::client::{Client, HttpResponse};
use crate::s3::error::Error;
use crate::s3::multimap_ext::Multimap;
use crate::s3::segmented_bytes::SegmentedBytes;
use crate::s3::utils::ChecksumAlgorithm;
use http::Method;
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, TypedBuilder)]
/// Generic S3Request
pub struct S3Request {
    #[builder(!default)] // force required
    pub(crate) client: Client,

    #[builder(!default)] // force required
    method: Method,

    #[builder(default)]
    region: Option<String>,

    #[builder(setter(into))]
    pub(crate) bucket: String,

    #[builder(setter(into))]
    pub(crate) object: String,

    #[builder(default)]
    pub(crate) query_params: Multimap,

    #[builder(default)]
    headers: Multimap,

    #[builder(default, setter(into))]
    body: Option<SegmentedBytes>,

    /// Sends the body as a chunk-signed `aws-chunked` stream.
    #[builder(default = false)]
    pub(crate) signed_streaming: bool,

    /// Checksum algorithm whose `x-amz-checksum-*` header the response is
    /// expected to echo.
    #[builder(default)]
    pub(crate) checksum_algorithm: Option<ChecksumAlgorithm>,

    /// region computed by [`S3Request::execute`]
    #[builder(default, setter(skip))]
    pub(crate) inner_region: String,
}

impl S3Request {
    /// Execute the request, returning the response. Only used in [`S3Api::send()`](super::S3Api::send)
    pub async fn execute(&mut self) -> Result<HttpResponse, Error> {
        self.inner_region = self.client.resolve_region(self.region.as_deref());

        self.client
            .execute(
                self.method.clone(),
                &self.inner_region,
                &mut self.headers,
                &self.query_params,
                &self.bucket,
                &self.object,
                self.body.take(),
                self.signed_streaming,
            )
            .await
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Headers as sent, including the signature once executed.
    pub fn headers(&self) -> &Multimap {
        &self.headers
    }
}
