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

//! Core traits for S3 request and response handling.

use super::s3_request::S3Request;
use super::{PartInfo, UploadTarget, WrittenObject};
use crate::s3::client::HttpResponse;
use crate::s3::error::{Error, ValidationErr};
use crate::s3::segmented_bytes::SegmentedBytes;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for converting a request builder into a concrete S3 HTTP request.
///
/// The [`S3Api::send`] method uses this trait to convert request builders
/// into executable HTTP requests before sending them to the S3-compatible
/// service.
pub trait ToS3Request: Sized {
    /// Consumes this request builder and returns a [`S3Request`].
    ///
    /// Arguments are validated here, so an invalid builder fails before any
    /// network call is made.
    fn to_s3request(self) -> Result<S3Request, ValidationErr>;
}

/// Trait for converting HTTP responses into strongly typed S3 response objects.
#[async_trait]
pub trait FromS3Response: Sized {
    /// Converts the result of executing `s3req` into a typed response.
    async fn from_s3response(
        s3req: S3Request,
        response: Result<HttpResponse, Error>,
    ) -> Result<Self, Error>;
}

/// Trait that defines a common interface for all S3 API request builders.
#[async_trait]
pub trait S3Api: ToS3Request {
    /// The response type associated with this request builder.
    type S3Response: FromS3Response;

    /// Sends the S3 API request and returns the corresponding typed response.
    async fn send(self) -> Result<Self::S3Response, Error> {
        let mut req: S3Request = self.to_s3request()?;
        let resp: Result<HttpResponse, Error> = req.execute().await;
        Self::S3Response::from_s3response(req, resp).await
    }
}

/// The multipart upload operations an upload session is driven through.
///
/// [`Client`](crate::s3::client::Client) implements this trait on top of the
/// request builders; tests substitute in-memory fakes.
#[async_trait]
pub trait MultipartApi: Debug + Send + Sync {
    /// Starts a multipart upload and returns its upload ID.
    async fn create_multipart_upload(&self, target: &UploadTarget) -> Result<String, Error>;

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: u16,
        data: SegmentedBytes,
    ) -> Result<PartInfo, Error>;

    /// Stitches `parts`, sorted by part number, into the final object.
    async fn complete_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: Vec<PartInfo>,
    ) -> Result<WrittenObject, Error>;

    async fn abort_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), Error>;

    /// Uploads a whole object with one request.
    async fn put_object(
        &self,
        target: &UploadTarget,
        data: SegmentedBytes,
    ) -> Result<WrittenObject, Error>;
}
