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

//! Core types for S3 upload operations

mod s3_request;
mod traits;

pub use s3_request::S3Request;
pub use traits::{FromS3Response, MultipartApi, S3Api, ToS3Request};

use crate::s3::multimap_ext::Multimap;
use crate::s3::utils::ChecksumAlgorithm;

/// A successfully uploaded part of a multipart upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartInfo {
    /// 1-based part number
    pub number: u16,
    pub etag: String,
    pub size: u64,
    /// Base64 encoded checksum when the upload uses a checksum algorithm
    pub checksum: Option<String>,
}

/// Identity of a written object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrittenObject {
    pub etag: String,
    pub version_id: Option<String>,
}

/// Where an upload goes and the options shared by all of its requests.
///
/// `headers` (content type, user metadata, extra headers) are sent with the
/// request that creates the object: the initiate request of a multipart
/// upload or the single direct PUT.
#[derive(Clone, Debug, Default)]
pub struct UploadTarget {
    pub bucket: String,
    pub object: String,
    pub region: Option<String>,
    pub headers: Multimap,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Send part bodies with per-chunk signatures
    pub signed_streaming: bool,
}

impl UploadTarget {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            ..Default::default()
        }
    }
}
