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

pub const CONTENT_MD5: &str = "Content-MD5";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const AUTHORIZATION: &str = "Authorization";
pub const HOST: &str = "Host";
pub const USER_AGENT: &str = "User-Agent";
pub const ETAG: &str = "etag";

pub const X_AMZ_DATE: &str = "x-amz-date";

pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

pub const X_AMZ_DECODED_CONTENT_LENGTH: &str = "x-amz-decoded-content-length";

pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

pub const X_AMZ_VERSION_ID: &str = "x-amz-version-id";

pub const X_AMZ_REQUEST_ID: &str = "x-amz-request-id";

pub const X_AMZ_CHECKSUM_ALGORITHM: &str = "x-amz-checksum-algorithm";

pub const X_AMZ_META_PREFIX: &str = "x-amz-meta-";

/// `x-amz-content-sha256` value for chunk-signed request bodies.
pub const STREAMING_AWS4_HMAC_SHA256_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";

pub const AWS_CHUNKED: &str = "aws-chunked";
