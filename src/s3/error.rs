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

//! Error definitions for S3 upload operations
//!
//! Errors are grouped by where they originate:
//!
//! - [`ValidationErr`]: bad arguments, detected before any network call
//! - [`NetworkError`]: the request never produced an HTTP response
//! - [`S3ServerError`]: the server answered with a non-2xx status
//! - [`Error`]: the top-level error returned by every API, which also carries
//!   stream accounting failures and multipart session errors
//!
//! [`Error`] is [`Clone`] so that a finished upload can return its cached
//! outcome from repeated `close()` calls.

use crate::s3::upload::UploadState;
use crate::s3::utils::get_default_text;
use std::sync::Arc;
use thiserror::Error;
use xmltree::Element;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Error response returned by an S3 server in its XML body
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
    pub host_id: String,
    pub bucket_name: String,
    pub object_name: String,
}

impl ErrorResponse {
    pub fn parse(body: &[u8]) -> Result<ErrorResponse, ValidationErr> {
        let root = Element::parse(body).map_err(|e| ValidationErr::XmlError(e.to_string()))?;

        Ok(ErrorResponse {
            code: get_default_text(&root, "Code"),
            message: get_default_text(&root, "Message"),
            resource: get_default_text(&root, "Resource"),
            request_id: get_default_text(&root, "RequestId"),
            host_id: get_default_text(&root, "HostId"),
            bucket_name: get_default_text(&root, "BucketName"),
            object_name: get_default_text(&root, "Key"),
        })
    }
}

/// Argument and request validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErr {
    #[error("part size {0} is not supported; minimum allowed 5MiB")]
    InvalidMinPartSize(u64),

    #[error("part size {0} is not supported; maximum allowed 5GiB")]
    InvalidMaxPartSize(u64),

    #[error("object size {0} is not supported; maximum allowed 5TiB")]
    InvalidObjectSize(u64),

    #[error("valid part size must be provided when object size is unknown")]
    MissingPartSize,

    #[error(
        "object size {object_size} and part size {part_size} make more than {part_count} parts for upload"
    )]
    InvalidPartCount {
        object_size: u64,
        part_size: u64,
        part_count: u16,
    },

    #[error("invalid part number: {0}")]
    InvalidPartNumber(String),

    #[error("invalid upload ID: {0}")]
    InvalidUploadId(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("{0}")]
    EmptyParts(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("{0}")]
    UrlBuildError(String),

    #[error("max parallel requests must be at least 1")]
    InvalidParallelism,

    #[error("invalid buffer pool configuration: {0}")]
    InvalidBufferPool(String),

    #[error("XML error: {0}")]
    XmlError(String),

    #[error("invalid header value: {0}")]
    StrError(String),
}

/// Failures below the HTTP layer: connection, TLS, timeouts.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    ReqwestError(Arc<reqwest::Error>),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::ReqwestError(Arc::new(err))
    }
}

/// Non-2xx HTTP responses.
#[derive(Error, Debug, Clone)]
pub enum S3ServerError {
    #[error(
        "s3 operation failed; code: {}, message: {}, resource: {}, request_id: {}, host_id: {}, bucket_name: {}, object_name: {}",
        .0.code, .0.message, .0.resource, .0.request_id, .0.host_id, .0.bucket_name, .0.object_name
    )]
    S3Error(Box<ErrorResponse>),

    #[error("server failed with HTTP status code {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid response received; status code: {0}; {1}")]
    InvalidResponse(u16, String),
}

/// Top-level error returned by all APIs of this crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationErr),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("S3 server error: {0}")]
    S3Server(#[from] S3ServerError),

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("not enough data in the stream; expected: {expected}, got: {got} bytes")]
    InsufficientData { expected: u64, got: u64 },

    #[error("too much data in the stream - exceeds {0} bytes")]
    TooMuchData(u64),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("upload is {0}; no further operations are accepted")]
    UploadTerminated(UploadState),

    #[error("{cause}; abort multipart upload also failed: {abort}")]
    AbortFailed { cause: Box<Error>, abort: Box<Error> },
}

impl Error {
    /// Returns the error that terminated an upload, looking through
    /// [`Error::AbortFailed`] to the original failure.
    pub fn cause(&self) -> &Error {
        match self {
            Error::AbortFailed { cause, .. } => cause.cause(),
            e => e,
        }
    }

    /// Returns the S3 error code if this error came from an S3 error response.
    pub fn s3_code(&self) -> Option<&str> {
        match self.cause() {
            Error::S3Server(S3ServerError::S3Error(er)) => Some(er.code.as_str()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(NetworkError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_response() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchUpload</Code><Message>The specified multipart upload does not exist.</Message><Resource>/bucket/object</Resource><RequestId>17A2</RequestId><HostId>dd9025</HostId><BucketName>bucket</BucketName><Key>object</Key></Error>"#;
        let er = ErrorResponse::parse(body).unwrap();
        assert_eq!(er.code, "NoSuchUpload");
        assert_eq!(er.bucket_name, "bucket");
        assert_eq!(er.object_name, "object");
        assert_eq!(er.request_id, "17A2");
    }

    #[test]
    fn abort_failed_exposes_original_cause() {
        let original = Error::S3Server(S3ServerError::HttpStatus {
            status: 503,
            body: String::new(),
        });
        let e = Error::AbortFailed {
            cause: Box::new(original),
            abort: Box::new(Error::Network(NetworkError::Transport("reset".into()))),
        };
        assert!(matches!(
            e.cause(),
            Error::S3Server(S3ServerError::HttpStatus { status: 503, .. })
        ));
        assert!(e.to_string().contains("abort multipart upload also failed"));
    }
}
