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

//! # s3-upload
//!
//! Async multipart and streaming uploads to Amazon S3 compatible object
//! storage.
//!
//! Each S3 operation used by an upload has a request builder (e.g.
//! [`s3::builders::CreateMultipartUpload`], [`s3::builders::UploadPart`]),
//! configured with a fluent builder pattern. All request builders implement
//! the [`s3::types::S3Api`] trait, whose async
//! [`send`](crate::s3::types::S3Api::send) method executes the request and
//! returns a typed response.
//!
//! On top of them, [`s3::upload`] splits objects into parts, uploads the
//! parts in parallel under a concurrency limit, and completes the upload or
//! aborts it on the first failure.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use s3_upload::s3::ClientBuilder;
//! use s3_upload::s3::creds::StaticProvider;
//! use s3_upload::s3::upload::UploadConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = StaticProvider::new("minioadmin", "minioadmin", None);
//!     let client = ClientBuilder::new("http://localhost:9000".parse().unwrap())
//!         .provider(Some(provider))
//!         .build()
//!         .unwrap();
//!
//!     // Whole content, multipart handled transparently.
//!     let resp = client
//!         .put_object_content("my-bucket", "hello.txt", "Hello world")
//!         .build()
//!         .send()
//!         .await
//!         .expect("request failed");
//!     println!("etag: {}", resp.etag);
//!
//!     // Sequential writes of unknown total size.
//!     let config = UploadConfig::builder().part_size(8 * 1024 * 1024u64).build();
//!     let mut stream = client
//!         .put_object_stream("my-bucket", "big.bin", None, config)
//!         .unwrap();
//!     stream.write(&[0u8; 1024]).await.unwrap();
//!     let resp = stream.close().await.unwrap();
//!     println!("{} parts", resp.part_count);
//! }
//! ```
//!
//! ## Design
//! - Each API method on the [`s3::client::Client`] returns a builder struct
//! - Builders implement [`s3::types::ToS3Request`] for request conversion and [`s3::types::S3Api`] for execution
//! - Responses implement [`s3::types::FromS3Response`] for consistent deserialization
//! - Requests go through an [`s3::client::HttpTransport`], so tests can replace the network

#![allow(clippy::result_large_err)]
#![allow(clippy::too_many_arguments)]
pub mod s3;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;
