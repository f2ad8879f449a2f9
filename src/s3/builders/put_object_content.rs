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

use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::s3::client::Client;
use crate::s3::error::Error;
use crate::s3::multimap_ext::Multimap;
use crate::s3::object_content::ObjectContent;
use crate::s3::response::PutObjectContentResponse;
use crate::s3::upload::{DEFAULT_BUFFER_POOL_CAPACITY, PutObjectOutputStream, UploadConfig};
use crate::s3::utils::ChecksumAlgorithm;

/// Size of the reads from the content stream handed to the upload stream.
const READ_CHUNK_SIZE: usize = 1024 * 1024;

/// PutObjectContent takes an [`ObjectContent`] stream and uploads it to S3.
///
/// It is a higher level API and handles multipart uploads transparently:
/// content that fits in one part goes out as a single PUT, larger content is
/// split into parts uploaded in parallel, and a failed upload is aborted.
#[derive(Debug, TypedBuilder)]
pub struct PutObjectContent {
    #[builder(!default)] // force required
    client: Client,

    #[builder(default, setter(into))]
    extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    user_metadata: Option<Multimap>,
    #[builder(default, setter(into))]
    region: Option<String>,
    #[builder(setter(into))] // force required + accept Into<String>
    bucket: String,
    #[builder(setter(into))] // force required + accept Into<String>
    object: String,
    #[builder(setter(into))]
    input_content: ObjectContent,

    /// Part size; required when the content size is unknown.
    #[builder(default, setter(into))]
    part_size: Option<u64>,
    #[builder(default, setter(into))]
    content_type: Option<String>,
    #[builder(default, setter(into))]
    max_parallel_requests: Option<usize>,
    #[builder(default = DEFAULT_BUFFER_POOL_CAPACITY)]
    buffer_pool_capacity: usize,
    #[builder(default)]
    checksum_algorithm: Option<ChecksumAlgorithm>,
    #[builder(default = false)]
    signed_streaming: bool,
}

/// Builder type alias for [`PutObjectContent`].
///
/// Constructed via [`PutObjectContent::builder()`](PutObjectContent::builder) and used to build a [`PutObjectContent`] instance.
pub type PutObjectContentBldr = PutObjectContentBuilder<(
    (Client,),
    (),
    (),
    (),
    (String,),
    (String,),
    (ObjectContent,),
    (),
    (),
    (),
    (),
    (),
    (),
)>;

impl PutObjectContent {
    fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            part_size: self.part_size,
            max_parallel_requests: self.max_parallel_requests,
            buffer_pool_capacity: self.buffer_pool_capacity,
            checksum_algorithm: self.checksum_algorithm,
            signed_streaming: self.signed_streaming,
            content_type: self.content_type.clone(),
            user_metadata: self.user_metadata.clone(),
            extra_headers: self.extra_headers.clone(),
            region: self.region.clone(),
        }
    }

    /// Reads the whole content and uploads it.
    pub async fn send(self) -> Result<PutObjectContentResponse, Error> {
        let config = self.upload_config();
        let mut content = self.input_content.to_content_stream().await?;
        let size = content.get_size().value();

        let mut stream = PutObjectOutputStream::new(
            Arc::new(self.client),
            self.bucket,
            self.object,
            size,
            config,
        )?;

        loop {
            let data = match content.read_upto(READ_CHUNK_SIZE).await {
                Ok(v) => v,
                Err(e) => return Err(stream.fail(e.into()).await),
            };
            if data.is_empty() {
                break;
            }
            for bytes in data {
                stream.write(&bytes).await?;
            }
        }

        stream.close().await
    }
}
