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

use bytes::Bytes;

use super::coordinator::{MultipartUploadCoordinator, UploadConfig, UploadSession};
use super::{PooledBuffer, UploadState, check_object_size, plan};
use crate::s3::error::Error;
use crate::s3::response::PutObjectContentResponse;
use crate::s3::types::MultipartApi;

/// Writes an object sequentially, uploading it part by part.
///
/// Bytes are buffered until a whole part is available, which is then handed
/// to a [`MultipartUploadCoordinator`] while writing continues. A full
/// buffer is only sent once more data follows, so an object that turns out
/// to fit in one part is uploaded with a single PUT. [`close`](Self::close)
/// sends the remaining bytes and completes the upload.
///
/// With a known object size, writing past it fails with
/// [`Error::TooMuchData`] and closing before it is reached fails with
/// [`Error::InsufficientData`]; both abort the upload. Any object growing
/// past [`MAX_OBJECT_SIZE`](super::MAX_OBJECT_SIZE) fails the same way.
///
/// # Example
///
/// ```no_run
/// use s3_upload::s3::client::Client;
/// use s3_upload::s3::upload::UploadConfig;
///
/// # async fn example(client: Client) -> Result<(), s3_upload::s3::error::Error> {
/// let config = UploadConfig::builder().part_size(5 * 1024 * 1024u64).build();
/// let mut stream = client.put_object_stream("bucket", "logs/app.log", None, config)?;
/// stream.write(b"first line\n").await?;
/// stream.write(b"second line\n").await?;
/// let resp = stream.close().await?;
/// println!("uploaded {} bytes, etag {}", resp.object_size, resp.etag);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PutObjectOutputStream {
    coordinator: MultipartUploadCoordinator,
    object_size: Option<u64>,
    buffer: Option<PooledBuffer>,
    bytes_written: u64,
}

impl PutObjectOutputStream {
    /// Plans the upload of `object_size` bytes (`None` if unknown).
    ///
    /// Fails without any network call if the sizes or options are invalid.
    pub fn new(
        api: Arc<dyn MultipartApi>,
        bucket: impl Into<String>,
        object: impl Into<String>,
        object_size: Option<u64>,
        config: UploadConfig,
    ) -> Result<Self, Error> {
        let plan = plan(object_size, config.part_size)?;
        let coordinator = MultipartUploadCoordinator::new(api, bucket, object, plan, &config)?;
        Ok(Self {
            coordinator,
            object_size,
            buffer: None,
            bytes_written: 0,
        })
    }

    /// Appends `data` to the object, waiting while the parallel part
    /// upload limit is reached.
    pub async fn write(&mut self, mut data: &[u8]) -> Result<(), Error> {
        self.coordinator.ensure_writable().await?;
        if data.is_empty() {
            return Ok(());
        }

        if let Some(size) = self.object_size
            && self.bytes_written + data.len() as u64 > size
        {
            return Err(self.coordinator.fail(Error::TooMuchData(size)).await);
        }
        // Streams of unknown size are capped here.
        if let Err(e) = check_object_size(self.bytes_written.saturating_add(data.len() as u64)) {
            return Err(self.coordinator.fail(e.into()).await);
        }
        if self.coordinator.plan().part_count.is_some_and(|n| n > 1) {
            self.coordinator.start();
        }

        while !data.is_empty() {
            if self.buffer.as_ref().is_some_and(PooledBuffer::is_full)
                && let Some(full) = self.buffer.take()
            {
                self.coordinator.submit_part(full.freeze()).await?;
            }

            let pool = self.coordinator.buffer_pool();
            let buffer = self.buffer.get_or_insert_with(|| pool.take());
            let n = buffer.fill(data);
            data = &data[n..];
            self.bytes_written += n as u64;
        }
        Ok(())
    }

    /// Uploads the buffered bytes and completes the upload.
    ///
    /// Closing again returns the first outcome without sending anything.
    pub async fn close(&mut self) -> Result<PutObjectContentResponse, Error> {
        if let Some(result) = self.coordinator.cached_result() {
            return result.clone();
        }

        if let Some(size) = self.object_size
            && self.bytes_written < size
        {
            let err = Error::InsufficientData {
                expected: size,
                got: self.bytes_written,
            };
            self.coordinator.fail(err).await;
        }

        let tail = self
            .buffer
            .take()
            .map(PooledBuffer::freeze)
            .unwrap_or_else(Bytes::new);
        self.coordinator.complete(tail).await
    }

    /// Discards buffered data and aborts the upload.
    pub async fn abort(&mut self) -> Result<(), Error> {
        self.buffer = None;
        self.coordinator.abort().await
    }

    /// Terminates the upload with `err`, e.g. when the data source fails,
    /// and returns the resulting error.
    pub async fn fail(&mut self, err: Error) -> Error {
        self.buffer = None;
        self.coordinator.fail(err).await
    }

    /// Number of bytes accepted by [`write`](Self::write) so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn state(&self) -> UploadState {
        self.coordinator.state()
    }

    /// Number of parts uploaded so far.
    pub fn part_count(&self) -> u16 {
        self.coordinator.session().part_count()
    }

    pub fn session(&self) -> &UploadSession {
        self.coordinator.session()
    }
}
