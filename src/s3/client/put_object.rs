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

use async_trait::async_trait;

use super::Client;
use crate::s3::builders::{
    AbortMultipartUpload, AbortMultipartUploadBldr, CompleteMultipartUpload,
    CompleteMultipartUploadBldr, CreateMultipartUpload, CreateMultipartUploadBldr, PutObject,
    PutObjectBldr, PutObjectContent, PutObjectContentBldr, UploadPart, UploadPartBldr,
};
use crate::s3::error::Error;
use crate::s3::object_content::ObjectContent;
use crate::s3::segmented_bytes::SegmentedBytes;
use crate::s3::types::{MultipartApi, PartInfo, S3Api, UploadTarget, WrittenObject};
use crate::s3::upload::{PutObjectOutputStream, UploadConfig};

impl Client {
    /// Creates a [`PutObject`] request builder. This is a lower-level API that
    /// uploads a whole object with a single request.
    ///
    /// To execute the request, call [`PutObject::send()`](crate::s3::types::S3Api::send),
    /// which returns a [`Result`] containing a [`PutObjectResponse`](crate::s3::response::PutObjectResponse).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s3_upload::s3::client::ClientBuilder;
    /// use s3_upload::s3::response::PutObjectResponse;
    /// use s3_upload::s3::segmented_bytes::SegmentedBytes;
    /// use s3_upload::s3::types::S3Api;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = ClientBuilder::new("http://localhost:9000".parse().unwrap()).build().unwrap();
    ///     let data = SegmentedBytes::from("Hello world".to_string());
    ///     let resp: PutObjectResponse = client
    ///         .put_object("bucket-name", "object-name", data)
    ///         .build().send().await.unwrap();
    ///     println!("successfully put object '{}'", resp.object);
    /// }
    /// ```
    pub fn put_object<S1: Into<String>, S2: Into<String>>(
        &self,
        bucket: S1,
        object: S2,
        data: SegmentedBytes,
    ) -> PutObjectBldr {
        PutObject::builder()
            .client(self.clone())
            .bucket(bucket)
            .object(object)
            .data(data)
    }

    /// Creates a [`CreateMultipartUpload`] request builder that starts a
    /// multipart upload.
    pub fn create_multipart_upload<S1: Into<String>, S2: Into<String>>(
        &self,
        bucket: S1,
        object: S2,
    ) -> CreateMultipartUploadBldr {
        CreateMultipartUpload::builder()
            .client(self.clone())
            .bucket(bucket)
            .object(object)
    }

    /// Creates an [`UploadPart`] request builder for part `part_number`
    /// (1 to 10000) of the upload `upload_id`.
    pub fn upload_part<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        &self,
        bucket: S1,
        object: S2,
        upload_id: S3,
        part_number: u16,
        data: SegmentedBytes,
    ) -> UploadPartBldr {
        UploadPart::builder()
            .client(self.clone())
            .bucket(bucket)
            .object(object)
            .upload_id(upload_id)
            .part_number(part_number)
            .data(data)
    }

    pub fn complete_multipart_upload<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        &self,
        bucket: S1,
        object: S2,
        upload_id: S3,
        parts: Vec<PartInfo>,
    ) -> CompleteMultipartUploadBldr {
        CompleteMultipartUpload::builder()
            .client(self.clone())
            .bucket(bucket)
            .object(object)
            .upload_id(upload_id)
            .parts(parts)
    }

    pub fn abort_multipart_upload<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        &self,
        bucket: S1,
        object: S2,
        upload_id: S3,
    ) -> AbortMultipartUploadBldr {
        AbortMultipartUpload::builder()
            .client(self.clone())
            .bucket(bucket)
            .object(object)
            .upload_id(upload_id)
    }

    /// Creates a [`PutObjectContent`] request builder that uploads `content`.
    ///
    /// The content is streamed. Multipart uploads, parallel part uploads and
    /// aborting on failure are handled transparently.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s3_upload::s3::client::ClientBuilder;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = ClientBuilder::new("http://localhost:9000".parse().unwrap()).build().unwrap();
    ///     let resp = client
    ///         .put_object_content("bucket-name", "object-name", "Hello world")
    ///         .part_size(Some(5 * 1024 * 1024u64))
    ///         .build()
    ///         .send()
    ///         .await
    ///         .unwrap();
    ///     println!("uploaded {} bytes in {} parts", resp.object_size, resp.part_count);
    /// }
    /// ```
    pub fn put_object_content<S1: Into<String>, S2: Into<String>, C: Into<ObjectContent>>(
        &self,
        bucket: S1,
        object: S2,
        content: C,
    ) -> PutObjectContentBldr {
        PutObjectContent::builder()
            .client(self.clone())
            .bucket(bucket)
            .object(object)
            .input_content(content)
    }

    /// Opens a [`PutObjectOutputStream`] that uploads the bytes written to
    /// it as `bucket/object`.
    ///
    /// `object_size` is the exact number of bytes that will be written, or
    /// `None` if unknown, in which case `config.part_size` is required.
    pub fn put_object_stream<S1: Into<String>, S2: Into<String>>(
        &self,
        bucket: S1,
        object: S2,
        object_size: Option<u64>,
        config: UploadConfig,
    ) -> Result<PutObjectOutputStream, Error> {
        PutObjectOutputStream::new(Arc::new(self.clone()), bucket, object, object_size, config)
    }
}

#[async_trait]
impl MultipartApi for Client {
    async fn create_multipart_upload(&self, target: &UploadTarget) -> Result<String, Error> {
        let resp = Client::create_multipart_upload(self, &target.bucket, &target.object)
            .extra_headers(Some(target.headers.clone()))
            .region(target.region.clone())
            .checksum_algorithm(target.checksum_algorithm)
            .build()
            .send()
            .await?;
        Ok(resp.upload_id)
    }

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: u16,
        data: SegmentedBytes,
    ) -> Result<PartInfo, Error> {
        let size = data.len() as u64;
        let resp = Client::upload_part(
            self,
            &target.bucket,
            &target.object,
            upload_id,
            part_number,
            data,
        )
        .region(target.region.clone())
        .checksum_algorithm(target.checksum_algorithm)
        .signed_streaming(target.signed_streaming)
        .build()
        .send()
        .await?;

        Ok(PartInfo {
            number: part_number,
            etag: resp.etag,
            size,
            checksum: resp.checksum,
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: Vec<PartInfo>,
    ) -> Result<WrittenObject, Error> {
        let resp =
            Client::complete_multipart_upload(self, &target.bucket, &target.object, upload_id, parts)
                .region(target.region.clone())
                .checksum_algorithm(target.checksum_algorithm)
                .build()
                .send()
                .await?;
        Ok(WrittenObject {
            etag: resp.etag,
            version_id: resp.version_id,
        })
    }

    async fn abort_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), Error> {
        Client::abort_multipart_upload(self, &target.bucket, &target.object, upload_id)
            .region(target.region.clone())
            .build()
            .send()
            .await?;
        Ok(())
    }

    async fn put_object(
        &self,
        target: &UploadTarget,
        data: SegmentedBytes,
    ) -> Result<WrittenObject, Error> {
        let resp = Client::put_object(self, &target.bucket, &target.object, data)
            .extra_headers(Some(target.headers.clone()))
            .region(target.region.clone())
            .checksum_algorithm(target.checksum_algorithm)
            .signed_streaming(target.signed_streaming)
            .build()
            .send()
            .await?;
        Ok(WrittenObject {
            etag: resp.etag,
            version_id: resp.version_id,
        })
    }
}
