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

use bytes::BytesMut;
use http::Method;
use typed_builder::TypedBuilder;

use crate::s3::client::Client;
use crate::s3::error::ValidationErr;
use crate::s3::header_constants::*;
use crate::s3::multimap_ext::{Multimap, MultimapExt};
use crate::s3::response::{
    AbortMultipartUploadResponse, CompleteMultipartUploadResponse, CreateMultipartUploadResponse,
    PutObjectResponse, UploadPartResponse,
};
use crate::s3::segmented_bytes::SegmentedBytes;
use crate::s3::types::{PartInfo, S3Api, S3Request, ToS3Request};
use crate::s3::upload::MAX_MULTIPART_COUNT;
use crate::s3::utils::{ChecksumAlgorithm, check_object_args, compute_checksum_sb, md5sum_hash};

fn check_upload_id(upload_id: &str) -> Result<(), ValidationErr> {
    if upload_id.is_empty() {
        return Err(ValidationErr::InvalidUploadId(
            "upload ID cannot be empty".into(),
        ));
    }
    Ok(())
}

fn query_with(extra_query_params: Option<Multimap>, key: &str, value: &str) -> Multimap {
    let mut query_params = extra_query_params.unwrap_or_default();
    query_params.add(key, value);
    query_params
}

/// Headers of a request carrying object data, with the body checksum when requested.
fn data_headers(
    extra_headers: Option<Multimap>,
    checksum_algorithm: Option<ChecksumAlgorithm>,
    data: &SegmentedBytes,
) -> Multimap {
    let mut headers = extra_headers.unwrap_or_default();
    if let Some(algorithm) = checksum_algorithm {
        headers.add(algorithm.header_name(), compute_checksum_sb(algorithm, data));
    }
    headers
}

// region: create-multipart-upload

/// Argument builder for the [`CreateMultipartUpload`](https://docs.aws.amazon.com/AmazonS3/latest/API/API_CreateMultipartUpload.html) S3 API operation.
///
/// This struct constructs the parameters required for the [`Client::create_multipart_upload`](crate::s3::client::Client::create_multipart_upload) method.
#[derive(Clone, Debug, TypedBuilder)]
pub struct CreateMultipartUpload {
    #[builder(!default)] // force required
    client: Client,
    /// Headers the object is created with, such as content type and user metadata.
    #[builder(default, setter(into))]
    extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    extra_query_params: Option<Multimap>,
    #[builder(default, setter(into))]
    region: Option<String>,
    #[builder(setter(into))] // force required + accept Into<String>
    bucket: String,
    #[builder(setter(into))] // force required + accept Into<String>
    object: String,
    /// Algorithm every part will carry a checksum of.
    #[builder(default)]
    checksum_algorithm: Option<ChecksumAlgorithm>,
}

/// Builder type alias for [`CreateMultipartUpload`].
///
/// Constructed via [`CreateMultipartUpload::builder()`](CreateMultipartUpload::builder) and used to build a [`CreateMultipartUpload`] instance.
pub type CreateMultipartUploadBldr =
    CreateMultipartUploadBuilder<((Client,), (), (), (), (String,), (String,), ())>;

impl S3Api for CreateMultipartUpload {
    type S3Response = CreateMultipartUploadResponse;
}

impl ToS3Request for CreateMultipartUpload {
    fn to_s3request(self) -> Result<S3Request, ValidationErr> {
        check_object_args(&self.bucket, &self.object)?;

        let mut headers = self.extra_headers.unwrap_or_default();
        if let Some(algorithm) = self.checksum_algorithm {
            headers.add(X_AMZ_CHECKSUM_ALGORITHM, algorithm.as_str());
        }

        Ok(S3Request::builder()
            .client(self.client)
            .method(Method::POST)
            .region(self.region)
            .bucket(self.bucket)
            .object(self.object)
            .query_params(query_with(self.extra_query_params, "uploads", ""))
            .headers(headers)
            .build())
    }
}

// endregion: create-multipart-upload

// region: upload-part

/// Argument builder for the [`UploadPart`](https://docs.aws.amazon.com/AmazonS3/latest/API/API_UploadPart.html) S3 API operation.
///
/// This struct constructs the parameters required for the [`Client::upload_part`](crate::s3::client::Client::upload_part) method.
#[derive(Clone, Debug, TypedBuilder)]
pub struct UploadPart {
    #[builder(!default)] // force required
    client: Client,
    #[builder(default, setter(into))]
    extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    extra_query_params: Option<Multimap>,
    #[builder(default, setter(into))]
    region: Option<String>,
    #[builder(setter(into))] // force required + accept Into<String>
    bucket: String,
    #[builder(setter(into))] // force required + accept Into<String>
    object: String,
    #[builder(setter(into))] // force required + accept Into<String>
    upload_id: String,
    /// 1-based part number, at most 10000
    #[builder(!default)]
    part_number: u16,
    #[builder(!default, setter(into))]
    data: SegmentedBytes,
    #[builder(default)]
    checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Send the part as a chunk-signed `aws-chunked` stream.
    #[builder(default = false)]
    signed_streaming: bool,
}

/// Builder type alias for [`UploadPart`].
///
/// Constructed via [`UploadPart::builder()`](UploadPart::builder) and used to build a [`UploadPart`] instance.
pub type UploadPartBldr = UploadPartBuilder<(
    (Client,),
    (),
    (),
    (),
    (String,),
    (String,),
    (String,),
    (u16,),
    (SegmentedBytes,),
    (),
    (),
)>;

impl S3Api for UploadPart {
    type S3Response = UploadPartResponse;
}

impl ToS3Request for UploadPart {
    fn to_s3request(self) -> Result<S3Request, ValidationErr> {
        check_object_args(&self.bucket, &self.object)?;
        check_upload_id(&self.upload_id)?;

        if self.part_number < 1 || self.part_number > MAX_MULTIPART_COUNT {
            return Err(ValidationErr::InvalidPartNumber(format!(
                "part number must be between 1 and {MAX_MULTIPART_COUNT}; got {}",
                self.part_number
            )));
        }

        let headers = data_headers(self.extra_headers, self.checksum_algorithm, &self.data);

        let mut query_params = query_with(self.extra_query_params, "uploadId", &self.upload_id);
        query_params.add("partNumber", self.part_number.to_string());

        Ok(S3Request::builder()
            .client(self.client)
            .method(Method::PUT)
            .region(self.region)
            .bucket(self.bucket)
            .object(self.object)
            .query_params(query_params)
            .headers(headers)
            .body(self.data)
            .signed_streaming(self.signed_streaming)
            .checksum_algorithm(self.checksum_algorithm)
            .build())
    }
}

// endregion: upload-part

// region: complete-multipart-upload

/// Argument builder for the [`CompleteMultipartUpload`](https://docs.aws.amazon.com/AmazonS3/latest/API/API_CompleteMultipartUpload.html) S3 API operation.
///
/// This struct constructs the parameters required for the [`Client::complete_multipart_upload`](crate::s3::client::Client::complete_multipart_upload) method.
#[derive(Clone, Debug, TypedBuilder)]
pub struct CompleteMultipartUpload {
    #[builder(!default)] // force required
    client: Client,
    #[builder(default, setter(into))]
    extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    extra_query_params: Option<Multimap>,
    #[builder(default, setter(into))]
    region: Option<String>,
    #[builder(setter(into))] // force required + accept Into<String>
    bucket: String,
    #[builder(setter(into))] // force required + accept Into<String>
    object: String,
    #[builder(setter(into))] // force required + accept Into<String>
    upload_id: String,
    /// Uploaded parts in ascending part number order
    #[builder(!default)]
    parts: Vec<PartInfo>,
    /// Algorithm whose per-part checksums are listed in the request body.
    #[builder(default)]
    checksum_algorithm: Option<ChecksumAlgorithm>,
}

/// Builder type alias for [`CompleteMultipartUpload`].
///
/// Constructed via [`CompleteMultipartUpload::builder()`](CompleteMultipartUpload::builder) and used to build a [`CompleteMultipartUpload`] instance.
pub type CompleteMultipartUploadBldr = CompleteMultipartUploadBuilder<(
    (Client,),
    (),
    (),
    (),
    (String,),
    (String,),
    (String,),
    (Vec<PartInfo>,),
    (),
)>;

impl S3Api for CompleteMultipartUpload {
    type S3Response = CompleteMultipartUploadResponse;
}

impl CompleteMultipartUpload {
    fn xml_body(&self) -> bytes::Bytes {
        // Set capacity of the byte-buffer based on the part count - attempting
        // to avoid extra allocations when building the XML payload.
        let mut data = BytesMut::with_capacity(160 * self.parts.len() + 100);
        data.extend_from_slice(b"<CompleteMultipartUpload>");
        for part in self.parts.iter() {
            data.extend_from_slice(b"<Part><PartNumber>");
            data.extend_from_slice(part.number.to_string().as_bytes());
            data.extend_from_slice(b"</PartNumber><ETag>");
            data.extend_from_slice(part.etag.as_bytes());
            data.extend_from_slice(b"</ETag>");
            if let (Some(algorithm), Some(checksum)) = (self.checksum_algorithm, &part.checksum) {
                let tag = algorithm.xml_tag();
                data.extend_from_slice(format!("<{tag}>{checksum}</{tag}>").as_bytes());
            }
            data.extend_from_slice(b"</Part>");
        }
        data.extend_from_slice(b"</CompleteMultipartUpload>");
        data.freeze()
    }
}

impl ToS3Request for CompleteMultipartUpload {
    fn to_s3request(self) -> Result<S3Request, ValidationErr> {
        check_object_args(&self.bucket, &self.object)?;
        check_upload_id(&self.upload_id)?;

        if self.parts.is_empty() {
            return Err(ValidationErr::EmptyParts("parts cannot be empty".into()));
        }
        if let Some(w) = self.parts.windows(2).find(|w| w[0].number >= w[1].number) {
            return Err(ValidationErr::InvalidPartNumber(format!(
                "parts must be in ascending order; part {} follows part {}",
                w[1].number, w[0].number
            )));
        }

        let data = self.xml_body();

        let mut headers = self.extra_headers.unwrap_or_default();
        headers.add(CONTENT_TYPE, "application/xml");
        headers.add(CONTENT_MD5, md5sum_hash(data.as_ref()));

        Ok(S3Request::builder()
            .client(self.client)
            .method(Method::POST)
            .region(self.region)
            .bucket(self.bucket)
            .object(self.object)
            .query_params(query_with(self.extra_query_params, "uploadId", &self.upload_id))
            .headers(headers)
            .body(SegmentedBytes::from(data))
            .build())
    }
}

// endregion: complete-multipart-upload

// region: abort-multipart-upload

/// Argument builder for the [`AbortMultipartUpload`](https://docs.aws.amazon.com/AmazonS3/latest/API/API_AbortMultipartUpload.html) S3 API operation.
///
/// This struct constructs the parameters required for the [`Client::abort_multipart_upload`](crate::s3::client::Client::abort_multipart_upload) method.
#[derive(Clone, Debug, TypedBuilder)]
pub struct AbortMultipartUpload {
    #[builder(!default)] // force required
    client: Client,
    #[builder(default, setter(into))]
    extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    extra_query_params: Option<Multimap>,
    #[builder(default, setter(into))]
    region: Option<String>,
    #[builder(setter(into))] // force required + accept Into<String>
    bucket: String,
    #[builder(setter(into))] // force required + accept Into<String>
    object: String,
    #[builder(setter(into))] // force required + accept Into<String>
    upload_id: String,
}

/// Builder type alias for [`AbortMultipartUpload`].
///
/// Constructed via [`AbortMultipartUpload::builder()`](AbortMultipartUpload::builder) and used to build a [`AbortMultipartUpload`] instance.
pub type AbortMultipartUploadBldr =
    AbortMultipartUploadBuilder<((Client,), (), (), (), (String,), (String,), (String,))>;

impl S3Api for AbortMultipartUpload {
    type S3Response = AbortMultipartUploadResponse;
}

impl ToS3Request for AbortMultipartUpload {
    fn to_s3request(self) -> Result<S3Request, ValidationErr> {
        check_object_args(&self.bucket, &self.object)?;
        check_upload_id(&self.upload_id)?;

        Ok(S3Request::builder()
            .client(self.client)
            .method(Method::DELETE)
            .region(self.region)
            .bucket(self.bucket)
            .object(self.object)
            .query_params(query_with(self.extra_query_params, "uploadId", &self.upload_id))
            .headers(self.extra_headers.unwrap_or_default())
            .build())
    }
}

// endregion: abort-multipart-upload

// region: put-object

/// Argument builder for the [`PutObject`](https://docs.aws.amazon.com/AmazonS3/latest/API/API_PutObject.html) S3 API operation.
///
/// Sends the whole object with one request. For data of unknown or large
/// size use [`Client::put_object_content`](crate::s3::client::Client::put_object_content).
#[derive(Clone, Debug, TypedBuilder)]
pub struct PutObject {
    #[builder(!default)] // force required
    client: Client,
    /// Headers the object is created with, such as content type and user metadata.
    #[builder(default, setter(into))]
    extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    extra_query_params: Option<Multimap>,
    #[builder(default, setter(into))]
    region: Option<String>,
    #[builder(setter(into))] // force required + accept Into<String>
    bucket: String,
    #[builder(setter(into))] // force required + accept Into<String>
    object: String,
    #[builder(!default, setter(into))]
    data: SegmentedBytes,
    #[builder(default)]
    checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Send the body as a chunk-signed `aws-chunked` stream.
    #[builder(default = false)]
    signed_streaming: bool,
}

/// Builder type alias for [`PutObject`].
///
/// Constructed via [`PutObject::builder()`](PutObject::builder) and used to build a [`PutObject`] instance.
pub type PutObjectBldr = PutObjectBuilder<(
    (Client,),
    (),
    (),
    (),
    (String,),
    (String,),
    (SegmentedBytes,),
    (),
    (),
)>;

impl S3Api for PutObject {
    type S3Response = PutObjectResponse;
}

impl ToS3Request for PutObject {
    fn to_s3request(self) -> Result<S3Request, ValidationErr> {
        check_object_args(&self.bucket, &self.object)?;

        let headers = data_headers(self.extra_headers, self.checksum_algorithm, &self.data);

        Ok(S3Request::builder()
            .client(self.client)
            .method(Method::PUT)
            .region(self.region)
            .bucket(self.bucket)
            .object(self.object)
            .query_params(self.extra_query_params.unwrap_or_default())
            .headers(headers)
            .body(self.data)
            .signed_streaming(self.signed_streaming)
            .checksum_algorithm(self.checksum_algorithm)
            .build())
    }
}

// endregion: put-object

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::client::ClientBuilder;

    fn client() -> Client {
        ClientBuilder::new("http://localhost:9000".parse().unwrap())
            .build()
            .unwrap()
    }

    fn part(number: u16, etag: &str, checksum: Option<&str>) -> PartInfo {
        PartInfo {
            number,
            etag: etag.into(),
            size: 5,
            checksum: checksum.map(str::to_string),
        }
    }

    #[test]
    fn upload_part_rejects_out_of_range_numbers() {
        for n in [0u16, MAX_MULTIPART_COUNT + 1] {
            let err = client()
                .upload_part("bucket", "key", "id", n, SegmentedBytes::from("x".to_string()))
                .build()
                .to_s3request()
                .unwrap_err();
            assert!(matches!(err, ValidationErr::InvalidPartNumber(_)));
        }
    }

    #[test]
    fn upload_part_sets_query_and_checksum() {
        let req = client()
            .upload_part("bucket", "key", "id-1", 3, SegmentedBytes::from("abc".to_string()))
            .checksum_algorithm(Some(ChecksumAlgorithm::CRC32))
            .build()
            .to_s3request()
            .unwrap();
        assert_eq!(req.query_params.get("partNumber").unwrap(), "3");
        assert_eq!(req.query_params.get("uploadId").unwrap(), "id-1");
        assert_eq!(req.headers().get("x-amz-checksum-crc32").unwrap(), "NSRBwg==");
    }

    #[test]
    fn complete_body_lists_parts_with_checksums() {
        let req = client()
            .complete_multipart_upload(
                "bucket",
                "key",
                "id-1",
                vec![part(1, "\"a\"", Some("c1")), part(2, "\"b\"", Some("c2"))],
            )
            .checksum_algorithm(Some(ChecksumAlgorithm::CRC32))
            .build();
        let body = req.xml_body();
        assert_eq!(
            body,
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>\"a\"</ETag><ChecksumCRC32>c1</ChecksumCRC32></Part>\
             <Part><PartNumber>2</PartNumber><ETag>\"b\"</ETag><ChecksumCRC32>c2</ChecksumCRC32></Part>\
             </CompleteMultipartUpload>"
        );

        let req = req.to_s3request().unwrap();
        assert_eq!(
            req.headers().get(CONTENT_MD5).unwrap(),
            &md5sum_hash(body.as_ref())
        );
    }

    #[test]
    fn complete_rejects_empty_and_unsorted_parts() {
        let err = client()
            .complete_multipart_upload("bucket", "key", "id", vec![])
            .build()
            .to_s3request()
            .unwrap_err();
        assert!(matches!(err, ValidationErr::EmptyParts(_)));

        let err = client()
            .complete_multipart_upload(
                "bucket",
                "key",
                "id",
                vec![part(2, "b", None), part(1, "a", None)],
            )
            .build()
            .to_s3request()
            .unwrap_err();
        assert!(matches!(err, ValidationErr::InvalidPartNumber(_)));
    }

    #[test]
    fn abort_requires_upload_id() {
        let err = client()
            .abort_multipart_upload("bucket", "key", "")
            .build()
            .to_s3request()
            .unwrap_err();
        assert!(matches!(err, ValidationErr::InvalidUploadId(_)));
    }

    #[test]
    fn create_multipart_upload_announces_checksum_algorithm() {
        let req = client()
            .create_multipart_upload("bucket", "key")
            .checksum_algorithm(Some(ChecksumAlgorithm::SHA256))
            .build()
            .to_s3request()
            .unwrap();
        assert!(req.query_params.contains_key("uploads"));
        assert_eq!(req.headers().get(X_AMZ_CHECKSUM_ALGORITHM).unwrap(), "SHA256");
        assert_eq!(req.method(), &Method::POST);
    }
}
