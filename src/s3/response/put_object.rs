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

use async_trait::async_trait;
use http::HeaderMap;
use std::mem;
use xmltree::Element;

use crate::s3::client::HttpResponse;
use crate::s3::error::{Error, ErrorResponse, S3ServerError, ValidationErr};
use crate::s3::header_constants::*;
use crate::s3::types::{FromS3Response, S3Request};
use crate::s3::utils::{get_option_text, get_text, trim_quotes};

fn parse_xml(body: &[u8]) -> Result<Element, ValidationErr> {
    Element::parse(body).map_err(|e| ValidationErr::XmlError(e.to_string()))
}

fn etag_header(headers: &HeaderMap) -> String {
    headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(trim_quotes)
        .unwrap_or_default()
}

fn version_id_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_AMZ_VERSION_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Response of [put_object()](crate::s3::client::Client::put_object) API
#[derive(Debug, Clone)]
pub struct PutObjectResponse {
    pub headers: HeaderMap,
    pub bucket: String,
    pub object: String,
    pub region: String,
    pub etag: String,
    pub version_id: Option<String>,
}

#[async_trait]
impl FromS3Response for PutObjectResponse {
    async fn from_s3response(
        req: S3Request,
        resp: Result<HttpResponse, Error>,
    ) -> Result<Self, Error> {
        let mut resp = resp?;
        let headers: HeaderMap = mem::take(&mut resp.headers);

        Ok(PutObjectResponse {
            etag: etag_header(&headers),
            version_id: version_id_header(&headers),
            headers,
            bucket: req.bucket,
            object: req.object,
            region: req.inner_region,
        })
    }
}

/// Response of [create_multipart_upload()](crate::s3::client::Client::create_multipart_upload) API
#[derive(Debug, Clone)]
pub struct CreateMultipartUploadResponse {
    pub headers: HeaderMap,
    pub region: String,
    pub bucket: String,
    pub object: String,
    pub upload_id: String,
}

#[async_trait]
impl FromS3Response for CreateMultipartUploadResponse {
    async fn from_s3response(
        req: S3Request,
        resp: Result<HttpResponse, Error>,
    ) -> Result<Self, Error> {
        let mut resp = resp?;
        let headers: HeaderMap = mem::take(&mut resp.headers);
        let root = parse_xml(&resp.body)?;

        let upload_id: String = get_text(&root, "UploadId")?;
        if upload_id.is_empty() {
            return Err(S3ServerError::InvalidResponse(
                resp.status,
                "InitiateMultipartUploadResult carries an empty UploadId".into(),
            )
            .into());
        }

        Ok(CreateMultipartUploadResponse {
            headers,
            region: req.inner_region,
            bucket: req.bucket,
            object: req.object,
            upload_id,
        })
    }
}

/// Response of [upload_part()](crate::s3::client::Client::upload_part) API
#[derive(Debug, Clone)]
pub struct UploadPartResponse {
    pub headers: HeaderMap,
    pub region: String,
    pub bucket: String,
    pub object: String,
    pub etag: String,
    /// Part checksum echoed by the server, else the one sent with the part.
    pub checksum: Option<String>,
}

#[async_trait]
impl FromS3Response for UploadPartResponse {
    async fn from_s3response(
        req: S3Request,
        resp: Result<HttpResponse, Error>,
    ) -> Result<Self, Error> {
        let mut resp = resp?;
        let headers: HeaderMap = mem::take(&mut resp.headers);

        let etag = etag_header(&headers);
        if etag.is_empty() {
            return Err(S3ServerError::InvalidResponse(
                resp.status,
                "upload part response carries no ETag".into(),
            )
            .into());
        }

        let checksum = req.checksum_algorithm.and_then(|alg| {
            headers
                .get(alg.header_name())
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .or_else(|| {
                    req.headers()
                        .get(alg.header_name())
                        .map(|v| v.to_string())
                })
        });

        Ok(UploadPartResponse {
            headers,
            region: req.inner_region,
            bucket: req.bucket,
            object: req.object,
            etag,
            checksum,
        })
    }
}

/// Response of [complete_multipart_upload()](crate::s3::client::Client::complete_multipart_upload) API
#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadResponse {
    pub headers: HeaderMap,
    pub region: String,
    pub bucket: String,
    pub object: String,
    pub etag: String,
    pub version_id: Option<String>,
}

#[async_trait]
impl FromS3Response for CompleteMultipartUploadResponse {
    async fn from_s3response(
        req: S3Request,
        resp: Result<HttpResponse, Error>,
    ) -> Result<Self, Error> {
        let mut resp = resp?;
        let headers: HeaderMap = mem::take(&mut resp.headers);
        let root = parse_xml(&resp.body)?;

        // The server may report a failure inside a 200 response.
        if root.name == "Error" {
            let mut er = ErrorResponse::parse(&resp.body)?;
            if er.bucket_name.is_empty() {
                er.bucket_name = req.bucket.clone();
            }
            if er.object_name.is_empty() {
                er.object_name = req.object.clone();
            }
            return Err(S3ServerError::S3Error(Box::new(er)).into());
        }

        let etag = get_option_text(&root, "ETag")
            .map(|v| trim_quotes(&v))
            .unwrap_or_else(|| etag_header(&headers));

        Ok(CompleteMultipartUploadResponse {
            version_id: version_id_header(&headers),
            headers,
            region: req.inner_region,
            bucket: req.bucket,
            object: req.object,
            etag,
        })
    }
}

/// Response of [abort_multipart_upload()](crate::s3::client::Client::abort_multipart_upload) API
#[derive(Debug, Clone)]
pub struct AbortMultipartUploadResponse {
    pub headers: HeaderMap,
    pub region: String,
    pub bucket: String,
    pub object: String,
}

#[async_trait]
impl FromS3Response for AbortMultipartUploadResponse {
    async fn from_s3response(
        req: S3Request,
        resp: Result<HttpResponse, Error>,
    ) -> Result<Self, Error> {
        let mut resp = resp?;
        Ok(AbortMultipartUploadResponse {
            headers: mem::take(&mut resp.headers),
            region: req.inner_region,
            bucket: req.bucket,
            object: req.object,
        })
    }
}

/// Response of [put_object_content()](crate::s3::client::Client::put_object_content) API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectContentResponse {
    pub bucket: String,
    pub object: String,
    pub region: String,
    pub object_size: u64,
    pub etag: String,
    pub version_id: Option<String>,
    /// Number of parts written; 1 for an object sent with a single PUT.
    pub part_count: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::client::ClientBuilder;
    use crate::s3::multimap_ext::Multimap;
    use bytes::Bytes;
    use http::{HeaderValue, Method};

    fn request() -> S3Request {
        let client = ClientBuilder::new("http://localhost:9000".parse().unwrap())
            .build()
            .unwrap();
        S3Request::builder()
            .client(client)
            .method(Method::POST)
            .bucket("bucket")
            .object("key")
            .query_params(Multimap::new())
            .build()
    }

    #[tokio::test]
    async fn create_multipart_upload_reads_upload_id() {
        let resp = HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from_static(
                b"<InitiateMultipartUploadResult><Bucket>bucket</Bucket><Key>key</Key><UploadId>abc-123</UploadId></InitiateMultipartUploadResult>",
            ),
        };
        let r = CreateMultipartUploadResponse::from_s3response(request(), Ok(resp))
            .await
            .unwrap();
        assert_eq!(r.upload_id, "abc-123");
        assert_eq!(r.bucket, "bucket");
    }

    #[tokio::test]
    async fn complete_with_embedded_error_fails() {
        let resp = HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from_static(
                b"<Error><Code>InternalError</Code><Message>try again</Message></Error>",
            ),
        };
        let err = CompleteMultipartUploadResponse::from_s3response(request(), Ok(resp))
            .await
            .unwrap_err();
        assert_eq!(err.s3_code(), Some("InternalError"));
    }

    #[tokio::test]
    async fn complete_reads_etag_and_version() {
        let mut headers = HeaderMap::new();
        headers.insert(X_AMZ_VERSION_ID, HeaderValue::from_static("v1"));
        let resp = HttpResponse {
            status: 200,
            headers,
            body: Bytes::from_static(
                b"<CompleteMultipartUploadResult><ETag>&quot;abc-3&quot;</ETag></CompleteMultipartUploadResult>",
            ),
        };
        let r = CompleteMultipartUploadResponse::from_s3response(request(), Ok(resp))
            .await
            .unwrap();
        assert_eq!(r.etag, "abc-3");
        assert_eq!(r.version_id.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn upload_part_requires_etag() {
        let resp = HttpResponse {
            status: 200,
            ..Default::default()
        };
        assert!(
            UploadPartResponse::from_s3response(request(), Ok(resp))
                .await
                .is_err()
        );
    }
}
