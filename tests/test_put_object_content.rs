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

use s3_upload::s3::error::Error;
use s3_upload::s3::multimap_ext::{Multimap, MultimapExt};
use s3_upload::s3::object_content::ObjectContent;
use s3_upload::s3::segmented_bytes::SegmentedBytes;
use s3_upload::s3::types::S3Api;
use s3_upload::s3::upload::{MIN_PART_SIZE, UploadConfig};
use s3_upload::s3::utils::ChecksumAlgorithm;
use s3_upload_common::mock_transport::{MockTransport, UPLOAD_ID, internal_error, s3_response};
use s3_upload_common::rand_src::RandSrc;
use s3_upload_common::utils::{MIB, init_logger, rand_object_name};

const PART: usize = MIN_PART_SIZE as usize;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn small_content_is_one_put() {
    init_logger();
    let transport = MockTransport::default();
    let resp = transport
        .client()
        .put_object_content("bucket", "hello.txt", "Hello world")
        .content_type(Some("text/plain".to_string()))
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(resp.part_count, 1);
    assert_eq!(resp.object_size, 11);
    assert_eq!(resp.etag, "put-etag");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let put = &requests[0];
    assert!(put.is_put_object());
    assert!(put.url.ends_with("/bucket/hello.txt"));
    assert_eq!(put.body.as_ref(), b"Hello world");
    assert_eq!(put.header("Content-Length"), Some("11"));
    assert_eq!(put.header("Content-Type"), Some("text/plain"));
    assert!(put.header("Authorization").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn large_content_goes_through_a_multipart_upload() {
    init_logger();
    let transport = MockTransport::default();
    let size = 2 * PART + 1234;
    let mut metadata = Multimap::new();
    metadata.add("project", "upload");

    let resp = transport
        .client()
        .put_object_content("bucket", rand_object_name(), RandSrc::new(size as u64).into_content(true))
        .part_size(Some(MIN_PART_SIZE))
        .max_parallel_requests(Some(2usize))
        .user_metadata(Some(metadata))
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(resp.part_count, 3);
    assert_eq!(resp.object_size, size as u64);
    assert_eq!(resp.etag, "final-etag");

    let requests = transport.requests();
    let initiate: Vec<_> = requests.iter().filter(|r| r.is_initiate()).collect();
    assert_eq!(initiate.len(), 1);
    assert_eq!(initiate[0].header("x-amz-meta-project"), Some("upload"));

    let mut parts: Vec<_> = requests.iter().filter(|r| r.is_upload_part()).collect();
    parts.sort_by_key(|r| r.part_number());
    let sizes: Vec<usize> = parts.iter().map(|r| r.body.len()).collect();
    assert_eq!(sizes, vec![PART, PART, 1234]);
    for p in &parts {
        assert_eq!(p.query("uploadId"), Some(UPLOAD_ID));
        assert!(p.header("x-amz-meta-project").is_none());
    }

    let complete: Vec<_> = requests.iter().filter(|r| r.is_complete()).collect();
    assert_eq!(complete.len(), 1);
    let body = std::str::from_utf8(&complete[0].body).unwrap();
    assert_eq!(
        body,
        "<CompleteMultipartUpload>\
         <Part><PartNumber>1</PartNumber><ETag>etag-1</ETag></Part>\
         <Part><PartNumber>2</PartNumber><ETag>etag-2</ETag></Part>\
         <Part><PartNumber>3</PartNumber><ETag>etag-3</ETag></Part>\
         </CompleteMultipartUpload>"
    );
    assert!(complete[0].header("Content-MD5").is_some());
    assert_eq!(transport.count(|r| r.is_abort()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_size_content_is_streamed_in_parts() {
    init_logger();
    let transport = MockTransport::default();
    let size = PART + MIB;
    let resp = transport
        .client()
        .put_object_content(
            "bucket",
            "stream.bin",
            RandSrc::with_read_size(size as u64, 100_000).into_content(false),
        )
        .part_size(Some(MIN_PART_SIZE))
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(resp.part_count, 2);
    assert_eq!(resp.object_size, size as u64);
    assert_eq!(transport.count(|r| r.is_upload_part()), 2);
    assert_eq!(transport.count(|r| r.is_complete()), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn server_error_on_a_part_aborts_the_upload() {
    init_logger();
    let transport = MockTransport::new(|req| {
        if req.part_number() == Some(2) {
            internal_error()
        } else {
            s3_response(req)
        }
    });

    let err = transport
        .client()
        .put_object_content("bucket", "key", RandSrc::new(3 * PART as u64).into_content(true))
        .part_size(Some(MIN_PART_SIZE))
        .build()
        .send()
        .await
        .unwrap_err();

    assert_eq!(err.s3_code(), Some("InternalError"));
    assert_eq!(transport.count(|r| r.is_abort()), 1);
    assert_eq!(transport.count(|r| r.is_complete()), 0);
    let abort = transport
        .requests()
        .into_iter()
        .find(|r| r.is_abort())
        .unwrap();
    assert_eq!(abort.query("uploadId"), Some(UPLOAD_ID));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_abort_is_reported_alongside_the_cause() {
    init_logger();
    let transport = MockTransport::new(|req| {
        if req.part_number() == Some(1) || req.is_abort() {
            internal_error()
        } else {
            s3_response(req)
        }
    });

    let err = transport
        .client()
        .put_object_content("bucket", "key", RandSrc::new(2 * PART as u64).into_content(true))
        .part_size(Some(MIN_PART_SIZE))
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AbortFailed { .. }), "got {err}");
    assert_eq!(err.s3_code(), Some("InternalError"));
    assert_eq!(transport.count(|r| r.is_abort()), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn signed_streaming_part_is_chunk_encoded() {
    init_logger();
    let transport = MockTransport::default();
    let data = SegmentedBytes::from(vec![b'a'; 100_000]);
    let resp = transport
        .client()
        .upload_part("bucket", "key", "id-1", 1, data)
        .signed_streaming(true)
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(resp.etag, "etag-1");

    let req = &transport.requests()[0];
    assert_eq!(req.header("Content-Encoding"), Some("aws-chunked"));
    assert_eq!(req.header("x-amz-decoded-content-length"), Some("100000"));
    assert_eq!(
        req.header("x-amz-content-sha256"),
        Some("STREAMING-AWS4-HMAC-SHA256-PAYLOAD")
    );
    let content_length: usize = req.header("Content-Length").unwrap().parse().unwrap();
    assert_eq!(req.body.len(), content_length);
    assert!(req.body.starts_with(b"10000;chunk-signature="));
    assert!(req.body.ends_with(b"\r\n\r\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn part_checksums_reach_the_complete_request() {
    init_logger();
    let transport = MockTransport::default();
    let mut stream = transport
        .client()
        .put_object_stream(
            "bucket",
            "key",
            Some(PART as u64 + 3),
            UploadConfig::builder()
                .part_size(MIN_PART_SIZE)
                .checksum_algorithm(Some(ChecksumAlgorithm::CRC32))
                .build(),
        )
        .unwrap();
    stream.write(&vec![0u8; PART]).await.unwrap();
    stream.write(b"abc").await.unwrap();
    stream.close().await.unwrap();

    let requests = transport.requests();
    let initiate = requests.iter().find(|r| r.is_initiate()).unwrap();
    assert_eq!(initiate.header("x-amz-checksum-algorithm"), Some("CRC32"));

    let last = requests
        .iter()
        .find(|r| r.part_number() == Some(2))
        .unwrap();
    assert_eq!(last.header("x-amz-checksum-crc32"), Some("NSRBwg=="));

    let complete = requests.iter().find(|r| r.is_complete()).unwrap();
    let body = std::str::from_utf8(&complete.body).unwrap();
    assert!(body.contains("<ChecksumCRC32>NSRBwg==</ChecksumCRC32>"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn content_from_memory_round_trips_through_the_transport() {
    init_logger();
    let transport = MockTransport::default();
    let data: Vec<u8> = (0..PART + 10).map(|i| (i % 251) as u8).collect();
    transport
        .client()
        .put_object_content("bucket", "key", ObjectContent::from(data.clone()))
        .part_size(Some(MIN_PART_SIZE))
        .build()
        .send()
        .await
        .unwrap();

    let mut parts: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.is_upload_part())
        .collect();
    parts.sort_by_key(|r| r.part_number());
    let uploaded: Vec<u8> = parts.iter().flat_map(|r| r.body.to_vec()).collect();
    assert_eq!(uploaded, data);
}
