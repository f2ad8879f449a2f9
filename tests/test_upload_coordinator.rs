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

use s3_upload::s3::error::{Error, S3ServerError};
use s3_upload::s3::upload::{MIN_PART_SIZE, PutObjectOutputStream, UploadConfig, UploadState};
use s3_upload_common::recording_api::{RecordingApi, UPLOAD_ID};
use s3_upload_common::utils::{MIB, init_logger, rand_object_name};
use std::sync::Arc;
use std::time::Duration;

const PART: usize = MIN_PART_SIZE as usize;

fn open(
    api: &Arc<RecordingApi>,
    size: Option<u64>,
    max_parallel_requests: Option<usize>,
) -> PutObjectOutputStream {
    let config = UploadConfig::builder()
        .part_size(MIN_PART_SIZE)
        .max_parallel_requests(max_parallel_requests)
        .build();
    PutObjectOutputStream::new(api.clone(), "bucket", rand_object_name(), size, config).unwrap()
}

/// Writes `total` bytes in `chunk` sized writes, stopping at the first error.
async fn write_all(s: &mut PutObjectOutputStream, total: usize, chunk: usize) -> Result<(), Error> {
    let buf = vec![7u8; chunk];
    let mut written = 0;
    while written < total {
        let n = chunk.min(total - written);
        s.write(&buf[..n]).await?;
        written += n;
    }
    Ok(())
}

fn is_injected(err: &Error, what: &str) -> bool {
    matches!(
        err,
        Error::S3Server(S3ServerError::HttpStatus { status: 500, body }) if body.ends_with(what)
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn known_size_is_split_into_planned_parts() {
    init_logger();
    let api = Arc::new(RecordingApi::new());
    let size = 12 * MIB;
    let mut s = open(&api, Some(size as u64), None);
    write_all(&mut s, size, MIB).await.unwrap();
    let resp = s.close().await.unwrap();

    assert_eq!(resp.part_count, 3);
    assert_eq!(resp.object_size, size as u64);
    assert_eq!(resp.etag, "final-etag");

    let calls = api.calls();
    assert_eq!(calls.initiates, 1);
    assert_eq!(calls.completes.len(), 1);
    assert_eq!(calls.part_sizes[&1], 5 * MIB);
    assert_eq!(calls.part_sizes[&2], 5 * MIB);
    assert_eq!(calls.part_sizes[&3], 2 * MIB);
    assert_eq!(calls.aborts, 0);
    assert!(calls.puts.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn small_known_size_is_a_single_put() {
    init_logger();
    let api = Arc::new(RecordingApi::new());
    let config = UploadConfig::default();
    let mut s =
        PutObjectOutputStream::new(api.clone(), "bucket", "small", Some(4 * MIB as u64), config)
            .unwrap();
    write_all(&mut s, 4 * MIB, 64 * 1024).await.unwrap();
    let resp = s.close().await.unwrap();

    assert_eq!(resp.part_count, 1);
    assert_eq!(resp.etag, "put-etag");
    let calls = api.calls();
    assert_eq!(calls.puts, vec![4 * MIB]);
    assert_eq!(calls.initiates, 0);
    assert!(calls.completes.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_part_aborts_once_and_never_completes() {
    init_logger();
    let api = Arc::new(RecordingApi::new().fail_part(2));
    let mut s = open(&api, Some(5 * PART as u64), Some(2));

    let err = match write_all(&mut s, 5 * PART, MIB).await {
        Err(e) => e,
        Ok(()) => s.close().await.unwrap_err(),
    };
    assert!(is_injected(&err, "part 2"), "unexpected error: {err}");

    // Closing reports the same failure without sending anything else.
    let again = s.close().await.unwrap_err();
    assert!(is_injected(&again, "part 2"));
    assert_eq!(s.state(), UploadState::Aborted);

    let calls = api.calls();
    assert_eq!(calls.aborts, 1);
    assert!(calls.completes.is_empty());
    assert!(calls.parts_finished.len() <= 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_twice_returns_the_same_result() {
    init_logger();
    let api = Arc::new(RecordingApi::new());
    let mut s = open(&api, None, None);
    write_all(&mut s, 2 * PART + 10, MIB).await.unwrap();

    let first = s.close().await.unwrap();
    let second = s.close().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(api.calls().completes.len(), 1);

    assert!(matches!(
        s.write(b"late").await,
        Err(Error::UploadTerminated(UploadState::Completed))
    ));
    assert!(s.abort().await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn out_of_order_completions_are_sorted() {
    init_logger();
    let api = Arc::new(RecordingApi::new().part_delays([1, 2], Duration::from_millis(300)));
    let mut s = open(&api, Some(3 * PART as u64), Some(3));
    write_all(&mut s, 3 * PART, MIB).await.unwrap();
    let resp = s.close().await.unwrap();
    assert_eq!(resp.part_count, 3);

    let calls = api.calls();
    assert_eq!(calls.parts_finished[0], 3);
    assert_eq!(calls.completes.len(), 1);
    let numbers: Vec<u16> = calls.completes[0].iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    let etags: Vec<&str> = calls.completes[0].iter().map(|p| p.etag.as_str()).collect();
    assert_eq!(etags, vec!["etag-1", "etag-2", "etag-3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_part_uploads_are_bounded() {
    init_logger();
    let api = Arc::new(RecordingApi::new().part_delays(1..=6, Duration::from_millis(50)));
    let mut s = open(&api, None, Some(2));
    write_all(&mut s, 6 * PART, PART).await.unwrap();
    let resp = s.close().await.unwrap();

    assert_eq!(resp.part_count, 6);
    assert!(api.max_in_flight() <= 2, "max in flight {}", api.max_in_flight());
    assert!(api.max_in_flight() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parts_wait_for_a_slow_upload_id() {
    init_logger();
    let api = Arc::new(RecordingApi::new().initiate_delay(Duration::from_millis(200)));
    let mut s = open(&api, Some(3 * PART as u64), None);
    write_all(&mut s, 3 * PART, MIB).await.unwrap();
    let resp = s.close().await.unwrap();

    assert_eq!(resp.part_count, 3);
    let calls = api.calls();
    assert_eq!(calls.initiates, 1);
    let numbers: Vec<u16> = calls.completes[0].iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_part_is_sent_when_the_upload_id_arrives() {
    init_logger();
    let api = Arc::new(RecordingApi::new().initiate_delay(Duration::from_millis(200)));
    let mut s = open(&api, None, None);
    // The extra bytes hand part 1 to the coordinator before the upload ID exists.
    write_all(&mut s, PART + 10, MIB).await.unwrap();
    assert!(api.calls().parts_finished.is_empty());

    // No further write or close: the upload ID alone must release the part.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(api.calls().parts_finished, vec![1]);
    assert_eq!(s.session().upload_id().as_deref(), Some(UPLOAD_ID));
    assert_eq!(s.state(), UploadState::UploadingParts);

    let resp = s.close().await.unwrap();
    assert_eq!(resp.part_count, 2);
    assert_eq!(api.calls().completes.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_abort_is_reported_with_the_cause() {
    init_logger();
    let api = Arc::new(RecordingApi::new().fail_part(1).fail_abort());
    let mut s = open(&api, Some(2 * PART as u64), None);

    // A write may fail before the abort request returns; closing waits for it.
    let _ = write_all(&mut s, 2 * PART, MIB).await;
    let err = s.close().await.unwrap_err();
    match &err {
        Error::AbortFailed { cause, abort } => {
            assert!(is_injected(cause, "part 1"));
            assert!(is_injected(abort, "abort"));
        }
        e => panic!("expected AbortFailed, got {e}"),
    }
    assert!(is_injected(err.cause(), "part 1"));
    assert_eq!(api.calls().aborts, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_initiate_sends_no_parts() {
    init_logger();
    let api = Arc::new(RecordingApi::new().fail_initiate());
    let mut s = open(&api, Some(3 * PART as u64), None);

    let err = match write_all(&mut s, 3 * PART, MIB).await {
        Err(e) => e,
        Ok(()) => s.close().await.unwrap_err(),
    };
    assert!(is_injected(&err, "initiate"));

    let calls = api.calls();
    assert!(calls.parts_finished.is_empty());
    assert!(calls.completes.is_empty());
    assert_eq!(calls.aborts, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_complete_aborts() {
    init_logger();
    let api = Arc::new(RecordingApi::new().fail_complete());
    let mut s = open(&api, None, None);
    write_all(&mut s, PART + 1, MIB).await.unwrap();

    let err = s.close().await.unwrap_err();
    assert!(is_injected(&err, "complete"));
    let calls = api.calls();
    assert_eq!(calls.completes.len(), 1);
    assert_eq!(calls.aborts, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn explicit_abort_stops_the_upload() {
    init_logger();
    let api = Arc::new(RecordingApi::new());
    let mut s = open(&api, None, None);
    write_all(&mut s, 2 * PART + 1, MIB).await.unwrap();

    s.abort().await.unwrap();
    s.abort().await.unwrap();
    assert_eq!(s.state(), UploadState::Aborted);
    assert!(s.write(b"more").await.is_err());
    assert!(s.close().await.is_err());

    let calls = api.calls();
    assert_eq!(calls.aborts, 1);
    assert!(calls.completes.is_empty());
}
