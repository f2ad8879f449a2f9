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

//! Scriptable in-memory [`MultipartApi`] that counts every call.

use async_trait::async_trait;
use parking_lot::Mutex;
use s3_upload::s3::error::{Error, S3ServerError};
use s3_upload::s3::segmented_bytes::SegmentedBytes;
use s3_upload::s3::types::{MultipartApi, PartInfo, UploadTarget, WrittenObject};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const UPLOAD_ID: &str = "recorded-upload-id";

/// Error returned for an injected failure of `what`.
pub fn injected_error(what: &str) -> Error {
    S3ServerError::HttpStatus {
        status: 500,
        body: format!("injected failure: {what}"),
    }
    .into()
}

/// Everything the api was asked to do, in call order.
#[derive(Clone, Debug, Default)]
pub struct Calls {
    pub initiates: usize,
    /// Part numbers in the order their uploads finished
    pub parts_finished: Vec<u16>,
    /// Part sizes by part number
    pub part_sizes: HashMap<u16, usize>,
    /// Parts lists passed to complete
    pub completes: Vec<Vec<PartInfo>>,
    pub aborts: usize,
    /// Sizes of direct PUTs
    pub puts: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct RecordingApi {
    fail_initiate: bool,
    fail_part: Option<u16>,
    fail_complete: bool,
    fail_abort: bool,
    initiate_delay: Duration,
    part_delays: HashMap<u16, Duration>,
    calls: Mutex<Calls>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initiate(mut self) -> Self {
        self.fail_initiate = true;
        self
    }

    /// Fails the upload of part `number`.
    pub fn fail_part(mut self, number: u16) -> Self {
        self.fail_part = Some(number);
        self
    }

    pub fn fail_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn fail_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    /// Delays the upload ID by `delay`.
    pub fn initiate_delay(mut self, delay: Duration) -> Self {
        self.initiate_delay = delay;
        self
    }

    /// Delays the upload of part `number` by `delay`.
    pub fn part_delay(mut self, number: u16, delay: Duration) -> Self {
        self.part_delays.insert(number, delay);
        self
    }

    /// Delays every part in `numbers` by `delay`.
    pub fn part_delays(mut self, numbers: impl IntoIterator<Item = u16>, delay: Duration) -> Self {
        for n in numbers {
            self.part_delays.insert(n, delay);
        }
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().clone()
    }

    /// Highest number of part uploads seen running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MultipartApi for RecordingApi {
    async fn create_multipart_upload(&self, _target: &UploadTarget) -> Result<String, Error> {
        self.calls.lock().initiates += 1;
        if !self.initiate_delay.is_zero() {
            tokio::time::sleep(self.initiate_delay).await;
        }
        if self.fail_initiate {
            return Err(injected_error("initiate"));
        }
        Ok(UPLOAD_ID.to_string())
    }

    async fn upload_part(
        &self,
        _target: &UploadTarget,
        upload_id: &str,
        part_number: u16,
        data: SegmentedBytes,
    ) -> Result<PartInfo, Error> {
        assert_eq!(upload_id, UPLOAD_ID);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.part_delays.get(&part_number) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        {
            let mut calls = self.calls.lock();
            calls.parts_finished.push(part_number);
            calls.part_sizes.insert(part_number, data.len());
        }

        if self.fail_part == Some(part_number) {
            return Err(injected_error(&format!("part {part_number}")));
        }
        Ok(PartInfo {
            number: part_number,
            etag: format!("etag-{part_number}"),
            size: data.len() as u64,
            checksum: None,
        })
    }

    async fn complete_multipart_upload(
        &self,
        _target: &UploadTarget,
        upload_id: &str,
        parts: Vec<PartInfo>,
    ) -> Result<WrittenObject, Error> {
        assert_eq!(upload_id, UPLOAD_ID);
        self.calls.lock().completes.push(parts);
        if self.fail_complete {
            return Err(injected_error("complete"));
        }
        Ok(WrittenObject {
            etag: "final-etag".into(),
            version_id: None,
        })
    }

    async fn abort_multipart_upload(
        &self,
        _target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), Error> {
        assert_eq!(upload_id, UPLOAD_ID);
        self.calls.lock().aborts += 1;
        if self.fail_abort {
            return Err(injected_error("abort"));
        }
        Ok(())
    }

    async fn put_object(
        &self,
        _target: &UploadTarget,
        data: SegmentedBytes,
    ) -> Result<WrittenObject, Error> {
        self.calls.lock().puts.push(data.len());
        Ok(WrittenObject {
            etag: "put-etag".into(),
            version_id: None,
        })
    }
}
