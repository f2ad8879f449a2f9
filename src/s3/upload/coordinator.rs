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

//! Multipart upload session driver

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use typed_builder::TypedBuilder;

use super::{BufferPool, MAX_MULTIPART_COUNT, UploadPlan, UploadState};
use crate::s3::error::{Error, ValidationErr};
use crate::s3::header_constants::CONTENT_TYPE;
use crate::s3::multimap_ext::{Multimap, MultimapExt};
use crate::s3::response::PutObjectContentResponse;
use crate::s3::segmented_bytes::SegmentedBytes;
use crate::s3::types::{MultipartApi, PartInfo, UploadTarget, WrittenObject};
use crate::s3::utils::{ChecksumAlgorithm, check_object_args};

/// Idle part buffers kept for reuse unless configured otherwise.
pub const DEFAULT_BUFFER_POOL_CAPACITY: usize = 4;

/// Options of one upload, validated when the upload starts.
#[derive(Clone, Debug, TypedBuilder)]
pub struct UploadConfig {
    /// Part size; required when the object size is unknown.
    #[builder(default, setter(into))]
    pub part_size: Option<u64>,
    /// Maximum number of part uploads in flight. `None` means unbounded.
    #[builder(default, setter(into))]
    pub max_parallel_requests: Option<usize>,
    #[builder(default = DEFAULT_BUFFER_POOL_CAPACITY)]
    pub buffer_pool_capacity: usize,
    #[builder(default)]
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Send part bodies as chunk-signed `aws-chunked` streams.
    #[builder(default = false)]
    pub signed_streaming: bool,
    #[builder(default, setter(into))]
    pub content_type: Option<String>,
    #[builder(default, setter(into))]
    pub user_metadata: Option<Multimap>,
    #[builder(default, setter(into))]
    pub extra_headers: Option<Multimap>,
    #[builder(default, setter(into))]
    pub region: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), ValidationErr> {
        if self.max_parallel_requests == Some(0) {
            return Err(ValidationErr::InvalidParallelism);
        }
        Ok(())
    }

    /// Target of an upload of `bucket/object` with these options.
    pub fn target(&self, bucket: String, object: String) -> UploadTarget {
        let mut headers = self.extra_headers.clone().unwrap_or_default();
        if let Some(v) = &self.content_type
            && !headers.contains_key_ignore_case(CONTENT_TYPE)
        {
            headers.add(CONTENT_TYPE, v.as_str());
        }
        if let Some(v) = &self.user_metadata {
            headers.add_user_metadata(v);
        }

        UploadTarget {
            bucket,
            object,
            region: self.region.clone(),
            headers,
            checksum_algorithm: self.checksum_algorithm,
            signed_streaming: self.signed_streaming,
        }
    }
}

/// State of an upload session shared between the producer and the part
/// upload tasks. Always accessed under the session mutex.
#[derive(Debug, Default)]
struct SessionState {
    upload_id: Option<String>,
    state: UploadState,
    /// Slot `n - 1` holds part `n` once it is uploaded; written once.
    parts: Vec<Option<PartInfo>>,
    in_flight: usize,
    terminal_error: Option<Error>,
    abort_error: Option<Error>,
    abort_started: bool,
    /// Parts admitted before the upload ID arrived, in submission order
    pending: VecDeque<PendingPart>,
}

impl SessionState {
    fn set_state(&mut self, next: UploadState) {
        if self.state != next {
            log::debug!("upload state: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn record_part(&mut self, part: PartInfo) {
        let index = part.number as usize - 1;
        if self.parts.len() <= index {
            self.parts.resize(index + 1, None);
        }
        if self.parts[index].is_some() {
            log::warn!("part {} reported twice; keeping the first result", part.number);
            return;
        }
        self.parts[index] = Some(part);
    }

    /// Records `err` as the terminal error unless one is already recorded.
    fn record_failure(&mut self, err: Error) {
        if self.state == UploadState::Completed {
            return;
        }
        if self.terminal_error.is_none() {
            self.terminal_error = Some(err);
        } else {
            log::debug!("ignoring error after upload failure: {err}");
        }
        if self.state != UploadState::Aborted {
            self.set_state(UploadState::Aborting);
        }
    }

    /// Returns `true` exactly once, for the caller that must send the abort.
    fn claim_abort(&mut self) -> bool {
        if self.abort_started || self.upload_id.is_none() {
            return false;
        }
        self.abort_started = true;
        true
    }

    fn clear_pending(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("dropping {} queued parts", self.pending.len());
            self.pending.clear();
        }
    }

    fn terminal_result(&self) -> Error {
        let cause = self
            .terminal_error
            .clone()
            .unwrap_or(Error::UploadTerminated(self.state));
        match &self.abort_error {
            Some(abort) => Error::AbortFailed {
                cause: Box::new(cause),
                abort: Box::new(abort.clone()),
            },
            None => cause,
        }
    }
}

/// Read-only view of an upload session.
#[derive(Clone, Debug)]
pub struct UploadSession {
    target: Arc<UploadTarget>,
    plan: UploadPlan,
    inner: Arc<Mutex<SessionState>>,
}

impl UploadSession {
    pub fn bucket(&self) -> &str {
        &self.target.bucket
    }

    pub fn object(&self) -> &str {
        &self.target.object
    }

    pub fn region(&self) -> Option<&str> {
        self.target.region.as_deref()
    }

    pub fn plan(&self) -> UploadPlan {
        self.plan
    }

    /// Upload ID, once the multipart upload is initiated.
    pub fn upload_id(&self) -> Option<String> {
        self.inner.lock().upload_id.clone()
    }

    pub fn state(&self) -> UploadState {
        self.inner.lock().state
    }

    /// Number of parts uploaded so far.
    pub fn part_count(&self) -> u16 {
        self.inner.lock().parts.iter().flatten().count() as u16
    }

    /// Uploaded parts ordered by part number.
    pub fn parts(&self) -> Vec<PartInfo> {
        self.inner.lock().parts.iter().flatten().cloned().collect()
    }

    /// Number of part uploads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock()
    }
}

#[derive(Debug)]
struct PendingPart {
    number: u16,
    body: Bytes,
    permit: Option<OwnedSemaphorePermit>,
}

/// Spawns part uploads. Shared by the producer and the initiate task, which
/// sends the queued parts as soon as the upload ID arrives.
#[derive(Clone, Debug)]
struct PartDispatcher {
    api: Arc<dyn MultipartApi>,
    target: Arc<UploadTarget>,
    session: Arc<Mutex<SessionState>>,
    pool: BufferPool,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl PartDispatcher {
    /// Uploads `part` now, or queues it until the upload ID is known.
    fn submit(&self, part: PendingPart) {
        let upload_id = {
            let mut s = self.session.lock();
            if !s.state.is_active() {
                log::debug!("dropping part {}: upload is {}", part.number, s.state);
                return;
            }
            match s.upload_id.clone() {
                Some(upload_id) => upload_id,
                None => {
                    log::debug!("queueing part {} until the upload ID arrives", part.number);
                    s.pending.push_back(part);
                    return;
                }
            }
        };
        self.dispatch(part, upload_id);
    }

    /// Records the outcome of the initiate request and sends the queued parts.
    fn accept_upload_id(&self, result: Result<String, Error>) -> Result<(), Error> {
        let upload_id = match result {
            Ok(v) => v,
            Err(e) => {
                log::warn!(
                    "failed to initiate multipart upload of {}/{}: {e}",
                    self.target.bucket,
                    self.target.object
                );
                let mut s = self.session.lock();
                s.clear_pending();
                s.record_failure(e.clone());
                return Err(e);
            }
        };
        log::info!(
            "initiated multipart upload {upload_id} of {}/{}",
            self.target.bucket,
            self.target.object
        );

        let queued = {
            let mut s = self.session.lock();
            s.upload_id = Some(upload_id.clone());
            if s.state == UploadState::AwaitingUploadId {
                s.set_state(UploadState::UploadingParts);
                Some(s.pending.drain(..).collect::<Vec<_>>())
            } else {
                s.clear_pending();
                None
            }
        };
        let Some(queued) = queued else {
            return Err(self.session.lock().terminal_result());
        };
        for part in queued {
            self.dispatch(part, upload_id.clone());
        }
        Ok(())
    }

    fn dispatch(&self, part: PendingPart, upload_id: String) {
        let api = self.api.clone();
        let target = self.target.clone();
        let session = self.session.clone();
        let pool = self.pool.clone();

        session.lock().in_flight += 1;
        log::debug!("uploading part {} ({} bytes)", part.number, part.body.len());

        let handle = tokio::spawn(async move {
            let PendingPart {
                number,
                body,
                permit,
            } = part;
            let size = body.len() as u64;

            let result = api
                .upload_part(&target, &upload_id, number, SegmentedBytes::from(body.clone()))
                .await;
            pool.reclaim(body);

            let abort = {
                let mut s = session.lock();
                s.in_flight -= 1;
                match result {
                    Ok(part) if s.state.is_active() => {
                        log::debug!("part {number} uploaded, etag {}", part.etag);
                        s.record_part(PartInfo {
                            number,
                            size,
                            ..part
                        });
                        false
                    }
                    Ok(_) => {
                        log::debug!("discarding result of part {number}: upload is {}", s.state);
                        false
                    }
                    Err(e) => {
                        log::warn!("failed to upload part {number} of {upload_id}: {e}");
                        s.record_failure(e);
                        s.claim_abort()
                    }
                }
            };
            if abort {
                abort_upload(&api, &target, &session).await;
            }
            drop(permit);
        });
        self.tasks.lock().push(handle);
    }
}

/// Drives one upload from first part to completion or abort.
///
/// The coordinator is owned by a single producer which hands it part bodies
/// in order with [`submit_part`](Self::submit_part) and finishes with
/// [`complete`](Self::complete) or [`abort`](Self::abort). Parts are uploaded
/// by spawned tasks, at most `max_parallel_requests` at a time; the producer
/// waits for a free slot before a part is admitted.
///
/// The multipart upload is initiated in the background on the first part
/// (or earlier through [`start`](Self::start)); parts submitted before its
/// upload ID is known are queued and sent in submission order once it is.
///
/// The first error of any request terminates the upload: it is recorded,
/// the multipart upload is aborted exactly once, and part results arriving
/// afterwards are discarded. An upload that never got past one part is sent
/// with a single PUT instead.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct MultipartUploadCoordinator {
    api: Arc<dyn MultipartApi>,
    target: Arc<UploadTarget>,
    plan: UploadPlan,
    pool: BufferPool,
    permits: Option<Arc<Semaphore>>,
    session: UploadSession,
    dispatcher: PartDispatcher,
    initiate: Option<JoinHandle<Result<(), Error>>>,
    next_part_number: u16,
    bytes_submitted: u64,
    result: Option<Result<PutObjectContentResponse, Error>>,
}

impl MultipartUploadCoordinator {
    pub fn new(
        api: Arc<dyn MultipartApi>,
        bucket: impl Into<String>,
        object: impl Into<String>,
        plan: UploadPlan,
        config: &UploadConfig,
    ) -> Result<Self, ValidationErr> {
        config.validate()?;
        let (bucket, object) = (bucket.into(), object.into());
        check_object_args(&bucket, &object)?;

        let buffer_size = usize::try_from(plan.part_size.max(1)).map_err(|_| {
            ValidationErr::InvalidBufferPool(format!(
                "part size {} does not fit in memory",
                plan.part_size
            ))
        })?;
        let pool = BufferPool::new(buffer_size, config.buffer_pool_capacity)?;

        let parts = match plan.part_count {
            Some(n) if n > 1 => vec![None; n as usize],
            _ => Vec::new(),
        };

        let target = Arc::new(config.target(bucket, object));
        let inner = Arc::new(Mutex::new(SessionState {
            parts,
            ..Default::default()
        }));
        let dispatcher = PartDispatcher {
            api: api.clone(),
            target: target.clone(),
            session: inner.clone(),
            pool: pool.clone(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        };
        Ok(Self {
            api,
            session: UploadSession {
                target: target.clone(),
                plan,
                inner,
            },
            target,
            plan,
            pool,
            permits: config
                .max_parallel_requests
                .map(|n| Arc::new(Semaphore::new(n))),
            dispatcher,
            initiate: None,
            next_part_number: 1,
            bytes_submitted: 0,
            result: None,
        })
    }

    pub fn plan(&self) -> UploadPlan {
        self.plan
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn state(&self) -> UploadState {
        self.session.state()
    }

    /// Pool that part buffers are taken from and returned to.
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Outcome of [`complete`](Self::complete) or [`abort`](Self::abort), once finished.
    pub fn cached_result(&self) -> Option<&Result<PutObjectContentResponse, Error>> {
        self.result.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock()
    }

    /// Fails if the upload no longer accepts parts.
    pub fn check_writable(&self) -> Result<(), Error> {
        if let Some(result) = &self.result {
            return Err(match result {
                Ok(_) => Error::UploadTerminated(UploadState::Completed),
                Err(e) => e.clone(),
            });
        }
        let s = self.lock();
        match s.state {
            UploadState::Aborting | UploadState::Aborted => Err(s.terminal_result()),
            UploadState::Completing | UploadState::Completed => {
                Err(Error::UploadTerminated(s.state))
            }
            _ => Ok(()),
        }
    }

    /// Like [`check_writable`](Self::check_writable), but a failed upload is
    /// settled first, so its abort has finished when the error is returned.
    pub async fn ensure_writable(&mut self) -> Result<(), Error> {
        match self.check_writable() {
            Err(_) if self.state() == UploadState::Aborting => Err(self.settle().await),
            r => r,
        }
    }

    /// Initiates the multipart upload in the background unless it is
    /// already initiated or the plan is a single part.
    pub fn start(&mut self) {
        if self.initiate.is_some() || self.plan.is_single_part() {
            return;
        }
        {
            let mut s = self.lock();
            if s.state != UploadState::Planning {
                return;
            }
            s.set_state(UploadState::AwaitingUploadId);
        }

        log::debug!(
            "initiating multipart upload of {}/{}",
            self.target.bucket,
            self.target.object
        );
        let dispatcher = self.dispatcher.clone();
        self.initiate = Some(tokio::spawn(async move {
            let result = dispatcher
                .api
                .create_multipart_upload(&dispatcher.target)
                .await;
            dispatcher.accept_upload_id(result)
        }));
    }

    /// Admits the next part. Waits while `max_parallel_requests` parts are in flight.
    ///
    /// An error here is the terminal error of the upload, which has already
    /// been aborted.
    pub async fn submit_part(&mut self, body: Bytes) -> Result<(), Error> {
        self.ensure_writable().await?;
        if self.plan.is_single_part() {
            return Err(self
                .fail(Error::Internal(
                    "parts submitted to a single-part upload".into(),
                ))
                .await);
        }

        let number = self.next_part_number;
        if number > MAX_MULTIPART_COUNT {
            let err = ValidationErr::InvalidPartCount {
                object_size: self.bytes_submitted + body.len() as u64,
                part_size: self.plan.part_size,
                part_count: MAX_MULTIPART_COUNT,
            };
            return Err(self.fail(err.into()).await);
        }

        self.start();
        let permit = match self.acquire_permit().await {
            Ok(p) => p,
            Err(e) => return Err(self.fail(e).await),
        };
        // A part may have failed while waiting for the slot.
        if self.check_writable().is_err() {
            drop(permit);
            return Err(self.settle().await);
        }

        self.next_part_number += 1;
        self.bytes_submitted += body.len() as u64;
        self.dispatcher.submit(PendingPart {
            number,
            body,
            permit,
        });
        Ok(())
    }

    async fn acquire_permit(&mut self) -> Result<Option<OwnedSemaphorePermit>, Error> {
        let Some(permits) = self.permits.clone() else {
            return Ok(None);
        };
        match permits.clone().try_acquire_owned() {
            Ok(permit) => return Ok(Some(permit)),
            Err(TryAcquireError::Closed) => {
                return Err(Error::Internal("part upload permits closed".into()));
            }
            Err(TryAcquireError::NoPermits) => {}
        }

        // Queued parts hold permits until the upload ID arrives.
        self.resolve_upload_id().await?;
        log::debug!("waiting for a part upload slot");
        permits
            .acquire_owned()
            .await
            .map(Some)
            .map_err(|e| Error::Internal(format!("part upload permits closed: {e}")))
    }

    /// Waits for the initiate request, whose task has already sent the
    /// queued parts if it succeeded.
    async fn resolve_upload_id(&mut self) -> Result<(), Error> {
        let Some(handle) = self.initiate.take() else {
            return Ok(());
        };
        handle
            .await
            .unwrap_or_else(|e| Err(Error::Internal(format!("initiate task failed: {e}"))))
    }

    async fn join_tasks(&mut self) {
        loop {
            let tasks: Vec<_> = self.dispatcher.tasks.lock().drain(..).collect();
            if tasks.is_empty() {
                break;
            }
            for joined in join_all(tasks).await {
                if let Err(e) = joined {
                    self.lock()
                        .record_failure(Error::Internal(format!("part upload task failed: {e}")));
                }
            }
        }
    }

    /// Records `err` as the failure of the upload unless one is recorded
    /// already, aborts the upload and returns its terminal error.
    pub async fn fail(&mut self, err: Error) -> Error {
        self.lock().record_failure(err);
        self.settle().await
    }

    /// Drops queued parts, waits for every outstanding request and makes
    /// sure the abort was sent.
    async fn settle(&mut self) -> Error {
        self.lock().clear_pending();
        // An upload initiated after the failure still has to be aborted.
        let _ = self.resolve_upload_id().await;
        self.join_tasks().await;

        let abort = self.lock().claim_abort();
        if abort {
            abort_upload(&self.api, &self.target, &self.session.inner).await;
        }

        let mut s = self.lock();
        if s.state == UploadState::Aborting {
            s.set_state(UploadState::Aborted);
        }
        s.terminal_result()
    }

    /// Sends `tail` as the last part and completes the upload.
    ///
    /// If no part was submitted, `tail` is the whole object and goes up with
    /// a single PUT. Calling this again returns the first outcome without
    /// sending anything.
    pub async fn complete(&mut self, tail: Bytes) -> Result<PutObjectContentResponse, Error> {
        if let Some(result) = &self.result {
            return result.clone();
        }
        let result = self.complete_inner(tail).await;
        self.result = Some(result.clone());
        result
    }

    async fn complete_inner(&mut self, tail: Bytes) -> Result<PutObjectContentResponse, Error> {
        let failed = matches!(
            self.state(),
            UploadState::Aborting | UploadState::Aborted
        );
        if failed {
            return Err(self.settle().await);
        }

        if self.initiate.is_none() && self.next_part_number == 1 && self.lock().upload_id.is_none()
        {
            return self.put_single(tail).await;
        }
        self.complete_multipart(tail).await
    }

    async fn put_single(&mut self, body: Bytes) -> Result<PutObjectContentResponse, Error> {
        self.lock().set_state(UploadState::Completing);
        let size = body.len() as u64;
        log::info!(
            "uploading {}/{} with a single PUT ({size} bytes)",
            self.target.bucket,
            self.target.object
        );

        match self
            .api
            .put_object(&self.target, SegmentedBytes::from(body))
            .await
        {
            Ok(obj) => {
                self.lock().set_state(UploadState::Completed);
                Ok(self.response(obj, size, 1))
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn complete_multipart(&mut self, tail: Bytes) -> Result<PutObjectContentResponse, Error> {
        if !tail.is_empty() && self.submit_part(tail).await.is_err() {
            return Err(self.settle().await);
        }
        if let Err(e) = self.resolve_upload_id().await {
            return Err(self.fail(e).await);
        }

        let upload_id = {
            let mut s = self.lock();
            if s.state == UploadState::UploadingParts {
                s.set_state(UploadState::Completing);
                s.upload_id.clone()
            } else {
                None
            }
        };
        let Some(upload_id) = upload_id else {
            return Err(self.settle().await);
        };

        log::debug!(
            "waiting for {} part uploads of {upload_id}",
            self.session.in_flight()
        );
        self.join_tasks().await;

        let parts = {
            let s = self.lock();
            match s.terminal_error {
                Some(_) => None,
                None => Some(s.parts.iter().flatten().cloned().collect::<Vec<_>>()),
            }
        };
        let Some(parts) = parts else {
            return Err(self.settle().await);
        };

        let part_count = self.next_part_number - 1;
        if parts.len() != part_count as usize {
            let err = Error::Internal(format!(
                "{} of {part_count} parts uploaded at completion",
                parts.len()
            ));
            return Err(self.fail(err).await);
        }

        log::info!("completing multipart upload {upload_id} with {part_count} parts");
        match self
            .api
            .complete_multipart_upload(&self.target, &upload_id, parts)
            .await
        {
            Ok(obj) => {
                self.lock().set_state(UploadState::Completed);
                Ok(self.response(obj, self.bytes_submitted, part_count))
            }
            Err(e) => {
                log::warn!("failed to complete multipart upload {upload_id}: {e}");
                Err(self.fail(e).await)
            }
        }
    }

    /// Abandons the upload: queued parts are dropped and the multipart
    /// upload is aborted. Aborting again is a no-op.
    ///
    /// Returns the error of the abort request if it failed.
    pub async fn abort(&mut self) -> Result<(), Error> {
        match &self.result {
            Some(Ok(_)) => return Err(Error::UploadTerminated(UploadState::Completed)),
            Some(Err(_)) => return Ok(()),
            None => {}
        }

        log::info!(
            "aborting upload of {}/{} on request",
            self.target.bucket,
            self.target.object
        );
        self.lock()
            .record_failure(Error::UploadTerminated(UploadState::Aborted));
        let err = self.settle().await;
        self.result = Some(Err(err));

        match self.lock().abort_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn response(
        &self,
        obj: WrittenObject,
        object_size: u64,
        part_count: u16,
    ) -> PutObjectContentResponse {
        PutObjectContentResponse {
            bucket: self.target.bucket.clone(),
            object: self.target.object.clone(),
            region: self.target.region.clone().unwrap_or_default(),
            object_size,
            etag: obj.etag,
            version_id: obj.version_id,
            part_count,
        }
    }
}

async fn abort_upload(
    api: &Arc<dyn MultipartApi>,
    target: &UploadTarget,
    session: &Mutex<SessionState>,
) {
    let Some(upload_id) = session.lock().upload_id.clone() else {
        return;
    };
    log::info!(
        "aborting multipart upload {upload_id} of {}/{}",
        target.bucket,
        target.object
    );

    let result = api.abort_multipart_upload(target, &upload_id).await;

    let mut s = session.lock();
    if let Err(e) = result {
        log::warn!("failed to abort multipart upload {upload_id}: {e}");
        s.abort_error = Some(e);
    }
    s.set_state(UploadState::Aborted);
}
