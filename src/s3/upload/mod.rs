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

//! Multipart and streaming upload engine
//!
//! - [`plan`] splits an object into parts within the S3 limits.
//! - [`BufferPool`] recycles part buffers between part uploads.
//! - [`MultipartUploadCoordinator`] drives one upload session: it initiates
//!   the multipart upload, uploads parts in parallel, then completes or
//!   aborts it. Objects that fit in one part are sent with a single PUT.
//! - [`PutObjectOutputStream`] turns sequential writes into parts.

mod buffer_pool;
mod coordinator;
mod output_stream;
mod part_planner;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use coordinator::{
    DEFAULT_BUFFER_POOL_CAPACITY, MultipartUploadCoordinator, UploadConfig, UploadSession,
};
pub use output_stream::PutObjectOutputStream;
pub use part_planner::{
    MAX_MULTIPART_COUNT, MAX_OBJECT_SIZE, MAX_PART_SIZE, MIN_PART_SIZE, UploadPlan,
    check_object_size, plan,
};

use std::fmt;

/// Lifecycle of an upload session.
///
/// ```text
/// Planning -> AwaitingUploadId -> UploadingParts -> Completing -> Completed
///      \              \                 \               \
///       `--------------`-----------------`---------------`--> Aborting -> Aborted
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UploadState {
    #[default]
    Planning,
    AwaitingUploadId,
    UploadingParts,
    Completing,
    Completed,
    Aborting,
    Aborted,
}

impl UploadState {
    /// Returns `true` once the session accepts no further work.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Aborted)
    }

    /// Returns `true` while part results are still wanted.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            UploadState::Planning
                | UploadState::AwaitingUploadId
                | UploadState::UploadingParts
                | UploadState::Completing
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadState::Planning => "planning",
            UploadState::AwaitingUploadId => "awaiting upload ID",
            UploadState::UploadingParts => "uploading parts",
            UploadState::Completing => "completing",
            UploadState::Completed => "completed",
            UploadState::Aborting => "aborting",
            UploadState::Aborted => "aborted",
        })
    }
}
