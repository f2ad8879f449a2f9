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

//! Splitting of objects into multipart upload parts

use crate::s3::error::ValidationErr;

/// Minimum part size for multipart uploads (5 MiB). Only the last part may be smaller.
pub const MIN_PART_SIZE: u64 = 5_242_880;

/// Maximum part size for multipart uploads (5 GiB).
pub const MAX_PART_SIZE: u64 = 5_368_709_120;

/// Maximum object size (5 TiB).
pub const MAX_OBJECT_SIZE: u64 = 5_497_558_138_880;

/// Maximum number of parts of a multipart upload.
pub const MAX_MULTIPART_COUNT: u16 = 10_000;

/// How an object is split into parts.
///
/// A plan with a known part count of 1 is uploaded with a single PUT and
/// never opens a multipart session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadPlan {
    /// Size of every part except possibly the last one
    pub part_size: u64,
    /// Number of parts; `None` when the object size is unknown and the count
    /// is only known once the source is exhausted
    pub part_count: Option<u16>,
}

impl UploadPlan {
    /// Returns `true` if the object goes up in one direct PUT.
    pub fn is_single_part(&self) -> bool {
        self.part_count == Some(1)
    }

    /// Returns `true` if the object size is unknown.
    pub fn is_streaming(&self) -> bool {
        self.part_count.is_none()
    }

    /// Size of part `part_number` (1-based) of an object of `object_size` bytes.
    pub fn part_length(&self, object_size: u64, part_number: u16) -> u64 {
        let offset = self.part_size * part_number.saturating_sub(1) as u64;
        object_size.saturating_sub(offset).min(self.part_size)
    }
}

/// Fails if an object of `object_size` bytes exceeds [`MAX_OBJECT_SIZE`].
pub fn check_object_size(object_size: u64) -> Result<(), ValidationErr> {
    if object_size > MAX_OBJECT_SIZE {
        return Err(ValidationErr::InvalidObjectSize(object_size));
    }
    Ok(())
}

/// Computes the upload plan for an object.
///
/// Without an explicit part size, the smallest multiple of [`MIN_PART_SIZE`]
/// that keeps the object within [`MAX_MULTIPART_COUNT`] parts is used. When
/// the part size reaches the object size the object is a single part whose
/// size is the object size.
///
/// # Examples
///
/// ```
/// use s3_upload::s3::upload::{plan, MIN_PART_SIZE};
///
/// let mib = 1024 * 1024;
/// let p = plan(Some(12 * mib), Some(5 * mib)).unwrap();
/// assert_eq!((p.part_size, p.part_count), (5 * mib, Some(3)));
///
/// let p = plan(Some(4 * mib), None).unwrap();
/// assert!(p.is_single_part());
///
/// let p = plan(None, Some(MIN_PART_SIZE)).unwrap();
/// assert!(p.is_streaming());
/// ```
pub fn plan(object_size: Option<u64>, part_size: Option<u64>) -> Result<UploadPlan, ValidationErr> {
    if let Some(v) = part_size {
        if v < MIN_PART_SIZE {
            return Err(ValidationErr::InvalidMinPartSize(v));
        }
        if v > MAX_PART_SIZE {
            return Err(ValidationErr::InvalidMaxPartSize(v));
        }
    }

    if let Some(v) = object_size {
        check_object_size(v)?;
    }

    let object_size = match (object_size, part_size) {
        (None, None) => return Err(ValidationErr::MissingPartSize),
        (None, Some(part_size)) => {
            return Ok(UploadPlan {
                part_size,
                part_count: None,
            });
        }
        (Some(object_size), _) => object_size,
    };

    let part_size = part_size.unwrap_or_else(|| {
        object_size
            .div_ceil(MAX_MULTIPART_COUNT as u64)
            .div_ceil(MIN_PART_SIZE)
            * MIN_PART_SIZE
    });

    if part_size >= object_size {
        return Ok(UploadPlan {
            part_size: object_size,
            part_count: Some(1),
        });
    }

    let part_count = object_size.div_ceil(part_size);
    if part_count > MAX_MULTIPART_COUNT as u64 {
        return Err(ValidationErr::InvalidPartCount {
            object_size,
            part_size,
            part_count: MAX_MULTIPART_COUNT,
        });
    }

    Ok(UploadPlan {
        part_size,
        part_count: Some(part_count as u16),
    })
}
