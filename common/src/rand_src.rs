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

use async_std::stream::Stream;
use bytes::Bytes;
use rand::prelude::SmallRng;
use rand::{RngCore, SeedableRng};
use s3_upload::s3::object_content::ObjectContent;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream of `size` random bytes, produced in reads of at most `read_size`.
pub struct RandSrc {
    size: u64,
    read_size: usize,
    rng: SmallRng,
}

impl RandSrc {
    pub fn new(size: u64) -> RandSrc {
        Self::with_read_size(size, 8 * 1024)
    }

    pub fn with_read_size(size: u64, read_size: usize) -> RandSrc {
        RandSrc {
            size,
            read_size: read_size.max(1),
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Wraps the stream as upload content; `known_size` tells whether the
    /// upload is told the size up front.
    pub fn into_content(self, known_size: bool) -> ObjectContent {
        let size = known_size.then_some(self.size);
        ObjectContent::new_from_stream(self, size)
    }
}

impl Stream for RandSrc {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.size == 0 {
            return Poll::Ready(None);
        }
        let bytes_read = self.size.min(self.read_size as u64) as usize;

        let this = self.get_mut();

        let mut buf = vec![0; bytes_read];
        this.rng.fill_bytes(&mut buf);
        this.size -= bytes_read as u64;
        Poll::Ready(Some(Ok(Bytes::from(buf))))
    }
}
