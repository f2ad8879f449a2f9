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

//! Reusable part buffers

use crate::s3::error::ValidationErr;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::sync::Arc;

/// A fixed-capacity pool of equally sized part buffers.
///
/// [`BufferPool::take`] never waits: it hands out an idle buffer or allocates
/// a new one. [`BufferPool::put`] resets a buffer and keeps it for reuse, or
/// drops it when the pool already holds `capacity` idle buffers. Peak idle
/// memory is therefore bounded by `capacity * buffer_size`.
///
/// The pool is cheap to clone; clones share the same idle buffers.
#[derive(Clone, Debug)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    buffer_size: usize,
    capacity: usize,
    idle: Mutex<Vec<BytesMut>>,
}

impl BufferPool {
    pub fn new(buffer_size: usize, capacity: usize) -> Result<Self, ValidationErr> {
        if buffer_size == 0 {
            return Err(ValidationErr::InvalidBufferPool(
                "buffer size must be greater than zero".into(),
            ));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                buffer_size,
                capacity,
                idle: Mutex::new(Vec::with_capacity(capacity)),
            }),
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of idle buffers currently held by the pool.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Returns an empty buffer able to hold `buffer_size` bytes.
    pub fn take(&self) -> PooledBuffer {
        let data = self
            .inner
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.inner.buffer_size));
        PooledBuffer {
            data,
            buffer_size: self.inner.buffer_size,
        }
    }

    /// Resets `buffer` and keeps it for reuse if there is room.
    pub fn put(&self, buffer: PooledBuffer) {
        self.put_bytes_mut(buffer.data);
    }

    /// Reclaims the storage of a frozen buffer once every other handle to it
    /// has been dropped. Shared storage is left alone.
    pub fn reclaim(&self, bytes: Bytes) {
        if let Ok(data) = bytes.try_into_mut() {
            self.put_bytes_mut(data);
        }
    }

    fn put_bytes_mut(&self, mut data: BytesMut) {
        // Buffers of another size would break homogeneity.
        if data.capacity() < self.inner.buffer_size {
            return;
        }
        data.clear();
        let mut idle = self.inner.idle.lock();
        if idle.len() < self.inner.capacity {
            idle.push(data);
        }
    }
}

/// A buffer borrowed from a [`BufferPool`].
///
/// Writes beyond `buffer_size` are refused, so a full buffer holds exactly
/// one part.
#[derive(Debug)]
pub struct PooledBuffer {
    data: BytesMut,
    buffer_size: usize,
}

impl PooledBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.buffer_size
    }

    /// Free space left in the buffer.
    pub fn remaining(&self) -> usize {
        self.buffer_size - self.data.len()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.buffer_size
    }

    /// Copies as much of `src` as fits and returns the number of bytes taken.
    pub fn fill(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining());
        self.data.extend_from_slice(&src[..n]);
        n
    }

    /// Turns the buffered bytes into an immutable part body.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_put_reuses_storage() {
        let pool = BufferPool::new(16, 2).unwrap();
        let mut buf = pool.take();
        assert_eq!(buf.fill(b"hello"), 5);
        let ptr = buf.data.as_ptr();
        pool.put(buf);
        assert_eq!(pool.idle_count(), 1);

        let again = pool.take();
        assert!(again.is_empty());
        assert_eq!(again.data.as_ptr(), ptr);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn put_drops_buffers_beyond_capacity() {
        let pool = BufferPool::new(8, 2).unwrap();
        let buffers: Vec<PooledBuffer> = (0..4).map(|_| pool.take()).collect();
        for b in buffers {
            pool.put(b);
        }
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn fill_stops_at_buffer_size() {
        let pool = BufferPool::new(4, 1).unwrap();
        let mut buf = pool.take();
        assert_eq!(buf.fill(b"abcdef"), 4);
        assert!(buf.is_full());
        assert_eq!(buf.fill(b"g"), 0);
        assert_eq!(buf.freeze(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn reclaim_only_takes_unique_storage() {
        let pool = BufferPool::new(4, 2).unwrap();
        let mut buf = pool.take();
        buf.fill(b"ab");
        let frozen = buf.freeze();
        let shared = frozen.clone();
        pool.reclaim(frozen);
        assert_eq!(pool.idle_count(), 0);
        pool.reclaim(shared);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn zero_sized_pool_is_rejected() {
        assert!(BufferPool::new(0, 4).is_err());
    }

    #[test]
    fn concurrent_take_and_put() {
        let pool = BufferPool::new(32, 4).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut b = pool.take();
                        b.fill(&[1u8; 32]);
                        pool.put(b);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(pool.idle_count() <= pool.capacity());
    }
}
