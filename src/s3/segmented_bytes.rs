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

use bytes::{Bytes, BytesMut};
use std::fmt;

/// An aggregated collection of `Bytes` objects.
///
/// Part bodies are assembled from whatever chunk sizes the source stream
/// yields; keeping the chunks instead of copying them into one contiguous
/// buffer makes building a part zero-copy. Cloning is cheap as each segment
/// is reference counted.
#[derive(Debug, Clone, Default)]
pub struct SegmentedBytes {
    segments: Vec<Bytes>,
    total_size: usize,
}

impl SegmentedBytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    /// Number of underlying segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn append(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.total_size += bytes.len();
        self.segments.push(bytes);
    }

    pub fn extend(&mut self, other: SegmentedBytes) {
        for bytes in other.segments {
            self.append(bytes);
        }
    }

    pub fn iter(&self) -> SegmentedBytesIterator<'_> {
        SegmentedBytesIterator {
            inner: self.segments.iter(),
        }
    }

    /// Copy all the content into a single [Bytes] object.
    ///
    /// Meant for tests and small bodies such as XML payloads.
    pub fn to_bytes(&self) -> Bytes {
        if self.segments.len() == 1 {
            return self.segments[0].clone();
        }
        let mut buf = BytesMut::with_capacity(self.total_size);
        for bytes in &self.segments {
            buf.extend_from_slice(bytes);
        }
        buf.freeze()
    }
}

impl fmt::Display for SegmentedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.to_bytes().as_ref()) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<{} bytes>", self.total_size),
        }
    }
}

pub struct SegmentedBytesIterator<'a> {
    inner: std::slice::Iter<'a, Bytes>,
}

impl Iterator for SegmentedBytesIterator<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        // clone of Bytes does not make a deep copy
        self.inner.next().cloned()
    }
}

impl IntoIterator for SegmentedBytes {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a SegmentedBytes {
    type Item = Bytes;
    type IntoIter = SegmentedBytesIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Bytes> for SegmentedBytes {
    fn from(bytes: Bytes) -> Self {
        let mut sb = Self::new();
        sb.append(bytes);
        sb
    }
}

impl From<Vec<u8>> for SegmentedBytes {
    fn from(v: Vec<u8>) -> Self {
        Self::from(Bytes::from(v))
    }
}

impl From<String> for SegmentedBytes {
    fn from(s: String) -> Self {
        Self::from(Bytes::from(s.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_tracks_size_and_skips_empty() {
        let mut sb = SegmentedBytes::new();
        sb.append(Bytes::from_static(b"abc"));
        sb.append(Bytes::new());
        sb.append(Bytes::from_static(b"de"));
        assert_eq!(sb.len(), 5);
        assert_eq!(sb.segment_count(), 2);
        assert_eq!(sb.to_bytes(), Bytes::from_static(b"abcde"));
    }

    #[test]
    fn iterators_yield_segments_in_order() {
        let mut sb = SegmentedBytes::from("x".to_string());
        sb.extend(SegmentedBytes::from(vec![b'y', b'z']));
        let borrowed: Vec<Bytes> = sb.iter().collect();
        let owned: Vec<Bytes> = sb.into_iter().collect();
        assert_eq!(borrowed, owned);
        assert_eq!(owned.len(), 2);
    }
}
