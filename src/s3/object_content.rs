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

//! Sources of object data for uploads

use crate::s3::segmented_bytes::SegmentedBytes;
use async_std::io::ReadExt;
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;

type IoResult<T> = core::result::Result<T, std::io::Error>;

type BoxedByteStream = Pin<Box<dyn Stream<Item = IoResult<Bytes>> + Send>>;

const FILE_READ_BUFFER_SIZE: usize = 64 * 1024;

// region: Size

/// Size of an object, which is unknown for open-ended streams.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default)]
pub enum Size {
    Known(u64),
    #[default]
    Unknown,
}

impl Size {
    /// Returns the size if known, otherwise returns `None`.
    pub fn value(&self) -> Option<u64> {
        match self {
            Size::Known(v) => Some(*v),
            Size::Unknown => None,
        }
    }
}

impl From<Option<u64>> for Size {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(v) => Size::Known(v),
            None => Size::Unknown,
        }
    }
}

impl From<u64> for Size {
    fn from(value: u64) -> Self {
        Size::Known(value)
    }
}
// endregion: Size

/// Object content to upload.
///
/// Can be constructed from a stream of `Bytes`, a file path, or in-memory
/// data such as `Bytes`, `Vec<u8>` or `String`.
pub struct ObjectContent(ObjectContentInner);

enum ObjectContentInner {
    Stream(BoxedByteStream, Size),
    FilePath(PathBuf),
    Bytes(SegmentedBytes),
}

impl fmt::Debug for ObjectContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ObjectContentInner::Stream(_, size) => {
                f.debug_tuple("ObjectContent::Stream").field(size).finish()
            }
            ObjectContentInner::FilePath(path) => {
                f.debug_tuple("ObjectContent::FilePath").field(path).finish()
            }
            ObjectContentInner::Bytes(sb) => f
                .debug_tuple("ObjectContent::Bytes")
                .field(&sb.len())
                .finish(),
        }
    }
}

impl From<Bytes> for ObjectContent {
    fn from(value: Bytes) -> Self {
        ObjectContent(ObjectContentInner::Bytes(SegmentedBytes::from(value)))
    }
}

impl From<SegmentedBytes> for ObjectContent {
    fn from(value: SegmentedBytes) -> Self {
        ObjectContent(ObjectContentInner::Bytes(value))
    }
}

impl From<String> for ObjectContent {
    fn from(value: String) -> Self {
        ObjectContent(ObjectContentInner::Bytes(SegmentedBytes::from(value)))
    }
}

impl From<Vec<u8>> for ObjectContent {
    fn from(value: Vec<u8>) -> Self {
        ObjectContent(ObjectContentInner::Bytes(SegmentedBytes::from(value)))
    }
}

impl From<&'static [u8]> for ObjectContent {
    fn from(value: &'static [u8]) -> Self {
        ObjectContent(ObjectContentInner::Bytes(SegmentedBytes::from(
            Bytes::from_static(value),
        )))
    }
}

impl From<&'static str> for ObjectContent {
    fn from(value: &'static str) -> Self {
        ObjectContent(ObjectContentInner::Bytes(SegmentedBytes::from(
            Bytes::from_static(value.as_bytes()),
        )))
    }
}

impl From<&Path> for ObjectContent {
    fn from(value: &Path) -> Self {
        ObjectContent(ObjectContentInner::FilePath(value.to_path_buf()))
    }
}

impl Default for ObjectContent {
    fn default() -> Self {
        ObjectContent(ObjectContentInner::Bytes(SegmentedBytes::new()))
    }
}

impl ObjectContent {
    /// Create a new `ObjectContent` from a stream of `Bytes`.
    ///
    /// A known size is enforced during upload: a stream that ends early or
    /// runs past it fails the upload.
    pub fn new_from_stream(
        r: impl Stream<Item = IoResult<Bytes>> + Send + 'static,
        size: impl Into<Size>,
    ) -> Self {
        ObjectContent(ObjectContentInner::Stream(Box::pin(r), size.into()))
    }

    pub async fn to_stream(self) -> IoResult<(BoxedByteStream, Size)> {
        match self.0 {
            ObjectContentInner::Stream(r, size) => Ok((r, size)),

            ObjectContentInner::FilePath(path) => {
                let mut file = async_std::fs::File::open(&path).await?;
                let size = file.metadata().await?.len();

                let stream = async_stream::try_stream! {
                    let mut buf = vec![0u8; FILE_READ_BUFFER_SIZE];
                    loop {
                        let n = file.read(&mut buf).await?;
                        if n == 0 {
                            break;
                        }
                        yield Bytes::copy_from_slice(&buf[..n]);
                    }
                };

                Ok((Box::pin(stream), Size::Known(size)))
            }

            ObjectContentInner::Bytes(sb) => {
                let k = sb.len() as u64;
                let r = Box::pin(stream::iter(sb.into_iter().map(Ok)));
                Ok((r, Size::Known(k)))
            }
        }
    }

    #[allow(clippy::wrong_self_convention)]
    pub(crate) async fn to_content_stream(self) -> IoResult<ContentStream> {
        let (r, size) = self.to_stream().await?;
        Ok(ContentStream::new(r, size))
    }

    /// Load the content into memory and return a `SegmentedBytes` object.
    pub async fn to_segmented_bytes(self) -> IoResult<SegmentedBytes> {
        let mut segmented_bytes = SegmentedBytes::new();
        let (mut r, _) = self.to_stream().await?;
        while let Some(bytes) = r.next().await {
            segmented_bytes.append(bytes?);
        }
        Ok(segmented_bytes)
    }
}

/// A byte stream that can be consumed in exact-sized pieces.
pub struct ContentStream {
    r: BoxedByteStream,
    extra: Option<Bytes>,
    size: Size,
}

impl Default for ContentStream {
    fn default() -> Self {
        ContentStream::empty()
    }
}

impl ContentStream {
    pub fn new(
        r: impl Stream<Item = IoResult<Bytes>> + Send + 'static,
        size: impl Into<Size>,
    ) -> Self {
        Self {
            r: Box::pin(r),
            extra: None,
            size: size.into(),
        }
    }

    pub fn empty() -> Self {
        Self {
            r: Box::pin(stream::empty()),
            extra: None,
            size: Size::Known(0),
        }
    }

    pub fn get_size(&self) -> Size {
        self.size
    }

    /// Reads as many bytes as possible up to `n`. Fewer than `n` bytes are
    /// only returned at the end of the stream.
    pub async fn read_upto(&mut self, n: usize) -> IoResult<SegmentedBytes> {
        let mut segmented_bytes = SegmentedBytes::new();
        let mut remaining = n;
        if let Some(extra) = self.extra.take() {
            let len = extra.len();
            if len <= remaining {
                segmented_bytes.append(extra);
                remaining -= len;
            } else {
                segmented_bytes.append(extra.slice(0..remaining));
                self.extra = Some(extra.slice(remaining..));
                return Ok(segmented_bytes);
            }
        }
        while remaining > 0 {
            let Some(bytes) = self.r.next().await else {
                break;
            };
            let bytes = bytes?;
            let len = bytes.len();
            if len <= remaining {
                segmented_bytes.append(bytes);
                remaining -= len;
            } else {
                segmented_bytes.append(bytes.slice(0..remaining));
                self.extra = Some(bytes.slice(remaining..));
                break;
            }
        }
        Ok(segmented_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(chunks: &[&'static [u8]]) -> ContentStream {
        let items: Vec<IoResult<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        ContentStream::new(stream::iter(items), Size::Unknown)
    }

    #[tokio::test]
    async fn read_upto_splits_and_keeps_remainder() {
        let mut cs = chunked(&[b"abcd", b"", b"efgh", b"ij"]);
        assert_eq!(cs.read_upto(3).await.unwrap().to_bytes(), "abc");
        assert_eq!(cs.read_upto(6).await.unwrap().to_bytes(), "defghi");
        assert_eq!(cs.read_upto(6).await.unwrap().to_bytes(), "j");
        assert!(cs.read_upto(6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_content_reports_size() {
        let (_, size) = ObjectContent::from("hello").to_stream().await.unwrap();
        assert_eq!(size, Size::Known(5));
        let sb = ObjectContent::from(vec![1u8, 2, 3])
            .to_segmented_bytes()
            .await
            .unwrap();
        assert_eq!(sb.len(), 3);
    }

    #[tokio::test]
    async fn stream_errors_are_propagated() {
        let items: Vec<IoResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::other("boom")),
        ];
        let mut cs = ContentStream::new(stream::iter(items), Size::Unknown);
        assert!(cs.read_upto(10).await.is_err());
    }

    #[tokio::test]
    async fn file_content_streams_whole_file() {
        let path = std::env::temp_dir().join(format!("object-content-{}.bin", std::process::id()));
        std::fs::write(&path, vec![7u8; 100_000]).unwrap();
        let mut cs = ObjectContent::from(path.as_path())
            .to_content_stream()
            .await
            .unwrap();
        assert_eq!(cs.get_size(), Size::Known(100_000));
        assert_eq!(cs.read_upto(200_000).await.unwrap().len(), 100_000);
        std::fs::remove_file(&path).unwrap();
    }
}
