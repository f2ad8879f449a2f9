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

//! AWS Chunked encoding with per-chunk signatures.
//!
//! Implements the `STREAMING-AWS4-HMAC-SHA256-PAYLOAD` body format, where
//! every chunk carries a signature chained to the previous one:
//!
//! ```text
//! <hex-chunk-size>;chunk-signature=<sig>\r\n
//! <chunk-data>\r\n
//! ...
//! 0;chunk-signature=<final-sig>\r\n
//! \r\n
//! ```
//!
//! The first chunk signature is seeded with the signature of the request
//! headers. Chunks are therefore signed strictly in order.
//!
//! Reference: <https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-streaming.html>

use crate::s3::error::Error;
use crate::s3::signer::{ChunkSigningContext, sign_chunk};
use crate::s3::utils::sha256_hash;
use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

/// Default chunk size for aws-chunked encoding (64 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// `;chunk-signature=` followed by a hex encoded SHA-256 HMAC
const SIGNATURE_EXTENSION_LEN: u64 = 17 + 64;

fn hex_len(n: u64) -> u64 {
    format!("{n:x}").len() as u64
}

/// Length of one encoded chunk carrying `n` data bytes.
///
/// The zero-length final chunk shares the layout: its empty data is still
/// followed by `\r\n`.
fn encoded_chunk_length(n: u64) -> u64 {
    hex_len(n) + SIGNATURE_EXTENSION_LEN + 2 + n + 2
}

/// Calculates the encoded length of `data_len` bytes split into `chunk_size`
/// chunks, including the final zero-length chunk.
pub fn encoded_length(data_len: u64, chunk_size: usize) -> u64 {
    let chunk_size = chunk_size.max(1) as u64;
    let full_chunks = data_len / chunk_size;
    let last_chunk_size = data_len % chunk_size;

    let mut length = full_chunks * encoded_chunk_length(chunk_size);
    if last_chunk_size > 0 {
        length += encoded_chunk_length(last_chunk_size);
    }
    length + encoded_chunk_length(0)
}

/// State machine for the chunk signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SignerState {
    /// Emitting signed data chunks
    Streaming,
    /// Emitting the final zero-length chunk
    FinalChunk,
    Done,
}

/// Encodes a byte stream of declared length as a signed aws-chunked body.
///
/// Input is re-chunked so that every data chunk except the last holds exactly
/// `chunk_size` bytes, which keeps [`ChunkSigner::length`] exact. A source
/// that ends before the declared length fails with
/// [`Error::InsufficientData`]; one that runs past it fails with
/// [`Error::TooMuchData`].
pub struct ChunkSigner<S> {
    inner: S,
    chunk_size: usize,
    content_length: u64,
    received: u64,
    buffer: BytesMut,
    state: SignerState,

    signing_key: Arc<[u8]>,
    date_time: String,
    scope: String,
    current_signature: String,
}

impl<S> ChunkSigner<S> {
    /// Creates a signer over `inner`, which must yield exactly `content_length` bytes.
    pub fn new(inner: S, content_length: u64, context: ChunkSigningContext) -> Self {
        Self::with_chunk_size(inner, content_length, DEFAULT_CHUNK_SIZE, context)
    }

    pub fn with_chunk_size(
        inner: S,
        content_length: u64,
        chunk_size: usize,
        context: ChunkSigningContext,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            inner,
            chunk_size,
            content_length,
            received: 0,
            buffer: BytesMut::with_capacity(chunk_size),
            state: SignerState::Streaming,
            signing_key: context.signing_key,
            date_time: context.date_time,
            scope: context.scope,
            current_signature: context.seed_signature,
        }
    }

    /// Exact number of bytes this signer emits when fully consumed.
    pub fn length(&self) -> u64 {
        encoded_length(self.content_length, self.chunk_size)
    }

    /// Signs `data` against the running chain and frames it.
    fn signed_frame(&mut self, data: &[u8]) -> Bytes {
        let signature = sign_chunk(
            &self.signing_key,
            &self.date_time,
            &self.scope,
            &self.current_signature,
            &sha256_hash(data),
        );
        let header = format!("{:x};chunk-signature={}\r\n", data.len(), signature);
        self.current_signature = signature;

        let trailer: &[u8] = if data.is_empty() { b"\r\n\r\n" } else { b"\r\n" };
        let mut output = BytesMut::with_capacity(header.len() + data.len() + trailer.len());
        output.extend_from_slice(header.as_bytes());
        output.extend_from_slice(data);
        output.extend_from_slice(trailer);
        output.freeze()
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<Bytes, Error>>> {
        self.state = SignerState::Done;
        Poll::Ready(Some(Err(err)))
    }
}

impl<S, E> Stream for ChunkSigner<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Error>,
{
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.state {
                SignerState::Streaming => {
                    if self.buffer.len() >= self.chunk_size {
                        let chunk_size = self.chunk_size;
                        let chunk = self.buffer.split_to(chunk_size);
                        let frame = self.signed_frame(&chunk);
                        return Poll::Ready(Some(Ok(frame)));
                    }

                    let inner = Pin::new(&mut self.inner);
                    match inner.poll_next(cx) {
                        Poll::Ready(Some(Ok(data))) => {
                            self.received += data.len() as u64;
                            if self.received > self.content_length {
                                let expected = self.content_length;
                                return self.fail(Error::TooMuchData(expected));
                            }
                            self.buffer.extend_from_slice(&data);
                        }
                        Poll::Ready(Some(Err(e))) => {
                            return self.fail(e.into());
                        }
                        Poll::Ready(None) => {
                            if self.received < self.content_length {
                                let (expected, got) = (self.content_length, self.received);
                                return self.fail(Error::InsufficientData { expected, got });
                            }
                            self.state = SignerState::FinalChunk;
                            if !self.buffer.is_empty() {
                                let chunk = self.buffer.split();
                                let frame = self.signed_frame(&chunk);
                                return Poll::Ready(Some(Ok(frame)));
                            }
                        }
                        Poll::Pending => {
                            return Poll::Pending;
                        }
                    }
                }

                SignerState::FinalChunk => {
                    self.state = SignerState::Done;
                    let frame = self.signed_frame(&[]);
                    return Poll::Ready(Some(Ok(frame)));
                }

                SignerState::Done => {
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::utils::UtcTime;
    use chrono::{TimeZone, Utc};
    use futures_util::stream::{self, StreamExt};

    const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";
    const SEED_SIGNATURE: &str = "4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9";

    fn test_date() -> UtcTime {
        Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap()
    }

    fn context() -> ChunkSigningContext {
        ChunkSigningContext::new(SECRET_KEY, test_date(), "us-east-1", SEED_SIGNATURE)
    }

    fn source(
        pieces: Vec<Vec<u8>>,
    ) -> impl Stream<Item = Result<Bytes, Error>> + Unpin + Send + 'static {
        stream::iter(pieces.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    async fn encode(pieces: Vec<Vec<u8>>, declared: u64) -> Result<(Vec<u8>, u64), Error> {
        let signer = ChunkSigner::new(source(pieces), declared, context());
        let length = signer.length();
        let frames: Vec<Result<Bytes, Error>> = signer.collect().await;
        let mut out = Vec::new();
        for f in frames {
            out.extend_from_slice(&f?);
        }
        Ok((out, length))
    }

    #[tokio::test]
    async fn matches_aws_example() {
        // 65536 + 1024 bytes, split oddly to exercise re-chunking
        let pieces = vec![vec![b'a'; 1000], vec![b'a'; 65000], vec![b'a'; 560]];
        let (body, length) = encode(pieces, 66560).await.unwrap();
        assert_eq!(length, 66824);
        assert_eq!(body.len() as u64, length);

        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with(
            "10000;chunk-signature=ad80c730a21e5b8d04586a2213dd63b9a0e99e0e2307b0ade35a65485a288648\r\n"
        ));
        assert!(text.contains(
            "\r\n400;chunk-signature=0055627c9e194cb4542bae2aa5492e3c1575bbb81b612b7d234b86a503ef5497\r\n"
        ));
        assert!(text.ends_with(
            "0;chunk-signature=b6c6ea8a5354eaf15b3cb7646744f4275b71ea724fed81ceb9323e279d449df9\r\n\r\n"
        ));
    }

    #[tokio::test]
    async fn declared_length_matches_encoded_bytes() {
        for size in [0usize, 1, DEFAULT_CHUNK_SIZE, 3 * DEFAULT_CHUNK_SIZE + 17] {
            let (body, length) = encode(vec![vec![7u8; size]], size as u64).await.unwrap();
            assert_eq!(body.len() as u64, length, "size {size}");
            assert_eq!(encoded_length(size as u64, DEFAULT_CHUNK_SIZE), length);
        }
    }

    #[tokio::test]
    async fn empty_body_is_only_final_chunk() {
        let (body, _) = encode(vec![], 0).await.unwrap();
        assert_eq!(body.len(), 86);
        assert!(body.starts_with(b"0;chunk-signature="));
        assert!(body.ends_with(b"\r\n\r\n"));
    }

    #[tokio::test]
    async fn signing_is_deterministic() {
        let data = vec![vec![1u8; 70_000], vec![2u8; 70_000]];
        let (first, _) = encode(data.clone(), 140_000).await.unwrap();
        let (second, _) = encode(data, 140_000).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn truncated_source_is_insufficient_data() {
        let err = encode(vec![vec![0u8; 100]], 200).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                expected: 200,
                got: 100
            }
        ));
    }

    #[tokio::test]
    async fn oversized_source_is_too_much_data() {
        let err = encode(vec![vec![0u8; 300]], 200).await.unwrap_err();
        assert!(matches!(err, Error::TooMuchData(200)));
    }

    #[tokio::test]
    async fn small_chunk_size_chains_every_chunk() {
        let signer = ChunkSigner::with_chunk_size(source(vec![b"abcdefg".to_vec()]), 7, 3, context());
        let frames: Vec<Bytes> = signer.map(|f| f.unwrap()).collect().await;
        // 3 + 3 + 1 + final
        assert_eq!(frames.len(), 4);
        assert!(frames[0].starts_with(b"3;chunk-signature="));
        assert!(frames[2].starts_with(b"1;chunk-signature="));
        assert_eq!(
            frames.iter().map(|f| f.len() as u64).sum::<u64>(),
            encoded_length(7, 3)
        );
    }
}
