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

use bytes::Bytes;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures_util::stream::{self, StreamExt};
use s3_upload::s3::aws_chunked::ChunkSigner;
use s3_upload::s3::error::Error;
use s3_upload::s3::signer::ChunkSigningContext;
use s3_upload::s3::upload::{BufferPool, MIN_PART_SIZE, plan};
use s3_upload::s3::utils::utc_now;
use std::hint::black_box;

const SEED_SIGNATURE: &str = "4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9";

fn bench_plan(c: &mut Criterion) {
    c.bench_function("plan known size", |b| {
        b.iter(|| plan(black_box(Some(5 * 1024 * 1024 * 1024 * 1024)), None))
    });
    c.bench_function("plan unknown size", |b| {
        b.iter(|| plan(black_box(None), Some(MIN_PART_SIZE)))
    });
}

fn bench_buffer_pool(c: &mut Criterion) {
    let pool = BufferPool::new(MIN_PART_SIZE as usize, 4).unwrap();
    let data = vec![1u8; 64 * 1024];
    c.bench_function("buffer pool fill and reclaim", |b| {
        b.iter(|| {
            let mut buffer = pool.take();
            while !buffer.is_full() {
                buffer.fill(&data);
            }
            pool.reclaim(buffer.freeze());
        })
    });
}

fn bench_chunk_signing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let data = Bytes::from(vec![0u8; MIN_PART_SIZE as usize]);
    let context = ChunkSigningContext::new("secret", utc_now(), "us-east-1", SEED_SIGNATURE);

    let mut group = c.benchmark_group("aws-chunked");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("sign 5MiB part", |b| {
        b.iter(|| {
            let source = stream::iter(vec![Ok::<_, Error>(data.clone())]);
            let signer = ChunkSigner::new(source, data.len() as u64, context.clone());
            rt.block_on(async { signer.map(|f| f.map(|b| b.len())).collect::<Vec<_>>().await })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_plan, bench_buffer_pool, bench_chunk_signing);
criterion_main!(benches);
