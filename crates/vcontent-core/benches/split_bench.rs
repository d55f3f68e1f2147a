//! Benchmarks for content splitting and pointer lookup.
//!
//! Run with: cargo bench -p vcontent-core --bench split_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use vcontent_core::{ChunkGeometry, ContentSplitter, ContentType, GeometryCache, ViewportTracker};

// ── Workload Generators ─────────────────────────────────────────────────

fn prose(bytes: usize) -> String {
    "Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
        .chars()
        .cycle()
        .take(bytes)
        .collect()
}

/// Paragraphs with attributes long enough to straddle chunk boundaries.
fn markup(bytes: usize) -> String {
    let block = r#"<p class="para" data-note="a fairly long attribute value">Some <b>bold</b> and <a href="/x/y/z">linked</a> words.</p>"#;
    let mut out = String::with_capacity(bytes + block.len());
    while out.len() < bytes {
        out.push_str(block);
    }
    out
}

// ── Benchmark Functions ─────────────────────────────────────────────────

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let splitter = ContentSplitter::new(10 * 1024);

    for &size in &[64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let text = prose(size);
        let html = markup(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("text", size), &text, |b, source| {
            b.iter(|| black_box(splitter.split(source, ContentType::Text)));
        });
        group.bench_with_input(BenchmarkId::new("markup", size), &html, |b, source| {
            b.iter(|| black_box(splitter.split(source, ContentType::Html)));
        });
    }
    group.finish();
}

fn bench_current_pointer(c: &mut Criterion) {
    let mut group = c.benchmark_group("current_pointer");

    for &count in &[100usize, 1_000, 10_000] {
        let mut cache = GeometryCache::new(count);
        for index in 0..count {
            let geometry = ChunkGeometry {
                top: index as f64 * 400.0,
                height: 400.0,
                left_pad: 0.0,
            };
            cache.record(index, geometry).unwrap();
        }
        let bottom = count as f64 * 400.0;

        group.bench_with_input(BenchmarkId::from_parameter(count), &cache, |b, cache| {
            b.iter(|| {
                let mut position = 0.0;
                while position < bottom {
                    black_box(ViewportTracker::current_pointer(cache, position, 0));
                    position += bottom / 64.0;
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_split, bench_current_pointer);
criterion_main!(benches);
