use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Write;
use std::path::Path;

use mimefilter::filter::{filter_chunks, FilterSpec};
use mimefilter::stream::FilterStream;

fn corpus() -> Vec<u8> {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("message.eml");
    let message = std::fs::read(fixture).unwrap();
    message.repeat(256)
}

fn bench_single_filters(c: &mut Criterion) {
    let data = corpus();
    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for name in ["chomp", "from", "crlf-encode-dots", "strip-header:Bcc"] {
        let spec: FilterSpec = name.parse().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| {
                let mut filter = spec.build();
                filter_chunks(&mut filter, data.chunks(4096)).len()
            })
        });
    }
    group.finish();
}

fn bench_chain_chunk_sizes(c: &mut Criterion) {
    let data = corpus();
    let specs: Vec<FilterSpec> = ["strip-header:Bcc", "from", "crlf-encode"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    let mut group = c.benchmark_group("chain");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [64usize, 1024, 16 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut stream = FilterStream::new(Vec::with_capacity(data.len() * 2));
                for spec in &specs {
                    stream.add(spec.build());
                }
                for piece in data.chunks(chunk) {
                    stream.write_all(piece).unwrap();
                }
                stream.finish().unwrap().len()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_filters, bench_chain_chunk_sizes);
criterion_main!(benches);
