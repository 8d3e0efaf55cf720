//! Compression benchmarks for ALICE-Arith

use alice_arith::{decode, encode, ArithCodec, CodecConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn generate_log_data(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| {
            format!(
                "2024-01-{:02} {:02}:{:02}:{:02} {} User {} logged in from 192.168.1.{}\n",
                (i % 28) + 1,
                i % 24,
                i % 60,
                i % 60,
                ["INFO", "WARN", "ERROR", "DEBUG"][i % 4],
                i % 1000,
                i % 256
            )
        })
        .collect::<String>()
        .into_bytes()
}

fn block_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("block");

    for (name, lines) in [("1kb", 15), ("10kb", 150), ("100kb", 1500)] {
        let data = generate_log_data(lines);
        let encoded = encode(&data);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(format!("encode_{}", name), |b| {
            b.iter(|| encode(black_box(&data)))
        });
        group.bench_function(format!("decode_{}", name), |b| {
            b.iter(|| decode(black_box(&encoded)).unwrap())
        });
    }

    group.finish();
}

fn parallel_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel");

    // ~1MB
    let data = generate_log_data(15_000);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for block_size in [64 * 1024, 256 * 1024] {
        let mut codec = ArithCodec::new(CodecConfig::new(block_size)).unwrap();
        let compressed = codec.compress(&data).unwrap();

        group.bench_function(format!("compress_{}k", block_size / 1024), |b| {
            b.iter(|| codec.compress(black_box(&data)).unwrap())
        });
        group.bench_function(format!("decompress_{}k", block_size / 1024), |b| {
            b.iter(|| codec.decompress(black_box(&compressed)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, block_benchmark, parallel_benchmark);
criterion_main!(benches);
