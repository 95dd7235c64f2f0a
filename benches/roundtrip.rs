//! Buffer round-trip throughput per built-in codec.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn corpus(len: usize) -> Vec<u8> {
    // Moderately compressible: repeating structured text with a counter.
    let mut out = Vec::with_capacity(len + 64);
    let mut i = 0u64;
    while out.len() < len {
        out.extend_from_slice(format!("record {i}: the quick brown fox; ").as_bytes());
        i += 1;
    }
    out.truncate(len);
    out
}

fn bench_roundtrip(c: &mut Criterion) {
    let input = corpus(64 * 1024);

    let mut group = c.benchmark_group("roundtrip");
    group.throughput(Throughput::Bytes(input.len() as u64));

    for name in ["zlib", "lz4", "zstd", "brotli", "store"] {
        let codec = crimp::get_codec(name).expect("built-in codec");
        let max = codec.max_compressed_size(input.len()).expect("max size");

        group.bench_with_input(BenchmarkId::new("compress", name), &input, |b, input| {
            let mut out = vec![0u8; max];
            b.iter(|| codec.compress(&mut out, input, None).expect("compress"));
        });

        let mut packed = vec![0u8; max];
        let n = codec.compress(&mut packed, &input, None).expect("compress");
        packed.truncate(n);

        group.bench_with_input(BenchmarkId::new("decompress", name), &packed, |b, packed| {
            let mut out = vec![0u8; input.len()];
            b.iter(|| codec.decompress(&mut out, packed, None).expect("decompress"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
