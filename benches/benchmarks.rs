use criterion::{criterion_group, criterion_main};

mod decode_bench;

criterion_group!(
    benches,
    decode_bench::bench_split,
    decode_bench::bench_decode,
    decode_bench::bench_read_file_source,
);
criterion_main!(benches);
