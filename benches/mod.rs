use criterion::{criterion_group, criterion_main};

mod registry;

criterion_group!(
    benches,
    codec::bench_encode_publish,
    codec::bench_decode_publish,
    codec::bench_topic_match,
    registry::bench_enqueue_acknowledge,
    registry::bench_sweep
);
criterion_main!(benches);
