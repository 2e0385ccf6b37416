use std::hint::black_box;

use criterion::Criterion;
use iotlink::mqtt::registry::{AckRegistry, SubscribeEntry, SubscribeIntent};
use iotlink::mqtt::MAX_SUB_WAIT;

fn entry(packet_id: u16) -> SubscribeEntry {
    SubscribeEntry {
        packet_id,
        sent_at: 0,
        intent: SubscribeIntent::Subscribe,
        filter: heapless::String::try_from("devices/+/telemetry").unwrap(),
    }
}

pub fn bench_enqueue_acknowledge(c: &mut Criterion) {
    c.bench_function("registry_enqueue_acknowledge", |b| {
        let mut registry: AckRegistry<SubscribeEntry, MAX_SUB_WAIT> = AckRegistry::new();
        b.iter(|| {
            for id in 1..=MAX_SUB_WAIT as u16 {
                registry.enqueue(entry(id)).unwrap();
            }
            for id in 1..=MAX_SUB_WAIT as u16 {
                black_box(registry.acknowledge(id).unwrap());
            }
        });
    });
}

pub fn bench_sweep(c: &mut Criterion) {
    c.bench_function("registry_sweep", |b| {
        let mut registry: AckRegistry<SubscribeEntry, MAX_SUB_WAIT> = AckRegistry::new();
        b.iter(|| {
            for id in 1..=MAX_SUB_WAIT as u16 {
                registry.enqueue(entry(id)).unwrap();
            }
            black_box(registry.sweep(10_000, 5_000));
        });
    });
}
