use std::{
    hint::black_box,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use weakbus::{Callback, Messenger, Payload};
use weakbus_error::HandlerResult;

struct Sink {
    total: AtomicU64,
}

impl Sink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            total: AtomicU64::new(0),
        })
    }

    fn consume(
        &self,
        payload: &Payload,
    ) -> HandlerResult {
        let step = payload.downcast_ref::<u64>().copied().unwrap_or(1);
        self.total.fetch_add(step, Ordering::Relaxed);
        Ok(())
    }
}

fn bench_register_unregister(c: &mut Criterion) {
    let bus = Messenger::new();
    let sink = Sink::new();
    let cb = Callback::bound(&sink, Sink::consume);
    c.bench_function("messenger_register_unregister", |b| {
        b.iter(|| {
            let handle = bus.register("chan", &cb).unwrap();
            black_box(bus.unregister_handle(&handle));
        })
    });
}

fn bench_send_0_sub(c: &mut Criterion) {
    let bus = Messenger::new();
    c.bench_function("send_0_subs", |b| {
        b.iter(|| bus.send("chan", black_box(&1u64)).unwrap())
    });
}

fn bench_send_n_subs(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_n_subs");
    for n in [1usize, 10, 100] {
        let bus = Messenger::new();
        let sinks: Vec<Arc<Sink>> = (0..n).map(|_| Sink::new()).collect();
        for sink in &sinks {
            bus.register("chan", &Callback::bound(sink, Sink::consume))
                .unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| bus.send("chan", black_box(&1u64)).unwrap())
        });
    }
    group.finish();
}

fn bench_send_half_dead(c: &mut Criterion) {
    let bus = Messenger::new();
    let mut alive = Vec::new();
    for i in 0..100 {
        let sink = Sink::new();
        bus.register("chan", &Callback::bound(&sink, Sink::consume))
            .unwrap();
        if i % 2 == 0 {
            alive.push(sink);
        }
    }
    c.bench_function("send_100_subs_half_dead", |b| {
        b.iter(|| bus.send("chan", black_box(&1u64)).unwrap())
    });
}

fn bench_unregister_by_callback(c: &mut Criterion) {
    let bus = Messenger::new();
    let sinks: Vec<Arc<Sink>> = (0..100).map(|_| Sink::new()).collect();
    for sink in &sinks {
        bus.register("chan", &Callback::bound(sink, Sink::consume))
            .unwrap();
    }
    // Снимаем и возвращаем одну подписку среди ста.
    let first = Callback::bound(&sinks[0], Sink::consume);
    c.bench_function("unregister_scan_100", |b| {
        b.iter(|| {
            black_box(bus.unregister("chan", &first));
            bus.register("chan", &first).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_register_unregister,
    bench_send_0_sub,
    bench_send_n_subs,
    bench_send_half_dead,
    bench_unregister_by_callback
);
criterion_main!(benches);
