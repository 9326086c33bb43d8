use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dutycycle_core::ProtocolConfig;
use dutycycle_sim::{Population, Scheduler};

const TICKS_PER_ITERATION: u64 = 10_000;

fn scheduler_for(population: &Population) -> Scheduler {
    Scheduler::new(ProtocolConfig::default(), population.configs()).unwrap()
}

fn bench_tick_staggered(c: &mut Criterion) {
    let population = Population::staggered(5, 5, 500);

    c.bench_function("tick_staggered_5_devices", |b| {
        b.iter_batched(
            || scheduler_for(&population),
            |mut scheduler| {
                for _ in 0..TICKS_PER_ITERATION {
                    scheduler.tick().unwrap();
                }
                black_box(scheduler.time())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_tick_jittered(c: &mut Criterion) {
    let population = Population::jittered(50, 10_000, 1_000, 42);

    c.bench_function("tick_jittered_50_devices", |b| {
        b.iter_batched(
            || scheduler_for(&population),
            |mut scheduler| {
                for _ in 0..TICKS_PER_ITERATION {
                    scheduler.tick().unwrap();
                }
                black_box(scheduler.metrics().channel.collision_ticks)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_tick_staggered, bench_tick_jittered);
criterion_main!(benches);
