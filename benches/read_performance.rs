//! Performance benchmarks for hotswap-registry.
//!
//! - Handle read latency
//! - Concurrent readers
//! - Reads while reload passes run
//! - Cost of a full reload pass

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use hotswap_registry::core::Registry;
use hotswap_registry::reload::ReloadEngine;
use hotswap_registry::sources::LuaLoader;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn lua_engine(registry: &Arc<Registry>, contents: &str) -> (TempDir, ReloadEngine) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.lua");
    std::fs::write(&path, contents).unwrap();
    let engine = ReloadEngine::new(Arc::clone(registry), Arc::new(LuaLoader::new()), vec![path]);
    (temp_dir, engine)
}

/// Benchmark single-threaded read latency
fn benchmark_read_latency(c: &mut Criterion) {
    let registry = Registry::new();
    let seven = registry.declare::<i32>("seven");
    let names = registry.declare::<Vec<String>>("names");

    let mut group = c.benchmark_group("read_latency");
    group.bench_function("handle_get", |b| {
        b.iter(|| {
            let value = seven.get();
            black_box(*value);
        });
    });
    group.bench_function("handle_load", |b| {
        b.iter(|| {
            let value = seven.load();
            black_box(**value);
        });
    });
    group.bench_function("handle_get_list", |b| {
        b.iter(|| {
            let value = names.get();
            black_box(value.len());
        });
    });
    group.finish();
}

/// Benchmark concurrent reads with varying thread counts
fn benchmark_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_reads");

    for num_threads in [1, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let registry = Registry::new();
                let handle = registry.declare::<f64>("value");
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let mut threads = vec![];

                    for _ in 0..num_threads {
                        let handle = handle.clone();
                        let b = Arc::clone(&barrier);

                        threads.push(thread::spawn(move || {
                            b.wait();

                            let start = std::time::Instant::now();
                            for _ in 0..iters {
                                black_box(*handle.get());
                            }
                            start.elapsed()
                        }));
                    }

                    barrier.wait();

                    let total_duration: Duration =
                        threads.into_iter().map(|h| h.join().unwrap()).sum();
                    total_duration / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reload passes with 16 readers hammering the same handle
fn benchmark_reload_under_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload_under_load");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("reload_with_16_readers", |b| {
        let registry = Arc::new(Registry::new());
        let seven = registry.declare::<i32>("seven");
        let (_temp_dir, engine) = lua_engine(&registry, "seven = 7\n");

        b.iter_custom(|iters| {
            let keep_running = Arc::new(AtomicBool::new(true));
            let reads_completed = Arc::new(AtomicUsize::new(0));

            let mut readers = vec![];
            for _ in 0..16 {
                let handle = seven.clone();
                let running = Arc::clone(&keep_running);
                let counter = Arc::clone(&reads_completed);

                readers.push(thread::spawn(move || {
                    while running.load(Ordering::Relaxed) {
                        black_box(*handle.get());
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                }));
            }

            let start = std::time::Instant::now();
            for _ in 0..iters {
                engine.reload().unwrap();
            }
            let duration = start.elapsed();

            keep_running.store(false, Ordering::Relaxed);
            for reader in readers {
                reader.join().unwrap();
            }

            let total_reads = reads_completed.load(Ordering::Relaxed);
            println!("  Completed {} reads during {} reloads", total_reads, iters);

            duration
        });
    });

    group.finish();
}

/// Benchmark a full pass over registries of increasing size
fn benchmark_reload_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload_pass");

    for keys in [10, 100, 1000] {
        group.throughput(Throughput::Elements(keys as u64));

        let mut contents = String::from("values = {\n");
        for i in 0..keys {
            let _ = writeln!(contents, "    key_{} = {},", i, i);
        }
        contents.push_str("}\n");

        let registry = Arc::new(Registry::new());
        for i in 0..keys {
            registry.declare::<i32>(&format!("values.key_{}", i));
        }
        let (_temp_dir, engine) = lua_engine(&registry, &contents);

        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            b.iter(|| black_box(engine.reload().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark comparison with lock-based approaches
fn benchmark_mutex_comparison(c: &mut Criterion) {
    use std::sync::Mutex;

    let mut group = c.benchmark_group("mutex_comparison");

    let registry = Registry::new();
    let handle = registry.declare::<i32>("value");
    group.bench_function("handle_read", |b| {
        b.iter(|| black_box(*handle.get()));
    });

    let value_mutex = Mutex::new(Arc::new(0i32));
    group.bench_function("mutex_arc_read", |b| {
        b.iter(|| {
            let value = value_mutex.lock().unwrap();
            black_box(**value);
        });
    });

    let value_rwlock = std::sync::RwLock::new(0i32);
    group.bench_function("rwlock_read", |b| {
        b.iter(|| {
            let value = value_rwlock.read().unwrap();
            black_box(*value);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_read_latency,
    benchmark_concurrent_reads,
    benchmark_reload_under_load,
    benchmark_reload_pass,
    benchmark_mutex_comparison,
);

criterion_main!(benches);
