use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vmsg_rust::middleware::metrics::PerformanceMonitor;
use vmsg_rust::modules::message::models::{AddMessageParams, NewMessage};

fn benchmark_validation(c: &mut Criterion) {
    c.bench_function("parse_valid_message", |b| {
        b.iter(|| {
            let _ = NewMessage::parse(black_box(AddMessageParams {
                name: "Alice".to_string(),
                text: "Hello world! 12345".to_string(),
            }));
        })
    });

    let long_text = "t".repeat(2000);
    c.bench_function("parse_overlong_message", |b| {
        b.iter(|| {
            let _ = NewMessage::parse(black_box(AddMessageParams {
                name: "Alice".to_string(),
                text: long_text.clone(),
            }));
        })
    });
}

fn benchmark_monitor_record(c: &mut Criterion) {
    let monitor = Arc::new(PerformanceMonitor::new());

    c.bench_function("monitor_record", |b| {
        b.iter(|| {
            monitor.record(
                black_box("/add_message"),
                black_box("POST"),
                black_box(200),
                black_box(Duration::from_millis(3)),
            );
        })
    });

    c.bench_function("monitor_get_metrics", |b| {
        b.iter(|| {
            let _metrics = monitor.get_metrics();
        })
    });
}

fn benchmark_concurrent_monitor(c: &mut Criterion) {
    for thread_count in [2, 4, 8].iter() {
        let monitor = Arc::new(PerformanceMonitor::new());

        c.bench_function(
            &format!("concurrent_record_{}_threads", thread_count),
            |b| {
                b.iter(|| {
                    let handles: Vec<_> = (0..*thread_count)
                        .map(|_| {
                            let monitor = Arc::clone(&monitor);
                            thread::spawn(move || {
                                for _ in 0..100 {
                                    monitor.record(
                                        "/add_message",
                                        "POST",
                                        200,
                                        Duration::from_millis(1),
                                    );
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }
}

criterion_group!(
    benches,
    benchmark_validation,
    benchmark_monitor_record,
    benchmark_concurrent_monitor
);
criterion_main!(benches);
