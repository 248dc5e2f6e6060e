//! # Stepwire Stream Benchmarks
//!
//! | Scenario | What is measured |
//! |----------|------------------|
//! | `count_up` | One request streaming N results through a live dispatcher |
//! | `concurrent` | N single-step requests in flight at once |
//! | `registry_deliver` | Open, route one terminal response, remove; no channel involved |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::future::join_all;
use node_runtime::{builtin_registry, NodeConfig, NodeRuntime};
use serde_json::json;
use shared_types::{ProcessingId, ResponseEnvelope};
use sw_controller::Registry;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("benchmark runtime")
}

fn bench_count_up(c: &mut Criterion) {
    let rt = runtime();
    let node = rt.block_on(async {
        NodeRuntime::start(&NodeConfig::default(), builtin_registry()).expect("node starts")
    });

    let mut group = c.benchmark_group("count_up");
    for steps in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(steps));
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            b.iter(|| {
                rt.block_on(async {
                    let mut resulter = node
                        .controller()
                        .open("count_up", vec![json!(steps)], Vec::new())
                        .await
                        .expect("open");
                    black_box(resulter.drain().await.expect("drain"))
                })
            })
        });
    }
    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    let rt = runtime();
    let node = rt.block_on(async {
        NodeRuntime::start(&NodeConfig::default(), builtin_registry()).expect("node starts")
    });

    let mut group = c.benchmark_group("concurrent");
    for requests in [8usize, 64, 256] {
        group.throughput(Throughput::Elements(requests as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(requests),
            &requests,
            |b, &requests| {
                b.iter(|| {
                    rt.block_on(async {
                        let mut resulters = Vec::with_capacity(requests);
                        for _ in 0..requests {
                            resulters.push(
                                node.controller()
                                    .open("count_up", vec![json!(1)], Vec::new())
                                    .await
                                    .expect("open"),
                            );
                        }
                        black_box(join_all(resulters.iter_mut().map(|r| r.drain())).await)
                    })
                })
            },
        );
    }
    group.finish();
}

fn bench_registry_deliver(c: &mut Criterion) {
    c.bench_function("registry_deliver", |b| {
        let registry = Registry::new();
        let id = ProcessingId::new(1);
        b.iter(|| {
            let queue = registry.open(id).expect("open");
            black_box(registry.deliver(ResponseEnvelope::complete(id, json!(1), Vec::new())));
            registry.remove(id, &queue)
        })
    });
}

criterion_group!(benches, bench_count_up, bench_concurrent, bench_registry_deliver);
criterion_main!(benches);
