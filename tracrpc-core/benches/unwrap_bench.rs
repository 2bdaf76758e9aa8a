use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tracrpc_core::{compile, encode_envelope, unwrap_response, IdAllocator, PendingQueue, Value};

fn bench_unwrap_multicall(c: &mut Criterion) {
    let mut group = c.benchmark_group("unwrap_multicall");

    for size in [1, 10, 100, 1000].iter() {
        let entries: Vec<_> = (1..=*size)
            .map(|id| {
                json!({
                    "result": [
                        id.to_string(),
                        {"__jsonclass__": ["datetime", "20240102T03:04:05"]},
                        {"__jsonclass__": ["datetime", "20240103T03:04:05"]},
                        {"summary": "Crash on save", "status": "new", "owner": "alice"}
                    ],
                    "error": null,
                    "id": id
                })
            })
            .collect();
        let reply = json!({"result": entries, "error": null, "id": size + 1});

        group.bench_with_input(BenchmarkId::new("calls", size), &reply, |b, reply| {
            b.iter(|| black_box(unwrap_response(reply.clone())))
        });
    }
    group.finish();
}

fn bench_compile_and_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_encode");

    for size in [1, 10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("calls", size), size, |b, &size| {
            b.iter(|| {
                let ids = IdAllocator::new();
                let mut queue = PendingQueue::new();
                for i in 0..size {
                    let _ = queue.enqueue(&ids, "ticket.get", vec![Value::from(i as i64)], None);
                }
                let envelope = compile(&mut queue, &ids, true);
                black_box(envelope.map(|e| encode_envelope(&e)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_unwrap_multicall, bench_compile_and_encode);
criterion_main!(benches);
