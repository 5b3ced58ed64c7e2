use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use go_jni_bridge::bridge::Bridge;

unsafe extern "C" fn add(a: i64, b: i64) -> i64 {
    a + b
}

fn bench_calls(c: &mut Criterion) {
    let bridge = Bridge::builtin();

    c.bench_function("void", |b| b.iter(|| bridge.no_op()));

    c.bench_function("primitive", |b| {
        b.iter(|| bridge.div_integers(black_box(10), black_box(4)).unwrap())
    });

    let parts = ["alpha", "beta", "gamma", "delta"];
    c.bench_function("string", |b| {
        b.iter(|| bridge.join_strings(black_box(&parts)).unwrap())
    });

    c.bench_function("object", |b| {
        b.iter(|| {
            let handle = bridge.new_test_map().unwrap();
            let name = bridge.test_map_get_name(handle).unwrap();
            bridge.free_handle(handle);
            name
        })
    });

    c.bench_function("callback", |b| {
        b.iter(|| bridge.call_callback_add(add).unwrap())
    });

    c.bench_function("error", |b| b.iter(|| bridge.returns_an_error().unwrap()));
}

fn bench_arrays(c: &mut Criterion) {
    let bridge = Bridge::builtin();
    let mut group = c.benchmark_group("array");
    for size in [10usize, 100, 1000, 10000] {
        let data: Vec<u8> = (0..size).map(|i| i as u8).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| bridge.echo_bytes(black_box(data)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_calls, bench_arrays);
criterion_main!(benches);
