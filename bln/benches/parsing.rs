//! Benchmarks pour le parsing BLN

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Contour synthétique: un cercle de `n` sommets avec en-tête
fn synthetic_boundary(n: usize) -> String {
    let mut content = format!("{},1,\"synthetic\"\n", n);
    for i in 0..n {
        let angle = i as f64 / n as f64 * std::f64::consts::TAU;
        content.push_str(&format!("{:.6},{:.6}\n", angle.cos() * 100.0, angle.sin() * 100.0));
    }
    content
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_str");

    for n in [1_000, 100_000] {
        let content = synthetic_boundary(n);
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n), &content, |b, content| {
            b.iter(|| {
                let points = bln::parse_str(black_box(content)).unwrap();
                black_box(points)
            })
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let content = synthetic_boundary(10_000);
    let points = bln::parse_str(&content).unwrap();

    let mut group = c.benchmark_group("build");
    group.sample_size(20);

    group.bench_function("circle_10k", |b| {
        b.iter(|| black_box(bln::build(black_box(&points))))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_build);
criterion_main!(benches);
