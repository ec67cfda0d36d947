use benchmarks::{random_design, IMAGE_SIZES};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use topoprep::space::{Axes, DefaultViewConverter};

fn bench_design_to_topo(c: &mut Criterion) {
    let mut group = c.benchmark_group("design_to_topo");
    for order in ["b,0,1,c", "b,c,0,1"] {
        let axes: Axes = order.parse().unwrap();
        for &(examples, side) in IMAGE_SIZES.iter() {
            let converter = DefaultViewConverter::new(vec![side, side, 3], axes.clone()).unwrap();
            let x = random_design(examples, converter.num_features(), 3);
            let id = format!("{}/{}x{}", order, examples, side);
            group.bench_with_input(BenchmarkId::from_parameter(id), &x, |b, x| {
                b.iter(|| black_box(converter.design_to_topo(black_box(x.view())).unwrap()));
            });
        }
    }
    group.finish();
}

fn bench_topo_to_design(c: &mut Criterion) {
    let mut group = c.benchmark_group("topo_to_design");
    for order in ["b,0,1,c", "c,0,1,b"] {
        let axes: Axes = order.parse().unwrap();
        for &(examples, side) in IMAGE_SIZES.iter() {
            let converter = DefaultViewConverter::new(vec![side, side, 3], axes.clone()).unwrap();
            let x = random_design(examples, converter.num_features(), 4);
            let topo = converter.design_to_topo(x.view()).unwrap();
            let id = format!("{}/{}x{}", order, examples, side);
            group.bench_with_input(BenchmarkId::from_parameter(id), &topo, |b, topo| {
                b.iter(|| black_box(converter.topo_to_design(black_box(topo.view())).unwrap()));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_design_to_topo, bench_topo_to_design);
criterion_main!(benches);
