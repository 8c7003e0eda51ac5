use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{s, Array5};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use gridseries::{merge_datasets, DatasetSource, GridDataset, InMemory, MergeOptions, Silent};

fn dataset(n: usize, labels: &[&str]) -> GridDataset {
    let mut timeseries: Array5<f64> =
        Array5::random((5, n, n, n, labels.len()), Uniform::new(-1., 1.));

    for (v, mut coordinate) in timeseries
        .slice_mut(s![.., .., .., .., ..3])
        .axis_iter_mut(ndarray::Axis(4))
        .enumerate()
    {
        coordinate.indexed_iter_mut().for_each(|((_, i, j, k), value)| {
            *value = [i, j, k][v] as f64;
        });
    }

    let labels = labels.iter().map(|l| l.to_string()).collect();
    GridDataset::new(timeseries, labels).unwrap()
}

fn merge_bench(c: &mut Criterion) {
    let base = dataset(32, &["x", "y", "z", "vx", "vy", "vz", "jx", "jy", "jz", "p", "f"]);
    let deltas: Vec<GridDataset> = ["du", "dv", "dw"]
        .iter()
        .map(|d| {
            let dx = format!("{d}_dx");
            let dy = format!("{d}_dy");
            let dz = format!("{d}_dz");
            dataset(32, &["x", "y", "z", dx.as_str(), dy.as_str(), dz.as_str()])
        })
        .collect();

    c.bench_function("merge base with three deltas 32^3", |b| {
        b.iter(|| {
            let base = InMemory::new("base".into(), &base);
            let sources: Vec<InMemory> = deltas
                .iter()
                .map(|d| InMemory::new("delta".into(), d))
                .collect();
            let sources: Vec<&dyn DatasetSource> =
                sources.iter().map(|s| s as &dyn DatasetSource).collect();

            let options = MergeOptions::default();
            merge_datasets(black_box(&base), &sources, options, &mut Silent).unwrap()
        })
    });
}

criterion_group!(benches, merge_bench);
criterion_main!(benches);
