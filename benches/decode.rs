use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array5;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use gridseries::binary::{decode_binary, BINARY_LABELS};
use gridseries::tecplot::decode_tecplot;
use gridseries::{write_binary, write_tecplot, BinaryOptions, DecodeStrategy, GridDataset, Silent};

fn dataset(timesteps: usize, n: usize) -> GridDataset {
    let mut timeseries: Array5<f64> =
        Array5::random((timesteps, n, n, n, BINARY_LABELS.len()), Uniform::new(0., 10.));

    // the tecplot decoder needs real grid coordinates to infer the shape
    for ((_, i, j, k, v), value) in timeseries.indexed_iter_mut() {
        match v {
            0 => *value = i as f64,
            1 => *value = j as f64,
            2 => *value = k as f64,
            _ => (),
        }
    }

    let labels = BINARY_LABELS.iter().map(|l| l.to_string()).collect();
    GridDataset::new(timeseries, labels).unwrap()
}

fn binary_bytes(timesteps: usize, n: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_binary(&mut bytes, &dataset(timesteps, n)).unwrap();
    bytes
}

fn decode_binary_bench(c: &mut Criterion) {
    let bytes = binary_bytes(10, 40);
    let length = bytes.len() as u64;

    for (name, strategy) in [
        ("decode binary memory optimized", DecodeStrategy::MemoryOptimized),
        ("decode binary speed optimized", DecodeStrategy::SpeedOptimized),
    ] {
        let options = BinaryOptions::with_strategy(strategy);
        c.bench_function(name, |b| {
            b.iter(|| {
                decode_binary(black_box(bytes.as_slice()), length, &options, &mut Silent).unwrap()
            })
        });
    }
}

fn decode_tecplot_bench(c: &mut Criterion) {
    let mut text = Vec::new();
    write_tecplot(&mut text, &dataset(4, 20), "snapshot").unwrap();

    c.bench_function("decode tecplot 4x20^3", |b| {
        b.iter(|| {
            let reader = std::io::Cursor::new(black_box(text.as_slice()));
            decode_tecplot(reader, &mut Silent).unwrap()
        })
    });
}

criterion_group!(benches, decode_binary_bench, decode_tecplot_bench);
criterion_main!(benches);
