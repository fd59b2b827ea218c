use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};
#[cfg(feature = "cuda")]
use cust::stream::{Stream, StreamFlags};
use radix_sort::{RadixSorter, SortConfig};
use rand::{Rng, SeedableRng};
use rand_hc::Hc128Rng;
use rayon::prelude::*;

const SEED: &[u8; 32] = b"LVXn6sWNasjDReRS2OZ9a0eY1aprVNYX";

/// Creates the specified number of random values.
fn create_random_values(values_count: usize, rng: &mut impl Rng) -> Vec<f32> {
    let mut result = Vec::with_capacity(values_count);
    for _ in 0..values_count {
        result.push(rng.gen_range(-1.0e6..1.0e6));
    }
    result
}

pub fn sort_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Algorithm comparison");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);

    let sorter = RadixSorter::new(SortConfig::default().with_verify_permutation(false)).unwrap();

    #[cfg(feature = "cuda")]
    let _ctx = cust::quick_init().unwrap();
    #[cfg(feature = "cuda")]
    let gpu_sorter = radix_sort::gpu::GpuRadixSorter::load()
        .unwrap()
        .with_verify_permutation(false);

    for values_count in [100_000u64, 1_000_000u64, 10_000_000u64] {
        let mut rng = Hc128Rng::from_seed(*SEED);
        let values = create_random_values(values_count as usize, &mut rng);

        group.bench_with_input(
            BenchmarkId::new("RadixSorter", values_count),
            &values_count,
            |b, _| {
                b.iter(|| {
                    let _ = sorter.sort(&values).unwrap();
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("RayonArgsort", values_count),
            &values_count,
            |b, _| {
                b.iter(|| {
                    let mut indices = (0..values.len() as u32).collect::<Vec<_>>();
                    indices
                        .par_sort_by(|&i, &j| values[i as usize].total_cmp(&values[j as usize]));
                    let _: Vec<f32> = indices.par_iter().map(|&i| values[i as usize]).collect();
                })
            },
        );

        #[cfg(feature = "cuda")]
        group.bench_with_input(
            BenchmarkId::new("GpuRadixSorter", values_count),
            &values_count,
            |b, _| {
                b.iter(|| {
                    let stream = Stream::new(StreamFlags::NON_BLOCKING, None).unwrap();
                    let _ = gpu_sorter.sort(&stream, &values).unwrap();
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, sort_comparison);
criterion_main!(benches);
