use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_topomap::prelude::*;

fn random_ids(n: usize, ncells: u32, seed: u64) -> Array<u32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    Array::from_vec((0..n).map(|_| rng.gen_range(0..ncells)).collect())
}

fn bench_packed_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("info_topology_packed_map");

    for &side in &[64usize, 256] {
        let mut cells: CellSet = RegularStructure::new(&[side, side]).unwrap().into();
        let n = side * side;
        let weights = Array::from_vec((0..n).map(|i| i as f64).collect());
        let ids = random_ids(n, n as u32, 42);
        let mut out = Array::<f64>::zeros(n);

        group.bench_with_input(BenchmarkId::new("identity_host", n), &n, |b, _| {
            b.iter(|| {
                InfoTopologyPackedMapOp::new(
                    &mut cells,
                    Topology::NodesOfCells,
                    &weights,
                    &mut out,
                    IndexMap::Identity,
                    |shape: ShapeType, w: f64| w * f64::from(shape.code()),
                )
                .go_host()
                .unwrap();
                black_box(&out);
            });
        });

        group.bench_with_input(BenchmarkId::new("gather_host", n), &n, |b, _| {
            b.iter(|| {
                TopologyPackedMapOp::new(
                    &mut cells,
                    Topology::NodesOfCells,
                    &weights,
                    &mut out,
                    IndexMap::gather(&ids),
                    |_shape: ShapeType, nodes: &[u32], w: f64| w + f64::from(nodes[0]),
                )
                .go_host()
                .unwrap();
                black_box(&out);
            });
        });
    }

    group.finish();
}

#[cfg(feature = "device")]
fn bench_device(c: &mut Criterion) {
    let mut group = c.benchmark_group("info_topology_packed_map_device");

    for &side in &[64usize, 256] {
        let mut cells: CellSet = RegularStructure::new(&[side, side]).unwrap().into();
        let n = side * side;
        let mut out = Array::<u8>::zeros(n);
        out.ensure_resident(Location::Device).unwrap();

        group.bench_with_input(BenchmarkId::new("identity_device", n), &n, |b, _| {
            b.iter(|| {
                InfoTopologyPackedMapOp::new(
                    &mut cells,
                    Topology::NodesOfCells,
                    (),
                    &mut out,
                    IndexMap::Identity,
                    |shape: ShapeType, ()| shape.code(),
                )
                .go_device()
                .unwrap();
            });
        });
    }

    group.finish();
}

#[cfg(not(feature = "device"))]
fn bench_device(_c: &mut Criterion) {}

criterion_group!(benches, bench_packed_map, bench_device);
criterion_main!(benches);
