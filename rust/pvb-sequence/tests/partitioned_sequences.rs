use pvb_bits::{
    BitVectorBuilder, REGION_ALIGNMENT,
    collection::{BitVectorCollection, BitVectorCollectionBuilder},
};
use pvb_codecs::{StreamVByteBlock, VByteBlock};
use pvb_sequence::{
    BuildConfig, GlobalParameters, IndexedSequence, PartitionedSequence, PositiveSequence,
    SequenceEnumerator, SequenceFormat, UniformPartitionedSequence,
};

fn lists(seed: u64) -> Vec<(Vec<u64>, u64)> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..30)
        .map(|i| {
            let n = match i % 3 {
                0 => rng.usize(1..20),
                1 => rng.usize(100..1000),
                _ => rng.usize(3000..6000),
            };
            let mut values = Vec::with_capacity(n);
            let mut cur = rng.u64(0..50);
            for j in 0..n {
                values.push(cur);
                // alternate dense runs and sparse stretches
                cur += if (j / 300) % 2 == 0 { 1 } else { rng.u64(1..5000) };
            }
            let universe = cur + rng.u64(0..10);
            (values, universe)
        })
        .collect()
}

fn write_all<S: SequenceFormat>(
    lists: &[(Vec<u64>, u64)],
    params: &GlobalParameters,
    config: &BuildConfig,
) -> BitVectorCollection {
    let mut collection = BitVectorCollectionBuilder::new();
    for (values, universe) in lists {
        let mut region = BitVectorBuilder::new();
        S::write(&mut region, values, *universe, params, config).unwrap();
        region.pad_to(REGION_ALIGNMENT);
        collection.append(&region);
    }
    collection.build()
}

fn check_all<S: SequenceFormat>(
    collection: &BitVectorCollection,
    lists: &[(Vec<u64>, u64)],
    params: &GlobalParameters,
) {
    let mut rng = fastrand::Rng::with_seed(77);
    for (i, (values, universe)) in lists.iter().enumerate() {
        let n = values.len() as u64;
        let mut e = S::enumerator(collection.bits(), collection.offset(i), *universe, n, params)
            .unwrap();
        assert_eq!(e.size(), n);
        for (pos, &v) in values.iter().enumerate() {
            let expected = (pos as u64, v);
            let actual = if pos == 0 { e.move_to(0) } else { e.next() };
            assert_eq!(actual, expected, "list {i}");
        }
        assert_eq!(e.next(), (n, *universe));
        assert_eq!(e.prev_value(), values[values.len() - 1]);

        let mut lower_bound = 0;
        e.move_to(0);
        while lower_bound <= *universe {
            let idx = values.partition_point(|&v| v < lower_bound);
            let expected = (idx as u64, values.get(idx).copied().unwrap_or(*universe));
            assert_eq!(e.next_geq(lower_bound), expected, "list {i} lower bound {lower_bound}");
            lower_bound += rng.u64(1..=(*universe / 50).max(1));
        }

        for _ in 0..50 {
            let pos = rng.u64(0..=n);
            let expected = values.get(pos as usize).copied().unwrap_or(*universe);
            assert_eq!(e.move_to(pos), (pos, expected), "list {i}");
        }
    }
}

#[test]
fn test_uniform_example() {
    type Uniform = UniformPartitionedSequence<IndexedSequence<VByteBlock>>;
    let values = [3u64, 5, 6, 9, 20, 21, 22, 1000];
    let params = GlobalParameters::default().with_log_partition_size(2);
    let mut bvb = BitVectorBuilder::new();
    Uniform::write(&mut bvb, &values, 1001, &params, &BuildConfig::default()).unwrap();
    let bits = bvb.build();
    let mut e = Uniform::enumerator(&bits, 0, 1001, 8, &params).unwrap();
    assert_eq!(e.num_partitions(), 2);
    assert_eq!(e.next_geq(21), (5, 21));
    assert_eq!(e.move_to(7), (7, 1000));
    assert_eq!(e.move_to(8), (8, 1001));
}

#[test]
fn test_variable_partitions_in_collection() {
    let lists = lists(1);
    let params = GlobalParameters::default();
    let config = BuildConfig::default().with_worker_threads(2).with_eps3(0.02);
    let collection = write_all::<PartitionedSequence<VByteBlock>>(&lists, &params, &config);
    assert_eq!(collection.len(), lists.len());
    check_all::<PartitionedSequence<VByteBlock>>(&collection, &lists, &params);
}

#[test]
fn test_uniform_partitions_in_collection() {
    type Uniform = UniformPartitionedSequence<IndexedSequence<StreamVByteBlock>>;
    let lists = lists(2);
    let params = GlobalParameters::default().with_log_partition_size(7);
    let config = BuildConfig::default().with_worker_threads(0);
    let collection = write_all::<Uniform>(&lists, &params, &config);
    check_all::<Uniform>(&collection, &lists, &params);
}

#[test]
fn test_frequencies_over_partitions() {
    let mut rng = fastrand::Rng::with_seed(3);
    let freqs = (0..4000)
        .map(|i| if i % 500 < 20 { rng.u64(1..10_000) } else { rng.u64(1..=2) })
        .collect::<Vec<_>>();
    let universe = freqs.iter().sum::<u64>() + 1;
    let params = GlobalParameters::default();
    let config = BuildConfig::default().with_worker_threads(1);
    let mut bvb = BitVectorBuilder::new();
    PositiveSequence::<PartitionedSequence<VByteBlock>>::write(
        &mut bvb, &freqs, universe, &params, &config,
    )
    .unwrap();
    let bits = bvb.build();
    let mut e = PositiveSequence::<PartitionedSequence<VByteBlock>>::enumerator(
        &bits,
        0,
        universe,
        freqs.len() as u64,
        &params,
    )
    .unwrap();
    assert_eq!(e.move_to(0), freqs[0]);
    for &f in &freqs[1..] {
        assert_eq!(e.next(), f);
    }
    for pos in [3999u64, 0, 1234, 500, 501] {
        assert_eq!(e.move_to(pos), freqs[pos as usize]);
    }
}
