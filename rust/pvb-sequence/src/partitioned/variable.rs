//! Variable-size partitions chosen by the cost planner.

use std::marker::PhantomData;

use pvb_bits::{BitVector, BitVectorBuilder};
use pvb_codecs::BlockCodec;
use pvb_common::Result;

use super::{PartitionedEnumerator, Sizing, write_partitions};
use crate::{
    BuildConfig, CompactEliasFano, GlobalParameters, IndexedSequence, SequenceFormat,
    check_monotone, optimal_partition::optimal_partition,
};

/// Partitioned VByte: partition boundaries come from
/// [`optimal_partition`](crate::optimal_partition::optimal_partition) and every
/// partition is an [`IndexedSequence`] over the block codec `C`.
pub struct PartitionedSequence<C>(PhantomData<C>);

impl<C: BlockCodec> SequenceFormat for PartitionedSequence<C> {
    type Enumerator<'a> = PartitionedEnumerator<'a, IndexedSequence<C>, CompactEliasFano>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
        config: &BuildConfig,
    ) -> Result<()> {
        check_monotone(values, universe)?;
        let partition = optimal_partition::<C>(values, values[0], universe, config)?;
        write_partitions::<IndexedSequence<C>, CompactEliasFano>(
            bvb,
            values,
            universe,
            &partition.endpoints,
            Sizing::Variable,
            params,
            config,
        )
    }

    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<Self::Enumerator<'a>> {
        PartitionedEnumerator::new(bits, offset, universe, n, params, Sizing::Variable)
    }
}

#[cfg(test)]
mod tests {
    use pvb_bits::BitVectorBuilder;
    use pvb_codecs::{BlockCodec, InterpolativeBlock, StreamVByteBlock, VByteBlock, VarIntG8iuBlock, VarIntGbBlock};
    use pvb_common::ErrorKind;

    use crate::{
        BuildConfig, GlobalParameters, SequenceEnumerator, SequenceFormat,
        test_util::{check_enumerator, random_values},
    };

    use super::PartitionedSequence;

    fn check<C: BlockCodec>(seed: u64, config: &BuildConfig) {
        let params = GlobalParameters::default();
        let mut rng = fastrand::Rng::with_seed(seed);
        for n in [1usize, 2, 127, 128, 129, 3000] {
            let (values, universe) = random_values(&mut rng, n, 2000);
            let mut bvb = BitVectorBuilder::new();
            bvb.append_bits(1, 3);
            PartitionedSequence::<C>::write(&mut bvb, &values, universe, &params, config).unwrap();
            let bits = bvb.build();
            let mut e =
                PartitionedSequence::<C>::enumerator(&bits, 3, universe, n as u64, &params).unwrap();
            check_enumerator(&mut e, &values, universe);
        }
    }

    #[test]
    fn test_codecs() {
        let config = BuildConfig::default().with_worker_threads(1);
        check::<VByteBlock>(1, &config);
        check::<VarIntGbBlock>(2, &config);
        check::<VarIntG8iuBlock>(3, &config);
        check::<StreamVByteBlock>(4, &config);
        check::<InterpolativeBlock>(5, &config);
    }

    #[test]
    fn test_superblocks_and_threads() {
        let config = BuildConfig::default().with_eps3(0.1).with_worker_threads(4);
        check::<VByteBlock>(6, &config);
    }

    #[test]
    fn test_dense_and_sparse_runs_split() {
        // a dense run, a sparse tail and a second dense run
        let mut values = (1000..3000u64).collect::<Vec<_>>();
        values.extend((0..200u64).map(|i| 10_000 + i * 5000));
        values.extend(2_000_000..2_003_000u64);
        let universe = 2_003_000;
        let params = GlobalParameters::default();
        let mut bvb = BitVectorBuilder::new();
        let config = BuildConfig::default().with_worker_threads(2);
        PartitionedSequence::<VByteBlock>::write(&mut bvb, &values, universe, &params, &config).unwrap();
        let bits = bvb.build();
        // the dense runs cost next to nothing
        assert!(bits.len() < 200 * 24 + 4096);

        let mut e =
            PartitionedSequence::<VByteBlock>::enumerator(&bits, 0, universe, values.len() as u64, &params)
                .unwrap();
        assert!(e.num_partitions() >= 3);
        assert_eq!(e.next_geq(5000), (2000, 10_000));
        assert_eq!(e.next_geq(2_000_001), (2201, 2_000_001));
        check_enumerator(&mut e, &values, universe);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let params = GlobalParameters::default();
        let config = BuildConfig::default();
        let mut bvb = BitVectorBuilder::new();
        assert!(PartitionedSequence::<VByteBlock>::write(&mut bvb, &[], 10, &params, &config).is_err());
        assert!(PartitionedSequence::<VByteBlock>::write(&mut bvb, &[4, 4], 10, &params, &config).is_err());
        assert!(PartitionedSequence::<VByteBlock>::write(&mut bvb, &[4, 10], 10, &params, &config).is_err());
    }

    #[test]
    fn test_rejects_values_past_posting_width() {
        let params = GlobalParameters::default();
        let config = BuildConfig::default();
        let mut bvb = BitVectorBuilder::new();
        let values = [0u64, 4_000_000_000, 4_200_000_000, 4_400_000_000];
        let err = PartitionedSequence::<VByteBlock>::write(&mut bvb, &values, 4_400_000_001, &params, &config)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::CodecOverflow { value: 4_400_000_001, .. }));
    }
}
