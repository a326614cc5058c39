//! Fixed-size partitions.

use std::marker::PhantomData;

use pvb_bits::{BitVector, BitVectorBuilder};
use pvb_common::Result;

use super::{PartitionedEnumerator, Sizing, write_partitions};
use crate::{BuildConfig, CompactEliasFano, GlobalParameters, SequenceFormat, UpperBounds, check_monotone};

/// Every partition but the last holds `1 << log_partition_size` values, so no
/// sizes are stored. Partitions are written with `S`, their upper bounds with `U`.
pub struct UniformPartitionedSequence<S, U = CompactEliasFano>(PhantomData<(S, U)>);

impl<S: SequenceFormat, U: UpperBounds> SequenceFormat for UniformPartitionedSequence<S, U> {
    type Enumerator<'a> = PartitionedEnumerator<'a, S, U>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
        config: &BuildConfig,
    ) -> Result<()> {
        params.validate()?;
        check_monotone(values, universe)?;
        let n = values.len() as u64;
        let partition_size = 1u64 << params.log_partition_size;
        let endpoints = (1..=n.div_ceil(partition_size))
            .map(|p| (p * partition_size).min(n))
            .collect::<Vec<_>>();
        write_partitions::<S, U>(bvb, values, universe, &endpoints, Sizing::Uniform, params, config)
    }

    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<Self::Enumerator<'a>> {
        params.validate()?;
        PartitionedEnumerator::new(bits, offset, universe, n, params, Sizing::Uniform)
    }
}
