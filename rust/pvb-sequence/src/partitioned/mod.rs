//! Two-level partitioned layouts.
//!
//! A sequence is cut into partitions; each partition is written with a nested
//! format relative to its *base*, the value right after the previous partition's
//! upper bound (the first partition uses the first value). The region is:
//!
//! ```text
//! gamma(partitions)
//! partitions == 1: base (ceil_log2(universe) bits), [delta(last - base)], pad, payload
//! partitions  > 1: gamma(endpoint bits), [sizes], upper bounds, payload end table, pad, payloads
//! ```
//!
//! Sizes are stored only by the variable layout, as Elias-Fano over the partition
//! end positions. Upper bounds are `[first value, ub_0, .., ub_{k-1}]` where `ub_p`
//! is the last value of partition `p`. The end table holds the byte offset where
//! each payload but the last ends, relative to the first payload.

use pvb_bits::{
    BitVector, BitVectorBuilder,
    align::align_up_u64,
    broadword::ceil_log2,
    codes::{read_delta, read_gamma, read_gamma_nonzero, write_delta, write_gamma, write_gamma_nonzero},
};
use pvb_common::{Error, Result};

use crate::{
    BuildConfig, CompactEliasFano, GlobalParameters, SequenceEnumerator, SequenceFormat,
    UpperBounds, corrupt_region, elias_fano::EliasFanoEnumerator,
};

pub mod uniform;
pub mod variable;

pub use uniform::UniformPartitionedSequence;
pub use variable::PartitionedSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sizing {
    /// Partition ends are stored.
    Variable,
    /// Every partition but the last holds `1 << log_partition_size` values.
    Uniform,
}

/// Writes `values` split at `endpoints` (exclusive partition ends, the last one
/// equal to `values.len()`).
pub(crate) fn write_partitions<S: SequenceFormat, U: UpperBounds>(
    bvb: &mut BitVectorBuilder,
    values: &[u64],
    universe: u64,
    endpoints: &[u64],
    sizing: Sizing,
    params: &GlobalParameters,
    config: &BuildConfig,
) -> Result<()> {
    let n = values.len() as u64;
    if endpoints.last() != Some(&n) || endpoints.first() == Some(&0) {
        return Err(Error::invalid_arg(
            "endpoints",
            format!("partition ends must finish at {n}"),
        ));
    }
    if endpoints.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::invalid_arg("endpoints", "partitions must be non-empty"));
    }

    let partitions = endpoints.len();
    write_gamma_nonzero(bvb, partitions as u64);

    if partitions == 1 {
        let base = values[0];
        let last_rel = values[values.len() - 1] - base;
        bvb.append_bits(base, ceil_log2(universe));
        if n > 1 {
            let tail = if base + last_rel + 1 == universe { 0 } else { last_rel };
            write_delta(bvb, tail);
        }
        bvb.pad_to(8);
        let relative = values.iter().map(|&v| v - base).collect::<Vec<_>>();
        return S::write(bvb, &relative, last_rel + 1, params, config);
    }

    let mut payloads = BitVectorBuilder::new();
    let mut upper_bounds = Vec::with_capacity(partitions + 1);
    let mut payload_ends = Vec::with_capacity(partitions - 1);
    let mut relative = Vec::new();
    upper_bounds.push(values[0]);
    let mut begin = 0usize;
    let mut base = values[0];
    for &end in endpoints {
        let part = &values[begin..end as usize];
        let upper_bound = part[part.len() - 1];
        relative.clear();
        relative.extend(part.iter().map(|&v| v - base));
        S::write(&mut payloads, &relative, upper_bound - base + 1, params, config)?;
        payloads.pad_to(8);
        upper_bounds.push(upper_bound);
        payload_ends.push(payloads.len() / 8);
        base = upper_bound + 1;
        begin = end as usize;
    }
    payload_ends.pop();

    let endpoint_bits = ceil_log2(payloads.len() / 8 + 1);
    write_gamma(bvb, endpoint_bits as u64);
    if sizing == Sizing::Variable {
        CompactEliasFano::write(bvb, &endpoints[..partitions - 1], n, params, config)?;
    }
    U::write(bvb, &upper_bounds, universe, params, config)?;
    for &end in &payload_ends {
        bvb.append_bits(end, endpoint_bits);
    }
    bvb.pad_to(8);
    bvb.append(&payloads);
    Ok(())
}

enum PartitionSizes<'a> {
    Single,
    Variable(EliasFanoEnumerator<'a>),
    Uniform { log_partition_size: u32 },
}

/// Where a partition sits, in positions and in values.
#[derive(Debug, Clone, Copy)]
struct PartitionBounds {
    begin: u64,
    end: u64,
    base: u64,
    /// Last value of the partition.
    upper_bound: u64,
}

/// Immutable description of a partitioned region plus the auxiliary enumerators.
struct Layout<'a, U: UpperBounds> {
    bits: &'a BitVector,
    params: GlobalParameters,
    n: u64,
    universe: u64,
    partitions: u64,
    sizes: PartitionSizes<'a>,
    upper_bounds: Option<U::Enumerator<'a>>,
    /// Bounds of the only partition of a single-partition region.
    single: PartitionBounds,
    endpoint_bits: u32,
    endpoints_offset: u64,
    payload_offset: u64,
}

impl<'a, U: UpperBounds> Layout<'a, U> {
    fn read(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
        sizing: Sizing,
    ) -> Result<Layout<'a, U>> {
        if n == 0 {
            return Err(Error::invalid_arg("n", "partitioned sequence is empty"));
        }
        let mut cursor = bits.cursor(offset);
        let partitions = read_gamma_nonzero(&mut cursor)?;
        if partitions > n {
            return Err(Error::invalid_format(
                "partition count",
                format!("{partitions} partitions for {n} values"),
            ));
        }
        let mut layout = Layout {
            bits,
            params: *params,
            n,
            universe,
            partitions,
            sizes: PartitionSizes::Single,
            upper_bounds: None,
            single: PartitionBounds {
                begin: 0,
                end: n,
                base: 0,
                upper_bound: 0,
            },
            endpoint_bits: 0,
            endpoints_offset: 0,
            payload_offset: 0,
        };

        if partitions == 1 {
            let base = cursor.take(ceil_log2(universe))?;
            let partition_universe = if n == 1 {
                1
            } else {
                match read_delta(&mut cursor)? {
                    0 => universe.saturating_sub(base),
                    last_rel => last_rel + 1,
                }
            };
            if partition_universe < n || base.saturating_add(partition_universe) > universe {
                return Err(Error::invalid_format(
                    "partition header",
                    format!("{n} values from {base} span {partition_universe} in {universe}"),
                ));
            }
            layout.single.base = base;
            layout.single.upper_bound = base + partition_universe - 1;
            layout.payload_offset = align_up_u64(cursor.position(), 8);
            return Ok(layout);
        }

        let endpoint_bits = read_gamma(&mut cursor)?;
        if endpoint_bits > 64 {
            return Err(Error::invalid_format(
                "endpoint table",
                format!("{endpoint_bits} bits per entry"),
            ));
        }
        layout.endpoint_bits = endpoint_bits as u32;
        let sizes_offset = cursor.position();
        let ubs_offset = match sizing {
            Sizing::Variable => {
                layout.sizes = PartitionSizes::Variable(CompactEliasFano::enumerator(
                    bits,
                    sizes_offset,
                    n,
                    partitions - 1,
                    params,
                )?);
                CompactEliasFano::region_end(sizes_offset, n, partitions - 1, params)
            }
            Sizing::Uniform => {
                let log_partition_size = params.log_partition_size as u32;
                let expected = n.div_ceil(1 << log_partition_size);
                if partitions != expected {
                    return Err(Error::invalid_format(
                        "partition count",
                        format!("{partitions} uniform partitions, expected {expected}"),
                    ));
                }
                layout.sizes = PartitionSizes::Uniform { log_partition_size };
                sizes_offset
            }
        };
        layout.upper_bounds = Some(U::enumerator(bits, ubs_offset, universe, partitions + 1, params)?);
        layout.endpoints_offset = U::region_end(ubs_offset, universe, partitions + 1, params);
        let table_bits = (partitions - 1) * layout.endpoint_bits as u64;
        bits.check_range("endpoint table", layout.endpoints_offset, table_bits)?;
        layout.payload_offset = align_up_u64(layout.endpoints_offset + table_bits, 8);
        bits.check_range("partition payloads", layout.payload_offset, 0)?;
        Ok(layout)
    }

    #[inline]
    fn bounds(&mut self, partition: u64) -> PartitionBounds {
        let (begin, end) = match &mut self.sizes {
            PartitionSizes::Single => return self.single,
            PartitionSizes::Variable(sizes) => {
                let (_, end) = sizes.move_to(partition);
                (sizes.prev_value(), end)
            }
            PartitionSizes::Uniform { log_partition_size } => {
                let begin = partition << *log_partition_size;
                (begin, (begin + (1 << *log_partition_size)).min(self.n))
            }
        };
        let (base, upper_bound) = match &mut self.upper_bounds {
            Some(ubs) => {
                let (_, upper_bound) = ubs.move_to(partition + 1);
                (ubs.prev_value() + (partition > 0) as u64, upper_bound)
            }
            None => (self.single.base, self.single.upper_bound),
        };
        PartitionBounds {
            begin,
            end,
            base,
            upper_bound,
        }
    }

    /// Bit offset of the payload of `partition`.
    #[inline]
    fn payload_start(&self, partition: u64) -> u64 {
        let start = if partition == 0 {
            0
        } else {
            let pos = self.endpoints_offset + (partition - 1) * self.endpoint_bits as u64;
            self.bits.get_bits(pos, self.endpoint_bits)
        };
        self.payload_offset + start * 8
    }

    fn open<S: SequenceFormat>(&mut self, partition: u64) -> Result<(PartitionBounds, S::Enumerator<'a>)> {
        let bounds = self.bounds(partition);
        if bounds.begin >= bounds.end || bounds.upper_bound < bounds.base {
            return Err(Error::invalid_format(
                "partition bounds",
                format!("partition {partition} is empty"),
            ));
        }
        let start = self.payload_start(partition);
        self.bits.prefetch(start);
        let nested = S::enumerator(
            self.bits,
            start,
            bounds.upper_bound - bounds.base + 1,
            bounds.end - bounds.begin,
            &self.params,
        )?;
        Ok((bounds, nested))
    }
}

/// Enumerator shared by both partitioned layouts; the current partition is kept
/// open and values are translated by its base.
pub struct PartitionedEnumerator<'a, S: SequenceFormat, U: UpperBounds> {
    layout: Layout<'a, U>,
    partition: u64,
    bounds: PartitionBounds,
    nested: S::Enumerator<'a>,
    position: u64,
    value: u64,
}

impl<'a, S: SequenceFormat, U: UpperBounds> PartitionedEnumerator<'a, S, U> {
    pub(crate) fn new(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
        sizing: Sizing,
    ) -> Result<PartitionedEnumerator<'a, S, U>> {
        let mut layout = Layout::<U>::read(bits, offset, universe, n, params, sizing)?;
        let (bounds, mut nested) = layout.open::<S>(0)?;
        let (_, first) = nested.move_to(0);
        Ok(PartitionedEnumerator {
            layout,
            partition: 0,
            bounds,
            nested,
            position: 0,
            value: bounds.base + first,
        })
    }

    pub fn num_partitions(&self) -> u64 {
        self.layout.partitions
    }

    fn switch_partition(&mut self, partition: u64) {
        debug_assert!(partition < self.layout.partitions);
        let (bounds, nested) = self
            .layout
            .open::<S>(partition)
            .unwrap_or_else(|e| corrupt_region(e));
        self.partition = partition;
        self.bounds = bounds;
        self.nested = nested;
    }

    /// Moves within the current partition.
    #[inline]
    fn move_in_partition(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position >= self.bounds.begin && position < self.bounds.end);
        let (_, v) = self.nested.move_to(position - self.bounds.begin);
        self.position = position;
        self.value = self.bounds.base + v;
        (self.position, self.value)
    }

    #[inline]
    fn next_geq_in_partition(&mut self, lower_bound: u64) -> (u64, u64) {
        debug_assert!(lower_bound >= self.bounds.base && lower_bound <= self.bounds.upper_bound);
        let (p, v) = self.nested.next_geq(lower_bound - self.bounds.base);
        self.position = self.bounds.begin + p;
        self.value = self.bounds.base + v;
        (self.position, self.value)
    }

    #[cold]
    fn set_end(&mut self) -> (u64, u64) {
        let last = self.layout.partitions - 1;
        if self.partition != last {
            self.switch_partition(last);
        }
        // park the nested enumerator past its end so prev_value stays available
        self.nested.move_to(self.bounds.end - self.bounds.begin);
        self.position = self.layout.n;
        self.value = self.layout.universe;
        (self.position, self.value)
    }

    #[cold]
    fn slow_move(&mut self, position: u64) -> (u64, u64) {
        if position == self.layout.n {
            return self.set_end();
        }
        let partition = match &mut self.layout.sizes {
            PartitionSizes::Single => 0,
            PartitionSizes::Variable(sizes) => sizes.next_geq(position + 1).0,
            PartitionSizes::Uniform { log_partition_size } => position >> *log_partition_size,
        };
        self.switch_partition(partition);
        self.move_in_partition(position)
    }

    #[cold]
    fn slow_next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        let partitions = self.layout.partitions;
        let idx = match &mut self.layout.upper_bounds {
            Some(ubs) => ubs.next_geq(lower_bound).0,
            None if lower_bound <= self.bounds.base => 0,
            None => partitions + 1,
        };
        if idx == 0 {
            return self.move_to(0);
        }
        if idx > partitions {
            return self.set_end();
        }
        self.switch_partition(idx - 1);
        self.next_geq_in_partition(lower_bound)
    }
}

impl<S: SequenceFormat, U: UpperBounds> SequenceEnumerator for PartitionedEnumerator<'_, S, U> {
    fn size(&self) -> u64 {
        self.layout.n
    }

    #[inline]
    fn move_to(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position <= self.layout.n);
        if position >= self.bounds.begin && position < self.bounds.end {
            return self.move_in_partition(position);
        }
        self.slow_move(position)
    }

    #[inline]
    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        if lower_bound >= self.bounds.base && lower_bound <= self.bounds.upper_bound {
            return self.next_geq_in_partition(lower_bound);
        }
        self.slow_next_geq(lower_bound)
    }

    #[inline]
    fn next(&mut self) -> (u64, u64) {
        debug_assert!(self.position < self.layout.n);
        let position = self.position + 1;
        if position < self.bounds.end {
            let (_, v) = self.nested.next();
            self.position = position;
            self.value = self.bounds.base + v;
            return (self.position, self.value);
        }
        if position == self.layout.n {
            return self.set_end();
        }
        self.switch_partition(self.partition + 1);
        self.move_in_partition(position)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 {
            0
        } else if self.position == self.bounds.begin {
            self.bounds.base - 1
        } else {
            self.bounds.base + self.nested.prev_value()
        }
    }
}
