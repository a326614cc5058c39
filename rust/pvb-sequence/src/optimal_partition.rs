//! Optimal partitioning of a posting list into variable-size partitions.
//!
//! The cost of a partition is its estimated payload size
//! ([`IndexedSequence::bitsize`]) plus the fixed per-partition cost `F`. Finding
//! the cheapest split is a shortest-path problem over positions `0..=n`; the exact
//! solution is quadratic. The approximate planner only considers partitions
//! produced by a small set of sliding *cost windows* whose cost bounds grow
//! geometrically by `1 + eps2` from the cost of a single element up to
//! `cost_lb / eps1`, which yields a `(1 + eps)`-approximation in near-linear time.
//!
//! Long lists can be cut into superblocks of `F / eps3` elements that are planned
//! independently on the worker pool; partitions never cross a superblock edge.

use pvb_codecs::BlockCodec;
use pvb_common::{Error, Result};
use pvb_workflow::data_parallel;

use crate::{BuildConfig, IndexedSequence, check_monotone};

/// Planner output: partition end positions (the last one is `n`) and the
/// estimated total cost in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub endpoints: Vec<u64>,
    pub cost: u64,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Plans the partitions of `values`, whose first partition is coded relative to
/// `base`.
pub fn optimal_partition<C: BlockCodec>(
    values: &[u64],
    base: u64,
    universe: u64,
    config: &BuildConfig,
) -> Result<Partition> {
    config.validate()?;
    check_monotone(values, universe)?;
    if base > values[0] {
        return Err(Error::invalid_arg(
            "base",
            format!("base {base} exceeds the first value {}", values[0]),
        ));
    }

    let superblocks = split_superblocks(values, base, universe, config);
    let planned = data_parallel::map(config.worker_threads, superblocks.iter(), |sb| {
        let slice = &values[sb.start..sb.start + sb.len];
        if config.is_exact() {
            plan_exact::<C>(slice, sb.base, config.fix_cost)
        } else {
            plan_windows::<C>(slice, sb.base, config)
        }
    });

    let mut partition = Partition {
        endpoints: Vec::new(),
        cost: 0,
    };
    for (sb, local) in superblocks.iter().zip(planned) {
        partition
            .endpoints
            .extend(local.endpoints.iter().map(|&e| e + sb.start as u64));
        partition.cost += local.cost;
    }
    log::debug!(
        "planned {} values in {} superblocks into {} partitions, {} bits",
        values.len(),
        superblocks.len(),
        partition.len(),
        partition.cost
    );
    Ok(partition)
}

#[derive(Debug, Clone, Copy)]
struct Superblock {
    start: usize,
    len: usize,
    base: u64,
}

fn split_superblocks(values: &[u64], base: u64, universe: u64, config: &BuildConfig) -> Vec<Superblock> {
    let n = values.len();
    let bound = if config.eps3 == 0.0 {
        n
    } else {
        ((config.fix_cost as f64 / config.eps3) as usize).max(1)
    };
    let mut superblocks = Vec::new();
    let mut start = 0;
    let mut sb_base = base;
    while start < n {
        let mut len = bound.min(n - start);
        // a remainder shorter than the bound joins the current superblock
        if n - (start + len) < bound {
            len = n - start;
        }
        superblocks.push(Superblock {
            start,
            len,
            base: sb_base,
        });
        start += len;
        sb_base = if start == n { universe } else { values[start - 1] + 1 };
    }
    superblocks
}

/// Sliding range `[start, end)` with an incrementally maintained codec cost.
struct CostWindow<'a, C> {
    values: &'a [u64],
    start: usize,
    end: usize,
    /// Base of the first element in the window: one past its predecessor.
    start_base: u64,
    /// Base of the element at `end`: one past the window's last value.
    end_base: u64,
    codec_cost: u64,
    cost_upper_bound: u64,
    _codec: std::marker::PhantomData<C>,
}

impl<'a, C: BlockCodec> CostWindow<'a, C> {
    fn new(values: &'a [u64], start: usize, start_base: u64, cost_upper_bound: u64) -> Self {
        CostWindow {
            values,
            start,
            end: start,
            start_base,
            end_base: start_base,
            codec_cost: 0,
            cost_upper_bound,
            _codec: std::marker::PhantomData,
        }
    }

    #[inline]
    fn advance_start(&mut self) {
        let v = self.values[self.start];
        self.codec_cost -= C::posting_cost(v, self.start_base);
        self.start_base = v + 1;
        self.start += 1;
    }

    #[inline]
    fn advance_end(&mut self) {
        let v = self.values[self.end];
        self.codec_cost += C::posting_cost(v, self.end_base);
        self.end_base = v + 1;
        self.end += 1;
    }

    #[inline]
    fn cost(&self) -> u64 {
        IndexedSequence::<C>::bitsize(
            self.codec_cost,
            self.end_base - self.start_base,
            (self.end - self.start) as u64,
        )
    }
}

struct ShortestPath {
    min_cost: Vec<u64>,
    path: Vec<usize>,
}

impl ShortestPath {
    /// Every position starts unreachable except the single-partition solution.
    fn new(n: usize, single_block_cost: u64) -> ShortestPath {
        let mut min_cost = vec![u64::MAX; n + 1];
        min_cost[0] = 0;
        min_cost[n] = single_block_cost;
        ShortestPath {
            min_cost,
            path: vec![0; n + 1],
        }
    }

    #[inline]
    fn relax(&mut self, from: usize, to: usize, cost: u64) {
        let candidate = self.min_cost[from].saturating_add(cost);
        if candidate < self.min_cost[to] {
            self.min_cost[to] = candidate;
            self.path[to] = from;
        }
    }

    fn into_partition(self) -> Partition {
        let n = self.path.len() - 1;
        let mut endpoints = Vec::new();
        let mut cur = n;
        while cur != 0 {
            endpoints.push(cur as u64);
            cur = self.path[cur];
        }
        endpoints.reverse();
        Partition {
            endpoints,
            cost: self.min_cost[n],
        }
    }
}

fn single_block_cost<C: BlockCodec>(values: &[u64], base: u64, fix_cost: u64) -> u64 {
    let mut window = CostWindow::<C>::new(values, 0, base, 0);
    while window.end < values.len() {
        window.advance_end();
    }
    window.cost() + fix_cost
}

fn plan_windows<C: BlockCodec>(values: &[u64], base: u64, config: &BuildConfig) -> Partition {
    let n = values.len();
    let fix_cost = config.fix_cost;
    let single = single_block_cost::<C>(values, base, fix_cost);
    let mut dp = ShortestPath::new(n, single);

    // one element in a universe of one costs nothing but the fixed cost
    let cost_lb = IndexedSequence::<C>::bitsize(0, 1, 1).saturating_add(fix_cost).max(1);
    let mut windows = Vec::new();
    let mut bound = cost_lb;
    loop {
        if config.eps1 != 0.0 && bound as f64 >= cost_lb as f64 / config.eps1 {
            break;
        }
        windows.push(CostWindow::<C>::new(values, 0, base, bound));
        if bound >= single {
            break;
        }
        bound = (bound + 1).max((bound as f64 * (1.0 + config.eps2)) as u64);
    }
    if windows.is_empty() {
        windows.push(CostWindow::<C>::new(values, 0, base, cost_lb));
    }
    log::trace!("{} cost windows, bounds {cost_lb}..={bound}", windows.len());

    for i in 0..n {
        // the singleton partition keeps every position reachable
        let start_base = if i == 0 { base } else { values[i - 1] + 1 };
        let singleton = IndexedSequence::<C>::bitsize(
            C::posting_cost(values[i], start_base),
            values[i] - start_base + 1,
            1,
        ) + fix_cost;
        dp.relax(i, i + 1, singleton);

        let mut last_end = i + 1;
        for window in windows.iter_mut() {
            debug_assert_eq!(window.start, i);
            while window.end < last_end {
                window.advance_end();
            }
            loop {
                let window_cost = window.cost() + fix_cost;
                dp.relax(i, window.end, window_cost);
                last_end = window.end;
                if window.end == n || window_cost >= window.cost_upper_bound {
                    break;
                }
                window.advance_end();
            }
            window.advance_start();
        }
    }
    dp.into_partition()
}

/// Quadratic dynamic program over every candidate partition.
fn plan_exact<C: BlockCodec>(values: &[u64], base: u64, fix_cost: u64) -> Partition {
    let n = values.len();
    let mut dp = ShortestPath::new(n, single_block_cost::<C>(values, base, fix_cost));
    for i in 0..n {
        let start_base = if i == 0 { base } else { values[i - 1] + 1 };
        let mut window = CostWindow::<C>::new(values, i, start_base, 0);
        while window.end < n {
            window.advance_end();
            dp.relax(i, window.end, window.cost() + fix_cost);
        }
    }
    dp.into_partition()
}

#[cfg(test)]
mod tests {
    use pvb_codecs::{BlockCodec, VByteBlock, VarIntGbBlock};

    use crate::{BuildConfig, IndexedSequence, test_util::random_values};

    use super::optimal_partition;

    /// Textbook O(n^2) shortest path using prefix sums of the posting costs.
    fn brute_force<C: BlockCodec>(values: &[u64], fix_cost: u64) -> u64 {
        let n = values.len();
        let mut prefix = vec![0u64; n + 1];
        for i in 0..n {
            let base = if i == 0 { values[0] } else { values[i - 1] + 1 };
            prefix[i + 1] = prefix[i] + C::posting_cost(values[i], base);
        }
        let mut best = vec![u64::MAX; n + 1];
        best[0] = 0;
        for j in 1..=n {
            for i in 0..j {
                let base = if i == 0 { values[0] } else { values[i - 1] + 1 };
                let universe = values[j - 1] - base + 1;
                let cost = IndexedSequence::<C>::bitsize(prefix[j] - prefix[i], universe, (j - i) as u64)
                    + fix_cost;
                best[j] = best[j].min(best[i] + cost);
            }
        }
        best[n]
    }

    fn check_endpoints(endpoints: &[u64], n: usize) {
        assert!(!endpoints.is_empty());
        assert!(endpoints.windows(2).all(|w| w[0] < w[1]));
        assert!(endpoints[0] > 0);
        assert_eq!(*endpoints.last().unwrap(), n as u64);
    }

    #[test]
    fn test_exact_matches_brute_force() {
        let mut rng = fastrand::Rng::with_seed(17);
        for n in [1usize, 2, 40, 300, 500] {
            let (values, universe) = random_values(&mut rng, n, 5000);
            let config = BuildConfig::default().with_eps(0.0, 0.0).with_worker_threads(1);
            let exact = optimal_partition::<VByteBlock>(&values, values[0], universe, &config).unwrap();
            check_endpoints(&exact.endpoints, n);
            assert_eq!(exact.cost, brute_force::<VByteBlock>(&values, config.fix_cost), "n={n}");

            let approx_config = BuildConfig::default().with_worker_threads(1);
            let approx =
                optimal_partition::<VByteBlock>(&values, values[0], universe, &approx_config).unwrap();
            check_endpoints(&approx.endpoints, n);
            assert!(approx.cost >= exact.cost);
            let slack = (1.0 + approx_config.eps1) * (1.0 + approx_config.eps2);
            assert!(
                approx.cost as f64 <= exact.cost as f64 * slack + approx_config.fix_cost as f64,
                "n={n}: approx {} exact {}",
                approx.cost,
                exact.cost
            );
        }
    }

    #[test]
    fn test_uniform_gaps() {
        let values = (0..10_000u64).map(|i| i * 100).collect::<Vec<_>>();
        let universe = values[values.len() - 1] + 1;
        let config = BuildConfig::default().with_fix_cost(64).with_eps(0.01, 0.01);
        let partition = optimal_partition::<VByteBlock>(&values, 0, universe, &config).unwrap();
        check_endpoints(&partition.endpoints, values.len());
        assert!(partition.len() >= 1 && partition.len() <= 10_000);

        let codec_cost = values
            .iter()
            .enumerate()
            .map(|(i, &v)| VByteBlock::posting_cost(v, if i == 0 { 0 } else { values[i - 1] + 1 }))
            .sum::<u64>();
        let single = IndexedSequence::<VByteBlock>::bitsize(codec_cost, universe, 10_000) + 64;
        assert!(partition.cost <= single);
    }

    #[test]
    fn test_superblocks() {
        let mut rng = fastrand::Rng::with_seed(99);
        let (values, universe) = random_values(&mut rng, 2000, 400);
        let whole_config = BuildConfig::default().with_eps(0.0, 0.0);
        let whole = optimal_partition::<VarIntGbBlock>(&values, values[0], universe, &whole_config).unwrap();

        // 64 / 0.125 = 512 elements per superblock, the remainder joins the last one
        let split_config = whole_config.clone().with_eps3(0.125);
        let split = optimal_partition::<VarIntGbBlock>(&values, values[0], universe, &split_config).unwrap();
        check_endpoints(&split.endpoints, values.len());
        assert!(split.endpoints.contains(&512));
        assert!(split.endpoints.contains(&1024));
        assert!(split.cost >= whole.cost);
        assert!(split.cost <= whole.cost + 2 * (64 + 32));
    }

    #[test]
    fn test_thread_count_does_not_change_the_plan() {
        let mut rng = fastrand::Rng::with_seed(7);
        let (values, universe) = random_values(&mut rng, 5000, 1000);
        let config = BuildConfig::default().with_eps3(0.1);
        let one = optimal_partition::<VByteBlock>(&values, values[0], universe, &config.clone().with_worker_threads(1))
            .unwrap();
        let many = optimal_partition::<VByteBlock>(&values, values[0], universe, &config.with_worker_threads(4))
            .unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn test_invalid_input() {
        let config = BuildConfig::default();
        assert!(optimal_partition::<VByteBlock>(&[], 0, 10, &config).is_err());
        assert!(optimal_partition::<VByteBlock>(&[3, 2], 0, 10, &config).is_err());
        assert!(optimal_partition::<VByteBlock>(&[3, 20], 0, 10, &config).is_err());
        assert!(optimal_partition::<VByteBlock>(&[3, 4], 4, 10, &config).is_err());
        let bad = BuildConfig::default().with_eps(0.5, 0.0);
        assert!(optimal_partition::<VByteBlock>(&[3, 4], 0, 10, &bad).is_err());
    }
}
