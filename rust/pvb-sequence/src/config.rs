use pvb_common::{Error, Result, verify_arg};

/// Parameters that shape the encoded layout. Readers must use the same values
/// the region was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalParameters {
    /// Partition size of the uniform layout is `1 << log_partition_size`.
    pub log_partition_size: u8,
    /// Elias-Fano samples one pointer every `1 << ef_log_sampling0` high buckets.
    pub ef_log_sampling0: u8,
    /// Elias-Fano samples one pointer every `1 << ef_log_sampling1` elements.
    pub ef_log_sampling1: u8,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        GlobalParameters {
            log_partition_size: 7,
            ef_log_sampling0: 9,
            ef_log_sampling1: 8,
        }
    }
}

impl GlobalParameters {
    pub fn with_log_partition_size(mut self, log_partition_size: u8) -> Self {
        self.log_partition_size = log_partition_size;
        self
    }

    pub fn with_ef_log_sampling(mut self, sampling0: u8, sampling1: u8) -> Self {
        self.ef_log_sampling0 = sampling0;
        self.ef_log_sampling1 = sampling1;
        self
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(log_partition_size, (1..=31).contains(&self.log_partition_size));
        verify_arg!(ef_log_sampling0, (1..=31).contains(&self.ef_log_sampling0));
        verify_arg!(ef_log_sampling1, (1..=31).contains(&self.ef_log_sampling1));
        Ok(())
    }
}

/// Build-time knobs. They influence how a region is encoded but a reader never
/// needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Fixed cost in bits charged by the planner for every partition.
    pub fix_cost: u64,
    /// Windows stop growing once their cost bound reaches `cost_lb / eps1`;
    /// zero means no cap.
    pub eps1: f64,
    /// Growth factor between consecutive window bounds is `1 + eps2`.
    pub eps2: f64,
    /// Superblocks hold `fix_cost / eps3` elements; zero plans the whole list at once.
    pub eps3: f64,
    /// Upper bound on threads used by the planner and the construction queue.
    pub worker_threads: usize,
    /// Expected work accumulated into one construction batch.
    pub work_per_thread: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            fix_cost: 64,
            eps1: 0.03,
            eps2: 0.3,
            eps3: 0.0,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            work_per_thread: 1 << 20,
        }
    }
}

impl BuildConfig {
    pub fn with_fix_cost(mut self, fix_cost: u64) -> Self {
        self.fix_cost = fix_cost;
        self
    }

    pub fn with_eps(mut self, eps1: f64, eps2: f64) -> Self {
        self.eps1 = eps1;
        self.eps2 = eps2;
        self
    }

    pub fn with_eps3(mut self, eps3: f64) -> Self {
        self.eps3 = eps3;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_work_per_thread(mut self, work_per_thread: u64) -> Self {
        self.work_per_thread = work_per_thread;
        self
    }

    /// The quadratic planner runs when both approximation factors are zero.
    pub fn is_exact(&self) -> bool {
        self.eps1 == 0.0 && self.eps2 == 0.0
    }

    pub fn validate(&self) -> Result<()> {
        for (name, eps) in [("eps1", self.eps1), ("eps2", self.eps2), ("eps3", self.eps3)] {
            if !eps.is_finite() || eps < 0.0 {
                return Err(Error::invalid_arg(name, format!("{eps} is not a finite non-negative number")));
            }
        }
        if self.eps2 == 0.0 && self.eps1 > 0.0 {
            return Err(Error::invalid_arg(
                "eps2",
                "must be positive unless eps1 is zero as well",
            ));
        }
        verify_arg!(work_per_thread, self.work_per_thread > 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildConfig, GlobalParameters};

    #[test]
    fn test_defaults_are_valid() {
        let params = GlobalParameters::default();
        assert_eq!(params.log_partition_size, 7);
        params.validate().unwrap();
        let config = BuildConfig::default();
        assert_eq!(config.fix_cost, 64);
        assert!(config.worker_threads >= 1);
        config.validate().unwrap();
        assert!(!config.is_exact());
    }

    #[test]
    fn test_invalid_settings() {
        assert!(GlobalParameters::default().with_log_partition_size(0).validate().is_err());
        assert!(BuildConfig::default().with_eps(0.1, 0.0).validate().is_err());
        assert!(BuildConfig::default().with_eps(-1.0, 0.3).validate().is_err());
        assert!(BuildConfig::default().with_eps(0.0, 0.0).is_exact());
        assert!(BuildConfig::default().with_eps(0.0, 0.0).validate().is_ok());
        assert!(BuildConfig::default().with_eps3(f64::NAN).validate().is_err());
    }
}
