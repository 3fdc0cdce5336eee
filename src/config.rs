use std::path::PathBuf;
use crate::walker::heap::{AllocPolicy, DEFAULT_CAPACITY};

/// Settings for one evaluator instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Number of heap slots available to `ref` and `array`.
    pub heap_capacity: usize,
    pub alloc_policy: AllocPolicy,
    /// Directory that `read` resolves file names against. `None` means the process working
    /// directory at the time of the read.
    pub base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heap_capacity: DEFAULT_CAPACITY,
            alloc_policy: AllocPolicy::default(),
            base_dir: None,
        }
    }
}

impl Config {
    pub fn with_heap_capacity(mut self, capacity: usize) -> Self {
        self.heap_capacity = capacity;
        self
    }

    pub fn with_alloc_policy(mut self, policy: AllocPolicy) -> Self {
        self.alloc_policy = policy;
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}
