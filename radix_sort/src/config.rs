use crate::error::{Result, SortError};

/// The number of elements handled by one cooperating block on the CPU
/// backend when nothing else is configured.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Tuning knobs shared by the CPU scan and sort engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortConfig {
    /// The number of consecutive elements one parallel task owns in every
    /// stage. Results never depend on it, only the amount of parallelism does.
    pub block_size: usize,

    /// Whether to check that the final index array is a permutation before
    /// handing results back. On by default in debug builds.
    pub verify_permutation: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            verify_permutation: cfg!(debug_assertions),
        }
    }
}

impl SortConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_verify_permutation(mut self, verify_permutation: bool) -> Self {
        self.verify_permutation = verify_permutation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        // A block of one element would never shrink the recursive scan of
        // block totals.
        if self.block_size < 2 {
            return Err(SortError::InvalidArgument(format!(
                "block size must be at least 2, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}
