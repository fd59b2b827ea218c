mod config;
mod error;
pub mod pass;
pub mod scan;
mod sort;

#[cfg(feature = "cuda")]
pub mod gpu;

pub use config::{SortConfig, DEFAULT_BLOCK_SIZE};
pub use error::{Result, SortError};
pub use radix_sort_gpu::key;
pub use scan::ScanEngine;
pub use sort::{radix_sort, RadixSorter, SortedValues, MAX_SORT_LEN};
