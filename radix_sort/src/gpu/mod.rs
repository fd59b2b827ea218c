mod scan;
mod sort;

pub use scan::DeviceScanEngine;
pub use sort::GpuRadixSorter;

use crate::error::Result;
use cust::prelude::*;

static PTX: &str = include_str!("../../../resources/radix_sort_gpu.ptx");

/// Loads the kernels built from `radix_sort_gpu`. A CUDA context must be
/// current on the calling thread.
pub fn load_module() -> Result<Module> {
    Ok(Module::from_ptx(PTX, &[])?)
}

/// The grid size that gives every element of `len` its own thread.
fn grid_size(len: usize) -> u32 {
    radix_sort_gpu::blocks_for(len) as u32
}
