#![cfg_attr(
    target_os = "cuda",
    no_std,
    feature(register_attr),
    register_attr(nvvm_internal)
)]

#[cfg(target_os = "cuda")]
mod block;
pub mod key;
#[cfg(target_os = "cuda")]
pub mod radix;
#[cfg(target_os = "cuda")]
pub mod scan;
mod step;

pub use step::doubling_strides;

/// The number of threads in every block launched by the host. Each thread
/// owns exactly one element of the block's section.
pub const BLOCK_SIZE: usize = 256;

/// Returns the number of blocks needed to cover `len` elements.
pub const fn blocks_for(len: usize) -> usize {
    (len + BLOCK_SIZE - 1) / BLOCK_SIZE
}
