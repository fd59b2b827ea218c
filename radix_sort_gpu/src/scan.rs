use crate::{block::exclusive_sum_scan_block, BLOCK_SIZE};
use cuda_std::{kernel, shared_array, thread};

/// First phase of a hierarchical exclusive scan. Each block scans its
/// `BLOCK_SIZE` section of `xs` into `ys` and writes the section total into
/// `block_sums`.
///
/// The kernel launch must use `BLOCK_SIZE` as the block size and enough blocks
/// to cover `xs`.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn scan_blocks(xs: &[u32], ys: *mut u32, block_sums: *mut u32) {
    let t_idx = thread::thread_idx_x() as usize;
    let b_idx = thread::block_idx_x() as usize;
    let i = b_idx * BLOCK_SIZE + t_idx;

    let value = if i < xs.len() { xs[i] } else { 0 };

    let scratch = shared_array![u32; BLOCK_SIZE];
    let (exclusive, total) = exclusive_sum_scan_block(value, scratch);

    if i < xs.len() {
        *(&mut *ys.add(i)) = exclusive;
    }
    if t_idx == 0 {
        *(&mut *block_sums.add(b_idx)) = total;
    }
}

/// Last phase of a hierarchical exclusive scan. Adds the scanned total of all
/// preceding blocks to every element of a block.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn add_block_offsets(ys: *mut u32, len: usize, block_offsets: &[u32]) {
    let t_idx = thread::thread_idx_x() as usize;
    let b_idx = thread::block_idx_x() as usize;
    let i = b_idx * BLOCK_SIZE + t_idx;

    if i < len {
        *(&mut *ys.add(i)) = (*ys.add(i)).wrapping_add(block_offsets[b_idx]);
    }
}
