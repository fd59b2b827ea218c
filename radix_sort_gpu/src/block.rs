use crate::step::doubling_strides;
use cuda_std::thread::{block_dim_x, sync_threads, thread_idx_x};

/// Performs an exclusive sum scan across the threads of a block. Every thread
/// contributes `value` and receives the sum of the values of all threads with
/// a lower index, along with the total of the whole block.
///
/// `scratch` must point to shared memory with room for one element per thread
/// in the block. Every thread of the block must call this, since it contains
/// barriers. The scratch memory may be reused as soon as this returns.
///
/// Implemented using the Kogge-Stone algorithm.
pub unsafe fn exclusive_sum_scan_block(value: u32, scratch: *mut u32) -> (u32, u32) {
    let t_idx = thread_idx_x() as usize;
    let b_dim = block_dim_x() as usize;

    *(&mut *scratch.add(t_idx)) = value;

    for stride in doubling_strides(b_dim) {
        sync_threads();
        let addend = if t_idx >= stride {
            *scratch.add(t_idx - stride)
        } else {
            0
        };

        // Every read of this step has to land before any thread overwrites its
        // slot.
        sync_threads();
        *(&mut *scratch.add(t_idx)) = (*scratch.add(t_idx)).wrapping_add(addend);
    }

    sync_threads();
    let inclusive = *scratch.add(t_idx);
    let total = *scratch.add(b_dim - 1);
    sync_threads();

    (inclusive.wrapping_sub(value), total)
}
