use crate::{
    block::exclusive_sum_scan_block,
    key::{digit, from_sortable_key, to_sortable_key, NO_DIGIT, RADIX},
    BLOCK_SIZE,
};
use cuda_std::{kernel, shared_array, thread};

/// Writes the sortable key of every value into `keys` and the identity
/// permutation into `indices`.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn to_sortable_keys(values: &[f32], keys: *mut u32, indices: *mut u32) {
    let mut i = (thread::thread_idx_x() + thread::block_idx_x() * thread::block_dim_x()) as usize;
    while i < values.len() {
        *(&mut *keys.add(i)) = to_sortable_key(values[i].to_bits());
        *(&mut *indices.add(i)) = i as u32;
        i += (thread::block_dim_x() * thread::grid_dim_x()) as usize;
    }
}

/// Counts how many keys of each block have each digit value.
///
/// The counts are written in digit-major order, so the count of digit `d` in
/// block `b` lands at `block_counts[d * grid_dim + b]`. An exclusive scan over
/// that table yields the scatter offset of every (digit, block) pair.
///
/// The kernel launch must use `BLOCK_SIZE` as the block size.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn count_digits(keys: &[u32], shift: u32, block_counts: *mut u32) {
    let t_idx = thread::thread_idx_x() as usize;
    let b_idx = thread::block_idx_x() as usize;
    let g_dim = thread::grid_dim_x() as usize;
    let i = b_idx * BLOCK_SIZE + t_idx;

    let digits = shared_array![u32; BLOCK_SIZE];
    *(&mut *digits.add(t_idx)) = if i < keys.len() {
        digit(keys[i], shift)
    } else {
        NO_DIGIT
    };

    thread::sync_threads();

    // One thread per digit value walks the block's digits.
    if t_idx < RADIX {
        let mut count = 0u32;
        for j in 0..BLOCK_SIZE {
            if *digits.add(j) == t_idx as u32 {
                count += 1;
            }
        }
        *(&mut *block_counts.add(t_idx * g_dim + b_idx)) = count;
    }
}

/// Moves every key and its index to `digit_offsets[digit, block] + rank`,
/// where `rank` is the number of keys with the same digit that come earlier
/// in the same block.
///
/// Ranks come from one block scan per digit value over the flags "this
/// thread's key has that digit", so keys with equal digits keep their
/// relative order.
///
/// The kernel launch must use `BLOCK_SIZE` as the block size and the same
/// grid size as the `count_digits` launch that produced the offsets.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn scatter_digits(
    keys_in: &[u32],
    indices_in: &[u32],
    shift: u32,
    digit_offsets: &[u32],
    keys_out: *mut u32,
    indices_out: *mut u32,
) {
    let t_idx = thread::thread_idx_x() as usize;
    let b_idx = thread::block_idx_x() as usize;
    let g_dim = thread::grid_dim_x() as usize;
    let i = b_idx * BLOCK_SIZE + t_idx;
    let in_bounds = i < keys_in.len();

    let key = if in_bounds { keys_in[i] } else { 0 };
    let key_digit = if in_bounds { digit(key, shift) } else { NO_DIGIT };

    let scratch = shared_array![u32; BLOCK_SIZE];
    let mut rank = 0;
    for digit_value in 0..RADIX as u32 {
        let flag = (key_digit == digit_value) as u32;
        let (exclusive, _) = exclusive_sum_scan_block(flag, scratch);
        if flag == 1 {
            rank = exclusive;
        }
    }

    if in_bounds {
        let dst = (digit_offsets[key_digit as usize * g_dim + b_idx] + rank) as usize;
        *(&mut *keys_out.add(dst)) = key;
        *(&mut *indices_out.add(dst)) = indices_in[i];
    }
}

/// Converts the sorted keys back into floats and copies the final
/// permutation into the caller's index buffer.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn from_sortable_keys(
    keys: &[u32],
    indices: &[u32],
    values_out: *mut f32,
    indices_out: *mut u32,
) {
    let mut i = (thread::thread_idx_x() + thread::block_idx_x() * thread::block_dim_x()) as usize;
    while i < keys.len() {
        *(&mut *values_out.add(i)) = f32::from_bits(from_sortable_key(keys[i]));
        *(&mut *indices_out.add(i)) = indices[i];
        i += (thread::block_dim_x() * thread::grid_dim_x()) as usize;
    }
}
