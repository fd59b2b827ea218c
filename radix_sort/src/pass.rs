//! The three steps of one radix pass, kept separate so each can be checked on
//! its own: count the digits of every block, scan the counts into offsets,
//! scatter keys and indices to their offsets.

use crate::{
    error::{try_vec, Result, SortError},
    scan::ScanEngine,
};
use itertools::Itertools;
use radix_sort_gpu::key::{digit, KEY_BITS, RADIX};
use rayon::prelude::*;

/// Names which half of the ping-pong buffers is read by a pass. The other
/// half is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferRole {
    Front,
    Back,
}

impl BufferRole {
    /// The read side of the given pass. Pass 0 reads the front buffers and
    /// every pass reads what the previous one wrote.
    pub fn for_pass(pass: u32) -> Self {
        if pass % 2 == 0 {
            BufferRole::Front
        } else {
            BufferRole::Back
        }
    }

    pub fn swapped(self) -> Self {
        match self {
            BufferRole::Front => BufferRole::Back,
            BufferRole::Back => BufferRole::Front,
        }
    }
}

/// The read side of a pass.
pub struct PassInput<'a> {
    pub keys: &'a [u32],
    pub indices: &'a [u32],
}

/// The write side of a pass.
pub struct PassOutput<'a> {
    pub keys: &'a mut [u32],
    pub indices: &'a mut [u32],
}

/// Two key arrays and two index arrays of equal length whose read and write
/// roles alternate between passes.
pub struct PingPong {
    keys: [Vec<u32>; 2],
    indices: [Vec<u32>; 2],
}

impl PingPong {
    /// Allocates both halves. The front half is returned for initialisation.
    pub fn new(len: usize) -> Result<Self> {
        Ok(Self {
            keys: [try_vec(len)?, try_vec(len)?],
            indices: [try_vec(len)?, try_vec(len)?],
        })
    }

    pub fn front_mut(&mut self) -> PassOutput<'_> {
        let [keys, _] = &mut self.keys;
        let [indices, _] = &mut self.indices;
        PassOutput { keys, indices }
    }

    /// Borrows the `read` half immutably and the other half mutably.
    pub fn split(&mut self, read: BufferRole) -> (PassInput<'_>, PassOutput<'_>) {
        let [front_keys, back_keys] = &mut self.keys;
        let [front_indices, back_indices] = &mut self.indices;
        match read {
            BufferRole::Front => (
                PassInput {
                    keys: front_keys,
                    indices: front_indices,
                },
                PassOutput {
                    keys: back_keys,
                    indices: back_indices,
                },
            ),
            BufferRole::Back => (
                PassInput {
                    keys: back_keys,
                    indices: back_indices,
                },
                PassOutput {
                    keys: front_keys,
                    indices: front_indices,
                },
            ),
        }
    }

    pub fn get(&self, role: BufferRole) -> PassInput<'_> {
        let side = match role {
            BufferRole::Front => 0,
            BufferRole::Back => 1,
        };
        PassInput {
            keys: &self.keys[side],
            indices: &self.indices[side],
        }
    }
}

/// The number of blocks of `block_size` elements covering `len` elements.
pub fn block_count(len: usize, block_size: usize) -> usize {
    len / block_size + usize::from(len % block_size != 0)
}

fn check_digit_params(shift: u32, block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(SortError::InvalidArgument(
            "block size must not be 0".to_string(),
        ));
    }
    if shift >= KEY_BITS {
        return Err(SortError::InvalidArgument(format!(
            "digit shift {} is outside a {} bit key",
            shift, KEY_BITS
        )));
    }
    Ok(())
}

/// Counts the digits at `shift` of every block of `block_size` keys.
///
/// The result is digit-major: the count of digit `d` in block `b` is at
/// `d * block_count + b`.
pub fn count_digits(keys: &[u32], shift: u32, block_size: usize) -> Result<Vec<u32>> {
    check_digit_params(shift, block_size)?;
    let block_histograms = keys
        .par_chunks(block_size)
        .map(|block| {
            let mut histogram = [0u32; RADIX];
            for &key in block {
                histogram[digit(key, shift) as usize] += 1;
            }
            histogram
        })
        .collect::<Vec<_>>();

    let block_count = block_histograms.len();
    let mut counts = try_vec(RADIX * block_count)?;
    for (block, histogram) in block_histograms.iter().enumerate() {
        for (d, &count) in histogram.iter().enumerate() {
            counts[d * block_count + block] = count;
        }
    }
    Ok(counts)
}

/// Turns a digit-major count table into scatter offsets. The offset of digit
/// `d` in block `b` is the number of keys with a smaller digit plus the number
/// of keys with digit `d` in earlier blocks.
pub fn digit_offsets(scan: &ScanEngine, counts: &[u32]) -> Result<Vec<u32>> {
    scan.scan(counts)
}

/// The part of the write side owned by one (digit, block) pair.
struct Segment<'a> {
    keys: &'a mut [u32],
    indices: &'a mut [u32],
    filled: usize,
}

impl Segment<'_> {
    fn push(&mut self, key: u32, index: u32) -> Result<()> {
        match (
            self.keys.get_mut(self.filled),
            self.indices.get_mut(self.filled),
        ) {
            (Some(k), Some(i)) => {
                *k = key;
                *i = index;
                self.filled += 1;
                Ok(())
            }
            _ => Err(SortError::InternalInvariantViolation(format!(
                "more keys than the {} slots given to their digit",
                self.keys.len()
            ))),
        }
    }
}

/// Cuts `output` into one segment per offset, grouped by block. The segment of
/// offset `i` runs up to offset `i + 1`, the last one up to the end.
fn split_segments<'a>(
    output: &'a mut PassOutput<'_>,
    offsets: &[u32],
    block_count: usize,
) -> Result<Vec<Vec<Segment<'a>>>> {
    let len = output.keys.len();
    let mut keys: &'a mut [u32] = &mut *output.keys;
    let mut indices: &'a mut [u32] = &mut *output.indices;
    let mut blocks = (0..block_count)
        .map(|_| Vec::with_capacity(RADIX))
        .collect_vec();

    let mut position = 0;
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).map_or(len, |&next| next as usize);
        if start as usize != position || end < position || end > len {
            return Err(SortError::InvalidArgument(format!(
                "digit offset {} does not continue the partition of 0..{}",
                i, len
            )));
        }
        let (segment_keys, rest_keys) = std::mem::take(&mut keys).split_at_mut(end - position);
        let (segment_indices, rest_indices) =
            std::mem::take(&mut indices).split_at_mut(end - position);
        keys = rest_keys;
        indices = rest_indices;
        blocks[i % block_count].push(Segment {
            keys: segment_keys,
            indices: segment_indices,
            filled: 0,
        });
        position = end;
    }
    Ok(blocks)
}

/// Moves every key of `input`, with its index, to
/// `offsets[digit, block] + rank`, where `rank` counts the earlier keys of the
/// same block with the same digit. Keys with equal digits keep their order.
///
/// `offsets` must come from [`digit_offsets`] over the counts of the same
/// keys, shift and block size. Offsets that do not partition the output, or
/// that leave a digit fewer slots than it has keys, are reported as errors.
pub fn scatter(
    input: &PassInput<'_>,
    shift: u32,
    block_size: usize,
    offsets: &[u32],
    output: &mut PassOutput<'_>,
) -> Result<()> {
    check_digit_params(shift, block_size)?;
    let len = input.keys.len();
    if input.indices.len() != len || output.keys.len() != len || output.indices.len() != len {
        return Err(SortError::InvalidArgument(
            "scatter buffers differ in length".to_string(),
        ));
    }
    let block_count = block_count(len, block_size);
    if offsets.len() != RADIX * block_count {
        return Err(SortError::InvalidArgument(format!(
            "expected {} digit offsets, got {}",
            RADIX * block_count,
            offsets.len()
        )));
    }

    // The segments cover the output exactly, so if no segment overflows every
    // slot is written once.
    let blocks = split_segments(output, offsets, block_count)?;
    input
        .keys
        .par_chunks(block_size)
        .zip(input.indices.par_chunks(block_size))
        .zip(blocks.into_par_iter())
        .try_for_each(|((keys, indices), mut segments)| {
            for (&key, &index) in keys.iter().zip(indices) {
                segments[digit(key, shift) as usize].push(key, index)?;
            }
            Ok(())
        })
}

/// Checks that `indices` holds every value of `0..indices.len()` exactly
/// once.
pub fn check_permutation(indices: &[u32]) -> Result<()> {
    let mut seen = try_vec::<bool>(indices.len())?;
    for (position, &index) in indices.iter().enumerate() {
        match seen.get_mut(index as usize) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(SortError::InternalInvariantViolation(format!(
                    "index {} appears twice, again at position {}",
                    index, position
                )))
            }
            None => {
                return Err(SortError::InternalInvariantViolation(format!(
                    "index {} at position {} is out of range",
                    index, position
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        block_count, check_permutation, count_digits, digit_offsets, scatter, BufferRole,
        PassInput, PassOutput, PingPong,
    };
    use crate::{Result, ScanEngine, SortConfig, SortError};

    fn scan(block_size: usize) -> ScanEngine {
        ScanEngine::new(&SortConfig::default().with_block_size(block_size)).unwrap()
    }

    #[test]
    fn roles_alternate() {
        assert_eq!(BufferRole::for_pass(0), BufferRole::Front);
        assert_eq!(BufferRole::for_pass(1), BufferRole::Back);
        assert_eq!(BufferRole::for_pass(7), BufferRole::Back);
        assert_eq!(BufferRole::Front.swapped(), BufferRole::Back);
        assert_eq!(BufferRole::Back.swapped(), BufferRole::Front);
    }

    #[test]
    fn write_side_becomes_read_side() {
        let mut buffers = PingPong::new(3).unwrap();
        {
            let (_, output) = buffers.split(BufferRole::Front);
            output.keys.copy_from_slice(&[7, 8, 9]);
            output.indices.copy_from_slice(&[2, 0, 1]);
        }
        let next = buffers.get(BufferRole::Front.swapped());
        assert_eq!(next.keys, &[7, 8, 9]);
        assert_eq!(next.indices, &[2, 0, 1]);
    }

    #[test]
    fn counts_are_digit_major() {
        // Two blocks of two keys; digits 1, 2 | 2, 2.
        let keys = [0x1, 0x2, 0x12, 0xf2];
        let counts = count_digits(&keys, 0, 2).unwrap();
        assert_eq!(counts.len(), 16 * 2);
        assert_eq!(&counts[0..6], &[0, 0, 1, 0, 1, 2]);
        assert_eq!(counts.iter().sum::<u32>(), 4);

        // The same keys at the next digit: 0, 0 | 1, 15.
        let counts = count_digits(&keys, 4, 2).unwrap();
        assert_eq!(&counts[0..4], &[2, 0, 0, 1]);
        assert_eq!(&counts[30..32], &[0, 1]);
    }

    #[test]
    fn offsets_start_each_digit_bucket() {
        let keys = [0x1, 0x2, 0x12, 0xf2];
        let counts = count_digits(&keys, 0, 2).unwrap();
        let offsets = digit_offsets(&scan(2), &counts).unwrap();
        // Digit 1 of block 0 goes first, then digit 2 of block 0, then digit 2
        // of block 1.
        assert_eq!(offsets[2], 0);
        assert_eq!(offsets[4], 1);
        assert_eq!(offsets[5], 2);
    }

    #[test]
    fn scatter_is_stable() {
        let keys = [0x3, 0x1, 0x13, 0x1, 0x23, 0x2];
        let indices = [0, 1, 2, 3, 4, 5];
        let block_size = 4;
        let counts = count_digits(&keys, 0, block_size).unwrap();
        let offsets = digit_offsets(&scan(2), &counts).unwrap();

        let mut out_keys = [0; 6];
        let mut out_indices = [0; 6];
        scatter(
            &PassInput {
                keys: &keys,
                indices: &indices,
            },
            0,
            block_size,
            &offsets,
            &mut PassOutput {
                keys: &mut out_keys,
                indices: &mut out_indices,
            },
        )
        .unwrap();

        assert_eq!(out_keys, [0x1, 0x1, 0x2, 0x3, 0x13, 0x23]);
        assert_eq!(out_indices, [1, 3, 5, 0, 2, 4]);
    }

    fn scatter_with(keys: &[u32], block_size: usize, offsets: &[u32]) -> (Result<()>, Vec<u32>) {
        let indices = (0..keys.len() as u32).collect::<Vec<_>>();
        let mut out_keys = vec![0; keys.len()];
        let mut out_indices = vec![u32::MAX; keys.len()];
        let result = scatter(
            &PassInput {
                keys,
                indices: &indices,
            },
            0,
            block_size,
            offsets,
            &mut PassOutput {
                keys: &mut out_keys,
                indices: &mut out_indices,
            },
        );
        (result, out_indices)
    }

    #[test]
    fn offsets_outside_the_output_are_rejected() {
        let mut offsets = vec![0; 16];
        offsets[1] = 1;
        let (result, _) = scatter_with(&[0x1, 0x1], 2, &offsets);
        assert!(matches!(result, Err(SortError::InvalidArgument(_))));

        let mut offsets = vec![0; 16];
        offsets[15] = 3;
        let (result, _) = scatter_with(&[0x1, 0x1], 2, &offsets);
        assert!(matches!(result, Err(SortError::InvalidArgument(_))));
    }

    #[test]
    fn overlapping_offsets_are_rejected() {
        // Every block is told its digit starts at 0, so both would write the
        // same slots.
        let (result, _) = scatter_with(&[0x1, 0x1, 0x1, 0x1], 2, &[0; 32]);
        assert!(matches!(
            result,
            Err(SortError::InternalInvariantViolation(_))
        ));
    }

    #[test]
    fn offsets_too_small_for_a_digit_are_rejected() {
        // Digit 1 is given both slots, digit 2 none.
        let mut offsets = vec![2; 16];
        offsets[0] = 0;
        offsets[1] = 0;
        let (result, _) = scatter_with(&[0x1, 0x2], 2, &offsets);
        assert!(matches!(
            result,
            Err(SortError::InternalInvariantViolation(_))
        ));
    }

    #[test]
    fn block_size_and_shift_are_checked() {
        assert!(matches!(
            count_digits(&[1, 2], 0, 0),
            Err(SortError::InvalidArgument(_))
        ));
        assert!(matches!(
            count_digits(&[1, 2], 32, 2),
            Err(SortError::InvalidArgument(_))
        ));
        let (result, _) = scatter_with(&[1, 2], 0, &[]);
        assert!(matches!(result, Err(SortError::InvalidArgument(_))));
    }

    #[test]
    fn huge_blocks_make_one_block() {
        assert_eq!(block_count(0, 2), 0);
        assert_eq!(block_count(5, 2), 3);
        assert_eq!(block_count(4, 2), 2);
        assert_eq!(block_count(2, usize::MAX), 1);

        let keys = [0x2, 0x1];
        let counts = count_digits(&keys, 0, usize::MAX).unwrap();
        let offsets = digit_offsets(&scan(2), &counts).unwrap();
        let (result, out_indices) = scatter_with(&keys, usize::MAX, &offsets);
        assert!(result.is_ok());
        assert_eq!(out_indices, vec![1, 0]);
    }

    #[test]
    fn permutation_check() {
        assert!(check_permutation(&[]).is_ok());
        assert!(check_permutation(&[2, 0, 1]).is_ok());
        assert!(check_permutation(&[0, 0, 1]).is_err());
        assert!(check_permutation(&[0, 3, 1]).is_err());
    }
}
