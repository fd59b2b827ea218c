use crate::{
    config::SortConfig,
    error::{try_vec, Result, SortError},
    pass::{
        block_count, check_permutation, count_digits, digit_offsets, scatter, BufferRole, PingPong,
    },
    scan::ScanEngine,
};
use log::{debug, trace};
use radix_sort_gpu::key::{from_sortable_key, pass_shift, to_sortable_key, PASS_COUNT};
use rayon::prelude::*;
use std::time::Instant;

/// The longest input that can be sorted. Indices are `u32`.
pub const MAX_SORT_LEN: usize = u32::MAX as usize;

/// Owned result of [`RadixSorter::sort`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SortedValues {
    /// The input values in ascending total order.
    pub values: Vec<f32>,

    /// `indices[k]` is the input position of `values[k]`.
    pub indices: Vec<u32>,
}

/// Stable LSD radix sort of `f32` values that also reports where every sorted
/// value came from.
///
/// Holds only configuration, so one sorter can serve any number of sorts,
/// including concurrent ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct RadixSorter {
    config: SortConfig,
    scan: ScanEngine,
}

impl RadixSorter {
    pub fn new(config: SortConfig) -> Result<Self> {
        let scan = ScanEngine::new(&config)?;
        Ok(Self { config, scan })
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sorts `values` into new vectors.
    pub fn sort(&self, values: &[f32]) -> Result<SortedValues> {
        let mut sorted = SortedValues {
            values: try_vec(values.len())?,
            indices: try_vec(values.len())?,
        };
        self.sort_into(&mut sorted.values, &mut sorted.indices, values, values.len())?;
        Ok(sorted)
    }

    /// Sorts the `n` values of `in_values` into `out_values` and writes the
    /// input position of every sorted value into `out_indices`.
    ///
    /// The outputs are only written once every pass has succeeded; on error
    /// they are left as they were.
    pub fn sort_into(
        &self,
        out_values: &mut [f32],
        out_indices: &mut [u32],
        in_values: &[f32],
        n: usize,
    ) -> Result<()> {
        check_lengths(n, out_values.len(), out_indices.len(), in_values.len())?;
        if n == 0 {
            return Ok(());
        }

        let block_size = self.config.block_size;
        debug!(
            "radix sort of {} values in {} blocks of {}",
            n,
            block_count(n, block_size),
            block_size
        );

        let now = Instant::now();
        let mut buffers = PingPong::new(n)?;
        to_sortable_keys(in_values, &mut buffers);
        debug!("\tkeys:\t{:.2?}", now.elapsed());

        let mut read = BufferRole::for_pass(0);
        for pass in 0..PASS_COUNT {
            let now = Instant::now();
            self.run_pass(pass, read, &mut buffers)?;
            read = read.swapped();
            debug!("\tpass {}:\t{:.2?}", pass, now.elapsed());
        }

        let now = Instant::now();
        let sorted = buffers.get(read);
        if self.config.verify_permutation {
            check_permutation(sorted.indices)?;
        }
        out_values
            .par_iter_mut()
            .zip(sorted.keys.par_iter())
            .for_each(|(value, &key)| *value = f32::from_bits(from_sortable_key(key)));
        out_indices.copy_from_slice(sorted.indices);
        debug!("\toutput:\t{:.2?}", now.elapsed());

        Ok(())
    }

    /// Runs one count / offset / scatter pass reading the `read` half of the
    /// buffers and writing the other half.
    fn run_pass(&self, pass: u32, read: BufferRole, buffers: &mut PingPong) -> Result<()> {
        let shift = pass_shift(pass);
        let block_size = self.config.block_size;
        trace!("pass {}: shift {}, reading {:?}", pass, shift, read);

        let (input, mut output) = buffers.split(read);
        let counts = count_digits(input.keys, shift, block_size)?;
        let offsets = digit_offsets(&self.scan, &counts)?;
        scatter(&input, shift, block_size, &offsets, &mut output)
    }
}

/// Sorts `n` values with the default configuration. See
/// [`RadixSorter::sort_into`].
pub fn radix_sort(
    out_values: &mut [f32],
    out_indices: &mut [u32],
    in_values: &[f32],
    n: usize,
) -> Result<()> {
    RadixSorter::default().sort_into(out_values, out_indices, in_values, n)
}

pub(crate) fn check_lengths(
    n: usize,
    out_values_len: usize,
    out_indices_len: usize,
    in_values_len: usize,
) -> Result<()> {
    if n > MAX_SORT_LEN {
        return Err(SortError::InvalidArgument(format!(
            "cannot sort {} values, at most {} are supported",
            n, MAX_SORT_LEN
        )));
    }
    if in_values_len != n || out_values_len != n || out_indices_len != n {
        return Err(SortError::InvalidArgument(format!(
            "sort of {} values given {} inputs, {} output values and {} output indices",
            n, in_values_len, out_values_len, out_indices_len
        )));
    }
    Ok(())
}

/// Fills the front buffers with the sortable keys of `values` and the
/// identity permutation.
fn to_sortable_keys(values: &[f32], buffers: &mut PingPong) {
    let front = buffers.front_mut();
    front
        .keys
        .par_iter_mut()
        .zip(values.par_iter())
        .for_each(|(key, value)| *key = to_sortable_key(value.to_bits()));
    front
        .indices
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, index)| *index = i as u32);
}
