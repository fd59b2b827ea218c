use crate::{
    config::SortConfig,
    error::{try_vec, Result, SortError},
};
use rayon::prelude::*;

/// The longest input the scan engine accepts. Offsets and totals are `u32`.
pub const MAX_SCAN_LEN: usize = u32::MAX as usize;

/// Sequential exclusive scan of `xs` into `ys`. Returns the total of `xs`.
///
/// Sums wrap around on overflow.
pub fn sequential_exclusive_scan(xs: &[u32], ys: &mut [u32]) -> u32 {
    let mut accumulator = 0u32;
    for (x, y) in xs.iter().zip(ys.iter_mut()) {
        *y = accumulator;
        accumulator = accumulator.wrapping_add(*x);
    }
    accumulator
}

/// Hierarchical exclusive prefix sum over `u32` values.
///
/// The input is cut into blocks of `block_size` elements. Every block is
/// scanned independently in parallel, the block totals are scanned by the same
/// engine, and each block then adds the scanned total of the blocks before it.
/// The engine keeps no state between calls.
#[derive(Clone, Copy, Debug)]
pub struct ScanEngine {
    block_size: usize,
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self {
            block_size: SortConfig::default().block_size,
        }
    }
}

impl ScanEngine {
    pub fn new(config: &SortConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_size: config.block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Writes the exclusive prefix sum of the `n` elements of `xs` into
    /// `out`. Sums wrap around on overflow.
    pub fn exclusive_scan(&self, out: &mut [u32], xs: &[u32], n: usize) -> Result<()> {
        if xs.len() != n || out.len() != n {
            return Err(SortError::InvalidArgument(format!(
                "scan of {} elements given input of {} and output of {}",
                n,
                xs.len(),
                out.len()
            )));
        }
        if n > MAX_SCAN_LEN {
            return Err(SortError::ResourceExhausted(format!(
                "scan of {} elements exceeds the maximum of {}",
                n, MAX_SCAN_LEN
            )));
        }
        if n == 0 {
            return Ok(());
        }

        // Scan every block locally and collect the block totals.
        let block_sums = out
            .par_chunks_mut(self.block_size)
            .zip(xs.par_chunks(self.block_size))
            .map(|(ys, xs)| sequential_exclusive_scan(xs, ys))
            .collect::<Vec<_>>();

        if block_sums.len() == 1 {
            return Ok(());
        }

        // Carry the totals of earlier blocks into every later block.
        let mut block_offsets = try_vec(block_sums.len())?;
        self.exclusive_scan(&mut block_offsets, &block_sums, block_sums.len())?;

        out.par_chunks_mut(self.block_size)
            .zip(block_offsets.par_iter())
            .for_each(|(ys, &offset)| {
                for y in ys {
                    *y = y.wrapping_add(offset);
                }
            });

        Ok(())
    }

    /// Convenience wrapper returning the scan as a new vector.
    pub fn scan(&self, xs: &[u32]) -> Result<Vec<u32>> {
        let mut out = try_vec(xs.len())?;
        self.exclusive_scan(&mut out, xs, xs.len())?;
        Ok(out)
    }
}

/// Sequential exclusive scan returning a new vector.
pub fn sequential_scan_vec(xs: &[u32]) -> Vec<u32> {
    let mut ys = vec![0; xs.len()];
    sequential_exclusive_scan(xs, &mut ys);
    ys
}

#[cfg(test)]
mod tests {
    use super::{sequential_exclusive_scan, sequential_scan_vec, ScanEngine};
    use crate::{SortConfig, SortError};

    fn engine(block_size: usize) -> ScanEngine {
        ScanEngine::new(&SortConfig::default().with_block_size(block_size)).unwrap()
    }

    #[test]
    fn scans_ones() {
        let ys = engine(2).scan(&[1, 1, 1, 1]).unwrap();
        assert_eq!(ys, vec![0, 1, 2, 3]);
    }

    #[test]
    fn sequential_scan_returns_total() {
        let xs = [3, 1, 4, 1, 5];
        let mut ys = [0; 5];
        let total = sequential_exclusive_scan(&xs, &mut ys);
        assert_eq!(ys, [0, 3, 4, 8, 9]);
        assert_eq!(total, 14);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let ys = engine(4).scan(&[]).unwrap();
        assert!(ys.is_empty());
    }

    #[test]
    fn block_size_does_not_change_result() {
        // Long enough to need three levels of block totals at block size 2.
        let xs = (0..1000u32).map(|i| (i * 7919) % 13).collect::<Vec<_>>();
        let expected = sequential_scan_vec(&xs);
        for block_size in [2, 3, 16, 999, 1000, 4096] {
            assert_eq!(engine(block_size).scan(&xs).unwrap(), expected);
        }
    }

    #[test]
    fn repeated_scans_agree() {
        let xs = (0..5000u32).map(|i| i % 17).collect::<Vec<_>>();
        let scan = engine(64);
        let first = scan.scan(&xs).unwrap();
        let second = scan.scan(&xs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn input_is_not_mutated() {
        let xs = vec![5u32, 6, 7, 8, 9];
        let copy = xs.clone();
        let _ = engine(2).scan(&xs).unwrap();
        assert_eq!(xs, copy);
    }

    #[test]
    fn sums_wrap_on_overflow() {
        let ys = engine(2).scan(&[u32::MAX, 2, 0]).unwrap();
        assert_eq!(ys, vec![0, u32::MAX, 1]);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut out = [0u32; 3];
        let result = engine(2).exclusive_scan(&mut out, &[1, 2], 2);
        assert!(matches!(result, Err(SortError::InvalidArgument(_))));
    }
}
