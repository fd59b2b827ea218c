use super::grid_size;
use crate::{
    error::{try_vec, Result, SortError},
    scan::MAX_SCAN_LEN,
};
use cust::{memory::DeviceSlice, prelude::*};
use radix_sort_gpu::BLOCK_SIZE;

/// Hierarchical exclusive prefix sum on the device.
///
/// `scan_blocks` scans every `BLOCK_SIZE` section and collects the section
/// totals, the totals are scanned recursively, and `add_block_offsets` carries
/// them back into every section. Working buffers live only for one call.
pub struct DeviceScanEngine<'m> {
    module: &'m Module,
}

impl<'m> DeviceScanEngine<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module }
    }

    /// Writes the exclusive prefix sum of `xs` into `out`. The work is queued
    /// on `stream`; the caller synchronizes.
    pub fn exclusive_scan(
        &self,
        stream: &Stream,
        out: &DeviceSlice<u32>,
        xs: &DeviceSlice<u32>,
    ) -> Result<()> {
        let n = xs.len();
        if out.len() != n {
            return Err(SortError::InvalidArgument(format!(
                "scan of {} elements given output of {}",
                n,
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

        let grid_size = grid_size(n);
        let block_sums = try_vec::<u32>(grid_size as usize)?.as_dbuf()?;

        let scan_blocks = self.module.get_function("scan_blocks")?;
        unsafe {
            launch!(
                scan_blocks<<<grid_size, BLOCK_SIZE as u32, 0, stream>>>(
                    xs.as_device_ptr(),
                    xs.len(),
                    out.as_device_ptr(),
                    block_sums.as_device_ptr()
                )
            )?;
        }

        if grid_size > 1 {
            self.carry_block_sums(stream, out, &block_sums)?;
        }

        // The working buffers are freed on drop, so the queued kernels have to
        // finish with them first.
        stream.synchronize()?;
        Ok(())
    }

    fn carry_block_sums(
        &self,
        stream: &Stream,
        out: &DeviceSlice<u32>,
        block_sums: &DeviceSlice<u32>,
    ) -> Result<()> {
        let n = out.len();
        let grid_size = grid_size(n);
        let block_offsets = try_vec::<u32>(grid_size as usize)?.as_dbuf()?;
        self.exclusive_scan(stream, &block_offsets, block_sums)?;

        let add_block_offsets = self.module.get_function("add_block_offsets")?;
        unsafe {
            launch!(
                add_block_offsets<<<grid_size, BLOCK_SIZE as u32, 0, stream>>>(
                    out.as_device_ptr(),
                    n,
                    block_offsets.as_device_ptr(),
                    block_offsets.len()
                )
            )?;
        }

        stream.synchronize()?;
        Ok(())
    }

    /// Uploads `xs`, scans it and downloads the result.
    pub fn scan(&self, stream: &Stream, xs: &[u32]) -> Result<Vec<u32>> {
        let mut ys = try_vec::<u32>(xs.len())?;
        if xs.is_empty() {
            return Ok(ys);
        }

        let dev_xs = xs.as_dbuf()?;
        let dev_ys = ys.as_slice().as_dbuf()?;
        self.exclusive_scan(stream, &dev_ys, &dev_xs)?;
        stream.synchronize()?;

        dev_ys.copy_to(&mut ys)?;
        Ok(ys)
    }
}
