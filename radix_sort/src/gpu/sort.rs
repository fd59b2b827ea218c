use super::{grid_size, load_module, scan::DeviceScanEngine};
use crate::{
    error::{try_vec, Result, SortError},
    pass::{check_permutation, BufferRole},
    sort::{check_lengths, SortedValues},
};
use cust::{memory::DeviceSlice, prelude::*};
use log::{debug, trace};
use radix_sort_gpu::{
    key::{pass_shift, PASS_COUNT, RADIX},
    BLOCK_SIZE,
};
use std::{mem::size_of, ops::Range, time::Instant};

/// Radix sort of `f32` values on the device. One thread block is one
/// cooperating group of `BLOCK_SIZE` elements.
pub struct GpuRadixSorter {
    module: Module,
    verify_permutation: bool,
}

/// Device-side ping-pong buffers for one sort.
struct DeviceBuffers {
    keys: [DeviceBuffer<u32>; 2],
    indices: [DeviceBuffer<u32>; 2],
}

impl DeviceBuffers {
    fn new(len: usize) -> Result<Self> {
        // SAFETY: every element is written by `to_sortable_keys` or a scatter
        // before it is read.
        unsafe {
            Ok(Self {
                keys: [
                    DeviceBuffer::uninitialized(len)?,
                    DeviceBuffer::uninitialized(len)?,
                ],
                indices: [
                    DeviceBuffer::uninitialized(len)?,
                    DeviceBuffer::uninitialized(len)?,
                ],
            })
        }
    }

    /// The (read, write) sides for the given role.
    fn sides(&self, read: BufferRole) -> (usize, usize) {
        match read {
            BufferRole::Front => (0, 1),
            BufferRole::Back => (1, 0),
        }
    }
}

/// The device addresses covered by `slice`.
fn byte_range<T: DeviceCopy>(slice: &DeviceSlice<T>) -> Range<u64> {
    let start = slice.as_device_ptr().as_raw() as u64;
    start..start + (slice.len() * size_of::<T>()) as u64
}

fn overlaps(a: &Range<u64>, b: &Range<u64>) -> bool {
    !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
}

impl GpuRadixSorter {
    /// Loads the sort kernels. A CUDA context must be current.
    pub fn load() -> Result<Self> {
        Ok(Self::new(load_module()?))
    }

    /// Wraps a module built from `radix_sort_gpu`.
    pub fn new(module: Module) -> Self {
        Self {
            module,
            verify_permutation: cfg!(debug_assertions),
        }
    }

    pub fn with_verify_permutation(mut self, verify_permutation: bool) -> Self {
        self.verify_permutation = verify_permutation;
        self
    }

    /// Uploads `values`, sorts them and downloads the sorted values and their
    /// input positions.
    pub fn sort(&self, stream: &Stream, values: &[f32]) -> Result<SortedValues> {
        let mut sorted = SortedValues {
            values: try_vec(values.len())?,
            indices: try_vec(values.len())?,
        };
        if values.is_empty() {
            return Ok(sorted);
        }

        let now = Instant::now();
        let dev_values = values.as_dbuf()?;
        let dev_out_values = sorted.values.as_slice().as_dbuf()?;
        let dev_out_indices = sorted.indices.as_slice().as_dbuf()?;
        debug!("\thost -> device:\t{:.2?}", now.elapsed());

        self.sort_device(
            stream,
            &dev_out_values,
            &dev_out_indices,
            &dev_values,
            values.len(),
        )?;

        let now = Instant::now();
        dev_out_values.copy_to(&mut sorted.values)?;
        dev_out_indices.copy_to(&mut sorted.indices)?;
        debug!("\tdevice -> host:\t{:.2?}", now.elapsed());

        Ok(sorted)
    }

    /// Sorts the `n` device values of `in_values` into `out_values` and writes
    /// the input position of every sorted value into `out_indices`.
    ///
    /// The outputs are only written after every pass has been queued
    /// successfully. Returns once the stream has finished the sort.
    pub fn sort_device(
        &self,
        stream: &Stream,
        out_values: &DeviceSlice<f32>,
        out_indices: &DeviceSlice<u32>,
        in_values: &DeviceSlice<f32>,
        n: usize,
    ) -> Result<()> {
        check_lengths(n, out_values.len(), out_indices.len(), in_values.len())?;
        let input = byte_range(in_values);
        if overlaps(&byte_range(out_values), &input)
            || overlaps(&byte_range(out_indices), &input)
        {
            return Err(SortError::InvalidArgument(
                "outputs overlap the input values".to_string(),
            ));
        }
        if n == 0 {
            return Ok(());
        }

        let grid_size = grid_size(n);
        debug!("gpu radix sort of {} values in {} blocks", n, grid_size);

        let now = Instant::now();
        let buffers = DeviceBuffers::new(n)?;
        let counts = try_vec::<u32>(RADIX * grid_size as usize)?.as_dbuf()?;
        let offsets = try_vec::<u32>(RADIX * grid_size as usize)?.as_dbuf()?;

        let to_sortable_keys = self.module.get_function("to_sortable_keys")?;
        unsafe {
            launch!(
                to_sortable_keys<<<grid_size, BLOCK_SIZE as u32, 0, stream>>>(
                    in_values.as_device_ptr(),
                    in_values.len(),
                    buffers.keys[0].as_device_ptr(),
                    buffers.indices[0].as_device_ptr()
                )
            )?;
        }
        stream.synchronize()?;
        debug!("\tkeys:\t{:.2?}", now.elapsed());

        let scan = DeviceScanEngine::new(&self.module);
        let count_digits = self.module.get_function("count_digits")?;
        let scatter_digits = self.module.get_function("scatter_digits")?;

        let mut read = BufferRole::for_pass(0);
        for pass in 0..PASS_COUNT {
            let now = Instant::now();
            let shift = pass_shift(pass);
            let (r, w) = buffers.sides(read);
            trace!("pass {}: shift {}, reading {:?}", pass, shift, read);

            unsafe {
                launch!(
                    count_digits<<<grid_size, BLOCK_SIZE as u32, 0, stream>>>(
                        buffers.keys[r].as_device_ptr(),
                        buffers.keys[r].len(),
                        shift,
                        counts.as_device_ptr()
                    )
                )?;
            }

            scan.exclusive_scan(stream, &offsets, &counts)?;

            unsafe {
                launch!(
                    scatter_digits<<<grid_size, BLOCK_SIZE as u32, 0, stream>>>(
                        buffers.keys[r].as_device_ptr(),
                        buffers.keys[r].len(),
                        buffers.indices[r].as_device_ptr(),
                        buffers.indices[r].len(),
                        shift,
                        offsets.as_device_ptr(),
                        offsets.len(),
                        buffers.keys[w].as_device_ptr(),
                        buffers.indices[w].as_device_ptr()
                    )
                )?;
            }
            stream.synchronize()?;

            read = read.swapped();
            debug!("\tpass {}:\t{:.2?}", pass, now.elapsed());
        }

        let now = Instant::now();
        let (r, _) = buffers.sides(read);
        if self.verify_permutation {
            let mut indices = try_vec::<u32>(n)?;
            buffers.indices[r].copy_to(&mut indices)?;
            check_permutation(&indices)?;
        }

        let from_sortable_keys = self.module.get_function("from_sortable_keys")?;
        unsafe {
            launch!(
                from_sortable_keys<<<grid_size, BLOCK_SIZE as u32, 0, stream>>>(
                    buffers.keys[r].as_device_ptr(),
                    buffers.keys[r].len(),
                    buffers.indices[r].as_device_ptr(),
                    buffers.indices[r].len(),
                    out_values.as_device_ptr(),
                    out_indices.as_device_ptr()
                )
            )?;
        }
        stream.synchronize()?;
        debug!("\toutput:\t{:.2?}", now.elapsed());

        Ok(())
    }
}
