use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SortError>;

/// Every way a scan or a sort can fail. None of these are retried: the call
/// that reports one has left its outputs untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    /// Working memory could not be allocated, a kernel launch ran out of
    /// resources, or the input is larger than the engine can address.
    #[error("parallel resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A consistency check on intermediate or final buffers failed.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),

    /// A device failure that is not a resource shortage, e.g. a PTX module that
    /// fails to load.
    #[error("device error: {0}")]
    Device(String),
}

impl From<TryReserveError> for SortError {
    fn from(err: TryReserveError) -> Self {
        SortError::ResourceExhausted(err.to_string())
    }
}

#[cfg(feature = "cuda")]
impl From<cust::error::CudaError> for SortError {
    fn from(err: cust::error::CudaError) -> Self {
        use cust::error::CudaError;

        match err {
            CudaError::OutOfMemory | CudaError::LaunchOutOfResources => {
                SortError::ResourceExhausted(err.to_string())
            }
            _ => SortError::Device(err.to_string()),
        }
    }
}

/// Allocates a vector of `len` default values, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_vec<T>(len: usize) -> Result<Vec<T>>
where
    T: Clone + Default,
{
    let mut xs = Vec::new();
    xs.try_reserve_exact(len)?;
    xs.resize(len, T::default());
    Ok(xs)
}

#[cfg(test)]
mod tests {
    use super::{try_vec, SortError};

    #[test]
    fn try_vec_is_zeroed() {
        let xs: Vec<u32> = try_vec(5).unwrap();
        assert_eq!(xs, vec![0; 5]);
    }

    #[test]
    fn impossible_allocation_is_resource_error() {
        let result = try_vec::<u64>(usize::MAX / 2);
        assert!(matches!(result, Err(SortError::ResourceExhausted(_))));
    }
}
