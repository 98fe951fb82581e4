//! Common utility types.
use rlst::RlstScalar;

/// Raw 2D data
///
/// Wraps a raw pointer to column-major matrix data so that parallel workers
/// can write to disjoint parts of the same buffer. Callers must guarantee
/// that no two workers touch the same entry.
pub(crate) struct RawData2D<T: RlstScalar> {
    /// Pointer to the matrix data
    pub(crate) data: *mut T,
    /// Shape of the matrix
    pub(crate) shape: [usize; 2],
}

unsafe impl<T: RlstScalar> Sync for RawData2D<T> {}
