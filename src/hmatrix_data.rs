//! Block data storage variants.
pub mod dense;
pub mod low_rank;

use rlst::{DynamicArray, RawAccessMut, RlstScalar};

/// Scale a block by `beta` without reading it when `beta` is zero.
pub(crate) fn scale_block<T: RlstScalar>(block: &mut DynamicArray<T, 2>, beta: T) {
    if beta == T::zero() {
        block.data_mut().fill(T::zero());
    } else if beta != T::one() {
        for value in block.data_mut().iter_mut() {
            *value *= beta;
        }
    }
}
