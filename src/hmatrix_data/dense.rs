//! Dense block data.
use num::Zero;
use rlst::{DynamicArray, Gemm, MultInto, RawAccess, RlstScalar, Shape, TransMode};

use crate::hmatrix_data::scale_block;
use crate::traits::HMatrixData;
use crate::types::{BlockDataType, TransposeMode};

/// A block stored entrywise.
pub struct HMatrixDenseData<T: RlstScalar> {
    data: DynamicArray<T, 2>,
}

impl<T: RlstScalar> HMatrixDenseData<T> {
    /// Create dense block data from the block's entries.
    pub fn new(data: DynamicArray<T, 2>) -> Self {
        Self { data }
    }

    /// The stored entries.
    pub fn data(&self) -> &DynamicArray<T, 2> {
        &self.data
    }
}

impl<T: RlstScalar + Gemm> HMatrixData<T> for HMatrixDenseData<T> {
    fn apply(
        &self,
        x: &DynamicArray<T, 2>,
        y: &mut DynamicArray<T, 2>,
        trans: TransposeMode,
        alpha: T,
        beta: T,
    ) {
        let [rows, columns] = self.data.shape();
        let (input_len, output_len) = match trans {
            TransposeMode::NoTrans => (columns, rows),
            TransposeMode::Trans => (rows, columns),
        };
        debug_assert_eq!(x.shape()[0], input_len);
        debug_assert_eq!(y.shape()[0], output_len);
        debug_assert_eq!(x.shape()[1], y.shape()[1]);

        if alpha == T::zero() {
            scale_block(y, beta);
            return;
        }

        y.view_mut().mult_into(
            trans.into(),
            TransMode::NoTrans,
            alpha,
            self.data.view(),
            x.view(),
            beta,
        );
    }

    fn rows(&self) -> usize {
        self.data.shape()[0]
    }

    fn columns(&self) -> usize {
        self.data.shape()[1]
    }

    fn rank(&self) -> usize {
        std::cmp::min(self.data.shape()[0], self.data.shape()[1])
    }

    fn number_of_elements(&self) -> usize {
        self.data.shape()[0] * self.data.shape()[1]
    }

    fn frobenius_norm(&self) -> T::Real {
        let mut norm_squared = <T::Real>::zero();
        for value in self.data.data() {
            norm_squared += value.abs() * value.abs();
        }
        norm_squared.sqrt()
    }

    fn block_type(&self) -> BlockDataType {
        BlockDataType::Dense
    }
}

#[cfg(test)]
mod test {
    extern crate blas_src;
    extern crate lapack_src;

    use super::*;
    use approx::assert_relative_eq;
    use rlst::{rlst_dynamic_array2, RandomAccessMut, RawAccessMut};

    fn example_block() -> HMatrixDenseData<f64> {
        // A 3x2 block with known entries.
        let mut data = rlst_dynamic_array2!(f64, [3, 2]);
        for i in 0..3 {
            for j in 0..2 {
                *data.get_mut([i, j]).unwrap() = (1 + i + 3 * j) as f64;
            }
        }
        HMatrixDenseData::new(data)
    }

    #[test]
    fn test_apply_no_trans() {
        let block = example_block();
        let mut x = rlst_dynamic_array2!(f64, [2, 1]);
        *x.get_mut([0, 0]).unwrap() = 1.0;
        *x.get_mut([1, 0]).unwrap() = -2.0;
        let mut y = rlst_dynamic_array2!(f64, [3, 1]);
        *y.get_mut([0, 0]).unwrap() = 10.0;

        block.apply(&x, &mut y, TransposeMode::NoTrans, 2.0, 1.0);

        // Column-major block: A = [[1, 4], [2, 5], [3, 6]].
        assert_relative_eq!(y.data()[0], 10.0 + 2.0 * (1.0 - 8.0), epsilon = 1e-14);
        assert_relative_eq!(y.data()[1], 2.0 * (2.0 - 10.0), epsilon = 1e-14);
        assert_relative_eq!(y.data()[2], 2.0 * (3.0 - 12.0), epsilon = 1e-14);
    }

    #[test]
    fn test_apply_trans() {
        let block = example_block();
        let mut x = rlst_dynamic_array2!(f64, [3, 1]);
        *x.get_mut([0, 0]).unwrap() = 1.0;
        *x.get_mut([1, 0]).unwrap() = 1.0;
        *x.get_mut([2, 0]).unwrap() = 1.0;
        let mut y = rlst_dynamic_array2!(f64, [2, 1]);

        block.apply(&x, &mut y, TransposeMode::Trans, 1.0, 0.0);

        assert_relative_eq!(y.data()[0], 6.0, epsilon = 1e-14);
        assert_relative_eq!(y.data()[1], 15.0, epsilon = 1e-14);
    }

    #[test]
    fn test_beta_zero_ignores_prior_contents() {
        let block = example_block();
        let mut x = rlst_dynamic_array2!(f64, [2, 1]);
        *x.get_mut([0, 0]).unwrap() = 1.0;

        let mut y_garbage = rlst_dynamic_array2!(f64, [3, 1]);
        for value in y_garbage.data_mut() {
            *value = f64::NAN;
        }
        let mut y_clean = rlst_dynamic_array2!(f64, [3, 1]);

        block.apply(&x, &mut y_garbage, TransposeMode::NoTrans, 1.0, 0.0);
        block.apply(&x, &mut y_clean, TransposeMode::NoTrans, 1.0, 0.0);

        for (garbage, clean) in itertools::izip!(y_garbage.data(), y_clean.data()) {
            assert_relative_eq!(*garbage, *clean, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_alpha_zero_ignores_input() {
        let block = example_block();
        let mut x = rlst_dynamic_array2!(f64, [2, 1]);
        for value in x.data_mut() {
            *value = f64::NAN;
        }
        let mut y = rlst_dynamic_array2!(f64, [3, 1]);
        for value in y.data_mut() {
            *value = 2.0;
        }

        block.apply(&x, &mut y, TransposeMode::NoTrans, 0.0, 3.0);

        for value in y.data() {
            assert_relative_eq!(*value, 6.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_statistics() {
        let block = example_block();
        assert_eq!(block.rows(), 3);
        assert_eq!(block.columns(), 2);
        assert_eq!(block.rank(), 2);
        assert_eq!(block.number_of_elements(), 6);
        assert_eq!(block.block_type(), BlockDataType::Dense);
        let expected = (1..7).map(|v| (v * v) as f64).sum::<f64>().sqrt();
        assert_relative_eq!(block.frobenius_norm(), expected, epsilon = 1e-14);
    }
}
