//! Low-rank block data.
use num::Zero;
use rlst::{
    empty_array, DynamicArray, Gemm, MultInto, MultIntoResize, RawAccess, RlstScalar, Shape,
    TransMode,
};

use crate::hmatrix_data::scale_block;
use crate::traits::HMatrixData;
use crate::types::{BlockDataType, TransposeMode};

/// A block approximated by the product `U * V`.
///
/// `U` has shape `[rows, rank]` and `V` has shape `[rank, columns]`, so the
/// representation stores `rank * (rows + columns)` scalars instead of
/// `rows * columns`.
pub struct HMatrixLowRankData<T: RlstScalar> {
    u: DynamicArray<T, 2>,
    v: DynamicArray<T, 2>,
}

impl<T: RlstScalar> HMatrixLowRankData<T> {
    /// Create low-rank block data from the two factors.
    pub fn new(u: DynamicArray<T, 2>, v: DynamicArray<T, 2>) -> Self {
        assert_eq!(u.shape()[1], v.shape()[0]);
        Self { u, v }
    }

    /// The row factor `U`.
    pub fn u(&self) -> &DynamicArray<T, 2> {
        &self.u
    }

    /// The column factor `V`.
    pub fn v(&self) -> &DynamicArray<T, 2> {
        &self.v
    }
}

impl<T: RlstScalar + Gemm> HMatrixData<T> for HMatrixLowRankData<T> {
    fn apply(
        &self,
        x: &DynamicArray<T, 2>,
        y: &mut DynamicArray<T, 2>,
        trans: TransposeMode,
        alpha: T,
        beta: T,
    ) {
        if alpha == T::zero() {
            scale_block(y, beta);
            return;
        }

        match trans {
            TransposeMode::NoTrans => {
                // y := alpha * U * (V * x) + beta * y
                let t = empty_array::<T, 2>().simple_mult_into_resize(self.v.view(), x.view());
                y.view_mut().mult_into(
                    TransMode::NoTrans,
                    TransMode::NoTrans,
                    alpha,
                    self.u.view(),
                    t.view(),
                    beta,
                );
            }
            TransposeMode::Trans => {
                // y := alpha * V^T * (U^T * x) + beta * y
                let t = empty_array::<T, 2>().mult_into_resize(
                    TransMode::Trans,
                    TransMode::NoTrans,
                    T::one(),
                    self.u.view(),
                    x.view(),
                    T::zero(),
                );
                y.view_mut().mult_into(
                    TransMode::Trans,
                    TransMode::NoTrans,
                    alpha,
                    self.v.view(),
                    t.view(),
                    beta,
                );
            }
        }
    }

    fn rows(&self) -> usize {
        self.u.shape()[0]
    }

    fn columns(&self) -> usize {
        self.v.shape()[1]
    }

    fn rank(&self) -> usize {
        self.u.shape()[1]
    }

    fn number_of_elements(&self) -> usize {
        self.u.shape()[0] * self.u.shape()[1] + self.v.shape()[0] * self.v.shape()[1]
    }

    fn frobenius_norm(&self) -> T::Real {
        // ||U V||_F^2 = trace((U^H U) (V V^H)); both Gram matrices are only
        // rank x rank, so the norm is computed without forming U * V.
        let rows = self.u.shape()[0];
        let columns = self.v.shape()[1];
        let rank = self.rank();
        let u = self.u.data();
        let v = self.v.data();

        let mut u_gram = vec![T::zero(); rank * rank];
        for k in 0..rank {
            for l in 0..rank {
                let mut entry = T::zero();
                for i in 0..rows {
                    entry += u[i + k * rows].conj() * u[i + l * rows];
                }
                u_gram[k + l * rank] = entry;
            }
        }

        let mut v_gram = vec![T::zero(); rank * rank];
        for k in 0..rank {
            for l in 0..rank {
                let mut entry = T::zero();
                for j in 0..columns {
                    entry += v[k + j * rank] * v[l + j * rank].conj();
                }
                v_gram[k + l * rank] = entry;
            }
        }

        let mut norm_squared = <T::Real>::zero();
        for k in 0..rank {
            for l in 0..rank {
                norm_squared += (u_gram[k + l * rank] * v_gram[l + k * rank]).re();
            }
        }
        norm_squared.sqrt()
    }

    fn block_type(&self) -> BlockDataType {
        BlockDataType::LowRank
    }
}
