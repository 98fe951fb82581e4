//! The hierarchical matrix container.
//!
//! An [`HMatrix`] shares ownership of a block cluster tree and owns one block
//! data entry per leaf of that tree. It applies the blocked operator to dense
//! matrices given in the caller's original DOF ordering: inputs are permuted
//! into the tree-internal ordering, every leaf contributes its sub-product
//! independently, and the accumulated result is permuted back.

use std::sync::Arc;

use itertools::izip;
use log::debug;
use rayon::prelude::*;
use rlst::{
    rlst_dynamic_array2, DynamicArray, RandomAccessByRef, RandomAccessMut, RawAccess,
    RawAccessMut, RlstScalar, Shape,
};

use crate::block_cluster_tree::BlockClusterTree;
use crate::common::RawData2D;
use crate::hmatrix_data::scale_block;
use crate::traits::{HMatrixCompressor, HMatrixData};
use crate::types::{BlockDataType, HMatrixError, RowColSelector, TransposeMode};

/// A dense operator stored as a tree of dense and low-rank blocks.
pub struct HMatrix<T: RlstScalar> {
    block_cluster_tree: Arc<BlockClusterTree>,
    block_data: Vec<Box<dyn HMatrixData<T>>>,
}

impl<T: RlstScalar> HMatrix<T> {
    /// Create an uninitialized hierarchical matrix over a block cluster tree.
    pub fn new(block_cluster_tree: Arc<BlockClusterTree>) -> Self {
        Self {
            block_cluster_tree,
            block_data: Vec::new(),
        }
    }

    /// Create a hierarchical matrix and initialize it with `compressor`.
    pub fn from_compressor(
        block_cluster_tree: Arc<BlockClusterTree>,
        compressor: &impl HMatrixCompressor<T>,
    ) -> Result<Self, HMatrixError> {
        let mut hmatrix = Self::new(block_cluster_tree);
        hmatrix.initialize(compressor)?;
        Ok(hmatrix)
    }

    /// The number of rows of the operator.
    pub fn rows(&self) -> usize {
        self.block_cluster_tree.rows()
    }

    /// The number of columns of the operator.
    pub fn columns(&self) -> usize {
        self.block_cluster_tree.columns()
    }

    /// The block cluster tree that defines the partition into blocks.
    pub fn block_cluster_tree(&self) -> &BlockClusterTree {
        &self.block_cluster_tree
    }

    /// Compress every leaf block with `compressor`.
    ///
    /// Existing block data is discarded first. Leaves are compressed
    /// independently in parallel. If any leaf fails the matrix is left in the
    /// uninitialized state and the error is propagated.
    pub fn initialize(
        &mut self,
        compressor: &impl HMatrixCompressor<T>,
    ) -> Result<(), HMatrixError> {
        self.reset();
        let block_cluster_tree = self.block_cluster_tree.as_ref();
        let block_data = block_cluster_tree
            .leaves()
            .par_iter()
            .map(|&node| compressor.compress_block(block_cluster_tree, node))
            .collect::<Result<Vec<_>, _>>()?;
        self.block_data = block_data;

        debug!(
            "Initialized hierarchical matrix with {} dense and {} low rank blocks ({} stored entries)",
            self.number_of_dense_blocks(),
            self.number_of_low_rank_blocks(),
            self.number_of_stored_elements()
        );
        Ok(())
    }

    /// Discard all block data, returning the matrix to the uninitialized state.
    ///
    /// The underlying block cluster tree is untouched.
    pub fn reset(&mut self) {
        self.block_data.clear();
    }

    /// Return true if every leaf has block data.
    pub fn is_initialized(&self) -> bool {
        !self.block_data.is_empty()
    }

    /// The number of leaf blocks with data.
    pub fn number_of_blocks(&self) -> usize {
        self.block_data.len()
    }

    /// The number of blocks stored in dense form.
    pub fn number_of_dense_blocks(&self) -> usize {
        self.block_data
            .iter()
            .filter(|data| data.block_type() == BlockDataType::Dense)
            .count()
    }

    /// The number of blocks stored in low-rank form.
    pub fn number_of_low_rank_blocks(&self) -> usize {
        self.block_data
            .iter()
            .filter(|data| data.block_type() == BlockDataType::LowRank)
            .count()
    }

    /// The total number of scalars held in block storage.
    pub fn number_of_stored_elements(&self) -> usize {
        self.block_data
            .iter()
            .map(|data| data.number_of_elements())
            .sum()
    }

    /// The block storage size in kilobytes.
    pub fn memory_size_kb(&self) -> f64 {
        (self.number_of_stored_elements() * std::mem::size_of::<T>()) as f64 / 1024.0
    }

    /// The Frobenius norm of the stored operator.
    ///
    /// Valid because the leaf blocks tile the operator: the squared norm is
    /// the sum of the squared block norms.
    pub fn frobenius_norm(&self) -> T::Real {
        let mut norm_squared = T::zero().re();
        for data in &self.block_data {
            let block_norm = data.frobenius_norm();
            norm_squared += block_norm * block_norm;
        }
        norm_squared.sqrt()
    }

    fn cluster_tree(&self, row_or_column: RowColSelector) -> &crate::cluster_tree::ClusterTree {
        match row_or_column {
            RowColSelector::Row => self.block_cluster_tree.row_cluster_tree(),
            RowColSelector::Col => self.block_cluster_tree.column_cluster_tree(),
        }
    }

    /// Reorder the rows of `mat` from the original into the H-matrix ordering.
    ///
    /// `row_or_column` selects the cluster tree whose bijection is applied.
    /// Fails if the row count of `mat` does not match that tree's DOF count.
    pub fn permute_mat_to_hmat_dofs(
        &self,
        mat: &DynamicArray<T, 2>,
        row_or_column: RowColSelector,
    ) -> Result<DynamicArray<T, 2>, HMatrixError> {
        let cluster_tree = self.cluster_tree(row_or_column);
        if mat.shape()[0] != cluster_tree.number_of_dofs() {
            return Err(HMatrixError::ShapeMismatch {
                expected: cluster_tree.number_of_dofs(),
                actual: mat.shape()[0],
            });
        }

        let mut permuted = rlst_dynamic_array2!(T, [mat.shape()[0], mat.shape()[1]]);
        for original_dof in 0..mat.shape()[0] {
            let hmat_dof = cluster_tree.map_original_dof_to_hmat_dof(original_dof);
            for column in 0..mat.shape()[1] {
                *permuted.get_mut([hmat_dof, column]).unwrap() =
                    *mat.get([original_dof, column]).unwrap();
            }
        }
        Ok(permuted)
    }

    /// Reorder the rows of `mat` from the H-matrix into the original ordering.
    ///
    /// `row_or_column` selects the cluster tree whose bijection is applied.
    /// Fails if the row count of `mat` does not match that tree's DOF count.
    pub fn permute_mat_to_original_dofs(
        &self,
        mat: &DynamicArray<T, 2>,
        row_or_column: RowColSelector,
    ) -> Result<DynamicArray<T, 2>, HMatrixError> {
        let cluster_tree = self.cluster_tree(row_or_column);
        if mat.shape()[0] != cluster_tree.number_of_dofs() {
            return Err(HMatrixError::ShapeMismatch {
                expected: cluster_tree.number_of_dofs(),
                actual: mat.shape()[0],
            });
        }

        let mut original = rlst_dynamic_array2!(T, [mat.shape()[0], mat.shape()[1]]);
        for hmat_dof in 0..mat.shape()[0] {
            let original_dof = cluster_tree.map_hmat_dof_to_original_dof(hmat_dof);
            for column in 0..mat.shape()[1] {
                *original.get_mut([original_dof, column]).unwrap() =
                    *mat.get([hmat_dof, column]).unwrap();
            }
        }
        Ok(original)
    }

    /// Compute `y := alpha * op(A) * x + beta * y` with `A` this operator.
    ///
    /// `x` and `y` are dense matrices in the caller's original DOF ordering;
    /// `op` is the identity or the transpose depending on `trans`. If `beta`
    /// is zero the prior contents of `y` are not read; if `alpha` is zero the
    /// contents of `x` are not read. An uninitialized matrix contributes
    /// nothing beyond the scaling of `y`; callers should check
    /// [`is_initialized`](HMatrix::is_initialized) first.
    pub fn apply(
        &self,
        x: &DynamicArray<T, 2>,
        y: &mut DynamicArray<T, 2>,
        trans: TransposeMode,
        alpha: T,
        beta: T,
    ) -> Result<(), HMatrixError> {
        // Which side op(A) reads from and writes to. The input is permuted
        // with the cluster tree of the side op(A) reads from, the output
        // accumulator lives on the side op(A) writes to.
        let (input_dofs, output_dofs, input_selector, output_selector) = match trans {
            TransposeMode::NoTrans => (
                self.columns(),
                self.rows(),
                RowColSelector::Col,
                RowColSelector::Row,
            ),
            TransposeMode::Trans => (
                self.rows(),
                self.columns(),
                RowColSelector::Row,
                RowColSelector::Col,
            ),
        };

        if x.shape()[0] != input_dofs {
            return Err(HMatrixError::ShapeMismatch {
                expected: input_dofs,
                actual: x.shape()[0],
            });
        }
        if y.shape()[0] != output_dofs {
            return Err(HMatrixError::ShapeMismatch {
                expected: output_dofs,
                actual: y.shape()[0],
            });
        }
        if x.shape()[1] != y.shape()[1] {
            return Err(HMatrixError::ShapeMismatch {
                expected: x.shape()[1],
                actual: y.shape()[1],
            });
        }

        scale_block(y, beta);
        if alpha == T::zero() || !self.is_initialized() {
            return Ok(());
        }

        let number_of_rhs = x.shape()[1];
        let x_permuted = self.permute_mat_to_hmat_dofs(x, input_selector)?;
        let mut y_permuted = rlst_dynamic_array2!(T, [output_dofs, number_of_rhs]);

        let block_cluster_tree = self.block_cluster_tree.as_ref();
        let y_raw = RawData2D {
            data: y_permuted.data_mut().as_mut_ptr(),
            shape: y_permuted.shape(),
        };

        block_cluster_tree
            .leaves()
            .par_iter()
            .zip(self.block_data.par_iter())
            .for_each(|(&node, data)| {
                // Capture the whole `RawData2D` (which is `unsafe impl Sync`)
                // rather than its inner `*mut T` field, which is not `Sync`.
                let y_raw = &y_raw;
                let node = block_cluster_tree.node(node);
                let (input_range, output_range) = match trans {
                    TransposeMode::NoTrans => (node.column_index_range(), node.row_index_range()),
                    TransposeMode::Trans => (node.row_index_range(), node.column_index_range()),
                };

                let input_len = input_range.len();
                let output_len = output_range.len();

                let mut x_block = rlst_dynamic_array2!(T, [input_len, number_of_rhs]);
                {
                    let x_data = x_permuted.data();
                    let x_block_data = x_block.data_mut();
                    for rhs in 0..number_of_rhs {
                        for row in 0..input_len {
                            x_block_data[row + rhs * input_len] =
                                x_data[input_range.start + row + rhs * input_dofs];
                        }
                    }
                }

                let mut y_block = rlst_dynamic_array2!(T, [output_len, number_of_rhs]);
                data.apply(&x_block, &mut y_block, trans, alpha, T::one());

                // Scatter into the shared accumulator. Leaf output ranges are
                // disjoint for a fixed transpose mode, so no two tasks write
                // the same entry.
                let y_block_data = y_block.data();
                for rhs in 0..number_of_rhs {
                    for row in 0..output_len {
                        unsafe {
                            *y_raw
                                .data
                                .add(output_range.start + row + rhs * y_raw.shape[0]) +=
                                y_block_data[row + rhs * output_len];
                        }
                    }
                }
            });

        let y_original = self.permute_mat_to_original_dofs(&y_permuted, output_selector)?;
        for (output, contribution) in izip!(y.data_mut().iter_mut(), y_original.data().iter()) {
            *output += *contribution;
        }
        Ok(())
    }
}
