//! Dense block compression.
use rlst::{rlst_dynamic_array2, Gemm};

use crate::block_cluster_tree::BlockClusterTree;
use crate::hmatrix_compressor::block_original_dofs;
use crate::hmatrix_data::dense::HMatrixDenseData;
use crate::traits::{DataAccessor, HMatrixCompressor, HMatrixData};
use crate::types::HMatrixError;

/// A compressor that stores every leaf block exactly.
pub struct HMatrixDenseCompressor<Accessor: DataAccessor> {
    accessor: Accessor,
}

impl<Accessor: DataAccessor> HMatrixDenseCompressor<Accessor> {
    /// Create a new dense compressor around a data accessor.
    pub fn new(accessor: Accessor) -> Self {
        Self { accessor }
    }

    /// The data accessor used to evaluate block entries.
    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }
}

impl<Accessor: DataAccessor> HMatrixCompressor<Accessor::T> for HMatrixDenseCompressor<Accessor>
where
    Accessor::T: Gemm,
{
    fn compress_block(
        &self,
        block_cluster_tree: &BlockClusterTree,
        node: usize,
    ) -> Result<Box<dyn HMatrixData<Accessor::T>>, HMatrixError> {
        let node = block_cluster_tree.node(node);
        let (rows, columns) = block_original_dofs(block_cluster_tree, node);

        let mut data = rlst_dynamic_array2!(Accessor::T, [rows.len(), columns.len()]);
        self.accessor.compute_dense_block(&rows, &columns, &mut data);
        Ok(Box::new(HMatrixDenseData::new(data)))
    }
}

#[cfg(test)]
mod test {
    extern crate blas_src;
    extern crate lapack_src;

    use super::*;
    use crate::cluster_tree::{ClusterTree, ClusterTreeNode};
    use crate::types::BlockDataType;
    use approx::assert_relative_eq;
    use rlst::{DynamicArray, RandomAccessMut, RawAccess};
    use std::sync::Arc;

    struct IndexProductAccessor;

    impl DataAccessor for IndexProductAccessor {
        type T = f64;

        fn compute_dense_block(
            &self,
            rows: &[usize],
            cols: &[usize],
            data: &mut DynamicArray<f64, 2>,
        ) {
            for (local_row, &row) in rows.iter().enumerate() {
                for (local_col, &col) in cols.iter().enumerate() {
                    *data.get_mut([local_row, local_col]).unwrap() =
                        (1 + row) as f64 * (1 + col) as f64;
                }
            }
        }
    }

    fn never_admissible(_: &ClusterTreeNode, _: &ClusterTreeNode) -> bool {
        false
    }

    #[test]
    fn test_every_leaf_becomes_a_dense_block() {
        let row_tree = Arc::new(ClusterTree::from_dof_permutation(vec![2, 0, 3, 1], 2).unwrap());
        let column_tree =
            Arc::new(ClusterTree::from_dof_permutation(vec![1, 3, 0, 2], 2).unwrap());
        let tree = BlockClusterTree::new(row_tree, column_tree, &never_admissible);

        let compressor = HMatrixDenseCompressor::new(IndexProductAccessor);

        for &leaf in tree.leaves() {
            let data = compressor.compress_block(&tree, leaf).unwrap();
            let node = tree.node(leaf);
            assert_eq!(data.block_type(), BlockDataType::Dense);
            assert_eq!(data.rows(), node.row_index_range().len());
            assert_eq!(data.columns(), node.column_index_range().len());
        }
    }

    #[test]
    fn test_block_entries_use_original_dof_indices() {
        let row_tree = Arc::new(ClusterTree::from_dof_permutation(vec![2, 0, 3, 1], 2).unwrap());
        let column_tree =
            Arc::new(ClusterTree::from_dof_permutation(vec![1, 3, 0, 2], 2).unwrap());
        let tree = BlockClusterTree::new(row_tree, column_tree, &never_admissible);

        let compressor = HMatrixDenseCompressor::new(IndexProductAccessor);

        let leaf = tree.leaves()[0];
        let node = tree.node(leaf);
        let data = compressor.compress_block(&tree, leaf).unwrap();

        // The first leaf covers H-matrix rows [0, 2) and columns [0, 2),
        // which map back to original rows [2, 0] and columns [1, 3].
        assert_eq!(node.row_index_range().len(), 2);
        assert_eq!(node.column_index_range().len(), 2);

        // Recover the stored entries by applying the block to the identity.
        let mut identity = rlst_dynamic_array2!(f64, [2, 2]);
        *identity.get_mut([0, 0]).unwrap() = 1.0;
        *identity.get_mut([1, 1]).unwrap() = 1.0;
        let mut entries = rlst_dynamic_array2!(f64, [2, 2]);
        data.apply(
            &identity,
            &mut entries,
            crate::types::TransposeMode::NoTrans,
            1.0,
            0.0,
        );

        let expected = [3.0 * 2.0, 1.0 * 2.0, 3.0 * 4.0, 1.0 * 4.0];
        for (result, reference) in itertools::izip!(entries.data(), expected.iter()) {
            assert_relative_eq!(*result, *reference, epsilon = 1e-14);
        }
    }
}
