//! Compression strategies that turn block cluster tree leaves into block data.
pub mod aca;
pub mod dense;

use crate::block_cluster_tree::{BlockClusterTree, BlockClusterTreeNode};

/// Collect the original DOF indices of a block's row and column sides.
pub(crate) fn block_original_dofs(
    block_cluster_tree: &BlockClusterTree,
    node: &BlockClusterTreeNode,
) -> (Vec<usize>, Vec<usize>) {
    let row_cluster_tree = block_cluster_tree.row_cluster_tree();
    let column_cluster_tree = block_cluster_tree.column_cluster_tree();

    let row_range = node.row_index_range();
    let column_range = node.column_index_range();

    let rows = (row_range.start..row_range.end)
        .map(|hmat_dof| row_cluster_tree.map_hmat_dof_to_original_dof(hmat_dof))
        .collect();
    let columns = (column_range.start..column_range.end)
        .map(|hmat_dof| column_cluster_tree.map_hmat_dof_to_original_dof(hmat_dof))
        .collect();
    (rows, columns)
}
