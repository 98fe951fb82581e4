//! Trait definitions.
use rlst::{DynamicArray, RlstScalar};

use crate::block_cluster_tree::BlockClusterTree;
use crate::cluster_tree::ClusterTreeNode;
use crate::types::{BlockDataType, HMatrixError, TransposeMode};

/// Numeric content of one leaf block of a hierarchical matrix.
///
/// All storage variants expose the same application contract so that the
/// container can dispatch per leaf without knowing the representation.
pub trait HMatrixData<T: RlstScalar>: Send + Sync {
    /// Compute `y := alpha * op(block) * x + beta * y`.
    ///
    /// `op` is the identity or the transpose depending on `trans`. `x` and
    /// `y` may have multiple columns (one per right-hand side). If `beta` is
    /// zero the prior contents of `y` are not read; if `alpha` is zero the
    /// contents of `x` are not read.
    fn apply(
        &self,
        x: &DynamicArray<T, 2>,
        y: &mut DynamicArray<T, 2>,
        trans: TransposeMode,
        alpha: T,
        beta: T,
    );

    /// Number of rows of the block.
    fn rows(&self) -> usize;

    /// Number of columns of the block.
    fn columns(&self) -> usize;

    /// Rank of the stored representation.
    ///
    /// For a dense block this is the smaller of the two dimensions.
    fn rank(&self) -> usize;

    /// Number of scalars held in storage.
    fn number_of_elements(&self) -> usize;

    /// Frobenius norm of the stored block.
    fn frobenius_norm(&self) -> T::Real;

    /// Storage format of the block.
    fn block_type(&self) -> BlockDataType;
}

/// Access to the true entries of the underlying operator.
///
/// This is the boundary to the kernel/quadrature layer: implementations
/// evaluate the dense entries of an arbitrary sub-block, addressed by lists
/// of row and column DOFs in the caller's original ordering.
pub trait DataAccessor: Send + Sync {
    /// Scalar type of the operator.
    type T: RlstScalar;

    /// Fill `data` with the entries `(rows[i], cols[j])` of the operator.
    ///
    /// `data` has shape `[rows.len(), cols.len()]`.
    fn compute_dense_block(&self, rows: &[usize], cols: &[usize], data: &mut DynamicArray<Self::T, 2>);
}

/// Strategy that turns a block cluster tree leaf into stored block data.
///
/// Compression of one leaf must not depend on any other leaf so that a
/// hierarchical matrix can be initialized leaf-parallel.
pub trait HMatrixCompressor<T: RlstScalar>: Sync {
    /// Produce the block data for the leaf `node` of `block_cluster_tree`.
    fn compress_block(
        &self,
        block_cluster_tree: &BlockClusterTree,
        node: usize,
    ) -> Result<Box<dyn HMatrixData<T>>, HMatrixError>;
}

/// Decides at construction time whether a block is admissible for compression.
pub trait AdmissibilityCriterion {
    /// Return true if the pair of clusters forms a far (compressible) block.
    fn is_admissible(&self, row_cluster: &ClusterTreeNode, column_cluster: &ClusterTreeNode)
        -> bool;
}

impl<F> AdmissibilityCriterion for F
where
    F: Fn(&ClusterTreeNode, &ClusterTreeNode) -> bool,
{
    fn is_admissible(
        &self,
        row_cluster: &ClusterTreeNode,
        column_cluster: &ClusterTreeNode,
    ) -> bool {
        self(row_cluster, column_cluster)
    }
}
