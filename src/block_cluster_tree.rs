//! Block cluster trees.
//!
//! A block cluster tree pairs a row cluster tree with a column cluster tree.
//! Its leaves are the blocks of a hierarchical matrix: far (admissible)
//! leaves are eligible for low-rank compression, near leaves must be stored
//! exactly. Which pairs are admissible is decided once, at construction time,
//! by a caller-supplied criterion; afterwards the tree is immutable.

use std::sync::Arc;

use crate::cluster_tree::ClusterTree;
use crate::traits::AdmissibilityCriterion;
use crate::types::IndexRange;

/// A node of a block cluster tree.
#[derive(Clone, Debug)]
pub struct BlockClusterTreeNode {
    row_cluster: usize,
    column_cluster: usize,
    row_index_range: IndexRange,
    column_index_range: IndexRange,
    admissible: bool,
    children: Vec<usize>,
}

impl BlockClusterTreeNode {
    /// Identifier of the referenced row cluster tree node.
    pub fn row_cluster(&self) -> usize {
        self.row_cluster
    }

    /// Identifier of the referenced column cluster tree node.
    pub fn column_cluster(&self) -> usize {
        self.column_cluster
    }

    /// Range of H-matrix row DOFs covered by this block.
    pub fn row_index_range(&self) -> IndexRange {
        self.row_index_range
    }

    /// Range of H-matrix column DOFs covered by this block.
    pub fn column_index_range(&self) -> IndexRange {
        self.column_index_range
    }

    /// Return true if the block is a far (compressible) block.
    pub fn is_admissible(&self) -> bool {
        self.admissible
    }

    /// Identifiers of the child blocks; empty for a leaf.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Return true if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A block cluster tree over a pair of cluster trees.
pub struct BlockClusterTree {
    row_cluster_tree: Arc<ClusterTree>,
    column_cluster_tree: Arc<ClusterTree>,
    nodes: Vec<BlockClusterTreeNode>,
    leaves: Vec<usize>,
}

impl BlockClusterTree {
    /// Create a block cluster tree.
    ///
    /// Starting from the pair of roots, a pair of clusters becomes a far
    /// leaf when `admissibility` accepts it, a near leaf when either cluster
    /// cannot be subdivided further, and is otherwise split into the four
    /// pairs of child clusters.
    pub fn new(
        row_cluster_tree: Arc<ClusterTree>,
        column_cluster_tree: Arc<ClusterTree>,
        admissibility: &impl AdmissibilityCriterion,
    ) -> Self {
        let mut tree = Self {
            row_cluster_tree,
            column_cluster_tree,
            nodes: Vec::new(),
            leaves: Vec::new(),
        };
        let row_root = tree.row_cluster_tree.root();
        let column_root = tree.column_cluster_tree.root();
        tree.build_subtree(row_root, column_root, admissibility);
        tree
    }

    fn build_subtree(
        &mut self,
        row_cluster: usize,
        column_cluster: usize,
        admissibility: &impl AdmissibilityCriterion,
    ) -> usize {
        let row_node = self.row_cluster_tree.node(row_cluster);
        let column_node = self.column_cluster_tree.node(column_cluster);
        let admissible = admissibility.is_admissible(row_node, column_node);

        let node_id = self.nodes.len();
        self.nodes.push(BlockClusterTreeNode {
            row_cluster,
            column_cluster,
            row_index_range: row_node.index_range(),
            column_index_range: column_node.index_range(),
            admissible,
            children: Vec::new(),
        });

        match (row_node.children(), column_node.children()) {
            (Some(row_children), Some(column_children)) if !admissible => {
                let mut children = Vec::with_capacity(4);
                for row_child in row_children {
                    for column_child in column_children {
                        children.push(self.build_subtree(row_child, column_child, admissibility));
                    }
                }
                self.nodes[node_id].children = children;
            }
            _ => {
                self.leaves.push(node_id);
            }
        }
        node_id
    }

    /// The number of rows of the blocked operator.
    pub fn rows(&self) -> usize {
        self.row_cluster_tree.number_of_dofs()
    }

    /// The number of columns of the blocked operator.
    pub fn columns(&self) -> usize {
        self.column_cluster_tree.number_of_dofs()
    }

    /// The cluster tree of the row index set.
    pub fn row_cluster_tree(&self) -> &ClusterTree {
        &self.row_cluster_tree
    }

    /// The cluster tree of the column index set.
    pub fn column_cluster_tree(&self) -> &ClusterTree {
        &self.column_cluster_tree
    }

    /// Access a node by its identifier.
    pub fn node(&self, node_id: usize) -> &BlockClusterTreeNode {
        &self.nodes[node_id]
    }

    /// Identifiers of the leaf nodes.
    ///
    /// The position of a leaf in this slice is its stable leaf identifier;
    /// hierarchical matrices key their block data by it.
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    /// The number of leaf blocks.
    pub fn number_of_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Iterate over the leaf nodes.
    pub fn leaf_nodes(&self) -> impl Iterator<Item = &BlockClusterTreeNode> + '_ {
        self.leaves.iter().map(move |&leaf| &self.nodes[leaf])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cluster_tree::ClusterTreeNode;

    fn never_admissible(_: &ClusterTreeNode, _: &ClusterTreeNode) -> bool {
        false
    }

    #[test]
    fn test_leaves_tile_the_full_rectangle() {
        let row_tree = Arc::new(ClusterTree::from_dof_permutation((0..11).collect(), 2).unwrap());
        let column_tree =
            Arc::new(ClusterTree::from_dof_permutation((0..7).collect(), 2).unwrap());

        // Diagonal-ish admissibility: far whenever the ranges do not overlap.
        let admissibility = |row: &ClusterTreeNode, column: &ClusterTreeNode| {
            let r = row.index_range();
            let c = column.index_range();
            r.end <= c.start || c.end <= r.start
        };

        let tree = BlockClusterTree::new(row_tree, column_tree, &admissibility);

        let mut covered = vec![vec![0; tree.columns()]; tree.rows()];
        for node in tree.leaf_nodes() {
            assert!(node.is_leaf());
            for i in node.row_index_range().start..node.row_index_range().end {
                for j in node.column_index_range().start..node.column_index_range().end {
                    covered[i][j] += 1;
                }
            }
        }
        for row in &covered {
            assert!(row.iter().all(|&count| count == 1));
        }
    }

    #[test]
    fn test_never_admissible_gives_only_near_leaves() {
        let row_tree = Arc::new(ClusterTree::from_dof_permutation((0..8).collect(), 2).unwrap());
        let column_tree = Arc::new(ClusterTree::from_dof_permutation((0..8).collect(), 2).unwrap());

        let tree = BlockClusterTree::new(row_tree, column_tree, &never_admissible);

        // Every leaf pairs two cluster tree leaves and is marked near.
        for node in tree.leaf_nodes() {
            assert!(!node.is_admissible());
            assert!(node.row_index_range().len() <= 2);
            assert!(node.column_index_range().len() <= 2);
        }
        assert_eq!(tree.number_of_leaves(), 16);
    }

    #[test]
    fn test_admissible_blocks_become_far_leaves() {
        let row_tree = Arc::new(ClusterTree::from_dof_permutation((0..8).collect(), 2).unwrap());
        let column_tree = Arc::new(ClusterTree::from_dof_permutation((0..8).collect(), 2).unwrap());

        let admissibility = |row: &ClusterTreeNode, column: &ClusterTreeNode| {
            let r = row.index_range();
            let c = column.index_range();
            r.end <= c.start || c.end <= r.start
        };

        let tree = BlockClusterTree::new(row_tree, column_tree, &admissibility);

        // The two off-diagonal half blocks are admissible at the first
        // subdivision level and must not have been subdivided further. The
        // two diagonal half blocks split once more, giving two far and two
        // near 2x2 blocks each.
        let far_leaves = tree
            .leaf_nodes()
            .filter(|node| node.is_admissible())
            .collect::<Vec<_>>();
        assert_eq!(far_leaves.len(), 6);
        assert_eq!(
            far_leaves
                .iter()
                .filter(|node| node.row_index_range().len() == 4)
                .count(),
            2
        );
        let near_leaves = tree
            .leaf_nodes()
            .filter(|node| !node.is_admissible())
            .count();
        assert_eq!(near_leaves, 4);
    }

    #[test]
    fn test_shared_cluster_trees() {
        let row_tree = Arc::new(ClusterTree::from_dof_permutation((0..4).collect(), 1).unwrap());
        let column_tree = Arc::new(ClusterTree::from_dof_permutation((0..4).collect(), 1).unwrap());

        let first = BlockClusterTree::new(row_tree.clone(), column_tree.clone(), &never_admissible);
        let second = BlockClusterTree::new(row_tree, column_tree, &never_admissible);

        assert!(std::ptr::eq(first.row_cluster_tree(), second.row_cluster_tree()));
        assert_eq!(first.rows(), 4);
        assert_eq!(second.columns(), 4);
    }
}
