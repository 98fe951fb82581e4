//! Type definitions.
use rlst::TransMode;
use thiserror::Error;

/// Transpose mode of a matrix product.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransposeMode {
    /// Apply the operator itself.
    NoTrans,
    /// Apply the transpose of the operator.
    Trans,
}

impl From<TransposeMode> for TransMode {
    fn from(trans: TransposeMode) -> Self {
        match trans {
            TransposeMode::NoTrans => TransMode::NoTrans,
            TransposeMode::Trans => TransMode::Trans,
        }
    }
}

/// Selector addressing either the row or the column cluster tree of a block cluster tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowColSelector {
    /// The row cluster tree.
    Row,
    /// The column cluster tree.
    Col,
}

/// Storage format of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockDataType {
    /// All entries of the block are stored.
    Dense,
    /// The block is approximated by a product of two thin matrices.
    LowRank,
}

/// A half-open range `[start, end)` of H-matrix DOF indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRange {
    /// First index of the range.
    pub start: usize,
    /// One past the last index of the range.
    pub end: usize,
}

impl IndexRange {
    /// Create a new index range.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end);
        Self { start, end }
    }

    /// Return the number of indices in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Return true if the range contains no indices.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Return true if `index` lies inside the range.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Errors produced by the hierarchical matrix container and its compressors.
#[derive(Error, Debug)]
pub enum HMatrixError {
    /// An input matrix has the wrong number of rows for the addressed cluster tree.
    #[error("shape mismatch: expected {expected} rows, found {actual}")]
    ShapeMismatch {
        /// Expected number of rows.
        expected: usize,
        /// Actual number of rows.
        actual: usize,
    },
    /// A DOF permutation is not a bijection onto `[0, n)`.
    #[error("invalid DOF permutation: index {0} is duplicated or out of range")]
    InvalidDofPermutation(usize),
    /// A compressor failed to produce block data for a leaf.
    #[error("block compression failed: {0}")]
    CompressionFailed(String),
}
