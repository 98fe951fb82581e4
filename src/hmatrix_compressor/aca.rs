//! Adaptive cross approximation.
use itertools::izip;
use log::debug;
use num::Zero;
use rlst::{rlst_dynamic_array2, Gemm, RawAccess, RawAccessMut, RlstScalar};

use crate::block_cluster_tree::BlockClusterTree;
use crate::hmatrix_compressor::block_original_dofs;
use crate::hmatrix_data::dense::HMatrixDenseData;
use crate::hmatrix_data::low_rank::HMatrixLowRankData;
use crate::traits::{DataAccessor, HMatrixCompressor, HMatrixData};
use crate::types::HMatrixError;

/// A compressor based on adaptive cross approximation with partial pivoting.
///
/// Admissible (far) leaves are approximated by a low-rank product `U * V`
/// built from a small number of rows and columns of the true block, stopping
/// once the estimated relative error drops below `eps`. Near leaves, blocks
/// where the cross approximation does not converge within `max_rank` terms
/// and blocks where the factorized form would need more storage than the
/// dense form are stored densely instead.
pub struct HMatrixAcaCompressor<Accessor: DataAccessor> {
    accessor: Accessor,
    eps: <Accessor::T as RlstScalar>::Real,
    max_rank: usize,
}

impl<Accessor: DataAccessor> HMatrixAcaCompressor<Accessor>
where
    <Accessor::T as RlstScalar>::Real: num::Float,
{
    /// Create a new ACA compressor.
    ///
    /// `eps` is the relative Frobenius accuracy target for far blocks and
    /// `max_rank` bounds the number of cross terms per block.
    pub fn new(accessor: Accessor, eps: <Accessor::T as RlstScalar>::Real, max_rank: usize) -> Self {
        assert!(max_rank >= 1);
        Self {
            accessor,
            eps,
            max_rank,
        }
    }

    /// The data accessor used to evaluate block entries.
    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    fn compress_dense(
        &self,
        rows: &[usize],
        columns: &[usize],
    ) -> Box<dyn HMatrixData<Accessor::T>>
    where
        Accessor::T: Gemm,
    {
        let mut data = rlst_dynamic_array2!(Accessor::T, [rows.len(), columns.len()]);
        self.accessor.compute_dense_block(rows, columns, &mut data);
        Box::new(HMatrixDenseData::new(data))
    }

    /// Run partially pivoted ACA on the block given by `rows` x `columns`.
    ///
    /// Returns the cross factors, or `None` if the accuracy target was not
    /// reached within `max_rank` terms.
    #[allow(clippy::type_complexity)]
    fn cross_approximate(
        &self,
        rows: &[usize],
        columns: &[usize],
    ) -> Option<(Vec<Vec<Accessor::T>>, Vec<Vec<Accessor::T>>)> {
        let nrows = rows.len();
        let ncolumns = columns.len();
        let max_rank = std::cmp::min(self.max_rank, std::cmp::min(nrows, ncolumns));

        let mut u_columns: Vec<Vec<Accessor::T>> = Vec::new();
        let mut v_rows: Vec<Vec<Accessor::T>> = Vec::new();
        let mut row_used = vec![false; nrows];
        let mut column_used = vec![false; ncolumns];

        let mut row_buffer = rlst_dynamic_array2!(Accessor::T, [1, ncolumns]);
        let mut column_buffer = rlst_dynamic_array2!(Accessor::T, [nrows, 1]);

        // Squared Frobenius norm of the rank-k approximant, updated per term.
        let mut norm_squared = Accessor::T::zero().re();
        let mut pivot_row = 0;

        loop {
            // Residual of the pivot row: the true row minus the contribution
            // of all previous cross terms.
            self.accessor
                .compute_dense_block(&rows[pivot_row..pivot_row + 1], columns, &mut row_buffer);
            let mut residual_row = row_buffer.data().to_vec();
            for (u_column, v_row) in izip!(&u_columns, &v_rows) {
                let coefficient = u_column[pivot_row];
                for (residual, v) in izip!(residual_row.iter_mut(), v_row.iter()) {
                    *residual -= coefficient * *v;
                }
            }
            row_used[pivot_row] = true;

            let mut pivot_column = None;
            let mut pivot_abs = Accessor::T::zero().re();
            for (column, value) in residual_row.iter().enumerate() {
                if !column_used[column] && (pivot_column.is_none() || value.abs() > pivot_abs) {
                    pivot_column = Some(column);
                    pivot_abs = value.abs();
                }
            }

            let Some(pivot_column) = pivot_column else {
                // All columns are used up; the residual is exhausted.
                return Some((u_columns, v_rows));
            };

            if !(pivot_abs > Accessor::T::zero().re()) {
                // Zero residual row. Move on to the next unused row; if none
                // is left the block is reproduced exactly.
                match row_used.iter().position(|&used| !used) {
                    Some(row) => {
                        pivot_row = row;
                        continue;
                    }
                    None => return Some((u_columns, v_rows)),
                }
            }

            let pivot_value = residual_row[pivot_column];
            let v_row: Vec<Accessor::T> =
                residual_row.iter().map(|&value| value / pivot_value).collect();

            // Residual of the pivot column.
            self.accessor.compute_dense_block(
                rows,
                &columns[pivot_column..pivot_column + 1],
                &mut column_buffer,
            );
            let mut u_column = column_buffer.data().to_vec();
            for (u_previous, v_previous) in izip!(&u_columns, &v_rows) {
                let coefficient = v_previous[pivot_column];
                for (u, value) in izip!(u_column.iter_mut(), u_previous.iter()) {
                    *u -= coefficient * *value;
                }
            }
            column_used[pivot_column] = true;

            let mut u_norm_squared = Accessor::T::zero().re();
            for value in &u_column {
                u_norm_squared += value.abs() * value.abs();
            }
            let mut v_norm_squared = Accessor::T::zero().re();
            for value in &v_row {
                v_norm_squared += value.abs() * value.abs();
            }

            // ||A_k||^2 = ||A_{k-1}||^2 + 2 Re sum_l <u_l, u_k> <v_k, v_l>
            //           + ||u_k||^2 ||v_k||^2.
            let mut cross = Accessor::T::zero().re();
            for (u_previous, v_previous) in izip!(&u_columns, &v_rows) {
                let mut u_inner = Accessor::T::zero();
                for (previous, current) in izip!(u_previous.iter(), u_column.iter()) {
                    u_inner += previous.conj() * *current;
                }
                let mut v_inner = Accessor::T::zero();
                for (current, previous) in izip!(v_row.iter(), v_previous.iter()) {
                    v_inner += *current * previous.conj();
                }
                cross += (u_inner * v_inner).re();
            }
            norm_squared += cross + cross + u_norm_squared * v_norm_squared;

            let term_norm_squared = u_norm_squared * v_norm_squared;
            u_columns.push(u_column);
            v_rows.push(v_row);

            if term_norm_squared <= self.eps * self.eps * norm_squared {
                return Some((u_columns, v_rows));
            }
            if u_columns.len() == max_rank {
                return None;
            }

            // Next pivot row: largest residual entry of the new column term.
            let u_column = u_columns.last().unwrap();
            let mut next_row = None;
            let mut next_abs = Accessor::T::zero().re();
            for (row, value) in u_column.iter().enumerate() {
                if !row_used[row] && (next_row.is_none() || value.abs() > next_abs) {
                    next_row = Some(row);
                    next_abs = value.abs();
                }
            }
            match next_row {
                Some(row) => pivot_row = row,
                None => return Some((u_columns, v_rows)),
            }
        }
    }
}

impl<Accessor: DataAccessor> HMatrixCompressor<Accessor::T> for HMatrixAcaCompressor<Accessor>
where
    Accessor::T: Gemm,
    <Accessor::T as RlstScalar>::Real: num::Float,
{
    fn compress_block(
        &self,
        block_cluster_tree: &BlockClusterTree,
        node: usize,
    ) -> Result<Box<dyn HMatrixData<Accessor::T>>, HMatrixError> {
        let node = block_cluster_tree.node(node);
        let (rows, columns) = block_original_dofs(block_cluster_tree, node);
        let nrows = rows.len();
        let ncolumns = columns.len();

        if !node.is_admissible() || nrows == 0 || ncolumns == 0 {
            return Ok(self.compress_dense(&rows, &columns));
        }

        let Some((u_columns, v_rows)) = self.cross_approximate(&rows, &columns) else {
            debug!(
                "ACA did not converge for a {} x {} block within rank {}; storing dense",
                nrows, ncolumns, self.max_rank
            );
            return Ok(self.compress_dense(&rows, &columns));
        };

        let rank = u_columns.len();
        if rank * (nrows + ncolumns) >= nrows * ncolumns {
            // The factorized form would not save anything.
            return Ok(self.compress_dense(&rows, &columns));
        }

        let mut u = rlst_dynamic_array2!(Accessor::T, [nrows, rank]);
        for (term, u_column) in u_columns.iter().enumerate() {
            for (row, value) in u_column.iter().enumerate() {
                u.data_mut()[row + term * nrows] = *value;
            }
        }
        let mut v = rlst_dynamic_array2!(Accessor::T, [rank, ncolumns]);
        for (term, v_row) in v_rows.iter().enumerate() {
            for (column, value) in v_row.iter().enumerate() {
                v.data_mut()[term + column * rank] = *value;
            }
        }

        Ok(Box::new(HMatrixLowRankData::new(u, v)))
    }
}
