//! A minimal compressed-sparse-row matrix.

use std::fmt;

use ndarray::Array2;

use crate::errors::BasisError;
use crate::operator::MatrixElementType;

/// A sparse matrix in compressed-sparse-row format.
///
/// Entries sharing a position are summed on construction, and entries that sum to zero are
/// dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix<T> {
    shape: (usize, usize),
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: MatrixElementType> SparseMatrix<T> {
    /// Assembles a sparse matrix from coordinate triplets.
    ///
    /// # Errors
    ///
    /// [`BasisError::ShapeMismatch`] if the triplet arrays differ in length or if an index falls
    /// outside `shape`.
    pub fn from_triplets(
        shape: (usize, usize),
        rows: &[usize],
        cols: &[usize],
        values: &[T],
    ) -> Result<Self, BasisError> {
        if rows.len() != values.len() || cols.len() != values.len() {
            return Err(BasisError::ShapeMismatch {
                expected: values.len(),
                found: rows.len().min(cols.len()),
            });
        }
        if let Some(&r) = rows.iter().find(|&&r| r >= shape.0) {
            return Err(BasisError::ShapeMismatch {
                expected: shape.0,
                found: r + 1,
            });
        }
        if let Some(&c) = cols.iter().find(|&&c| c >= shape.1) {
            return Err(BasisError::ShapeMismatch {
                expected: shape.1,
                found: c + 1,
            });
        }

        let mut row_entries: Vec<Vec<(usize, T)>> = vec![Vec::new(); shape.0];
        for ((&r, &c), &v) in rows.iter().zip(cols.iter()).zip(values.iter()) {
            row_entries[r].push((c, v));
        }

        let mut row_ptr = Vec::with_capacity(shape.0 + 1);
        let mut col_indices = Vec::new();
        let mut merged_values = Vec::new();
        row_ptr.push(0);
        for row in row_entries.iter_mut() {
            row.sort_by_key(|&(c, _)| c);
            let mut merged: Vec<(usize, T)> = Vec::new();
            for &(c, v) in row.iter() {
                if let Some(last) = merged.last_mut() {
                    if last.0 == c {
                        last.1 += v;
                        continue;
                    }
                }
                merged.push((c, v));
            }
            for (c, v) in merged.into_iter().filter(|(_, v)| !v.is_zero()) {
                col_indices.push(c);
                merged_values.push(v);
            }
            row_ptr.push(col_indices.len());
        }
        Ok(Self {
            shape,
            row_ptr,
            col_indices,
            values: merged_values,
        })
    }

    /// The shape of the matrix.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// The number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates over the stored entries as `(row, col, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.shape.0).flat_map(move |r| {
            (self.row_ptr[r]..self.row_ptr[r + 1])
                .map(move |idx| (r, self.col_indices[idx], self.values[idx]))
        })
    }

    /// The entry at `(row, col)`, zero if not stored.
    pub fn get(&self, row: usize, col: usize) -> T {
        if row >= self.shape.0 {
            return T::zero();
        }
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_indices[range.clone()]
            .binary_search(&col)
            .map_or(T::zero(), |pos| self.values[range.start + pos])
    }

    /// Converts to a dense array.
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::<T>::zeros(self.shape);
        self.iter().for_each(|(r, c, v)| dense[[r, c]] += v);
        dense
    }

    /// The conjugate transpose of this matrix.
    pub fn adjoint(&self) -> Self {
        let (rows, cols, values): (Vec<_>, Vec<_>, Vec<_>) = self
            .iter()
            .map(|(r, c, v)| (c, r, v.conj()))
            .fold((vec![], vec![], vec![]), |(mut rs, mut cs, mut vs), (r, c, v)| {
                rs.push(r);
                cs.push(c);
                vs.push(v);
                (rs, cs, vs)
            });
        Self::from_triplets((self.shape.1, self.shape.0), &rows, &cols, &values)
            .unwrap_or_else(|_| unreachable!("Transposed indices always fit the transposed shape."))
    }

    /// Multiplies this matrix with a dense matrix.
    ///
    /// # Errors
    ///
    /// [`BasisError::ShapeMismatch`] if the inner dimensions differ.
    pub fn dot_dense(&self, rhs: &Array2<T>) -> Result<Array2<T>, BasisError> {
        if rhs.nrows() != self.shape.1 {
            return Err(BasisError::ShapeMismatch {
                expected: self.shape.1,
                found: rhs.nrows(),
            });
        }
        let mut out = Array2::<T>::zeros((self.shape.0, rhs.ncols()));
        for (r, c, v) in self.iter() {
            for k in 0..rhs.ncols() {
                out[[r, k]] += v * rhs[[c, k]];
            }
        }
        Ok(out)
    }

    /// Multiplies this matrix with another sparse matrix.
    ///
    /// # Errors
    ///
    /// [`BasisError::ShapeMismatch`] if the inner dimensions differ.
    pub fn dot_sparse(&self, rhs: &SparseMatrix<T>) -> Result<SparseMatrix<T>, BasisError> {
        if rhs.shape.0 != self.shape.1 {
            return Err(BasisError::ShapeMismatch {
                expected: self.shape.1,
                found: rhs.shape.0,
            });
        }
        let mut rows = vec![];
        let mut cols = vec![];
        let mut values = vec![];
        for (r, c, v) in self.iter() {
            for idx in rhs.row_ptr[c]..rhs.row_ptr[c + 1] {
                rows.push(r);
                cols.push(rhs.col_indices[idx]);
                values.push(v * rhs.values[idx]);
            }
        }
        Self::from_triplets((self.shape.0, rhs.shape.1), &rows, &cols, &values)
    }
}

impl<T: MatrixElementType> fmt::Display for SparseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sparse matrix of shape {} × {} with {} stored entries",
            self.shape.0,
            self.shape.1,
            self.nnz()
        )
    }
}
