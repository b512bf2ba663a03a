//! Projection between a symmetry-reduced basis and the full configuration space.

use indexmap::IndexMap;
use ndarray::{Array1, Array2, Axis};
use num_complex::Complex;
use rayon::prelude::*;

use crate::basis::SymmetryBasis;
use crate::errors::BasisError;
use crate::operator::MatrixElementType;

pub mod sparse;

use sparse::SparseMatrix;

#[cfg(test)]
#[path = "projection_tests.rs"]
mod projection_tests;

/// Vectors lifted from a reduced basis to the full configuration space.
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectedVectors<T> {
    Dense(Array2<T>),
    Sparse(SparseMatrix<T>),
}

impl<T: MatrixElementType> ProjectedVectors<T> {
    /// Converts to a dense array.
    pub fn to_dense(&self) -> Array2<T> {
        match self {
            Self::Dense(arr) => arr.clone(),
            Self::Sparse(mat) => mat.to_dense(),
        }
    }
}

impl SymmetryBasis {
    /// The dimension of the full configuration space as an index type.
    fn full_dim_usize(&self) -> Result<usize, BasisError> {
        usize::try_from(self.space().full_dim()).map_err(|_| {
            BasisError::InvalidSystem(format!(
                "the full space of dimension {} cannot be indexed",
                self.space().full_dim()
            ))
        })
    }

    /// Expands every basis state into the full configuration space.
    ///
    /// Column $`j`$ holds $`|r_j\rangle = (n_j G)^{-1/2} \sum_g \sigma_g \chi^*(g)\, U(g) |r_j\rangle`$
    /// with full-space rows ordered by descending configuration.
    ///
    /// # Returns
    ///
    /// For each basis state, the full-space row indices and values of its column.
    fn projector_columns(&self) -> Result<Vec<Vec<(usize, Complex<f64>)>>, BasisError> {
        let states = self.states()?;
        let norms = self.norms()?;
        let engine = self.engine()?;
        let group = self.group();
        let space = self.space();
        let order = group.order() as f64;

        log::debug!("Constructing projector columns...");
        let columns = states
            .par_iter()
            .enumerate()
            .map(|(j, &rep)| {
                let scale = 1.0 / (norms.get(j).unwrap_or(1) as f64 * order).sqrt();
                let mut entries = IndexMap::<usize, Complex<f64>>::new();
                for point in engine.orbit_iter(rep) {
                    let value = group.character(&point.element).complex_conjugate().complex_value()
                        * f64::from(point.sign)
                        * scale;
                    *entries
                        .entry(space.full_index(point.state) as usize)
                        .or_insert(Complex::new(0.0, 0.0)) += value;
                }
                entries.into_iter().collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        log::debug!("Constructing projector columns... Done.");
        Ok(columns)
    }

    /// Constructs the projector from the reduced basis to the full configuration space.
    ///
    /// The projector has shape $`(\text{sps}^N, N_s)`$; its columns are the basis states expanded
    /// in the full space listed in descending order.
    ///
    /// # Errors
    ///
    /// * [`BasisError::BasisNotMade`] if the basis has not been made.
    /// * [`BasisError::ComplexMatrixElement`] if `T` is real and an entry is complex.
    pub fn get_projector<T: MatrixElementType>(&self) -> Result<SparseMatrix<T>, BasisError> {
        let full_dim = self.full_dim_usize()?;
        let columns = self.projector_columns()?;
        let mut rows = vec![];
        let mut cols = vec![];
        let mut values = vec![];
        for (j, column) in columns.into_iter().enumerate() {
            for (row, value) in column {
                rows.push(row);
                cols.push(j);
                values.push(T::from_complex(value)?);
            }
        }
        SparseMatrix::from_triplets((full_dim, self.ns()?), &rows, &cols, &values)
    }

    /// Lifts vectors from the reduced basis to the full configuration space.
    ///
    /// # Arguments
    ///
    /// * `v` - The vectors in the reduced basis, one per column.
    /// * `sparse` - If `true`, the result is formed as a sparse product of the projector with
    ///   `v`. Otherwise it is accumulated into a dense array.
    ///
    /// # Errors
    ///
    /// * [`BasisError::BasisNotMade`] if the basis has not been made.
    /// * [`BasisError::ShapeMismatch`] if `v` does not have one row per basis state.
    /// * [`BasisError::ComplexMatrixElement`] if `T` is real and a projector entry is complex.
    pub fn get_vec<T: MatrixElementType>(
        &self,
        v: &Array2<T>,
        sparse: bool,
    ) -> Result<ProjectedVectors<T>, BasisError> {
        let ns = self.ns()?;
        if v.nrows() != ns {
            return Err(BasisError::ShapeMismatch {
                expected: ns,
                found: v.nrows(),
            });
        }
        if sparse {
            let projector = self.get_projector::<T>()?;
            let (rows, cols, values) = v
                .indexed_iter()
                .filter(|(_, x)| !x.is_zero())
                .fold(
                    (vec![], vec![], vec![]),
                    |(mut rs, mut cs, mut vs), ((r, c), &x)| {
                        rs.push(r);
                        cs.push(c);
                        vs.push(x);
                        (rs, cs, vs)
                    },
                );
            let v_sparse = SparseMatrix::from_triplets(v.dim(), &rows, &cols, &values)?;
            Ok(ProjectedVectors::Sparse(projector.dot_sparse(&v_sparse)?))
        } else {
            let mut out = Array2::<T>::zeros((self.full_dim_usize()?, v.ncols()));
            for (j, column) in self.projector_columns()?.into_iter().enumerate() {
                for (row, value) in column {
                    let value = T::from_complex(value)?;
                    for c in 0..v.ncols() {
                        out[[row, c]] += value * v[[j, c]];
                    }
                }
            }
            Ok(ProjectedVectors::Dense(out))
        }
    }

    /// Lifts a single vector from the reduced basis to the full configuration space.
    ///
    /// # Errors
    ///
    /// As for [`Self::get_vec`].
    pub fn get_vec_1d<T: MatrixElementType>(&self, v: &Array1<T>) -> Result<Array1<T>, BasisError> {
        let v2 = v.clone().insert_axis(Axis(1));
        let out = self.get_vec(&v2, false)?.to_dense();
        Ok(out.index_axis_move(Axis(1), 0))
    }
}
