//! Matrix elements of operator strings in a symmetry-reduced basis.

use std::fmt;

use duplicate::duplicate_item;
use itertools::Itertools;
use ndarray::Array2;
use num_complex::Complex;
use num_traits::NumAssign;
use rayon::prelude::*;

use crate::basis::SymmetryBasis;
use crate::errors::BasisError;
use crate::fock::FockState;
use crate::projection::sparse::SparseMatrix;

pub mod terms;


/// The largest imaginary part tolerated when a matrix element is cast to a real type.
pub const IMAG_THRESHOLD: f64 = 1.1e-15;

// ==================
// Trait definitions
// ==================

/// A trait for numeric types in which matrix elements can be produced.
pub trait MatrixElementType:
    NumAssign + Copy + Send + Sync + fmt::Debug + fmt::Display + 'static
{
    /// Casts a complex value into this type.
    ///
    /// # Errors
    ///
    /// [`BasisError::ComplexMatrixElement`] if this type is real and `value` has an imaginary
    /// part larger than [`IMAG_THRESHOLD`].
    fn from_complex(value: Complex<f64>) -> Result<Self, BasisError>;

    /// Widens this value to a double-precision complex number.
    fn to_complex(self) -> Complex<f64>;

    /// The complex conjugate of this value.
    fn conj(self) -> Self;
}

#[duplicate_item(dtype_; [f32]; [f64])]
impl MatrixElementType for dtype_ {
    fn from_complex(value: Complex<f64>) -> Result<Self, BasisError> {
        if value.im.abs() > IMAG_THRESHOLD {
            Err(BasisError::ComplexMatrixElement)
        } else {
            Ok(value.re as dtype_)
        }
    }

    fn to_complex(self) -> Complex<f64> {
        Complex::new(f64::from(self), 0.0)
    }

    fn conj(self) -> Self {
        self
    }
}

#[duplicate_item(dtype_; [f32]; [f64])]
impl MatrixElementType for Complex<dtype_> {
    fn from_complex(value: Complex<f64>) -> Result<Self, BasisError> {
        Ok(Complex::new(value.re as dtype_, value.im as dtype_))
    }

    fn to_complex(self) -> Complex<f64> {
        Complex::new(f64::from(self.re), f64::from(self.im))
    }

    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

// ==================
// Struct definitions
// ==================

/// Matrix elements of an operator in a made basis, in coordinate form.
///
/// `values[k]` is the element at row `rows[k]` (the bra) and column `cols[k]` (the ket).
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorMatrixElements<T> {
    pub values: Vec<T>,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl<T: MatrixElementType> OperatorMatrixElements<T> {
    /// The number of matrix elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no matrix elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sums the matrix elements into a dense `ns` × `ns` array.
    pub fn to_dense(&self, ns: usize) -> Array2<T> {
        let mut dense = Array2::<T>::zeros((ns, ns));
        for ((&r, &c), &v) in self.rows.iter().zip(self.cols.iter()).zip(self.values.iter()) {
            dense[[r, c]] += v;
        }
        dense
    }

    /// Sums the matrix elements into a sparse `ns` × `ns` matrix.
    ///
    /// # Errors
    ///
    /// [`BasisError::ShapeMismatch`] if an index is not smaller than `ns`.
    pub fn to_sparse(&self, ns: usize) -> Result<SparseMatrix<T>, BasisError> {
        SparseMatrix::from_triplets((ns, ns), &self.rows, &self.cols, &self.values)
    }
}

/// Matrix elements of an operator between caller-supplied kets and the bras they connect to.
#[derive(Clone, Debug, PartialEq)]
pub struct BraKetElements<T> {
    pub values: Vec<T>,
    pub bras: Vec<FockState>,
    pub kets: Vec<FockState>,
}

// =================
// Operator engine
// =================

impl SymmetryBasis {
    /// Checks an operator string against the lattice and the local space.
    ///
    /// # Errors
    ///
    /// * [`BasisError::OperatorStringMismatch`] if the numbers of operators and sites differ.
    /// * [`BasisError::SiteOutOfRange`] if a site index falls outside the lattice.
    /// * [`BasisError::UnrecognizedOperator`] if a character is not allowed for the local space.
    pub fn validate_opstr(&self, opstr: &str, sites: &[usize]) -> Result<Vec<char>, BasisError> {
        let ops = opstr.chars().collect_vec();
        if ops.len() != sites.len() {
            return Err(BasisError::OperatorStringMismatch {
                opstr_len: ops.len(),
                sites_len: sites.len(),
            });
        }
        if let Some(&site) = sites.iter().find(|&&site| site >= self.n_sites()) {
            return Err(BasisError::SiteOutOfRange {
                site,
                n_sites: self.n_sites(),
            });
        }
        let allowed = self.space().local_space().allowed_operators();
        let unrecognised = ops
            .iter()
            .filter(|op| !allowed.contains(**op))
            .unique()
            .copied()
            .collect_vec();
        if !unrecognised.is_empty() {
            return Err(BasisError::UnrecognizedOperator(unrecognised));
        }
        Ok(ops)
    }

    /// Acts with an operator string on `ket` and reduces the result.
    ///
    /// # Returns
    ///
    /// The representative reached, the element it is reached with (amplitude times phase), or
    /// `None` if the operator annihilates `ket`.
    fn reduced_action(
        &self,
        ket: FockState,
        ops: &[char],
        sites: &[usize],
        coupling: Complex<f64>,
    ) -> Result<Option<(FockState, Complex<f64>)>, BasisError> {
        let engine = self.engine()?;
        Ok(self
            .space()
            .apply_opstr(ket, ops, sites, coupling)
            .map(|(state, amplitude)| {
                let info = engine.representative(state);
                (info.representative, amplitude * info.phase.complex_value())
            }))
    }

    /// Computes the matrix elements of $`J\, o_0(i_0)\, o_1(i_1) \cdots`$ in the made basis.
    ///
    /// For each basis state $`|r_i\rangle`$ the operator string is applied, the resulting state is
    /// reduced to a representative $`r_j`$ through $`U(g)`$ with sign $`\sigma`$, and the element
    /// ```math
    ///     \langle j | O | i \rangle = A\, \sigma\, \chi^*(g) \sqrt{n_j / n_i}
    /// ```
    /// is emitted at row $`j`$ and column $`i`$. Transitions out of the basis are dropped.
    ///
    /// # Errors
    ///
    /// * [`BasisError::BasisNotMade`] if the basis has not been made.
    /// * Any error from [`Self::validate_opstr`].
    /// * [`BasisError::ComplexMatrixElement`] if `T` is real and an element is complex.
    pub fn apply_operator<T: MatrixElementType>(
        &self,
        opstr: &str,
        sites: &[usize],
        coupling: T,
    ) -> Result<OperatorMatrixElements<T>, BasisError> {
        let states = self.states()?;
        let norms = self.norms()?;
        let ops = self.validate_opstr(opstr, sites)?;
        let coupling = coupling.to_complex();

        log::debug!("Applying operator `{opstr}` on sites {sites:?}...");
        let elements = states
            .par_iter()
            .enumerate()
            .map(|(i, &ket)| {
                let Some((bra, value)) = self.reduced_action(ket, &ops, sites, coupling)? else {
                    return Ok(None);
                };
                let Some(j) = self.index(bra)? else {
                    return Ok(None);
                };
                let (n_i, n_j) = (norms.get(i), norms.get(j));
                Ok(n_i.zip(n_j).map(|(n_i, n_j)| {
                    (j, i, value * (n_j as f64 / n_i as f64).sqrt())
                }))
            })
            .collect::<Result<Vec<_>, BasisError>>()?;

        let mut values = vec![];
        let mut rows = vec![];
        let mut cols = vec![];
        for (j, i, value) in elements.into_iter().flatten() {
            values.push(T::from_complex(value)?);
            rows.push(j);
            cols.push(i);
        }
        log::debug!("Applying operator `{opstr}` on sites {sites:?}... Done.");
        Ok(OperatorMatrixElements { values, rows, cols })
    }

    /// Checks whether `state` belongs to the particle sector of this basis.
    fn in_sector(&self, state: FockState) -> bool {
        self.sector().map_or(true, |sector| {
            sector.contains(&self.space().particle_numbers(state))
        })
    }

    /// Computes matrix elements between caller-supplied kets and the bras they connect to,
    /// without requiring a made basis.
    ///
    /// Each ket is taken as a representative whose normalisation is computed on the fly. Kets
    /// or bras that are not compatible representatives of the sector give no element.
    ///
    /// # Arguments
    ///
    /// * `reduce_output` - If `true`, kets without an element are dropped. Otherwise one entry
    ///   per ket is returned, with a zero value and the ket itself as the bra when there is no
    ///   element.
    ///
    /// # Errors
    ///
    /// * Any error from [`Self::validate_opstr`].
    /// * [`BasisError::ComplexMatrixElement`] if `T` is real and an element is complex.
    pub fn apply_operator_bra_ket<T: MatrixElementType>(
        &self,
        opstr: &str,
        sites: &[usize],
        coupling: T,
        kets: &[FockState],
        reduce_output: bool,
    ) -> Result<BraKetElements<T>, BasisError> {
        let ops = self.validate_opstr(opstr, sites)?;
        let coupling = coupling.to_complex();
        let engine = self.engine()?;

        let elements = kets
            .par_iter()
            .map(|&ket| {
                if !self.in_sector(ket) {
                    return Ok(None);
                }
                let Some(n_ket) = engine.check_state(ket) else {
                    return Ok(None);
                };
                let Some((bra, value)) = self.reduced_action(ket, &ops, sites, coupling)? else {
                    return Ok(None);
                };
                if !self.in_sector(bra) {
                    return Ok(None);
                }
                Ok(engine
                    .check_state(bra)
                    .map(|n_bra| (bra, value * (n_bra as f64 / n_ket as f64).sqrt())))
            })
            .collect::<Result<Vec<_>, BasisError>>()?;

        let mut values = vec![];
        let mut bras = vec![];
        let mut out_kets = vec![];
        for (&ket, element) in kets.iter().zip(elements.into_iter()) {
            match element {
                Some((bra, value)) if value.norm_sqr() > 0.0 => {
                    values.push(T::from_complex(value)?);
                    bras.push(bra);
                    out_kets.push(ket);
                }
                _ if !reduce_output => {
                    values.push(T::zero());
                    bras.push(ket);
                    out_kets.push(ket);
                }
                _ => {}
            }
        }
        Ok(BraKetElements {
            values,
            bras,
            kets: out_kets,
        })
    }
}
