use approx::assert_abs_diff_eq;
use ndarray::{array, Array1, Array2};
use num_complex::Complex;

use crate::basis::{BasisParams, SymmetryBasis, SystemParams};
use crate::errors::BasisError;
use crate::fock::LocalSpace;
use crate::operator::MatrixElementType;
use crate::projection::sparse::SparseMatrix;

type C64 = Complex<f64>;

fn make_basis(system: &SystemParams, symmetries: &[(&str, Vec<i64>, i64)]) -> SymmetryBasis {
    let mut builder = BasisParams::builder();
    for (label, map, q) in symmetries {
        builder.symmetry(label, map, *q);
    }
    let mut basis = SymmetryBasis::new(system, &builder.build().unwrap()).unwrap();
    basis.make(None).unwrap();
    basis
}

fn translation(n_sites: usize) -> Vec<i64> {
    (0..n_sites).map(|i| ((i + 1) % n_sites) as i64).collect()
}

fn adjoint<T: MatrixElementType>(a: &Array2<T>) -> Array2<T> {
    a.t().mapv(|x| x.conj())
}

fn assert_close(a: &Array2<C64>, b: &Array2<C64>) {
    assert_eq!(a.dim(), b.dim());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-12);
        assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-12);
    }
}

/// Sums hopping and interaction terms on every periodic bond.
fn hamiltonian(basis: &SymmetryBasis, terms: &[(&str, f64)]) -> Array2<C64> {
    let n = basis.n_sites();
    let ns = basis.ns().unwrap();
    let mut h = Array2::<C64>::zeros((ns, ns));
    for i in 0..n {
        for (opstr, coupling) in terms {
            h += &basis
                .apply_operator(opstr, &[i, (i + 1) % n], C64::new(*coupling, 0.0))
                .unwrap()
                .to_dense(ns);
        }
    }
    h
}

#[test]
fn test_sparse_matrix() {
    let m = SparseMatrix::from_triplets((2, 3), &[0, 1, 0, 1], &[2, 0, 2, 1], &[1.0, 2.0, 3.0, 0.0])
        .unwrap();
    assert_eq!(m.nnz(), 2);
    assert_eq!(m.get(0, 2), 4.0);
    assert_eq!(m.get(1, 1), 0.0);
    assert_eq!(m.to_dense(), array![[0.0, 0.0, 4.0], [2.0, 0.0, 0.0]]);
    let prod = m.dot_dense(&array![[1.0], [1.0], [1.0]]).unwrap();
    assert_eq!(prod, array![[4.0], [2.0]]);
    let sq = m.dot_sparse(&m.adjoint()).unwrap();
    assert_eq!(sq.to_dense(), array![[16.0, 0.0], [0.0, 4.0]]);
    assert!(matches!(
        m.dot_dense(&array![[1.0], [1.0]]),
        Err(BasisError::ShapeMismatch { expected: 3, found: 2 })
    ));
    assert!(SparseMatrix::from_triplets((2, 2), &[2], &[0], &[1.0]).is_err());
}

#[test]
fn test_projector_reflection_with_flip() {
    let system = SystemParams::builder().n_sites(2).build().unwrap();
    let basis = make_basis(&system, &[("pzblock", vec![-2, -1], 1)]);
    let p = basis.get_projector::<f64>().unwrap().to_dense();
    let s = 0.5f64.sqrt();
    // Rows are |11>, |10>, |01>, |00>.
    assert_eq!(p.dim(), (4, 1));
    assert_abs_diff_eq!(p[[0, 0]], s, epsilon = 1e-14);
    assert_abs_diff_eq!(p[[3, 0]], -s, epsilon = 1e-14);
    assert_abs_diff_eq!(p[[1, 0]], 0.0);
}

#[test]
fn test_projector_orthonormal_columns() {
    let system = SystemParams::builder().n_sites(6).build().unwrap();
    for q in 0..6 {
        for z in 0..2 {
            let basis = make_basis(
                &system,
                &[("kblock", translation(6), q), ("zblock", vec![-1, -2, -3, -4, -5, -6], z)],
            );
            let ns = basis.ns().unwrap();
            let p = basis.get_projector::<C64>().unwrap().to_dense();
            let overlap = adjoint(&p).dot(&p);
            assert_close(&overlap, &Array2::eye(ns));
        }
    }
}

#[test]
fn test_projector_reduces_full_hamiltonian_spins() {
    let system = SystemParams::builder().n_sites(6).build().unwrap();
    let terms = [("+-", 0.5), ("-+", 0.5), ("zz", 1.0)];
    let full = make_basis(&system, &[]);
    let h_full = hamiltonian(&full, &terms);
    for q in 0..6 {
        let basis = make_basis(&system, &[("kblock", translation(6), q)]);
        let p = basis.get_projector::<C64>().unwrap().to_dense();
        let h_reduced = hamiltonian(&basis, &terms);
        assert_close(&adjoint(&p).dot(&h_full).dot(&p), &h_reduced);
    }
}

#[test]
fn test_projector_reduces_full_hamiltonian_fermions() {
    let system = SystemParams::builder()
        .n_sites(5)
        .local_space(LocalSpace::Fermion)
        .build()
        .unwrap();
    let terms = [("+-", -1.0), ("-+", 1.0), ("nn", 0.3)];
    let full = make_basis(&system, &[]);
    let h_full = hamiltonian(&full, &terms);
    for q in 0..5 {
        let basis = make_basis(&system, &[("kblock", translation(5), q)]);
        let p = basis.get_projector::<C64>().unwrap().to_dense();
        let h_reduced = hamiltonian(&basis, &terms);
        assert_close(&adjoint(&p).dot(&h_full).dot(&p), &h_reduced);
    }
}

#[test]
fn test_get_vec() {
    let system = SystemParams::builder().n_sites(4).build().unwrap();
    let basis = make_basis(&system, &[("kblock", translation(4), 1)]);
    let ns = basis.ns().unwrap();
    let v = Array2::from_shape_fn((ns, 2), |(i, c)| C64::new(i as f64 + 1.0, c as f64));
    let p = basis.get_projector::<C64>().unwrap().to_dense();
    let expected = p.dot(&v);

    let dense = basis.get_vec(&v, false).unwrap().to_dense();
    assert_close(&dense, &expected);
    let sparse = basis.get_vec(&v, true).unwrap().to_dense();
    assert_close(&sparse, &expected);

    let v1 = Array1::from_shape_fn(ns, |i| C64::new(0.0, i as f64));
    let out1 = basis.get_vec_1d(&v1).unwrap();
    assert_eq!(out1.len(), 16);
    let norm: f64 = out1.iter().map(|x| x.norm_sqr()).sum();
    let expected_norm: f64 = v1.iter().map(|x| x.norm_sqr()).sum();
    assert_abs_diff_eq!(norm, expected_norm, epsilon = 1e-12);

    assert_eq!(
        basis.get_vec(&Array2::<C64>::zeros((ns + 1, 1)), false),
        Err(BasisError::ShapeMismatch {
            expected: ns,
            found: ns + 1
        })
    );
    assert_eq!(
        basis.get_projector::<f64>(),
        Err(BasisError::ComplexMatrixElement)
    );
}

#[test]
fn test_projector_unmade() {
    let system = SystemParams::builder().n_sites(3).build().unwrap();
    let params = BasisParams::builder().build().unwrap();
    let basis = SymmetryBasis::new(&system, &params).unwrap();
    assert_eq!(
        basis.get_projector::<f64>(),
        Err(BasisError::BasisNotMade)
    );
}
