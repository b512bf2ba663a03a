use approx::assert_abs_diff_eq;
use itertools::Itertools;
use ndarray::Array2;
use num_complex::Complex;

use symbasis::basis::{BasisParams, ParticleSector, SymmetryBasis, SystemParams};
use symbasis::drivers::basis_construction::{BasisConstructionDriver, BasisConstructionParams};
use symbasis::drivers::SymBasisDriver;
use symbasis::fock::LocalSpace;
use symbasis::interfaces::input::Input;
use symbasis::interfaces::InputHandle;
use symbasis::io::read_symbasis_yaml;
use symbasis::operator::terms::OperatorSpec;

const ROOT: &str = env!("CARGO_MANIFEST_DIR");

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn heisenberg(n: usize) -> Vec<OperatorSpec> {
    let bonds = (0..n).map(|i| (i, (i + 1) % n)).collect_vec();
    let couplings = |j: f64| bonds.iter().map(|&(a, b)| (j, vec![a, b])).collect_vec();
    vec![
        OperatorSpec::new("zz", &couplings(1.0)),
        OperatorSpec::new("+-", &couplings(0.5)),
        OperatorSpec::new("-+", &couplings(0.5)),
    ]
}

fn momentum_basis(n: usize, q: i64) -> SymmetryBasis {
    let system = SystemParams::builder()
        .n_sites(n)
        .local_space(LocalSpace::Spin {
            sps: 2,
            pauli: false,
        })
        .build()
        .unwrap();
    let t = (0..n).map(|i| ((i + 1) % n) as i64).collect_vec();
    let params = BasisParams::builder()
        .symmetry("T", &t, q)
        .sector(Some(ParticleSector::fixed(&[n / 2])))
        .build()
        .unwrap();
    let mut basis = SymmetryBasis::new(&system, &params).unwrap();
    basis.make(None).unwrap();
    basis
}

fn full_sector_basis(n: usize) -> SymmetryBasis {
    let system = SystemParams::builder()
        .n_sites(n)
        .local_space(LocalSpace::Spin {
            sps: 2,
            pauli: false,
        })
        .build()
        .unwrap();
    let params = BasisParams::builder()
        .sector(Some(ParticleSector::fixed(&[n / 2])))
        .build()
        .unwrap();
    let mut basis = SymmetryBasis::new(&system, &params).unwrap();
    basis.make(None).unwrap();
    basis
}

/// Assembles the reduced Hamiltonian of a Heisenberg ring as a dense matrix.
fn reduced_hamiltonian(basis: &SymmetryBasis, n: usize) -> Array2<Complex<f64>> {
    let ns = basis.ns().unwrap();
    let (terms, _) = basis
        .operator_terms(&basis.default_sorter(), &heisenberg(n), &[])
        .unwrap();
    terms
        .iter()
        .map(|term| {
            basis
                .apply_operator(&term.opstr, &term.sites, term.coupling)
                .unwrap()
                .to_dense(ns)
        })
        .fold(Array2::zeros((ns, ns)), |acc, h| acc + h)
}

#[test]
fn test_integration_momentum_sectors_trace() {
    init_logger();
    // The trace of the Hamiltonian is basis independent, so the traces over all momentum
    // sectors add up to the trace in the full zero-magnetisation sector.
    let n = 8;
    let mut dims = 0;
    let mut trace = 0.0;
    for q in 0..n as i64 {
        let basis = momentum_basis(n, q);
        dims += basis.ns().unwrap();
        let h = reduced_hamiltonian(&basis, n);
        assert_abs_diff_eq!(
            (&h - &h.t().mapv(|v| v.conj()))
                .iter()
                .map(|v| v.norm())
                .fold(0.0, f64::max),
            0.0,
            epsilon = 1e-12
        );
        trace += h.diag().iter().map(|v| v.re).sum::<f64>();
    }
    assert_eq!(dims, 70);
    let full = full_sector_basis(n);
    let h_full = reduced_hamiltonian(&full, n);
    let full_trace = h_full.diag().iter().map(|v| v.re).sum::<f64>();
    assert_abs_diff_eq!(trace, full_trace, epsilon = 1e-10);
}

#[test]
fn test_integration_projected_vectors_normalised() {
    init_logger();
    let basis = momentum_basis(6, 1);
    let ns = basis.ns().unwrap();
    let projector = basis.get_projector::<Complex<f64>>().unwrap();
    assert_eq!(projector.shape(), (64, ns));

    let identity = Array2::from_shape_fn((ns, ns), |(i, j)| {
        if i == j {
            Complex::new(1.0, 0.0)
        } else {
            Complex::new(0.0, 0.0)
        }
    });
    let full = basis.get_vec(&identity, false).unwrap().to_dense();
    for j in 0..ns {
        let column_norm = full.column(j).iter().map(|v| v.norm_sqr()).sum::<f64>();
        assert_abs_diff_eq!(column_norm, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_integration_driver_and_input_agree() {
    init_logger();
    let name = format!("{ROOT}/tests/input/test_input_heisenberg_ring.yml");
    let inp = read_symbasis_yaml::<Input, _>(&name).unwrap();
    inp.handle().unwrap();

    let params = BasisConstructionParams::builder()
        .write_basis(false)
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&inp.system)
        .basis_params(&inp.basis)
        .static_operators(&inp.static_operators)
        .build()
        .unwrap();
    driver.run().unwrap();
    let res = driver.result().unwrap();
    assert_eq!(res.states.len(), 3);
    assert!(res.symmetry_violations.is_empty());
    assert_abs_diff_eq!(res.hermiticity_deviation.unwrap(), 0.0, epsilon = 1e-12);
}
