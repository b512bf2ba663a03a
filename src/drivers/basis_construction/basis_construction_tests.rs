use std::env;
use std::fs;

use approx::assert_abs_diff_eq;

use crate::basis::{BasisParams, ParticleSector, SystemParams};
use crate::drivers::basis_construction::{
    BasisConstructionDriver, BasisConstructionParams, BasisConstructionResult,
    OperatorElementsRecord,
};
use crate::drivers::SymBasisDriver;
use crate::errors::BasisError;
use crate::fock::LocalSpace;
use crate::io::{read_symbasis_binary, SymBasisFileType};
use crate::operator::terms::OperatorSpec;

fn spin_chain(n: usize) -> SystemParams {
    SystemParams::builder()
        .n_sites(n)
        .local_space(LocalSpace::Spin {
            sps: 2,
            pauli: false,
        })
        .build()
        .unwrap()
}

fn heisenberg(n: usize) -> Vec<OperatorSpec> {
    let bonds = (0..n).map(|i| vec![i, (i + 1) % n]).collect::<Vec<_>>();
    let zz = bonds.iter().map(|b| (1.0, b.clone())).collect::<Vec<_>>();
    let flips = bonds.iter().map(|b| (0.5, b.clone())).collect::<Vec<_>>();
    vec![
        OperatorSpec::new("zz", &zz),
        OperatorSpec::new("+-", &flips),
        OperatorSpec::new("-+", &flips),
    ]
}

fn translation_and_flip(n: usize, kblock: i64, zblock: i64) -> BasisParams {
    let t = (0..n).map(|i| ((i + 1) % n) as i64).collect::<Vec<_>>();
    let z = (0..n).map(|i| -(i as i64) - 1).collect::<Vec<_>>();
    BasisParams::builder()
        .symmetry("T", &t, kblock)
        .symmetry("Z", &z, zblock)
        .sector(Some(ParticleSector::fixed(&[n / 2])))
        .build()
        .unwrap()
}

#[test]
fn test_drivers_basis_construction_heisenberg() {
    let system = spin_chain(6);
    let basis_params = translation_and_flip(6, 0, 0);
    let operators = heisenberg(6);
    let params = BasisConstructionParams::builder()
        .write_matrix_elements(true)
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .static_operators(&operators)
        .build()
        .unwrap();
    driver.run().unwrap();
    let res = driver.result().unwrap();

    // Orbits of |111000>, |110100> ~ |101100>, and |101010>.
    assert_eq!(res.states.len(), 3);
    assert_eq!(res.norms.len(), 3);
    assert!(res.states.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(
        res.blocks,
        vec![("T".to_string(), 0), ("Z".to_string(), 1)]
    );
    assert_eq!(
        res.particle_counts.as_ref().unwrap(),
        &vec![vec![3]; 3]
    );
    assert!(res.diagnostics.is_empty());
    assert!(res.symmetry_violations.is_empty());
    assert_eq!(res.operators.len(), 18);
    assert!(res.operators.iter().all(|op| !op.dynamic));
    assert_abs_diff_eq!(res.hermiticity_deviation.unwrap(), 0.0, epsilon = 1e-12);
}

#[test]
fn test_drivers_basis_construction_symmetry_breaking_term() {
    let system = spin_chain(4);
    let basis_params = translation_and_flip(4, 0, 0);
    let static_operators = heisenberg(4);
    let dynamic_operators = vec![OperatorSpec::new("z", &[(0.3, vec![0])])];
    let params = BasisConstructionParams::builder()
        .write_basis(false)
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .static_operators(&static_operators)
        .dynamic_operators(&dynamic_operators)
        .build()
        .unwrap();
    driver.run().unwrap();
    let res = driver.result().unwrap();

    assert!(res
        .symmetry_violations
        .iter()
        .all(|v| v.starts_with("dynamic")));
    assert!(res.symmetry_violations.iter().any(|v| v.contains("`T`")));
    assert!(res.symmetry_violations.iter().any(|v| v.contains("`Z`")));
    assert_eq!(
        res.operators.iter().filter(|op| op.dynamic).count(),
        1
    );
    assert!(res.hermiticity_deviation.is_some());
}

#[test]
fn test_drivers_basis_construction_no_operators() {
    let system = SystemParams::builder()
        .n_sites(4)
        .local_space(LocalSpace::Fermion)
        .build()
        .unwrap();
    let basis_params = BasisParams::builder()
        .symmetry("T", &[1, 2, 3, 0], 0)
        .build()
        .unwrap();
    let params = BasisConstructionParams::default();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .build()
        .unwrap();
    assert!(driver.result().is_err());
    driver.run().unwrap();
    let res = driver.result().unwrap();

    assert!(!res.states.is_empty());
    assert!(res.particle_counts.is_none());
    assert!(res.operators.is_empty());
    assert!(res.hermiticity_deviation.is_none());
    assert!(res.symmetry_violations.is_empty());
}

#[test]
fn test_drivers_basis_construction_non_commuting() {
    let system = spin_chain(4);
    let basis_params = BasisParams::builder()
        .symmetry("T", &[1, 2, 3, 0], 0)
        .symmetry("P", &[3, 2, 1, 0], 0)
        .build()
        .unwrap();
    let params = BasisConstructionParams::default();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .build()
        .unwrap();
    assert!(driver.run().is_err());
    assert!(driver.result().is_err());

    let basis_params = BasisParams::builder()
        .symmetry("T", &[1, 2, 3, 0], 0)
        .symmetry("P", &[3, 2, 1, 0], 0)
        .allow_non_commuting(true)
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .build()
        .unwrap();
    driver.run().unwrap();
    assert_eq!(driver.result().unwrap().diagnostics.len(), 1);
}

#[test]
fn test_drivers_basis_construction_save_result() {
    let name = env::temp_dir()
        .join("symbasis_driver_test_save_result")
        .to_string_lossy()
        .to_string();
    let system = spin_chain(6);
    let basis_params = translation_and_flip(6, 0, 0);
    let operators = heisenberg(6);
    let params = BasisConstructionParams::builder()
        .result_save_name(Some(name.clone()))
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .static_operators(&operators)
        .build()
        .unwrap();
    driver.run().unwrap();
    let res = driver.result().unwrap();

    let read: BasisConstructionResult = read_symbasis_binary(&name, SymBasisFileType::Bas).unwrap();
    assert_eq!(read.states, res.states);
    assert_eq!(read.norms, res.norms);
    assert_eq!(read.system.n_sites, 6);

    let ops: Vec<OperatorElementsRecord> =
        read_symbasis_binary(&name, SymBasisFileType::Ops).unwrap();
    assert_eq!(ops.len(), res.operators.len());
    assert_eq!(ops[0].rows, res.operators[0].rows);

    fs::remove_file(format!("{name}.{}", SymBasisFileType::Bas.ext())).unwrap();
    fs::remove_file(format!("{name}.{}", SymBasisFileType::Ops.ext())).unwrap();
}

#[test]
fn test_drivers_basis_construction_malformed_operators() {
    let system = spin_chain(4);
    let basis_params = translation_and_flip(4, 0, 0);

    let out_of_range = vec![OperatorSpec::new("zz", &[(1.0, vec![0, 9])])];
    let params = BasisConstructionParams::builder()
        .write_basis(false)
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .static_operators(&out_of_range)
        .build()
        .unwrap();
    let err = driver.run().unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<BasisError>(),
        Some(BasisError::SiteOutOfRange {
            site: 9,
            n_sites: 4
        })
    ));
    assert!(driver.result().is_err());

    let mismatched = vec![OperatorSpec::new("zz", &[(1.0, vec![0])])];
    let params = BasisConstructionParams::builder()
        .write_basis(false)
        .check_symmetry(false)
        .build()
        .unwrap();
    let mut driver = BasisConstructionDriver::builder()
        .parameters(&params)
        .system(&system)
        .basis_params(&basis_params)
        .dynamic_operators(&mismatched)
        .build()
        .unwrap();
    let err = driver.run().unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<BasisError>(),
        Some(BasisError::OperatorStringMismatch {
            opstr_len: 2,
            sites_len: 1
        })
    ));
}
