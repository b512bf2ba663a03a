use num_complex::Complex;

use crate::basis::{BasisParams, SymmetryBasis, SystemParams};
use crate::errors::BasisError;
use crate::operator::terms::{
    check_symmetry_map, LocalOperatorLists, OperatorSpec, OperatorStringSorter, OperatorTerm,
    SiteOrderSorter,
};
use crate::permutation::SiteMap;

fn heisenberg(n_sites: usize, periodic: bool) -> Vec<OperatorSpec> {
    let n_bonds = if periodic { n_sites } else { n_sites - 1 };
    let bonds = (0..n_bonds)
        .map(|i| vec![i, (i + 1) % n_sites])
        .collect::<Vec<_>>();
    ["+-", "-+", "zz"]
        .iter()
        .map(|opstr| {
            let coupling = if *opstr == "zz" { 1.0 } else { 0.5 };
            OperatorSpec::new(
                opstr,
                &bonds
                    .iter()
                    .map(|bond| (coupling, bond.clone()))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

#[test]
fn test_site_order_sorter() {
    let spins = SiteOrderSorter::new(false);
    let sorted = spins.sort_opstr(&OperatorTerm::new("+-", &[2, 0], 1.0)).unwrap();
    assert_eq!(sorted, OperatorTerm::new("-+", &[0, 2], 1.0));

    let fermions = SiteOrderSorter::new(true);
    let sorted = fermions.sort_opstr(&OperatorTerm::new("+-", &[2, 0], 1.0)).unwrap();
    assert_eq!(sorted, OperatorTerm::new("-+", &[0, 2], -1.0));
    let sorted = fermions.sort_opstr(&OperatorTerm::new("n+", &[2, 0], 1.0)).unwrap();
    assert_eq!(sorted, OperatorTerm::new("+n", &[0, 2], 1.0));
    let sorted = fermions.sort_opstr(&OperatorTerm::new("+-+", &[3, 1, 0], 1.0)).unwrap();
    assert_eq!(sorted.opstr, "+-+");
    assert_eq!(sorted.sites, vec![0, 1, 3]);
    assert_eq!(sorted.coupling, Complex::new(-1.0, 0.0));
}

#[test]
fn test_local_lists() {
    let sorter = SiteOrderSorter::default();
    let (static_terms, dynamic_terms) = sorter.local_lists(&heisenberg(3, true), &[]).unwrap();
    assert_eq!(static_terms.len(), 9);
    assert!(dynamic_terms.is_empty());
    // The bond (2, 0) is reordered to (0, 2).
    assert!(static_terms.contains(&OperatorTerm::new("-+", &[0, 2], 0.5)));
}

#[test]
fn test_check_symmetry_map_flips() {
    let sorter = SiteOrderSorter::default();
    let zflip = SiteMap::from_raw(&[-1, -2]).unwrap();
    let terms = vec![
        OperatorTerm::new("+-", &[0, 1], 0.5),
        OperatorTerm::new("-+", &[0, 1], 0.5),
        OperatorTerm::new("zz", &[0, 1], 1.0),
    ];
    assert!(check_symmetry_map(&zflip, &sorter, &terms).unwrap().is_empty());

    let terms = vec![OperatorTerm::new("z", &[0], 1.0), OperatorTerm::new("n", &[1], 1.0)];
    let violations = check_symmetry_map(&zflip, &sorter, &terms).unwrap();
    assert_eq!(violations.odd, vec![OperatorTerm::new("n", &[1], 1.0)]);
    assert_eq!(
        violations.missing,
        vec![OperatorTerm::new("z", &[0], -1.0)]
    );
}

#[test]
fn test_check_symmetry_translation() {
    let system = SystemParams::builder().n_sites(4).build().unwrap();
    let params = BasisParams::builder()
        .symmetry("kblock", &[1, 2, 3, 0], 0)
        .symmetry("zblock", &[-1, -2, -3, -4], 0)
        .build()
        .unwrap();
    let basis = SymmetryBasis::new(&system, &params).unwrap();

    let (static_violations, dynamic_violations) =
        basis.check_symmetry(&heisenberg(4, true), &heisenberg(4, true)).unwrap();
    assert!(static_violations.is_empty());
    assert!(dynamic_violations.is_empty());

    let (static_violations, _) = basis.check_symmetry(&heisenberg(4, false), &[]).unwrap();
    assert_eq!(static_violations.len(), 1);
    let missing = &static_violations["kblock"].missing;
    assert_eq!(missing.len(), 3);
    assert!(missing.contains(&OperatorTerm::new("zz", &[0, 3], 1.0)));

    let field = vec![OperatorSpec::new("z", &[(1.0, vec![0]), (1.0, vec![1]), (1.0, vec![2]), (1.0, vec![3])])];
    let (static_violations, _) = basis.check_symmetry(&field, &[]).unwrap();
    assert!(!static_violations.contains_key("kblock"));
    assert_eq!(static_violations["zblock"].missing.len(), 4);
}

#[test]
fn test_operator_term_builder() {
    let term = OperatorTerm::builder()
        .opstr("zz")
        .sites(&[0, 1])
        .build()
        .unwrap();
    assert_eq!(term, OperatorTerm::new("zz", &[0, 1], 1.0));
}

#[test]
fn test_malformed_terms() {
    let sorter = SiteOrderSorter::default();
    assert!(matches!(
        sorter.sort_opstr(&OperatorTerm::new("zz", &[0], 1.0)),
        Err(BasisError::OperatorStringMismatch {
            opstr_len: 2,
            sites_len: 1
        })
    ));
    assert!(matches!(
        sorter.local_lists(&[OperatorSpec::new("+-", &[(0.5, vec![0, 1, 2])])], &[]),
        Err(BasisError::OperatorStringMismatch { .. })
    ));

    let zflip = SiteMap::from_raw(&[-1, -2]).unwrap();
    assert!(matches!(
        check_symmetry_map(&zflip, &sorter, &[OperatorTerm::new("z", &[5], 1.0)]),
        Err(BasisError::SiteOutOfRange {
            site: 5,
            n_sites: 2
        })
    ));

    let system = SystemParams::builder().n_sites(4).build().unwrap();
    let params = BasisParams::builder()
        .symmetry("kblock", &[1, 2, 3, 0], 0)
        .symmetry("zblock", &[-1, -2, -3, -4], 0)
        .build()
        .unwrap();
    let basis = SymmetryBasis::new(&system, &params).unwrap();
    assert!(matches!(
        basis.check_symmetry(&[OperatorSpec::new("zz", &[(1.0, vec![0, 9])])], &[]),
        Err(BasisError::SiteOutOfRange {
            site: 9,
            n_sites: 4
        })
    ));
    assert!(matches!(
        basis.check_symmetry(&[], &[OperatorSpec::new("zz", &[(1.0, vec![0])])]),
        Err(BasisError::OperatorStringMismatch { .. })
    ));
    assert!(matches!(
        basis.operator_terms(&sorter, &[OperatorSpec::new("zq", &[(1.0, vec![0, 1])])], &[]),
        Err(BasisError::UnrecognizedOperator(_))
    ));
}
