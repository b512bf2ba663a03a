use std::collections::HashSet;

use indexmap::IndexMap;
use itertools::Itertools;
use num_complex::Complex;
use proptest::prelude::*;

use crate::errors::BasisError;
use crate::fock::{FockSpace, LocalSpace};
use crate::group::generator::SymmetrySpec;
use crate::group::unityroot::UnityRoot;
use crate::group::SymmetryGroup;
use crate::orbit::OrbitEngine;

fn group(n_sites: usize, entries: &[(&str, &[i64], i64)]) -> SymmetryGroup {
    let specs = entries
        .iter()
        .map(|(label, map, q)| (label.to_string(), SymmetrySpec::new(map, *q)))
        .collect::<IndexMap<_, _>>();
    SymmetryGroup::build(n_sites, &specs).unwrap()
}

/// Brute-force compatibility: the symmetrised vector built on `state` does not vanish.
fn symmetrised_weight(engine: &OrbitEngine, state: u64) -> f64 {
    engine
        .orbit(state)
        .iter()
        .filter(|point| point.state == state)
        .map(|point| {
            let chi = engine.group().character(&point.element).complex_value();
            chi.conj() * f64::from(point.sign)
        })
        .sum::<Complex<f64>>()
        .norm()
}

#[test]
fn test_orbit_translation_four_sites() {
    let space = FockSpace::new(4, LocalSpace::default(), &[]).unwrap();
    let mut total = 0;
    for (q, expected) in [(0, 6), (1, 3), (2, 4), (3, 3)] {
        let grp = group(4, &[("kblock", &[1, 2, 3, 0], q)]);
        let engine = OrbitEngine::new(&space, &grp).unwrap();

        let reps = (0..16u64)
            .filter(|&s| engine.check_state(s).is_some())
            .collect::<HashSet<_>>();

        // Reference: maxima of explicitly enumerated orbits that survive symmetrisation.
        let reference = (0..16u64)
            .map(|s| {
                (0..4)
                    .scan(s, |cur, _| {
                        let out = *cur;
                        *cur = ((*cur >> 1) | ((*cur & 1) << 3)) & 0b1111;
                        Some(out)
                    })
                    .max()
                    .unwrap()
            })
            .unique()
            .filter(|&r| symmetrised_weight(&engine, r) > 1e-12)
            .collect::<HashSet<_>>();

        assert_eq!(reps, reference);
        assert_eq!(reps.len(), expected);
        total += reps.len();
    }
    assert_eq!(total, 16);
}

#[test]
fn test_orbit_translation_norms() {
    let space = FockSpace::new(4, LocalSpace::default(), &[]).unwrap();
    let grp = group(4, &[("kblock", &[1, 2, 3, 0], 0)]);
    let engine = OrbitEngine::new(&space, &grp).unwrap();
    assert_eq!(engine.check_state(0b1111), Some(4));
    assert_eq!(engine.check_state(0b1010), Some(2));
    assert_eq!(engine.check_state(0b1000), Some(1));
    assert_eq!(engine.check_state(0b0101), None);
    assert_eq!(
        engine.normalisations(&[0b1010, 0b0001]),
        vec![Some(2), None]
    );

    let info = engine.representative(0b0010);
    assert_eq!(info.representative, 0b1000);
    assert_eq!(info.element, vec![2]);
    assert_eq!(info.sign, 1);
    assert_eq!(info.norm, 1);
    assert!(info.compatible);
    assert!(info.phase.is_one());
}

#[test]
fn test_orbit_translation_phase() {
    let space = FockSpace::new(4, LocalSpace::default(), &[]).unwrap();
    let grp = group(4, &[("kblock", &[1, 2, 3, 0], 1)]);
    let engine = OrbitEngine::new(&space, &grp).unwrap();
    // Site 3 is occupied; one translation moves it to site 0.
    let info = engine.representative(0b0001);
    assert_eq!(info.representative, 0b1000);
    assert_eq!(info.element, vec![1]);
    assert_eq!(info.phase, UnityRoot::new(3, 4));
    let orbit = engine.orbit(0b0001);
    assert_eq!(
        orbit.iter().map(|p| p.state).collect_vec(),
        vec![0b0001, 0b1000, 0b0100, 0b0010]
    );
}

#[test]
fn test_orbit_reflection_with_flip() {
    let space = FockSpace::new(2, LocalSpace::default(), &[]).unwrap();
    let grp = group(2, &[("pzblock", &[-2, -1], 1)]);
    assert_eq!(grp.order(), 2);
    let engine = OrbitEngine::new(&space, &grp).unwrap();

    let info = engine.representative(0b00);
    assert_eq!(info.representative, 0b11);
    assert_eq!(info.norm, 1);
    assert!(info.compatible);
    assert_eq!(info.phase, UnityRoot::from_sign(-1));

    // Self-stabilised with sign +1, but the sector demands -1.
    let info = engine.representative(0b01);
    assert_eq!(info.representative, 0b01);
    assert!(!info.compatible);

    let reps = (0..4).filter_map(|s| engine.check_state(s).map(|n| (s, n))).collect_vec();
    assert_eq!(reps, vec![(0b11, 1)]);
}

#[test]
fn test_orbit_fermion_signs() {
    let space = FockSpace::new(3, LocalSpace::Fermion, &[]).unwrap();
    let grp = group(3, &[("kblock", &[1, 2, 0], 0)]);
    let engine = OrbitEngine::new(&space, &grp).unwrap();

    let info = engine.representative(0b101);
    assert_eq!(info.representative, 0b110);
    assert_eq!(info.element, vec![1]);
    assert_eq!(info.sign, -1);
    assert_eq!(info.phase, UnityRoot::from_sign(-1));
    assert_eq!(engine.check_state(0b111), Some(3));

    let grp = group(3, &[("kblock", &[1, 2, 0], 1)]);
    let engine = OrbitEngine::new(&space, &grp).unwrap();
    assert_eq!(engine.check_state(0b111), None);
    assert_eq!(engine.check_state(0b110), Some(1));
}

#[test]
fn test_orbit_fermion_flip_rejected() {
    let space = FockSpace::new(2, LocalSpace::Fermion, &[]).unwrap();
    let grp = group(2, &[("zblock", &[-1, -2], 0)]);
    assert!(matches!(
        OrbitEngine::new(&space, &grp),
        Err(BasisError::InvalidMap(_))
    ));
}

#[test]
fn test_orbit_site_count_mismatch() {
    let space = FockSpace::new(3, LocalSpace::default(), &[]).unwrap();
    let grp = SymmetryGroup::trivial(4);
    assert!(matches!(
        OrbitEngine::new(&space, &grp),
        Err(BasisError::BadSpec(_))
    ));
}

#[test]
fn test_orbit_trivial_group() {
    let space = FockSpace::new(3, LocalSpace::default(), &[]).unwrap();
    let grp = SymmetryGroup::trivial(3);
    let engine = OrbitEngine::new(&space, &grp).unwrap();
    for s in 0..8 {
        assert_eq!(engine.check_state(s), Some(1));
        assert_eq!(engine.representative(s).representative, s);
    }
}

proptest! {
    #[test]
    fn test_orbit_representative_properties(state in 0u64..64, k in 0i64..6, z in 0i64..2) {
        let space = FockSpace::new(6, LocalSpace::default(), &[]).unwrap();
        let grp = group(
            6,
            &[("kblock", &[1, 2, 3, 4, 5, 0], k), ("zblock", &[-1, -2, -3, -4, -5, -6], z)],
        );
        let engine = OrbitEngine::new(&space, &grp).unwrap();
        let info = engine.representative(state);
        let orbit = engine.orbit(state);
        prop_assert_eq!(orbit.len() as u64, grp.order());
        prop_assert!(orbit.iter().all(|p| p.state <= info.representative));
        let orbit_size = orbit.iter().map(|p| p.state).unique().count() as u64;
        prop_assert_eq!(info.norm * orbit_size, grp.order());

        let again = engine.representative(info.representative);
        prop_assert_eq!(again.representative, info.representative);
        prop_assert!(again.phase.is_one());
        prop_assert_eq!(again.compatible, info.compatible);
        if info.compatible {
            prop_assert_eq!(engine.check_state(info.representative), Some(info.norm));
        } else {
            prop_assert_eq!(engine.check_state(info.representative), None);
        }
    }

    #[test]
    fn test_orbit_boson_representative_properties(state in 0u64..81, k in 0i64..4) {
        let space = FockSpace::new(4, LocalSpace::Boson { sps: 3 }, &[]).unwrap();
        let grp = group(4, &[("kblock", &[1, 2, 3, 0], k)]);
        let engine = OrbitEngine::new(&space, &grp).unwrap();
        let info = engine.representative(state);
        prop_assert!(engine.orbit(state).iter().all(|p| p.state <= info.representative));
        prop_assert_eq!(engine.representative(info.representative).representative, info.representative);
        prop_assert!(info.norm >= 1);
    }
}
