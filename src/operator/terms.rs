//! Operator terms, their canonical ordering, and symmetry checks of operator lists.

use std::fmt;

use approx::relative_eq;
use derive_builder::Builder;
use indexmap::IndexMap;
use itertools::Itertools;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::basis::SymmetryBasis;
use crate::errors::BasisError;
use crate::permutation::SiteMap;

#[cfg(test)]
#[path = "terms_tests.rs"]
mod terms_tests;

// ==================
// Struct definitions
// ==================

/// A single operator string acting on a list of sites with a coupling.
#[derive(Clone, Debug, Builder)]
pub struct OperatorTerm {
    /// The operator characters, one per site.
    #[builder(setter(into))]
    pub opstr: String,

    /// The sites acted on.
    #[builder(setter(custom))]
    pub sites: Vec<usize>,

    /// The coupling constant.
    #[builder(default = "Complex::new(1.0, 0.0)")]
    pub coupling: Complex<f64>,
}

impl OperatorTerm {
    /// Returns a builder to construct a new operator term.
    pub fn builder() -> OperatorTermBuilder {
        OperatorTermBuilder::default()
    }

    /// Constructs an operator term with a real coupling.
    pub fn new(opstr: &str, sites: &[usize], coupling: f64) -> Self {
        Self {
            opstr: opstr.to_string(),
            sites: sites.to_vec(),
            coupling: Complex::new(coupling, 0.0),
        }
    }
}

impl OperatorTermBuilder {
    pub fn sites(&mut self, sites: &[usize]) -> &mut Self {
        self.sites = Some(sites.to_vec());
        self
    }
}

impl PartialEq for OperatorTerm {
    fn eq(&self, other: &Self) -> bool {
        self.opstr == other.opstr
            && self.sites == other.sites
            && relative_eq!(self.coupling.re, other.coupling.re, epsilon = 1e-14)
            && relative_eq!(self.coupling.im, other.coupling.im, epsilon = 1e-14)
    }
}

impl fmt::Display for OperatorTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}{:+.3}i) \"{}\" [{}]",
            self.coupling.re,
            self.coupling.im,
            self.opstr,
            self.sites.iter().join(", ")
        )
    }
}

/// A user-level specification of an operator: one operator string and a list of site couplings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    /// The operator characters.
    pub opstr: String,

    /// The site couplings.
    pub couplings: Vec<SiteCoupling>,
}

/// The coupling of an operator string to a particular list of sites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteCoupling {
    /// The coupling constant.
    pub coupling: f64,

    /// The sites acted on, one per operator character.
    pub sites: Vec<usize>,
}

impl OperatorSpec {
    /// Constructs an operator specification.
    pub fn new(opstr: &str, couplings: &[(f64, Vec<usize>)]) -> Self {
        Self {
            opstr: opstr.to_string(),
            couplings: couplings
                .iter()
                .map(|(coupling, sites)| SiteCoupling {
                    coupling: *coupling,
                    sites: sites.clone(),
                })
                .collect(),
        }
    }
}

/// The operator terms breaking one symmetry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymmetryViolations {
    /// Number operators mapped through a local inversion.
    pub odd: Vec<OperatorTerm>,

    /// Images of terms under the symmetry that are absent from the list.
    pub missing: Vec<OperatorTerm>,
}

impl SymmetryViolations {
    /// Returns `true` if no violations were found.
    pub fn is_empty(&self) -> bool {
        self.odd.is_empty() && self.missing.is_empty()
    }
}

// ==================
// Trait definitions
// ==================

/// Checks that `term` carries one site per operator character.
fn check_term_lengths(term: &OperatorTerm) -> Result<(), BasisError> {
    let opstr_len = term.opstr.chars().count();
    if opstr_len == term.sites.len() {
        Ok(())
    } else {
        Err(BasisError::OperatorStringMismatch {
            opstr_len,
            sites_len: term.sites.len(),
        })
    }
}

/// A trait to canonicalise the site ordering within an operator term.
pub trait OperatorStringSorter {
    /// Returns the canonical form of `term`.
    ///
    /// # Errors
    ///
    /// [`BasisError::OperatorStringMismatch`] if the numbers of operators and sites differ.
    fn sort_opstr(&self, term: &OperatorTerm) -> Result<OperatorTerm, BasisError>;
}

/// A trait to flatten operator specifications into lists of single terms.
pub trait LocalOperatorLists {
    /// Flattens static and dynamic specifications.
    fn local_lists(
        &self,
        static_list: &[OperatorSpec],
        dynamic_list: &[OperatorSpec],
    ) -> Result<(Vec<OperatorTerm>, Vec<OperatorTerm>), BasisError>;
}

/// Orders operator characters by increasing site index with a stable sort. For fermions, every
/// exchange of two creation or annihilation operators contributes a sign.
#[derive(Clone, Debug, Default)]
pub struct SiteOrderSorter {
    fermionic: bool,
}

impl SiteOrderSorter {
    /// Constructs a sorter.
    pub fn new(fermionic: bool) -> Self {
        Self { fermionic }
    }
}

impl OperatorStringSorter for SiteOrderSorter {
    fn sort_opstr(&self, term: &OperatorTerm) -> Result<OperatorTerm, BasisError> {
        check_term_lengths(term)?;
        let ops = term.opstr.chars().collect_vec();
        let order = (0..ops.len())
            .sorted_by_key(|&k| term.sites[k])
            .collect_vec();
        let sign = if self.fermionic {
            let anticommuting = order
                .iter()
                .filter(|&&k| ops[k] == '+' || ops[k] == '-')
                .collect_vec();
            let inversions: usize = anticommuting
                .iter()
                .enumerate()
                .map(|(a, ka)| anticommuting[a + 1..].iter().filter(|kb| *kb < ka).count())
                .sum();
            if inversions % 2 == 0 {
                1.0
            } else {
                -1.0
            }
        } else {
            1.0
        };
        Ok(OperatorTerm {
            opstr: order.iter().map(|&k| ops[k]).collect(),
            sites: order.iter().map(|&k| term.sites[k]).collect(),
            coupling: term.coupling * sign,
        })
    }
}

impl LocalOperatorLists for SiteOrderSorter {
    fn local_lists(
        &self,
        static_list: &[OperatorSpec],
        dynamic_list: &[OperatorSpec],
    ) -> Result<(Vec<OperatorTerm>, Vec<OperatorTerm>), BasisError> {
        let flatten = |specs: &[OperatorSpec]| {
            specs
                .iter()
                .flat_map(|spec| {
                    spec.couplings.iter().map(|sc| {
                        self.sort_opstr(&OperatorTerm::new(&spec.opstr, &sc.sites, sc.coupling))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };
        Ok((flatten(static_list)?, flatten(dynamic_list)?))
    }
}

// ===============
// Symmetry checks
// ===============

/// Maps `term` through `map`: sites are moved to their targets, and on inverted sites raising and
/// lowering operators are exchanged, `z` and `y` change sign, and number operators are flagged.
///
/// # Returns
///
/// The mapped term and whether it acts with a number operator on an inverted site.
///
/// # Errors
///
/// * [`BasisError::OperatorStringMismatch`] if the numbers of operators and sites differ.
/// * [`BasisError::SiteOutOfRange`] if a site is not acted on by `map`.
fn map_term(term: &OperatorTerm, map: &SiteMap) -> Result<(OperatorTerm, bool), BasisError> {
    check_term_lengths(term)?;
    let mut odd = false;
    let mut coupling = term.coupling;
    let (opstr, sites): (String, Vec<usize>) = term
        .opstr
        .chars()
        .zip(term.sites.iter())
        .map(|(op, &site)| -> Result<(char, usize), BasisError> {
            let image = *map
                .images()
                .get(site)
                .ok_or(BasisError::SiteOutOfRange {
                    site,
                    n_sites: map.n_sites(),
                })?;
            if !image.flip {
                return Ok((op, image.target));
            }
            let op = match op {
                '+' => '-',
                '-' => '+',
                'z' | 'y' => {
                    coupling = -coupling;
                    op
                }
                'n' => {
                    odd = true;
                    op
                }
                _ => op,
            };
            Ok((op, image.target))
        })
        .collect::<Result<Vec<_>, BasisError>>()?
        .into_iter()
        .unzip();
    Ok((
        OperatorTerm {
            opstr,
            sites,
            coupling,
        },
        odd,
    ))
}

/// Checks whether `terms` is mapped onto itself by `map`.
///
/// # Errors
///
/// Any error from mapping or sorting a malformed term.
pub fn check_symmetry_map<S: OperatorStringSorter>(
    map: &SiteMap,
    sorter: &S,
    terms: &[OperatorTerm],
) -> Result<SymmetryViolations, BasisError> {
    let mut violations = SymmetryViolations::default();
    for term in terms {
        let (mapped, odd) = map_term(term, map)?;
        if odd {
            violations.odd.push(term.clone());
        }
        let mapped = sorter.sort_opstr(&mapped)?;
        if !terms.contains(&mapped) {
            violations.missing.push(mapped);
        }
    }
    Ok(violations)
}

impl SymmetryBasis {
    /// The default sorter for the local space of this basis.
    pub fn default_sorter(&self) -> SiteOrderSorter {
        SiteOrderSorter::new(self.space().local_space().is_fermionic())
    }

    /// Flattens operator specifications into canonically ordered terms after checking every
    /// term against the lattice and the local space of this basis.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::validate_opstr`] or from `sorter`.
    pub fn operator_terms<S: LocalOperatorLists>(
        &self,
        sorter: &S,
        static_list: &[OperatorSpec],
        dynamic_list: &[OperatorSpec],
    ) -> Result<(Vec<OperatorTerm>, Vec<OperatorTerm>), BasisError> {
        static_list
            .iter()
            .chain(dynamic_list.iter())
            .flat_map(|spec| {
                spec.couplings
                    .iter()
                    .map(move |sc| self.validate_opstr(&spec.opstr, &sc.sites))
            })
            .collect::<Result<Vec<_>, _>>()?;
        sorter.local_lists(static_list, dynamic_list)
    }

    /// Checks a Hamiltonian specification against every symmetry generator of this basis, using
    /// the default sorter.
    ///
    /// # Returns
    ///
    /// The violations of the static and the dynamic lists, keyed by generator label. Generators
    /// without violations are omitted.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::operator_terms`].
    pub fn check_symmetry(
        &self,
        static_list: &[OperatorSpec],
        dynamic_list: &[OperatorSpec],
    ) -> Result<
        (
            IndexMap<String, SymmetryViolations>,
            IndexMap<String, SymmetryViolations>,
        ),
        BasisError,
    > {
        self.check_symmetry_with(&self.default_sorter(), static_list, dynamic_list)
    }

    /// Checks a Hamiltonian specification against every symmetry generator of this basis.
    pub fn check_symmetry_with<S: OperatorStringSorter + LocalOperatorLists>(
        &self,
        sorter: &S,
        static_list: &[OperatorSpec],
        dynamic_list: &[OperatorSpec],
    ) -> Result<
        (
            IndexMap<String, SymmetryViolations>,
            IndexMap<String, SymmetryViolations>,
        ),
        BasisError,
    > {
        let (static_terms, dynamic_terms) =
            self.operator_terms(sorter, static_list, dynamic_list)?;
        let check = |terms: &[OperatorTerm]| {
            self.group()
                .generators()
                .iter()
                .map(|gen| {
                    check_symmetry_map(gen.map(), sorter, terms)
                        .map(|violations| (gen.label().to_string(), violations))
                })
                .filter_ok(|(_, violations)| !violations.is_empty())
                .collect::<Result<IndexMap<_, _>, BasisError>>()
        };
        Ok((check(&static_terms)?, check(&dynamic_terms)?))
    }
}
