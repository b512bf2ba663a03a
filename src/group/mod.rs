//! Abelian groups generated by commuting site maps.

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use log;

use crate::errors::BasisError;
use crate::permutation::SiteMap;

pub mod generator;
pub mod unityroot;

use generator::{SymmetryGenerator, SymmetrySpec};
use unityroot::UnityRoot;


/// The maximum number of symmetry generators that can be supplied.
pub const MAX_GENERATORS: usize = 32;

// ==================
// Struct definitions
// ==================

/// An enumerated type for the non-fatal irregularities detected between symmetry generators.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupDiagnostic {
    /// Variant for a generator whose map is the identity.
    IdentityMap(String),

    /// Variant for a pair of generators whose maps do not commute.
    NonCommuting(String, String),

    /// Variant for a pair of generators that generate the same cyclic group.
    DuplicateSymmetry(String, String),

    /// Variant for a pair of generators with identical maps.
    RepeatedMap(String, String),
}

impl fmt::Display for GroupDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentityMap(label) => write!(
                f,
                "Identity mapping `{label}` found in the set of symmetry transformations."
            ),
            Self::NonCommuting(a, b) => write!(
                f,
                "Symmetries `{a}` and `{b}` do not commute. The resulting basis may be incorrect."
            ),
            Self::DuplicateSymmetry(a, b) => write!(
                f,
                "Symmetries `{a}` and `{b}` generate the same cyclic group."
            ),
            Self::RepeatedMap(a, b) => write!(f, "Symmetries `{a}` and `{b}` have identical maps."),
        }
    }
}

/// A structure to manage the Abelian group generated by a set of commuting site maps.
///
/// The generators are held in descending order of period, with generators of equal period in
/// the reverse of the order in which they were supplied. Generators with period one are dropped,
/// although their block labels are retained.
#[derive(Clone, Debug)]
pub struct SymmetryGroup {
    /// The number of lattice sites on which the generators act.
    n_sites: usize,

    /// The retained generators in descending order of period.
    generators: Vec<SymmetryGenerator>,

    /// The block labels of every supplied generator, keyed by generator label, in the order of
    /// [`Self::generators`].
    blocks: IndexMap<String, i64>,

    /// The product of the periods of the retained generators.
    order: u64,

    /// The non-fatal irregularities detected between the supplied generators.
    diagnostics: Vec<GroupDiagnostic>,
}

impl SymmetryGroup {
    /// Builds a group from a set of labelled generator specifications.
    ///
    /// # Arguments
    ///
    /// * `n_sites` - The number of lattice sites.
    /// * `specs` - The generator specifications keyed by label, in the order they were supplied.
    ///
    /// # Errors
    ///
    /// * [`BasisError::TooManyGenerators`] if more than [`MAX_GENERATORS`] specifications are
    ///   given.
    /// * [`BasisError::BadSpec`] if a map does not have one entry per site, or if the group order
    ///   cannot be represented.
    /// * [`BasisError::InvalidMap`] if a map is not a valid signed permutation.
    pub fn build(
        n_sites: usize,
        specs: &IndexMap<String, SymmetrySpec>,
    ) -> Result<Self, BasisError> {
        if specs.len() > MAX_GENERATORS {
            return Err(BasisError::TooManyGenerators {
                requested: specs.len(),
                maximum: MAX_GENERATORS,
            });
        }
        log::debug!("Analysing symmetry generators...");
        let all_generators = specs
            .iter()
            .map(|(label, spec)| {
                if spec.map.len() != n_sites {
                    Err(BasisError::BadSpec(format!(
                        "map of `{label}` has {} entries for a system of {n_sites} sites",
                        spec.map.len()
                    )))
                } else {
                    SymmetryGenerator::new(label, &spec.map, spec.q)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut diagnostics = all_generators
            .iter()
            .filter(|gen| gen.period() == 1)
            .map(|gen| GroupDiagnostic::IdentityMap(gen.label().to_string()))
            .collect_vec();
        for (gen_a, gen_b) in all_generators.iter().tuple_combinations() {
            let (a, b) = (gen_a.label().to_string(), gen_b.label().to_string());
            if gen_a.map() * gen_b.map() != gen_b.map() * gen_a.map() {
                diagnostics.push(GroupDiagnostic::NonCommuting(a.clone(), b.clone()));
            }
            if gen_a.map() == gen_b.map() {
                diagnostics.push(GroupDiagnostic::RepeatedMap(a, b));
            } else if gen_a.cyclic_group() == gen_b.cyclic_group() {
                diagnostics.push(GroupDiagnostic::DuplicateSymmetry(a, b));
            }
        }
        diagnostics
            .iter()
            .filter(|diag| !matches!(diag, GroupDiagnostic::IdentityMap(_)))
            .for_each(|diag| log::warn!("{diag}"));

        // Descending period; generators of equal period come out in reverse supplied order.
        let all_generators = all_generators
            .into_iter()
            .sorted_by_key(|gen| gen.period())
            .rev()
            .collect_vec();
        let blocks = all_generators
            .iter()
            .map(|gen| (gen.label().to_string(), gen.block_value()))
            .collect::<IndexMap<_, _>>();
        let generators = all_generators
            .into_iter()
            .filter(|gen| gen.period() > 1)
            .collect_vec();
        let order = generators
            .iter()
            .try_fold(1u64, |acc, gen| acc.checked_mul(gen.period() as u64))
            .ok_or_else(|| BasisError::BadSpec("group order overflows".to_string()))?;
        log::debug!("Analysing symmetry generators... Done.");

        Ok(Self {
            n_sites,
            generators,
            blocks,
            order,
            diagnostics,
        })
    }

    /// Constructs the trivial group on `n_sites` sites.
    pub fn trivial(n_sites: usize) -> Self {
        Self {
            n_sites,
            generators: vec![],
            blocks: IndexMap::new(),
            order: 1,
            diagnostics: vec![],
        }
    }

    /// The number of lattice sites on which this group acts.
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// The retained generators, in descending order of period.
    pub fn generators(&self) -> &[SymmetryGenerator] {
        &self.generators
    }

    /// The periods of the retained generators.
    pub fn periods(&self) -> Vec<u64> {
        self.generators
            .iter()
            .map(|gen| gen.period() as u64)
            .collect()
    }

    /// The block labels of all supplied generators.
    pub fn blocks(&self) -> &IndexMap<String, i64> {
        &self.blocks
    }

    /// The order $`G = \prod_k p_k`$ of the group, counted over generator-power tuples.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Returns `true` if the group has no retained generators.
    pub fn is_trivial(&self) -> bool {
        self.generators.is_empty()
    }

    /// The non-fatal irregularities detected during construction.
    pub fn diagnostics(&self) -> &[GroupDiagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if every pair of supplied generators commutes.
    pub fn is_abelian(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|diag| matches!(diag, GroupDiagnostic::NonCommuting(_, _)))
    }

    /// The character $`\chi(g) = \prod_k e^{2\pi i q_k g_k / p_k}`$ of a group element given as a
    /// tuple of generator powers.
    pub fn character(&self, element: &[u64]) -> UnityRoot {
        self.generators
            .iter()
            .zip(element.iter())
            .fold(UnityRoot::one(), |acc, (gen, &power)| {
                acc * gen.character(power)
            })
    }

    /// The composite site map of a group element given as a tuple of generator powers.
    ///
    /// Generator 0 is applied first.
    pub fn element_map(&self, element: &[u64]) -> SiteMap {
        self.generators.iter().zip(element.iter()).fold(
            SiteMap::identity(self.n_sites),
            |acc, (gen, &power)| {
                let gen_power = &gen.cyclic_group()[power as usize % gen.period()];
                gen_power * &acc
            },
        )
    }

    /// Returns an iterator over all generator-power tuples of this group, with the last generator
    /// varying fastest.
    pub fn elements(&self) -> GroupElementIter {
        GroupElementIter::new(self.periods())
    }
}

impl fmt::Display for SymmetryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generators.is_empty() {
            return write!(f, "Trivial group on {} sites", self.n_sites);
        }
        writeln!(
            f,
            "Group of order {} on {} sites generated by:",
            self.order, self.n_sites
        )?;
        write!(
            f,
            "{}",
            self.generators
                .iter()
                .map(|gen| format!("  {gen}"))
                .join("\n")
        )
    }
}

// ==================
// Element iteration
// ==================

/// A lazy mixed-radix iterator over generator-power tuples.
#[derive(Clone, Debug)]
pub struct GroupElementIter {
    periods: Vec<u64>,
    current: Option<Vec<u64>>,
}

impl GroupElementIter {
    /// Constructs an iterator over $`\prod_k \{0, \ldots, p_k - 1\}`$.
    pub fn new(periods: Vec<u64>) -> Self {
        let current = if periods.iter().any(|&p| p == 0) {
            None
        } else {
            Some(vec![0; periods.len()])
        };
        Self { periods, current }
    }
}

impl Iterator for GroupElementIter {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.current.clone()?;
        let mut next = item.clone();
        let mut carried = true;
        for (digit, &period) in next.iter_mut().zip(self.periods.iter()).rev() {
            *digit += 1;
            if *digit < period {
                carried = false;
                break;
            }
            *digit = 0;
        }
        self.current = if carried { None } else { Some(next) };
        Some(item)
    }
}
