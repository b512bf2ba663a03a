//! Single symmetry generators.

use std::fmt;

use indexmap::IndexSet;
use log;
use serde::{Deserialize, Serialize};

use crate::errors::BasisError;
use crate::group::unityroot::UnityRoot;
use crate::permutation::SiteMap;

#[cfg(test)]
#[path = "generator_tests.rs"]
mod generator_tests;

/// A serialisable specification of one symmetry generator as supplied by a user: a raw signed
/// site map and the quantum number of the sector to be selected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetrySpec {
    /// The raw site map, where `-(i + 1)` means that the local state is moved to site `i` and
    /// inverted.
    pub map: Vec<i64>,

    /// The quantum number $`q`$ selecting the eigenvalue $`e^{2\pi i q / p}`$ of the generator,
    /// where $`p`$ is its period.
    pub q: i64,
}

impl SymmetrySpec {
    /// Constructs a symmetry specification.
    pub fn new(map: &[i64], q: i64) -> Self {
        Self {
            map: map.to_vec(),
            q,
        }
    }
}

/// A structure to manage a validated symmetry generator.
#[derive(Clone, Debug)]
pub struct SymmetryGenerator {
    /// The label of the generator (*e.g.* `kblock`).
    label: String,

    /// The signed site map of the generator.
    map: SiteMap,

    /// The quantum number, reduced modulo [`Self::period`].
    quantum_number: i64,

    /// The quantum number as supplied.
    supplied_quantum_number: i64,

    /// The smallest positive number of applications of [`Self::map`] giving the identity.
    period: usize,

    /// The cyclic group generated by [`Self::map`], starting from the identity.
    cyclic_group: IndexSet<SiteMap>,
}

impl SymmetryGenerator {
    /// Validates a raw site map and analyses the resulting generator.
    ///
    /// # Arguments
    ///
    /// * `label` - A label for the generator.
    /// * `raw_map` - The raw signed site map.
    /// * `q` - The quantum number of the generator.
    ///
    /// # Errors
    ///
    /// [`BasisError::InvalidMap`] if the decoded targets are not a permutation of the sites.
    pub fn new(label: &str, raw_map: &[i64], q: i64) -> Result<Self, BasisError> {
        let map = Self::validate(raw_map)?;
        Ok(Self::from_site_map(label, map, q))
    }

    /// Constructs a generator from an already validated site map.
    pub fn from_site_map(label: &str, map: SiteMap, q: i64) -> Self {
        let (period, cyclic_group) = Self::analyze(&map);
        if period == 1 {
            log::warn!("Identity mapping `{label}` found in the set of symmetry transformations.");
        }
        Self {
            label: label.to_string(),
            map,
            quantum_number: q.rem_euclid(period as i64),
            supplied_quantum_number: q,
            period,
            cyclic_group,
        }
    }

    /// Decodes and validates a raw signed site map.
    ///
    /// # Errors
    ///
    /// [`BasisError::InvalidMap`] if the decoded targets are not a permutation of the sites.
    pub fn validate(raw_map: &[i64]) -> Result<SiteMap, BasisError> {
        SiteMap::from_raw(raw_map)
    }

    /// Repeatedly composes `map` with itself until the identity recurs.
    ///
    /// # Returns
    ///
    /// The period of `map` and the cyclic group it generates, in order of increasing power.
    pub fn analyze(map: &SiteMap) -> (usize, IndexSet<SiteMap>) {
        let mut cyclic_group = IndexSet::new();
        let mut power = SiteMap::identity(map.n_sites());
        loop {
            cyclic_group.insert(power.clone());
            power = map * &power;
            if power.is_identity() {
                break;
            }
        }
        (cyclic_group.len(), cyclic_group)
    }

    /// The label of this generator.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The site map of this generator.
    pub fn map(&self) -> &SiteMap {
        &self.map
    }

    /// The quantum number of this generator, reduced modulo its period.
    pub fn quantum_number(&self) -> i64 {
        self.quantum_number
    }

    /// The period of this generator.
    pub fn period(&self) -> usize {
        self.period
    }

    /// The cyclic group generated by this generator.
    pub fn cyclic_group(&self) -> &IndexSet<SiteMap> {
        &self.cyclic_group
    }

    /// The eigenvalue label of this generator: $`(-1)^q`$ for period-two generators and the
    /// quantum number as supplied otherwise.
    pub fn block_value(&self) -> i64 {
        if self.period == 2 {
            if self.supplied_quantum_number.rem_euclid(2) == 0 {
                1
            } else {
                -1
            }
        } else {
            self.supplied_quantum_number
        }
    }

    /// The character $`e^{2\pi i q k / p}`$ of the `power`-th power of this generator in the
    /// selected sector.
    pub fn character(&self, power: u64) -> UnityRoot {
        UnityRoot::from_quantum_number(self.quantum_number, power, self.period as u64)
    }
}

impl fmt::Display for SymmetryGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (period {}, q = {})",
            self.label, self.map, self.period, self.quantum_number
        )
    }
}
