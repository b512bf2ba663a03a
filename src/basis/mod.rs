//! Symmetry-reduced bases of lattice Fock spaces.

use std::fmt;

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log;
use serde::{Deserialize, Serialize};

use crate::errors::BasisError;
use crate::fock::{count_configurations, FockSpace, FockState, LocalSpace};
use crate::group::generator::SymmetrySpec;
use crate::group::SymmetryGroup;
use crate::orbit::{OrbitEngine, OrbitPoint, RepresentativeInfo};

mod enumeration;
pub mod norms;

pub use norms::Normalisations;


/// The smallest default capacity of the reduced space.
pub const MIN_CAPACITY: usize = 1000;

/// The number of states listed when a basis is displayed.
const DISPLAY_STATES: usize = 10;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// A structure containing the parameters of the lattice system.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct SystemParams {
    /// The number of lattice sites.
    pub n_sites: usize,

    /// The local space on every site.
    #[builder(default)]
    #[serde(default)]
    pub local_space: LocalSpace,

    /// The numbers of sites in each particle species, in site order. An empty vector means a
    /// single species spanning the whole lattice.
    #[builder(setter(custom), default = "vec![]")]
    #[serde(default)]
    pub species: Vec<usize>,
}

impl SystemParams {
    /// Returns a builder to construct a [`SystemParams`] structure.
    pub fn builder() -> SystemParamsBuilder {
        SystemParamsBuilder::default()
    }

    /// Constructs the Fock space described by these parameters.
    ///
    /// # Errors
    ///
    /// [`BasisError::InvalidSystem`] if the description is inconsistent.
    pub fn fock_space(&self) -> Result<FockSpace, BasisError> {
        FockSpace::new(self.n_sites, self.local_space.clone(), &self.species)
    }
}

impl SystemParamsBuilder {
    pub fn species(&mut self, species: &[usize]) -> &mut Self {
        self.species = Some(species.to_vec());
        self
    }
}

impl fmt::Display for SystemParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of sites: {}", self.n_sites)?;
        writeln!(f, "Local space: {}", self.local_space)?;
        if !self.species.is_empty() {
            writeln!(
                f,
                "Species sizes: {}",
                self.species.iter().map(|m| m.to_string()).join(", ")
            )?;
        }
        Ok(())
    }
}

/// A structure for the allowed particle-number tuples of a basis, one entry per species.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleSector {
    allowed: Vec<Vec<usize>>,
}

impl ParticleSector {
    /// A sector with a single allowed particle-number tuple.
    pub fn fixed(particles: &[usize]) -> Self {
        Self {
            allowed: vec![particles.to_vec()],
        }
    }

    /// A sector with several allowed particle-number tuples. Repeated tuples are ignored.
    pub fn multiple(tuples: &[Vec<usize>]) -> Self {
        Self {
            allowed: tuples
                .iter()
                .cloned()
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect(),
        }
    }

    /// The allowed particle-number tuples.
    pub fn allowed(&self) -> &[Vec<usize>] {
        &self.allowed
    }

    /// Returns `true` if exactly one tuple is allowed.
    pub fn is_fixed(&self) -> bool {
        self.allowed.len() == 1
    }

    /// Returns `true` if `particles` is an allowed tuple.
    pub fn contains(&self, particles: &[usize]) -> bool {
        self.allowed.iter().any(|tuple| tuple.as_slice() == particles)
    }
}

impl fmt::Display for ParticleSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.allowed
                .iter()
                .map(|tuple| format!("({})", tuple.iter().join(", ")))
                .join(" ∪ ")
        )
    }
}

/// A structure containing the parameters controlling the symmetry reduction.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct BasisParams {
    /// The symmetry generators keyed by label, in the order supplied.
    #[builder(default = "IndexMap::new()")]
    #[serde(default)]
    pub symmetries: IndexMap<String, SymmetrySpec>,

    /// The optional particle-number sector.
    #[builder(default = "None")]
    #[serde(default)]
    pub sector: Option<ParticleSector>,

    /// An optional capacity for the reduced space, overriding the default estimate.
    #[builder(default = "None")]
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Boolean indicating if non-commuting generators are to be accepted.
    #[builder(default = "false")]
    #[serde(default)]
    pub allow_non_commuting: bool,
}

impl BasisParams {
    /// Returns a builder to construct a [`BasisParams`] structure.
    pub fn builder() -> BasisParamsBuilder {
        BasisParamsBuilder::default()
    }
}

impl BasisParamsBuilder {
    /// Adds one symmetry generator.
    pub fn symmetry(&mut self, label: &str, map: &[i64], q: i64) -> &mut Self {
        self.symmetries
            .get_or_insert_with(IndexMap::new)
            .insert(label.to_string(), SymmetrySpec::new(map, q));
        self
    }
}

impl fmt::Display for BasisParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symmetries.is_empty() {
            writeln!(f, "Symmetries: none")?;
        } else {
            writeln!(f, "Symmetries:")?;
            for (label, spec) in self.symmetries.iter() {
                writeln!(
                    f,
                    "  {label}: [{}], q = {}",
                    spec.map.iter().join(", "),
                    spec.q
                )?;
            }
        }
        writeln!(
            f,
            "Particle sector: {}",
            self.sector
                .as_ref()
                .map_or_else(|| "unrestricted".to_string(), |s| s.to_string())
        )?;
        if let Some(capacity) = self.capacity {
            writeln!(f, "Capacity: {capacity}")?;
        }
        Ok(())
    }
}

// -----
// Basis
// -----

/// The enumerated content of a made basis.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BasisStates {
    /// The representatives in strictly descending order.
    states: Vec<FockState>,

    /// The normalisation factors of [`Self::states`].
    norms: Normalisations,

    /// The particle numbers per species of [`Self::states`], if a sector is tracked.
    particle_counts: Option<Vec<Vec<usize>>>,
}

/// A structure managing a symmetry-reduced basis.
///
/// A basis starts out unmade: only the symmetry group and the Fock space are known. Calling
/// [`Self::make`] enumerates the representatives once, after which all other operations act on
/// the basis read-only.
#[derive(Clone, Debug)]
pub struct SymmetryBasis {
    space: FockSpace,
    group: SymmetryGroup,
    sector: Option<ParticleSector>,
    capacity: Option<usize>,
    made: Option<BasisStates>,
}

impl SymmetryBasis {
    /// Constructs an unmade basis.
    ///
    /// # Errors
    ///
    /// * [`BasisError::InvalidSystem`] if the system is inconsistent or if the sector tuples do not
    ///   have one entry per species.
    /// * Any error from [`SymmetryGroup::build`].
    /// * [`BasisError::BadSpec`] if the generators do not commute and this is not explicitly
    ///   allowed.
    /// * [`BasisError::InvalidMap`] if a generator inverts fermionic local states.
    pub fn new(system: &SystemParams, params: &BasisParams) -> Result<Self, BasisError> {
        let space = system.fock_space()?;
        let group = SymmetryGroup::build(space.n_sites(), &params.symmetries)?;
        if !group.is_abelian() {
            if params.allow_non_commuting {
                log::warn!("Non-commuting symmetry generators accepted. The basis may be incorrect.");
            } else {
                return Err(BasisError::BadSpec(
                    "the symmetry generators do not commute".to_string(),
                ));
            }
        }
        if let Some(sector) = params.sector.as_ref() {
            if let Some(tuple) = sector
                .allowed()
                .iter()
                .find(|tuple| tuple.len() != space.species().len())
            {
                return Err(BasisError::InvalidSystem(format!(
                    "particle tuple {tuple:?} does not match {} species",
                    space.species().len()
                )));
            }
        }
        OrbitEngine::new(&space, &group)?;
        Ok(Self {
            space,
            group,
            sector: params.sector.clone(),
            capacity: params.capacity,
            made: None,
        })
    }

    /// The Fock space of this basis.
    pub fn space(&self) -> &FockSpace {
        &self.space
    }

    /// The symmetry group of this basis.
    pub fn group(&self) -> &SymmetryGroup {
        &self.group
    }

    /// The particle sector of this basis, if any.
    pub fn sector(&self) -> Option<&ParticleSector> {
        self.sector.as_ref()
    }

    /// The number of lattice sites.
    pub fn n_sites(&self) -> usize {
        self.space.n_sites()
    }

    /// The number of states per site.
    pub fn sps(&self) -> usize {
        self.space.sps()
    }

    /// The orbit engine binding the group to the Fock space.
    pub fn engine(&self) -> Result<OrbitEngine<'_>, BasisError> {
        OrbitEngine::new(&self.space, &self.group)
    }

    /// The dimension of the particle sector before symmetry reduction.
    pub fn sector_dimension(&self) -> u128 {
        match self.sector.as_ref() {
            None => u128::from(self.space.full_dim()),
            Some(sector) => sector
                .allowed()
                .iter()
                .map(|tuple| {
                    self.space
                        .species()
                        .iter()
                        .zip(tuple.iter())
                        .map(|(&m, &n)| count_configurations(m, self.space.sps(), n))
                        .fold(1u128, |acc, c| acc.saturating_mul(c))
                })
                .fold(0u128, |acc, c| acc.saturating_add(c)),
        }
    }

    /// The declared estimate of the reduced dimension: the sector dimension without symmetry,
    /// and twice the sector dimension divided by the group order otherwise.
    pub fn estimated_dimension(&self) -> usize {
        let dim = self.sector_dimension();
        let estimate = if self.group.is_trivial() {
            dim
        } else {
            dim.saturating_mul(2) / u128::from(self.group.order())
        };
        usize::try_from(estimate).unwrap_or(usize::MAX)
    }

    /// Enumerates the reduced basis.
    ///
    /// # Arguments
    ///
    /// * `capacity_estimate` - An optional capacity for the reduced space. If `None`, the
    ///   capacity from the basis parameters is used, or else the larger of
    ///   [`Self::estimated_dimension`] and [`MIN_CAPACITY`].
    ///
    /// # Returns
    ///
    /// The number of states in the reduced basis.
    ///
    /// # Errors
    ///
    /// * [`BasisError::BasisAlreadyMade`] if the basis has been made before.
    /// * [`BasisError::CapacityExceeded`] if more states than the capacity are found.
    pub fn make(&mut self, capacity_estimate: Option<usize>) -> Result<usize, BasisError> {
        if self.made.is_some() {
            return Err(BasisError::BasisAlreadyMade);
        }
        let capacity = capacity_estimate
            .or(self.capacity)
            .unwrap_or_else(|| self.estimated_dimension().max(MIN_CAPACITY));
        let engine = self.engine()?;

        log::debug!("Enumerating representative states...");
        let (states, norms) = match self.sector.as_ref() {
            None => {
                let (mut states, mut norms) = enumeration::enumerate_representatives(&engine, None);
                Self::check_capacity(states.len(), capacity)?;
                states.reverse();
                norms.reverse();
                (states, norms)
            }
            Some(sector) if sector.is_fixed() => {
                let (mut states, mut norms) =
                    enumeration::enumerate_representatives(&engine, Some(&sector.allowed()[0]));
                Self::check_capacity(states.len(), capacity)?;
                states.reverse();
                norms.reverse();
                (states, norms)
            }
            Some(sector) => {
                let mut states = vec![];
                let mut norms = vec![];
                for tuple in sector.allowed() {
                    let (sub_states, sub_norms) =
                        enumeration::enumerate_representatives(&engine, Some(tuple));
                    states.extend(sub_states);
                    norms.extend(sub_norms);
                    Self::check_capacity(states.len(), capacity)?;
                }
                let order = (0..states.len())
                    .sorted_by(|&i, &j| states[j].cmp(&states[i]))
                    .collect_vec();
                (
                    order.iter().map(|&i| states[i]).collect_vec(),
                    order.iter().map(|&i| norms[i]).collect_vec(),
                )
            }
        };
        log::debug!("Enumerating representative states... Done.");

        let particle_counts = self.sector.as_ref().map(|_| {
            states
                .iter()
                .map(|&s| self.space.particle_numbers(s))
                .collect_vec()
        });
        let norms = Normalisations::compact(norms);
        log::debug!(
            "Reduced basis: {} of {} states, {norms}.",
            states.len(),
            self.sector_dimension()
        );
        let ns = states.len();
        self.made = Some(BasisStates {
            states,
            norms,
            particle_counts,
        });
        Ok(ns)
    }

    fn check_capacity(n_states: usize, capacity: usize) -> Result<(), BasisError> {
        if n_states > capacity {
            Err(BasisError::CapacityExceeded { capacity })
        } else {
            Ok(())
        }
    }

    fn made(&self) -> Result<&BasisStates, BasisError> {
        self.made.as_ref().ok_or(BasisError::BasisNotMade)
    }

    /// Returns `true` if the basis has been made.
    pub fn is_made(&self) -> bool {
        self.made.is_some()
    }

    /// The number of states in the reduced basis.
    pub fn ns(&self) -> Result<usize, BasisError> {
        Ok(self.made()?.states.len())
    }

    /// The representatives in strictly descending order.
    pub fn states(&self) -> Result<&[FockState], BasisError> {
        Ok(&self.made()?.states)
    }

    /// The normalisation factors of the representatives.
    pub fn norms(&self) -> Result<&Normalisations, BasisError> {
        Ok(&self.made()?.norms)
    }

    /// The particle numbers per species of the representatives, if a sector is tracked.
    pub fn particle_counts(&self) -> Result<Option<&[Vec<usize>]>, BasisError> {
        Ok(self.made()?.particle_counts.as_deref())
    }

    /// The position of `state` in the reduced basis, or `None` if it is not a member.
    pub fn index(&self, state: FockState) -> Result<Option<usize>, BasisError> {
        Ok(self
            .made()?
            .states
            .binary_search_by(|probe| state.cmp(probe))
            .ok())
    }

    /// Reduces `state` to its representative.
    pub fn representative(&self, state: FockState) -> Result<RepresentativeInfo, BasisError> {
        Ok(self.engine()?.representative(state))
    }

    /// Reduces a batch of states to their representatives.
    pub fn representatives(
        &self,
        states: &[FockState],
    ) -> Result<Vec<RepresentativeInfo>, BasisError> {
        Ok(self.engine()?.representatives(states))
    }

    /// Computes the normalisations of a batch of states, with `None` for states that are not
    /// compatible representatives.
    pub fn normalisations(&self, states: &[FockState]) -> Result<Vec<Option<u64>>, BasisError> {
        Ok(self.engine()?.normalisations(states))
    }

    /// Collects the orbit of `state`.
    pub fn orbit(&self, state: FockState) -> Result<Vec<OrbitPoint>, BasisError> {
        Ok(self.engine()?.orbit(state))
    }

    /// A human-readable description of this basis.
    pub fn description(&self) -> String {
        self.to_string()
    }

    fn format_state(&self, state: FockState) -> String {
        format!("|{}>", self.space.digits(state).iter().join(" "))
    }
}

impl fmt::Display for SymmetryBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Symmetry-reduced basis for a lattice of N = {} {} sites",
            self.space.n_sites(),
            self.space.local_space()
        )?;
        if let Some(sector) = self.sector.as_ref() {
            writeln!(f, "Particle sector: {sector}")?;
        }
        if self.group.blocks().is_empty() {
            writeln!(f, "Conserved symmetries: none")?;
        } else {
            writeln!(
                f,
                "Conserved symmetries: {}",
                self.group
                    .blocks()
                    .iter()
                    .map(|(label, value)| format!("{label} = {value}"))
                    .join(", ")
            )?;
        }
        match self.made.as_ref() {
            None => writeln!(f, "Basis not yet made.")?,
            Some(made) => {
                writeln!(f, "Number of states: {}", made.states.len())?;
                let width = made.states.len().to_string().len();
                let listed = made
                    .states
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| {
                        *i < DISPLAY_STATES / 2
                            || *i + DISPLAY_STATES / 2 >= made.states.len()
                    })
                    .collect_vec();
                for (pos, &(i, &state)) in listed.iter().enumerate() {
                    if pos > 0 && listed[pos - 1].0 + 1 != i {
                        writeln!(f, "  {:>width$}", ":")?;
                    }
                    writeln!(
                        f,
                        "  {i:>width$}.  {}  {state}",
                        self.format_state(state)
                    )?;
                }
            }
        }
        write!(f, "{}", self.space.local_space().operators_description())
    }
}
