//! Local Hilbert spaces and primitive actions on Fock states.
//!
//! A Fock state is an unsigned integer whose base-`sps` digits are the local states of the
//! sites. Site `0` occupies the most significant digit, so that site `i` lives at digit position
//! `N - 1 - i`.

use std::fmt;

use itertools::Itertools;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::errors::BasisError;
use crate::permutation::SiteMap;


/// The integer type encoding Fock states.
pub type FockState = u64;

// =================
// Local state space
// =================

/// An enumerated type for the kinds of local degrees of freedom on each lattice site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalSpace {
    /// Variant for spins of magnitude $`S`$, with `sps` $`= 2S + 1`$ states per site. The local
    /// digit $`d`$ encodes the magnetisation $`m = d - S`$.
    ///
    /// The associated boolean selects Pauli matrices instead of spin operators and is only
    /// meaningful for $`S = 1/2`$.
    Spin { sps: usize, pauli: bool },

    /// Variant for bosons with at most `sps - 1` particles per site.
    Boson { sps: usize },

    /// Variant for spinless fermions. Fermionic operators carry Jordan–Wigner strings over all
    /// sites with smaller indices.
    Fermion,
}

impl Default for LocalSpace {
    fn default() -> Self {
        LocalSpace::Spin {
            sps: 2,
            pauli: false,
        }
    }
}

impl LocalSpace {
    /// The number of states per site.
    pub fn sps(&self) -> usize {
        match self {
            Self::Spin { sps, .. } | Self::Boson { sps } => *sps,
            Self::Fermion => 2,
        }
    }

    /// Returns `true` for fermionic local spaces.
    pub fn is_fermionic(&self) -> bool {
        matches!(self, Self::Fermion)
    }

    /// The characters allowed in operator strings acting on this local space.
    pub fn allowed_operators(&self) -> &'static str {
        match self {
            Self::Spin { sps: 2, .. } => "I+-zxy",
            Self::Spin { .. } => "I+-z",
            Self::Boson { .. } | Self::Fermion => "I+-nz",
        }
    }

    /// A human-readable description of the operators available for this local space.
    pub fn operators_description(&self) -> String {
        match self {
            Self::Spin { sps: 2, pauli } => {
                let (name, ops) = if *pauli {
                    ("Pauli", "σ")
                } else {
                    ("spin-1/2", "S")
                };
                format!(
                    "The following {name} operators are available:\n\
                    \tI: identity\n\
                    \t+: raising operator {ops}^+\n\
                    \t-: lowering operator {ops}^-\n\
                    \tz: {ops}^z\n\
                    \tx: {ops}^x\n\
                    \ty: {ops}^y\n"
                )
            }
            Self::Spin { sps, .. } => format!(
                "The following spin-{} operators are available:\n\
                \tI: identity\n\
                \t+: raising operator S^+\n\
                \t-: lowering operator S^-\n\
                \tz: S^z\n",
                spin_magnitude_str(*sps)
            ),
            Self::Boson { sps } => format!(
                "The following boson operators (at most {} per site) are available:\n\
                \tI: identity\n\
                \t+: creation operator b^†\n\
                \t-: annihilation operator b\n\
                \tn: number operator\n\
                \tz: shifted number operator n - {}\n",
                sps - 1,
                (*sps as f64 - 1.0) / 2.0
            ),
            Self::Fermion => "The following spinless fermion operators are available:\n\
                \tI: identity\n\
                \t+: creation operator c^†\n\
                \t-: annihilation operator c\n\
                \tn: number operator\n\
                \tz: shifted number operator n - 1/2\n"
                .to_string(),
        }
    }

    /// Acts with a single local operator on a local digit, ignoring any non-local sign.
    ///
    /// Returns the resulting digit and amplitude, or `None` if the operator annihilates the
    /// state.
    fn act(&self, op: char, digit: usize) -> Option<(usize, Complex<f64>)> {
        let sps = self.sps();
        let real = |d: usize, x: f64| Some((d, Complex::new(x, 0.0)));
        match (self, op) {
            (_, 'I') => real(digit, 1.0),
            (Self::Spin { pauli, .. }, _) => {
                let s = (sps as f64 - 1.0) / 2.0;
                let m = digit as f64 - s;
                let scale = if *pauli { 2.0 } else { 1.0 };
                match op {
                    'z' => real(digit, scale * m),
                    '+' if digit + 1 < sps => real(digit + 1, (s * (s + 1.0) - m * (m + 1.0)).sqrt()),
                    '-' if digit > 0 => real(digit - 1, (s * (s + 1.0) - m * (m - 1.0)).sqrt()),
                    'x' => real(1 - digit, 0.5 * scale),
                    // S^y = (S^+ - S^-) / 2i
                    'y' if digit == 0 => Some((1, Complex::new(0.0, -0.5 * scale))),
                    'y' => Some((0, Complex::new(0.0, 0.5 * scale))),
                    _ => None,
                }
            }
            (_, 'n') if digit == 0 => None,
            (_, 'n') => real(digit, digit as f64),
            (_, 'z') => real(digit, digit as f64 - (sps as f64 - 1.0) / 2.0),
            (_, '+') if digit + 1 < sps => real(digit + 1, ((digit + 1) as f64).sqrt()),
            (_, '-') if digit > 0 => real(digit - 1, (digit as f64).sqrt()),
            _ => None,
        }
    }
}

/// Formats the spin magnitude $`S = (\text{sps} - 1)/2`$ as an integer or a half-integer.
fn spin_magnitude_str(sps: usize) -> String {
    if sps % 2 == 1 {
        format!("{}", (sps - 1) / 2)
    } else {
        format!("{}/2", sps - 1)
    }
}

impl fmt::Display for LocalSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spin { sps, pauli } => write!(
                f,
                "spin-{}{}",
                spin_magnitude_str(*sps),
                if *pauli { " (Pauli)" } else { "" }
            ),
            Self::Boson { sps } => write!(f, "boson (sps = {sps})"),
            Self::Fermion => write!(f, "spinless fermion"),
        }
    }
}

// ==========
// Fock space
// ==========

/// A structure describing the full configuration space of a lattice and the primitive actions
/// of site maps and local operators on its Fock states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FockSpace {
    /// The number of lattice sites.
    n_sites: usize,

    /// The local space on every site.
    local_space: LocalSpace,

    /// The numbers of sites in each particle species. Species occupy contiguous blocks of sites
    /// in site order.
    species: Vec<usize>,

    /// The digit weights $`\text{sps}^{N-1-i}`$ of the sites.
    weights: Vec<FockState>,

    /// The dimension $`\text{sps}^N`$ of the full configuration space.
    full_dim: FockState,
}

impl FockSpace {
    /// Constructs a Fock space of `n_sites` sites.
    ///
    /// # Arguments
    ///
    /// * `n_sites` - The number of lattice sites.
    /// * `local_space` - The local space on each site.
    /// * `species` - The numbers of sites in each species. If empty, all sites form a single
    /// species.
    ///
    /// # Errors
    ///
    /// [`BasisError::InvalidSystem`] if the lattice is empty, the local space is degenerate, the
    /// species do not partition the sites, or the full space does not fit in a [`FockState`].
    pub fn new(
        n_sites: usize,
        local_space: LocalSpace,
        species: &[usize],
    ) -> Result<Self, BasisError> {
        if n_sites == 0 {
            return Err(BasisError::InvalidSystem(
                "a lattice must contain at least one site".to_string(),
            ));
        }
        let sps = local_space.sps();
        if sps < 2 {
            return Err(BasisError::InvalidSystem(format!(
                "at least two states per site are required, but {sps} given"
            )));
        }
        if let LocalSpace::Spin { sps, pauli: true } = local_space {
            if sps != 2 {
                return Err(BasisError::InvalidSystem(
                    "Pauli matrices are only defined for spin-1/2".to_string(),
                ));
            }
        }
        let species = if species.is_empty() {
            vec![n_sites]
        } else {
            species.to_vec()
        };
        if species.iter().any(|&m| m == 0) || species.iter().sum::<usize>() != n_sites {
            return Err(BasisError::InvalidSystem(format!(
                "species sizes {species:?} do not partition {n_sites} sites"
            )));
        }
        let full_dim = u32::try_from(n_sites)
            .ok()
            .and_then(|n| (sps as FockState).checked_pow(n))
            .ok_or_else(|| {
                BasisError::InvalidSystem(format!(
                    "{sps}^{n_sites} configurations cannot be encoded in 64-bit integers"
                ))
            })?;
        let weights = (0..n_sites)
            .map(|i| (sps as FockState).pow((n_sites - 1 - i) as u32))
            .collect_vec();
        Ok(Self {
            n_sites,
            local_space,
            species,
            weights,
            full_dim,
        })
    }

    /// The number of lattice sites.
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// The number of states per site.
    pub fn sps(&self) -> usize {
        self.local_space.sps()
    }

    /// The local space on every site.
    pub fn local_space(&self) -> &LocalSpace {
        &self.local_space
    }

    /// The numbers of sites in each species.
    pub fn species(&self) -> &[usize] {
        &self.species
    }

    /// The dimension of the full configuration space.
    pub fn full_dim(&self) -> FockState {
        self.full_dim
    }

    /// The position of `state` in the full configuration space listed in descending order.
    pub fn full_index(&self, state: FockState) -> FockState {
        self.full_dim - 1 - state
    }

    fn is_binary(&self) -> bool {
        self.sps() == 2
    }

    /// The local digit of `state` on `site`.
    pub fn digit(&self, state: FockState, site: usize) -> usize {
        if self.is_binary() {
            ((state >> (self.n_sites - 1 - site)) & 1) as usize
        } else {
            ((state / self.weights[site]) % self.sps() as FockState) as usize
        }
    }

    /// All local digits of `state` in site order.
    pub fn digits(&self, state: FockState) -> Vec<usize> {
        (0..self.n_sites).map(|i| self.digit(state, i)).collect()
    }

    /// Assembles a Fock state from local digits given in site order.
    pub fn from_digits(&self, digits: &[usize]) -> FockState {
        digits
            .iter()
            .zip(self.weights.iter())
            .map(|(&d, &w)| d as FockState * w)
            .sum()
    }

    fn replace_digit(&self, state: FockState, site: usize, old: usize, new: usize) -> FockState {
        state - old as FockState * self.weights[site] + new as FockState * self.weights[site]
    }

    /// The total particle number (sum of local digits) of `state`.
    pub fn particle_number(&self, state: FockState) -> usize {
        if self.is_binary() {
            state.count_ones() as usize
        } else {
            (0..self.n_sites).map(|i| self.digit(state, i)).sum()
        }
    }

    /// The particle numbers of `state` per species.
    pub fn particle_numbers(&self, state: FockState) -> Vec<usize> {
        let mut start = 0;
        self.species
            .iter()
            .map(|&m| {
                let count = (start..start + m).map(|i| self.digit(state, i)).sum();
                start += m;
                count
            })
            .collect()
    }

    /// Acts with a signed site map on `state`.
    ///
    /// The local state on site `i` is moved to the target site of the map, inverted on the way
    /// when the image is flagged. For fermions, the reordering of the occupied orbitals
    /// contributes a sign.
    ///
    /// # Returns
    ///
    /// The image state and its sign.
    pub fn apply_map(&self, state: FockState, map: &SiteMap) -> (FockState, i8) {
        let n = self.n_sites;
        let images = map.images();
        let image_state = if self.is_binary() {
            images
                .iter()
                .enumerate()
                .fold(0, |acc, (i, img)| {
                    let bit = ((state >> (n - 1 - i)) & 1) ^ FockState::from(img.flip);
                    acc | (bit << (n - 1 - img.target))
                })
        } else {
            let top = self.sps() - 1;
            images
                .iter()
                .enumerate()
                .map(|(i, img)| {
                    let d = self.digit(state, i);
                    let d = if img.flip { top - d } else { d };
                    d as FockState * self.weights[img.target]
                })
                .sum()
        };
        let sign = if self.local_space.is_fermionic() {
            let targets = (0..n)
                .filter(|&i| self.digit(state, i) == 1)
                .map(|i| images[i].target)
                .collect_vec();
            let inversions: usize = targets
                .iter()
                .enumerate()
                .map(|(a, ta)| targets[a + 1..].iter().filter(|tb| *tb < ta).count())
                .sum();
            if inversions % 2 == 0 {
                1
            } else {
                -1
            }
        } else {
            1
        };
        (image_state, sign)
    }

    /// The Jordan–Wigner sign of a fermionic operator acting on `site` of `state`.
    fn jordan_wigner_sign(&self, state: FockState, site: usize) -> f64 {
        let occupied_before = if self.is_binary() {
            if site == 0 {
                0
            } else {
                (state >> (self.n_sites - site)).count_ones() as usize
            }
        } else {
            (0..site).map(|j| self.digit(state, j)).sum()
        };
        if occupied_before % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Acts with an operator string on `state`.
    ///
    /// The operator string $`J\, o_0(i_0)\, o_1(i_1) \cdots`$ is applied right to left.
    ///
    /// # Returns
    ///
    /// The resulting state and its amplitude, or `None` if the string annihilates `state`.
    pub fn apply_opstr(
        &self,
        state: FockState,
        opstr: &[char],
        sites: &[usize],
        coupling: Complex<f64>,
    ) -> Option<(FockState, Complex<f64>)> {
        let fermionic = self.local_space.is_fermionic();
        opstr
            .iter()
            .zip(sites.iter())
            .rev()
            .try_fold((state, coupling), |(s, amp), (&op, &site)| {
                let d = self.digit(s, site);
                let (new_d, local_amp) = self.local_space.act(op, d)?;
                let jw = if fermionic && (op == '+' || op == '-') {
                    self.jordan_wigner_sign(s, site)
                } else {
                    1.0
                };
                let new_amp = amp * local_amp * jw;
                if new_amp.norm_sqr() == 0.0 {
                    None
                } else {
                    Some((self.replace_digit(s, site, d, new_d), new_amp))
                }
            })
    }
}

/// The number of configurations of `n_sites` sites with `sps` local states whose digits sum to
/// `count`.
pub fn count_configurations(n_sites: usize, sps: usize, count: usize) -> u128 {
    let mut ways = vec![0u128; count + 1];
    ways[0] = 1;
    for _ in 0..n_sites {
        let mut next = vec![0u128; count + 1];
        for (c, &w) in ways.iter().enumerate().filter(|&(_, &w)| w > 0) {
            for d in 0..sps.min(count - c + 1) {
                next[c + d] = next[c + d].saturating_add(w);
            }
        }
        ways = next;
    }
    ways[count]
}
