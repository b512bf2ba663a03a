//! Orbits of Fock states under a symmetry group, and their representatives.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::BasisError;
use crate::fock::{FockSpace, FockState};
use crate::group::generator::SymmetryGenerator;
use crate::group::unityroot::UnityRoot;
use crate::group::SymmetryGroup;

#[cfg(test)]
#[path = "orbit_tests.rs"]
mod orbit_tests;

// ==================
// Struct definitions
// ==================

/// A point in the orbit of a Fock state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbitPoint {
    /// The group element, as a tuple of generator powers.
    pub element: Vec<u64>,

    /// The image of the original state under [`Self::element`].
    pub state: FockState,

    /// The sign picked up on the way, from fermionic reorderings.
    pub sign: i8,
}

/// The result of reducing a Fock state to the representative of its orbit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepresentativeInfo {
    /// The representative, *i.e.* the largest state in the orbit.
    pub representative: FockState,

    /// The sign $`\sigma`$ with which the group element maps the state onto the representative.
    pub sign: i8,

    /// The group element $`g`$ mapping the state onto the representative.
    pub element: Vec<u64>,

    /// The phase $`\sigma\, \chi^*(g)`$ relating the state to the representative.
    pub phase: UnityRoot,

    /// The number of group elements stabilising the state.
    pub norm: u64,

    /// Whether the state is compatible with the quantum numbers of the group.
    pub compatible: bool,
}

impl fmt::Display for RepresentativeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rep: {}, g: {:?}, phase: {}, n: {}, compatible: {}",
            self.representative, self.element, self.phase, self.norm, self.compatible
        )
    }
}

/// A lazy odometer over the orbit of a Fock state.
///
/// Group elements are visited with the last generator varying fastest. Generator 0 is applied
/// first, and the partial images for every prefix of generators are cached so that each step
/// costs a single map application.
pub struct OrbitIter<'a> {
    space: &'a FockSpace,
    generators: &'a [SymmetryGenerator],
    element: Vec<u64>,
    prefixes: Vec<(FockState, i8)>,
    exhausted: bool,
}

impl<'a> OrbitIter<'a> {
    fn new(space: &'a FockSpace, generators: &'a [SymmetryGenerator], state: FockState) -> Self {
        Self {
            space,
            generators,
            element: vec![0; generators.len()],
            prefixes: vec![(state, 1); generators.len() + 1],
            exhausted: false,
        }
    }
}

impl<'a> Iterator for OrbitIter<'a> {
    type Item = OrbitPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let k = self.generators.len();
        let (state, sign) = self.prefixes[k];
        let point = OrbitPoint {
            element: self.element.clone(),
            state,
            sign,
        };

        let advance = (0..k)
            .rev()
            .find(|&d| self.element[d] + 1 < self.generators[d].period() as u64);
        match advance {
            None => self.exhausted = true,
            Some(d) => {
                self.element[d] += 1;
                let (prev_state, prev_sign) = self.prefixes[d + 1];
                let (next_state, next_sign) =
                    self.space.apply_map(prev_state, self.generators[d].map());
                let next = (next_state, prev_sign * next_sign);
                self.prefixes[d + 1..].iter_mut().for_each(|p| *p = next);
                self.element[d + 1..].iter_mut().for_each(|e| *e = 0);
            }
        }
        Some(point)
    }
}

/// A structure binding a Fock space to a symmetry group acting on it.
#[derive(Clone, Copy, Debug)]
pub struct OrbitEngine<'a> {
    space: &'a FockSpace,
    group: &'a SymmetryGroup,
}

impl<'a> OrbitEngine<'a> {
    /// Binds `group` to `space`.
    ///
    /// # Errors
    ///
    /// * [`BasisError::BadSpec`] if the group acts on a different number of sites.
    /// * [`BasisError::InvalidMap`] if a generator of the group carries sign flips while the
    ///   local space is fermionic.
    pub fn new(space: &'a FockSpace, group: &'a SymmetryGroup) -> Result<Self, BasisError> {
        if group.n_sites() != space.n_sites() {
            return Err(BasisError::BadSpec(format!(
                "the symmetry group acts on {} sites, but the system has {}",
                group.n_sites(),
                space.n_sites()
            )));
        }
        if space.local_space().is_fermionic() {
            if let Some(gen) = group.generators().iter().find(|gen| gen.map().has_flips()) {
                return Err(BasisError::InvalidMap(format!(
                    "`{}` inverts local states, which is not supported for fermions",
                    gen.label()
                )));
            }
        }
        Ok(Self { space, group })
    }

    /// The Fock space of this engine.
    pub fn space(&self) -> &'a FockSpace {
        self.space
    }

    /// The symmetry group of this engine.
    pub fn group(&self) -> &'a SymmetryGroup {
        self.group
    }

    /// Returns an iterator over the orbit of `state`, one point per group element.
    pub fn orbit_iter(&self, state: FockState) -> OrbitIter<'a> {
        OrbitIter::new(self.space, self.group.generators(), state)
    }

    /// Collects the orbit of `state`, one point per group element.
    pub fn orbit(&self, state: FockState) -> Vec<OrbitPoint> {
        self.orbit_iter(state).collect()
    }

    /// Checks whether a point that stabilises its original state does so with the character
    /// prescribed by the quantum numbers.
    fn stabiliser_is_compatible(&self, point: &OrbitPoint) -> bool {
        UnityRoot::from_sign(point.sign) == self.group.character(&point.element)
    }

    /// Reduces `state` to the representative of its orbit.
    ///
    /// The representative is the largest state in the orbit. If several group elements reach it,
    /// the first one in odometer order is reported.
    pub fn representative(&self, state: FockState) -> RepresentativeInfo {
        let mut best = OrbitPoint {
            element: vec![0; self.group.generators().len()],
            state,
            sign: 1,
        };
        let mut norm = 0;
        let mut compatible = true;
        for point in self.orbit_iter(state) {
            if point.state == state {
                norm += 1;
                compatible = compatible && self.stabiliser_is_compatible(&point);
            }
            if point.state > best.state {
                best = point;
            }
        }
        let phase =
            UnityRoot::from_sign(best.sign) * self.group.character(&best.element).complex_conjugate();
        RepresentativeInfo {
            representative: best.state,
            sign: best.sign,
            element: best.element,
            phase,
            norm,
            compatible,
        }
    }

    /// Checks whether `state` is a compatible representative.
    ///
    /// # Returns
    ///
    /// `None` if some group element maps `state` above itself or if `state` is incompatible with
    /// the quantum numbers, and the number of stabilising group elements otherwise.
    pub fn check_state(&self, state: FockState) -> Option<u64> {
        let mut norm = 0;
        for point in self.orbit_iter(state) {
            if point.state > state {
                return None;
            }
            if point.state == state {
                if !self.stabiliser_is_compatible(&point) {
                    return None;
                }
                norm += 1;
            }
        }
        Some(norm)
    }

    /// Reduces a batch of states to their representatives, in parallel.
    pub fn representatives(&self, states: &[FockState]) -> Vec<RepresentativeInfo> {
        states
            .par_iter()
            .map(|&state| self.representative(state))
            .collect()
    }

    /// Computes the normalisations of a batch of states, in parallel.
    ///
    /// Entries are `None` for states that are not compatible representatives.
    pub fn normalisations(&self, states: &[FockState]) -> Vec<Option<u64>> {
        states
            .par_iter()
            .map(|&state| self.check_state(state))
            .collect()
    }
}
