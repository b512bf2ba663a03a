//! Enumeration of candidate Fock states.

use rayon::prelude::*;

use crate::fock::{FockSpace, FockState};
use crate::orbit::OrbitEngine;

/// An iterator over all `n_sites`-bit integers with exactly `n_particles` set bits, in ascending
/// order, by Gosper's hack.
pub(crate) struct GosperIter {
    current: Option<FockState>,
    limit: FockState,
}

impl GosperIter {
    pub(crate) fn new(n_sites: usize, n_particles: usize) -> Self {
        let current = if n_particles > n_sites {
            None
        } else if n_particles == 0 {
            Some(0)
        } else {
            Some(FockState::MAX >> (FockState::BITS as usize - n_particles))
        };
        Self {
            current,
            limit: 1 << n_sites,
        }
    }
}

impl Iterator for GosperIter {
    type Item = FockState;

    fn next(&mut self) -> Option<Self::Item> {
        let x = self.current?;
        self.current = if x == 0 {
            None
        } else {
            let c = x & x.wrapping_neg();
            let r = x + c;
            let next = (((r ^ x) >> 2) / c) | r;
            (next < self.limit).then_some(next)
        };
        Some(x)
    }
}

/// Enumerates, in ascending order, the compatible representatives whose particle numbers per
/// species equal `particles`, or all compatible representatives if `particles` is `None`.
///
/// # Returns
///
/// The retained states and their normalisations.
pub(crate) fn enumerate_representatives(
    engine: &OrbitEngine,
    particles: Option<&[usize]>,
) -> (Vec<FockState>, Vec<u64>) {
    let space = engine.space();
    let in_sector = |s: FockState| particles.map_or(true, |p| space.particle_numbers(s) == p);
    let retained: Vec<(FockState, u64)> = match particles {
        Some(p) if use_gosper(space, p) => {
            let candidates = GosperIter::new(space.n_sites(), p[0]).collect::<Vec<_>>();
            log::debug!("{} candidate states from fixed-particle enumeration.", candidates.len());
            candidates
                .par_iter()
                .filter_map(|&s| engine.check_state(s).map(|n| (s, n)))
                .collect()
        }
        _ => (0..space.full_dim())
            .into_par_iter()
            .filter(|&s| in_sector(s))
            .filter_map(|s| engine.check_state(s).map(|n| (s, n)))
            .collect(),
    };
    retained.into_iter().unzip()
}

fn use_gosper(space: &FockSpace, particles: &[usize]) -> bool {
    space.sps() == 2 && space.species().len() == 1 && particles.len() == 1
}
