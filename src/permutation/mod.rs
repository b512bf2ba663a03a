//! Signed site permutations.
//!
//! A symmetry of a lattice is specified by where each site is sent, optionally combined with a
//! local inversion of the state on that site (spin inversion or particle-hole exchange).

use std::fmt;
use std::ops::Mul;

use derive_builder::Builder;
use indexmap::IndexSet;
use itertools::Itertools;
use num_traits::{Inv, Pow};
use serde::{Deserialize, Serialize};

use crate::errors::BasisError;


// ==================
// Struct definitions
// ==================

/// The image of a single site under a [`SiteMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteImage {
    /// The site onto which the local state is moved.
    pub target: usize,

    /// Whether the local state is inverted as it is moved.
    pub flip: bool,
}

impl SiteImage {
    /// Constructs a site image.
    pub fn new(target: usize, flip: bool) -> Self {
        Self { target, flip }
    }

    /// Decodes a raw signed site index, where `-(i + 1)` denotes site `i` with inversion.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            // `-(raw + 1)` cannot overflow for any negative `i64`.
            Self::new((-(raw + 1)) as usize, true)
        } else {
            Self::new(raw as usize, false)
        }
    }

    /// Encodes this image back into the raw signed convention.
    pub fn to_raw(&self) -> i64 {
        let target = self.target as i64;
        if self.flip {
            -(target + 1)
        } else {
            target
        }
    }
}

/// A structure to manage the action of a signed permutation on the sites of a lattice.
///
/// The local state on site `i` is moved onto site [`SiteImage::target`] of `images[i]`, and is
/// inverted on the way if [`SiteImage::flip`] is set.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SiteMap {
    /// The images of all sites, in site order.
    #[builder(setter(custom))]
    images: Vec<SiteImage>,
}

impl SiteMapBuilder {
    fn images(&mut self, images: &[SiteImage]) -> &mut Self {
        self.images = Some(images.to_vec());
        self
    }

    fn validate(&self) -> Result<(), String> {
        let images = self
            .images
            .as_ref()
            .ok_or_else(|| "No site images have been set".to_string())?;
        let n = images.len();
        if let Some(img) = images.iter().find(|img| img.target >= n) {
            return Err(format!(
                "target site {} lies outside of a lattice of {n} sites",
                img.target
            ));
        }
        let distinct = images.iter().map(|img| img.target).collect::<IndexSet<_>>();
        if distinct.len() != n {
            return Err("the map must be a one-to-one site mapping".to_string());
        }
        Ok(())
    }
}

impl SiteMap {
    /// Returns a builder to construct a new site map.
    fn builder() -> SiteMapBuilder {
        SiteMapBuilder::default()
    }

    /// Constructs a site map from site images.
    ///
    /// # Errors
    ///
    /// [`BasisError::InvalidMap`] if the targets are not a permutation of the sites.
    pub fn from_images(images: &[SiteImage]) -> Result<Self, BasisError> {
        Self::builder()
            .images(images)
            .build()
            .map_err(|err| BasisError::InvalidMap(err.to_string()))
    }

    /// Constructs a site map from the raw signed encoding, where `-(i + 1)` means that the
    /// state is moved onto site `i` and inverted.
    ///
    /// # Errors
    ///
    /// [`BasisError::InvalidMap`] if the decoded targets are not a permutation of the sites.
    pub fn from_raw(raw: &[i64]) -> Result<Self, BasisError> {
        Self::from_images(&raw.iter().copied().map(SiteImage::from_raw).collect_vec())
    }

    /// Constructs an unsigned site map from a plain permutation image.
    pub fn from_targets(targets: &[usize]) -> Result<Self, BasisError> {
        Self::from_images(
            &targets
                .iter()
                .map(|&target| SiteImage::new(target, false))
                .collect_vec(),
        )
    }

    /// The identity map on `n_sites` sites.
    pub fn identity(n_sites: usize) -> Self {
        Self {
            images: (0..n_sites).map(|i| SiteImage::new(i, false)).collect(),
        }
    }

    /// The number of sites on which this map acts.
    pub fn n_sites(&self) -> usize {
        self.images.len()
    }

    /// The images of all sites.
    pub fn images(&self) -> &[SiteImage] {
        &self.images
    }

    /// The raw signed encoding of this map.
    pub fn to_raw(&self) -> Vec<i64> {
        self.images.iter().map(SiteImage::to_raw).collect()
    }

    /// Returns `true` if any site is inverted by this map.
    pub fn has_flips(&self) -> bool {
        self.images.iter().any(|img| img.flip)
    }

    /// Returns `true` if this map neither moves nor inverts any site.
    pub fn is_identity(&self) -> bool {
        self.images
            .iter()
            .enumerate()
            .all(|(i, img)| img.target == i && !img.flip)
    }

    /// The smallest positive number of applications of this map that yields the identity.
    pub fn period(&self) -> usize {
        let mut power = self.clone();
        let mut period = 1;
        while !power.is_identity() {
            power = self * &power;
            period += 1;
        }
        period
    }

    /// Obtains the cycle representation of the underlying site permutation, ignoring inversions.
    ///
    /// Cycles are ordered by decreasing length, then lexicographically.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let n = self.n_sites();
        let mut remaining = (0..n).rev().collect::<IndexSet<usize>>();
        let mut cycles: Vec<Vec<usize>> = Vec::with_capacity(n);
        while let Some(start) = remaining.pop() {
            let mut cycle = vec![start];
            let mut idx = self.images[start].target;
            while idx != start {
                remaining.shift_remove(&idx);
                cycle.push(idx);
                idx = self.images[idx].target;
            }
            cycles.push(cycle);
        }
        cycles.sort_by_key(|cycle| (!cycle.len(), cycle.clone()));
        cycles
    }
}

impl fmt::Display for SiteMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cycles = self
            .cycles()
            .into_iter()
            .filter(|cycle| cycle.len() > 1)
            .map(|cycle| format!("({})", cycle.iter().join(" ")))
            .join("");
        let flips = self
            .images
            .iter()
            .enumerate()
            .filter(|(_, img)| img.flip)
            .map(|(i, _)| i)
            .collect_vec();
        match (cycles.is_empty(), flips.is_empty()) {
            (true, true) => write!(f, "E"),
            (false, true) => write!(f, "{cycles}"),
            (true, false) => write!(f, "Z[{}]", flips.iter().join(",")),
            (false, false) => write!(f, "{cycles}·Z[{}]", flips.iter().join(",")),
        }
    }
}

// ---
// Mul
// ---

// `b * a` applies `a` first. Inversions compose by parity: two flips cancel.
impl Mul<&'_ SiteMap> for &SiteMap {
    type Output = SiteMap;

    fn mul(self, rhs: &SiteMap) -> Self::Output {
        assert_eq!(
            self.n_sites(),
            rhs.n_sites(),
            "The numbers of sites of two composing site maps do not match."
        );
        SiteMap {
            images: rhs
                .images
                .iter()
                .map(|ri| {
                    let outer = self.images[ri.target];
                    SiteImage::new(outer.target, ri.flip ^ outer.flip)
                })
                .collect(),
        }
    }
}

impl Mul<&'_ SiteMap> for SiteMap {
    type Output = SiteMap;

    fn mul(self, rhs: &SiteMap) -> Self::Output {
        &self * rhs
    }
}

impl Mul<SiteMap> for SiteMap {
    type Output = SiteMap;

    fn mul(self, rhs: SiteMap) -> Self::Output {
        &self * &rhs
    }
}

impl Mul<SiteMap> for &SiteMap {
    type Output = SiteMap;

    fn mul(self, rhs: SiteMap) -> Self::Output {
        self * &rhs
    }
}

// ---
// Inv
// ---
impl Inv for &SiteMap {
    type Output = SiteMap;

    fn inv(self) -> Self::Output {
        let mut images = vec![SiteImage::new(0, false); self.n_sites()];
        self.images.iter().enumerate().for_each(|(i, img)| {
            images[img.target] = SiteImage::new(i, img.flip);
        });
        SiteMap { images }
    }
}

impl Inv for SiteMap {
    type Output = SiteMap;

    fn inv(self) -> Self::Output {
        (&self).inv()
    }
}

// ---
// Pow
// ---
impl Pow<i32> for &SiteMap {
    type Output = SiteMap;

    fn pow(self, rhs: i32) -> Self::Output {
        if rhs == 0 {
            SiteMap::identity(self.n_sites())
        } else if rhs > 0 {
            self * self.pow(rhs - 1)
        } else {
            self.pow(-rhs).inv()
        }
    }
}

impl Pow<i32> for SiteMap {
    type Output = SiteMap;

    fn pow(self, rhs: i32) -> Self::Output {
        (&self).pow(rhs)
    }
}
