//! Compact storage of normalisation factors.

use std::fmt;

use duplicate::duplicate_item;
use serde::{Deserialize, Serialize};

/// An enumerated type for normalisation factors stored in the narrowest unsigned integer type
/// that can hold all of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalisations {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl Normalisations {
    /// Packs `norms` into the narrowest type able to hold their maximum.
    pub fn compact(norms: Vec<u64>) -> Self {
        let max = norms.iter().copied().max().unwrap_or(0);
        if max <= u64::from(u8::MAX) {
            Self::U8(norms.into_iter().map(|n| n as u8).collect())
        } else if max <= u64::from(u16::MAX) {
            Self::U16(norms.into_iter().map(|n| n as u16).collect())
        } else if max <= u64::from(u32::MAX) {
            Self::U32(norms.into_iter().map(|n| n as u32).collect())
        } else {
            Self::U64(norms)
        }
    }

    /// The number of stored factors.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
        }
    }

    /// Returns `true` if no factors are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th factor, widened to `u64`.
    pub fn get(&self, i: usize) -> Option<u64> {
        match self {
            Self::U8(v) => v.get(i).map(|&n| u64::from(n)),
            Self::U16(v) => v.get(i).map(|&n| u64::from(n)),
            Self::U32(v) => v.get(i).map(|&n| u64::from(n)),
            Self::U64(v) => v.get(i).copied(),
        }
    }

    /// All factors, widened to `u64`.
    pub fn to_vec(&self) -> Vec<u64> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// The name of the storage type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
        }
    }
}

#[duplicate_item(int_type_; [u8]; [u16]; [u32]; [u64])]
impl From<Vec<int_type_>> for Normalisations {
    fn from(norms: Vec<int_type_>) -> Self {
        Self::compact(norms.into_iter().map(u64::from).collect())
    }
}

impl fmt::Display for Normalisations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} normalisation factors ({})", self.len(), self.type_name())
    }
}
