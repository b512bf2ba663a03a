//! Errors raised by the symmetry-reduction engine.

use std::error::Error;
use std::fmt;

/// An enumerated type for the errors that can arise when constructing a symmetry-reduced basis
/// or when evaluating quantities within it.
///
/// None of these errors is retried internally. [`BasisError::CapacityExceeded`] is the only one
/// that is recoverable by simply calling again with a larger estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasisError {
    /// Variant for a site map whose decoded targets do not form a permutation of the sites.
    InvalidMap(String),

    /// Variant for a symmetry specification containing more generators than can be encoded.
    TooManyGenerators {
        /// The number of generators requested.
        requested: usize,

        /// The maximum number of generators supported.
        maximum: usize,
    },

    /// Variant for a malformed symmetry-generator entry.
    BadSpec(String),

    /// Variant for an enumeration that retained more states than the declared capacity.
    CapacityExceeded {
        /// The capacity that has been exceeded.
        capacity: usize,
    },

    /// Variant for an operation that requires the basis to have been made first.
    BasisNotMade,

    /// Variant for an attempt to make a basis that has already been made.
    BasisAlreadyMade,

    /// Variant for an operator string whose length does not match the number of site indices.
    OperatorStringMismatch {
        /// The number of characters in the operator string.
        opstr_len: usize,

        /// The number of site indices.
        sites_len: usize,
    },

    /// Variant for a site index that falls outside the lattice.
    SiteOutOfRange {
        /// The offending site index.
        site: usize,

        /// The number of sites in the lattice.
        n_sites: usize,
    },

    /// Variant for operator characters outside the alphabet of the local space.
    UnrecognizedOperator(Vec<char>),

    /// Variant for an input array whose shape is incompatible with the basis.
    ShapeMismatch {
        /// The expected leading dimension.
        expected: usize,

        /// The leading dimension found.
        found: usize,
    },

    /// Variant for a complex matrix element requested in a real numeric type.
    ComplexMatrixElement,

    /// Variant for an invalid description of the lattice system itself.
    InvalidSystem(String),
}

impl fmt::Display for BasisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMap(msg) => write!(f, "Invalid site map: {msg}."),
            Self::TooManyGenerators { requested, maximum } => write!(
                f,
                "{requested} symmetry generators requested, but at most {maximum} are supported."
            ),
            Self::BadSpec(msg) => write!(f, "Bad symmetry specification: {msg}."),
            Self::CapacityExceeded { capacity } => write!(
                f,
                "More than {capacity} states found in the reduced space. Check that the symmetry \
                maps are correct or supply a larger capacity estimate."
            ),
            Self::BasisNotMade => write!(
                f,
                "This operation requires the basis to be made first. Use `make()`."
            ),
            Self::BasisAlreadyMade => write!(f, "The basis has already been made."),
            Self::OperatorStringMismatch {
                opstr_len,
                sites_len,
            } => write!(
                f,
                "Operator string of length {opstr_len} does not match {sites_len} site indices."
            ),
            Self::SiteOutOfRange { site, n_sites } => write!(
                f,
                "Site index {site} falls outside of the system of {n_sites} sites."
            ),
            Self::UnrecognizedOperator(chars) => write!(
                f,
                "Unrecognised characters {{{}}} in operator string.",
                chars
                    .iter()
                    .map(|c| format!("'{c}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::ShapeMismatch { expected, found } => write!(
                f,
                "Input of leading dimension {found} is not compatible with Ns = {expected}."
            ),
            Self::ComplexMatrixElement => write!(
                f,
                "A complex matrix element cannot be represented in a real numeric type."
            ),
            Self::InvalidSystem(msg) => write!(f, "Invalid lattice system: {msg}."),
        }
    }
}

impl Error for BasisError {}
