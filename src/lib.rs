//! # symbasis: symmetry-reduced many-body bases for lattice quantum systems
//!
//! `symbasis` enumerates the representative Fock states of a lattice Hilbert space that has been
//! block-diagonalised by a set of commuting lattice symmetries, and evaluates quantities in the
//! reduced space:
//! - site maps with optional local inversions (translations, reflections, spin inversion,
//!   particle-hole exchange) combined into abelian groups with chosen quantum numbers,
//! - orbits, representatives, normalisation factors and phases of Fock states,
//! - matrix elements of operator strings, either over the whole reduced basis or between
//!   caller-supplied states,
//! - projectors from the reduced basis back to the full configuration space, and
//! - consistency checks of operator lists against the symmetries of a basis
//!
//! for the following local spaces:
//! - spins of arbitrary magnitude,
//! - bosons with a truncated number of levels, and
//! - spinless fermions, possibly split into several species.
//!
//! ## Examples and usage
//!
//! For most items (structs, enums, functions, and traits), their usages are illustrated in test
//! functions.
//!
//! The `symbasis` binary reads a YAML input file describing the lattice, the symmetries, the
//! particle sector and the operators to evaluate:
//!
//! ```text
//! symbasis -c input.yml -o output.out
//! ```
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod basis;
pub mod drivers;
pub mod errors;
pub mod fock;
pub mod group;
pub mod interfaces;
pub mod io;
pub mod operator;
pub mod orbit;
pub mod permutation;
pub mod projection;
