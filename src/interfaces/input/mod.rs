//! YAML input files for the `symbasis` binary.

use anyhow::{self, Context};
use serde::{Deserialize, Serialize};

use crate::basis::{BasisParams, ParticleSector, SystemParams};
use crate::drivers::basis_construction::{BasisConstructionDriver, BasisConstructionParams};
use crate::drivers::SymBasisDriver;
use crate::fock::LocalSpace;
use crate::group::generator::SymmetrySpec;
use crate::interfaces::InputHandle;
use crate::operator::terms::OperatorSpec;


/// A structure containing `symbasis` input parameters which can be serialised into and
/// deserialised from a YAML input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Input {
    /// Specification of the lattice system.
    pub system: SystemParams,

    /// Specification of the symmetry reduction.
    pub basis: BasisParams,

    /// Control parameters for basis construction.
    ///
    /// If not specified, the defaults of [`BasisConstructionParams`] are used.
    #[serde(default)]
    pub construction: BasisConstructionParams,

    /// Static operators to be evaluated in the reduced basis.
    #[serde(default)]
    pub static_operators: Vec<OperatorSpec>,

    /// Dynamic operators to be evaluated in the reduced basis.
    #[serde(default)]
    pub dynamic_operators: Vec<OperatorSpec>,
}

impl Default for Input {
    /// A periodic spin-1/2 Heisenberg ring of eight sites in the zero-momentum, zero-magnetisation,
    /// spin-flip-even sector.
    fn default() -> Self {
        let n = 8;
        let translation = (0..n).map(|i| ((i + 1) % n) as i64).collect::<Vec<_>>();
        let flip = (0..n).map(|i| -(i as i64) - 1).collect::<Vec<_>>();
        let bonds = (0..n).map(|i| vec![i, (i + 1) % n]).collect::<Vec<_>>();
        Input {
            system: SystemParams {
                n_sites: n,
                local_space: LocalSpace::Spin {
                    sps: 2,
                    pauli: false,
                },
                species: vec![],
            },
            basis: BasisParams {
                symmetries: [
                    ("T".to_string(), SymmetrySpec::new(&translation, 0)),
                    ("Z".to_string(), SymmetrySpec::new(&flip, 0)),
                ]
                .into_iter()
                .collect(),
                sector: Some(ParticleSector::fixed(&[n / 2])),
                capacity: None,
                allow_non_commuting: false,
            },
            construction: BasisConstructionParams::default(),
            static_operators: vec![
                OperatorSpec::new(
                    "zz",
                    &bonds.iter().map(|b| (1.0, b.clone())).collect::<Vec<_>>(),
                ),
                OperatorSpec::new(
                    "+-",
                    &bonds.iter().map(|b| (0.5, b.clone())).collect::<Vec<_>>(),
                ),
                OperatorSpec::new(
                    "-+",
                    &bonds.iter().map(|b| (0.5, b.clone())).collect::<Vec<_>>(),
                ),
            ],
            dynamic_operators: vec![],
        }
    }
}

impl InputHandle for Input {
    fn handle(&self) -> Result<(), anyhow::Error> {
        let mut driver = BasisConstructionDriver::builder()
            .parameters(&self.construction)
            .system(&self.system)
            .basis_params(&self.basis)
            .static_operators(&self.static_operators)
            .dynamic_operators(&self.dynamic_operators)
            .build()
            .with_context(|| "Unable to construct a basis construction driver")?;
        driver
            .run()
            .with_context(|| "Unable to execute the basis construction driver successfully")
    }
}
