//! Driver for the construction of symmetry-reduced bases and the evaluation of operators in them.

use std::fmt;

use anyhow::{self, format_err, Context};
use derive_builder::Builder;
use itertools::Itertools;
use log;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::basis::{BasisParams, SymmetryBasis, SystemParams};
use crate::drivers::SymBasisDriver;
use crate::fock::FockState;
use crate::io::format::{
    log_subtitle, log_title, nice_bool, symbasis_output, symbasis_warn, write_subtitle,
    SymBasisOutput,
};
use crate::io::{write_symbasis_binary, SymBasisFileType};
use crate::operator::terms::{OperatorSpec, OperatorTerm, SymmetryViolations};
use crate::projection::sparse::SparseMatrix;

#[cfg(test)]
#[path = "basis_construction_tests.rs"]
mod basis_construction_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// A structure containing control parameters for basis construction.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct BasisConstructionParams {
    /// An optional capacity estimate for the reduced space. If given, this takes precedence over
    /// [`BasisParams::capacity`].
    #[builder(default = "None")]
    #[serde(default)]
    pub capacity_estimate: Option<usize>,

    /// Boolean indicating if the representatives are to be written to the output.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub write_basis: bool,

    /// Boolean indicating if the operator lists are to be checked against every symmetry
    /// generator.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub check_symmetry: bool,

    /// Boolean indicating if the matrix elements of every operator term are to be written to the
    /// output.
    #[builder(default = "false")]
    #[serde(default)]
    pub write_matrix_elements: bool,

    /// Optional name for saving the result as a binary file of type [`SymBasisFileType::Bas`].
    /// If operators are evaluated, their matrix elements are additionally saved in a binary file
    /// of type [`SymBasisFileType::Ops`]. If `None`, the result will not be saved.
    #[builder(default = "None")]
    #[serde(default)]
    pub result_save_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl BasisConstructionParams {
    /// Returns a builder to construct a [`BasisConstructionParams`] structure.
    pub fn builder() -> BasisConstructionParamsBuilder {
        BasisConstructionParamsBuilder::default()
    }
}

impl Default for BasisConstructionParams {
    fn default() -> Self {
        Self {
            capacity_estimate: None,
            write_basis: true,
            check_symmetry: true,
            write_matrix_elements: false,
            result_save_name: None,
        }
    }
}

impl fmt::Display for BasisConstructionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(capacity) = self.capacity_estimate {
            writeln!(f, "Capacity estimate: {capacity}")?;
        }
        writeln!(f, "Write representatives: {}", nice_bool(self.write_basis))?;
        writeln!(
            f,
            "Check operator symmetries: {}",
            nice_bool(self.check_symmetry)
        )?;
        writeln!(
            f,
            "Write matrix elements: {}",
            nice_bool(self.write_matrix_elements)
        )?;
        writeln!(
            f,
            "Save basis construction results to file: {}",
            if let Some(name) = self.result_save_name.as_ref() {
                format!("{name}.{}", SymBasisFileType::Bas.ext())
            } else {
                nice_bool(false)
            }
        )?;
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// The matrix elements of one operator term in the reduced basis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperatorElementsRecord {
    /// Boolean indicating if this term belongs to the dynamic list.
    pub dynamic: bool,

    /// The operator characters of the term after site ordering.
    pub opstr: String,

    /// The sites of the term after site ordering.
    pub sites: Vec<usize>,

    /// The real and imaginary parts of the coupling.
    pub coupling: (f64, f64),

    /// The row (bra) indices of the matrix elements.
    pub rows: Vec<usize>,

    /// The column (ket) indices of the matrix elements.
    pub cols: Vec<usize>,

    /// The real and imaginary parts of the matrix elements.
    pub values: Vec<(f64, f64)>,
}

/// A structure to contain basis construction results.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct BasisConstructionResult {
    /// The control parameters used to obtain this set of results.
    pub parameters: BasisConstructionParams,

    /// The lattice system.
    pub system: SystemParams,

    /// The symmetry-reduction parameters.
    pub basis_params: BasisParams,

    /// The conserved symmetries and their block values.
    pub blocks: Vec<(String, i64)>,

    /// The representatives in descending order.
    pub states: Vec<FockState>,

    /// The normalisation factors of the representatives.
    pub norms: Vec<u64>,

    /// The particle numbers per species of the representatives, if a sector is tracked.
    #[builder(default = "None")]
    pub particle_counts: Option<Vec<Vec<usize>>>,

    /// The diagnostics raised while building the symmetry group.
    #[builder(default = "vec![]")]
    pub diagnostics: Vec<String>,

    /// Descriptions of the operator terms that break a symmetry.
    #[builder(default = "vec![]")]
    pub symmetry_violations: Vec<String>,

    /// The matrix elements of every evaluated operator term.
    #[builder(default = "vec![]")]
    pub operators: Vec<OperatorElementsRecord>,

    /// The largest deviation from Hermiticity of the summed static operator, if any static
    /// operator has been evaluated.
    #[builder(default = "None")]
    pub hermiticity_deviation: Option<f64>,
}

impl BasisConstructionResult {
    /// Returns a builder to construct a [`BasisConstructionResult`] structure.
    fn builder() -> BasisConstructionResultBuilder {
        BasisConstructionResultBuilder::default()
    }
}

impl fmt::Display for BasisConstructionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_subtitle(f, "Basis construction summary")?;
        writeln!(f)?;
        writeln!(f, "Number of sites: {}", self.system.n_sites)?;
        writeln!(f, "Local space: {}", self.system.local_space)?;
        writeln!(
            f,
            "Block values: {}",
            if self.blocks.is_empty() {
                "--".to_string()
            } else {
                self.blocks
                    .iter()
                    .map(|(label, value)| format!("{label} = {value}"))
                    .join(", ")
            }
        )?;
        writeln!(f, "Reduced dimension: {}", self.states.len())?;
        writeln!(f, "Group diagnostics: {}", self.diagnostics.len())?;
        writeln!(
            f,
            "Symmetry-breaking operator terms: {}",
            self.symmetry_violations.len()
        )?;
        if !self.operators.is_empty() {
            writeln!(
                f,
                "Operator terms evaluated: {} ({} matrix elements)",
                self.operators.len(),
                self.operators.iter().map(|op| op.values.len()).sum::<usize>()
            )?;
        }
        if let Some(deviation) = self.hermiticity_deviation {
            writeln!(f, "Static operator Hermiticity deviation: {deviation:.3e}")?;
        }
        Ok(())
    }
}

// ------
// Driver
// ------

/// A driver for the construction of symmetry-reduced bases.
#[derive(Clone, Builder)]
pub struct BasisConstructionDriver<'a> {
    /// The control parameters for basis construction.
    parameters: &'a BasisConstructionParams,

    /// The lattice system.
    system: &'a SystemParams,

    /// The symmetry-reduction parameters.
    basis_params: &'a BasisParams,

    /// Static operator specifications to be evaluated in the reduced basis.
    #[builder(default = "&[]")]
    static_operators: &'a [OperatorSpec],

    /// Dynamic operator specifications to be evaluated in the reduced basis.
    #[builder(default = "&[]")]
    dynamic_operators: &'a [OperatorSpec],

    /// The result of the basis construction.
    #[builder(setter(skip), default = "None")]
    result: Option<BasisConstructionResult>,
}

impl<'a> BasisConstructionDriver<'a> {
    /// Returns a builder to construct a [`BasisConstructionDriver`] structure.
    pub fn builder() -> BasisConstructionDriverBuilder<'a> {
        BasisConstructionDriverBuilder::default()
    }

    /// Checks the operator lists against every symmetry generator and logs the violations.
    fn check_operator_symmetries(
        &self,
        basis: &SymmetryBasis,
    ) -> Result<Vec<String>, anyhow::Error> {
        log_subtitle("Operator symmetry check");
        symbasis_output!("");
        let (static_violations, dynamic_violations) = basis
            .check_symmetry(self.static_operators, self.dynamic_operators)
            .with_context(|| "Unable to check the operator terms against the symmetries")?;

        let describe = |kind: &str, label: &str, violations: &SymmetryViolations| {
            violations
                .missing
                .iter()
                .map(|term| format!("{kind} `{label}`: missing {term}"))
                .chain(
                    violations
                        .odd
                        .iter()
                        .map(|term| format!("{kind} `{label}`: odd {term}")),
                )
                .collect_vec()
        };
        let descriptions = static_violations
            .iter()
            .flat_map(|(label, violations)| describe("static", label, violations))
            .chain(
                dynamic_violations
                    .iter()
                    .flat_map(|(label, violations)| describe("dynamic", label, violations)),
            )
            .collect_vec();

        if descriptions.is_empty() {
            symbasis_output!("All operator terms respect the symmetries of the basis.");
        } else {
            symbasis_warn!(
                "{} operator term(s) break the symmetries of the basis:",
                descriptions.len()
            );
            descriptions
                .iter()
                .for_each(|description| symbasis_warn!("  {description}"));
        }
        symbasis_output!("");
        Ok(descriptions)
    }

    /// Evaluates every operator term in the made basis.
    fn evaluate_operators(
        &self,
        basis: &SymmetryBasis,
    ) -> Result<(Vec<OperatorElementsRecord>, Option<f64>), anyhow::Error> {
        let ns = basis.ns()?;
        let sorter = basis.default_sorter();
        let (static_terms, dynamic_terms) = basis
            .operator_terms(&sorter, self.static_operators, self.dynamic_operators)
            .with_context(|| "Unable to collect the operator terms")?;

        log_subtitle("Operator matrix elements");
        symbasis_output!("");
        let count_length = (static_terms.len() + dynamic_terms.len()).to_string().len();
        symbasis_output!("{}", "┈".repeat(count_length + 52));
        symbasis_output!(
            "{:>width$} {:>8} {:>32} {:>10}",
            "#",
            "Kind",
            "Term",
            "Elements",
            width = count_length
        );
        symbasis_output!("{}", "┈".repeat(count_length + 52));

        let records = static_terms
            .iter()
            .map(|term| (false, term))
            .chain(dynamic_terms.iter().map(|term| (true, term)))
            .enumerate()
            .map(|(i, (dynamic, term))| {
                let record = self.evaluate_term(basis, term, dynamic)?;
                symbasis_output!(
                    "{:>width$} {:>8} {:>32} {:>10}",
                    i + 1,
                    if dynamic { "dynamic" } else { "static" },
                    term.to_string(),
                    record.values.len(),
                    width = count_length
                );
                Ok::<_, anyhow::Error>(record)
            })
            .collect::<Result<Vec<_>, _>>()?;
        symbasis_output!("{}", "┈".repeat(count_length + 52));
        symbasis_output!("");

        if self.parameters.write_matrix_elements {
            records.iter().for_each(|record| {
                symbasis_output!("Term \"{}\" {:?}:", record.opstr, record.sites);
                record
                    .rows
                    .iter()
                    .zip(record.cols.iter())
                    .zip(record.values.iter())
                    .for_each(|((r, c), (re, im))| {
                        symbasis_output!("  <{r}|O|{c}> = {re:+.8} {im:+.8}i");
                    });
            });
            symbasis_output!("");
        }

        let hermiticity_deviation = if static_terms.is_empty() {
            None
        } else {
            let (rows, cols, values): (Vec<_>, Vec<_>, Vec<_>) = records
                .iter()
                .filter(|record| !record.dynamic)
                .flat_map(|record| {
                    record
                        .rows
                        .iter()
                        .zip(record.cols.iter())
                        .zip(record.values.iter())
                        .map(|((&r, &c), &(re, im))| (r, c, Complex::new(re, im)))
                })
                .multiunzip();
            let total = SparseMatrix::from_triplets((ns, ns), &rows, &cols, &values)?;
            let deviation = total
                .iter()
                .map(|(r, c, v)| (v - total.get(c, r).conj()).norm())
                .fold(0.0, f64::max);
            symbasis_output!(
                "Summed static operator: {} non-zero elements, Hermiticity deviation {:.3e}",
                total.nnz(),
                deviation
            );
            symbasis_output!("");
            Some(deviation)
        };

        Ok((records, hermiticity_deviation))
    }

    /// Evaluates a single operator term.
    fn evaluate_term(
        &self,
        basis: &SymmetryBasis,
        term: &OperatorTerm,
        dynamic: bool,
    ) -> Result<OperatorElementsRecord, anyhow::Error> {
        let elements = basis
            .apply_operator::<Complex<f64>>(&term.opstr, &term.sites, term.coupling)
            .with_context(|| format!("Unable to evaluate operator term {term}"))?;
        Ok(OperatorElementsRecord {
            dynamic,
            opstr: term.opstr.clone(),
            sites: term.sites.clone(),
            coupling: (term.coupling.re, term.coupling.im),
            rows: elements.rows,
            cols: elements.cols,
            values: elements.values.iter().map(|v| (v.re, v.im)).collect(),
        })
    }

    /// Executes basis construction.
    fn construct_basis(&mut self) -> Result<(), anyhow::Error> {
        log_title("Symmetry-Reduced Basis Construction");
        symbasis_output!("");
        let params = self.parameters;

        log_subtitle("Lattice system");
        symbasis_output!("");
        self.system.log_output_display();
        symbasis_output!("");

        log_subtitle("Symmetry reduction");
        symbasis_output!("");
        self.basis_params.log_output_display();
        params.log_output_display();

        let mut basis = SymmetryBasis::new(self.system, self.basis_params)
            .with_context(|| "Unable to set up the symmetry-reduced basis")?;
        basis.group().log_output_display();
        symbasis_output!("");
        let diagnostics = basis
            .group()
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.to_string())
            .collect_vec();
        diagnostics
            .iter()
            .for_each(|diagnostic| symbasis_warn!("{diagnostic}"));

        log::debug!("Making the symmetry-reduced basis...");
        let ns = basis
            .make(params.capacity_estimate)
            .with_context(|| "Unable to make the symmetry-reduced basis")?;
        log::debug!("Making the symmetry-reduced basis... Done.");
        symbasis_output!(
            "Reduced dimension: {ns} (full dimension: {})",
            basis.space().full_dim()
        );
        symbasis_output!("Normalisation storage: {}", basis.norms()?.type_name());
        symbasis_output!("");
        if params.write_basis {
            log_subtitle("Representatives");
            symbasis_output!("");
            basis.log_output_display();
            symbasis_output!("");
        }

        let has_operators = !(self.static_operators.is_empty() && self.dynamic_operators.is_empty());
        let symmetry_violations = if params.check_symmetry && has_operators {
            self.check_operator_symmetries(&basis)?
        } else {
            vec![]
        };
        let (operators, hermiticity_deviation) = if has_operators {
            self.evaluate_operators(&basis)?
        } else {
            (vec![], None)
        };

        let result = BasisConstructionResult::builder()
            .parameters(params.clone())
            .system(self.system.clone())
            .basis_params(self.basis_params.clone())
            .blocks(
                basis
                    .group()
                    .blocks()
                    .iter()
                    .map(|(label, value)| (label.clone(), *value))
                    .collect_vec(),
            )
            .states(basis.states()?.to_vec())
            .norms(basis.norms()?.to_vec())
            .particle_counts(basis.particle_counts()?.map(|counts| counts.to_vec()))
            .diagnostics(diagnostics)
            .symmetry_violations(symmetry_violations)
            .operators(operators)
            .hermiticity_deviation(hermiticity_deviation)
            .build()
            .map_err(|err| format_err!(err))?;
        result.log_output_display();
        symbasis_output!("");

        if let Some(name) = params.result_save_name.as_ref() {
            write_symbasis_binary(name, SymBasisFileType::Bas, &result)?;
            symbasis_output!(
                "Basis construction results saved as {name}.{}.",
                SymBasisFileType::Bas.ext()
            );
            if !result.operators.is_empty() {
                write_symbasis_binary(name, SymBasisFileType::Ops, &result.operators)?;
                symbasis_output!(
                    "Operator matrix elements saved as {name}.{}.",
                    SymBasisFileType::Ops.ext()
                );
            }
            symbasis_output!("");
        }

        self.result = Some(result);
        Ok(())
    }
}

impl<'a> SymBasisDriver for BasisConstructionDriver<'a> {
    type Params = BasisConstructionParams;

    type Outcome = BasisConstructionResult;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No basis construction results found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.construct_basis()
    }
}
