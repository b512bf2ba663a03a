//! Exact roots of unity for symmetry phases.

use std::fmt;
use std::ops::Mul;

use derive_builder::Builder;
use fraction::{GenericFraction, ToPrimitive};
use num_complex::Complex;
use num_traits::{One, Pow, Zero};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "unityroot_tests.rs"]
mod unityroot_tests;

/// A struct to represent roots of unity exactly.
///
/// Symmetry phases $`\chi(g) = e^{2\pi i \sum_k q_k g_k / p_k}`$ and the signs picked up by
/// sign-flip or fermionic reorderings are all roots of unity. Keeping them as fractions
/// $`k/n \in [0, 1)`$ makes selection rules exact comparisons rather than floating-point
/// tolerances.
#[derive(Builder, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnityRoot {
    /// The fraction $`k/n \in [0, 1)`$ of the unity root.
    #[builder(setter(custom))]
    fraction: GenericFraction<u64>,
}

impl UnityRootBuilder {
    fn fraction(&mut self, frac: GenericFraction<u64>) -> &mut Self {
        self.fraction = if frac < GenericFraction::<u64>::one() {
            Some(frac)
        } else {
            let numer = *frac
                .numer()
                .unwrap_or_else(|| panic!("The numerator of {frac} cannot be extracted."));
            let denom = *frac
                .denom()
                .unwrap_or_else(|| panic!("The denominator of {frac} cannot be extracted."));
            Some(GenericFraction::<u64>::new(numer % denom, denom))
        };
        self
    }
}

impl UnityRoot {
    fn builder() -> UnityRootBuilder {
        UnityRootBuilder::default()
    }

    /// Constructs the root $`e^{2\pi i k / n}`$ from an index $`k`$ and an order $`n > 0`$.
    #[must_use]
    pub fn new(index: u64, order: u64) -> Self {
        assert!(order > 0, "The order of a unity root must be positive.");
        Self::builder()
            .fraction(GenericFraction::<u64>::new(index % order, order))
            .build()
            .expect("Unable to construct a unity root.")
    }

    /// Constructs $`e^{2\pi i q g / p}`$ for a possibly negative quantum number `q`.
    #[must_use]
    pub fn from_quantum_number(q: i64, power: u64, period: u64) -> Self {
        let q_red = q.rem_euclid(period as i64) as u64;
        Self::new((q_red * (power % period)) % period, period)
    }

    /// The root $`1`$.
    #[must_use]
    pub fn one() -> Self {
        Self::new(0, 1)
    }

    /// Converts a sign $`\pm 1`$ into a root.
    #[must_use]
    pub fn from_sign(sign: i8) -> Self {
        if sign < 0 {
            Self::new(1, 2)
        } else {
            Self::one()
        }
    }

    /// The order $`n`$ of the root $`z`$ in lowest terms, *i.e.* the smallest $`n`$ with
    /// $`z^n = 1`$.
    pub fn order(&self) -> u64 {
        *self
            .fraction
            .denom()
            .expect("Unable to obtain the order of the root.")
    }

    /// The index $`k`$ of the root $`z = e^{2k\pi i/n}`$ in lowest terms.
    pub fn index(&self) -> u64 {
        *self
            .fraction
            .numer()
            .expect("Unable to obtain the index of the root.")
    }

    /// Returns `true` if this root is $`1`$.
    pub fn is_one(&self) -> bool {
        self.fraction.is_zero()
    }

    /// The complex value of this root.
    #[must_use]
    pub fn complex_value(&self) -> Complex<f64> {
        // Exact values for the common real and imaginary roots avoid spurious round-off.
        match (self.index(), self.order()) {
            (0, _) => Complex::new(1.0, 0.0),
            (1, 2) => Complex::new(-1.0, 0.0),
            (1, 4) => Complex::new(0.0, 1.0),
            (3, 4) => Complex::new(0.0, -1.0),
            _ => {
                let theta = self
                    .fraction
                    .to_f64()
                    .expect("Unable to convert a fraction to `f64`.")
                    * std::f64::consts::PI
                    * 2.0;
                Complex::<f64>::from_polar(1.0, theta)
            }
        }
    }

    /// The complex conjugate (equivalently, the inverse) of this root.
    #[must_use]
    pub fn complex_conjugate(&self) -> Self {
        Self::new(self.order() - self.index(), self.order())
    }
}

impl Mul<&'_ UnityRoot> for &UnityRoot {
    type Output = UnityRoot;

    fn mul(self, rhs: &UnityRoot) -> Self::Output {
        #[allow(clippy::suspicious_arithmetic_impl)]
        let fract_sum = self.fraction + rhs.fraction;
        Self::Output::builder()
            .fraction(fract_sum)
            .build()
            .unwrap_or_else(|_| panic!("Unable to construct a unity root with fraction {fract_sum}."))
    }
}

impl Mul<UnityRoot> for UnityRoot {
    type Output = UnityRoot;

    fn mul(self, rhs: UnityRoot) -> Self::Output {
        &self * &rhs
    }
}

impl Pow<u64> for &UnityRoot {
    type Output = UnityRoot;

    fn pow(self, rhs: u64) -> Self::Output {
        let order = self.order();
        UnityRoot::new(
            ((u128::from(self.index()) * u128::from(rhs)) % u128::from(order)) as u64,
            order,
        )
    }
}

impl fmt::Display for UnityRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index(), self.order()) {
            (0, _) => write!(f, "1"),
            (1, 4) => write!(f, "i"),
            (1, 2) => write!(f, "-1"),
            (3, 4) => write!(f, "-i"),
            (1, order) => write!(f, "E{order}"),
            (index, order) => write!(f, "(E{order})^{index}"),
        }
    }
}

impl fmt::Debug for UnityRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
