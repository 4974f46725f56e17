//! Newtypes for quantities with physical or monetary units.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// A quantity with a unit, backed by an `f64`
pub trait UnitType: fmt::Debug + Copy + PartialEq + PartialOrd {
    /// Create from an `f64` value
    fn new(value: f64) -> Self;

    /// Get the underlying `f64` value
    fn value(&self) -> f64;

    /// Whether the value is finite
    fn is_finite(&self) -> bool {
        self.value().is_finite()
    }
}

macro_rules! define_unit {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl UnitType for $name {
            fn new(value: f64) -> Self {
                Self(value)
            }

            fn value(&self) -> f64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<Dimensionless> for $name {
            type Output = Self;

            fn mul(self, rhs: Dimensionless) -> Self {
                Self(self.0 * rhs.0)
            }
        }

        impl Div for $name {
            type Output = Dimensionless;

            fn div(self, rhs: Self) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Define `$lhs * $rhs = $out` (and the commuted product)
macro_rules! define_product {
    ($lhs:ident, $rhs:ident, $out:ident) => {
        impl Mul<$rhs> for $lhs {
            type Output = $out;

            fn mul(self, rhs: $rhs) -> $out {
                $out(self.0 * rhs.0)
            }
        }

        impl Mul<$lhs> for $rhs {
            type Output = $out;

            fn mul(self, rhs: $lhs) -> $out {
                $out(self.0 * rhs.0)
            }
        }
    };
}

// Dimensionless is defined separately so that Dimensionless * Dimensionless is unambiguous
/// A dimensionless quantity (weights, probabilities, per-unit values)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl UnitType for Dimensionless {
    fn new(value: f64) -> Self {
        Self(value)
    }

    fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Dimensionless {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Mul for Dimensionless {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Add for Dimensionless {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Dimensionless {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|x| x.0).sum())
    }
}

define_unit!(Hours, "A duration in hours");
define_unit!(Power, "Power in MW");
define_unit!(Energy, "Energy in MWh");
define_unit!(Money, "A monetary amount");
define_unit!(MoneyPerEnergy, "Cost per unit of energy");
define_unit!(MoneyPerPower, "Cost per unit of capacity");

define_product!(Power, Hours, Energy);
define_product!(Energy, MoneyPerEnergy, Money);
define_product!(Power, MoneyPerPower, Money);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_have_expected_units() {
        let energy: Energy = Power(10.0) * Hours(2.0);
        assert_eq!(energy, Energy(20.0));
        let cost: Money = MoneyPerEnergy(3.0) * energy;
        assert_eq!(cost, Money(60.0));
    }

    #[test]
    fn scale_by_dimensionless() {
        assert_eq!(Money(10.0) * Dimensionless(0.5), Money(5.0));
        assert_eq!(Power(4.0) / Power(2.0), Dimensionless(2.0));
    }

    #[test]
    fn sum_units() {
        let total: Energy = [Energy(1.0), Energy(2.5)].into_iter().sum();
        assert_eq!(total, Energy(3.5));
    }
}
