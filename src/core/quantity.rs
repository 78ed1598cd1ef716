//! Fixed-point resource quantities.
//!
//! A [`Quantity`] stores an amount in milli-units as an `i128`, which is the
//! same resolution Kubernetes uses for `resource.Quantity::MilliValue`. Sums
//! and differences are exact; only [`Quantity::scale`] rounds.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::SchedulingError;

const MILLI: i128 = 1000;

/// Signed fixed-point amount of a single resource, in milli-units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity {
    millis: i128,
}

impl Quantity {
    /// The zero quantity.
    pub const ZERO: Self = Self { millis: 0 };

    /// Build a quantity from milli-units (`Quantity::from_millis(100)` is `100m`).
    pub const fn from_millis(millis: i128) -> Self {
        Self { millis }
    }

    /// Build a quantity from whole units.
    pub const fn from_units(units: i128) -> Self {
        Self {
            millis: units * MILLI,
        }
    }

    /// Amount in milli-units.
    pub const fn millis(self) -> i128 {
        self.millis
    }

    /// True when the amount is exactly zero.
    pub const fn is_zero(self) -> bool {
        self.millis == 0
    }

    /// True when the amount is below zero.
    pub const fn is_negative(self) -> bool {
        self.millis < 0
    }

    /// Approximate value in whole units.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.millis as f64 / MILLI as f64
    }

    /// Build from a floating point amount of whole units, rounding down to the
    /// nearest milli-unit. Non-finite input yields zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64_floor(units: f64) -> Self {
        if !units.is_finite() {
            return Self::ZERO;
        }
        Self {
            millis: (units * 1000.0).floor() as i128,
        }
    }

    /// Build from a floating point amount of whole units, rounding to the
    /// nearest milli-unit. Non-finite input yields zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64_round(units: f64) -> Self {
        if !units.is_finite() {
            return Self::ZERO;
        }
        Self {
            millis: (units * 1000.0).round() as i128,
        }
    }

    /// Multiply by a scalar, rounding toward negative infinity so scaled
    /// budgets never overshoot. Non-finite factors yield zero.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn scale(self, factor: f64) -> Self {
        if !factor.is_finite() {
            return Self::ZERO;
        }
        Self {
            millis: (self.millis as f64 * factor).floor() as i128,
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            millis: self.millis + rhs.millis,
        }
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        self.millis += rhs.millis;
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            millis: self.millis - rhs.millis,
        }
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        self.millis -= rhs.millis;
    }
}

impl Neg for Quantity {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            millis: -self.millis,
        }
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

fn suffix_multiplier(suffix: &str) -> Option<(i128, i128)> {
    // (numerator, denominator) applied to whole units
    let factor = match suffix {
        "" => (1, 1),
        "m" => (1, 1000),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        _ => return None,
    };
    Some(factor)
}

impl FromStr for Quantity {
    type Err = SchedulingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SchedulingError::InvalidQuantity(raw.to_string());
        let input = raw.trim();
        if input.is_empty() {
            return Err(invalid());
        }

        let (negative, body) = match input.as_bytes()[0] {
            b'-' => (true, &input[1..]),
            b'+' => (false, &input[1..]),
            _ => (false, input),
        };

        let split = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let (number, suffix) = body.split_at(split);
        let (num, den) = suffix_multiplier(suffix).ok_or_else(invalid)?;

        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > 18 {
            return Err(invalid());
        }

        let int_value: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let frac_digits = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        let frac_value: i128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        let frac_scale = 10_i128.pow(frac_digits);

        // value = (int + frac / frac_scale) * num / den, expressed in millis
        let scaled = int_value
            .checked_mul(frac_scale)
            .and_then(|v| v.checked_add(frac_value))
            .and_then(|v| v.checked_mul(num))
            .and_then(|v| v.checked_mul(MILLI))
            .ok_or_else(invalid)?;
        let divisor = frac_scale * den;
        // fractions finer than a milli-unit round up
        let mut millis = scaled / divisor;
        if scaled % divisor != 0 {
            millis += 1;
        }

        Ok(Self {
            millis: if negative { -millis } else { millis },
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis % MILLI == 0 {
            write!(f, "{}", self.millis / MILLI)
        } else {
            write!(f, "{}m", self.millis)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
