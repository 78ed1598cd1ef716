//! Multi-dimensional compute resource vectors.
//!
//! [`ComputeResources`] is an open map from resource name (`cpu`, `memory`,
//! `nvidia.com/gpu`, ...) to a fixed-point [`Quantity`]. A name absent from
//! the map is an implicit zero, so operands with different key sets combine
//! over the union of their names. [`ComputeResourcesFloat`] is the
//! approximate counterpart used for thresholds and scoring only.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::core::{Quantity, SchedulingError};

/// Kubernetes name of the CPU resource.
pub const CPU: &str = "cpu";
/// Kubernetes name of the memory resource.
pub const MEMORY: &str = "memory";
/// Kubernetes name of the storage resource.
pub const STORAGE: &str = "storage";
/// Kubernetes name of the ephemeral storage resource.
pub const EPHEMERAL_STORAGE: &str = "ephemeral-storage";

/// Resource vector keyed by resource name with exact quantities.
///
/// Equality compares over the union of names, so `{cpu: 1}` equals
/// `{cpu: 1, memory: 0}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComputeResources {
    values: BTreeMap<String, Quantity>,
}

impl ComputeResources {
    /// The zero vector.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse a list of `(name, quantity string)` pairs.
    ///
    /// Fails on the first malformed quantity. Use
    /// [`ComputeResources::from_resource_list_lossy`] when partial data should
    /// degrade instead.
    pub fn parse<'a, I>(entries: I) -> Result<Self, SchedulingError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut out = Self::zero();
        for (name, raw) in entries {
            let quantity: Quantity = raw.parse()?;
            out.add_quantity(name, quantity);
        }
        Ok(out)
    }

    /// Convert a raw resource list, substituting zero for malformed entries.
    ///
    /// Returns the parsed vector and the names whose values could not be read.
    pub fn from_resource_list_lossy(list: &BTreeMap<String, String>) -> (Self, Vec<String>) {
        let mut out = Self::zero();
        let mut malformed = Vec::new();
        for (name, raw) in list {
            match raw.parse::<Quantity>() {
                Ok(quantity) => out.add_quantity(name, quantity),
                Err(_) => malformed.push(name.clone()),
            }
        }
        (out, malformed)
    }

    /// Quantity for a resource, zero when absent.
    pub fn get(&self, name: &str) -> Quantity {
        self.values.get(name).copied().unwrap_or(Quantity::ZERO)
    }

    /// Builder-style insert, replacing any existing value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, quantity: Quantity) -> Self {
        self.values.insert(name.into(), quantity);
        self
    }

    /// Add `quantity` to the named resource in place.
    pub fn add_quantity(&mut self, name: &str, quantity: Quantity) {
        match self.values.get_mut(name) {
            Some(existing) => *existing += quantity,
            None => {
                self.values.insert(name.to_string(), quantity);
            }
        }
    }

    /// Iterate `(name, quantity)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Quantity)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Resource names carried by this vector.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// True when every quantity is zero (including the empty vector).
    pub fn is_zero(&self) -> bool {
        self.values.values().all(|q| q.is_zero())
    }

    /// True when any quantity is negative.
    pub fn has_negative(&self) -> bool {
        self.values.values().any(|q| q.is_negative())
    }

    /// Names whose quantity is negative.
    pub fn negative_names(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(_, q)| q.is_negative())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Element-wise sum over the union of names.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out += other;
        out
    }

    /// Element-wise difference over the union of names.
    ///
    /// Results may be negative; callers use the sign to detect overcommit.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out -= other;
        out
    }

    /// Multiply every quantity by `factor`, rounding down per resource.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.scale(factor)))
                .collect(),
        }
    }

    /// Element-wise minimum over the union of names.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        self.union_with(other, std::cmp::Ord::min)
    }

    /// Replace negative quantities with zero.
    #[must_use]
    pub fn clamp_non_negative(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), (*v).max(Quantity::ZERO)))
                .collect(),
        }
    }

    /// True when `self` covers `other` in every resource named by either.
    pub fn dominates(&self, other: &Self) -> bool {
        self.values
            .keys()
            .chain(other.values.keys())
            .all(|name| self.get(name) >= other.get(name))
    }

    /// Fraction `self[name] / other[name]`.
    ///
    /// A zero denominator yields `0.0` when the numerator is also zero and
    /// `f64::INFINITY` otherwise.
    pub fn ratio(&self, other: &Self, name: &str) -> f64 {
        let numerator = self.get(name);
        let denominator = other.get(name);
        if denominator.is_zero() {
            return if numerator.is_zero() { 0.0 } else { f64::INFINITY };
        }
        numerator.as_f64() / denominator.as_f64()
    }

    /// Approximate float view of this vector.
    pub fn as_float(&self) -> ComputeResourcesFloat {
        ComputeResourcesFloat {
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.as_f64()))
                .collect(),
        }
    }

    fn union_with(&self, other: &Self, f: impl Fn(Quantity, Quantity) -> Quantity) -> Self {
        let values = self
            .values
            .keys()
            .chain(other.values.keys())
            .map(|name| (name.clone(), f(self.get(name), other.get(name))))
            .collect();
        Self { values }
    }
}

impl PartialEq for ComputeResources {
    fn eq(&self, other: &Self) -> bool {
        self.values
            .keys()
            .chain(other.values.keys())
            .all(|name| self.get(name) == other.get(name))
    }
}

impl Eq for ComputeResources {}

impl AddAssign<&ComputeResources> for ComputeResources {
    fn add_assign(&mut self, rhs: &ComputeResources) {
        for (name, quantity) in &rhs.values {
            self.add_quantity(name, *quantity);
        }
    }
}

impl SubAssign<&ComputeResources> for ComputeResources {
    fn sub_assign(&mut self, rhs: &ComputeResources) {
        for (name, quantity) in &rhs.values {
            self.add_quantity(name, -*quantity);
        }
    }
}

impl Add<&ComputeResources> for &ComputeResources {
    type Output = ComputeResources;

    fn add(self, rhs: &ComputeResources) -> ComputeResources {
        ComputeResources::add(self, rhs)
    }
}

impl Sub<&ComputeResources> for &ComputeResources {
    type Output = ComputeResources;

    fn sub(self, rhs: &ComputeResources) -> ComputeResources {
        ComputeResources::sub(self, rhs)
    }
}

impl<'a> Sum<&'a ComputeResources> for ComputeResources {
    fn sum<I: Iterator<Item = &'a ComputeResources>>(iter: I) -> Self {
        iter.fold(Self::zero(), |mut acc, r| {
            acc += r;
            acc
        })
    }
}

impl Sum for ComputeResources {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |mut acc, r| {
            acc += &r;
            acc
        })
    }
}

impl<S: Into<String>> FromIterator<(S, Quantity)> for ComputeResources {
    fn from_iter<I: IntoIterator<Item = (S, Quantity)>>(iter: I) -> Self {
        let mut out = Self::zero();
        for (name, quantity) in iter {
            let name: String = name.into();
            out.add_quantity(&name, quantity);
        }
        out
    }
}

/// Approximate resource vector in whole units, for thresholds such as the
/// minimum schedulable quantum and for decaying usage. Never used for
/// authoritative capacity accounting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComputeResourcesFloat {
    values: BTreeMap<String, f64>,
}

impl ComputeResourcesFloat {
    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Value for a resource, zero when absent.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Iterate `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True when no values are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when any value is below zero or not finite.
    pub fn has_invalid(&self) -> bool {
        self.values.values().any(|v| !v.is_finite() || *v < 0.0)
    }

    /// True when `self` is below `other` in at least one resource named by
    /// either.
    pub fn is_less_than(&self, other: &Self) -> bool {
        self.values
            .keys()
            .chain(other.values.keys())
            .any(|name| self.get(name) < other.get(name))
    }

    /// True when `self` is below `other` in every resource `other` names with
    /// a positive value. An empty or all-zero `other` is never undercut.
    pub fn is_below_everywhere(&self, other: &Self) -> bool {
        let mut thresholds = other.values.iter().filter(|(_, v)| **v > 0.0).peekable();
        if thresholds.peek().is_none() {
            return false;
        }
        thresholds.all(|(name, threshold)| self.get(name) < *threshold)
    }

    /// Exact view, each value rounded down to a milli-unit.
    pub fn to_exact(&self) -> ComputeResources {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), Quantity::from_f64_floor(*v)))
            .collect()
    }

    /// Exact view, each value rounded to the nearest milli-unit.
    pub fn to_exact_rounded(&self) -> ComputeResources {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), Quantity::from_f64_round(*v)))
            .collect()
    }

    /// Every value multiplied by `factor`; non-finite factors yield zeros.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor } else { 0.0 };
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v * factor))
                .collect(),
        }
    }

    /// Add an exact vector without rounding.
    #[must_use]
    pub fn add_exact(&self, other: &ComputeResources) -> Self {
        let mut out = self.clone();
        for (name, quantity) in other.iter() {
            *out.values.entry(name.to_string()).or_insert(0.0) += quantity.as_f64();
        }
        out
    }

    /// Subtract an exact vector, flooring each value at zero.
    #[must_use]
    pub fn sub_exact_clamped(&self, other: &ComputeResources) -> Self {
        let mut out = self.clone();
        for (name, quantity) in other.iter() {
            let value = out.values.entry(name.to_string()).or_insert(0.0);
            *value = (*value - quantity.as_f64()).max(0.0);
        }
        out
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ComputeResourcesFloat {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
