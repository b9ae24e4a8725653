//! Points in pitch space and the tolerance policy used to compare them.
//!
//! A `Point` is an ordered vector of real pitches whose dimension is fixed
//! at construction. All approximate comparison goes through `Tolerance`,
//! which quantizes values to an epsilon grid before comparing. Quantized
//! comparison is a total order, so canonicalization tie-breaks are
//! reproducible even at floating-point boundaries.

use crate::error::{ChordSpaceError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Index, Sub};

/// Numeric comparison policy for pitch values.
///
/// Values are quantized to multiples of `epsilon` (`round(x / epsilon)` as
/// an `i64`) and compared exactly. Two values are equal iff they land on
/// the same grid line; ties at exactly half an epsilon resolve away from
/// zero, per `f64::round`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerance {
    epsilon: f64,
}

impl Tolerance {
    /// Default comparison grid, fine enough for equal-tempered work while
    /// absorbing accumulated rounding from centroid translations.
    pub const DEFAULT_EPSILON: f64 = 1e-6;

    /// Create a tolerance with an explicit epsilon (must be positive).
    pub fn new(epsilon: f64) -> Result<Self> {
        if !(epsilon > 0.0) || !epsilon.is_finite() {
            return Err(ChordSpaceError::Domain(format!(
                "tolerance epsilon must be positive and finite, got {}",
                epsilon
            )));
        }
        Ok(Tolerance { epsilon })
    }

    /// The comparison grid spacing.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Quantize a value to its grid line index.
    pub fn quantize(&self, x: f64) -> i64 {
        (x / self.epsilon).round() as i64
    }

    /// Total-order comparison of two values on the grid.
    pub fn cmp(&self, a: f64, b: f64) -> Ordering {
        self.quantize(a).cmp(&self.quantize(b))
    }

    pub fn eq(&self, a: f64, b: f64) -> bool {
        self.cmp(a, b) == Ordering::Equal
    }

    pub fn lt(&self, a: f64, b: f64) -> bool {
        self.cmp(a, b) == Ordering::Less
    }

    pub fn le(&self, a: f64, b: f64) -> bool {
        self.cmp(a, b) != Ordering::Greater
    }

    pub fn gt(&self, a: f64, b: f64) -> bool {
        self.cmp(a, b) == Ordering::Greater
    }

    pub fn ge(&self, a: f64, b: f64) -> bool {
        self.cmp(a, b) != Ordering::Less
    }

    /// True when a value sits on the integer grid (within tolerance).
    pub fn is_integral(&self, x: f64) -> bool {
        self.eq(x, x.round())
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            epsilon: Self::DEFAULT_EPSILON,
        }
    }
}

/// An ordered vector of real pitches with a fixed dimension.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    values: Vec<f64>,
}

impl Point {
    /// Create a point of the given dimension at the origin.
    pub fn zeroed(dimension: usize) -> Self {
        Point {
            values: vec![0.0; dimension],
        }
    }

    /// Create a point from explicit component values.
    pub fn from_values(values: Vec<f64>) -> Self {
        Point { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Set one component. The dimension never changes, so out-of-dimension
    /// indices are a range error.
    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        if index >= self.values.len() {
            return Err(ChordSpaceError::Range(format!(
                "component index {} out of bounds for dimension {}",
                index,
                self.values.len()
            )));
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Apply a function to every component.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Point {
        Point {
            values: self.values.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Spread of the components (max - min); 0 for dimensions 0 and 1.
    pub fn span(&self) -> f64 {
        match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0.0,
        }
    }

    /// Per-component displacement from this point to another of the same
    /// dimension.
    pub fn displacement_to(&self, other: &Point) -> Result<Vec<f64>> {
        if self.len() != other.len() {
            return Err(ChordSpaceError::Domain(format!(
                "dimension mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| b - a)
            .collect())
    }

    /// Euclidean distance to another point of the same dimension.
    pub fn distance_to(&self, other: &Point) -> Result<f64> {
        let d = self.displacement_to(other)?;
        Ok(d.iter().map(|x| x * x).sum::<f64>().sqrt())
    }

    /// Componentwise equality under the tolerance; points of different
    /// dimension are never equal.
    pub fn eq_with(&self, other: &Point, tol: Tolerance) -> bool {
        self.len() == other.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(&a, &b)| tol.eq(a, b))
    }

    /// Lexicographic total order under the tolerance. Lower dimension sorts
    /// first.
    pub fn cmp_with(&self, other: &Point, tol: Tolerance) -> Ordering {
        for (&a, &b) in self.values.iter().zip(other.values.iter()) {
            match tol.cmp(a, b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.len().cmp(&other.len())
    }

    /// Grid-line key for hashing and deduplication.
    pub fn quantized(&self, tol: Tolerance) -> Vec<i64> {
        self.values.iter().map(|&x| tol.quantize(x)).collect()
    }
}

impl Index<usize> for Point {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

// Scalar translation.
impl Add<f64> for &Point {
    type Output = Point;

    fn add(self, x: f64) -> Point {
        self.map(|v| v + x)
    }
}

impl Sub<f64> for &Point {
    type Output = Point;

    fn sub(self, x: f64) -> Point {
        self.map(|v| v - x)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(" "))
    }
}
