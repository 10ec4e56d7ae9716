//! Bounded score value objects
//!
//! Both extraction quality and classification/extraction confidence live in
//! `[0, 1]`. Constructing a value outside that range is a contract violation
//! and fails fast; scores derived from arithmetic use [`Quality::clamped`] /
//! [`Confidence::clamped`] instead.

use serde::{Deserialize, Serialize};

/// Heuristic estimate of how trustworthy extracted text is, in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quality(f64);

impl Quality {
    /// Zero quality (failed or empty extraction)
    pub const ZERO: Quality = Quality(0.0);

    /// Create a new quality score
    ///
    /// # Panics
    /// Panics if the value is outside `[0, 1]`.
    pub fn new(value: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&value),
            "quality must be in [0, 1], got {value}"
        );
        Self(value)
    }

    /// Create a quality score, saturating at the `[0, 1]` bounds
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the inner value
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether this score meets the given acceptance threshold
    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl TryFrom<f64> for Quality {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("quality {value} out of range [0, 1]"))
        }
    }
}

impl From<Quality> for f64 {
    fn from(q: Quality) -> f64 {
        q.0
    }
}

/// Confidence in a classification or extraction outcome, in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// No confidence at all (the `Unclassified` terminal case)
    pub const ZERO: Confidence = Confidence(0.0);

    /// Full confidence (human-verified feedback)
    pub const FULL: Confidence = Confidence(1.0);

    /// Create a new confidence score
    ///
    /// # Panics
    /// Panics if the value is outside `[0, 1]`.
    pub fn new(value: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&value),
            "confidence must be in [0, 1], got {value}"
        );
        Self(value)
    }

    /// Create a confidence score, saturating at the `[0, 1]` bounds
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the inner value
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether this score meets the given acceptance threshold
    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("confidence {value} out of range [0, 1]"))
        }
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}
