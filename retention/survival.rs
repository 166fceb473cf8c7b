//! Survival of a duplicate gene copy under a parametric hazard.
//!
//! The hazard for a category is `λ(t) = d + f·exp(-b·t^c)`, so survival is
//! `S(t) = exp(-d·t - f·∫₀ᵗ exp(-b·s^c) ds)`. The integral has no closed form
//! for general `c`; expanding the exponential and integrating term by term gives
//!
//! ```text
//! ∫₀ᵗ exp(-b·s^c) ds = Σₙ (-b)ⁿ · t^(c·n+1) / (c·n·n! + n!)
//! ```
//!
//! which is truncated after a fixed number of terms. The `n!` in the
//! denominator dominates `(-b)ⁿ` for moderate `b`, so the tail vanishes quickly
//! in the documented parameter regimes.

use crate::types::{Category, HazardParameters};
use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Number of series terms used when no other bound is configured.
pub const DEFAULT_TRUNCATION: usize = 100;

/// Largest truncation bound accepted. `171!` is not representable as an `f64`.
pub const MAX_TRUNCATION: usize = 170;

/// Survival probability used in place of exactly 1 for the first point of an
/// axis that starts at t = 0.
///
/// The retention ratio divides by the probability of loss by t1, which is zero
/// at the instant of duplication. The model assumes that two duplicate copies
/// cannot be lost at the duplication event itself, so something must already be
/// lost by the first recorded instant. This is an approximation for the first
/// grid point only, not a numerical guard for the series.
pub const SURVIVAL_IMMEDIATELY_POST_DUPLICATION: f64 = 0.9999999999999;

#[derive(Debug, Error, PartialEq)]
pub enum SurvivalError {
    #[error("The series truncation bound must be at least 1.")]
    EmptySeries,
    #[error(
        "Series truncation bound {0} exceeds {MAX_TRUNCATION}; the factorial terms would overflow."
    )]
    TruncationTooLarge(usize),
}

/// Evaluates survival probabilities with a fixed series truncation bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivalModel {
    truncation: usize,
}

impl Default for SurvivalModel {
    fn default() -> Self {
        Self {
            truncation: DEFAULT_TRUNCATION,
        }
    }
}

impl SurvivalModel {
    pub fn new(truncation: usize) -> Result<Self, SurvivalError> {
        if truncation == 0 {
            return Err(SurvivalError::EmptySeries);
        }
        if truncation > MAX_TRUNCATION {
            return Err(SurvivalError::TruncationTooLarge(truncation));
        }
        Ok(Self { truncation })
    }

    pub fn truncation(&self) -> usize {
        self.truncation
    }

    /// Truncated series approximation of `∫₀ᵗ exp(-b·s^c) ds`.
    ///
    /// Terms are built incrementally: the running coefficient holds `(-b)ⁿ / n!`
    /// and the running power holds `t^(c·n+1)`, so neither the factorial nor the
    /// power is ever formed on its own.
    pub fn hazard_integral(&self, params: &HazardParameters, t: f64) -> f64 {
        let power_step = t.powf(params.c);
        let mut coefficient = 1.0;
        let mut power = t;
        let mut summation = 0.0;
        for n in 0..self.truncation {
            if n > 0 {
                coefficient *= -params.b / n as f64;
                power *= power_step;
            }
            summation += coefficient * power / (params.c * n as f64 + 1.0);
        }
        summation
    }

    /// Probability that both copies of a duplicate survive to time `t`.
    ///
    /// Returns exactly 1 at `t = 0`. Parameters outside the documented regimes
    /// are not rejected here.
    pub fn survival_probability(&self, params: &HazardParameters, t: f64) -> f64 {
        let summation = self.hazard_integral(params, t);
        (-params.d * t - params.f * summation).exp()
    }

    /// Evaluates the survival curve of one category over a time axis.
    pub fn curve(
        &self,
        category: Category,
        params: &HazardParameters,
        times: ArrayView1<'_, f64>,
    ) -> SurvivalCurve {
        let probabilities = times.mapv(|t| self.survival_probability(params, t));
        SurvivalCurve {
            category,
            times: times.to_owned(),
            probabilities,
        }
    }
}

/// Survival probabilities of one category over an ordered time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalCurve {
    category: Category,
    times: Array1<f64>,
    probabilities: Array1<f64>,
}

impl SurvivalCurve {
    /// Builds a curve from already computed values. Both arrays must have the same length.
    pub fn from_parts(category: Category, times: Array1<f64>, probabilities: Array1<f64>) -> Self {
        debug_assert_eq!(times.len(), probabilities.len());
        Self {
            category,
            times,
            probabilities,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    pub fn probabilities(&self) -> ArrayView1<'_, f64> {
        self.probabilities.view()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
    }

    pub fn is_non_increasing(&self) -> bool {
        self.probabilities
            .windows(2)
            .into_iter()
            .all(|pair| pair[1] <= pair[0])
    }
}
