use crate::types::{Category, CategoryMixture, CategorySurvival};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RatioError {
    #[error(
        "The mixture leaves no weight on the {0} branch of the ratio; the denominator is zero."
    )]
    DegenerateMixture(RatioBranch),
    #[error("The probability ratio is not finite ({0}).")]
    NonFinite(f64),
    #[error("The probability ratio must be strictly positive, got {0}.")]
    NonPositive(f64),
}

/// The two sums that appear in a denominator of the ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioBranch {
    /// Duplicates lost by t1 whose category still survives to t2.
    LostThenSurviving,
    /// Duplicates retained through t1.
    Retained,
}

impl std::fmt::Display for RatioBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LostThenSurviving => f.write_str("lost-by-t1"),
            Self::Retained => f.write_str("retained-through-t1"),
        }
    }
}

/// Mixture-weighted retention mass through t1, split by what happens at t2.
///
/// `retained` counts both copies (factor 2) for each category; `lost` is the
/// share of the category that lost a copy by t1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetentionTerms {
    pub retained: f64,
    pub retained_surviving: f64,
    pub lost: f64,
    pub lost_surviving: f64,
}

impl RetentionTerms {
    pub fn new(st1: &CategorySurvival, st2: &CategorySurvival, mix: &CategoryMixture) -> Self {
        let switch = mix.switch_percent();
        let mut terms = Self::default();
        for category in Category::ALL {
            let share = mix.fraction(category);
            let retained = 2.0 * share * st1.get(category);
            let lost = (1.0 - st1.get(category)) * share;
            // Switched Alt_func duplicates follow the Non curve after t1.
            let retained_survival = match category {
                Category::AltFunc => st2.alt_func * (1.0 - switch) + st2.non * switch,
                Category::Dos | Category::Non => st2.get(category),
            };
            terms.retained += retained;
            terms.retained_surviving += retained * retained_survival;
            terms.lost += lost;
            terms.lost_surviving += lost * st2.get(category);
        }
        terms
    }

    /// `(retained_surviving / lost_surviving) · (lost / retained)`.
    pub fn ratio(&self) -> Result<f64, RatioError> {
        if self.lost_surviving == 0.0 {
            return Err(RatioError::DegenerateMixture(
                RatioBranch::LostThenSurviving,
            ));
        }
        if self.retained == 0.0 {
            return Err(RatioError::DegenerateMixture(RatioBranch::Retained));
        }
        let pratio = (self.retained_surviving / self.lost_surviving) * (self.lost / self.retained);
        if !pratio.is_finite() {
            return Err(RatioError::NonFinite(pratio));
        }
        if pratio <= 0.0 {
            return Err(RatioError::NonPositive(pratio));
        }
        Ok(pratio)
    }
}

/// Probability of surviving to t2 given retention through t1, relative to
/// surviving to t2 given a loss by t1, normalized by the overall
/// retained-to-lost balance at t1.
pub fn pratio(
    st1: &CategorySurvival,
    st2: &CategorySurvival,
    mix: &CategoryMixture,
) -> Result<f64, RatioError> {
    RetentionTerms::new(st1, st2, mix).ratio()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn survival(alt_func: f64, dos: f64, non: f64) -> CategorySurvival {
        CategorySurvival { alt_func, dos, non }
    }

    #[test]
    fn pure_category_without_switch_is_its_own_reference() {
        let st1 = survival(0.8, 0.6, 0.3);
        let st2 = survival(0.7, 0.5, 0.1);
        for (alt, dos, non) in [(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)] {
            let mix = CategoryMixture::new(alt, dos, non, 0.0).expect("valid mixture");
            let value = pratio(&st1, &st2, &mix).expect("non-degenerate");
            assert_relative_eq!(value, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn matches_hand_computed_value() {
        let st1 = survival(0.9, 0.8, 0.5);
        let st2 = survival(0.6, 0.7, 0.2);
        let mix = CategoryMixture::new(0.3, 0.45, 0.25, 0.0).expect("valid mixture");

        let retained = 2.0 * (0.3 * 0.9 + 0.45 * 0.8 + 0.25 * 0.5);
        let retained_surviving = 2.0 * (0.3 * 0.9 * 0.6 + 0.45 * 0.8 * 0.7 + 0.25 * 0.5 * 0.2);
        let lost = 0.1 * 0.3 + 0.2 * 0.45 + 0.5 * 0.25;
        let lost_surviving = 0.1 * 0.3 * 0.6 + 0.2 * 0.45 * 0.7 + 0.5 * 0.25 * 0.2;
        let expected = (retained_surviving / lost_surviving) * (lost / retained);

        let value = pratio(&st1, &st2, &mix).expect("non-degenerate");
        assert_relative_eq!(value, expected, epsilon = 1e-12);
    }

    #[test]
    fn switch_routes_alt_func_retention_through_non_survival() {
        let st1 = survival(0.9, 0.8, 0.5);
        let st2 = survival(0.6, 0.7, 0.2);
        let stay = CategoryMixture::new(0.3, 0.45, 0.25, 0.0).expect("valid mixture");
        let switched = stay.with_switch(1.0).expect("valid mixture");

        let stay_terms = RetentionTerms::new(&st1, &st2, &stay);
        let switched_terms = RetentionTerms::new(&st1, &st2, &switched);
        let alt_ret = 2.0 * 0.3 * 0.9;
        assert_relative_eq!(
            stay_terms.retained_surviving - switched_terms.retained_surviving,
            alt_ret * (0.6 - 0.2),
            epsilon = 1e-12
        );
        // Loss branch is unaffected by switching.
        assert_eq!(stay_terms.lost_surviving, switched_terms.lost_surviving);

        let lower = pratio(&st1, &st2, &switched).expect("non-degenerate");
        let higher = pratio(&st1, &st2, &stay).expect("non-degenerate");
        assert!(lower < higher);
    }

    #[test]
    fn full_retention_of_a_pure_mixture_is_degenerate() {
        let st1 = survival(1.0, 0.8, 0.5);
        let st2 = survival(0.6, 0.7, 0.2);
        let mix = CategoryMixture::new(1.0, 0.0, 0.0, 0.0).expect("valid mixture");
        let err = pratio(&st1, &st2, &mix).expect_err("degenerate mixture");
        assert_eq!(
            err,
            RatioError::DegenerateMixture(RatioBranch::LostThenSurviving)
        );
    }

    #[test]
    fn complete_loss_by_t1_is_degenerate() {
        let st1 = survival(0.0, 0.0, 0.0);
        let st2 = survival(0.6, 0.7, 0.2);
        let mix = CategoryMixture::new(0.3, 0.45, 0.25, 0.0).expect("valid mixture");
        assert_eq!(
            pratio(&st1, &st2, &mix),
            Err(RatioError::DegenerateMixture(RatioBranch::Retained))
        );
    }

    #[test]
    fn vanishing_t2_survival_is_reported() {
        let st1 = survival(0.9, 0.8, 0.5);
        let st2 = survival(0.6, 0.7, 0.0);
        let mix = CategoryMixture::new(0.0, 0.0, 1.0, 0.0).expect("valid mixture");
        let err = pratio(&st1, &st2, &mix).expect_err("degenerate mixture");
        assert_eq!(
            err,
            RatioError::DegenerateMixture(RatioBranch::LostThenSurviving)
        );
    }

    #[test]
    fn vanishing_retained_survival_is_not_a_ratio() {
        let st1 = survival(0.0, 0.5, 1.0);
        let st2 = survival(0.5, 0.5, 0.0);
        let mix = CategoryMixture::new(0.5, 0.0, 0.5, 0.0).expect("valid mixture");
        let terms = RetentionTerms::new(&st1, &st2, &mix);
        assert_eq!(terms.retained_surviving, 0.0);
        assert!(terms.lost_surviving > 0.0);
        assert_eq!(pratio(&st1, &st2, &mix), Err(RatioError::NonPositive(0.0)));
    }

    #[test]
    fn non_finite_survival_input_is_reported() {
        let st1 = survival(0.9, 0.8, 0.5);
        let st2 = survival(0.6, 0.7, f64::NAN);
        let mix = CategoryMixture::new(0.3, 0.45, 0.25, 0.0).expect("valid mixture");
        assert!(matches!(
            pratio(&st1, &st2, &mix),
            Err(RatioError::NonFinite(value)) if value.is_nan()
        ));
    }
}
