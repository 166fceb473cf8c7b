use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tolerance used when checking that the three category fractions of a mixture sum to one.
pub const MIXTURE_SUM_TOLERANCE: f64 = 1e-9;

/// The functional fate a duplicated gene copy is assumed to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Copies with potential to subfunctionalize or neofunctionalize.
    AltFunc,
    /// Copies retained because of sensitivity to dosage balance.
    Dos,
    /// Copies retained only by chance; their default trajectory is loss.
    Non,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::AltFunc, Category::Dos, Category::Non];

    pub fn label(self) -> &'static str {
        match self {
            Self::AltFunc => "Alt_func",
            Self::Dos => "Dos",
            Self::Non => "Non",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape and rate parameters of one category's survival curve.
///
/// `d` is the asymptotic loss rate and `d + f` the instantaneous rate for fully
/// redundant copies; `b` and `c` shape the transition between the two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardParameters {
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub f: f64,
}

/// A documented parameter regime that a parameter set does not satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeViolation {
    pub category: Category,
    pub requirement: &'static str,
}

impl fmt::Display for RegimeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            category,
            requirement,
        } = self;
        write!(f, "{category} parameters violate `{requirement}`")
    }
}

impl HazardParameters {
    pub const fn new(b: f64, c: f64, d: f64, f: f64) -> Self {
        Self { b, c, d, f }
    }

    /// Lists the documented regime constraints for `category` that these parameters break.
    ///
    /// Out-of-regime parameters still produce finite numbers, they are just
    /// biologically meaningless, so callers decide whether to warn or reject.
    pub fn regime_violations(&self, category: Category) -> Vec<RegimeViolation> {
        let mut broken = Vec::new();
        let mut require = |ok: bool, requirement: &'static str| {
            if !ok {
                broken.push(RegimeViolation {
                    category,
                    requirement,
                });
            }
        };
        match category {
            Category::Non => {
                require(self.b == 0.0, "b = 0");
                require(self.c == 1.0, "c = 1");
                require(self.d > 10.0, "d > 10");
            }
            Category::Dos => {
                require(self.b < 0.0, "b < 0");
                require(self.c > 0.0 && self.c < 1.0, "0 < c < 1");
                let scale = self.d.abs().max(self.f.abs()).max(1.0);
                require((self.d + self.f).abs() <= 1e-6 * scale, "d = -f");
            }
            Category::AltFunc => {
                require(self.b > 0.0, "b > 0");
                require(self.c > 0.0, "c > 0");
                require(self.d > 0.0, "d > 0");
                require(self.f > 0.0, "f > 0");
            }
        }
        broken
    }
}

/// The three parameter sets used together in one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryParameters {
    pub alt_func: HazardParameters,
    pub dos: HazardParameters,
    pub non: HazardParameters,
}

impl Default for CategoryParameters {
    fn default() -> Self {
        Self {
            alt_func: HazardParameters::new(10.0, 2.37, 0.00054, 5.84),
            dos: HazardParameters::new(-17.0, 0.2573, -0.000028, 0.000028),
            non: HazardParameters::new(0.0, 1.0, 20.0, 5.0),
        }
    }
}

impl CategoryParameters {
    pub fn get(&self, category: Category) -> &HazardParameters {
        match category {
            Category::AltFunc => &self.alt_func,
            Category::Dos => &self.dos,
            Category::Non => &self.non,
        }
    }

    pub fn regime_violations(&self) -> Vec<RegimeViolation> {
        Category::ALL
            .iter()
            .flat_map(|&category| self.get(category).regime_violations(category))
            .collect()
    }
}

/// Survival probabilities of the three categories at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategorySurvival {
    pub alt_func: f64,
    pub dos: f64,
    pub non: f64,
}

impl CategorySurvival {
    /// The same probability for every category.
    pub const fn uniform(value: f64) -> Self {
        Self {
            alt_func: value,
            dos: value,
            non: value,
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::AltFunc => self.alt_func,
            Category::Dos => self.dos,
            Category::Non => self.non,
        }
    }
}

/// Errors raised when a category mixture is not a valid composition.
#[derive(Debug, Error, PartialEq)]
pub enum MixtureError {
    #[error("The {name} fraction must lie in [0, 1], got {value}.")]
    FractionOutOfRange { name: &'static str, value: f64 },
    #[error("Category fractions must sum to 1, got {0}.")]
    UnnormalizedFractions(f64),
}

/// Starting-genome composition plus the fraction of Alt_func-retained
/// duplicates that behave like Non duplicates by t2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMixture", into = "RawMixture")]
pub struct CategoryMixture {
    alt_func_percent: f64,
    dos_percent: f64,
    non_percent: f64,
    switch_percent: f64,
}

impl CategoryMixture {
    pub fn new(
        alt_func_percent: f64,
        dos_percent: f64,
        non_percent: f64,
        switch_percent: f64,
    ) -> Result<Self, MixtureError> {
        for (name, value) in [
            ("Alt_func", alt_func_percent),
            ("Dos", dos_percent),
            ("Non", non_percent),
            ("switch", switch_percent),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MixtureError::FractionOutOfRange { name, value });
            }
        }
        let total = alt_func_percent + dos_percent + non_percent;
        if (total - 1.0).abs() > MIXTURE_SUM_TOLERANCE {
            return Err(MixtureError::UnnormalizedFractions(total));
        }
        Ok(Self {
            alt_func_percent,
            dos_percent,
            non_percent,
            switch_percent,
        })
    }

    pub fn alt_func_percent(&self) -> f64 {
        self.alt_func_percent
    }

    pub fn dos_percent(&self) -> f64 {
        self.dos_percent
    }

    pub fn non_percent(&self) -> f64 {
        self.non_percent
    }

    pub fn switch_percent(&self) -> f64 {
        self.switch_percent
    }

    pub fn fraction(&self, category: Category) -> f64 {
        match category {
            Category::AltFunc => self.alt_func_percent,
            Category::Dos => self.dos_percent,
            Category::Non => self.non_percent,
        }
    }

    /// Same composition with a different switch fraction.
    pub fn with_switch(&self, switch_percent: f64) -> Result<Self, MixtureError> {
        Self::new(
            self.alt_func_percent,
            self.dos_percent,
            self.non_percent,
            switch_percent,
        )
    }
}

impl fmt::Display for CategoryMixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% switch, {}% Alt_func, {}% Dos, {}% Non",
            percent_label(self.switch_percent),
            percent_label(self.alt_func_percent),
            percent_label(self.dos_percent),
            percent_label(self.non_percent)
        )
    }
}

/// Renders a fraction as a percentage without float noise, e.g. `0.45 -> "45"`, `0.125 -> "12.5"`.
pub fn percent_label(fraction: f64) -> String {
    let percent = (fraction * 100.0 * 1000.0).round() / 1000.0;
    format!("{}", percent + 0.0)
}

#[derive(Serialize, Deserialize)]
struct RawMixture {
    alt_func: f64,
    dos: f64,
    non: f64,
    #[serde(default)]
    switch: f64,
}

impl TryFrom<RawMixture> for CategoryMixture {
    type Error = MixtureError;

    fn try_from(raw: RawMixture) -> Result<Self, Self::Error> {
        Self::new(raw.alt_func, raw.dos, raw.non, raw.switch)
    }
}

impl From<CategoryMixture> for RawMixture {
    fn from(mixture: CategoryMixture) -> Self {
        Self {
            alt_func: mixture.alt_func_percent,
            dos: mixture.dos_percent,
            non: mixture.non_percent,
            switch: mixture.switch_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_parameters_sit_in_their_regimes() {
        let parameters = CategoryParameters::default();
        assert!(parameters.regime_violations().is_empty());
    }

    #[test]
    fn regime_check_names_each_broken_constraint() {
        let non = HazardParameters::new(1.0, 1.0, 5.0, 5.0);
        let violations = non.regime_violations(Category::Non);
        let requirements: Vec<_> = violations.iter().map(|v| v.requirement).collect();
        assert_eq!(requirements, vec!["b = 0", "d > 10"]);

        let dos = HazardParameters::new(-17.0, 1.5, -0.1, 0.3);
        let requirements: Vec<_> = dos
            .regime_violations(Category::Dos)
            .iter()
            .map(|v| v.requirement)
            .collect();
        assert_eq!(requirements, vec!["0 < c < 1", "d = -f"]);
    }

    #[test]
    fn mixture_rejects_fractions_that_do_not_sum_to_one() {
        let err = CategoryMixture::new(0.5, 0.5, 0.5, 0.0).expect_err("sum is 1.5");
        assert_eq!(err, MixtureError::UnnormalizedFractions(1.5));
    }

    #[test]
    fn mixture_rejects_out_of_range_switch() {
        let err = CategoryMixture::new(0.3, 0.45, 0.25, 1.2).expect_err("switch above one");
        assert!(matches!(
            err,
            MixtureError::FractionOutOfRange { name: "switch", .. }
        ));
    }

    #[test]
    fn mixture_accepts_float_noise_in_published_combinations() {
        let mixture = CategoryMixture::new(0.1, 0.15, 0.75, 0.25).expect("valid mixture");
        assert_eq!(mixture.fraction(Category::Dos), 0.15);
        assert_eq!(
            mixture.to_string(),
            "25% switch, 10% Alt_func, 15% Dos, 75% Non"
        );
    }

    #[test]
    fn percent_labels_drop_float_noise() {
        assert_eq!(percent_label(0.45), "45");
        assert_eq!(percent_label(0.125), "12.5");
        assert_eq!(percent_label(0.0), "0");
    }
}
