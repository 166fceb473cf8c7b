use crate::types::{CategoryMixture, MixtureError, percent_label};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Switch fraction used for the Mutational Opportunity surfaces unless configured otherwise.
pub const DEFAULT_MUTATIONAL_OPPORTUNITY_SWITCH: f64 = 0.25;

/// The fifteen (Alt_func, Dos, Non) compositions of the published surfaces,
/// grouped by Non share: 25%, 50% and 75%.
pub const PUBLISHED_COMPOSITIONS: [(f64, f64, f64); 15] = [
    (0.75, 0.00, 0.25),
    (0.60, 0.15, 0.25),
    (0.45, 0.30, 0.25),
    (0.30, 0.45, 0.25),
    (0.15, 0.60, 0.25),
    (0.00, 0.75, 0.25),
    (0.50, 0.00, 0.50),
    (0.40, 0.10, 0.50),
    (0.30, 0.20, 0.50),
    (0.20, 0.30, 0.50),
    (0.10, 0.40, 0.50),
    (0.00, 0.50, 0.50),
    (0.25, 0.00, 0.75),
    (0.10, 0.15, 0.75),
    (0.00, 0.25, 0.75),
];

/// Composition used for quick single-surface checks.
pub const REFERENCE_COMPOSITION: (f64, f64, f64) = (0.30, 0.45, 0.25);

/// Every duplicate behaves like a Non duplicate.
pub const INDEPENDENCE_COMPOSITION: (f64, f64, f64) = (0.0, 0.0, 1.0);

fn default_switch() -> f64 {
    DEFAULT_MUTATIONAL_OPPORTUNITY_SWITCH
}

/// Competing explanations of which duplicates are retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hypothesis {
    /// Retention is independent of gene identity.
    Independence,
    /// Some genes are intrinsically more duplicable; no reclassification after t1.
    #[default]
    Duplicability,
    /// A fraction of Alt_func-retained duplicates later behaves like Non duplicates.
    MutationalOpportunity {
        #[serde(default = "default_switch")]
        switch: f64,
    },
}

impl Hypothesis {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Independence => "Independence",
            Self::Duplicability => "Duplicability",
            Self::MutationalOpportunity { .. } => "Mutational Opportunity",
        }
    }

    pub fn switch(&self) -> f64 {
        match self {
            Self::Independence | Self::Duplicability => 0.0,
            Self::MutationalOpportunity { switch } => *switch,
        }
    }

    /// Suffix appended to output file stems.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Independence => "_independence",
            Self::Duplicability => "_duplicability",
            Self::MutationalOpportunity { .. } => "_mut_op",
        }
    }

    /// Compositions evaluated for this hypothesis in the published figures.
    pub fn published_compositions(&self) -> Vec<(f64, f64, f64)> {
        match self {
            Self::Independence => vec![INDEPENDENCE_COMPOSITION],
            Self::Duplicability | Self::MutationalOpportunity { .. } => {
                PUBLISHED_COMPOSITIONS.to_vec()
            }
        }
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hypothesis", self.label())
    }
}

/// One mixture evaluated under one hypothesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub hypothesis: Hypothesis,
    pub mixture: CategoryMixture,
}

impl Scenario {
    /// Plot title, e.g.
    /// `25% switch, 30% Alt_func, 45% Dos, 25% Non (Mutational Opportunity Hypothesis)`.
    pub fn title(&self) -> String {
        format!("{} ({})", self.mixture, self.hypothesis)
    }

    /// File stem `{prefix}{alt}_{dos}_{non}{suffix}` with percentages.
    pub fn file_stem(&self, prefix: &str) -> String {
        format!(
            "{prefix}{}_{}_{}{}",
            percent_label(self.mixture.alt_func_percent()),
            percent_label(self.mixture.dos_percent()),
            percent_label(self.mixture.non_percent()),
            self.hypothesis.file_suffix()
        )
    }
}

/// An ordered batch of scenarios sharing one hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSet {
    hypothesis: Hypothesis,
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    /// Builds scenarios from `(Alt_func, Dos, Non)` compositions, taking the
    /// switch fraction from the hypothesis.
    pub fn from_compositions(
        hypothesis: Hypothesis,
        compositions: &[(f64, f64, f64)],
    ) -> Result<Self, MixtureError> {
        let switch = hypothesis.switch();
        let scenarios = compositions
            .iter()
            .map(|&(alt, dos, non)| {
                CategoryMixture::new(alt, dos, non, switch).map(|mixture| Scenario {
                    hypothesis,
                    mixture,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            hypothesis,
            scenarios,
        })
    }

    pub fn published(hypothesis: Hypothesis) -> Result<Self, MixtureError> {
        Self::from_compositions(hypothesis, &hypothesis.published_compositions())
    }

    /// The single reference composition (or the Independence composition).
    pub fn reference(hypothesis: Hypothesis) -> Result<Self, MixtureError> {
        let composition = match hypothesis {
            Hypothesis::Independence => INDEPENDENCE_COMPOSITION,
            _ => REFERENCE_COMPOSITION,
        };
        Self::from_compositions(hypothesis, &[composition])
    }

    pub fn hypothesis(&self) -> Hypothesis {
        self.hypothesis
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
