use crate::ratio::{RatioError, pratio};
use crate::survival::{SURVIVAL_IMMEDIATELY_POST_DUPLICATION, SurvivalCurve, SurvivalModel};
use crate::types::{Category, CategoryMixture, CategoryParameters, CategorySurvival};
use itertools::{Itertools, MinMaxResult};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grid resolution used by the published surfaces.
pub const DEFAULT_TIME_POINTS: usize = 51;

/// Axis values are `index / STEPS_PER_UNIT_TIME`, i.e. a step of 0.01.
pub const STEPS_PER_UNIT_TIME: f64 = 100.0;

/// Where the discrete time axis starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeIndexing {
    /// Index `i` maps to `(i + 1) / 100`; the axis never touches t = 0.
    #[default]
    FromFirstStep,
    /// Index `i` maps to `i / 100`; survival at the first point is replaced
    /// by the near-one [`SURVIVAL_IMMEDIATELY_POST_DUPLICATION`].
    FromOrigin,
}

impl TimeIndexing {
    pub fn time_at(self, index: usize) -> f64 {
        match self {
            Self::FromFirstStep => (index + 1) as f64 / STEPS_PER_UNIT_TIME,
            Self::FromOrigin => index as f64 / STEPS_PER_UNIT_TIME,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("The time axis needs at least one point.")]
    EmptyAxis,
    #[error("{category} survival is not finite at t = {t}.")]
    NonFiniteSurvival { category: Category, t: f64 },
    #[error("Ratio failed at t1 = {t1}, t2 = {t2}: {source}")]
    Cell {
        t1: f64,
        t2: f64,
        #[source]
        source: RatioError,
    },
}

/// Which per-cell quantity to read from a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridValue {
    #[default]
    Pratio,
    LogPratio,
}

impl GridValue {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pratio => "probability ratio",
            Self::LogPratio => "log10 probability ratio",
        }
    }
}

/// One evaluated cell of the (t1, t2) grid, in the persisted column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub t1: f64,
    pub t2: f64,
    pub pratio: f64,
    pub alt_surv_t1: f64,
    pub dos_surv_t1: f64,
    pub non_surv_t1: f64,
    pub alt_surv_t2: f64,
    pub dos_surv_t2: f64,
    pub non_surv_t2: f64,
    #[serde(rename = "log of pratio")]
    pub log_pratio: f64,
}

impl GridRow {
    pub fn evaluate(
        t1: f64,
        st1: &CategorySurvival,
        t2: f64,
        st2: &CategorySurvival,
        mix: &CategoryMixture,
    ) -> Result<Self, GridError> {
        let value = pratio(st1, st2, mix).map_err(|source| GridError::Cell { t1, t2, source })?;
        Ok(Self {
            t1,
            t2,
            pratio: value,
            alt_surv_t1: st1.alt_func,
            dos_surv_t1: st1.dos,
            non_surv_t1: st1.non,
            alt_surv_t2: st2.alt_func,
            dos_surv_t2: st2.dos,
            non_surv_t2: st2.non,
            log_pratio: value.log10(),
        })
    }

    pub fn value(&self, which: GridValue) -> f64 {
        match which {
            GridValue::Pratio => self.pratio,
            GridValue::LogPratio => self.log_pratio,
        }
    }
}

/// Smallest and largest ratio over a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSummary {
    pub min_pratio: f64,
    pub max_pratio: f64,
}

/// The evaluated surface for one mixture. Rows are stored in raster order:
/// t1 ascending in the outer position, t2 ascending in the inner one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionGrid {
    mixture: CategoryMixture,
    time_points: usize,
    rows: Vec<GridRow>,
}

impl RetentionGrid {
    pub fn mixture(&self) -> &CategoryMixture {
        &self.mixture
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell at axis indices `(i, j)`.
    pub fn row(&self, i: usize, j: usize) -> Option<&GridRow> {
        if i >= self.time_points || j >= self.time_points {
            return None;
        }
        self.rows.get(i * self.time_points + j)
    }

    /// Square matrix view: row index follows t1, column index follows t2.
    pub fn value_matrix(&self, which: GridValue) -> Array2<f64> {
        let n = self.time_points;
        Array2::from_shape_fn((n, n), |(i, j)| self.rows[i * n + j].value(which))
    }

    pub fn pratio_matrix(&self) -> Array2<f64> {
        self.value_matrix(GridValue::Pratio)
    }

    pub fn summary(&self) -> GridSummary {
        match self
            .rows
            .iter()
            .map(|row| row.pratio)
            .minmax_by(|a, b| a.total_cmp(b))
        {
            MinMaxResult::NoElements => GridSummary {
                min_pratio: f64::NAN,
                max_pratio: f64::NAN,
            },
            MinMaxResult::OneElement(value) => GridSummary {
                min_pratio: value,
                max_pratio: value,
            },
            MinMaxResult::MinMax(min_pratio, max_pratio) => GridSummary {
                min_pratio,
                max_pratio,
            },
        }
    }
}

/// Evaluates retention surfaces for a fixed model, parameter set and axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEvaluator {
    model: SurvivalModel,
    parameters: CategoryParameters,
    time_points: usize,
    indexing: TimeIndexing,
}

impl Default for GridEvaluator {
    fn default() -> Self {
        Self::new(SurvivalModel::default(), CategoryParameters::default())
    }
}

impl GridEvaluator {
    pub fn new(model: SurvivalModel, parameters: CategoryParameters) -> Self {
        Self {
            model,
            parameters,
            time_points: DEFAULT_TIME_POINTS,
            indexing: TimeIndexing::default(),
        }
    }

    pub fn with_time_points(mut self, time_points: usize) -> Self {
        self.time_points = time_points;
        self
    }

    pub fn with_indexing(mut self, indexing: TimeIndexing) -> Self {
        self.indexing = indexing;
        self
    }

    pub fn parameters(&self) -> &CategoryParameters {
        &self.parameters
    }

    pub fn time_points(&self) -> usize {
        self.time_points
    }

    /// The shared t1/t2 axis.
    pub fn axis(&self) -> Array1<f64> {
        Array1::from_iter((0..self.time_points).map(|i| self.indexing.time_at(i)))
    }

    /// Survival of every category at every axis point, with the near-one
    /// substitution applied to the first point of an origin-based axis.
    pub fn axis_survival(&self) -> Result<Vec<(f64, CategorySurvival)>, GridError> {
        if self.time_points == 0 {
            return Err(GridError::EmptyAxis);
        }
        let mut points = Vec::with_capacity(self.time_points);
        for (index, t) in self.axis().into_iter().enumerate() {
            let survival = if index == 0 && self.indexing == TimeIndexing::FromOrigin {
                CategorySurvival::uniform(SURVIVAL_IMMEDIATELY_POST_DUPLICATION)
            } else {
                let survival = self.survival_at(t);
                if let Some(category) = Category::ALL
                    .into_iter()
                    .find(|&category| !survival.get(category).is_finite())
                {
                    return Err(GridError::NonFiniteSurvival { category, t });
                }
                survival
            };
            points.push((t, survival));
        }
        Ok(points)
    }

    fn survival_at(&self, t: f64) -> CategorySurvival {
        let model = &self.model;
        let parameters = &self.parameters;
        CategorySurvival {
            alt_func: model.survival_probability(&parameters.alt_func, t),
            dos: model.survival_probability(&parameters.dos, t),
            non: model.survival_probability(&parameters.non, t),
        }
    }

    /// Survival curves of the three categories on the grid axis, matching the
    /// survival columns written with each grid row.
    pub fn curves(&self) -> Result<Vec<SurvivalCurve>, GridError> {
        let points = self.axis_survival()?;
        let times = Array1::from_iter(points.iter().map(|(t, _)| *t));
        Ok(Category::ALL
            .into_iter()
            .map(|category| {
                let probabilities =
                    Array1::from_iter(points.iter().map(|(_, survival)| survival.get(category)));
                SurvivalCurve::from_parts(category, times.clone(), probabilities)
            })
            .collect())
    }

    /// Evaluates the full `time_points × time_points` surface for `mix`.
    ///
    /// t1 rows are computed in parallel and concatenated in axis order, so the
    /// result is always in raster order.
    pub fn evaluate(&self, mix: &CategoryMixture) -> Result<RetentionGrid, GridError> {
        let points = self.axis_survival()?;
        let blocks: Vec<Vec<GridRow>> = points
            .par_iter()
            .map(|(t1, st1)| {
                points
                    .iter()
                    .map(|(t2, st2)| GridRow::evaluate(*t1, st1, *t2, st2, mix))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rows: Vec<GridRow> = blocks.into_iter().flatten().collect();
        log::debug!(
            "Evaluated {} grid cells for {} with {} series terms",
            rows.len(),
            mix,
            self.model.truncation()
        );
        Ok(RetentionGrid {
            mixture: *mix,
            time_points: self.time_points,
            rows,
        })
    }
}
