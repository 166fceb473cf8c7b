use approx::{assert_abs_diff_eq, assert_relative_eq};
use paralog::grid::{GridEvaluator, TimeIndexing};
use paralog::output::{GRID_COLUMNS, read_grid, write_grid};
use paralog::scenario::{Hypothesis, MemorySink, NoopScenarioProgress, ScenarioRunner, ScenarioSet};
use paralog::survival::SurvivalModel;
use paralog::types::{CategoryMixture, CategoryParameters, HazardParameters};
use std::fs;
use tempfile::tempdir;

fn direct_survival(params: &HazardParameters, t: f64, terms: i32) -> f64 {
    let mut summation = 0.0;
    let mut factorial = 1.0;
    for n in 0..terms {
        if n > 0 {
            factorial *= n as f64;
        }
        let exponent = params.c * n as f64 + 1.0;
        summation += (-params.b).powi(n) * t.powf(exponent) / (factorial * exponent);
    }
    (-params.d * t - params.f * summation).exp()
}

#[test]
fn reference_mixture_produces_the_published_surface_layout() {
    let mixture = CategoryMixture::new(0.3, 0.45, 0.25, 0.0).expect("valid mixture");
    let grid = GridEvaluator::default()
        .evaluate(&mixture)
        .expect("grid evaluates");

    assert_eq!(grid.len(), 2601);
    for (k, row) in grid.rows().iter().enumerate() {
        let (i, j) = (k / 51, k % 51);
        assert_abs_diff_eq!(row.t1, (i + 1) as f64 * 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(row.t2, (j + 1) as f64 * 0.01, epsilon = 1e-12);
        assert!(row.pratio.is_finite() && row.pratio > 0.0);
        assert_relative_eq!(row.log_pratio, row.pratio.log10(), max_relative = 1e-12);
    }
}

#[test]
fn non_survival_matches_the_direct_series() {
    let non = CategoryParameters::default().non;
    let model = SurvivalModel::default();
    let expected = direct_survival(&non, 0.5, 100);
    assert_abs_diff_eq!(model.survival_probability(&non, 0.5), expected, epsilon = 1e-12);
    assert_abs_diff_eq!(expected, (-12.5f64).exp(), epsilon = 1e-12);
}

#[test]
fn survival_columns_agree_with_the_model() {
    let parameters = CategoryParameters::default();
    let model = SurvivalModel::default();
    let mixture = CategoryMixture::new(0.3, 0.45, 0.25, 0.25).expect("valid mixture");
    let grid = GridEvaluator::default()
        .with_time_points(11)
        .evaluate(&mixture)
        .expect("grid evaluates");
    let cell = grid.row(4, 9).expect("cell");
    assert_eq!(cell.alt_surv_t1, model.survival_probability(&parameters.alt_func, cell.t1));
    assert_eq!(cell.dos_surv_t2, model.survival_probability(&parameters.dos, cell.t2));
    assert_abs_diff_eq!(
        cell.non_surv_t2,
        direct_survival(&parameters.non, cell.t2, 100),
        epsilon = 1e-12
    );
}

#[test]
fn pure_mixtures_are_neutral() {
    let evaluator = GridEvaluator::default().with_time_points(8);
    for (alt, dos, non) in [(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)] {
        let mixture = CategoryMixture::new(alt, dos, non, 0.0).expect("valid mixture");
        let grid = evaluator.evaluate(&mixture).expect("grid evaluates");
        for row in grid.rows() {
            assert_abs_diff_eq!(row.pratio, 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn saved_table_reads_back_within_tolerance() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("reference.csv");
    let mixture = CategoryMixture::new(0.3, 0.45, 0.25, 0.25).expect("valid mixture");
    let grid = GridEvaluator::default()
        .with_time_points(21)
        .with_indexing(TimeIndexing::FromOrigin)
        .evaluate(&mixture)
        .expect("grid evaluates");
    write_grid(&path, grid.rows()).expect("write table");

    let text = fs::read_to_string(&path).expect("read table");
    assert_eq!(text.lines().next(), Some(GRID_COLUMNS.join(",").as_str()));
    assert_eq!(text.lines().count(), 1 + 21 * 21);

    let restored = read_grid(&path).expect("table reads back");
    assert_eq!(restored.len(), grid.len());
    for (original, read) in grid.rows().iter().zip(&restored) {
        assert_abs_diff_eq!(original.pratio, read.pratio, epsilon = 1e-9);
        assert_abs_diff_eq!(original.alt_surv_t1, read.alt_surv_t1, epsilon = 1e-9);
        assert_abs_diff_eq!(original.non_surv_t2, read.non_surv_t2, epsilon = 1e-9);
        assert_abs_diff_eq!(original.log_pratio, read.log_pratio, epsilon = 1e-9);
    }
}

#[test]
fn batch_results_do_not_depend_on_run_count() {
    let set = ScenarioSet::published(Hypothesis::MutationalOpportunity { switch: 0.25 })
        .expect("valid set");
    let runner = ScenarioRunner::new(GridEvaluator::default().with_time_points(6));
    let mut first = MemorySink::default();
    let mut second = MemorySink::default();
    runner
        .run(&set, &mut first, &mut NoopScenarioProgress)
        .expect("first batch");
    runner
        .run(&set, &mut second, &mut NoopScenarioProgress)
        .expect("second batch");
    assert_eq!(first.grids, second.grids);
}
