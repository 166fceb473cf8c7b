use crate::grid::{GridRow, GridValue};
use crate::survival::SurvivalCurve;
use crate::types::Category;
use itertools::{Itertools, MinMaxResult};
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

const SCATTER_SIZE: (u32, u32) = (1024, 768);
const CURVE_SIZE: (u32, u32) = (960, 640);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Nothing to plot: {0} is empty.")]
    Empty(&'static str),
    #[error("Failed to render plot: {0}")]
    Drawing(String),
}

fn drawing<E: Display>(err: E) -> PlotError {
    PlotError::Drawing(err.to_string())
}

/// Linear ramp through three anchors of the cividis palette.
fn cividis(fraction: f64) -> RGBColor {
    const ANCHORS: [(f64, f64, f64); 3] = [
        (0.0, 34.0, 78.0),
        (124.0, 123.0, 120.0),
        (254.0, 232.0, 56.0),
    ];
    let x = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0) * 2.0
    } else {
        0.0
    };
    let segment = (x.floor() as usize).min(1);
    let local = x - segment as f64;
    let (r0, g0, b0) = ANCHORS[segment];
    let (r1, g1, b1) = ANCHORS[segment + 1];
    let mix = |a: f64, b: f64| (a + (b - a) * local).round() as u8;
    RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

fn category_colour(category: Category) -> RGBColor {
    match category {
        Category::AltFunc => RED,
        Category::Dos => BLUE,
        Category::Non => RGBColor(218, 165, 32),
    }
}

/// Finite bounds of `values`, widened when the range collapses to a point.
fn axis_bounds(values: impl Iterator<Item = f64>, pad: f64) -> Option<(f64, f64)> {
    let (lo, hi) = match values.filter(|v| v.is_finite()).minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    if hi - lo < f64::EPSILON {
        Some((lo - pad, hi + pad))
    } else {
        Some((lo, hi))
    }
}

/// Renders a 3D scatter of `(t1, t2, value)` colour-mapped by value.
pub fn render_surface(
    path: &Path,
    title: &str,
    rows: &[GridRow],
    value: GridValue,
) -> Result<(), PlotError> {
    let times = rows.iter().flat_map(|row| [row.t1, row.t2]);
    let (t_lo, t_hi) = axis_bounds(times, 0.01).ok_or(PlotError::Empty("grid"))?;
    let values = rows.iter().map(|row| row.value(value));
    let (v_lo, v_hi) = axis_bounds(values, 0.5).ok_or(PlotError::Empty("grid"))?;

    let root = SVGBackend::new(path, SCATTER_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    // Plotters treats y as the vertical axis, so the value goes there.
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(20)
        .build_cartesian_3d(t_lo..t_hi, v_lo..v_hi, t_lo..t_hi)
        .map_err(drawing)?;
    chart.with_projection(|mut projection| {
        projection.yaw = 0.8;
        projection.pitch = 0.26;
        projection.scale = 0.85;
        projection.into_matrix()
    });
    chart.configure_axes().draw().map_err(drawing)?;

    let span = v_hi - v_lo;
    let points = rows.iter().filter_map(|row| {
        let v = row.value(value);
        if !v.is_finite() {
            return None;
        }
        let colour = cividis((v - v_lo) / span);
        Some(Circle::new((row.t1, v, row.t2), 2, colour.filled()))
    });
    chart.draw_series(points).map_err(drawing)?;

    root.present().map_err(drawing)?;
    let label = value.label();
    log::debug!("Rendered {title} ({label}) to {}", path.display());
    Ok(())
}

/// Renders survival probability against time for each supplied curve.
pub fn render_curves(path: &Path, title: &str, curves: &[SurvivalCurve]) -> Result<(), PlotError> {
    let times = curves.iter().flat_map(|curve| curve.times().to_vec());
    let (t_lo, t_hi) = axis_bounds(times, 0.01).ok_or(PlotError::Empty("curve set"))?;

    let root = SVGBackend::new(path, CURVE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(t_lo..t_hi, 0.0f64..1.05f64)
        .map_err(drawing)?;
    chart
        .configure_mesh()
        .x_desc("Time Since Duplication Event")
        .y_desc("Proportion Gene Duplicate Copies Surviving")
        .draw()
        .map_err(drawing)?;

    for curve in curves {
        let colour = category_colour(curve.category());
        chart
            .draw_series(LineSeries::new(curve.points(), colour.stroke_width(2)))
            .map_err(drawing)?
            .label(curve.category().label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing)?;

    root.present().map_err(drawing)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridEvaluator;
    use crate::types::CategoryMixture;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn palette_runs_from_dark_to_light() {
        assert_eq!(cividis(0.0), RGBColor(0, 34, 78));
        assert_eq!(cividis(1.0), RGBColor(254, 232, 56));
        assert_eq!(cividis(f64::NAN), RGBColor(0, 34, 78));
    }

    #[test]
    fn collapsed_range_is_widened() {
        assert_eq!(axis_bounds([2.0, 2.0].into_iter(), 0.5), Some((1.5, 2.5)));
        assert_eq!(axis_bounds(std::iter::empty(), 0.5), None);
    }

    #[test]
    fn surface_and_curves_render_to_svg() {
        let dir = tempdir().expect("temporary directory");
        let evaluator = GridEvaluator::default().with_time_points(6);
        let mixture = CategoryMixture::new(0.3, 0.45, 0.25, 0.0).expect("valid mixture");
        let grid = evaluator.evaluate(&mixture).expect("grid evaluates");

        let surface = dir.path().join("surface.svg");
        let rows = grid.rows();
        render_surface(&surface, "Pratio surface", rows, GridValue::LogPratio)
            .expect("render surface");
        let svg = fs::read_to_string(&surface).expect("read surface");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<circle"));

        let curves_path = dir.path().join("curves.svg");
        let curves = evaluator.curves().expect("curves evaluate");
        render_curves(&curves_path, "Survival over Time", &curves).expect("render curves");
        let svg = fs::read_to_string(&curves_path).expect("read curves");
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn empty_grid_is_not_rendered() {
        let dir = tempdir().expect("temporary directory");
        let path = dir.path().join("empty.svg");
        let err = render_surface(&path, "empty", &[], GridValue::Pratio)
            .expect_err("nothing to draw");
        assert!(matches!(err, PlotError::Empty("grid")));
    }
}
