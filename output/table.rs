//! Columnar text formats for evaluated grids and survival curves.
//!
//! The row table is the format consumed by the downstream plotting tools; its
//! header names and column order must not change.

use crate::grid::GridRow;
use crate::survival::SurvivalCurve;
use crate::types::Category;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Header of the per-cell row table, in column order.
pub const GRID_COLUMNS: [&str; 10] = [
    "t1",
    "t2",
    "pratio",
    "alt_surv_t1",
    "dos_surv_t1",
    "non_surv_t1",
    "alt_surv_t2",
    "dos_surv_t2",
    "non_surv_t2",
    "log of pratio",
];

/// Header of the survival curve table.
pub const CURVE_COLUMNS: [&str; 4] = ["time", "alt_surv", "dos_surv", "non_surv"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read or write table file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed CSV content: {0}")]
    Csv(#[from] csv::Error),
    #[error("Table header {found:?} does not match the expected columns {expected:?}.")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("No survival curve was supplied for the {0} category.")]
    MissingCurve(Category),
    #[error("Survival curves disagree on their time axis.")]
    CurveAxisMismatch,
}

/// Writes grid rows, header first, in the order given.
pub fn write_grid_rows<W: Write>(writer: W, rows: &[GridRow]) -> Result<(), TableError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(GRID_COLUMNS)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_grid(path: impl AsRef<Path>, rows: &[GridRow]) -> Result<(), TableError> {
    let file = BufWriter::new(File::create(path)?);
    write_grid_rows(file, rows)
}

/// Reads a row table back, rejecting files whose header differs from [`GRID_COLUMNS`].
pub fn read_grid_rows<R: Read>(reader: R) -> Result<Vec<GridRow>, TableError> {
    let mut csv = csv::Reader::from_reader(reader);
    let found: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
    if found != GRID_COLUMNS {
        return Err(TableError::HeaderMismatch {
            expected: GRID_COLUMNS.iter().map(|c| c.to_string()).collect(),
            found,
        });
    }
    let mut rows = Vec::new();
    for record in csv.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

pub fn read_grid(path: impl AsRef<Path>) -> Result<Vec<GridRow>, TableError> {
    let file = BufReader::new(File::open(path)?);
    read_grid_rows(file)
}

/// Writes a square value matrix without a header, one line per t1.
pub fn write_matrix_rows<W: Write>(
    writer: W,
    matrix: ArrayView2<'_, f64>,
) -> Result<(), TableError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in matrix.rows() {
        csv.serialize(row.to_vec())?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_matrix(path: impl AsRef<Path>, matrix: ArrayView2<'_, f64>) -> Result<(), TableError> {
    let file = BufWriter::new(File::create(path)?);
    write_matrix_rows(file, matrix)
}

#[derive(Debug, Serialize, Deserialize)]
struct CurveRow {
    time: f64,
    alt_surv: f64,
    dos_surv: f64,
    non_surv: f64,
}

/// Writes the three category curves side by side on their shared time axis.
pub fn write_curve_rows<W: Write>(writer: W, curves: &[SurvivalCurve]) -> Result<(), TableError> {
    let find = |category: Category| {
        curves
            .iter()
            .find(|curve| curve.category() == category)
            .ok_or(TableError::MissingCurve(category))
    };
    let alt = find(Category::AltFunc)?;
    let dos = find(Category::Dos)?;
    let non = find(Category::Non)?;
    if alt.times() != dos.times() || alt.times() != non.times() {
        return Err(TableError::CurveAxisMismatch);
    }

    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(CURVE_COLUMNS)?;
    for (i, &time) in alt.times().iter().enumerate() {
        csv.serialize(CurveRow {
            time,
            alt_surv: alt.probabilities()[i],
            dos_surv: dos.probabilities()[i],
            non_surv: non.probabilities()[i],
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_curves(path: impl AsRef<Path>, curves: &[SurvivalCurve]) -> Result<(), TableError> {
    let file = BufWriter::new(File::create(path)?);
    write_curve_rows(file, curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridEvaluator;
    use crate::types::CategoryMixture;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn small_grid_rows() -> Vec<GridRow> {
        let mixture = CategoryMixture::new(0.3, 0.45, 0.25, 0.25).expect("valid mixture");
        GridEvaluator::default()
            .with_time_points(6)
            .evaluate(&mixture)
            .expect("grid evaluates")
            .rows()
            .to_vec()
    }

    #[test]
    fn header_row_comes_first() {
        let mut buffer = Vec::new();
        write_grid_rows(&mut buffer, &small_grid_rows()).expect("write rows");
        let text = String::from_utf8(buffer).expect("utf8");
        let first_line = text.lines().next().expect("header");
        assert_eq!(
            first_line,
            "t1,t2,pratio,alt_surv_t1,dos_surv_t1,non_surv_t1,alt_surv_t2,dos_surv_t2,non_surv_t2,log of pratio"
        );
        assert_eq!(text.lines().count(), 1 + 36);
    }

    #[test]
    fn rows_survive_a_round_trip() {
        let rows = small_grid_rows();
        let mut buffer = Vec::new();
        write_grid_rows(&mut buffer, &rows).expect("write rows");
        let restored = read_grid_rows(buffer.as_slice()).expect("read rows");
        assert_eq!(restored.len(), rows.len());
        for (original, read) in rows.iter().zip(&restored) {
            assert_abs_diff_eq!(original.t1, read.t1, epsilon = 1e-9);
            assert_abs_diff_eq!(original.t2, read.t2, epsilon = 1e-9);
            assert_abs_diff_eq!(original.pratio, read.pratio, epsilon = 1e-9);
            assert_abs_diff_eq!(original.log_pratio, read.log_pratio, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_grid_still_writes_header() {
        let mut buffer = Vec::new();
        write_grid_rows(&mut buffer, &[]).expect("write rows");
        let restored = read_grid_rows(buffer.as_slice()).expect("read rows");
        assert!(restored.is_empty());
    }

    #[test]
    fn foreign_header_is_rejected() {
        let content = "t1,t2,ratio\n0.01,0.01,1.0\n";
        let err = read_grid_rows(content.as_bytes()).expect_err("header mismatch");
        assert!(matches!(err, TableError::HeaderMismatch { .. }));
    }

    #[test]
    fn matrix_rows_have_no_header() {
        let matrix = array![[1.0, 2.5], [0.5, 4.0]];
        let mut buffer = Vec::new();
        write_matrix_rows(&mut buffer, matrix.view()).expect("write matrix");
        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(text, "1.0,2.5\n0.5,4.0\n");
    }

    #[test]
    fn curves_are_written_side_by_side() {
        let curves = GridEvaluator::default()
            .with_time_points(4)
            .curves()
            .expect("curves evaluate");
        let mut buffer = Vec::new();
        write_curve_rows(&mut buffer, &curves).expect("write curves");
        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "time,alt_surv,dos_surv,non_surv");
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("0.01,"));
    }

    #[test]
    fn curve_table_needs_every_category() {
        let curves = GridEvaluator::default()
            .with_time_points(4)
            .curves()
            .expect("curves evaluate");
        let err = write_curve_rows(Vec::new(), &curves[..2]).expect_err("Non curve missing");
        assert!(matches!(err, TableError::MissingCurve(Category::Non)));
    }
}
