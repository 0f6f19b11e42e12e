//! Best-accuracy table across model families and activation variants

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::runner::AccuracyCurves;
use crate::model::Activation;
use crate::utils::charts::{generate_line_chart, DataSeries, PALETTE};
use crate::utils::error::{LabError, Result};

/// Best test accuracy of one model family, one cell per activation column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub family: String,
    pub cells: Vec<f64>,
}

/// Result table: rows are model families, columns are activation variants
///
/// Cells hold the best test accuracy seen so far and never decrease.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTable {
    rows: Vec<TableRow>,
}

impl AccuracyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column headers, in order
    pub fn columns() -> [&'static str; 3] {
        Activation::ALL.map(|a| a.column())
    }

    /// Merge `curves` into the row for `family` and write its chart
    ///
    /// Returns the path of the written SVG chart.
    pub fn add(
        &mut self,
        family: &str,
        curves: &AccuracyCurves,
        params: &[(String, String)],
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let test_curves: Vec<&[f64]> = Activation::ALL
            .iter()
            .filter_map(|a| curves.get(&format!("{}_test", a.key())))
            .collect();
        if test_curves.len() != Activation::ALL.len() {
            return Err(LabError::ColumnMismatch {
                expected: Activation::ALL.len(),
                actual: test_curves.len(),
            });
        }

        let row = self.row_mut(family);
        for (cell, curve) in row.cells.iter_mut().zip(&test_curves) {
            if let Some(best) = curve.iter().copied().reduce(f64::max) {
                if best > *cell {
                    *cell = best;
                }
            }
        }

        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}.svg", chart_file_stem(family, params)));
        generate_line_chart(
            &format!("Activation function comparison ({})", family),
            "Epoch",
            "Accuracy(%)",
            &chart_series(curves),
            &path,
        )?;
        info!("Chart saved to {}", path.display());

        Ok(path)
    }

    fn row_mut(&mut self, family: &str) -> &mut TableRow {
        let index = match self.rows.iter().position(|r| r.family == family) {
            Some(index) => index,
            None => {
                self.rows.push(TableRow {
                    family: family.to_string(),
                    cells: vec![0.0; Activation::ALL.len()],
                });
                self.rows.len() - 1
            }
        };
        &mut self.rows[index]
    }

    /// Best recorded accuracy for a family and activation
    pub fn best(&self, family: &str, activation: Activation) -> Option<f64> {
        let column = Activation::ALL.iter().position(|a| *a == activation)?;
        self.rows
            .iter()
            .find(|r| r.family == family)
            .map(|r| r.cells[column])
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Printable table preceded by a `key: value, ...` parameter line
    pub fn render(&self, params: &[(String, String)]) -> String {
        let header_line = params
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        let label_width = self
            .rows
            .iter()
            .map(|r| r.family.len())
            .max()
            .unwrap_or(0)
            .max(6);

        let mut out = format!("\n{}\n\n", header_line);
        out.push_str(&" ".repeat(label_width));
        for column in Self::columns() {
            out.push_str(&format!("  {:>12}", column.bold()));
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("{:<width$}", row.family.cyan(), width = label_width));
            for cell in &row.cells {
                out.push_str(&format!("  {:>12.2}", cell));
            }
            out.push('\n');
        }
        out
    }

    pub fn show(&self, params: &[(String, String)]) {
        println!("{}", self.render(params));
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// `<family>_<k>=<v>, <k>=<v>`, or just the family without parameters
pub fn chart_file_stem(family: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return family.to_string();
    }
    let joined = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}_{}", family, joined)
}

fn chart_series(curves: &AccuracyCurves) -> Vec<DataSeries> {
    let models = curves.models();
    curves
        .series()
        .into_iter()
        .map(|(key, values)| {
            let name = key
                .strip_suffix("_train")
                .or_else(|| key.strip_suffix("_test"))
                .unwrap_or(&key);
            let color_index = models.iter().position(|m| m.name == name).unwrap_or(0);
            DataSeries {
                dashed: key.ends_with("_test"),
                name: key,
                values: values.to_vec(),
                color: PALETTE[color_index % PALETTE.len()].to_string(),
            }
        })
        .collect()
}
