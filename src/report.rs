//! Diagnostic dumps and flat-file export of a loaded [`ScenarioDataset`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::dataset::ScenarioDataset;
use crate::data::model::{NodeId, PodId, ScenarioId};
use crate::error::{DataError, Result};

/// Column names of the flattened v export, written even when v is empty.
pub const V_EXPORT_HEADER: [&str; 4] = ["Scenario", "DestinationID", "OriginID", "Accessibility_Score"];

/// One row of the flattened v export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VExportRow {
    #[serde(rename = "Scenario")]
    pub scenario: ScenarioId,
    /// Demand node.
    #[serde(rename = "DestinationID")]
    pub destination: NodeId,
    /// POD.
    #[serde(rename = "OriginID")]
    pub origin: PodId,
    #[serde(rename = "Accessibility_Score")]
    pub score: f64,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DataError + '_ {
    move |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> DataError + '_ {
    move |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Scores always carry a fractional part, so `0` is written as `0.0`.
fn score_text(score: f64) -> String {
    if score.is_finite() && score.fract() == 0.0 && score.abs() < 1e16 {
        format!("{score:.1}")
    } else {
        score.to_string()
    }
}

fn write_file<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);
    body(&mut out)
        .and_then(|()| out.flush())
        .map_err(io_error(path))
}

impl ScenarioDataset {
    // -----------------------------------------------------------------------
    // Structure dumps
    // -----------------------------------------------------------------------

    /// Write `v[scenario]` as text, one line per POD:
    /// `<pod> -> {<node>: <score>, ...}`.
    pub fn write_v_structure<W: Write>(&self, scenario: ScenarioId, out: &mut W) -> io::Result<()> {
        let Some(matrix) = self.v(scenario) else {
            return writeln!(out, "Scenario {scenario} not found in the v matrix.");
        };
        writeln!(out, "Scenario {scenario}:")?;
        for pod in matrix.pods() {
            let cells: Vec<String> = matrix
                .row(pod)
                .map(|(node, score)| format!("{node}: {}", score_text(score)))
                .collect();
            writeln!(out, "{pod} -> {{{}}}", cells.join(", "))?;
        }
        Ok(())
    }

    /// Write `v0[scenario]` as text, one `<pod> -> <score>` line per POD.
    pub fn write_v0_structure<W: Write>(&self, scenario: ScenarioId, out: &mut W) -> io::Result<()> {
        let Some(scores) = self.v0(scenario) else {
            return writeln!(out, "Scenario {scenario} not found in the v0 matrix.");
        };
        writeln!(out, "Scenario {scenario}:")?;
        for (pod, score) in scores.iter() {
            writeln!(out, "{pod} -> {}", score_text(score))?;
        }
        Ok(())
    }

    pub fn check_v_structure(&self, scenario: ScenarioId, output_path: &Path) -> Result<()> {
        write_file(output_path, |out| self.write_v_structure(scenario, out))
    }

    pub fn check_v0_structure(&self, scenario: ScenarioId, output_path: &Path) -> Result<()> {
        write_file(output_path, |out| self.write_v0_structure(scenario, out))
    }

    // -----------------------------------------------------------------------
    // Flat export
    // -----------------------------------------------------------------------

    /// Every present v cell, ordered by scenario, destination, origin.
    pub fn v_rows(&self) -> Vec<VExportRow> {
        let mut rows: Vec<VExportRow> = self
            .v_all()
            .iter()
            .flat_map(|(&scenario, matrix)| {
                matrix.entries().map(move |(origin, destination, score)| VExportRow {
                    scenario,
                    destination,
                    origin,
                    score,
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.scenario, r.destination, r.origin));
        rows
    }

    /// Write the flattened v mapping as `;`-separated CSV.
    pub fn export_v_dict(&self, output_path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_path(output_path)
            .map_err(csv_error(output_path))?;
        writer
            .write_record(V_EXPORT_HEADER)
            .map_err(csv_error(output_path))?;
        for row in self.v_rows() {
            writer.serialize(row).map_err(csv_error(output_path))?;
        }
        writer.flush().map_err(io_error(output_path))
    }

    // -----------------------------------------------------------------------
    // Console listing
    // -----------------------------------------------------------------------

    /// List the demands of `scenario` followed by all capacities. Capacities
    /// are not per scenario, so the full K is listed whatever `scenario` is.
    pub fn write_demands_and_capacities<W: Write>(
        &self,
        scenario: ScenarioId,
        out: &mut W,
    ) -> io::Result<()> {
        writeln!(out, "Demands for Scenario {scenario}:")?;
        for (node, demand) in self.scenario_demands(scenario) {
            writeln!(out, "Node ID: {node}, Demand: {demand}")?;
        }

        writeln!(out, "\nCapacities for Scenario {scenario}:")?;
        for (pod, capacity) in self.capacities() {
            writeln!(out, "POD ID: {pod}, Capacity: {capacity}")?;
        }
        Ok(())
    }

    pub fn print_demands_and_capacities(&self, scenario: ScenarioId) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_demands_and_capacities(scenario, &mut out)
    }
}

/// Read a file written by [`ScenarioDataset::export_v_dict`].
pub fn read_v_export(path: &Path) -> Result<Vec<VExportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(csv_error(path))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<VExportRow>, _>>()
        .map_err(csv_error(path))
}
