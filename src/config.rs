//! Run configuration: where the scenario files of one district live and
//! which scenario combinations to load.
//!
//! ```json
//! {
//!   "method": "MC",
//!   "district": "KADIKÖY",
//!   "scenario_count": 10,
//!   "subset_size": 3,
//!   "base_dir": "/data/slmrnd"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::dataset::{DatasetOptions, ScenarioFiles};
use crate::data::loader::CsvDialect;
use crate::data::model::{SamplingMethod, ScenarioId, Sets};
use crate::error::{DataError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub method: SamplingMethod,
    pub district: String,
    /// Scenarios are numbered `1..=scenario_count`.
    pub scenario_count: u32,
    /// Load every `subset_size`-combination of the scenarios separately.
    /// `None` loads all scenarios at once.
    #[serde(default)]
    pub subset_size: Option<u32>,
    pub base_dir: PathBuf,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub dialect: CsvDialect,
    #[serde(default)]
    pub sets: Sets,
}

impl RunConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: RunConfig =
            serde_json::from_str(text).map_err(|e| DataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scenario_count == 0 {
            return Err(DataError::Config("scenario_count must be at least 1".into()));
        }
        if let Some(k) = self.subset_size {
            if k == 0 || k > self.scenario_count {
                return Err(DataError::Config(format!(
                    "subset_size {k} outside 1..={}",
                    self.scenario_count
                )));
            }
        }
        if self.district.trim().is_empty() {
            return Err(DataError::Config("district is empty".into()));
        }
        Ok(())
    }

    pub fn options(&self) -> DatasetOptions {
        DatasetOptions {
            method: self.method,
            sets: self.sets,
            dialect: self.dialect,
        }
    }

    fn district_slug(&self) -> String {
        self.district.trim().to_lowercase()
    }

    fn gurobi_input_dir(&self) -> PathBuf {
        let m = self.method.label().to_lowercase();
        self.base_dir
            .join("Gurobi_Optimization_SLMRND")
            .join("Input_Data_Files")
            .join(format!("{m}_input_files_gurobi"))
    }

    /// The three input files of every scenario in `1..=scenario_count`.
    pub fn scenario_files(&self) -> ScenarioFiles {
        let method = self.method.label();
        let m = method.to_lowercase();
        let district = self.district_slug();

        let node_dir = self
            .base_dir
            .join("Building_Selection")
            .join(format!("{method}_Building_Selection"))
            .join(format!("{m}_LDC_POD_DemandPoint_csv"));
        let v0_dir = self.gurobi_input_dir().join(format!("{m}_LDC-POD_Matrices"));
        let v_dir = self
            .gurobi_input_dir()
            .join(format!("{m}_POD-DemandPoint_Matrices"));

        let mut files = ScenarioFiles::default();
        for s in 1..=self.scenario_count {
            files.insert(
                s,
                node_dir.join(format!(
                    "{method}_LDC_POD_DemandPoint_{district}_Scenario_{s}.csv"
                )),
                v0_dir.join(format!("{method}_LDC-POD_Matrix_{district}_Scenario_{s}.csv")),
                v_dir.join(format!(
                    "{method}_POD-DemandPoint_Matrix_{district}_Scenario_{s}.csv"
                )),
            );
        }
        files
    }

    /// Where diagnostics and exports go.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .base_dir
                .join("Gurobi_Optimization_SLMRND")
                .join("Output_Data_Files")
                .join(format!(
                    "{}_output_files_gurobi",
                    self.method.label().to_lowercase()
                )),
        }
    }

    /// Scenario groups to load, one dataset each.
    pub fn scenario_subsets(&self) -> Vec<Vec<ScenarioId>> {
        match self.subset_size {
            Some(k) => scenario_combinations(self.scenario_count, k),
            None => vec![(1..=self.scenario_count).collect()],
        }
    }
}

/// All `k`-element subsets of `1..=n` in lexicographic order.
pub fn scenario_combinations(n: u32, k: u32) -> Vec<Vec<ScenarioId>> {
    if k > n {
        return Vec::new();
    }
    let k = k as usize;
    let mut out = Vec::new();
    let mut combo: Vec<ScenarioId> = (1..=k as ScenarioId).collect();
    loop {
        out.push(combo.clone());
        // rightmost position that can still be advanced
        let Some(pos) = (0..k).rev().find(|&i| combo[i] < n - (k - 1 - i) as ScenarioId) else {
            return out;
        };
        combo[pos] += 1;
        for i in pos + 1..k {
            combo[i] = combo[i - 1] + 1;
        }
    }
}
