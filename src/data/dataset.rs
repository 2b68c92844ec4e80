use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, info};

use super::coverage::{self, DEFAULT_TARGET_COVERAGE};
use super::loader::{self, CsvDialect};
use super::model::{
    AccessibilityMatrix, NodeId, NodeTable, PodId, PodScores, SamplingMethod, ScenarioId, Sets,
};
use crate::error::{DataError, Result};

/// Headroom applied on top of the proportional capacity share.
pub const CAPACITY_FACTOR: f64 = 1.0;

/// POD whose capacity is always zero.
pub const CLOSED_POD: PodId = 1;

// ---------------------------------------------------------------------------
// ScenarioFiles – the three per-scenario path maps
// ---------------------------------------------------------------------------

/// Input files of every scenario, keyed by scenario id.
///
/// The node map decides which scenarios exist; the v0 and v maps must cover
/// the same keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioFiles {
    pub nodes: BTreeMap<ScenarioId, PathBuf>,
    pub v0: BTreeMap<ScenarioId, PathBuf>,
    pub v: BTreeMap<ScenarioId, PathBuf>,
}

impl ScenarioFiles {
    pub fn insert(
        &mut self,
        scenario: ScenarioId,
        nodes: impl Into<PathBuf>,
        v0: impl Into<PathBuf>,
        v: impl Into<PathBuf>,
    ) {
        self.nodes.insert(scenario, nodes.into());
        self.v0.insert(scenario, v0.into());
        self.v.insert(scenario, v.into());
    }

    /// Scenario ids, ascending.
    pub fn scenarios(&self) -> Vec<ScenarioId> {
        self.nodes.keys().copied().collect()
    }

    /// Restrict all three maps to `scenarios`. Unknown ids are skipped.
    pub fn subset(&self, scenarios: &[ScenarioId]) -> Self {
        let pick = |map: &BTreeMap<ScenarioId, PathBuf>| {
            scenarios
                .iter()
                .filter_map(|s| map.get(s).map(|p| (*s, p.clone())))
                .collect()
        };
        Self {
            nodes: pick(&self.nodes),
            v0: pick(&self.v0),
            v: pick(&self.v),
        }
    }

    fn path<'a>(
        map: &'a BTreeMap<ScenarioId, PathBuf>,
        kind: &'static str,
        scenario: ScenarioId,
    ) -> Result<&'a Path> {
        map.get(&scenario)
            .map(PathBuf::as_path)
            .ok_or(DataError::MissingScenarioFile { kind, scenario })
    }
}

/// Knobs that are fixed for the lifetime of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DatasetOptions {
    pub method: SamplingMethod,
    pub sets: Sets,
    pub dialect: CsvDialect,
}

// ---------------------------------------------------------------------------
// ScenarioDataset
// ---------------------------------------------------------------------------

/// All per-scenario inputs of the SLMRND model, loaded once and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct ScenarioDataset {
    method: SamplingMethod,
    sets: Sets,
    /// S, ascending.
    scenarios: Vec<ScenarioId>,
    /// p[s]
    probabilities: BTreeMap<ScenarioId, f64>,
    /// Node table of the first scenario; source of the POD areas.
    nodes: NodeTable,
    /// d[(s, i)]
    demands: BTreeMap<(ScenarioId, NodeId), f64>,
    v0: BTreeMap<ScenarioId, PodScores>,
    v: BTreeMap<ScenarioId, AccessibilityMatrix>,
    /// O_max[s]
    max_supply: BTreeMap<ScenarioId, f64>,
    /// K[j]
    capacities: BTreeMap<PodId, f64>,
    tau: OnceLock<f64>,
}

impl ScenarioDataset {
    /// Load with the default sets, European CSV dialect and LHS label.
    pub fn load(files: &ScenarioFiles) -> Result<Self> {
        Self::load_with(files, DatasetOptions::default())
    }

    pub fn load_with(files: &ScenarioFiles, options: DatasetOptions) -> Result<Self> {
        let DatasetOptions {
            method,
            sets,
            dialect,
        } = options;

        let scenarios = files.scenarios();
        let first = *scenarios.first().ok_or(DataError::NoScenarios)?;
        let probability = 1.0 / scenarios.len() as f64;
        let probabilities = scenarios.iter().map(|&s| (s, probability)).collect();

        info!(
            "loading {} {method} scenarios ({} demand nodes, {} PODs)",
            scenarios.len(),
            sets.demand_nodes,
            sets.pods
        );

        let nodes =
            loader::load_and_process_nodes(ScenarioFiles::path(&files.nodes, "node", first)?, &dialect)?;

        let mut demands = BTreeMap::new();
        let mut v0 = BTreeMap::new();
        let mut v = BTreeMap::new();
        let mut max_supply = BTreeMap::new();

        for &s in &scenarios {
            let reloaded;
            let table = if s == first {
                &nodes
            } else {
                reloaded = loader::load_and_process_nodes(
                    ScenarioFiles::path(&files.nodes, "node", s)?,
                    &dialect,
                )?;
                &reloaded
            };

            demands.extend(get_demands(table, s));
            max_supply.insert(s, table.total_demand());

            let v0_s = loader::load_v0_matrix(ScenarioFiles::path(&files.v0, "v0", s)?, &sets, &dialect)?;
            v0.insert(s, v0_s);

            let v_s = loader::load_v_matrix(ScenarioFiles::path(&files.v, "v", s)?, &sets, &dialect)?;
            debug!("scenario {s}: {} POD → node scores", v_s.len());
            v.insert(s, v_s);
        }

        let capacities = calculate_capacity_upper_bound(&nodes, &sets, &max_supply)?;

        info!(
            "loaded {} demand entries, {} capacities",
            demands.len(),
            capacities.len()
        );

        Ok(Self {
            method,
            sets,
            scenarios,
            probabilities,
            nodes,
            demands,
            v0,
            v,
            max_supply,
            capacities,
            tau: OnceLock::new(),
        })
    }

    // -- read-only views --

    pub fn method(&self) -> SamplingMethod {
        self.method
    }

    pub fn sets(&self) -> &Sets {
        &self.sets
    }

    pub fn scenarios(&self) -> &[ScenarioId] {
        &self.scenarios
    }

    pub fn probabilities(&self) -> &BTreeMap<ScenarioId, f64> {
        &self.probabilities
    }

    pub fn probability(&self, scenario: ScenarioId) -> Option<f64> {
        self.probabilities.get(&scenario).copied()
    }

    /// The canonical node table (first scenario).
    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn demands(&self) -> &BTreeMap<(ScenarioId, NodeId), f64> {
        &self.demands
    }

    pub fn demand(&self, scenario: ScenarioId, node: NodeId) -> Option<f64> {
        self.demands.get(&(scenario, node)).copied()
    }

    /// Demand entries of one scenario, ascending by node.
    pub fn scenario_demands(&self, scenario: ScenarioId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.demands
            .range((scenario, NodeId::MIN)..=(scenario, NodeId::MAX))
            .map(|(&(_, node), &d)| (node, d))
    }

    pub fn v0(&self, scenario: ScenarioId) -> Option<&PodScores> {
        self.v0.get(&scenario)
    }

    pub fn v0_all(&self) -> &BTreeMap<ScenarioId, PodScores> {
        &self.v0
    }

    pub fn v(&self, scenario: ScenarioId) -> Option<&AccessibilityMatrix> {
        self.v.get(&scenario)
    }

    pub fn v_all(&self) -> &BTreeMap<ScenarioId, AccessibilityMatrix> {
        &self.v
    }

    pub fn max_supply(&self) -> &BTreeMap<ScenarioId, f64> {
        &self.max_supply
    }

    pub fn capacities(&self) -> &BTreeMap<PodId, f64> {
        &self.capacities
    }

    pub fn capacity(&self, pod: PodId) -> Option<f64> {
        self.capacities.get(&pod).copied()
    }

    /// Recompute K from the stored node table and supplies.
    pub fn calculate_capacity_upper_bound(&self) -> Result<BTreeMap<PodId, f64>> {
        calculate_capacity_upper_bound(&self.nodes, &self.sets, &self.max_supply)
    }

    // -- coverage threshold --

    pub fn find_optimal_tau(&self, target_coverage: f64, tau_range: &[f64]) -> Result<f64> {
        coverage::find_optimal_tau(self.v.values(), &self.sets, target_coverage, tau_range)
    }

    /// τ for the default target and range, computed on first use.
    pub fn tau(&self) -> f64 {
        *self.tau.get_or_init(|| {
            let range = coverage::default_tau_range();
            let (tau, _) = coverage::tau_deviations(
                self.v.values(),
                &self.sets,
                DEFAULT_TARGET_COVERAGE,
                &range,
            )
            .into_iter()
            .fold((0.0, f64::INFINITY), |best, (tau, dev)| {
                if dev < best.1 {
                    (tau, dev)
                } else {
                    best
                }
            });
            info!("coverage threshold tau = {tau}");
            tau
        })
    }

    /// τ if [`tau`](Self::tau) has already run.
    pub fn tau_if_computed(&self) -> Option<f64> {
        self.tau.get().copied()
    }
}

// ---------------------------------------------------------------------------
// Derived parameters
// ---------------------------------------------------------------------------

/// Demands of one node table keyed by `(scenario, 1-based row)`.
pub fn get_demands(table: &NodeTable, scenario: ScenarioId) -> BTreeMap<(ScenarioId, NodeId), f64> {
    table
        .iter()
        .map(|(node, row)| ((scenario, node), row.demand))
        .collect()
}

/// Capacity upper bound K[j] for every POD present in the node table.
///
/// Each POD gets its share of the total POD area times the largest scenario
/// supply. Missing areas count as 0. POD [`CLOSED_POD`] is then forced to 0.
pub fn calculate_capacity_upper_bound(
    nodes: &NodeTable,
    sets: &Sets,
    max_supply: &BTreeMap<ScenarioId, f64>,
) -> Result<BTreeMap<PodId, f64>> {
    let pod_areas: Vec<(PodId, f64)> = sets
        .pod_ids()
        .filter_map(|j| nodes.get(j).map(|row| (j, row.area.unwrap_or(0.0))))
        .collect();

    let total: f64 = pod_areas.iter().map(|(_, area)| area).sum();
    if !(total > 0.0) {
        return Err(DataError::ZeroPodArea { total });
    }

    let max_o = max_supply.values().copied().reduce(f64::max).unwrap_or(0.0);
    debug!("capacity scaling: total POD area {total}, max supply {max_o}");

    let mut capacities: BTreeMap<PodId, f64> = pod_areas
        .into_iter()
        .map(|(j, area)| (j, area / total * max_o * CAPACITY_FACTOR))
        .collect();
    if sets.is_pod(CLOSED_POD) {
        capacities.insert(CLOSED_POD, 0.0);
    }
    Ok(capacities)
}
