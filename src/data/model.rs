use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Scenario identifier (key of the input path maps).
pub type ScenarioId = u32;
/// Demand-node identifier, element of set I.
pub type NodeId = u32;
/// Candidate facility (POD) identifier, element of set J.
pub type PodId = u32;

// ---------------------------------------------------------------------------
// Sets – the fixed index ranges of the model
// ---------------------------------------------------------------------------

/// Index sets of the SLMRND model.
///
/// Both ranges start at 1 and are independent of how many rows the input
/// files actually contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sets {
    /// |I|: demand nodes are `1..=demand_nodes`.
    pub demand_nodes: u32,
    /// |J|: candidate PODs are `1..=pods`.
    pub pods: u32,
    /// C: maximum number of PODs to open.
    pub max_open_pods: u32,
}

impl Default for Sets {
    fn default() -> Self {
        Self {
            demand_nodes: 950,
            pods: 173,
            max_open_pods: 100,
        }
    }
}

impl Sets {
    pub fn demand_node_ids(&self) -> RangeInclusive<NodeId> {
        1..=self.demand_nodes
    }

    pub fn pod_ids(&self) -> RangeInclusive<PodId> {
        1..=self.pods
    }

    pub fn is_demand_node(&self, id: NodeId) -> bool {
        self.demand_node_ids().contains(&id)
    }

    pub fn is_pod(&self, id: PodId) -> bool {
        self.pod_ids().contains(&id)
    }
}

// ---------------------------------------------------------------------------
// NodeTable – one node file
// ---------------------------------------------------------------------------

/// The two columns of a node file the model cares about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRow {
    /// `None` when the cell was empty or not a number.
    pub area: Option<f64>,
    /// Missing demand is already replaced by 0.
    pub demand: f64,
}

/// Parsed node file. Row `k` (0-based) describes node id `k + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable {
    pub rows: Vec<NodeRow>,
}

impl NodeTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a 1-based node id.
    pub fn get(&self, id: NodeId) -> Option<&NodeRow> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.rows.get(idx)
    }

    /// `(node id, row)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeRow)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (idx as NodeId + 1, row))
    }

    pub fn total_demand(&self) -> f64 {
        self.rows.iter().map(|r| r.demand).sum()
    }
}

// ---------------------------------------------------------------------------
// PodScores – v0[s], one score per POD
// ---------------------------------------------------------------------------

/// LDC → POD accessibility for one scenario.
///
/// Holds exactly one score per POD in J; PODs missing from the source file
/// keep the initial score of 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PodScores {
    scores: Vec<f64>,
}

impl PodScores {
    pub fn new(sets: &Sets) -> Self {
        Self {
            scores: vec![0.0; sets.pods as usize],
        }
    }

    /// Overwrite the score of `pod`. Returns `false` (and does nothing) for
    /// ids outside J.
    pub fn set(&mut self, pod: PodId, score: f64) -> bool {
        match self.slot(pod) {
            Some(idx) => {
                self.scores[idx] = score;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, pod: PodId) -> Option<f64> {
        self.slot(pod).map(|idx| self.scores[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (PodId, f64)> + '_ {
        self.scores
            .iter()
            .enumerate()
            .map(|(idx, &s)| (idx as PodId + 1, s))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn slot(&self, pod: PodId) -> Option<usize> {
        let idx = usize::try_from(pod).ok()?.checked_sub(1)?;
        (idx < self.scores.len()).then_some(idx)
    }
}

// ---------------------------------------------------------------------------
// AccessibilityMatrix – v[s], POD × demand node
// ---------------------------------------------------------------------------

/// POD → demand node accessibility for one scenario.
///
/// Pre-sized |J| × |I| table. A cell is `None` until the source file provides
/// a score for that pair; [`score`](Self::score) reads missing cells as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessibilityMatrix {
    pods: usize,
    demand_nodes: usize,
    cells: Vec<Option<f64>>,
}

impl AccessibilityMatrix {
    pub fn new(sets: &Sets) -> Self {
        let pods = sets.pods as usize;
        let demand_nodes = sets.demand_nodes as usize;
        Self {
            pods,
            demand_nodes,
            cells: vec![None; pods * demand_nodes],
        }
    }

    /// Store a score. Pairs outside J × I are rejected with `false`.
    pub fn insert(&mut self, pod: PodId, node: NodeId, score: f64) -> bool {
        match self.slot(pod, node) {
            Some(idx) => {
                self.cells[idx] = Some(score);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, pod: PodId, node: NodeId) -> Option<f64> {
        self.slot(pod, node).and_then(|idx| self.cells[idx])
    }

    pub fn score(&self, pod: PodId, node: NodeId) -> f64 {
        self.get(pod, node).unwrap_or(0.0)
    }

    /// Present `(node, score)` cells of one POD, ascending by node.
    pub fn row(&self, pod: PodId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        let range = match self.slot(pod, 1) {
            Some(start) => start..start + self.demand_nodes,
            None => 0..0,
        };
        self.cells[range]
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.map(|s| (idx as NodeId + 1, s)))
    }

    /// All present `(pod, node, score)` triples, POD-major.
    pub fn entries(&self) -> impl Iterator<Item = (PodId, NodeId, f64)> + '_ {
        let width = self.demand_nodes.max(1);
        self.cells.iter().enumerate().filter_map(move |(idx, cell)| {
            cell.map(|s| ((idx / width) as PodId + 1, (idx % width) as NodeId + 1, s))
        })
    }

    /// PODs with at least one present cell, ascending.
    pub fn pods(&self) -> impl Iterator<Item = PodId> + '_ {
        (1..=self.pods as PodId).filter(move |&j| self.row(j).next().is_some())
    }

    /// Number of present cells.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    fn slot(&self, pod: PodId, node: NodeId) -> Option<usize> {
        let j = usize::try_from(pod).ok()?.checked_sub(1)?;
        let i = usize::try_from(node).ok()?.checked_sub(1)?;
        (j < self.pods && i < self.demand_nodes).then_some(j * self.demand_nodes + i)
    }
}

// ---------------------------------------------------------------------------
// SamplingMethod – label of the scenario generator
// ---------------------------------------------------------------------------

/// How the scenarios were sampled. Only a label; loading is identical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum SamplingMethod {
    /// Latin Hypercube Sampling.
    #[default]
    #[serde(rename = "LHS")]
    Lhs,
    /// Monte Carlo.
    #[serde(rename = "MC")]
    Mc,
}

impl SamplingMethod {
    pub fn label(&self) -> &'static str {
        match self {
            SamplingMethod::Lhs => "LHS",
            SamplingMethod::Mc => "MC",
        }
    }
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SamplingMethod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LHS" => Ok(SamplingMethod::Lhs),
            "MC" => Ok(SamplingMethod::Mc),
            _ => Err(DataError::UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for SamplingMethod {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
