/// Data layer: model types, file loading, derived parameters.
///
/// Architecture:
/// ```text
///  nodes / v0 / v  (.csv, one set per scenario)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + coerce + normalize → NodeTable, PodScores, AccessibilityMatrix
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ ScenarioDataset │  S, p, d, v0, v, O_max, K
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ coverage  │  τ search over v
///   └──────────┘
/// ```

pub mod coverage;
pub mod dataset;
pub mod loader;
pub mod model;
