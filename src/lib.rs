//! Scenario inputs for the two-stage stochastic SLMRND facility-location
//! model (Balcik et al. 2016).
//!
//! For every demand scenario three CSV files are read: the node table (area
//! and demand per node), the LDC → POD accessibility matrix `v0` and the
//! POD → demand point matrix `v`. [`ScenarioDataset`] turns them into the
//! sets and parameters an optimization model is built from.

pub mod config;
pub mod data;
pub mod error;
pub mod report;

pub use data::dataset::{DatasetOptions, ScenarioDataset, ScenarioFiles};
pub use error::DataError;
