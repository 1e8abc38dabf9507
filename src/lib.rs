mod bin;
mod divergence;
mod forest;
mod histogram;
mod node;
mod sampler;
#[cfg(test)]
mod testing;

// Modules
pub mod binning;
pub mod config;
pub mod constants;
pub mod data;
pub mod drf;
pub mod errors;
pub mod metric;
pub mod model;
pub mod splitter;
pub mod tree;
pub mod utils;
pub mod validation;

// Individual classes, and functions
pub use config::{AuucType, ImportanceMethod, UpliftDrfParameters, UpliftMetricType};
pub use data::{Column, Frame};
pub use drf::{train, UpliftDrf};
pub use errors::UpliftError;
pub use metric::UpliftMetrics;
pub use model::{PredictionRow, UpliftDrfModel};
