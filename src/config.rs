//! Configuration
//!
//! Parameters of an uplift forest, and the enums selecting the split criterion,
//! the AUUC flavour, and the feature importance measure.
use crate::constants::{
    AUUC_NBINS, CHUNK_SIZE, DEFAULT_TREATMENT_COLUMN, MAX_DEPTH, MIN_ROWS, MIN_SPLIT_IMPROVEMENT, MTRIES_ALL,
    MTRIES_SQRT, NBINS, NBINS_CATS, NTREES, SAMPLE_RATE, TREE_BATCH_SIZE,
};
use crate::errors::UpliftError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Divergence used to measure the distance between the treatment
/// and control response distributions.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpliftMetricType {
    /// Kullback-Leibler divergence.
    #[default]
    AUTO,
    KL,
    Euclidean,
    ChiSquared,
}

impl UpliftMetricType {
    /// Resolve `AUTO` to the concrete metric.
    pub fn resolve(self) -> Self {
        match self {
            UpliftMetricType::AUTO => UpliftMetricType::KL,
            m => m,
        }
    }
}

impl FromStr for UpliftMetricType {
    type Err = UpliftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(UpliftMetricType::AUTO),
            "KL" => Ok(UpliftMetricType::KL),
            "Euclidean" => Ok(UpliftMetricType::Euclidean),
            "ChiSquared" => Ok(UpliftMetricType::ChiSquared),
            _ => Err(UpliftError::ParseString(
                s.to_string(),
                "UpliftMetricType".to_string(),
                items_to_strings(vec!["AUTO", "KL", "Euclidean", "ChiSquared"]),
            )),
        }
    }
}

/// Curve used for the area under the uplift curve.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuucType {
    /// Qini.
    #[default]
    AUTO,
    Qini,
    Lift,
    Gain,
}

impl AuucType {
    pub fn resolve(self) -> Self {
        match self {
            AuucType::AUTO => AuucType::Qini,
            t => t,
        }
    }
}

impl FromStr for AuucType {
    type Err = UpliftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(AuucType::AUTO),
            "qini" | "Qini" => Ok(AuucType::Qini),
            "lift" | "Lift" => Ok(AuucType::Lift),
            "gain" | "Gain" => Ok(AuucType::Gain),
            _ => Err(UpliftError::ParseString(
                s.to_string(),
                "AuucType".to_string(),
                items_to_strings(vec!["AUTO", "Qini", "Lift", "Gain"]),
            )),
        }
    }
}

/// Method to calculate variable importance.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum ImportanceMethod {
    /// The number of times a feature is used to split the data across all trees.
    Weight,
    /// The average split gain across all splits the feature is used in.
    Gain,
    /// The average number of rows across all splits the feature is used in.
    Cover,
    /// The total gain across all splits the feature is used in.
    TotalGain,
    /// The total number of rows across all splits the feature is used in.
    TotalCover,
}

fn default_treatment_column() -> String {
    DEFAULT_TREATMENT_COLUMN.to_string()
}
fn default_ntrees() -> usize {
    NTREES
}
fn default_max_depth() -> usize {
    MAX_DEPTH
}
fn default_min_rows() -> usize {
    MIN_ROWS
}
fn default_sample_rate() -> f64 {
    SAMPLE_RATE
}
fn default_mtries() -> i32 {
    MTRIES_ALL
}
fn default_nbins() -> u16 {
    NBINS
}
fn default_nbins_cats() -> u16 {
    NBINS_CATS
}
fn default_min_split_improvement() -> f64 {
    MIN_SPLIT_IMPROVEMENT
}
fn default_auuc_nbins() -> usize {
    AUUC_NBINS
}
fn default_chunk_size() -> usize {
    CHUNK_SIZE
}
fn default_tree_batch_size() -> usize {
    TREE_BATCH_SIZE
}

/// Parameters of an uplift distributed random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftDrfParameters {
    /// Binary categorical outcome.
    pub response_column: String,
    /// Binary categorical column, the second level of its domain is the treatment group.
    #[serde(default = "default_treatment_column")]
    pub treatment_column: String,
    /// Columns that are not used as predictors.
    #[serde(default)]
    pub ignored_columns: Vec<String>,
    /// Integer value used to seed any randomness used in the algorithm.
    #[serde(default)]
    pub seed: u64,
    /// Number of trees.
    #[serde(default = "default_ntrees")]
    pub ntrees: usize,
    /// Maximum tree depth, the root is at depth 0.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Fewest rows allowed in a leaf.
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    /// Fraction of rows sampled, without replacement, for each tree.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Number of predictors drawn at each split, -2 for all, -1 for the square root.
    #[serde(default = "default_mtries")]
    pub mtries: i32,
    /// Number of histogram bins for numeric predictors.
    #[serde(default = "default_nbins")]
    pub nbins: u16,
    /// Maximum number of levels kept for categorical predictors, the rest are grouped as missing.
    #[serde(default = "default_nbins_cats")]
    pub nbins_cats: u16,
    #[serde(default)]
    pub uplift_metric: UpliftMetricType,
    /// Smallest normalized gain that a split has to reach.
    #[serde(default = "default_min_split_improvement")]
    pub min_split_improvement: f64,
    #[serde(default)]
    pub auuc_type: AuucType,
    /// Number of thresholds for the uplift curve.
    #[serde(default = "default_auuc_nbins")]
    pub auuc_nbins: usize,
    /// Number of threads to use during training, including the training metrics pass.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Rows per partition, each partition is aggregated by one worker task.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Number of trees grown together, level by level.
    #[serde(default = "default_tree_batch_size")]
    pub tree_batch_size: usize,
    /// Log progress every N trees, zero disables it.
    #[serde(default)]
    pub log_iterations: usize,
}

impl Default for UpliftDrfParameters {
    fn default() -> Self {
        UpliftDrfParameters {
            response_column: String::new(),
            treatment_column: default_treatment_column(),
            ignored_columns: Vec::new(),
            seed: 0,
            ntrees: NTREES,
            max_depth: MAX_DEPTH,
            min_rows: MIN_ROWS,
            sample_rate: SAMPLE_RATE,
            mtries: MTRIES_ALL,
            nbins: NBINS,
            nbins_cats: NBINS_CATS,
            uplift_metric: UpliftMetricType::AUTO,
            min_split_improvement: MIN_SPLIT_IMPROVEMENT,
            auuc_type: AuucType::AUTO,
            auuc_nbins: AUUC_NBINS,
            num_threads: None,
            chunk_size: CHUNK_SIZE,
            tree_batch_size: TREE_BATCH_SIZE,
            log_iterations: 0,
        }
    }
}

impl UpliftDrfParameters {
    /// Parameters with the two required columns set, everything else at its default.
    ///
    /// * `response_column` - Binary categorical outcome.
    /// * `treatment_column` - Binary categorical treatment indicator.
    pub fn new(response_column: &str, treatment_column: &str) -> Self {
        UpliftDrfParameters {
            response_column: response_column.to_string(),
            treatment_column: treatment_column.to_string(),
            ..Default::default()
        }
    }

    /// Number of predictors to draw at each split, given the number available.
    pub fn resolved_mtries(&self, n_predictors: usize) -> usize {
        match self.mtries {
            MTRIES_ALL => n_predictors,
            MTRIES_SQRT => ((n_predictors as f64).sqrt().floor() as usize).max(1),
            m => (m.max(1) as usize).min(n_predictors),
        }
    }

    // Set methods for parameters

    pub fn set_response_column(mut self, response_column: &str) -> Self {
        self.response_column = response_column.to_string();
        self
    }

    pub fn set_treatment_column(mut self, treatment_column: &str) -> Self {
        self.treatment_column = treatment_column.to_string();
        self
    }

    pub fn set_ignored_columns(mut self, ignored_columns: &[&str]) -> Self {
        self.ignored_columns = ignored_columns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn set_ntrees(mut self, ntrees: usize) -> Self {
        self.ntrees = ntrees;
        self
    }

    pub fn set_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn set_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn set_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn set_mtries(mut self, mtries: i32) -> Self {
        self.mtries = mtries;
        self
    }

    pub fn set_nbins(mut self, nbins: u16) -> Self {
        self.nbins = nbins;
        self
    }

    pub fn set_nbins_cats(mut self, nbins_cats: u16) -> Self {
        self.nbins_cats = nbins_cats;
        self
    }

    pub fn set_uplift_metric(mut self, uplift_metric: UpliftMetricType) -> Self {
        self.uplift_metric = uplift_metric;
        self
    }

    pub fn set_min_split_improvement(mut self, min_split_improvement: f64) -> Self {
        self.min_split_improvement = min_split_improvement;
        self
    }

    pub fn set_auuc_type(mut self, auuc_type: AuucType) -> Self {
        self.auuc_type = auuc_type;
        self
    }

    pub fn set_auuc_nbins(mut self, auuc_nbins: usize) -> Self {
        self.auuc_nbins = auuc_nbins;
        self
    }

    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn set_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn set_tree_batch_size(mut self, tree_batch_size: usize) -> Self {
        self.tree_batch_size = tree_batch_size;
        self
    }

    pub fn set_log_iterations(mut self, log_iterations: usize) -> Self {
        self.log_iterations = log_iterations;
        self
    }
}
