pub const UPLIFT_PREDICT: &str = "uplift_predict";
pub const P_Y1_CT1: &str = "p_y1_ct1";
pub const P_Y1_CT0: &str = "p_y1_ct0";
/// Names of the scoring output columns, in output order.
pub const PREDICTION_COLUMNS: [&str; 3] = [UPLIFT_PREDICT, P_Y1_CT1, P_Y1_CT0];

pub const DEFAULT_TREATMENT_COLUMN: &str = "treatment";
pub const NTREES: usize = 50;
pub const MAX_DEPTH: usize = 20;
pub const MIN_ROWS: usize = 10;
pub const SAMPLE_RATE: f64 = 0.632;
/// Use every predictor at every split.
pub const MTRIES_ALL: i32 = -2;
/// Use the square root of the number of predictors at every split.
pub const MTRIES_SQRT: i32 = -1;
pub const NBINS: u16 = 20;
pub const NBINS_CATS: u16 = 1024;
pub const MIN_SPLIT_IMPROVEMENT: f64 = 1e-5;
pub const AUUC_NBINS: usize = 1000;
pub const CHUNK_SIZE: usize = 4096;
pub const TREE_BATCH_SIZE: usize = 10;

/// Lower bound applied to probabilities inside the divergence measures.
pub const PROB_EPS: f64 = 1e-6;
/// Multiplier used to derive per-tree seeds from the model seed.
pub const TREE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;
/// Marks rows that are not part of any open node.
pub const OUT_OF_BAG: u32 = u32::MAX;
