//! Model
//!
//! A trained uplift forest: scoring, feature importance, and persistence.
use crate::config::{ImportanceMethod, UpliftDrfParameters};
use crate::constants::{P_Y1_CT0, P_Y1_CT1, UPLIFT_PREDICT};
use crate::data::{Column, ColumnData, ColumnType, Frame};
use crate::errors::UpliftError;
use crate::metric::UpliftMetrics;
use crate::tree::Tree;
use crate::utils::fmt_label;
use crate::validation::{PredictorInfo, TrainingSchema};
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;

type ImportanceFn = fn(&Tree, &mut HashMap<usize, (f64, usize)>);

/// Prediction for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub uplift_predict: f64,
    pub p_y1_ct1: f64,
    pub p_y1_ct0: f64,
}

/// Uplift random forest model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpliftDrfModel {
    parameters: UpliftDrfParameters,
    schema: TrainingSchema,
    trees: Vec<Tree>,
    #[serde(default)]
    training_metrics: Option<UpliftMetrics>,
}

impl UpliftDrfModel {
    pub fn new(parameters: UpliftDrfParameters, schema: TrainingSchema, trees: Vec<Tree>) -> Self {
        UpliftDrfModel {
            parameters,
            schema,
            trees,
            training_metrics: None,
        }
    }

    pub fn set_training_metrics(mut self, metrics: UpliftMetrics) -> Self {
        self.training_metrics = Some(metrics);
        self
    }

    pub fn ntrees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn schema(&self) -> &TrainingSchema {
        &self.schema
    }

    pub fn parameters(&self) -> &UpliftDrfParameters {
        &self.parameters
    }

    pub fn training_metrics(&self) -> Option<&UpliftMetrics> {
        self.training_metrics.as_ref()
    }

    /// Predictors used by at least one split, these must be present when scoring.
    pub fn required_predictors(&self) -> Vec<&str> {
        let used: HashSet<usize> = self.trees.iter().flat_map(|t| t.split_features()).collect();
        self.schema
            .predictors
            .iter()
            .enumerate()
            .filter(|(i, _)| used.contains(i))
            .map(|(_, p)| p.name.as_str())
            .collect()
    }

    /// Values of a predictor in the encoding the trees were trained on:
    /// numbers as they are, levels as training codes, NaN for missing.
    fn align_column(&self, predictor: &PredictorInfo, column: &Column) -> Result<Vec<f64>, UpliftError> {
        match (predictor.column_type, &predictor.domain) {
            (ColumnType::Numeric, _) => match &column.data {
                ColumnData::Numeric(values) => Ok(values.clone()),
                ColumnData::Categorical { .. } => Err(UpliftError::SchemaMismatch(format!(
                    "column {} is categorical, but the model was trained on numeric values",
                    predictor.name
                ))),
            },
            (ColumnType::Categorical, Some(domain)) => {
                let max_level = self.parameters.nbins_cats as u32;
                let recode = |label: Option<&str>| -> f64 {
                    match label.and_then(|l| domain.code(l)) {
                        Some(code) if code < max_level => code as f64,
                        _ => f64::NAN,
                    }
                };
                Ok(match &column.data {
                    ColumnData::Categorical { codes, domain: own } => codes
                        .iter()
                        .map(|c| recode((*c).and_then(|c| own.label(c))))
                        .collect(),
                    ColumnData::Numeric(values) => values
                        .iter()
                        .map(|v| if v.is_nan() { f64::NAN } else { recode(Some(fmt_label(*v).as_str())) })
                        .collect(),
                })
            }
            (ColumnType::Categorical, None) => Err(UpliftError::Internal(format!(
                "categorical predictor {} has no training domain",
                predictor.name
            ))),
        }
    }

    /// Align the predictors of a frame to the training schema.
    /// Predictors no split uses are left out.
    fn aligned_predictors(&self, frame: &Frame) -> Result<Vec<Option<Vec<f64>>>, UpliftError> {
        let used: HashSet<usize> = self.trees.iter().flat_map(|t| t.split_features()).collect();
        self.schema
            .predictors
            .iter()
            .enumerate()
            .map(|(i, predictor)| {
                if !used.contains(&i) {
                    return Ok(None);
                }
                let column = frame.column(&predictor.name).ok_or_else(|| {
                    UpliftError::SchemaMismatch(format!("predictor column {} not found", predictor.name))
                })?;
                self.align_column(predictor, column).map(Some)
            })
            .collect()
    }

    /// Predict every row of a frame.
    ///
    /// * `frame` - Frame holding the predictor columns, by name. Other columns are ignored.
    pub fn predict(&self, frame: &Frame) -> Result<Vec<PredictionRow>, UpliftError> {
        let columns = self.aligned_predictors(frame)?;
        let ntrees = self.trees.len().max(1) as f64;
        let rows = (0..frame.num_rows())
            .into_par_iter()
            .map(|row| {
                let value = |f: usize| columns[f].as_ref().map_or(f64::NAN, |c| c[row]);
                let (p1, p0) = self.trees.iter().fold((0.0, 0.0), |(p1, p0), tree| {
                    let leaf = tree.predict_leaf(&value);
                    (p1 + leaf.p_y1_ct1, p0 + leaf.p_y1_ct0)
                });
                let (p1, p0) = (p1 / ntrees, p0 / ntrees);
                PredictionRow {
                    uplift_predict: p1 - p0,
                    p_y1_ct1: p1,
                    p_y1_ct0: p0,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Score a frame, returning the columns `uplift_predict`, `p_y1_ct1`, `p_y1_ct0`.
    pub fn score(&self, frame: &Frame) -> Result<Frame, UpliftError> {
        let rows = self.predict(frame)?;
        Frame::new(vec![
            Column::numeric(UPLIFT_PREDICT, rows.iter().map(|r| r.uplift_predict).collect()),
            Column::numeric(P_Y1_CT1, rows.iter().map(|r| r.p_y1_ct1).collect()),
            Column::numeric(P_Y1_CT0, rows.iter().map(|r| r.p_y1_ct0).collect()),
        ])
    }

    /// Calculate feature importance measure for the predictors
    /// in the model.
    ///
    /// * `method` - Importance measure, averaged over the splits for `Gain` and `Cover`.
    /// * `normalize` - Divide every value by the sum of all values.
    pub fn calculate_feature_importance(&self, method: ImportanceMethod, normalize: bool) -> HashMap<String, f64> {
        let (average, importance_fn): (bool, ImportanceFn) = match method {
            ImportanceMethod::Weight => (false, Tree::calculate_importance_weight),
            ImportanceMethod::Gain => (true, Tree::calculate_importance_gain),
            ImportanceMethod::TotalGain => (false, Tree::calculate_importance_gain),
            ImportanceMethod::Cover => (true, Tree::calculate_importance_cover),
            ImportanceMethod::TotalCover => (false, Tree::calculate_importance_cover),
        };
        let mut stats = HashMap::new();
        for tree in self.trees.iter() {
            importance_fn(tree, &mut stats)
        }

        let mut importance: Vec<(usize, f64)> = stats
            .iter()
            .map(|(k, (v, c))| if average { (*k, v / (*c as f64)) } else { (*k, *v) })
            .collect();
        if normalize {
            // Summed in feature order.
            importance.sort_by_key(|(k, _)| *k);
            let total: f64 = importance.iter().map(|(_, v)| v).sum();
            if total > 0.0 {
                importance.iter_mut().for_each(|(_, v)| *v /= total);
            }
        }
        importance
            .into_iter()
            .map(|(k, v)| (self.schema.predictors[k].name.clone(), v))
            .collect()
    }

    /// Text dump of every tree.
    pub fn text_dump(&self) -> Vec<String> {
        self.trees.iter().map(|t| format!("{}", t)).collect()
    }

    /// Save a model as a json object to a file.
    ///
    /// * `path` - Path to save the model.
    pub fn save_model(&self, path: &str) -> Result<(), UpliftError> {
        let model = self.json_dump()?;
        fs::write(path, model).map_err(|e| UpliftError::UnableToWrite(e.to_string()))
    }

    /// Dump a model as a json object
    pub fn json_dump(&self) -> Result<String, UpliftError> {
        serde_json::to_string(self).map_err(|e| UpliftError::UnableToWrite(e.to_string()))
    }

    /// Load a model from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    pub fn from_json(json_str: &str) -> Result<Self, UpliftError> {
        serde_json::from_str::<UpliftDrfModel>(json_str).map_err(|e| UpliftError::UnableToRead(e.to_string()))
    }

    /// Load a model from a path to a json model object.
    ///
    /// * `path` - Path to load the model from.
    pub fn load_model(path: &str) -> Result<Self, UpliftError> {
        let json_str = fs::read_to_string(path).map_err(|e| UpliftError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}
