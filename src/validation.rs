//! Validation
//!
//! Checks a training configuration against the schema of the training frame
//! before any work is dispatched. Every check runs, and all failures are
//! reported together.
use crate::config::UpliftDrfParameters;
use crate::data::{Column, ColumnType, Domain, Frame};
use crate::errors::{UpliftError, ValidationFailure};
use crate::utils::{validate_float_parameter, validate_min_parameter};
use serde::{Deserialize, Serialize};

/// A predictor column as seen at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorInfo {
    pub name: String,
    pub column_type: ColumnType,
    /// Training domain of categorical predictors.
    pub domain: Option<Domain>,
}

/// Column layout of a validated training frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSchema {
    pub predictors: Vec<PredictorInfo>,
    /// Position of each predictor in the training frame.
    #[serde(skip)]
    pub predictor_index: Vec<usize>,
    pub treatment_column: String,
    pub treatment_domain: Domain,
    pub response_column: String,
    pub response_domain: Domain,
}

impl TrainingSchema {
    pub fn n_predictors(&self) -> usize {
        self.predictors.len()
    }

    pub fn predictor_names(&self) -> Vec<&str> {
        self.predictors.iter().map(|p| p.name.as_str()).collect()
    }
}

fn check_binary_categorical(
    column: &Column,
    not_categorical: ValidationFailure,
    wrong_cardinality: fn(usize) -> ValidationFailure,
    failures: &mut Vec<ValidationFailure>,
) {
    if !column.is_categorical() {
        failures.push(not_categorical);
    } else if column.cardinality() != 2 {
        failures.push(wrong_cardinality(column.cardinality()));
    }
}

fn check_hyper_parameters(params: &UpliftDrfParameters, n_predictors: usize, failures: &mut Vec<ValidationFailure>) {
    let checks = [
        validate_min_parameter(params.ntrees, 1, "ntrees"),
        validate_min_parameter(params.max_depth, 1, "max_depth"),
        validate_min_parameter(params.min_rows, 1, "min_rows"),
        validate_min_parameter(params.nbins as usize, 2, "nbins"),
        validate_min_parameter(params.nbins_cats as usize, 2, "nbins_cats"),
        validate_min_parameter(params.auuc_nbins, 1, "auuc_nbins"),
        validate_min_parameter(params.chunk_size, 1, "chunk_size"),
        validate_min_parameter(params.tree_batch_size, 1, "tree_batch_size"),
        validate_float_parameter(params.sample_rate, 0.0, 1.0, false, "sample_rate"),
        validate_float_parameter(
            params.min_split_improvement,
            0.0,
            f64::INFINITY,
            true,
            "min_split_improvement",
        ),
    ];
    failures.extend(checks.into_iter().filter_map(|c| c.err()));

    if let Some(0) = params.num_threads {
        failures.push(ValidationFailure::InvalidParameter(
            "num_threads".to_string(),
            "a positive number of threads".to_string(),
            "0".to_string(),
        ));
    }

    let m = params.mtries;
    let mtries_ok = m == -2 || m == -1 || (m >= 1 && (m as usize) <= n_predictors.max(1));
    if !mtries_ok {
        failures.push(ValidationFailure::InvalidParameter(
            "mtries".to_string(),
            format!("-2, -1 or a value within [1, {}]", n_predictors),
            m.to_string(),
        ));
    }
}

/// Validate the parameters against the training frame.
///
/// Returns the training schema, with the predictors in frame order, or a
/// configuration error listing every problem found.
pub fn validate(params: &UpliftDrfParameters, frame: &Frame) -> Result<TrainingSchema, UpliftError> {
    let mut failures = Vec::new();

    if frame.num_rows() == 0 {
        failures.push(ValidationFailure::EmptyFrame);
    }

    let treatment = if params.treatment_column.is_empty() {
        failures.push(ValidationFailure::TreatmentColumnRequired);
        None
    } else {
        match frame.column(&params.treatment_column) {
            Some(c) => Some(c),
            None => {
                failures.push(ValidationFailure::TreatmentColumnNotFound(params.treatment_column.clone()));
                None
            }
        }
    };
    if let Some(c) = treatment {
        check_binary_categorical(
            c,
            ValidationFailure::TreatmentNotCategorical,
            ValidationFailure::MultipleTreatmentGroups,
            &mut failures,
        );
    }

    let response = if params.response_column.is_empty() {
        failures.push(ValidationFailure::ResponseColumnRequired);
        None
    } else {
        match frame.column(&params.response_column) {
            Some(c) => Some(c),
            None => {
                failures.push(ValidationFailure::ResponseColumnNotFound(params.response_column.clone()));
                None
            }
        }
    };
    if let Some(c) = response {
        check_binary_categorical(
            c,
            ValidationFailure::ResponseNotCategorical,
            ValidationFailure::MultinomialResponse,
            &mut failures,
        );
    }

    if !params.response_column.is_empty() && params.response_column == params.treatment_column {
        failures.push(ValidationFailure::ResponseIsTreatment(params.response_column.clone()));
    }

    for ignored in params.ignored_columns.iter() {
        if *ignored == params.response_column || *ignored == params.treatment_column {
            failures.push(ValidationFailure::IgnoredEssentialColumn(ignored.clone()));
        } else if frame.find(ignored).is_none() {
            failures.push(ValidationFailure::IgnoredColumnNotFound(ignored.clone()));
        }
    }

    let predictor_index: Vec<usize> = frame
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.name != params.response_column
                && c.name != params.treatment_column
                && !params.ignored_columns.contains(&c.name)
        })
        .map(|(i, _)| i)
        .collect();
    if predictor_index.is_empty() {
        failures.push(ValidationFailure::NoPredictors);
    }

    check_hyper_parameters(params, predictor_index.len(), &mut failures);

    match (treatment, response) {
        (Some(t), Some(r)) if failures.is_empty() => {
            let predictors = predictor_index
                .iter()
                .map(|i| {
                    let c = frame.column_at(*i);
                    PredictorInfo {
                        name: c.name.clone(),
                        column_type: c.column_type(),
                        domain: c.domain().cloned(),
                    }
                })
                .collect();
            Ok(TrainingSchema {
                predictors,
                predictor_index,
                treatment_column: t.name.clone(),
                treatment_domain: t.domain().cloned().unwrap_or_else(|| Domain::new(Vec::new())),
                response_column: r.name.clone(),
                response_domain: r.domain().cloned().unwrap_or_else(|| Domain::new(Vec::new())),
            })
        }
        _ => Err(UpliftError::from(failures)),
    }
}
