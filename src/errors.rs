//! Errors
//!
//! Custom error types used throughout the `uplift-forest` crate.
use std::fmt;
use thiserror::Error;

/// A single reason a training configuration was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("treatment column required")]
    TreatmentColumnRequired,
    #[error("treatment column required, {0} not found in the training frame")]
    TreatmentColumnNotFound(String),
    #[error("treatment column must be categorical")]
    TreatmentNotCategorical,
    /// Number of levels found in the treatment column.
    #[error("multiple treatment groups not supported, treatment column has {0} levels but exactly 2 are required")]
    MultipleTreatmentGroups(usize),
    #[error("response column required")]
    ResponseColumnRequired,
    #[error("response column {0} not found in the training frame")]
    ResponseColumnNotFound(String),
    #[error("response column must be categorical")]
    ResponseNotCategorical,
    /// Number of levels found in the response column.
    #[error("multinomial response not supported, response column has {0} levels but exactly 2 are required")]
    MultinomialResponse(usize),
    #[error("response column and treatment column must differ, both are {0}")]
    ResponseIsTreatment(String),
    #[error("column {0} cannot be ignored, it is the response or treatment column")]
    IgnoredEssentialColumn(String),
    #[error("ignored column {0} not found in the training frame")]
    IgnoredColumnNotFound(String),
    #[error("training frame has no rows")]
    EmptyFrame,
    #[error("no predictor columns left after removing response, treatment and ignored columns")]
    NoPredictors,
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("invalid value for {0}, expected {1} but {2} provided")]
    InvalidParameter(String, String, String),
}

/// Wrapper used to render a list of validation failures on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailures(pub Vec<ValidationFailure>);

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

/// Errors that can occur while building frames, training or scoring.
#[derive(Debug, Error)]
pub enum UpliftError {
    /// The training configuration is invalid, no computation was started.
    #[error("Illegal argument(s) for UpliftDRF model: {0}")]
    Configuration(ValidationFailures),
    /// A predictor used by the model can not be found or used in the scoring frame.
    #[error("Scoring frame does not match the training schema: {0}")]
    SchemaMismatch(String),
    /// Inconsistent partial statistics, this is a bug rather than a user error.
    #[error("Internal computation error: {0}")]
    Internal(String),
    #[error("Column {0} not found in frame.")]
    InvalidColumn(String),
    #[error("Column {0} already exists in frame.")]
    DuplicateColumn(String),
    /// Column name, its length, and the row count of the frame.
    #[error("Column {0} has {1} rows, but the frame has {2} rows.")]
    LengthMismatch(String, usize, usize),
    #[error("Unable to write model to file: {0}")]
    UnableToWrite(String),
    #[error("Unable to read from {0}")]
    UnableToRead(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
}

impl UpliftError {
    /// The validation failures, if this is a configuration error.
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            UpliftError::Configuration(f) => &f.0,
            _ => &[],
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, UpliftError::Configuration(_))
    }
}

impl From<Vec<ValidationFailure>> for UpliftError {
    fn from(failures: Vec<ValidationFailure>) -> Self {
        UpliftError::Configuration(ValidationFailures(failures))
    }
}
