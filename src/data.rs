//! Data
//!
//! The columnar frame the forest is trained on and scored against. A frame is an
//! ordered set of named columns of equal length, each column either numeric
//! (missing values are NaN) or categorical with its own ordered domain of labels.
use crate::errors::UpliftError;
use crate::utils::fmt_label;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// The type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Categorical => write!(f, "categorical"),
        }
    }
}

/// Ordered set of category labels, with a reverse lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Domain {
    labels: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl Domain {
    /// Build a domain from labels, duplicates are dropped keeping the first occurrence.
    pub fn new(labels: Vec<String>) -> Self {
        let mut unique = Vec::with_capacity(labels.len());
        let mut lookup = HashMap::with_capacity(labels.len());
        for label in labels {
            if !lookup.contains_key(&label) {
                lookup.insert(label.clone(), unique.len() as u32);
                unique.push(label);
            }
        }
        Domain { labels: unique, lookup }
    }

    /// Build a lexicographically sorted domain from labels.
    pub fn sorted(mut labels: Vec<String>) -> Self {
        labels.sort();
        labels.dedup();
        Domain::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(|s| s.as_str())
    }

    pub fn code(&self, label: &str) -> Option<u32> {
        self.lookup.get(label).copied()
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl From<Vec<String>> for Domain {
    fn from(labels: Vec<String>) -> Self {
        Domain::new(labels)
    }
}

impl From<Domain> for Vec<String> {
    fn from(domain: Domain) -> Self {
        domain.labels
    }
}

/// Column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numeric values, NaN is missing.
    Numeric(Vec<f64>),
    /// Codes into the domain, `None` is missing.
    Categorical { codes: Vec<Option<u32>>, domain: Domain },
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Build a categorical column from labels, `None` is missing.
    /// The domain is the sorted set of distinct labels.
    pub fn categorical<S: AsRef<str>>(name: &str, labels: &[Option<S>]) -> Self {
        let domain = Domain::sorted(labels.iter().flatten().map(|s| s.as_ref().to_string()).collect());
        let codes = labels
            .iter()
            .map(|l| l.as_ref().and_then(|s| domain.code(s.as_ref())))
            .collect();
        Column {
            name: name.to_string(),
            data: ColumnData::Categorical { codes, domain },
        }
    }

    /// Categorical column where no value is missing.
    pub fn from_labels<S: AsRef<str>>(name: &str, labels: &[S]) -> Self {
        let labels: Vec<Option<&str>> = labels.iter().map(|s| Some(s.as_ref())).collect();
        Column::categorical(name, &labels)
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match &self.data {
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Categorical { .. } => ColumnType::Categorical,
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.column_type() == ColumnType::Categorical
    }

    /// Domain of a categorical column.
    pub fn domain(&self) -> Option<&Domain> {
        match &self.data {
            ColumnData::Categorical { domain, .. } => Some(domain),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Number of levels, zero for numeric columns.
    pub fn cardinality(&self) -> usize {
        self.domain().map_or(0, |d| d.len())
    }

    /// Value of a row as a float, categorical values are returned as their code.
    pub fn value(&self, row: usize) -> f64 {
        match &self.data {
            ColumnData::Numeric(v) => v[row],
            ColumnData::Categorical { codes, .. } => codes[row].map_or(f64::NAN, f64::from),
        }
    }

    /// Numeric representation of the column, categorical values become their codes.
    pub fn to_f64(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }

    /// Re-express the column as a categorical column.
    /// Numeric values become labels, ordered numerically.
    pub fn into_categorical(self) -> Column {
        match self.data {
            ColumnData::Categorical { .. } => self,
            ColumnData::Numeric(values) => {
                let mut distinct: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
                distinct.sort_unstable_by(|a, b| a.total_cmp(b));
                distinct.dedup();
                let domain = Domain::new(distinct.iter().map(|v| fmt_label(*v)).collect());
                let codes = values
                    .iter()
                    .map(|v| if v.is_nan() { None } else { domain.code(&fmt_label(*v)) })
                    .collect();
                Column {
                    name: self.name,
                    data: ColumnData::Categorical { codes, domain },
                }
            }
        }
    }
}

/// An ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    rows: usize,
}

impl Frame {
    /// Create a frame from columns, all columns must have the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self, UpliftError> {
        let mut frame = Frame::default();
        for c in columns {
            frame.add_column(c)?;
        }
        Ok(frame)
    }

    pub fn add_column(&mut self, column: Column) -> Result<(), UpliftError> {
        if self.find(&column.name).is_some() {
            return Err(UpliftError::DuplicateColumn(column.name));
        }
        if self.columns.is_empty() {
            self.rows = column.len();
        } else if column.len() != self.rows {
            return Err(UpliftError::LengthMismatch(column.name.clone(), column.len(), self.rows));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Index of a column by name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.find(name).map(|i| &self.columns[i])
    }

    pub fn column_at(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    /// Convert a column to a categorical column in place.
    pub fn to_categorical_col(&mut self, name: &str) -> Result<(), UpliftError> {
        let idx = self.find(name).ok_or_else(|| UpliftError::InvalidColumn(name.to_string()))?;
        let column = std::mem::replace(&mut self.columns[idx], Column::numeric(name, Vec::new()));
        self.columns[idx] = column.into_categorical();
        Ok(())
    }

    /// Read a frame from a csv file with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, UpliftError> {
        let p = path.as_ref();
        let file = File::open(p).map_err(|e| UpliftError::UnableToRead(format!("{}: {}", p.display(), e)))?;
        Self::from_csv_reader(file)
    }

    /// Read a frame from csv data with a header row.
    ///
    /// A column is numeric when every non empty cell parses as a float,
    /// otherwise it is categorical. Empty cells are missing.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, UpliftError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| UpliftError::UnableToRead(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record.map_err(|e| UpliftError::UnableToRead(e.to_string()))?;
            for (i, col) in cells.iter_mut().enumerate() {
                let cell = record.get(i).map(|s| s.trim()).unwrap_or("");
                col.push(if cell.is_empty() { None } else { Some(cell.to_string()) });
            }
        }

        let mut columns = Vec::with_capacity(headers.len());
        for (name, col) in headers.iter().zip(cells) {
            let parsed: Option<Vec<f64>> = col
                .iter()
                .map(|c| match c {
                    None => Some(f64::NAN),
                    Some(s) => s.parse::<f64>().ok(),
                })
                .collect();
            match parsed {
                Some(values) => columns.push(Column::numeric(name, values)),
                None => columns.push(Column::categorical(name, &col)),
            }
        }
        Frame::new(columns)
    }
}
