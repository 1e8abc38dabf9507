use crate::data::{ColumnData, Frame};
use crate::utils::{map_bin, percentiles};
use crate::validation::TrainingSchema;
use log::warn;

/// How the values of a predictor map onto histogram bins.
///
/// Bin 0 always holds missing values. For numeric predictors, bin `i + 1`
/// holds the values in `[cuts[i-1], cuts[i])`, the last cut is `f64::MAX`.
/// For categorical predictors, bin `code + 1` holds level `code`.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureBins {
    Numeric { cuts: Vec<f64> },
    Categorical { n_levels: usize },
}

impl FeatureBins {
    /// Number of bins including the missing bin.
    pub fn n_bins(&self) -> usize {
        match self {
            FeatureBins::Numeric { cuts } => cuts.len() + 1,
            FeatureBins::Categorical { n_levels } => n_levels + 1,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureBins::Categorical { .. })
    }
}

/// Predictors of the training frame turned into bins, along with the
/// treatment and response labels of every row.
///
/// `binned_data` is column major, `rows * features.len()` long.
#[derive(Debug)]
pub struct BinnedData {
    pub binned_data: Vec<u16>,
    pub features: Vec<FeatureBins>,
    /// 1 for the treatment group, 0 for control, `None` when missing.
    pub treatment: Vec<Option<u8>>,
    /// 1 for the positive response, 0 otherwise, `None` when missing.
    pub response: Vec<Option<u8>>,
    pub rows: usize,
}

impl BinnedData {
    /// Bins of one feature.
    pub fn get_col(&self, col: usize) -> &[u16] {
        &self.binned_data[col * self.rows..(col + 1) * self.rows]
    }

    /// Can this row be used for training.
    #[inline]
    pub fn is_labeled(&self, row: usize) -> bool {
        self.treatment[row].is_some() && self.response[row].is_some()
    }
}

/// Cut values for a numeric column.
///
/// If there are fewer unique values than bins, every unique value gets its own
/// bin, otherwise the cuts are the `1/nbins` spaced percentiles.
///
/// * `values` - Column values, NaN is missing.
/// * `nbins` - Number of bins, not counting the missing bin.
pub fn numeric_cuts(values: &[f64], nbins: u16) -> Vec<f64> {
    let mut no_miss: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    no_miss.sort_unstable_by(|a, b| a.total_cmp(b));
    let mut unique = no_miss.clone();
    unique.dedup();

    let mut cuts = if unique.len() <= nbins as usize {
        unique.into_iter().skip(1).collect::<Vec<f64>>()
    } else {
        let pcts: Vec<f64> = (1..nbins).map(|i| f64::from(i) / f64::from(nbins)).collect();
        let mut c = percentiles(&no_miss, &pcts);
        // A cut at the minimum would leave the first bin empty.
        let min = no_miss[0];
        c.retain(|v| *v > min);
        c
    };
    cuts.push(f64::MAX);
    cuts.dedup();
    cuts
}

fn binary_codes(data: &ColumnData) -> Vec<Option<u8>> {
    match data {
        ColumnData::Categorical { codes, .. } => codes.iter().map(|c| c.map(|v| v as u8)).collect(),
        ColumnData::Numeric(v) => v.iter().map(|x| if x.is_nan() { None } else { Some(*x as u8) }).collect(),
    }
}

/// Bin the predictors of a validated frame.
///
/// * `frame` - The training frame.
/// * `schema` - The validated training schema.
/// * `nbins` - Number of bins for numeric predictors.
/// * `nbins_cats` - Categorical levels with a code at or above this value are binned as missing.
pub fn bin_frame(frame: &Frame, schema: &TrainingSchema, nbins: u16, nbins_cats: u16) -> BinnedData {
    let rows = frame.num_rows();
    let mut binned_data = Vec::with_capacity(rows * schema.n_predictors());
    let mut features = Vec::with_capacity(schema.n_predictors());

    for (info, idx) in schema.predictors.iter().zip(schema.predictor_index.iter()) {
        let column = frame.column_at(*idx);
        match &column.data {
            ColumnData::Numeric(values) => {
                let cuts = numeric_cuts(values, nbins);
                if cuts.len() < 2 {
                    warn!("Predictor {} has no variance, it will never be used to split.", info.name);
                }
                binned_data.extend(values.iter().map(|v| map_bin(&cuts, *v).unwrap_or(0)));
                features.push(FeatureBins::Numeric { cuts });
            }
            ColumnData::Categorical { codes, domain } => {
                let n_levels = domain.len().min(nbins_cats as usize);
                if domain.len() > n_levels {
                    warn!(
                        "Predictor {} has {} levels, levels beyond the first {} are treated as missing.",
                        info.name,
                        domain.len(),
                        n_levels
                    );
                }
                binned_data.extend(codes.iter().map(|c| match c {
                    Some(code) if (*code as usize) < n_levels => (*code + 1) as u16,
                    _ => 0,
                }));
                features.push(FeatureBins::Categorical { n_levels });
            }
        }
    }

    let treatment = frame
        .column(&schema.treatment_column)
        .map(|c| binary_codes(&c.data))
        .unwrap_or_else(|| vec![None; rows]);
    let response = frame
        .column(&schema.response_column)
        .map(|c| binary_codes(&c.data))
        .unwrap_or_else(|| vec![None; rows]);

    BinnedData {
        binned_data,
        features,
        treatment,
        response,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpliftDrfParameters;
    use crate::data::Column;
    use crate::validation::validate;

    #[test]
    fn test_numeric_cuts_few_unique() {
        let v = vec![3., 1., 2., f64::NAN, 2., 1.];
        let cuts = numeric_cuts(&v, 10);
        assert_eq!(cuts, vec![2., 3., f64::MAX]);
        assert_eq!(map_bin(&cuts, 1.), Some(1));
        assert_eq!(map_bin(&cuts, 2.), Some(2));
        assert_eq!(map_bin(&cuts, 3.), Some(3));
    }

    #[test]
    fn test_numeric_cuts_percentiles() {
        let v: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let cuts = numeric_cuts(&v, 4);
        assert_eq!(cuts, vec![24., 49., 74., f64::MAX]);
        // Each bin holds a quarter of the values.
        let mut counts = [0; 5];
        for x in v.iter() {
            counts[map_bin(&cuts, *x).unwrap() as usize] += 1;
        }
        assert_eq!(counts, [0, 24, 25, 25, 26]);
    }

    #[test]
    fn test_numeric_cuts_constant() {
        assert_eq!(numeric_cuts(&[1., 1., 1.], 20), vec![f64::MAX]);
        assert_eq!(numeric_cuts(&[f64::NAN], 20), vec![f64::MAX]);
    }

    #[test]
    fn test_bin_frame() {
        let frame = Frame::new(vec![
            Column::numeric("x", vec![0., 1., f64::NAN, 3.]),
            Column::categorical("c", &[Some("b"), None, Some("a"), Some("c")]),
            Column::from_labels("treatment", &["T", "C", "T", "C"]),
            Column::categorical("y", &[Some("1"), Some("0"), None, Some("1")]),
        ])
        .unwrap();
        let params = UpliftDrfParameters::new("y", "treatment").set_nbins_cats(2);
        let schema = validate(&params, &frame).unwrap();
        let b = bin_frame(&frame, &schema, 20, 2);
        assert_eq!(b.get_col(0), &[1, 2, 0, 3]);
        // Level "c" has code 2, beyond nbins_cats.
        assert_eq!(b.get_col(1), &[2, 0, 1, 0]);
        assert_eq!(b.features[1], FeatureBins::Categorical { n_levels: 2 });
        assert_eq!(b.treatment, vec![Some(1), Some(0), Some(1), Some(0)]);
        assert_eq!(b.response, vec![Some(1), Some(0), None, Some(1)]);
        assert!(!b.is_labeled(2));
    }
}
