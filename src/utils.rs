use crate::errors::ValidationFailure;
use std::collections::VecDeque;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    items.join(", ")
}

// Validation
pub fn validate_float_parameter(
    value: f64,
    min: f64,
    max: f64,
    min_inclusive: bool,
    parameter: &str,
) -> Result<(), ValidationFailure> {
    let below = if min_inclusive { value < min } else { value <= min };
    if value.is_nan() || below || max < value {
        let open = if min_inclusive { "[" } else { "(" };
        let ex_msg = format!("real value within {}{}, {}]", open, min, max);
        Err(ValidationFailure::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_min_parameter(value: usize, min: usize, parameter: &str) -> Result<(), ValidationFailure> {
    if value < min {
        Err(ValidationFailure::InvalidParameter(
            parameter.to_string(),
            format!("integer value of at least {}", min),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Is `v` within `[i, j]`.
pub fn between(i: f64, j: f64, v: f64) -> bool {
    (i..=j).contains(&v)
}

/// Unweighted percentiles of the non-missing values of a slice.
///
/// * `v` - Values to find percentiles for, NaN values must be removed beforehand.
/// * `percentiles` - Percentiles to look for in the data. This should be
///     values from 0 to 1, and in sorted order.
pub fn percentiles(v: &[f64], percentiles: &[f64]) -> Vec<f64> {
    if v.is_empty() || percentiles.is_empty() {
        return Vec::new();
    }
    let mut sorted = v.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));

    let mut pcts = VecDeque::from_iter(percentiles.iter().copied());
    let mut p = Vec::new();
    let total = sorted.len() as f64;
    let mut current_pct = match pcts.pop_front() {
        Some(c) => c,
        None => return p,
    };
    for (i, value) in sorted.iter().enumerate() {
        let cuml_pct = (i + 1) as f64 / total;
        // The same number might be a valid value for several percentiles.
        while cuml_pct >= current_pct {
            p.push(*value);
            match pcts.pop_front() {
                Some(next) => current_pct = next,
                None => return p,
            }
        }
    }
    p
}

/// Return the bin of a value given the sorted upper bounds of the bins.
/// Missing values map to bin 0, bin `i + 1` holds values in `[x[i-1], x[i])`.
///
/// * `x` - The sorted slice of cut values.
/// * `v` - The value to bin.
#[inline]
pub fn map_bin(x: &[f64], v: f64) -> Option<u16> {
    if v.is_nan() {
        return Some(0);
    }
    let mut low = 0;
    let mut high = x.len();
    while low != high {
        let mid = (low + high) / 2;
        if x[mid] <= v {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    // Values at or above the last cut stay in the last bin.
    u16::try_from(low.min(x.len().saturating_sub(1)) + 1).ok()
}

/// Format a float the way categorical labels converted from numbers are written.
pub fn fmt_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// Round a float to `precision` decimal places.
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles() {
        let v = vec![4., 5., 6., 1., 2., 3., 7., 8., 9., 10.];
        let pcts = percentiles(&v, &[0.3, 0.5, 0.75, 1.0]);
        assert_eq!(pcts, vec![3., 5., 8., 10.]);
        let pcts = percentiles(&v, &[0.1]);
        assert_eq!(pcts, vec![1.]);
        assert!(percentiles(&[], &[0.5]).is_empty());
    }

    #[test]
    fn test_map_bin() {
        let cuts = vec![1.0, 5.0, 9.0, f64::MAX];
        assert_eq!(map_bin(&cuts, f64::NAN), Some(0));
        assert_eq!(map_bin(&cuts, 0.0), Some(1));
        assert_eq!(map_bin(&cuts, 1.0), Some(2));
        assert_eq!(map_bin(&cuts, 4.9), Some(2));
        assert_eq!(map_bin(&cuts, 5.0), Some(3));
        assert_eq!(map_bin(&cuts, 100.0), Some(4));
        assert_eq!(map_bin(&cuts, f64::INFINITY), Some(4));
    }

    #[test]
    fn test_validate_float_parameter() {
        assert!(validate_float_parameter(0.5, 0.0, 1.0, false, "sample_rate").is_ok());
        assert!(validate_float_parameter(1.0, 0.0, 1.0, false, "sample_rate").is_ok());
        assert!(validate_float_parameter(0.0, 0.0, 1.0, false, "sample_rate").is_err());
        assert!(validate_float_parameter(0.0, 0.0, 1.0, true, "x").is_ok());
        assert!(validate_float_parameter(f64::NAN, 0.0, 1.0, true, "x").is_err());
    }

    #[test]
    fn test_fmt_label() {
        assert_eq!(fmt_label(1.0), "1");
        assert_eq!(fmt_label(-3.0), "-3");
        assert_eq!(fmt_label(0.5), "0.5");
    }
}
