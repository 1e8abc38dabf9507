//! Uplift metrics
//!
//! Average treatment effects and the area under the uplift curve (AUUC),
//! computed from predicted uplift, treatment group and response of each row.
use crate::config::AuucType;
use serde::{Deserialize, Serialize};

/// Value of an uplift curve at one cumulative threshold.
pub type AuucFn = fn(&CumulativeCounts) -> f64;

/// Counts of the rows with the highest predicted uplift, up to a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeCounts {
    pub n_t: f64,
    pub y_t: f64,
    pub n_c: f64,
    pub y_c: f64,
}

pub fn qini(c: &CumulativeCounts) -> f64 {
    if c.n_c > 0.0 {
        c.y_t - c.y_c * c.n_t / c.n_c
    } else {
        c.y_t
    }
}

pub fn lift(c: &CumulativeCounts) -> f64 {
    if c.n_t > 0.0 && c.n_c > 0.0 {
        c.y_t / c.n_t - c.y_c / c.n_c
    } else {
        0.0
    }
}

pub fn gain(c: &CumulativeCounts) -> f64 {
    lift(c) * (c.n_t + c.n_c)
}

pub fn auuc_callable(auuc_type: AuucType) -> AuucFn {
    match auuc_type.resolve() {
        AuucType::Lift => lift,
        AuucType::Gain => gain,
        _ => qini,
    }
}

fn trapezoid_area(x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    (x0 - x1).abs() * (y0 + y1) * 0.5
}

/// Row order of an uplift curve: highest uplift first, ties by row index.
fn uplift_order(uplift: &[f64]) -> Vec<usize> {
    let mut indices = (0..uplift.len()).collect::<Vec<_>>();
    indices.sort_by(|&a, &b| uplift[b].total_cmp(&uplift[a]).then(a.cmp(&b)));
    indices
}

/// Cumulative counts at the end of each of `nbins` equal-count groups of rows,
/// paired with the share of rows up to that point.
///
/// Rows without a known treatment group or response are left out.
pub fn cumulative_counts(
    uplift: &[f64],
    treatment: &[Option<u8>],
    response: &[Option<u8>],
    nbins: usize,
) -> Vec<(f64, CumulativeCounts)> {
    let order: Vec<usize> = uplift_order(uplift)
        .into_iter()
        .filter(|&i| treatment[i].is_some() && response[i].is_some())
        .collect();
    let n = order.len();
    if n == 0 {
        return Vec::new();
    }
    let groups = nbins.clamp(1, n);
    let mut counts = CumulativeCounts::default();
    let mut curve = Vec::with_capacity(groups);
    let mut start = 0;
    for g in 0..groups {
        let end = ((g + 1) * n) / groups;
        for &i in &order[start..end] {
            let y = f64::from(response[i].unwrap_or(0));
            if treatment[i] == Some(1) {
                counts.n_t += 1.0;
                counts.y_t += y;
            } else {
                counts.n_c += 1.0;
                counts.y_c += y;
            }
        }
        curve.push((end as f64 / n as f64, counts));
        start = end;
    }
    curve
}

/// Area under the uplift curve, starting from the origin.
pub fn auuc(curve: &[(f64, CumulativeCounts)], auuc_type: AuucType) -> f64 {
    let value = auuc_callable(auuc_type);
    let mut area = 0.0;
    let (mut x_prev, mut y_prev) = (0.0, 0.0);
    for (x, counts) in curve {
        let y = value(counts);
        area += trapezoid_area(x_prev, *x, y_prev, y);
        x_prev = *x;
        y_prev = y;
    }
    area
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Mean uplift over all rows (ATE), over treated rows (ATT), and over control rows (ATC).
pub fn treatment_effects(uplift: &[f64], treatment: &[Option<u8>]) -> (f64, f64, f64) {
    let ate = mean(uplift.iter().copied());
    let att = mean(
        uplift
            .iter()
            .zip(treatment)
            .filter(|(_, t)| **t == Some(1))
            .map(|(u, _)| *u),
    );
    let atc = mean(
        uplift
            .iter()
            .zip(treatment)
            .filter(|(_, t)| **t == Some(0))
            .map(|(u, _)| *u),
    );
    (ate, att, atc)
}

/// Training metrics of an uplift model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpliftMetrics {
    pub ate: f64,
    pub att: f64,
    pub atc: f64,
    /// AUUC of the configured type.
    pub auuc: f64,
    pub auuc_type: AuucType,
    pub qini: f64,
    pub lift: f64,
    pub gain: f64,
    /// Number of groups the curve was computed over.
    pub auuc_nbins: usize,
}

impl UpliftMetrics {
    pub fn calculate(
        uplift: &[f64],
        treatment: &[Option<u8>],
        response: &[Option<u8>],
        auuc_type: AuucType,
        auuc_nbins: usize,
    ) -> Self {
        let (ate, att, atc) = treatment_effects(uplift, treatment);
        let curve = cumulative_counts(uplift, treatment, response, auuc_nbins);
        let auuc_type = auuc_type.resolve();
        UpliftMetrics {
            ate,
            att,
            atc,
            auuc: auuc(&curve, auuc_type),
            auuc_type,
            qini: auuc(&curve, AuucType::Qini),
            lift: auuc(&curve, AuucType::Lift),
            gain: auuc(&curve, AuucType::Gain),
            auuc_nbins: curve.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::precision_round;

    fn rows() -> (Vec<f64>, Vec<Option<u8>>, Vec<Option<u8>>) {
        (
            vec![0.1, 0.3, 0.2, 0.4],
            vec![Some(0), Some(0), Some(1), Some(1)],
            vec![Some(1), Some(0), Some(0), Some(1)],
        )
    }

    #[test]
    fn test_treatment_effects() {
        let (u, t, _) = rows();
        let (ate, att, atc) = treatment_effects(&u, &t);
        assert_eq!(precision_round(ate, 6), 0.25);
        assert_eq!(precision_round(att, 6), 0.3);
        assert_eq!(precision_round(atc, 6), 0.2);
        let (_, att, _) = treatment_effects(&u, &[Some(0); 4]);
        assert!(att.is_nan());
    }

    #[test]
    fn test_auuc() {
        let (u, t, y) = rows();
        let curve = cumulative_counts(&u, &t, &y, 4);
        assert_eq!(curve.len(), 4);
        assert_eq!(curve[3].0, 1.0);
        assert_eq!(precision_round(auuc(&curve, AuucType::Qini), 6), 0.75);
        assert_eq!(precision_round(auuc(&curve, AuucType::AUTO), 6), 0.75);
        assert_eq!(precision_round(auuc(&curve, AuucType::Lift), 6), 0.375);
        assert_eq!(precision_round(auuc(&curve, AuucType::Gain), 6), 0.875);
    }

    #[test]
    fn test_groups_capped_by_rows() {
        let (u, t, y) = rows();
        let m = UpliftMetrics::calculate(&u, &t, &y, AuucType::Lift, 1000);
        assert_eq!(m.auuc_nbins, 4);
        assert_eq!(m.auuc_type, AuucType::Lift);
        assert_eq!(m.auuc, m.lift);

        let curve = cumulative_counts(&u, &t, &y, 2);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].1.n_t + curve[0].1.n_c, 2.0);
    }

    #[test]
    fn test_ties_and_missing_labels() {
        let u = vec![0.5, 0.5, 0.5];
        let t = vec![Some(1), None, Some(0)];
        let y = vec![Some(1), Some(1), Some(0)];
        let curve = cumulative_counts(&u, &t, &y, 10);
        // The unlabelled row is dropped, the first row by index comes first.
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].1.n_t, 1.0);
        assert_eq!(curve[0].1.n_c, 0.0);
        assert!(cumulative_counts(&[], &[], &[], 10).is_empty());
    }
}
