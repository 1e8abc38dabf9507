//! Divergence
//!
//! Gain criterion of the uplift trees. A split is scored by how much it
//! increases the divergence between the treatment and control response
//! distributions, normalized to penalize splits that separate the treatment
//! group from the control group (Rzepakowski & Jaroszewicz, 2012).
use crate::bin::UpliftBin;
use crate::config::UpliftMetricType;
use crate::constants::PROB_EPS;

/// Divergence between two Bernoulli distributions, given their positive rates.
pub type DivergenceFn = fn(f64, f64) -> f64;
/// Impurity of a Bernoulli distribution, given its positive rate.
pub type ImpurityFn = fn(f64) -> f64;

#[inline]
fn clamp(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Kullback-Leibler divergence of `q` from `p`.
pub fn kl_divergence(p: f64, q: f64) -> f64 {
    let (p, q) = (clamp(p), clamp(q));
    p * (p / q).ln() + (1.0 - p) * ((1.0 - p) / (1.0 - q)).ln()
}

/// Squared euclidean distance.
pub fn euclidean_distance(p: f64, q: f64) -> f64 {
    2.0 * (p - q).powi(2)
}

/// Chi-squared divergence of `p` from `q`.
pub fn chi_squared_divergence(p: f64, q: f64) -> f64 {
    let q = clamp(q);
    let d = (p - q).powi(2);
    d / q + d / (1.0 - q)
}

pub fn entropy(p: f64) -> f64 {
    let p = clamp(p);
    -(p * p.ln() + (1.0 - p) * (1.0 - p).ln())
}

pub fn gini(p: f64) -> f64 {
    1.0 - p.powi(2) - (1.0 - p).powi(2)
}

/// Divergence and the impurity used by its normalization.
pub fn divergence_callables(metric: UpliftMetricType) -> (DivergenceFn, ImpurityFn) {
    match metric.resolve() {
        UpliftMetricType::Euclidean => (euclidean_distance, gini),
        UpliftMetricType::ChiSquared => (chi_squared_divergence, gini),
        _ => (kl_divergence, entropy),
    }
}

/// Scores candidate splits with a given divergence.
#[derive(Clone, Copy)]
pub struct UpliftGain {
    divergence: DivergenceFn,
    impurity: ImpurityFn,
}

impl UpliftGain {
    pub fn new(metric: UpliftMetricType) -> Self {
        let (divergence, impurity) = divergence_callables(metric);
        UpliftGain { divergence, impurity }
    }

    /// Divergence between the treatment and control response rates of a node.
    /// Zero when either group is absent.
    pub fn node_divergence(&self, node: &UpliftBin) -> f64 {
        match (node.p_treatment(), node.p_control()) {
            (Some(pt), Some(pc)) => (self.divergence)(pt, pc),
            _ => 0.0,
        }
    }

    /// Raw gain: the row weighted divergence of the children minus the divergence of the parent.
    pub fn gain(&self, parent: &UpliftBin, left: &UpliftBin, right: &UpliftBin) -> f64 {
        let n = parent.count() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let children = (left.count() as f64 / n) * self.node_divergence(left)
            + (right.count() as f64 / n) * self.node_divergence(right);
        children - self.node_divergence(parent)
    }

    /// Normalization term of a split, always at least one half.
    pub fn normalization(&self, parent: &UpliftBin, left: &UpliftBin) -> f64 {
        let n = parent.count() as f64;
        if n == 0.0 || parent.n_t == 0 || parent.n_c == 0 {
            return 0.5;
        }
        let share_t = parent.n_t as f64 / n;
        let share_c = parent.n_c as f64 / n;
        // Share of each group sent to the left child.
        let left_t = left.n_t as f64 / parent.n_t as f64;
        let left_c = left.n_c as f64 / parent.n_c as f64;
        (self.impurity)(share_t) * (self.divergence)(left_t, left_c)
            + share_t * (self.impurity)(left_t)
            + share_c * (self.impurity)(left_c)
            + 0.5
    }

    /// Normalized gain of splitting `parent` into `left` and `right`.
    pub fn split_value(&self, parent: &UpliftBin, left: &UpliftBin, right: &UpliftBin) -> f64 {
        self.gain(parent, left, right) / self.normalization(parent, left)
    }
}
