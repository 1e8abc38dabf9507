//! Splitter
//!
//! Finds the best split of a node from its reduced histograms.
use crate::bin::UpliftBin;
use crate::binning::FeatureBins;
use crate::divergence::UpliftGain;
use crate::histogram::{FeatureHistogram, NodeHistogram};
use std::collections::HashSet;

/// How the rows of a node are divided between its children.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// Values strictly below the threshold go left.
    Numeric { threshold: f64 },
    /// Levels in the set go left.
    Categorical { left_cats: HashSet<usize> },
}

/// The outcome of a split search.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    pub feature: usize,
    pub rule: SplitRule,
    /// Do missing values follow the left child.
    pub missing_left: bool,
    /// Normalized gain of the split.
    pub gain: f64,
    pub left: UpliftBin,
    pub right: UpliftBin,
}

/// Trait for finding splits.
pub trait Splitter {
    /// Is a node with these counts allowed to be split at all.
    fn can_split(&self, total: &UpliftBin) -> bool;

    /// The best qualifying split of a node, `None` if the node should be a leaf.
    ///
    /// * `hist` - Reduced histograms of the node.
    /// * `features` - Binning of every feature, indexed by feature number.
    fn best_split(&self, hist: &NodeHistogram, features: &[FeatureBins]) -> Option<SplitInfo>;
}

/// Splitter maximizing the normalized divergence gain.
pub struct UpliftSplitter {
    pub gain: UpliftGain,
    /// Fewest rows allowed in a child.
    pub min_rows: u64,
    /// A split is only kept if its gain is above this value.
    pub min_split_improvement: f64,
}

/// A candidate partition of the non missing bins, before the missing bin is placed.
struct Candidate {
    left: UpliftBin,
    /// Bins sent left, as positions in the scan order.
    n_left: usize,
}

impl UpliftSplitter {
    pub fn new(gain: UpliftGain, min_rows: usize, min_split_improvement: f64) -> Self {
        UpliftSplitter {
            gain,
            min_rows: min_rows as u64,
            min_split_improvement,
        }
    }

    fn is_valid_child(&self, child: &UpliftBin) -> bool {
        child.count() >= self.min_rows && child.has_both_groups()
    }

    /// Best split of a single feature.
    ///
    /// Numeric bins are scanned in ascending order. Categorical levels are
    /// sorted by their observed uplift and scanned as prefixes of that order.
    /// For each candidate, missing values are tried on the right first, then on the left.
    fn best_feature_split(
        &self,
        total: &UpliftBin,
        hist: &FeatureHistogram,
        bins: &FeatureBins,
    ) -> Option<SplitInfo> {
        let missing = hist.bins[0];
        let mut order: Vec<usize> = (1..hist.bins.len()).filter(|b| !hist.bins[*b].is_empty()).collect();
        if bins.is_categorical() {
            order.sort_by(|a, b| {
                hist.bins[*a]
                    .uplift()
                    .total_cmp(&hist.bins[*b].uplift())
                    .then(a.cmp(b))
            });
        }
        if order.len() < 2 && missing.is_empty() {
            return None;
        }

        let mut candidates = Vec::with_capacity(order.len());
        let mut left = UpliftBin::default();
        for (i, b) in order.iter().enumerate() {
            left += hist.bins[*b];
            candidates.push(Candidate { left, n_left: i + 1 });
        }

        let mut best: Option<(f64, usize, bool, UpliftBin)> = None;
        for c in candidates.iter() {
            let placements: &[bool] = if missing.is_empty() { &[false] } else { &[false, true] };
            for missing_left in placements {
                let mut l = c.left;
                if *missing_left {
                    l += missing;
                }
                let r = *total - l;
                if !self.is_valid_child(&l) || !self.is_valid_child(&r) {
                    continue;
                }
                let value = self.gain.split_value(total, &l, &r);
                if best.as_ref().map_or(true, |(v, _, _, _)| value > *v) {
                    best = Some((value, c.n_left, *missing_left, l));
                }
            }
        }

        best.map(|(value, n_left, missing_left, left)| {
            let rule = match bins {
                FeatureBins::Numeric { cuts } => {
                    // The last bin sent left is order[n_left - 1], it ends at this cut.
                    let last = order[n_left - 1];
                    SplitRule::Numeric {
                        threshold: cuts[last - 1],
                    }
                }
                FeatureBins::Categorical { .. } => SplitRule::Categorical {
                    left_cats: order[..n_left].iter().map(|b| b - 1).collect(),
                },
            };
            let right = *total - left;
            // With no missing values seen, unseen missing values follow the larger child.
            let missing_left = if missing.is_empty() {
                left.count() >= right.count()
            } else {
                missing_left
            };
            SplitInfo {
                feature: hist.feature,
                rule,
                missing_left,
                gain: value,
                left,
                right,
            }
        })
    }
}

impl Splitter for UpliftSplitter {
    fn can_split(&self, total: &UpliftBin) -> bool {
        total.count() >= 2 * self.min_rows && total.has_both_groups()
    }

    fn best_split(&self, hist: &NodeHistogram, features: &[FeatureBins]) -> Option<SplitInfo> {
        if !self.can_split(&hist.total) {
            return None;
        }
        let mut best: Option<SplitInfo> = None;
        for fh in hist.features.iter() {
            if let Some(s) = self.best_feature_split(&hist.total, fh, &features[fh.feature]) {
                // Strictly better only, the first feature wins ties.
                if best.as_ref().map_or(true, |b| s.gain > b.gain) {
                    best = Some(s);
                }
            }
        }
        best.filter(|b| b.gain > self.min_split_improvement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpliftMetricType;

    fn bin(n_t: u64, n_t_y1: u64, n_c: u64, n_c_y1: u64) -> UpliftBin {
        UpliftBin {
            n_t,
            n_t_y1,
            n_c,
            n_c_y1,
        }
    }

    fn node(features: Vec<FeatureHistogram>) -> NodeHistogram {
        let mut total = UpliftBin::default();
        for b in features[0].bins.iter() {
            total += *b;
        }
        NodeHistogram { total, features }
    }

    fn splitter(min_rows: usize) -> UpliftSplitter {
        UpliftSplitter::new(UpliftGain::new(UpliftMetricType::KL), min_rows, 1e-5)
    }

    #[test]
    fn test_numeric_split_threshold() {
        // Treatment helps only for small values of the feature.
        let bins = vec![
            UpliftBin::default(),
            bin(10, 9, 10, 1),
            bin(10, 9, 10, 1),
            bin(10, 2, 10, 2),
            bin(10, 2, 10, 2),
        ];
        let fb = vec![FeatureBins::Numeric {
            cuts: vec![1., 2., 3., f64::MAX],
        }];
        let hist = node(vec![FeatureHistogram { feature: 0, bins }]);
        let s = splitter(5).best_split(&hist, &fb).unwrap();
        assert_eq!(s.feature, 0);
        assert_eq!(s.rule, SplitRule::Numeric { threshold: 2. });
        assert_eq!(s.left, bin(20, 18, 20, 2));
        assert_eq!(s.right, bin(20, 4, 20, 4));
        assert!(s.gain > 0.0);
    }

    #[test]
    fn test_categorical_split_orders_by_uplift() {
        // Levels 0 and 2 respond to treatment, level 1 does not.
        let bins = vec![
            UpliftBin::default(),
            bin(10, 9, 10, 1),
            bin(10, 2, 10, 2),
            bin(10, 9, 10, 1),
        ];
        let fb = vec![FeatureBins::Categorical { n_levels: 3 }];
        let hist = node(vec![FeatureHistogram { feature: 0, bins }]);
        let s = splitter(5).best_split(&hist, &fb).unwrap();
        // The prefix of the uplift ordering holds the non responsive level.
        assert_eq!(
            s.rule,
            SplitRule::Categorical {
                left_cats: HashSet::from([1])
            }
        );
        assert_eq!(s.right, bin(20, 18, 20, 2));
    }

    #[test]
    fn test_missing_values_direction() {
        let bins = vec![
            bin(10, 9, 10, 1),
            bin(10, 9, 10, 1),
            bin(10, 2, 10, 2),
        ];
        let fb = vec![FeatureBins::Numeric { cuts: vec![1., f64::MAX] }];
        let hist = node(vec![FeatureHistogram { feature: 0, bins }]);
        let s = splitter(5).best_split(&hist, &fb).unwrap();
        assert!(s.missing_left);
        assert_eq!(s.left, bin(20, 18, 20, 2));
    }

    #[test]
    fn test_min_rows_and_groups() {
        let bins = vec![UpliftBin::default(), bin(3, 3, 3, 0), bin(10, 2, 10, 2)];
        let fb = vec![FeatureBins::Numeric { cuts: vec![1., f64::MAX] }];
        let hist = node(vec![FeatureHistogram { feature: 0, bins }]);
        // The left child would hold 6 rows.
        assert!(splitter(7).best_split(&hist, &fb).is_none());
        assert!(splitter(6).best_split(&hist, &fb).is_some());

        // A child without control rows never qualifies.
        let bins = vec![UpliftBin::default(), bin(10, 9, 0, 0), bin(10, 2, 20, 2)];
        let hist = node(vec![FeatureHistogram { feature: 0, bins }]);
        assert!(splitter(1).best_split(&hist, &fb).is_none());
    }

    #[test]
    fn test_no_improvement_is_leaf() {
        let bins = vec![UpliftBin::default(), bin(10, 5, 10, 5), bin(10, 5, 10, 5)];
        let fb = vec![FeatureBins::Numeric { cuts: vec![1., f64::MAX] }];
        let hist = node(vec![FeatureHistogram { feature: 0, bins }]);
        assert!(splitter(1).best_split(&hist, &fb).is_none());
    }

    #[test]
    fn test_ties_keep_first_feature() {
        let bins = vec![UpliftBin::default(), bin(10, 9, 10, 1), bin(10, 2, 10, 2)];
        let fb = vec![
            FeatureBins::Numeric { cuts: vec![1., f64::MAX] },
            FeatureBins::Numeric { cuts: vec![5., f64::MAX] },
        ];
        let hist = node(vec![
            FeatureHistogram {
                feature: 0,
                bins: bins.clone(),
            },
            FeatureHistogram { feature: 1, bins },
        ]);
        let s = splitter(1).best_split(&hist, &fb).unwrap();
        assert_eq!(s.feature, 0);
        assert_eq!(s.rule, SplitRule::Numeric { threshold: 1. });
    }
}
