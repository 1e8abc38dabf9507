use crate::bin::UpliftBin;
use crate::splitter::{SplitInfo, SplitRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A node of an uplift tree.
///
/// Every node carries the response rate estimates of the rows that reached it
/// during training; for leaves these are the predictions.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub num: usize,
    pub depth: usize,
    pub is_leaf: bool,
    pub split_feature: usize,
    /// Threshold of a numeric split, values below it go left. Unused by leaves and categorical splits.
    pub split_value: f64,
    /// Levels sent left by a categorical split.
    pub left_cats: HashSet<usize>,
    pub missing_left: bool,
    pub split_gain: f64,
    pub left_child: usize,
    pub right_child: usize,
    pub counts: UpliftBin,
    /// Positive response rate estimate in the treatment group.
    pub p_y1_ct1: f64,
    /// Positive response rate estimate in the control group.
    pub p_y1_ct0: f64,
}

impl Node {
    /// Create a leaf, a group missing from `counts` takes its estimate from the parent.
    ///
    /// * `parent_estimates` - `(p_y1_ct1, p_y1_ct0)` of the parent node.
    pub fn new_leaf(num: usize, depth: usize, counts: UpliftBin, parent_estimates: (f64, f64)) -> Self {
        Node {
            num,
            depth,
            is_leaf: true,
            split_feature: 0,
            split_value: 0.0,
            left_cats: HashSet::new(),
            missing_left: false,
            split_gain: 0.0,
            left_child: 0,
            right_child: 0,
            counts,
            p_y1_ct1: counts.p_treatment().unwrap_or(parent_estimates.0),
            p_y1_ct0: counts.p_control().unwrap_or(parent_estimates.1),
        }
    }

    pub fn estimates(&self) -> (f64, f64) {
        (self.p_y1_ct1, self.p_y1_ct0)
    }

    pub fn uplift(&self) -> f64 {
        self.p_y1_ct1 - self.p_y1_ct0
    }

    pub fn is_categorical_split(&self) -> bool {
        !self.left_cats.is_empty()
    }

    /// Turn this leaf into a parent node.
    pub fn make_parent_node(&mut self, split: &SplitInfo, left_child: usize, right_child: usize) {
        self.is_leaf = false;
        self.split_feature = split.feature;
        match &split.rule {
            SplitRule::Numeric { threshold } => {
                self.split_value = *threshold;
                self.left_cats = HashSet::new();
            }
            SplitRule::Categorical { left_cats } => {
                self.split_value = 0.0;
                self.left_cats = left_cats.clone();
            }
        }
        self.missing_left = split.missing_left;
        self.split_gain = split.gain;
        self.left_child = left_child;
        self.right_child = right_child;
    }

    /// Get the path that should be traveled down, given a value.
    /// Categorical values are level codes, NaN is missing.
    #[inline]
    pub fn get_child_idx(&self, v: f64) -> usize {
        if v.is_nan() {
            return if self.missing_left { self.left_child } else { self.right_child };
        }
        let goes_left = if self.is_categorical_split() {
            self.left_cats.contains(&(v as usize))
        } else {
            // The last cut holds every value above the others.
            v < self.split_value || self.split_value == f64::MAX
        };
        if goes_left {
            self.left_child
        } else {
            self.right_child
        }
    }
}

impl fmt::Display for Node {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_leaf {
            write!(
                f,
                "{}:leaf={},p_y1_ct1={},p_y1_ct0={},cover={}",
                self.num,
                self.uplift(),
                self.p_y1_ct1,
                self.p_y1_ct0,
                self.counts.count()
            )
        } else if self.is_categorical_split() {
            let mut cats: Vec<&usize> = self.left_cats.iter().collect();
            cats.sort();
            write!(
                f,
                "{}:[{} in {:?}] yes={},no={},missing_left={},gain={},cover={}",
                self.num,
                self.split_feature,
                cats,
                self.left_child,
                self.right_child,
                self.missing_left,
                self.split_gain,
                self.counts.count()
            )
        } else {
            write!(
                f,
                "{}:[{} < {}] yes={},no={},missing_left={},gain={},cover={}",
                self.num,
                self.split_feature,
                self.split_value,
                self.left_child,
                self.right_child,
                self.missing_left,
                self.split_gain,
                self.counts.count()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(n_t: u64, n_t_y1: u64, n_c: u64, n_c_y1: u64) -> UpliftBin {
        UpliftBin {
            n_t,
            n_t_y1,
            n_c,
            n_c_y1,
        }
    }

    #[test]
    fn test_leaf_estimates() {
        let n = Node::new_leaf(0, 0, counts(4, 3, 2, 1), (0.0, 0.0));
        assert_eq!(n.estimates(), (0.75, 0.5));
        assert_eq!(n.uplift(), 0.25);
        // No control rows, the control estimate comes from the parent.
        let n = Node::new_leaf(1, 1, counts(4, 1, 0, 0), (0.6, 0.3));
        assert_eq!(n.estimates(), (0.25, 0.3));
    }

    #[test]
    fn test_child_routing() {
        let mut n = Node::new_leaf(0, 0, counts(4, 3, 2, 1), (0.0, 0.0));
        let split = SplitInfo {
            feature: 2,
            rule: SplitRule::Numeric { threshold: 1.5 },
            missing_left: true,
            gain: 0.1,
            left: counts(2, 2, 1, 0),
            right: counts(2, 1, 1, 1),
        };
        n.make_parent_node(&split, 1, 2);
        assert!(!n.is_leaf);
        assert_eq!(n.get_child_idx(1.0), 1);
        assert_eq!(n.get_child_idx(1.5), 2);
        assert_eq!(n.get_child_idx(f64::NAN), 1);

        // A threshold at the last cut sends every value left.
        let last_cut = SplitInfo {
            rule: SplitRule::Numeric { threshold: f64::MAX },
            ..split.clone()
        };
        n.make_parent_node(&last_cut, 1, 2);
        assert_eq!(n.get_child_idx(f64::MAX), 1);
        assert_eq!(n.get_child_idx(f64::INFINITY), 1);

        let split = SplitInfo {
            rule: SplitRule::Categorical {
                left_cats: HashSet::from([0, 3]),
            },
            missing_left: false,
            ..split
        };
        n.make_parent_node(&split, 1, 2);
        assert_eq!(n.get_child_idx(3.0), 1);
        assert_eq!(n.get_child_idx(1.0), 2);
        assert_eq!(n.get_child_idx(f64::NAN), 2);
        println!("{}", n);
    }
}
