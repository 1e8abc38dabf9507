//! Histogram
//!
//! Per node, per feature histograms of [`UpliftBin`] counts. Histograms are
//! built independently for each row partition and then merged, so the split
//! search never needs the rows themselves.
use crate::bin::UpliftBin;
use crate::binning::BinnedData;
use crate::constants::OUT_OF_BAG;
use crate::errors::UpliftError;
use std::ops::Range;

/// A node that is still open at the current level, and the features drawn for it.
#[derive(Debug, Clone)]
pub struct OpenNode {
    /// Position of the tree in the current batch.
    pub tree: usize,
    /// Node number within its tree.
    pub node: usize,
    pub depth: usize,
    /// Features to evaluate, in ascending order.
    pub features: Vec<usize>,
}

/// Histogram of one feature at one node.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHistogram {
    pub feature: usize,
    pub bins: Vec<UpliftBin>,
}

impl FeatureHistogram {
    pub fn empty(feature: usize, n_bins: usize) -> Self {
        FeatureHistogram {
            feature,
            bins: vec![UpliftBin::default(); n_bins],
        }
    }
}

/// All histograms of one open node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHistogram {
    pub total: UpliftBin,
    pub features: Vec<FeatureHistogram>,
}

impl NodeHistogram {
    pub fn empty(open: &OpenNode, data: &BinnedData) -> Self {
        NodeHistogram {
            total: UpliftBin::default(),
            features: open
                .features
                .iter()
                .map(|f| FeatureHistogram::empty(*f, data.features[*f].n_bins()))
                .collect(),
        }
    }

    fn merge(&mut self, other: &NodeHistogram) -> Result<(), UpliftError> {
        if self.features.len() != other.features.len() {
            return Err(UpliftError::Internal(format!(
                "node histograms hold {} and {} features",
                self.features.len(),
                other.features.len()
            )));
        }
        self.total += other.total;
        for (a, b) in self.features.iter_mut().zip(other.features.iter()) {
            if a.feature != b.feature || a.bins.len() != b.bins.len() {
                return Err(UpliftError::Internal(format!(
                    "histogram of feature {} with {} bins can not be merged with feature {} with {} bins",
                    a.feature,
                    a.bins.len(),
                    b.feature,
                    b.bins.len()
                )));
            }
            for (x, y) in a.bins.iter_mut().zip(b.bins.iter()) {
                *x += *y;
            }
        }
        Ok(())
    }
}

/// Statistics of every open node of a level, over some set of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStats {
    pub nodes: Vec<NodeHistogram>,
}

impl LevelStats {
    pub fn empty(open: &[OpenNode], data: &BinnedData) -> Self {
        LevelStats {
            nodes: open.iter().map(|o| NodeHistogram::empty(o, data)).collect(),
        }
    }

    /// Fold another partition's statistics into these.
    pub fn merge(&mut self, other: &LevelStats) -> Result<(), UpliftError> {
        if self.nodes.len() != other.nodes.len() {
            return Err(UpliftError::Internal(format!(
                "level statistics hold {} and {} nodes",
                self.nodes.len(),
                other.nodes.len()
            )));
        }
        for (a, b) in self.nodes.iter_mut().zip(other.nodes.iter()) {
            a.merge(b)?;
        }
        Ok(())
    }
}

/// Where the rows of a tree currently are.
pub struct TreeRows<'a> {
    /// Node of every row, [`OUT_OF_BAG`] when the row is not used.
    pub assignment: &'a [u32],
    /// Slot in the open node list for each node of the tree, [`OUT_OF_BAG`] for closed nodes.
    pub slots: &'a [u32],
}

/// Build the statistics of a single row partition.
///
/// * `data` - Binned training data.
/// * `rows` - The row range of this partition.
/// * `trees` - Row placement for every tree of the batch.
/// * `open` - The open nodes of the level, indexed by slot.
pub fn partition_stats(data: &BinnedData, rows: Range<usize>, trees: &[TreeRows], open: &[OpenNode]) -> LevelStats {
    let mut stats = LevelStats::empty(open, data);
    for row in rows {
        let (t, y) = match (data.treatment[row], data.response[row]) {
            (Some(t), Some(y)) => (t, y),
            _ => continue,
        };
        for tree in trees.iter() {
            let node = tree.assignment[row];
            if node == OUT_OF_BAG {
                continue;
            }
            let slot = tree.slots[node as usize];
            if slot == OUT_OF_BAG {
                continue;
            }
            let node_stats = &mut stats.nodes[slot as usize];
            node_stats.total.update(t, y);
            for hist in node_stats.features.iter_mut() {
                let bin = data.get_col(hist.feature)[row] as usize;
                hist.bins[bin].update(t, y);
            }
        }
    }
    stats
}

/// Combine partition statistics, in partition order.
pub fn reduce_stats(parts: Vec<LevelStats>) -> Result<Option<LevelStats>, UpliftError> {
    let mut parts = parts.into_iter();
    let mut acc = match parts.next() {
        Some(first) => first,
        None => return Ok(None),
    };
    for part in parts {
        acc.merge(&part)?;
    }
    Ok(Some(acc))
}
