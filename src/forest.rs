//! Forest
//!
//! Grows the trees of the forest. Trees are grown in batches, and all trees of a
//! batch are grown together one level at a time:
//!
//! 1. the rows are cut into partitions, and every partition computes the
//!    histograms of every open node from its own rows (map),
//! 2. the partition histograms are folded together in partition order (reduce),
//! 3. the best split of every open node is chosen from the reduced histograms (decide),
//! 4. every partition moves its rows to the children of the split nodes.
//!
//! Each step waits for the previous one to finish on all partitions.
use crate::bin::UpliftBin;
use crate::binning::{BinnedData, FeatureBins};
use crate::config::UpliftDrfParameters;
use crate::constants::OUT_OF_BAG;
use crate::errors::UpliftError;
use crate::histogram::{partition_stats, reduce_stats, LevelStats, OpenNode, TreeRows};
use crate::node::Node;
use crate::sampler::{sample_features, tree_rng, Sampler};
use crate::splitter::{SplitInfo, Splitter};
use crate::tree::Tree;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::ops::Range;

/// Does a row in bin `bin` of the split feature go to the left child.
#[inline]
fn bin_goes_left(node: &Node, bin: u16, feature: &FeatureBins) -> bool {
    if bin == 0 {
        return node.missing_left;
    }
    match feature {
        // Bin `bin` ends at cuts[bin - 1], it goes left if it ends at or before the threshold.
        FeatureBins::Numeric { cuts } => cuts[bin as usize - 1] <= node.split_value,
        FeatureBins::Categorical { .. } => node.left_cats.contains(&(bin as usize - 1)),
    }
}

/// The state of one tree while it is grown.
struct GrowingTree {
    tree: Tree,
    rng: StdRng,
    /// Node of every row.
    assignment: Vec<u32>,
}

/// Grows the trees of a forest from binned data.
pub struct ForestBuilder<'a, S: Splitter, R: Sampler> {
    pub data: &'a BinnedData,
    pub splitter: &'a S,
    pub sampler: &'a R,
    pub params: &'a UpliftDrfParameters,
    pub pool: &'a ThreadPool,
}

impl<'a, S: Splitter + Sync, R: Sampler + Sync> ForestBuilder<'a, S, R> {
    fn partitions(&self) -> Vec<Range<usize>> {
        let rows = self.data.rows;
        let size = self.params.chunk_size.max(1);
        (0..rows).step_by(size).map(|s| s..(s + size).min(rows)).collect()
    }

    fn mtries(&self) -> usize {
        self.params.resolved_mtries(self.data.features.len())
    }

    fn open_node(&self, grow: &mut GrowingTree, tree: usize, node: usize, depth: usize) -> OpenNode {
        OpenNode {
            tree,
            node,
            depth,
            features: sample_features(&mut grow.rng, self.data.features.len(), self.mtries()),
        }
    }

    /// Response rates of the treatment and control groups over every labelled row.
    /// Roots whose sample misses a group fall back to these.
    fn frame_estimates(&self) -> (f64, f64) {
        let mut total = UpliftBin::default();
        for (t, y) in self.data.treatment.iter().zip(self.data.response.iter()) {
            if let (Some(t), Some(y)) = (t, y) {
                total.update(*t, *y);
            }
        }
        (total.p_treatment().unwrap_or(0.0), total.p_control().unwrap_or(0.0))
    }

    /// Grow all the trees of the forest.
    pub fn build(&self) -> Result<Vec<Tree>, UpliftError> {
        let root_estimates = self.frame_estimates();
        let ntrees = self.params.ntrees;
        let batch_size = self.params.tree_batch_size.max(1);
        let mut trees = Vec::with_capacity(ntrees);
        for start in (0..ntrees).step_by(batch_size) {
            let end = (start + batch_size).min(ntrees);
            trees.extend(self.grow_batch(start..end, root_estimates)?);
            if self.params.log_iterations > 0 {
                let done_before = start / self.params.log_iterations;
                let done_after = end / self.params.log_iterations;
                if done_after > done_before {
                    let n_leaves: usize = trees.iter().map(|t| t.n_leaves).sum();
                    info!(
                        "{} of {} trees built, average number of leaves {:.1}",
                        end,
                        ntrees,
                        n_leaves as f64 / end as f64
                    );
                }
            }
        }
        Ok(trees)
    }

    /// Grow a batch of trees level by level.
    ///
    /// * `tree_ids` - Positions of the trees in the forest, used to seed them.
    /// * `root_estimates` - Estimates a root uses for a group its sample lacks.
    fn grow_batch(&self, tree_ids: Range<usize>, root_estimates: (f64, f64)) -> Result<Vec<Tree>, UpliftError> {
        let rows = self.data.rows;
        let mut growing: Vec<GrowingTree> = tree_ids
            .clone()
            .map(|t| {
                let mut rng = tree_rng(self.params.seed, t);
                let assignment = self.sampler.sample(&mut rng, rows);
                GrowingTree {
                    tree: Tree::new(Default::default()),
                    rng,
                    assignment,
                }
            })
            .collect();
        let mut open: Vec<OpenNode> = Vec::with_capacity(growing.len());
        for (t, g) in growing.iter_mut().enumerate() {
            let o = self.open_node(g, t, 0, 0);
            open.push(o);
        }

        let partitions = self.partitions();
        let mut level = 0;
        while !open.is_empty() {
            let slots = slot_tables(&growing, &open);

            // Map
            let parts: Vec<LevelStats> = {
                let tree_rows: Vec<TreeRows> = growing
                    .iter()
                    .zip(slots.iter())
                    .map(|(g, s)| TreeRows {
                        assignment: &g.assignment,
                        slots: s,
                    })
                    .collect();
                self.pool.install(|| {
                    partitions
                        .par_iter()
                        .map(|r| partition_stats(self.data, r.clone(), &tree_rows, &open))
                        .collect()
                })
            };
            // Reduce
            let stats = reduce_stats(parts)?
                .ok_or_else(|| UpliftError::Internal("no row partitions to aggregate".to_string()))?;
            if stats.nodes.len() != open.len() {
                return Err(UpliftError::Internal(format!(
                    "{} open nodes but statistics for {}",
                    open.len(),
                    stats.nodes.len()
                )));
            }
            // Decide
            let decisions: Vec<Option<SplitInfo>> = self.pool.install(|| {
                open.par_iter()
                    .zip(stats.nodes.par_iter())
                    .map(|(o, h)| {
                        if o.depth >= self.params.max_depth {
                            None
                        } else {
                            self.splitter.best_split(h, &self.data.features)
                        }
                    })
                    .collect()
            });

            let mut next_open = Vec::new();
            let mut n_splits = 0;
            for ((o, h), decision) in open.iter().zip(stats.nodes.iter()).zip(decisions) {
                let g = &mut growing[o.tree];
                if o.node == 0 {
                    g.tree.set_counts(0, h.total, root_estimates);
                    if !h.total.has_both_groups() {
                        warn!(
                            "Tree {} sampled {} treated and {} control rows, it will hold a single leaf.",
                            tree_ids.start + o.tree,
                            h.total.n_t,
                            h.total.n_c
                        );
                    }
                }
                if let Some(split) = decision {
                    n_splits += 1;
                    let (left, right) = g.tree.split_node(o.node, &split);
                    let depth = o.depth + 1;
                    for (child, counts) in [(left, split.left), (right, split.right)] {
                        if depth < self.params.max_depth && self.splitter.can_split(&counts) {
                            let child_open = self.open_node(g, o.tree, child, depth);
                            next_open.push(child_open);
                        }
                    }
                }
            }
            debug!(
                "Trees {}..{}, depth {}: {} open nodes, {} split.",
                tree_ids.start, tree_ids.end, level, open.len(), n_splits
            );

            // Move the rows to the children, rows of closed nodes are dropped.
            let next_slots = slot_tables(&growing, &next_open);
            for (g, next) in growing.iter_mut().zip(next_slots.iter()) {
                let tree = &g.tree;
                let data = self.data;
                let size = self.params.chunk_size.max(1);
                self.pool.install(|| {
                    g.assignment.par_chunks_mut(size).enumerate().for_each(|(ci, chunk)| {
                        for (j, a) in chunk.iter_mut().enumerate() {
                            if *a == OUT_OF_BAG {
                                continue;
                            }
                            let node = &tree.nodes[*a as usize];
                            if node.is_leaf {
                                *a = OUT_OF_BAG;
                                continue;
                            }
                            let row = ci * size + j;
                            let feature = node.split_feature;
                            let bin = data.get_col(feature)[row];
                            let child = if bin_goes_left(node, bin, &data.features[feature]) {
                                node.left_child
                            } else {
                                node.right_child
                            };
                            *a = if next.get(child).map_or(true, |s| *s == OUT_OF_BAG) {
                                OUT_OF_BAG
                            } else {
                                child as u32
                            };
                        }
                    })
                });
            }

            open = next_open;
            level += 1;
        }

        Ok(growing.into_iter().map(|g| g.tree).collect())
    }
}

/// For every tree, the open node slot of each of its nodes.
fn slot_tables(growing: &[GrowingTree], open: &[OpenNode]) -> Vec<Vec<u32>> {
    let mut slots: Vec<Vec<u32>> = growing
        .iter()
        .map(|g| vec![OUT_OF_BAG; g.tree.nodes.len()])
        .collect();
    for (i, o) in open.iter().enumerate() {
        slots[o.tree][o.node] = i as u32;
    }
    slots
}
