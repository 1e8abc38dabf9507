use crate::bin::UpliftBin;
use crate::node::Node;
use crate::splitter::SplitInfo;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// One uplift tree, nodes are stored by number and the root is node 0.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub depth: usize,
    pub n_leaves: usize,
}

impl Tree {
    /// A tree holding only its root.
    ///
    /// * `root_counts` - Counts of the rows sampled for the tree.
    pub fn new(root_counts: UpliftBin) -> Self {
        Tree {
            nodes: vec![Node::new_leaf(0, 0, root_counts, (0.0, 0.0))],
            depth: 0,
            n_leaves: 1,
        }
    }

    /// Split a leaf, returning the numbers of the new children.
    pub fn split_node(&mut self, node: usize, split: &SplitInfo) -> (usize, usize) {
        let depth = self.nodes[node].depth + 1;
        let estimates = self.nodes[node].estimates();
        let left = self.nodes.len();
        let right = left + 1;
        self.nodes.push(Node::new_leaf(left, depth, split.left, estimates));
        self.nodes.push(Node::new_leaf(right, depth, split.right, estimates));
        self.nodes[node].make_parent_node(split, left, right);
        self.depth = self.depth.max(depth);
        self.n_leaves += 1;
        (left, right)
    }

    /// Update the counts of a node after its statistics were reduced.
    pub fn set_counts(&mut self, node: usize, counts: UpliftBin, parent_estimates: (f64, f64)) {
        let n = &mut self.nodes[node];
        n.counts = counts;
        n.p_y1_ct1 = counts.p_treatment().unwrap_or(parent_estimates.0);
        n.p_y1_ct0 = counts.p_control().unwrap_or(parent_estimates.1);
    }

    /// Find the leaf a row ends up in.
    ///
    /// * `value` - Returns the value of a predictor for the row.
    pub fn predict_leaf<F: Fn(usize) -> f64>(&self, value: F) -> &Node {
        let mut node = &self.nodes[0];
        while !node.is_leaf {
            node = &self.nodes[node.get_child_idx(value(node.split_feature))];
        }
        node
    }

    /// Predictors used by at least one split.
    pub fn split_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().filter(|n| !n.is_leaf).map(|n| n.split_feature)
    }

    fn get_node_stats(&self, value: &dyn Fn(&Node) -> f64, stats: &mut HashMap<usize, (f64, usize)>) {
        for n in self.nodes.iter().filter(|n| !n.is_leaf) {
            let entry = stats.entry(n.split_feature).or_insert((0.0, 0));
            entry.0 += value(n);
            entry.1 += 1;
        }
    }

    pub fn calculate_importance_weight(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|_: &Node| 1., stats);
    }

    pub fn calculate_importance_gain(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|n: &Node| n.split_gain, stats);
    }

    pub fn calculate_importance_cover(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.get_node_stats(&|n: &Node| n.counts.count() as f64, stats);
    }
}

impl Display for Tree {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<usize> = vec![0];
        let mut r = String::new();
        while let Some(idx) = print_buffer.pop() {
            let node = &self.nodes[idx];
            r += format!("{}{}\n", "      ".repeat(node.depth).as_str(), node).as_str();
            if !node.is_leaf {
                print_buffer.push(node.right_child);
                print_buffer.push(node.left_child);
            }
        }
        write!(f, "{}", r)
    }
}
