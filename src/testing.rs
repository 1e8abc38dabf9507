//! Synthetic data shared by the unit tests.
use crate::data::{Column, Frame};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A frame where treatment raises conversion only when `C0 < 0.5`.
///
/// Columns: `C0`, `C1` numeric in `[0, 1)`, `segment` categorical with levels
/// `a`, `b`, `c`, `treatment` in `{C, T}`, `conversion` in `{0, 1}`.
pub fn uplift_frame(n: usize, seed: u64) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut c0 = Vec::with_capacity(n);
    let mut c1 = Vec::with_capacity(n);
    let mut segment = Vec::with_capacity(n);
    let mut treatment = Vec::with_capacity(n);
    let mut conversion = Vec::with_capacity(n);
    for _ in 0..n {
        let x0: f64 = rng.gen();
        let x1: f64 = rng.gen();
        let treated = rng.gen_bool(0.5);
        let p = if treated && x0 < 0.5 { 0.7 } else { 0.2 };
        c0.push(x0);
        c1.push(x1);
        segment.push(["a", "b", "c"][rng.gen_range(0..3)]);
        treatment.push(if treated { "T" } else { "C" });
        conversion.push(if rng.gen_bool(p) { "1" } else { "0" });
    }
    Frame::new(vec![
        Column::numeric("C0", c0),
        Column::numeric("C1", c1),
        Column::from_labels("segment", &segment),
        Column::from_labels("treatment", &treatment),
        Column::from_labels("conversion", &conversion),
    ])
    .unwrap()
}

/// The ten row frame used by the configuration tests.
pub fn small_frame(treatment: &[&str], conversion: &[&str]) -> Frame {
    let x: Vec<f64> = (0..10).map(|v| v as f64).collect();
    Frame::new(vec![
        Column::numeric("C0", x.clone()),
        Column::numeric("C1", x),
        Column::from_labels("treatment", treatment),
        Column::from_labels("conversion", conversion),
    ])
    .unwrap()
}
