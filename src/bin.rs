//! Bin
//!
//! The sufficient statistic of the uplift split search: row counts by
//! treatment group and response.
use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, Sub};

/// Counts of the rows falling into a histogram bin or a node.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpliftBin {
    /// Rows in the treatment group.
    pub n_t: u64,
    /// Rows in the treatment group with a positive response.
    pub n_t_y1: u64,
    /// Rows in the control group.
    pub n_c: u64,
    /// Rows in the control group with a positive response.
    pub n_c_y1: u64,
}

impl UpliftBin {
    /// Add one row.
    #[inline]
    pub fn update(&mut self, treatment: u8, response: u8) {
        if treatment == 1 {
            self.n_t += 1;
            self.n_t_y1 += response as u64;
        } else {
            self.n_c += 1;
            self.n_c_y1 += response as u64;
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.n_t + self.n_c
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Does it hold rows from both groups.
    #[inline]
    pub fn has_both_groups(&self) -> bool {
        self.n_t > 0 && self.n_c > 0
    }

    /// Positive response rate in the treatment group, `None` without treated rows.
    pub fn p_treatment(&self) -> Option<f64> {
        (self.n_t > 0).then(|| self.n_t_y1 as f64 / self.n_t as f64)
    }

    /// Positive response rate in the control group, `None` without control rows.
    pub fn p_control(&self) -> Option<f64> {
        (self.n_c > 0).then(|| self.n_c_y1 as f64 / self.n_c as f64)
    }

    /// Observed uplift, used to order categorical levels.
    pub fn uplift(&self) -> f64 {
        self.p_treatment().unwrap_or(0.0) - self.p_control().unwrap_or(0.0)
    }
}

impl AddAssign for UpliftBin {
    fn add_assign(&mut self, other: Self) {
        self.n_t += other.n_t;
        self.n_t_y1 += other.n_t_y1;
        self.n_c += other.n_c;
        self.n_c_y1 += other.n_c_y1;
    }
}

impl Sub for UpliftBin {
    type Output = UpliftBin;

    /// The counts of a parent minus one of its children.
    fn sub(self, other: Self) -> UpliftBin {
        UpliftBin {
            n_t: self.n_t - other.n_t,
            n_t_y1: self.n_t_y1 - other.n_t_y1,
            n_c: self.n_c - other.n_c,
            n_c_y1: self.n_c_y1 - other.n_c_y1,
        }
    }
}
