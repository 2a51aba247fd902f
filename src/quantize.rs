//! Log-quantization: greedy decomposition of a weight into signed powers
//! of two.
//!
//! Each step takes `e = ceil(log2|r|)` of the running remainder `r`, records
//! `±2^e` and subtracts it. Because `2^(e-1) < |r| <= 2^e`, the subtraction
//! is exact and the new remainder is smaller than `2^(e-1)`, so fragments
//! come out in strictly decreasing magnitude and every unused tail is bounded
//! by the last used fragment.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::float::exp2i;

/// Upper bound on fragments per weight; an exact `f64` remainder reaches
/// zero well before this.
const MAX_FRAGMENTS: usize = 2100;

/// Largest exponent whose power of two is a finite `f64`.
const MAX_EXPONENT: i32 = f64::MAX_EXP - 1;

/// One signed power-of-two term: `(negative ? -1 : 1) * 2^exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightFragment {
    pub exponent: i32,
    pub negative: bool,
}

impl WeightFragment {
    pub fn new(exponent: i32, negative: bool) -> Self {
        WeightFragment { exponent, negative }
    }

    pub fn magnitude(&self) -> f64 {
        exp2i(self.exponent)
    }

    pub fn value(&self) -> f64 {
        if self.negative {
            -self.magnitude()
        } else {
            self.magnitude()
        }
    }
}

/// Fragments indexed by `[output neuron][input][term]`.
pub type FragmentMatrix = Vec<Vec<Vec<WeightFragment>>>;

pub fn check_precision(precision: f64) -> Result<()> {
    if precision.is_finite() && precision > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidPrecision(precision))
    }
}

/// Decompose `weight` until the remainder is within `precision`.
pub fn quantize_weight(weight: f64, precision: f64) -> Result<Vec<WeightFragment>> {
    check_precision(precision)?;
    if !weight.is_finite() {
        return Err(Error::NonFiniteWeight(weight));
    }

    let mut fragments = Vec::new();
    let mut remainder = weight;
    while remainder != 0.0 && remainder.abs() > precision && fragments.len() < MAX_FRAGMENTS {
        let negative = remainder < 0.0;
        let exponent =
            ceil_log2(remainder.abs()).ok_or(Error::WeightOutOfRange(weight))?;
        let fragment = WeightFragment::new(exponent, negative);
        remainder -= fragment.value();
        fragments.push(fragment);
    }
    Ok(fragments)
}

/// Quantize a `[output][input]` weight matrix.
pub fn quantize_matrix(weights: &[Vec<f64>], precision: f64) -> Result<FragmentMatrix> {
    check_precision(precision)?;
    weights
        .par_iter()
        .map(|row| {
            row.iter()
                .map(|w| quantize_weight(*w, precision))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

/// `Σ ±2^exponent` over the first `steps` fragments (all of them if `None`).
pub fn reconstruct(fragments: &[WeightFragment], steps: Option<usize>) -> f64 {
    let n = steps.unwrap_or(fragments.len()).min(fragments.len());
    fragments[..n].iter().map(WeightFragment::value).sum()
}

/// Longest fragment list in the matrix.
pub fn max_fragment_count(matrix: &FragmentMatrix) -> usize {
    matrix
        .iter()
        .flatten()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
}

/// Total number of fragments in the matrix.
pub fn fragment_count(matrix: &FragmentMatrix) -> usize {
    matrix.iter().flatten().map(Vec::len).sum()
}

/// Smallest `e` with `x <= 2^e`, for finite `x > 0`. `None` when that
/// power of two is not a finite `f64`.
fn ceil_log2(x: f64) -> Option<i32> {
    if !x.is_finite() || x <= 0.0 {
        return None;
    }
    let mut e = x.log2().ceil() as i32;
    while exp2i(e) < x {
        e += 1;
    }
    while exp2i(e - 1) >= x {
        e -= 1;
    }
    (e <= MAX_EXPONENT).then_some(e)
}
