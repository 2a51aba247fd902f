//! Anytime variant of the log-quantized dense layer.
//!
//! Only the first `steps` fragments of every weight are applied. Interval
//! evaluation widens the result by a bound on the fragments not yet used,
//! so the bound stays sound for the fully quantized weights at every step
//! and tightens as `steps` grows.

use rayon::prelude::*;

use super::dense::affine_interval;
use super::log::{prefix_weights, weighted_sum};
use super::{check_rectangular, check_rows, Evaluate, IntervalEvaluate, Lower};
use crate::error::{Error, Result};
use crate::hdl::{Module, SignalId};
use crate::interval::Interval;
use crate::lower::LowerEnv;
use crate::quantize::{max_fragment_count, FragmentMatrix, WeightFragment};

#[derive(Clone, Debug, PartialEq)]
pub struct IncrementalLogLayer {
    fragments: FragmentMatrix,
    steps: usize,
    max_steps: usize,
}

impl IncrementalLogLayer {
    /// Starts fully refined (`steps == max_steps`).
    pub fn new(fragments: FragmentMatrix) -> Result<Self> {
        check_rectangular("incremental fragment matrix", &fragments)?;
        let max_steps = max_fragment_count(&fragments);
        Ok(IncrementalLogLayer {
            fragments,
            steps: max_steps,
            max_steps,
        })
    }

    pub fn fragments(&self) -> &FragmentMatrix {
        &self.fragments
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Longest fragment list across the matrix.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Use the first `k` fragments of every weight. Returns `true` once no
    /// further refinement is possible.
    pub fn set_steps(&mut self, k: usize) -> bool {
        self.steps = k.min(self.max_steps);
        k >= self.max_steps
    }

    pub fn is_saturated(&self) -> bool {
        self.steps >= self.max_steps
    }

    pub fn input_width(&self) -> usize {
        self.fragments.first().map(Vec::len).unwrap_or(0)
    }

    pub fn output_width(&self) -> usize {
        self.fragments.len()
    }
}

/// Bound on `|Σ fragments[k..]|`.
///
/// Fragments shrink by at least half each step, so the unused tail is
/// below twice its first term, which is at most the last used term. With
/// nothing used the whole weight is below `2·|f_0|`.
pub(crate) fn remainder_bound(fragments: &[WeightFragment], k: usize) -> f64 {
    if k >= fragments.len() {
        0.0
    } else if k == 0 {
        2.0 * fragments[0].magnitude()
    } else {
        fragments[k - 1].magnitude()
    }
}

impl Evaluate for IncrementalLogLayer {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        check_rows("incremental log layer", &self.fragments, inputs.len())?;
        Ok(weighted_sum(
            &prefix_weights(&self.fragments, Some(self.steps)),
            inputs,
        ))
    }
}

impl IntervalEvaluate for IncrementalLogLayer {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        check_rows("incremental log layer", &self.fragments, inputs.len())?;
        let weights = prefix_weights(&self.fragments, Some(self.steps));
        let k = self.steps;
        Ok(weights
            .par_iter()
            .zip(self.fragments.par_iter())
            .map(|(row, fragments)| {
                let mut bound = affine_interval(row, inputs);
                // The tail can carry either sign, so it widens both ends by
                // its largest possible contribution.
                for (x, f) in inputs.iter().zip(fragments) {
                    let slack = remainder_bound(f, k) * x.magnitude();
                    bound.lo -= slack;
                    bound.hi += slack;
                }
                bound
            })
            .collect())
    }
}

impl Lower for IncrementalLogLayer {
    fn lower(
        &self,
        _inputs: &[SignalId],
        _module: &mut Module,
        _env: &mut LowerEnv,
    ) -> Result<Vec<SignalId>> {
        Err(Error::Unsupported {
            operation: "lower",
            layer: "incremental log",
        })
    }
}
