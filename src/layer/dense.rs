//! Fully connected layer with real-valued weights.

use rayon::prelude::*;

use super::{check_rectangular, check_rows, Evaluate, IntervalEvaluate, Lower};
use crate::adder::build_adder;
use crate::error::{Error, Result};
use crate::hdl::primitive::FP_MULTIPLIER;
use crate::hdl::{Module, ParamValue, SignalId};
use crate::interval::Interval;
use crate::lower::LowerEnv;

/// `y_j = Σ_i w[j][i] · x_i`
#[derive(Clone, Debug, PartialEq)]
pub struct DenseLayer {
    weights: Vec<Vec<f64>>,
}

impl DenseLayer {
    /// `weights` is indexed `[output][input]` and must be rectangular.
    pub fn new(weights: Vec<Vec<f64>>) -> Result<Self> {
        check_rectangular("dense weight matrix", &weights)?;
        Ok(DenseLayer { weights })
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn input_width(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn output_width(&self) -> usize {
        self.weights.len()
    }
}

impl Evaluate for DenseLayer {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        check_rows("dense layer", &self.weights, inputs.len())?;
        Ok(self
            .weights
            .iter()
            .map(|row| row.iter().zip(inputs).map(|(w, x)| w * x).sum())
            .collect())
    }
}

impl IntervalEvaluate for DenseLayer {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        check_rows("dense layer", &self.weights, inputs.len())?;
        Ok(self
            .weights
            .par_iter()
            .map(|row| affine_interval(row, inputs))
            .collect())
    }
}

/// Sign-aware bound of `Σ w_i · x_i` over `x_i ∈ inputs[i]`.
///
/// The upper bound takes `hi` for `w >= 0` and `lo` otherwise; the lower
/// bound takes the opposite endpoint. A zero weight contributes nothing
/// either way.
pub(crate) fn affine_interval(row: &[f64], inputs: &[Interval]) -> Interval {
    let mut lo = 0.0;
    let mut hi = 0.0;
    for (w, x) in row.iter().zip(inputs) {
        if *w >= 0.0 {
            lo += w * x.lo;
            hi += w * x.hi;
        } else {
            lo += w * x.hi;
            hi += w * x.lo;
        }
    }
    Interval { lo, hi }
}

impl Lower for DenseLayer {
    fn lower(
        &self,
        inputs: &[SignalId],
        module: &mut Module,
        env: &mut LowerEnv,
    ) -> Result<Vec<SignalId>> {
        check_rows("dense layer", &self.weights, inputs.len())?;
        module.ensure_owned(inputs.iter().copied())?;
        if inputs.is_empty() && !self.weights.is_empty() {
            return Err(Error::EmptyAdderInput);
        }

        let mut outputs = Vec::with_capacity(self.weights.len());
        for row in &self.weights {
            let mut terms = Vec::with_capacity(row.len());
            for (input, w) in inputs.iter().zip(row) {
                let term = module.add_signal(env.width(), Some("mult_out"), None);
                env.add_ip(
                    module,
                    &FP_MULTIPLIER,
                    vec![("argumenta", (*input).into()), ("out", term.into())],
                    vec![(
                        "multiplicand".to_string(),
                        ParamValue::Bits(env.format.literal(*w)),
                    )],
                )?;
                terms.push(term);
            }
            let neuron = module.add_signal(env.width(), Some("neuron"), None);
            build_adder(env.adder, module, env, &terms, neuron)?;
            outputs.push(neuron);
        }
        Ok(outputs)
    }
}
