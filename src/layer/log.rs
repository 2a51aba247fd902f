//! Dense layer with log-quantized weights.
//!
//! Multiplication by `w` becomes a sum of `±x·2^e` terms, one
//! `fp_multiplybypowerof2` per fragment, reduced per neuron by one wide
//! `fp_sum`.

use rayon::prelude::*;

use super::dense::affine_interval;
use super::{check_rectangular, check_rows, Evaluate, IntervalEvaluate, Lower};
use crate::adder::{build_adder, AdderTopology};
use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::hdl::primitive::FP_MULTIPLY_BY_POWER_OF_2;
use crate::hdl::{Module, ParamValue, SignalId};
use crate::interval::Interval;
use crate::lower::LowerEnv;
use crate::quantize::{reconstruct, FragmentMatrix};

#[derive(Clone, Debug, PartialEq)]
pub struct DenseLogLayer {
    fragments: FragmentMatrix,
}

impl DenseLogLayer {
    /// `fragments` is indexed `[output][input][term]`.
    pub fn new(fragments: FragmentMatrix) -> Result<Self> {
        check_rectangular("dense-log fragment matrix", &fragments)?;
        Ok(DenseLogLayer { fragments })
    }

    pub fn fragments(&self) -> &FragmentMatrix {
        &self.fragments
    }

    pub fn input_width(&self) -> usize {
        self.fragments.first().map(Vec::len).unwrap_or(0)
    }

    pub fn output_width(&self) -> usize {
        self.fragments.len()
    }
}

/// Weights obtained by summing the first `steps` fragments of every entry.
pub(crate) fn prefix_weights(fragments: &FragmentMatrix, steps: Option<usize>) -> Vec<Vec<f64>> {
    fragments
        .iter()
        .map(|row| row.iter().map(|f| reconstruct(f, steps)).collect())
        .collect()
}

pub(crate) fn weighted_sum(weights: &[Vec<f64>], inputs: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .map(|row| row.iter().zip(inputs).map(|(w, x)| w * x).sum())
        .collect()
}

impl Evaluate for DenseLogLayer {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        check_rows("dense-log layer", &self.fragments, inputs.len())?;
        Ok(weighted_sum(&prefix_weights(&self.fragments, None), inputs))
    }
}

impl IntervalEvaluate for DenseLogLayer {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        check_rows("dense-log layer", &self.fragments, inputs.len())?;
        Ok(prefix_weights(&self.fragments, None)
            .par_iter()
            .map(|row| affine_interval(row, inputs))
            .collect())
    }
}

impl Lower for DenseLogLayer {
    fn lower(
        &self,
        inputs: &[SignalId],
        module: &mut Module,
        env: &mut LowerEnv,
    ) -> Result<Vec<SignalId>> {
        check_rows("dense-log layer", &self.fragments, inputs.len())?;
        module.ensure_owned(inputs.iter().copied())?;

        let mut outputs = Vec::with_capacity(self.fragments.len());
        for (j, row) in self.fragments.iter().enumerate() {
            let neuron = module.add_signal(env.width(), Some("neuron_multiplied"), None);
            let mut products = Vec::new();
            for (input, fragments) in inputs.iter().zip(row) {
                for fragment in fragments {
                    let product = module.add_signal(env.width(), Some("shifted"), None);
                    env.add_ip(
                        module,
                        &FP_MULTIPLY_BY_POWER_OF_2,
                        vec![("argumenta", (*input).into()), ("out", product.into())],
                        vec![
                            ("power".to_string(), ParamValue::Int(fragment.exponent as i64)),
                            ("negate".to_string(), ParamValue::Int(fragment.negative as i64)),
                        ],
                    )?;
                    products.push(product);
                }
            }

            if products.is_empty() {
                module.add_assignment(neuron, env.format.literal(0.0).into())?;
                env.warn(
                    Diagnostic::warning(format!("neuron {} has no weight fragments", j))
                        .with_note(
                            "every weight was quantized to zero within precision".to_string(),
                        )
                        .with_help("the neuron output is tied to constant zero".to_string()),
                );
            } else {
                build_adder(AdderTopology::Wide, module, env, &products, neuron)?;
            }
            outputs.push(neuron);
        }
        Ok(outputs)
    }
}
