//! Elementwise layers: ReLU and bias.

use super::{check_len, monotonic_interval, Evaluate, IntervalEvaluate, Lower, Monotonic};
use crate::error::Result;
use crate::hdl::primitive::{FP_ACTIVATION_RELU, FP_ADDER};
use crate::hdl::{Module, SignalId};
use crate::interval::Interval;
use crate::lower::LowerEnv;

/// `y = max(x, 0)` per element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReluStep;

impl Evaluate for ReluStep {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        Ok(inputs.iter().map(|x| x.max(0.0)).collect())
    }
}

impl Monotonic for ReluStep {}

impl IntervalEvaluate for ReluStep {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        monotonic_interval(self, inputs)
    }
}

impl Lower for ReluStep {
    fn lower(
        &self,
        inputs: &[SignalId],
        module: &mut Module,
        env: &mut LowerEnv,
    ) -> Result<Vec<SignalId>> {
        module.ensure_owned(inputs.iter().copied())?;
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            let out = module.add_signal(env.width(), Some("relu"), None);
            env.add_ip(
                module,
                &FP_ACTIVATION_RELU,
                vec![("argumenta", (*input).into()), ("out", out.into())],
                Vec::new(),
            )?;
            outputs.push(out);
        }
        Ok(outputs)
    }
}

/// `y = x + b` per element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BiasStep {
    biases: Vec<f64>,
}

impl BiasStep {
    pub fn new(biases: Vec<f64>) -> Self {
        BiasStep { biases }
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn len(&self) -> usize {
        self.biases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biases.is_empty()
    }
}

impl Evaluate for BiasStep {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        check_len("bias layer", self.biases.len(), inputs.len())?;
        Ok(inputs.iter().zip(&self.biases).map(|(x, b)| x + b).collect())
    }
}

impl Monotonic for BiasStep {}

impl IntervalEvaluate for BiasStep {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        monotonic_interval(self, inputs)
    }
}

impl Lower for BiasStep {
    fn lower(
        &self,
        inputs: &[SignalId],
        module: &mut Module,
        env: &mut LowerEnv,
    ) -> Result<Vec<SignalId>> {
        check_len("bias layer", self.biases.len(), inputs.len())?;
        module.ensure_owned(inputs.iter().copied())?;
        let mut outputs = Vec::with_capacity(inputs.len());
        for (input, bias) in inputs.iter().zip(&self.biases) {
            let out = module.add_signal(env.width(), Some("bias"), None);
            env.add_ip(
                module,
                &FP_ADDER,
                vec![
                    ("argumenta", (*input).into()),
                    ("argumentb", env.format.literal(*bias).into()),
                    ("out", out.into()),
                ],
                Vec::new(),
            )?;
            outputs.push(out);
        }
        Ok(outputs)
    }
}
