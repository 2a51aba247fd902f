//! Whole-network container.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::layer::{
    DenseLogLayer, Evaluate, IncrementalLogLayer, IntervalEvaluate, Layer, LayerKind,
};
use crate::quantize::{check_precision, quantize_matrix};

/// How `Model::log_quantize` converts dense layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum QuantizeMode {
    /// Every dense layer becomes a dense-log layer.
    #[default]
    All,
    /// Only the first dense layer becomes an incremental log layer; later
    /// dense layers are left as they are.
    FirstIncremental,
}

/// An ordered list of layers with declared input and output counts.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    layers: Vec<Layer>,
    input_count: usize,
    output_count: usize,
}

impl Model {
    /// Build a model, checking that layer widths chain from `input_count`
    /// to `output_count`.
    pub fn new(layers: Vec<Layer>, input_count: usize, output_count: usize) -> Result<Self> {
        let model = Model {
            layers,
            input_count,
            output_count,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn validate(&self) -> Result<()> {
        let mut width = self.input_count;
        for (i, layer) in self.layers.iter().enumerate() {
            if let Some(expected) = layer.input_width() {
                if expected != width {
                    return Err(Error::mismatch(
                        format!("input of layer #{} ({})", i, layer.kind().name()),
                        expected,
                        width,
                    ));
                }
            }
            width = layer.output_width(width);
        }
        if width != self.output_count {
            return Err(Error::mismatch("model output count", self.output_count, width));
        }
        Ok(())
    }

    pub fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        Ok(self.evaluate_trace(inputs)?.pop().unwrap_or_else(|| inputs.to_vec()))
    }

    /// Output of every layer in order.
    pub fn evaluate_trace(&self, inputs: &[f64]) -> Result<Vec<Vec<f64>>> {
        if inputs.len() != self.input_count {
            return Err(Error::mismatch("model inputs", self.input_count, inputs.len()));
        }
        let mut trace = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_vec();
        for layer in &self.layers {
            current = layer.evaluate(&current)?;
            trace.push(current.clone());
        }
        Ok(trace)
    }

    pub fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        Ok(self
            .evaluate_interval_trace(inputs)?
            .pop()
            .unwrap_or_else(|| inputs.to_vec()))
    }

    pub fn evaluate_interval_trace(&self, inputs: &[Interval]) -> Result<Vec<Vec<Interval>>> {
        if inputs.len() != self.input_count {
            return Err(Error::mismatch("model inputs", self.input_count, inputs.len()));
        }
        let mut trace = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_vec();
        for layer in &self.layers {
            current = layer.evaluate_interval(&current)?;
            trace.push(current.clone());
        }
        Ok(trace)
    }

    pub fn has_incremental_layers(&self) -> bool {
        self.layers
            .iter()
            .any(|l| l.kind() == LayerKind::IncrementalLog)
    }

    /// Set the fragment prefix of every incremental layer. Returns `true`
    /// when all of them are fully refined (or there are none).
    pub fn set_incremental_steps(&mut self, k: usize) -> bool {
        let mut saturated = true;
        for layer in self.layers.iter_mut().filter_map(Layer::as_incremental_mut) {
            saturated &= layer.set_steps(k);
        }
        saturated
    }

    /// Copy of this model with dense layers log-quantized at `precision`.
    pub fn log_quantize(&self, precision: f64, mode: QuantizeMode) -> Result<Model> {
        check_precision(precision)?;
        let mut converted_first = false;
        let mut layers = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let Layer::Dense(dense) = layer else {
                layers.push(layer.clone());
                continue;
            };
            let first = !converted_first;
            converted_first = true;
            let layer = match mode {
                QuantizeMode::All => {
                    let fragments = quantize_matrix(dense.weights(), precision)?;
                    Layer::DenseLog(DenseLogLayer::new(fragments)?)
                }
                QuantizeMode::FirstIncremental if first => {
                    let fragments = quantize_matrix(dense.weights(), precision)?;
                    Layer::IncrementalLog(IncrementalLogLayer::new(fragments)?)
                }
                QuantizeMode::FirstIncremental => layer.clone(),
            };
            log::debug!("quantized dense layer into {}", layer.kind().name());
            layers.push(layer);
        }
        Model::new(layers, self.input_count, self.output_count)
    }
}
