//! Neural-network layers.
//!
//! `Layer` is a closed set of variants. Each variant implements the
//! capabilities it supports:
//!
//! - `Evaluate`: plain numeric forward pass.
//! - `IntervalEvaluate`: bound propagation. Layers that are monotone in one
//!   shared direction mark themselves `Monotonic` and delegate to
//!   `monotonic_interval`; affine layers compute sign-aware bounds.
//! - `Lower`: emit primitives into a `Module`.
//!
//! The enum dispatches by `match`; there is no dynamic method lookup.

mod activation;
mod dense;
mod incremental;
mod log;


pub use activation::{BiasStep, ReluStep};
pub use dense::DenseLayer;
pub use incremental::IncrementalLogLayer;
pub use log::DenseLogLayer;

use crate::error::{Error, Result};
use crate::hdl::{Module, SignalId};
use crate::interval::Interval;
use crate::lower::LowerEnv;

pub trait Evaluate {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>>;
}

pub trait IntervalEvaluate {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>>;
}

pub trait Lower {
    /// Emit this layer into `module`, returning one signal per output.
    ///
    /// Every input must belong to `module`; on any error the module is left
    /// as it was.
    fn lower(&self, inputs: &[SignalId], module: &mut Module, env: &mut LowerEnv)
        -> Result<Vec<SignalId>>;
}

/// The layer function is non-decreasing in every input simultaneously.
pub trait Monotonic: Evaluate {}

/// Bounds for a `Monotonic` layer: evaluate at the all-low and all-high
/// corners and order each pair.
pub fn monotonic_interval<L: Monotonic>(layer: &L, inputs: &[Interval]) -> Result<Vec<Interval>> {
    let lo: Vec<f64> = inputs.iter().map(|i| i.lo).collect();
    let hi: Vec<f64> = inputs.iter().map(|i| i.hi).collect();
    let lo = layer.evaluate(&lo)?;
    let hi = layer.evaluate(&hi)?;
    Ok(lo
        .into_iter()
        .zip(hi)
        .map(|(a, b)| Interval::sorted(a, b))
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Relu,
    Bias,
    Dense,
    DenseLog,
    IncrementalLog,
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Relu => "relu",
            LayerKind::Bias => "bias",
            LayerKind::Dense => "dense",
            LayerKind::DenseLog => "dense-log",
            LayerKind::IncrementalLog => "dense-log-incremental",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    Relu(ReluStep),
    Bias(BiasStep),
    Dense(DenseLayer),
    DenseLog(DenseLogLayer),
    IncrementalLog(IncrementalLogLayer),
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Relu(_) => LayerKind::Relu,
            Layer::Bias(_) => LayerKind::Bias,
            Layer::Dense(_) => LayerKind::Dense,
            Layer::DenseLog(_) => LayerKind::DenseLog,
            Layer::IncrementalLog(_) => LayerKind::IncrementalLog,
        }
    }

    /// Required input count, `None` for elementwise layers of any width.
    pub fn input_width(&self) -> Option<usize> {
        match self {
            Layer::Relu(_) => None,
            Layer::Bias(l) => Some(l.len()),
            Layer::Dense(l) => Some(l.input_width()),
            Layer::DenseLog(l) => Some(l.input_width()),
            Layer::IncrementalLog(l) => Some(l.input_width()),
        }
    }

    /// Output count given `input` inputs.
    pub fn output_width(&self, input: usize) -> usize {
        match self {
            Layer::Relu(_) | Layer::Bias(_) => input,
            Layer::Dense(l) => l.output_width(),
            Layer::DenseLog(l) => l.output_width(),
            Layer::IncrementalLog(l) => l.output_width(),
        }
    }

    pub fn as_incremental_mut(&mut self) -> Option<&mut IncrementalLogLayer> {
        match self {
            Layer::IncrementalLog(l) => Some(l),
            _ => None,
        }
    }
}

impl Evaluate for Layer {
    fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        match self {
            Layer::Relu(l) => l.evaluate(inputs),
            Layer::Bias(l) => l.evaluate(inputs),
            Layer::Dense(l) => l.evaluate(inputs),
            Layer::DenseLog(l) => l.evaluate(inputs),
            Layer::IncrementalLog(l) => l.evaluate(inputs),
        }
    }
}

impl IntervalEvaluate for Layer {
    fn evaluate_interval(&self, inputs: &[Interval]) -> Result<Vec<Interval>> {
        match self {
            Layer::Relu(l) => l.evaluate_interval(inputs),
            Layer::Bias(l) => l.evaluate_interval(inputs),
            Layer::Dense(l) => l.evaluate_interval(inputs),
            Layer::DenseLog(l) => l.evaluate_interval(inputs),
            Layer::IncrementalLog(l) => l.evaluate_interval(inputs),
        }
    }
}

impl Lower for Layer {
    fn lower(
        &self,
        inputs: &[SignalId],
        module: &mut Module,
        env: &mut LowerEnv,
    ) -> Result<Vec<SignalId>> {
        ::log::debug!(
            "lowering {} layer with {} inputs",
            self.kind().name(),
            inputs.len()
        );
        match self {
            Layer::Relu(l) => l.lower(inputs, module, env),
            Layer::Bias(l) => l.lower(inputs, module, env),
            Layer::Dense(l) => l.lower(inputs, module, env),
            Layer::DenseLog(l) => l.lower(inputs, module, env),
            Layer::IncrementalLog(l) => l.lower(inputs, module, env),
        }
    }
}

impl From<ReluStep> for Layer {
    fn from(l: ReluStep) -> Self {
        Layer::Relu(l)
    }
}

impl From<BiasStep> for Layer {
    fn from(l: BiasStep) -> Self {
        Layer::Bias(l)
    }
}

impl From<DenseLayer> for Layer {
    fn from(l: DenseLayer) -> Self {
        Layer::Dense(l)
    }
}

impl From<DenseLogLayer> for Layer {
    fn from(l: DenseLogLayer) -> Self {
        Layer::DenseLog(l)
    }
}

impl From<IncrementalLogLayer> for Layer {
    fn from(l: IncrementalLogLayer) -> Self {
        Layer::IncrementalLog(l)
    }
}

// ─── Shared checks ─────────────────────────────────────────────────

/// Every row of `[output][input]` data must match `actual` inputs.
pub(crate) fn check_rows<T>(context: &str, rows: &[Vec<T>], actual: usize) -> Result<()> {
    for (j, row) in rows.iter().enumerate() {
        if row.len() != actual {
            return Err(Error::mismatch(
                format!("{} (neuron {})", context, j),
                row.len(),
                actual,
            ));
        }
    }
    Ok(())
}

/// All rows of a matrix must have the same length.
pub(crate) fn check_rectangular<T>(context: &str, rows: &[Vec<T>]) -> Result<usize> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    check_rows(context, rows, width)?;
    Ok(width)
}

pub(crate) fn check_len(context: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::mismatch(context, expected, actual))
    }
}
