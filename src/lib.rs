//! Lower feed-forward neural networks into floating-point HDL netlists.
//!
//! ```text
//! interchange JSON → Model ─┬─ generate() → Module → render() → .sv text
//!                           └─ evaluate() / evaluate_interval()  (pure numeric)
//! ```
//!
//! The netlist instantiates externally supplied floating-point primitives
//! (`fp_adder`, `fp_multiplier`, `fp_multiplybypowerof2`, `fp_sum`,
//! `fp_activation_relu`). Log-quantized layers replace multiplication by
//! power-of-two shifts; incremental log layers can be evaluated with only a
//! prefix of each weight's shifts while still bounding the result.

pub mod adder;
pub mod diagnostic;
pub mod error;
pub mod float;
pub mod generate;
pub mod hdl;
pub mod interchange;
pub mod interval;
pub mod layer;
pub mod lower;
pub mod model;
pub mod project;
pub mod quantize;

pub use error::{Error, ErrorKind, Result};
pub use float::FloatFormat;
pub use generate::{generate, GenerateFailure, GenerateOptions, Netlist};
pub use interval::Interval;
pub use layer::Layer;
pub use model::{Model, QuantizeMode};
