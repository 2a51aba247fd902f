//! Model → netlist driver.
//!
//! ```text
//! input_array[i] → network_in_i → layer 0 → … → layer n → '{…} → output_array
//! ```
//!
//! Both ports are arrays of the netlist's float format. The driver lowers
//! every layer into one `Module`, runs the structural check and hands back
//! either a finished `Netlist` or the partial module for inspection.

use crate::adder::AdderTopology;
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::float::FloatFormat;
use crate::hdl::{Expression, Module, NetlistSim, SignalId, Value};
use crate::layer::Lower;
use crate::lower::LowerEnv;
use crate::model::Model;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOptions {
    pub module_name: String,
    pub format: FloatFormat,
    pub adder: AdderTopology,
    pub input_port: String,
    pub output_port: String,
}

impl GenerateOptions {
    pub fn new(module_name: &str) -> Self {
        GenerateOptions {
            module_name: module_name.to_string(),
            ..Default::default()
        }
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            module_name: "nn".to_string(),
            format: FloatFormat::default(),
            adder: AdderTopology::default(),
            input_port: "input_array".to_string(),
            output_port: "output_array".to_string(),
        }
    }
}

/// A generated, structurally checked netlist.
#[derive(Debug)]
pub struct Netlist {
    pub module: Module,
    pub format: FloatFormat,
    pub input_port: SignalId,
    pub output_port: SignalId,
    /// Non-fatal warnings raised while lowering.
    pub diagnostics: Vec<Diagnostic>,
}

impl Netlist {
    pub fn render(&self) -> String {
        self.module.render()
    }

    /// Drive the input array with `inputs` and read back the output array.
    pub fn simulate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let state = NetlistSim::new(&self.module, self.format)
            .run(&[(self.input_port, Value::Array(inputs.to_vec()))])?;
        state
            .get(self.output_port)
            .and_then(Value::as_array)
            .map(<[f64]>::to_vec)
            .ok_or_else(|| Error::Simulation("output array was not driven".to_string()))
    }
}

/// Generation failed. `module` holds whatever was built before the error.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct GenerateFailure {
    #[source]
    pub error: Error,
    pub module: Option<Module>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerateFailure {
    fn new(error: Error, module: Option<Module>, diagnostics: Vec<Diagnostic>) -> Box<Self> {
        Box::new(GenerateFailure {
            error,
            module,
            diagnostics,
        })
    }

    /// The partial module rendered under an `// INVALID` banner.
    pub fn render_partial(&self) -> Option<String> {
        self.module
            .as_ref()
            .map(|m| m.render_invalid(&self.error.to_string()))
    }
}

pub fn generate(
    model: &Model,
    options: &GenerateOptions,
) -> std::result::Result<Netlist, Box<GenerateFailure>> {
    model
        .validate()
        .map_err(|e| GenerateFailure::new(e, None, Vec::new()))?;
    let mut module =
        Module::new(&options.module_name).map_err(|e| GenerateFailure::new(e, None, Vec::new()))?;
    let mut env = LowerEnv::new(options.format).with_adder(options.adder);

    match lower_model(model, options, &mut module, &mut env) {
        Ok((input_port, output_port)) => {
            if let Err(mut errors) = module.check() {
                let error = Error::StructuralCheck(errors.len());
                let mut diagnostics = env.diagnostics;
                diagnostics.append(&mut errors);
                return Err(GenerateFailure::new(error, Some(module), diagnostics));
            }
            log::info!(
                "generated module '{}': {} instances, {} wires, {} warnings",
                module.name(),
                module.instances().len(),
                module.wires().len(),
                env.diagnostics.len()
            );
            Ok(Netlist {
                module,
                format: options.format,
                input_port,
                output_port,
                diagnostics: env.diagnostics,
            })
        }
        Err(error) => Err(GenerateFailure::new(error, Some(module), env.diagnostics)),
    }
}

fn lower_model(
    model: &Model,
    options: &GenerateOptions,
    module: &mut Module,
    env: &mut LowerEnv,
) -> Result<(SignalId, SignalId)> {
    let width = env.width();
    let input_port = module.add_input(&options.input_port, width, Some(model.input_count()))?;
    let output_port = module.add_output(&options.output_port, width, Some(model.output_count()))?;

    let mut signals = Vec::with_capacity(model.input_count());
    for i in 0..model.input_count() {
        let wire = module.add_signal(width, Some("network_in"), None);
        module.add_assignment(wire, Expression::index(input_port, i))?;
        signals.push(wire);
    }

    for layer in model.layers() {
        signals = layer.lower(&signals, module, env)?;
    }

    module.add_assignment(output_port, Expression::concat(&signals))?;
    Ok((input_port, output_port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::layer::{BiasStep, DenseLayer, IncrementalLogLayer, ReluStep};

    fn model() -> Model {
        Model::new(
            vec![
                DenseLayer::new(vec![vec![1.0, 1.0]]).unwrap().into(),
                BiasStep::new(vec![0.0]).into(),
                ReluStep.into(),
            ],
            2,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_generate_declares_packed_ports() {
        let netlist = generate(&model(), &GenerateOptions::new("nn")).unwrap();
        let text = netlist.render();
        assert!(text.starts_with("module nn(input_array, output_array);\n"));
        assert!(text.contains("    input [15:0] input_array [2];\n"));
        assert!(text.contains("    output [15:0] output_array [1];\n"));
        assert!(text.contains("assign w_0_network_in = input_array[0];"));
        assert!(text.contains("assign w_1_network_in = input_array[1];"));
        assert!(text.contains("assign output_array = '{"));
        assert!(netlist.diagnostics.is_empty());
    }

    #[test]
    fn test_generated_netlist_simulates_like_model() {
        let netlist = generate(&model(), &GenerateOptions::new("nn")).unwrap();
        assert_eq!(netlist.simulate(&[3.0, -5.0]).unwrap(), vec![0.0]);
        assert_eq!(netlist.simulate(&[3.0, 5.0]).unwrap(), vec![8.0]);
    }

    #[test]
    fn test_custom_ports_and_format() {
        let options = GenerateOptions {
            format: FloatFormat::BINARY32,
            input_port: "x".to_string(),
            output_port: "y".to_string(),
            ..GenerateOptions::new("wide_nn")
        };
        let text = generate(&model(), &options).unwrap().render();
        assert!(text.starts_with("module wide_nn(x, y);"));
        assert!(text.contains("input [31:0] x [2];"));
        assert!(text.contains(".floatsize(32), .exponentsize(8)"));
    }

    #[test]
    fn test_incremental_model_fails_with_partial_module() {
        let model = Model::new(
            vec![IncrementalLogLayer::new(vec![vec![vec![]]]).unwrap().into()],
            1,
            1,
        )
        .unwrap();
        let failure = generate(&model, &GenerateOptions::new("nn")).unwrap_err();
        assert_eq!(failure.error.kind(), ErrorKind::UnsupportedOperation);
        let partial = failure.render_partial().unwrap();
        assert!(partial.starts_with("// INVALID: `lower` is not supported"));
        assert!(partial.contains("module nn(input_array, output_array);"));
    }

    #[test]
    fn test_bad_module_name_has_no_partial_module() {
        let failure = generate(&model(), &GenerateOptions::new("1nn")).unwrap_err();
        assert!(failure.module.is_none());
        assert!(failure.render_partial().is_none());
    }

    #[test]
    fn test_port_name_clash_is_reported() {
        let options = GenerateOptions {
            output_port: "input_array".to_string(),
            ..GenerateOptions::new("nn")
        };
        let failure = generate(&model(), &options).unwrap_err();
        assert!(matches!(failure.error, Error::DuplicateIdentifier(_)));
    }
}
