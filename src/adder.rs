//! Adder-network builders.
//!
//! Each builder reduces a non-empty list of equal-width signals onto one
//! output signal. They differ only in structure:
//!
//! ```text
//! Tree   ((a+b)+(c+d))   N-1 fp_adder, log depth
//! Chain  (((a+b)+c)+d)   N-1 fp_adder, linear depth
//! Wide   fp_sum('{a,b,c,d})  one instance
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hdl::primitive::{FP_ADDER, FP_SUM};
use crate::hdl::{Expression, Module, ParamValue, SignalId};
use crate::lower::LowerEnv;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AdderTopology {
    #[default]
    Tree,
    Chain,
    Wide,
}

impl AdderTopology {
    pub fn name(&self) -> &'static str {
        match self {
            AdderTopology::Tree => "tree",
            AdderTopology::Chain => "chain",
            AdderTopology::Wide => "wide",
        }
    }
}

/// Reduce `inputs` onto `out` using `topology`.
///
/// Inputs and output must all belong to `module` and share one width.
/// Validation happens before anything is added to the module.
pub fn build_adder(
    topology: AdderTopology,
    module: &mut Module,
    env: &LowerEnv,
    inputs: &[SignalId],
    out: SignalId,
) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::EmptyAdderInput);
    }
    module.ensure_owned(inputs.iter().copied().chain([out]))?;
    let width = signal_width(module, out)?;
    for (i, id) in inputs.iter().enumerate() {
        let w = signal_width(module, *id)?;
        if w != width {
            return Err(Error::mismatch(
                format!("width of adder input {}", i),
                width as usize,
                w as usize,
            ));
        }
    }

    log::debug!(
        "building {} adder over {} inputs",
        topology.name(),
        inputs.len()
    );
    match topology {
        AdderTopology::Tree => tree(module, env, inputs, out, width),
        AdderTopology::Chain => chain(module, env, inputs, out, width),
        AdderTopology::Wide => wide(module, env, inputs, out, width),
    }
}

fn signal_width(module: &Module, id: SignalId) -> Result<u32> {
    module.ensure_owned([id])?;
    Ok(module.signal(id).map(|s| s.width).unwrap_or(0))
}

fn add2(
    module: &mut Module,
    env: &LowerEnv,
    a: SignalId,
    b: SignalId,
    out: SignalId,
) -> Result<()> {
    env.add_ip(
        module,
        &FP_ADDER,
        vec![
            ("argumenta", a.into()),
            ("argumentb", b.into()),
            ("out", out.into()),
        ],
        Vec::new(),
    )?;
    Ok(())
}

fn tree(
    module: &mut Module,
    env: &LowerEnv,
    inputs: &[SignalId],
    out: SignalId,
    width: u32,
) -> Result<()> {
    if let [only] = inputs {
        return module.add_assignment(out, (*only).into());
    }
    let (left_half, right_half) = inputs.split_at(inputs.len() / 2);
    let left = module.add_signal(width, Some("branch_left"), None);
    let right = module.add_signal(width, Some("branch_right"), None);
    tree(module, env, left_half, left, width)?;
    tree(module, env, right_half, right, width)?;
    add2(module, env, left, right, out)
}

fn chain(
    module: &mut Module,
    env: &LowerEnv,
    inputs: &[SignalId],
    out: SignalId,
    width: u32,
) -> Result<()> {
    let Some((first, rest)) = inputs.split_first() else {
        return Err(Error::EmptyAdderInput);
    };
    if rest.is_empty() {
        return module.add_assignment(out, (*first).into());
    }
    let mut running = *first;
    for (i, next) in rest.iter().enumerate() {
        let stage = if i + 1 == rest.len() {
            out
        } else {
            module.add_signal(width, Some("add_stage"), None)
        };
        add2(module, env, running, *next, stage)?;
        running = stage;
    }
    Ok(())
}

fn wide(
    module: &mut Module,
    env: &LowerEnv,
    inputs: &[SignalId],
    out: SignalId,
    width: u32,
) -> Result<()> {
    let bus = module.add_signal(width, Some("summer_arguments"), Some(inputs.len()));
    module.add_assignment(bus, Expression::concat(inputs))?;
    env.add_ip(
        module,
        &FP_SUM,
        vec![("argument_array", bus.into()), ("out", out.into())],
        vec![(
            "inputcount".to_string(),
            ParamValue::Int(inputs.len() as i64),
        )],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::float::FloatFormat;
    use crate::hdl::{NetlistSim, Value};

    const TOPOLOGIES: [AdderTopology; 3] =
        [AdderTopology::Tree, AdderTopology::Chain, AdderTopology::Wide];

    fn build(topology: AdderTopology, n: usize) -> (Module, Vec<SignalId>, SignalId) {
        let env = LowerEnv::new(FloatFormat::BINARY16);
        let mut m = Module::new("sum").unwrap();
        let inputs: Vec<SignalId> = (0..n)
            .map(|i| m.add_input(&format!("x{}", i), 16, None).unwrap())
            .collect();
        let out = m.add_output("y", 16, None).unwrap();
        build_adder(topology, &mut m, &env, &inputs, out).unwrap();
        (m, inputs, out)
    }

    #[test]
    fn test_instance_counts() {
        for n in 1..=8 {
            let (tree, ..) = build(AdderTopology::Tree, n);
            let (chain, ..) = build(AdderTopology::Chain, n);
            let (wide, ..) = build(AdderTopology::Wide, n);
            assert_eq!(tree.count_instances("fp_adder"), n - 1);
            assert_eq!(chain.count_instances("fp_adder"), n - 1);
            assert_eq!(wide.count_instances("fp_sum"), 1);
            assert_eq!(wide.count_instances("fp_adder"), 0);
        }
    }

    #[test]
    fn test_topologies_are_equivalent() {
        for n in 1..=9 {
            let values: Vec<f64> = (0..n).map(|i| (i as f64 - 3.0) * 0.75).collect();
            let expected: f64 = values.iter().sum();
            for topology in TOPOLOGIES {
                let (m, inputs, out) = build(topology, n);
                assert!(m.check().is_ok(), "{:?} with {} inputs", topology, n);
                let drive: Vec<(SignalId, Value)> = inputs
                    .iter()
                    .zip(&values)
                    .map(|(id, v)| (*id, Value::Scalar(*v)))
                    .collect();
                let state = NetlistSim::new(&m, FloatFormat::BINARY16)
                    .run(&drive)
                    .unwrap();
                assert_eq!(state.scalar(out), Some(expected), "{:?} n={}", topology, n);
            }
        }
    }

    #[test]
    fn test_single_input_tree_is_an_assignment() {
        let (m, inputs, out) = build(AdderTopology::Tree, 1);
        assert!(m.instances().is_empty());
        assert_eq!(m.assignments().len(), 1);
        assert_eq!(m.assignments()[0].target, out);
        assert_eq!(m.assignments()[0].source, Expression::Signal(inputs[0]));
    }

    #[test]
    fn test_wide_renders_inputcount() {
        let (m, ..) = build(AdderTopology::Wide, 3);
        let text = m.render();
        assert!(text.contains("wire [15:0] w_0_summer_arguments [3];"));
        assert!(text.contains("assign w_0_summer_arguments = '{x0, x1, x2};"));
        assert!(text.contains(".inputcount(3)"));
    }

    #[test]
    fn test_empty_input_rejected() {
        let env = LowerEnv::new(FloatFormat::BINARY16);
        for topology in TOPOLOGIES {
            let mut m = Module::new("empty").unwrap();
            let out = m.add_output("y", 16, None).unwrap();
            let err = build_adder(topology, &mut m, &env, &[], out).unwrap_err();
            assert!(matches!(err, Error::EmptyAdderInput));
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn test_foreign_and_mismatched_inputs_leave_module_untouched() {
        let env = LowerEnv::new(FloatFormat::BINARY16);
        let mut other = Module::new("other").unwrap();
        let foreign = other.add_signal(16, None, None);

        let mut m = Module::new("target").unwrap();
        let a = m.add_input("a", 16, None).unwrap();
        let narrow = m.add_input("b", 8, None).unwrap();
        let out = m.add_output("y", 16, None).unwrap();

        let err = build_adder(AdderTopology::Tree, &mut m, &env, &[a, foreign], out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationInvariant);
        let err = build_adder(AdderTopology::Chain, &mut m, &env, &[a, narrow], out).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert!(m.instances().is_empty());
        assert!(m.assignments().is_empty());
        assert!(m.wires().is_empty());
    }
}
