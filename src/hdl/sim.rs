//! Reference simulation of a rendered-ready `Module`.
//!
//! Drivers are evaluated in topological order using the arithmetic each
//! primitive is documented to perform. Values are carried as `f64`; only
//! literals pass through the netlist's float format.

use super::check::Driver;
use super::primitive::lookup;
use super::{Expression, Module, ParamValue, PrimitiveInstance, SignalId};
use crate::error::{Error, Result};
use crate::float::{exp2i, FloatFormat};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Value::Array(v) => Some(v),
            Value::Scalar(_) => None,
        }
    }
}

/// Signal values after one simulation run.
#[derive(Clone, Debug, Default)]
pub struct SimState {
    values: Vec<Option<Value>>,
}

impl SimState {
    pub fn get(&self, id: SignalId) -> Option<&Value> {
        self.values.get(id.index()).and_then(|v| v.as_ref())
    }

    pub fn scalar(&self, id: SignalId) -> Option<f64> {
        self.get(id).and_then(Value::as_scalar)
    }
}

pub struct NetlistSim<'m> {
    module: &'m Module,
    format: FloatFormat,
}

impl<'m> NetlistSim<'m> {
    pub fn new(module: &'m Module, format: FloatFormat) -> Self {
        NetlistSim { module, format }
    }

    /// Drive the given input ports and evaluate every driver once.
    pub fn run(&self, inputs: &[(SignalId, Value)]) -> Result<SimState> {
        let module = self.module;
        let mut state = SimState {
            values: vec![None; module.signal_count()],
        };
        for (id, value) in inputs {
            module.ensure_owned([*id])?;
            if !module.inputs().contains(id) {
                return Err(Error::Simulation(format!(
                    "'{}' is not an input port",
                    self.name(*id)
                )));
            }
            state.values[id.index()] = Some(value.clone());
        }
        for id in module.inputs() {
            if state.values[id.index()].is_none() {
                return Err(Error::Simulation(format!(
                    "input '{}' was not given a value",
                    self.name(*id)
                )));
            }
        }

        let order = module.evaluation_order().ok_or_else(|| {
            Error::Simulation(format!("module '{}' contains a loop", module.name()))
        })?;
        for driver in order {
            let (target, value) = match driver {
                Driver::Instance(i) => {
                    let inst = &module.instances()[i];
                    let target = inst.output().ok_or_else(|| {
                        Error::Simulation(format!("instance '{}' has no output", inst.name))
                    })?;
                    (target, Value::Scalar(self.primitive(inst, &state)?))
                }
                Driver::Assignment(i) => {
                    let assign = &module.assignments()[i];
                    (assign.target, self.expression(&assign.source, &state)?)
                }
            };
            state.values[target.index()] = Some(value);
        }
        Ok(state)
    }

    fn primitive(&self, inst: &PrimitiveInstance, state: &SimState) -> Result<f64> {
        let scalar_port = |port: &str| -> Result<f64> {
            let expr = inst.port(port).ok_or_else(|| {
                Error::Simulation(format!("'{}' has no port '{}'", inst.name, port))
            })?;
            self.expression(expr, state)?.as_scalar().ok_or_else(|| {
                Error::Simulation(format!("port '{}' of '{}' expects a scalar", port, inst.name))
            })
        };
        let int_param = |name: &str| -> Result<i64> {
            match inst.param(name) {
                Some(ParamValue::Int(v)) => Ok(v),
                _ => Err(Error::Simulation(format!(
                    "'{}' is missing integer parameter '{}'",
                    inst.name, name
                ))),
            }
        };

        // Only catalogued contracts have a simulation model; a look-alike
        // with the same name but other ports is rejected.
        let known = lookup(inst.primitive.name)
            .filter(|p| *p == inst.primitive)
            .ok_or_else(|| {
                Error::Simulation(format!(
                    "no simulation model for primitive '{}'",
                    inst.primitive.name
                ))
            })?;
        let result = match known.name {
            "fp_adder" => scalar_port("argumenta")? + scalar_port("argumentb")?,
            "fp_multiplybypowerof2" => {
                let power = i32::try_from(int_param("power")?).map_err(|_| {
                    Error::Simulation(format!("power of '{}' out of range", inst.name))
                })?;
                let shifted = scalar_port("argumenta")? * exp2i(power);
                if int_param("negate")? != 0 {
                    -shifted
                } else {
                    shifted
                }
            }
            "fp_multiplier" => {
                let multiplicand = match inst.param("multiplicand") {
                    Some(ParamValue::Bits(lit)) => self.format.decode(lit.value),
                    _ => {
                        return Err(Error::Simulation(format!(
                            "'{}' is missing its multiplicand",
                            inst.name
                        )))
                    }
                };
                scalar_port("argumenta")? * multiplicand
            }
            "fp_sum" => {
                let expr = inst.port("argument_array").ok_or_else(|| {
                    Error::Simulation(format!("'{}' has no argument array", inst.name))
                })?;
                let values = self.expression(expr, state)?;
                let values = values.as_array().ok_or_else(|| {
                    Error::Simulation(format!("'{}' expects an array argument", inst.name))
                })?;
                let count = int_param("inputcount")?;
                if count != values.len() as i64 {
                    return Err(Error::Simulation(format!(
                        "'{}' declares {} inputs but receives {}",
                        inst.name,
                        count,
                        values.len()
                    )));
                }
                values.iter().sum()
            }
            "fp_activation_relu" => scalar_port("argumenta")?.max(0.0),
            other => {
                return Err(Error::Simulation(format!(
                    "no simulation model for primitive '{}'",
                    other
                )))
            }
        };
        Ok(result)
    }

    fn expression(&self, expr: &Expression, state: &SimState) -> Result<Value> {
        match expr {
            Expression::Signal(id) => state.get(*id).cloned().ok_or_else(|| {
                Error::Simulation(format!("'{}' read before it was driven", self.name(*id)))
            }),
            Expression::Literal(lit) => Ok(Value::Scalar(self.format.decode(lit.value))),
            Expression::Concat(parts) => {
                let mut values = Vec::with_capacity(parts.len());
                for part in parts {
                    match self.expression(part, state)? {
                        Value::Scalar(v) => values.push(v),
                        Value::Array(_) => {
                            return Err(Error::Simulation(
                                "nested arrays in a concatenation".to_string(),
                            ))
                        }
                    }
                }
                Ok(Value::Array(values))
            }
            Expression::Index(inner, index) => match self.expression(inner, state)? {
                Value::Array(values) => {
                    values.get(*index).copied().map(Value::Scalar).ok_or_else(|| {
                        Error::Simulation(format!(
                            "index {} out of bounds ({})",
                            index,
                            values.len()
                        ))
                    })
                }
                Value::Scalar(_) => Err(Error::Simulation("indexing a scalar".to_string())),
            },
        }
    }

    fn name(&self, id: SignalId) -> String {
        self.module
            .signal(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("#{}", id.index()))
    }
}
