//! Minimal hardware-description IR.
//!
//! A `Module` is an arena: it owns every `Signal`, `PrimitiveInstance` and
//! `Assignment` created on it and hands out opaque `SignalId` handles. A
//! handle remembers which module minted it, so connecting a signal from a
//! different module is rejected when the connection is made rather than
//! when the netlist is rendered.
//!
//! ```text
//! Module::add_signal / add_input / add_output   → SignalId
//! Module::add_instance(primitive, ports, params) → InstanceId
//! Module::add_assignment(target, expression)
//! Module::render() → text,  Module::check() → diagnostics
//! ```

pub mod check;
pub mod primitive;
pub mod render;
pub mod sim;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

pub use primitive::{PortDirection, Primitive};
pub use sim::{NetlistSim, SimState, Value};

static NEXT_MODULE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a `Module` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    fn fresh() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Handle to a signal inside the module that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignalId {
    module: ModuleId,
    index: u32,
}

impl SignalId {
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Handle to a primitive instance inside the module that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId {
    module: ModuleId,
    index: u32,
}

impl InstanceId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalRole {
    Internal,
    Input,
    Output,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    pub name: String,
    pub width: u32,
    pub role: SignalRole,
    pub array_len: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralFormat {
    Hex,
    Decimal,
}

/// An unsized literal, rendered as `'h…` or `'d…`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Literal {
    pub value: u64,
    pub format: LiteralFormat,
    /// Minimum number of hex digits (zero padded).
    pub digits: usize,
}

impl Literal {
    pub fn hex(value: u64) -> Self {
        Literal {
            value,
            format: LiteralFormat::Hex,
            digits: 1,
        }
    }

    pub fn padded_hex(value: u64, digits: usize) -> Self {
        Literal {
            value,
            format: LiteralFormat::Hex,
            digits: digits.max(1),
        }
    }

    pub fn decimal(value: u64) -> Self {
        Literal {
            value,
            format: LiteralFormat::Decimal,
            digits: 1,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            LiteralFormat::Hex => write!(f, "'h{:0width$x}", self.value, width = self.digits),
            LiteralFormat::Decimal => write!(f, "'d{}", self.value),
        }
    }
}

/// Right-hand-side value. Concatenations and indexing are never targets.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Signal(SignalId),
    Literal(Literal),
    Concat(Vec<Expression>),
    Index(Box<Expression>, usize),
}

impl Expression {
    pub fn concat(signals: &[SignalId]) -> Self {
        Expression::Concat(signals.iter().map(|s| Expression::Signal(*s)).collect())
    }

    pub fn index(of: SignalId, index: usize) -> Self {
        Expression::Index(Box::new(Expression::Signal(of)), index)
    }

    /// Visit every signal referenced anywhere in this expression.
    pub fn for_each_signal(&self, f: &mut impl FnMut(SignalId)) {
        match self {
            Expression::Signal(id) => f(*id),
            Expression::Literal(_) => {}
            Expression::Concat(parts) => {
                for part in parts {
                    part.for_each_signal(f);
                }
            }
            Expression::Index(inner, _) => inner.for_each_signal(f),
        }
    }

    pub fn signals(&self) -> Vec<SignalId> {
        let mut out = Vec::new();
        self.for_each_signal(&mut |id| out.push(id));
        out
    }
}

impl From<SignalId> for Expression {
    fn from(id: SignalId) -> Self {
        Expression::Signal(id)
    }
}

impl From<Literal> for Expression {
    fn from(lit: Literal) -> Self {
        Expression::Literal(lit)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub target: SignalId,
    pub source: Expression,
}

/// Value bound to a primitive parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Bits(Literal),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bits(lit) => write!(f, "{}", lit),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveInstance {
    pub name: String,
    pub primitive: &'static Primitive,
    pub ports: Vec<(&'static str, Expression)>,
    pub params: Vec<(String, ParamValue)>,
}

impl PrimitiveInstance {
    pub fn port(&self, name: &str) -> Option<&Expression> {
        self.ports.iter().find(|(p, _)| *p == name).map(|(_, e)| e)
    }

    /// The signal driven by this instance's output port.
    pub fn output(&self) -> Option<SignalId> {
        match self.port(self.primitive.output_port()) {
            Some(Expression::Signal(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.params.iter().find(|(p, _)| p == name).map(|(_, v)| *v)
    }

    /// Expressions connected to input ports.
    pub fn inputs(&self) -> impl Iterator<Item = &Expression> {
        self.ports
            .iter()
            .filter(|(p, _)| self.primitive.port(p) == Some(PortDirection::Input))
            .map(|(_, e)| e)
    }
}

/// A netlist under construction.
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    name: String,
    signals: Vec<Signal>,
    inputs: Vec<SignalId>,
    outputs: Vec<SignalId>,
    wires: Vec<SignalId>,
    instances: Vec<PrimitiveInstance>,
    assignments: Vec<Assignment>,
    identifiers: HashSet<String>,
    wire_counter: usize,
    instance_counter: usize,
}

impl Module {
    pub fn new(name: &str) -> Result<Self> {
        if !is_identifier(name) {
            return Err(Error::InvalidIdentifier(name.to_string()));
        }
        Ok(Module {
            id: ModuleId::fresh(),
            name: name.to_string(),
            signals: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            wires: Vec::new(),
            instances: Vec::new(),
            assignments: Vec::new(),
            identifiers: HashSet::new(),
            wire_counter: 0,
            instance_counter: 0,
        })
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ─── Construction ──────────────────────────────────────────────

    /// Allocate an internal signal named `w_<n>` or `w_<n>_<hint>`.
    pub fn add_signal(
        &mut self,
        width: u32,
        hint: Option<&str>,
        array_len: Option<usize>,
    ) -> SignalId {
        let name = loop {
            let candidate = match hint {
                Some(h) => format!("w_{}_{}", self.wire_counter, h),
                None => format!("w_{}", self.wire_counter),
            };
            self.wire_counter += 1;
            if !self.identifiers.contains(&candidate) {
                break candidate;
            }
        };
        let id = self.push_signal(name, width, SignalRole::Internal, array_len);
        self.wires.push(id);
        id
    }

    pub fn add_input(
        &mut self,
        name: &str,
        width: u32,
        array_len: Option<usize>,
    ) -> Result<SignalId> {
        self.claim_identifier(name)?;
        let id = self.push_signal(name.to_string(), width, SignalRole::Input, array_len);
        self.inputs.push(id);
        Ok(id)
    }

    pub fn add_output(
        &mut self,
        name: &str,
        width: u32,
        array_len: Option<usize>,
    ) -> Result<SignalId> {
        self.claim_identifier(name)?;
        let id = self.push_signal(name.to_string(), width, SignalRole::Output, array_len);
        self.outputs.push(id);
        Ok(id)
    }

    /// Instantiate `primitive`. Every port must be connected exactly once,
    /// the output port to a plain signal, and every referenced signal must
    /// belong to this module. Nothing is recorded when validation fails.
    pub fn add_instance(
        &mut self,
        primitive: &'static Primitive,
        ports: Vec<(&'static str, Expression)>,
        params: Vec<(String, ParamValue)>,
    ) -> Result<InstanceId> {
        for (_, expr) in &ports {
            self.ensure_expression_owned(expr)?;
        }

        let mismatch = |message: String| Error::PortMismatch {
            primitive: primitive.name.to_string(),
            message,
        };
        for (i, (port, expr)) in ports.iter().enumerate() {
            match primitive.port(port) {
                None => return Err(mismatch(format!("unknown port '{}'", port))),
                Some(PortDirection::Output) if !matches!(expr, Expression::Signal(_)) => {
                    return Err(mismatch(format!(
                        "output port '{}' must connect to a signal",
                        port
                    )))
                }
                _ => {}
            }
            if ports[..i].iter().any(|(p, _)| p == port) {
                return Err(mismatch(format!("port '{}' connected twice", port)));
            }
        }
        for (port, _) in primitive.ports {
            if !ports.iter().any(|(p, _)| p == port) {
                return Err(mismatch(format!("port '{}' left unconnected", port)));
            }
        }
        for (param, _) in &params {
            if !primitive.accepts_param(param) {
                return Err(mismatch(format!("unknown parameter '{}'", param)));
            }
        }

        let name = loop {
            let candidate = format!("inst_{}_{}", self.instance_counter, primitive.name);
            self.instance_counter += 1;
            if !self.identifiers.contains(&candidate) {
                break candidate;
            }
        };
        self.identifiers.insert(name.clone());
        let id = InstanceId {
            module: self.id,
            index: self.instances.len() as u32,
        };
        self.instances.push(PrimitiveInstance {
            name,
            primitive,
            ports,
            params,
        });
        Ok(id)
    }

    pub fn add_assignment(&mut self, target: SignalId, source: Expression) -> Result<()> {
        self.ensure_owned([target])?;
        self.ensure_expression_owned(&source)?;
        self.assignments.push(Assignment { target, source });
        Ok(())
    }

    // ─── Ownership ─────────────────────────────────────────────────

    pub fn owns(&self, id: SignalId) -> bool {
        id.module == self.id && id.index() < self.signals.len()
    }

    pub fn owns_instance(&self, id: InstanceId) -> bool {
        id.module == self.id && id.index() < self.instances.len()
    }

    /// Fail with a generation-invariant error if any handle is foreign.
    pub fn ensure_owned(&self, ids: impl IntoIterator<Item = SignalId>) -> Result<()> {
        for id in ids {
            if !self.owns(id) {
                return Err(Error::ForeignHandle {
                    what: format!("signal #{}", id.index),
                    owner: id.module.raw(),
                    module: self.name.clone(),
                    module_id: self.id.raw(),
                });
            }
        }
        Ok(())
    }

    fn ensure_expression_owned(&self, expr: &Expression) -> Result<()> {
        self.ensure_owned(expr.signals())
    }

    // ─── Access ────────────────────────────────────────────────────

    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        if self.owns(id) {
            self.signals.get(id.index())
        } else {
            None
        }
    }

    pub fn instance(&self, id: InstanceId) -> Option<&PrimitiveInstance> {
        if self.owns_instance(id) {
            self.instances.get(id.index())
        } else {
            None
        }
    }

    pub fn inputs(&self) -> &[SignalId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SignalId] {
        &self.outputs
    }

    /// Internal signals in allocation order.
    pub fn wires(&self) -> &[SignalId] {
        &self.wires
    }

    pub fn instances(&self) -> &[PrimitiveInstance] {
        &self.instances
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Instances of the named primitive.
    pub fn count_instances(&self, primitive: &str) -> usize {
        self.instances
            .iter()
            .filter(|i| i.primitive.name == primitive)
            .count()
    }

    fn push_signal(
        &mut self,
        name: String,
        width: u32,
        role: SignalRole,
        array_len: Option<usize>,
    ) -> SignalId {
        self.identifiers.insert(name.clone());
        let id = SignalId {
            module: self.id,
            index: self.signals.len() as u32,
        };
        self.signals.push(Signal {
            name,
            width,
            role,
            array_len,
        });
        id
    }

    fn claim_identifier(&self, name: &str) -> Result<()> {
        if !is_identifier(name) {
            return Err(Error::InvalidIdentifier(name.to_string()));
        }
        if self.identifiers.contains(name) {
            return Err(Error::DuplicateIdentifier(name.to_string()));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_$]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
