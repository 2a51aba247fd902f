//! Shared state threaded through layer lowering.

use crate::adder::AdderTopology;
use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::float::FloatFormat;
use crate::hdl::{Expression, InstanceId, Module, ParamValue, Primitive};

/// Settings and collected warnings for one lowering pass.
#[derive(Clone, Debug, Default)]
pub struct LowerEnv {
    pub format: FloatFormat,
    /// Reduction used by dense layers. Log layers always use the wide sum.
    pub adder: AdderTopology,
    pub diagnostics: Vec<Diagnostic>,
}

impl LowerEnv {
    pub fn new(format: FloatFormat) -> Self {
        LowerEnv {
            format,
            adder: AdderTopology::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_adder(mut self, adder: AdderTopology) -> Self {
        self.adder = adder;
        self
    }

    /// Signal width of every value in this pass.
    pub fn width(&self) -> u32 {
        self.format.total_bits()
    }

    /// Instantiate `primitive` with the format parameters prepended to
    /// `extra`.
    pub fn add_ip(
        &self,
        module: &mut Module,
        primitive: &'static Primitive,
        ports: Vec<(&'static str, Expression)>,
        extra: Vec<(String, ParamValue)>,
    ) -> Result<InstanceId> {
        let mut params = self.format.base_params();
        params.extend(extra);
        module.add_instance(primitive, ports, params)
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }
}
