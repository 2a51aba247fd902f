//! Catalogue of the external floating-point primitives.
//!
//! The primitives themselves are supplied as separate IP; the netlist only
//! refers to them by name, port contract and parameters.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Port and parameter contract of one external primitive.
#[derive(Debug, PartialEq, Eq)]
pub struct Primitive {
    pub name: &'static str,
    pub ports: &'static [(&'static str, PortDirection)],
    pub params: &'static [&'static str],
}

impl Primitive {
    pub fn port(&self, name: &str) -> Option<PortDirection> {
        self.ports
            .iter()
            .find(|(port, _)| *port == name)
            .map(|(_, dir)| *dir)
    }

    /// Name of the (single) output port.
    pub fn output_port(&self) -> &'static str {
        self.ports
            .iter()
            .find(|(_, dir)| *dir == PortDirection::Output)
            .map(|(port, _)| *port)
            .unwrap_or("out")
    }

    pub fn accepts_param(&self, name: &str) -> bool {
        self.params.contains(&name)
    }
}

pub static FP_ADDER: Primitive = Primitive {
    name: "fp_adder",
    ports: &[
        ("argumenta", PortDirection::Input),
        ("argumentb", PortDirection::Input),
        ("out", PortDirection::Output),
    ],
    params: &["floatsize", "exponentsize"],
};

/// `out = (negate ? -1 : 1) * argumenta * 2^power`
pub static FP_MULTIPLY_BY_POWER_OF_2: Primitive = Primitive {
    name: "fp_multiplybypowerof2",
    ports: &[
        ("argumenta", PortDirection::Input),
        ("out", PortDirection::Output),
    ],
    params: &["floatsize", "exponentsize", "power", "negate"],
};

/// `out = argumenta * multiplicand`, multiplicand given as a format literal.
pub static FP_MULTIPLIER: Primitive = Primitive {
    name: "fp_multiplier",
    ports: &[
        ("argumenta", PortDirection::Input),
        ("out", PortDirection::Output),
    ],
    params: &["floatsize", "exponentsize", "multiplicand"],
};

/// N-way summer over an array bus of `inputcount` elements.
pub static FP_SUM: Primitive = Primitive {
    name: "fp_sum",
    ports: &[
        ("argument_array", PortDirection::Input),
        ("out", PortDirection::Output),
    ],
    params: &["floatsize", "exponentsize", "inputcount"],
};

pub static FP_ACTIVATION_RELU: Primitive = Primitive {
    name: "fp_activation_relu",
    ports: &[
        ("argumenta", PortDirection::Input),
        ("out", PortDirection::Output),
    ],
    params: &["floatsize", "exponentsize"],
};

pub static CATALOGUE: [&Primitive; 5] = [
    &FP_ADDER,
    &FP_MULTIPLY_BY_POWER_OF_2,
    &FP_MULTIPLIER,
    &FP_SUM,
    &FP_ACTIVATION_RELU,
];

pub fn lookup(name: &str) -> Option<&'static Primitive> {
    CATALOGUE.iter().copied().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_ports() {
        let sum = lookup("fp_sum").unwrap();
        assert_eq!(sum.output_port(), "out");
        assert_eq!(sum.port("argument_array"), Some(PortDirection::Input));
        assert_eq!(sum.port("argumenta"), None);
        assert!(sum.accepts_param("inputcount"));
        assert!(!sum.accepts_param("power"));
        assert!(lookup("fp_divider").is_none());
    }

    #[test]
    fn test_every_primitive_has_one_output() {
        for prim in CATALOGUE {
            let outputs = prim
                .ports
                .iter()
                .filter(|(_, d)| *d == PortDirection::Output)
                .count();
            assert_eq!(outputs, 1, "{} output ports", prim.name);
            assert!(prim.accepts_param("floatsize"));
        }
    }
}
