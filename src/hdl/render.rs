//! Text rendering of a `Module`.
//!
//! Output is a deterministic function of insertion order: header, port and
//! wire declarations, primitive instantiations, then continuous assignments.

use std::fmt::Write;

use super::{Expression, Module, Signal, SignalId};

const INDENT: &str = "    ";

impl Module {
    pub fn render(&self) -> String {
        let mut out = String::new();

        let ports: Vec<&str> = self
            .inputs()
            .iter()
            .chain(self.outputs())
            .map(|id| self.signal_name(*id))
            .collect();
        let _ = writeln!(out, "module {}({});", self.name(), ports.join(", "));

        for (keyword, ids) in [
            ("input", self.inputs()),
            ("output", self.outputs()),
            ("wire", self.wires()),
        ] {
            for id in ids {
                if let Some(sig) = self.signal(*id) {
                    let _ = writeln!(out, "{}{}", INDENT, declaration(keyword, sig));
                }
            }
        }

        for inst in self.instances() {
            let _ = write!(out, "{}{} ", INDENT, inst.primitive.name);
            if !inst.params.is_empty() {
                let params: Vec<String> = inst
                    .params
                    .iter()
                    .map(|(name, value)| format!(".{}({})", name, value))
                    .collect();
                let _ = write!(out, "#({}) ", params.join(", "));
            }
            let _ = write!(out, "{}(", inst.name);
            let ports: Vec<String> = inst
                .ports
                .iter()
                .map(|(port, expr)| {
                    format!("\n{}{}.{}({})", INDENT, INDENT, port, self.render_expression(expr))
                })
                .collect();
            let _ = writeln!(out, "{}\n{});", ports.join(","), INDENT);
        }

        for assign in self.assignments() {
            let _ = writeln!(
                out,
                "{}assign {} = {};",
                INDENT,
                self.signal_name(assign.target),
                self.render_expression(&assign.source)
            );
        }

        out.push_str("endmodule\n");
        out
    }

    /// Render a module that failed generation, marked so it cannot be
    /// mistaken for a usable netlist.
    pub fn render_invalid(&self, reason: &str) -> String {
        let mut out = String::new();
        for line in reason.lines() {
            let _ = writeln!(out, "// INVALID: {}", line);
        }
        out.push_str(&self.render());
        out
    }

    pub fn render_expression(&self, expr: &Expression) -> String {
        match expr {
            Expression::Signal(id) => self.signal_name(*id).to_string(),
            Expression::Literal(lit) => lit.to_string(),
            Expression::Concat(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| self.render_expression(p)).collect();
                format!("'{{{}}}", parts.join(", "))
            }
            Expression::Index(inner, index) => {
                format!("{}[{}]", self.render_expression(inner), index)
            }
        }
    }

    fn signal_name(&self, id: SignalId) -> &str {
        self.signal(id).map(|s| s.name.as_str()).unwrap_or("<unknown>")
    }
}

fn declaration(keyword: &str, sig: &Signal) -> String {
    let mut line = keyword.to_string();
    if sig.width > 1 {
        let _ = write!(line, " [{}:0]", sig.width - 1);
    }
    let _ = write!(line, " {}", sig.name);
    if let Some(len) = sig.array_len {
        let _ = write!(line, " [{}]", len);
    }
    line.push(';');
    line
}
