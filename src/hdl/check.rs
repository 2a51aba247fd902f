//! Structural validation of a finished `Module`.
//!
//! Every input must be undriven, every other signal driven exactly once
//! (by an assignment or a primitive output), every referenced signal must
//! exist, and the driver graph must be acyclic.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{Expression, Module, SignalId, SignalRole};
use crate::diagnostic::Diagnostic;

/// Something that drives a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Driver {
    Instance(usize),
    Assignment(usize),
}

impl Module {
    /// Run every structural rule, collecting all violations.
    pub fn check(&self) -> Result<(), Vec<Diagnostic>> {
        let mut errors = Vec::new();
        let drivers = self.drivers();

        for (index, found) in drivers.iter().enumerate() {
            let Some(sig) = self.signals.get(index) else {
                continue;
            };
            match (sig.role, found.len()) {
                (SignalRole::Input, 0) => {}
                (SignalRole::Input, _) => errors.push(Diagnostic::error(format!(
                    "input '{}' is driven inside the module",
                    sig.name
                ))),
                (_, 1) => {}
                (_, 0) => errors.push(
                    Diagnostic::error(format!("signal '{}' is never driven", sig.name))
                        .with_help("connect it to a primitive output or assign it".to_string()),
                ),
                (_, n) => errors.push(Diagnostic::error(format!(
                    "signal '{}' has {} drivers",
                    sig.name, n
                ))),
            }
        }

        let mut dangling = |context: &str, expr: &Expression| {
            for id in expr.signals() {
                if !self.owns(id) {
                    errors.push(Diagnostic::error(format!(
                        "{} references signal #{} which is not declared in '{}'",
                        context,
                        id.index(),
                        self.name()
                    )));
                }
            }
        };
        for inst in self.instances() {
            for (_, expr) in &inst.ports {
                dangling(&format!("instance '{}'", inst.name), expr);
            }
        }
        for assign in self.assignments() {
            dangling("assignment", &Expression::Signal(assign.target));
            dangling("assignment", &assign.source);
        }

        if errors.is_empty() && self.evaluation_order().is_none() {
            errors.push(Diagnostic::error(format!(
                "module '{}' contains a combinational loop",
                self.name()
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Drivers of every signal, indexed by signal index.
    pub(crate) fn drivers(&self) -> Vec<Vec<Driver>> {
        let mut drivers = vec![Vec::new(); self.signal_count()];
        for (i, inst) in self.instances().iter().enumerate() {
            if let Some(out) = inst.output() {
                if let Some(slot) = drivers.get_mut(out.index()) {
                    slot.push(Driver::Instance(i));
                }
            }
        }
        for (i, assign) in self.assignments().iter().enumerate() {
            if let Some(slot) = drivers.get_mut(assign.target.index()) {
                slot.push(Driver::Assignment(i));
            }
        }
        drivers
    }

    /// Drivers in an order where every signal is produced before it is
    /// read. `None` if the netlist has a loop.
    pub(crate) fn evaluation_order(&self) -> Option<Vec<Driver>> {
        let mut graph: DiGraph<Driver, ()> = DiGraph::new();
        let mut nodes: Vec<NodeIndex> = Vec::new();
        for i in 0..self.instances().len() {
            nodes.push(graph.add_node(Driver::Instance(i)));
        }
        for i in 0..self.assignments().len() {
            nodes.push(graph.add_node(Driver::Assignment(i)));
        }
        let node_of = |driver: Driver| match driver {
            Driver::Instance(i) => nodes[i],
            Driver::Assignment(i) => nodes[self.instances().len() + i],
        };

        let drivers = self.drivers();
        let mut link = |reads: Vec<SignalId>, reader: Driver| {
            for id in reads {
                for source in drivers.get(id.index()).into_iter().flatten() {
                    graph.add_edge(node_of(*source), node_of(reader), ());
                }
            }
        };
        for (i, inst) in self.instances().iter().enumerate() {
            let reads = inst.inputs().flat_map(Expression::signals).collect();
            link(reads, Driver::Instance(i));
        }
        for (i, assign) in self.assignments().iter().enumerate() {
            link(assign.source.signals(), Driver::Assignment(i));
        }

        toposort(&graph, None)
            .ok()
            .map(|order| order.into_iter().map(|n| graph[n]).collect())
    }
}
