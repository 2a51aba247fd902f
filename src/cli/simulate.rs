use std::fmt::Display;
use std::path::PathBuf;
use std::process;

use nnhdl::generate::generate;
use nnhdl::interval::Interval;
use nnhdl::layer::LayerKind;

use super::{generate_options, load_model, resolve_project};

/// Lists longer than this are shown as head … tail.
const ABBREVIATE_AFTER: usize = 15;

pub fn cmd_simulate(
    model_path: PathBuf,
    inputs: &str,
    incremental: bool,
    intervals: bool,
    artificial_interval: f64,
    netlist: bool,
    config: Option<PathBuf>,
) {
    let inputs = match parse_inputs(inputs) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("error: {}", msg);
            process::exit(1);
        }
    };
    let mut model = load_model(&model_path);
    let input_intervals: Vec<Interval> = inputs
        .iter()
        .map(|x| Interval::around(*x, artificial_interval))
        .collect();

    if model.has_incremental_layers() && !incremental {
        log::warn!(
            "model has incremental log layers but --incremental was not given; using every fragment"
        );
    }

    let mut steps = 1;
    loop {
        let saturated = if incremental {
            println!("Simulating with {} log-weight steps", steps);
            model.set_incremental_steps(steps)
        } else {
            true
        };

        let trace = model.evaluate_trace(&inputs).unwrap_or_else(|e| fail(e));
        let interval_trace = if intervals {
            Some(
                model
                    .evaluate_interval_trace(&input_intervals)
                    .unwrap_or_else(|e| fail(e)),
            )
        } else {
            None
        };

        for (i, layer) in model.layers().iter().enumerate() {
            let label = match layer.kind() {
                LayerKind::IncrementalLog => format!("{} @ {} steps", layer.kind().name(), steps),
                kind => kind.name().to_string(),
            };
            println!(
                "- Layer #{} ({}) got {}",
                i,
                label,
                abbreviate(&trace[i], |v| format!("{:.2}", v))
            );
            if let Some(bounds) = &interval_trace {
                println!(
                    "  - got intervals {}",
                    abbreviate(&bounds[i], |b| format!("({:.2}, {:.2})", b.lo, b.hi))
                );
            }
        }

        let output = trace.last().cloned().unwrap_or_else(|| inputs.clone());
        println!("Output: {}", list(&output, |v| v.to_string()));
        if let Some(bounds) = interval_trace.as_ref().and_then(|t| t.last()) {
            println!("Output intervals: {}", list(bounds, |b| b.to_string()));
        }

        if !incremental {
            break;
        }
        if saturated {
            println!("Reached max steps at {} steps", steps);
            break;
        }
        steps += 1;
    }

    if netlist {
        let project = resolve_project(config.as_deref());
        let options = generate_options(project.as_ref()).unwrap_or_else(|e| fail(e));
        let generated = generate(&model, &options).unwrap_or_else(|failure| {
            eprintln!("error: {}", failure.error);
            process::exit(1);
        });
        let output = generated.simulate(&inputs).unwrap_or_else(|e| fail(e));
        println!("Netlist output: {}", list(&output, |v| v.to_string()));
    }
}

fn fail(e: impl Display) -> ! {
    eprintln!("error: {}", e);
    process::exit(1);
}

fn parse_inputs(text: &str) -> Result<Vec<f64>, String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", s))
        })
        .collect()
}

fn list<T>(items: &[T], show: impl Fn(&T) -> String) -> String {
    let parts: Vec<String> = items.iter().map(show).collect();
    format!("[{}]", parts.join(", "))
}

fn abbreviate<T>(items: &[T], show: impl Fn(&T) -> String) -> String {
    if items.len() <= ABBREVIATE_AFTER {
        return list(items, show);
    }
    let each = ABBREVIATE_AFTER / 2;
    let head: Vec<String> = items[..each].iter().map(&show).collect();
    let tail: Vec<String> = items[items.len() - each..].iter().map(&show).collect();
    format!(
        "[{} ... {}] ({} elements)",
        head.join(", "),
        tail.join(", "),
        items.len()
    )
}
