use std::path::PathBuf;
use std::process;

use nnhdl::adder::AdderTopology;
use nnhdl::diagnostic::render_diagnostics;
use nnhdl::float::FloatFormat;
use nnhdl::generate::generate;

use super::{generate_options, load_model, resolve_project};

pub fn cmd_generate(
    model: Option<PathBuf>,
    dest: Option<PathBuf>,
    float: Option<String>,
    adder: Option<AdderTopology>,
    config: Option<PathBuf>,
) {
    let project = resolve_project(config.as_deref());

    let Some(model_path) = model.or_else(|| project.as_ref().and_then(|p| p.model.clone())) else {
        eprintln!("error: no model given and no [project].model in nnhdl.toml");
        process::exit(1);
    };
    let Some(dest) = dest.or_else(|| project.as_ref().map(|p| p.output.clone())) else {
        eprintln!("error: no destination given and no nnhdl.toml found");
        process::exit(1);
    };
    if !dest.extension().is_some_and(|e| e == "sv") {
        eprintln!("error: destination must be a .sv file");
        process::exit(1);
    }
    let Some(module_name) = dest.file_stem().map(|s| s.to_string_lossy().to_string()) else {
        eprintln!("error: cannot derive a module name from '{}'", dest.display());
        process::exit(1);
    };

    let mut options = match generate_options(project.as_ref()) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    options.module_name = module_name;
    if let Some(name) = float {
        options.format = match FloatFormat::from_name(&name) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        };
    }
    if let Some(adder) = adder {
        options.adder = adder;
    }

    let model = load_model(&model_path);
    match generate(&model, &options) {
        Ok(netlist) => {
            render_diagnostics(&netlist.diagnostics);
            if let Err(e) = std::fs::write(&dest, netlist.render()) {
                eprintln!("error: cannot write '{}': {}", dest.display(), e);
                process::exit(1);
            }
            eprintln!(
                "Generated {} ({}, {} instances) -> {}",
                netlist.module.name(),
                options.format,
                netlist.module.instances().len(),
                dest.display()
            );
        }
        Err(failure) => {
            render_diagnostics(&failure.diagnostics);
            if let Some(partial) = failure.render_partial() {
                if let Err(e) = std::fs::write(&dest, partial) {
                    eprintln!("error: cannot write '{}': {}", dest.display(), e);
                } else {
                    eprintln!("Wrote partial netlist marked INVALID -> {}", dest.display());
                }
            }
            eprintln!("error: {}", failure.error);
            process::exit(1);
        }
    }
}
