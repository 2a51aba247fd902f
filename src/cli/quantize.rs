use std::path::PathBuf;
use std::process;

use nnhdl::layer::Layer;
use nnhdl::model::QuantizeMode;
use nnhdl::quantize::fragment_count;

use super::{load_model, resolve_project};

pub fn cmd_quantize(
    model_path: PathBuf,
    dest: PathBuf,
    precision: Option<f64>,
    mode: Option<QuantizeMode>,
    config: Option<PathBuf>,
) {
    let project = resolve_project(config.as_deref());
    let quantize = project.map(|p| p.quantize).unwrap_or_default();

    let Some(precision) = precision.or(quantize.precision) else {
        eprintln!("error: --precision is required (or set [quantize].precision in nnhdl.toml)");
        process::exit(1);
    };
    let mode = mode.or(quantize.mode).unwrap_or_default();

    let model = load_model(&model_path);
    let quantized = match model.log_quantize(precision, mode) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let fragments: usize = quantized
        .layers()
        .iter()
        .map(|layer| match layer {
            Layer::DenseLog(l) => fragment_count(l.fragments()),
            Layer::IncrementalLog(l) => fragment_count(l.fragments()),
            _ => 0,
        })
        .sum();

    if let Err(e) = nnhdl::interchange::save(&dest, &quantized) {
        eprintln!("error: cannot write '{}': {}", dest.display(), e);
        process::exit(1);
    }
    eprintln!(
        "Quantized at precision {} ({} fragments) -> {}",
        precision,
        fragments,
        dest.display()
    );
}
