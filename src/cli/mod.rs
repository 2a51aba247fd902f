pub mod generate;
pub mod quantize;
pub mod simulate;

use std::path::{Path, PathBuf};
use std::process;

use nnhdl::generate::GenerateOptions;
use nnhdl::model::Model;
use nnhdl::project::Project;

/// Load the project named by `--config`, or the nearest nnhdl.toml above
/// the working directory. Exits on a file that exists but does not parse.
pub fn resolve_project(config: Option<&Path>) -> Option<Project> {
    let toml_path = match config {
        Some(path) => {
            if !path.exists() {
                eprintln!("error: config file '{}' not found", path.display());
                process::exit(1);
            }
            path.to_path_buf()
        }
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Project::find(&cwd)?
        }
    };
    match Project::load(&toml_path) {
        Ok(project) => {
            log::debug!("using project file {}", toml_path.display());
            Some(project)
        }
        Err(e) => {
            eprintln!("error: {}: {}", toml_path.display(), e);
            process::exit(1);
        }
    }
}

/// Generation settings from the project's `[generate]` table, or the
/// defaults when no project file is in use.
pub fn generate_options(project: Option<&Project>) -> nnhdl::Result<GenerateOptions> {
    match project {
        Some(p) => p.generate_options(),
        None => Ok(GenerateOptions::default()),
    }
}

/// Read a model interchange file or exit.
pub fn load_model(path: &Path) -> Model {
    match nnhdl::interchange::load(path) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("error: cannot load model '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}
