use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::adder::AdderTopology;
use crate::error::{Error, Result};
use crate::float::FloatFormat;
use crate::generate::GenerateOptions;
use crate::model::QuantizeMode;

pub const CONFIG_FILE: &str = "nnhdl.toml";

/// Project configuration from nnhdl.toml.
#[derive(Clone, Debug)]
pub struct Project {
    pub name: String,
    /// Interchange file, resolved against `root_dir`.
    pub model: Option<PathBuf>,
    /// Netlist destination, resolved against `root_dir`.
    pub output: PathBuf,
    pub root_dir: PathBuf,
    pub generate: GenerateConfig,
    pub quantize: QuantizeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    project: ProjectSection,
    #[serde(default)]
    generate: GenerateConfig,
    #[serde(default)]
    quantize: QuantizeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    name: String,
    model: Option<String>,
    output: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    pub float_format: Option<String>,
    pub total_bits: Option<u32>,
    pub exponent_bits: Option<u32>,
    pub adder: Option<AdderTopology>,
    pub input_port: Option<String>,
    pub output_port: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantizeConfig {
    pub precision: Option<f64>,
    pub mode: Option<QuantizeMode>,
}

impl GenerateConfig {
    /// Resolve the configured float format. `"custom"` (or bare widths)
    /// needs both `total_bits` and `exponent_bits`.
    pub fn float_format(&self) -> Result<FloatFormat> {
        match (self.float_format.as_deref(), self.total_bits, self.exponent_bits) {
            (Some("custom") | None, Some(total), Some(exponent)) => {
                FloatFormat::new(total, exponent)
            }
            (Some("custom"), _, _) => Err(Error::InvalidProject(
                "custom float format needs 'total_bits' and 'exponent_bits'".to_string(),
            )),
            (None, None, None) => Ok(FloatFormat::default()),
            (None, _, _) => Err(Error::InvalidProject(
                "'total_bits' and 'exponent_bits' must be given together".to_string(),
            )),
            (Some(name), None, None) => FloatFormat::from_name(name),
            (Some(name), _, _) => Err(Error::InvalidProject(format!(
                "explicit widths conflict with named format '{}'",
                name
            ))),
        }
    }
}

impl Project {
    /// Load project from an nnhdl.toml file.
    pub fn load(toml_path: &Path) -> Result<Project> {
        let content = std::fs::read_to_string(toml_path)?;
        let root_dir = toml_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self::parse(&content, root_dir)
    }

    pub fn parse(content: &str, root_dir: PathBuf) -> Result<Project> {
        let file: ProjectFile = toml::from_str(content)?;
        let name = file.project.name;
        if name.is_empty() {
            return Err(Error::InvalidProject(format!(
                "missing 'name' in {}",
                CONFIG_FILE
            )));
        }
        let output = file
            .project
            .output
            .unwrap_or_else(|| format!("{}.sv", name));

        Ok(Project {
            model: file.project.model.map(|m| root_dir.join(m)),
            output: root_dir.join(output),
            name,
            root_dir,
            generate: file.generate,
            quantize: file.quantize,
        })
    }

    /// Try to find an nnhdl.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    pub fn generate_options(&self) -> Result<GenerateOptions> {
        let defaults = GenerateOptions::default();
        Ok(GenerateOptions {
            module_name: self.name.clone(),
            format: self.generate.float_format()?,
            adder: self.generate.adder.unwrap_or_default(),
            input_port: self
                .generate
                .input_port
                .clone()
                .unwrap_or(defaults.input_port),
            output_port: self
                .generate
                .output_port
                .clone()
                .unwrap_or(defaults.output_port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_project() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join(CONFIG_FILE);
        fs::write(
            &toml_path,
            r#"[project]
name = "mnist"
model = "mnist.json"

[generate]
float_format = "binary32"
adder = "chain"
input_port = "pixels"

[quantize]
precision = 0.05
mode = "first-incremental"
"#,
        )
        .unwrap();

        let project = Project::load(&toml_path).unwrap();
        assert_eq!(project.name, "mnist");
        assert!(project.model.unwrap().ends_with("mnist.json"));
        assert!(project.output.ends_with("mnist.sv"));
        assert_eq!(project.quantize.precision, Some(0.05));
        assert_eq!(project.quantize.mode, Some(QuantizeMode::FirstIncremental));

        let options = Project::load(&toml_path).unwrap().generate_options().unwrap();
        assert_eq!(options.module_name, "mnist");
        assert_eq!(options.format, FloatFormat::BINARY32);
        assert_eq!(options.adder, AdderTopology::Chain);
        assert_eq!(options.input_port, "pixels");
        assert_eq!(options.output_port, "output_array");
    }

    #[test]
    fn test_minimal_project_uses_defaults() {
        let project = Project::parse("[project]\nname = \"nn\"\n", PathBuf::from("/tmp")).unwrap();
        let options = project.generate_options().unwrap();
        assert_eq!(options.format, FloatFormat::BINARY16);
        assert_eq!(options.adder, AdderTopology::Tree);
        assert!(project.model.is_none());
    }

    #[test]
    fn test_custom_float_format() {
        let custom = Project::parse(
            "[project]\nname = \"nn\"\n\
             [generate]\nfloat_format = \"custom\"\ntotal_bits = 16\nexponent_bits = 8\n",
            PathBuf::new(),
        )
        .unwrap();
        assert_eq!(custom.generate.float_format().unwrap(), FloatFormat::new(16, 8).unwrap());

        let incomplete = Project::parse(
            "[project]\nname = \"nn\"\n[generate]\nfloat_format = \"custom\"\n",
            PathBuf::new(),
        )
        .unwrap();
        assert!(matches!(incomplete.generate_options(), Err(Error::InvalidProject(_))));

        let unknown = Project::parse(
            "[project]\nname = \"nn\"\n[generate]\nfloat_format = \"fp8\"\n",
            PathBuf::new(),
        )
        .unwrap();
        assert!(matches!(unknown.generate_options(), Err(Error::UnknownFloatFormat(_))));
    }

    #[test]
    fn test_rejects_bad_files() {
        assert!(matches!(
            Project::parse("[project]\nname = \"\"\n", PathBuf::new()),
            Err(Error::InvalidProject(_))
        ));
        assert!(matches!(
            Project::parse("[project]\nname = \"nn\"\nentry = \"x\"\n", PathBuf::new()),
            Err(Error::Toml(_))
        ));
        assert!(Project::parse("[generate]\nadder = \"tree\"\n", PathBuf::new()).is_err());
    }

    #[test]
    fn test_find_walks_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"nn\"\n").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(Project::find(&nested), Some(dir.path().join(CONFIG_FILE)));
    }
}
