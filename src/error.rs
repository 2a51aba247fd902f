//! Error types for netlist generation and simulation.

use thiserror::Error;

/// Broad category of a fatal error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: dimensions, precision, format names, schema.
    Configuration,
    /// The IR was asked to connect something it does not own.
    GenerationInvariant,
    /// The operation is not defined for this layer kind.
    UnsupportedOperation,
    /// Reading or writing files.
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("adder network needs at least one input signal")]
    EmptyAdderInput,

    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("quantization precision must be positive and finite, got {0}")]
    InvalidPrecision(f64),

    #[error("cannot quantize non-finite weight {0}")]
    NonFiniteWeight(f64),

    #[error("weight {0} needs a power of two above 2^1023")]
    WeightOutOfRange(f64),

    #[error("unknown float format '{0}'")]
    UnknownFloatFormat(String),

    #[error("invalid float format: {0}")]
    InvalidFloatFormat(String),

    #[error("signal or instance identifier '{0}' is already declared")]
    DuplicateIdentifier(String),

    #[error("'{0}' is not a valid HDL identifier")]
    InvalidIdentifier(String),

    #[error("netlist failed the structural check with {0} error(s)")]
    StructuralCheck(usize),

    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("primitive '{primitive}': {message}")]
    PortMismatch { primitive: String, message: String },

    #[error("{what} belongs to module #{owner}, not to module '{module}' (#{module_id})")]
    ForeignHandle {
        what: String,
        owner: u32,
        module: String,
        module_id: u32,
    },

    #[error("`{operation}` is not supported for {layer} layers")]
    Unsupported {
        operation: &'static str,
        layer: &'static str,
    },

    #[error("unsupported model schema version {found} (this build reads version {expected})")]
    SchemaVersion { found: u64, expected: u64 },

    #[error("model document has no 'schema_version' tag")]
    MissingSchemaVersion,

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("invalid project configuration: {0}")]
    InvalidProject(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ForeignHandle { .. } | Error::StructuralCheck(_) => {
                ErrorKind::GenerationInvariant
            }
            Error::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            Error::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }

    pub(crate) fn mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::EmptyAdderInput.kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::Unsupported {
                operation: "lower",
                layer: "incremental log"
            }
            .kind(),
            ErrorKind::UnsupportedOperation
        );
        let foreign = Error::ForeignHandle {
            what: "signal w_0".into(),
            owner: 1,
            module: "nn".into(),
            module_id: 2,
        };
        assert_eq!(foreign.kind(), ErrorKind::GenerationInvariant);
        assert!(foreign.to_string().contains("module #1"));
    }

    #[test]
    fn test_mismatch_message() {
        let err = Error::mismatch("bias layer", 3, 2);
        assert_eq!(
            err.to_string(),
            "dimension mismatch in bias layer: expected 3, got 2"
        );
    }
}
