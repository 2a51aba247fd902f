//! Versioned JSON interchange format for models.
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "input_count": 2,
//!   "output_count": 1,
//!   "layers": [
//!     { "kind": "dense", "weights": [[1.0, 1.0]] },
//!     { "kind": "bias", "biases": [0.0] },
//!     { "kind": "relu" }
//!   ]
//! }
//! ```
//!
//! Log layers carry `"fragments": [[[{"exponent": 2, "negative": false}, …]]]`
//! indexed `[output][input][term]`. The version tag is checked before any
//! layer is decoded.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layer::{BiasStep, DenseLayer, DenseLogLayer, IncrementalLogLayer, Layer, ReluStep};
use crate::model::Model;
use crate::quantize::FragmentMatrix;

pub const SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ModelRecord {
    schema_version: u64,
    input_count: usize,
    output_count: usize,
    layers: Vec<LayerRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum LayerRecord {
    Dense { weights: Vec<Vec<f64>> },
    DenseLog { fragments: FragmentMatrix },
    DenseLogIncremental { fragments: FragmentMatrix },
    Bias { biases: Vec<f64> },
    Relu,
}

impl LayerRecord {
    fn into_layer(self) -> Result<Layer> {
        Ok(match self {
            LayerRecord::Dense { weights } => DenseLayer::new(weights)?.into(),
            LayerRecord::DenseLog { fragments } => DenseLogLayer::new(fragments)?.into(),
            LayerRecord::DenseLogIncremental { fragments } => {
                IncrementalLogLayer::new(fragments)?.into()
            }
            LayerRecord::Bias { biases } => BiasStep::new(biases).into(),
            LayerRecord::Relu => ReluStep.into(),
        })
    }

    fn from_layer(layer: &Layer) -> Self {
        match layer {
            Layer::Dense(l) => LayerRecord::Dense {
                weights: l.weights().to_vec(),
            },
            Layer::DenseLog(l) => LayerRecord::DenseLog {
                fragments: l.fragments().clone(),
            },
            Layer::IncrementalLog(l) => LayerRecord::DenseLogIncremental {
                fragments: l.fragments().clone(),
            },
            Layer::Bias(l) => LayerRecord::Bias {
                biases: l.biases().to_vec(),
            },
            Layer::Relu(_) => LayerRecord::Relu,
        }
    }
}

pub fn from_json(text: &str) -> Result<Model> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let version = value
        .get("schema_version")
        .ok_or(Error::MissingSchemaVersion)?
        .as_u64()
        .ok_or_else(|| {
            Error::InvalidModel("'schema_version' must be an unsigned integer".to_string())
        })?;
    if version != SCHEMA_VERSION {
        return Err(Error::SchemaVersion {
            found: version,
            expected: SCHEMA_VERSION,
        });
    }

    let record: ModelRecord = serde_json::from_value(value)?;
    let layers = record
        .layers
        .into_iter()
        .map(LayerRecord::into_layer)
        .collect::<Result<Vec<_>>>()?;
    Model::new(layers, record.input_count, record.output_count)
}

pub fn to_json(model: &Model) -> Result<String> {
    let record = ModelRecord {
        schema_version: SCHEMA_VERSION,
        input_count: model.input_count(),
        output_count: model.output_count(),
        layers: model.layers().iter().map(LayerRecord::from_layer).collect(),
    };
    Ok(serde_json::to_string_pretty(&record)?)
}

pub fn load(path: &Path) -> Result<Model> {
    let text = fs::read_to_string(path)?;
    let model = from_json(&text)?;
    log::debug!(
        "loaded {} layers from {}",
        model.layers().len(),
        path.display()
    );
    Ok(model)
}

pub fn save(path: &Path, model: &Model) -> Result<()> {
    fs::write(path, to_json(model)?)?;
    Ok(())
}
