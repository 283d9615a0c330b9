use log::info;
use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::activation::activation::ActivationFunction;
use crate::error::{NnError, Result};
use crate::layers::{Dense, Dropout, Initializer, Layer};
use crate::network::build_config::BuildConfig;
use crate::network::sequential::Sequential;
use crate::regularization::Regularizer;

/// Describes one layer in a model specification.
///
/// Fields:
/// - `kind`        — registered layer kind: `"dense"` or `"dropout"`
/// - `units`       — output width (dense only)
/// - `input_width` — required on the first layer, ignored elsewhere
/// - `activation`  — dense activation, `identity` when omitted
/// - `rate`        — drop probability (dropout only)
/// - `regularizer`, `initializer`, `seed` — optional dense/dropout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regularizer: Option<Regularizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Initializer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl LayerSpec {
    fn empty(kind: &str) -> LayerSpec {
        LayerSpec {
            kind: kind.to_string(),
            units: None,
            input_width: None,
            activation: None,
            rate: None,
            regularizer: None,
            initializer: None,
            seed: None,
        }
    }

    pub fn dense(units: usize, activation: ActivationFunction) -> LayerSpec {
        LayerSpec { units: Some(units), activation: Some(activation), ..LayerSpec::empty("dense") }
    }

    pub fn dropout(rate: f64) -> LayerSpec {
        LayerSpec { rate: Some(rate), ..LayerSpec::empty("dropout") }
    }

    pub fn with_input_width(mut self, input_width: usize) -> LayerSpec {
        self.input_width = Some(input_width);
        self
    }

    /// Instantiates the described layer. Unknown kinds and missing required
    /// fields are contract errors.
    pub fn build(&self) -> Result<Box<dyn Layer>> {
        match self.kind.as_str() {
            "dense" => {
                let units = self.units.ok_or_else(|| {
                    NnError::Contract("dense layer spec is missing 'units'".to_string())
                })?;
                let mut dense = Dense::new(units, self.activation.unwrap_or(ActivationFunction::Identity));
                if let Some(width) = self.input_width {
                    dense = dense.with_input_width(width);
                }
                if let Some(regularizer) = self.regularizer {
                    dense = dense.with_regularizer(regularizer);
                }
                if let Some(initializer) = self.initializer {
                    dense = dense.with_initializer(initializer);
                }
                if let Some(seed) = self.seed {
                    dense = dense.with_seed(seed);
                }
                Ok(Box::new(dense))
            }
            "dropout" => {
                let rate = self.rate.ok_or_else(|| {
                    NnError::Contract("dropout layer spec is missing 'rate'".to_string())
                })?;
                let mut dropout = Dropout::new(rate);
                if let Some(width) = self.input_width {
                    dropout = dropout.with_input_width(width);
                }
                if let Some(seed) = self.seed {
                    dropout = dropout.with_seed(seed);
                }
                Ok(Box::new(dropout))
            }
            other => Err(NnError::UnknownLayer(other.to_string())),
        }
    }
}

fn default_normalization() -> String {
    "none".to_string()
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_thresholds() -> Vec<f64> {
    vec![0.5]
}

/// A serializable description of a model: its layer stack plus the
/// hyperparameters `build` needs. Weights are not part of it.
///
/// Names (`loss`, `normalization`, metrics) are kept as strings so that a
/// typo surfaces as a configuration error naming the bad value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Human-readable name used as the file stem.
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    pub loss: String,
    #[serde(default = "default_normalization")]
    pub normalization: String,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub train_metrics: Vec<String>,
    #[serde(default)]
    pub eval_metrics: Vec<String>,
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f64>,
}

impl ModelSpec {
    /// Parses the named hyperparameters into a `BuildConfig`.
    pub fn build_config(&self) -> Result<BuildConfig> {
        Ok(BuildConfig {
            loss: Some(self.loss.parse()?),
            normalization: self.normalization.parse()?,
            learning_rate: self.learning_rate,
            train_metrics: self.train_metrics.iter().map(|m| m.parse()).collect::<Result<_>>()?,
            eval_metrics: self.eval_metrics.iter().map(|m| m.parse()).collect::<Result<_>>()?,
            thresholds: self.thresholds.clone(),
        })
    }

    /// Creates every layer, adds them in order and builds the model.
    pub fn into_model(&self) -> Result<Sequential> {
        let config = self.build_config()?;
        let mut model = Sequential::new();
        for layer in &self.layers {
            model.add_boxed(layer.build()?)?;
        }
        model.build(config)?;
        info!("model '{}' created from spec", self.name);
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<ModelSpec> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `ModelSpec` from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<ModelSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::LossKind;
    use crate::metrics::MetricKind;

    const SPEC: &str = r#"{
        "name": "classifier",
        "layers": [
            { "kind": "dense", "units": 8, "input_width": 2, "activation": "relu", "initializer": "he", "seed": 1 },
            { "kind": "dropout", "rate": 0.25, "seed": 2 },
            { "kind": "dense", "units": 1, "activation": "sigmoid",
              "regularizer": { "l2": { "lambda": 0.01 } } }
        ],
        "loss": "binary_crossentropy",
        "normalization": "zscore",
        "learning_rate": 0.5,
        "eval_metrics": ["accuracy", "f1"],
        "thresholds": [0.5, 0.7]
    }"#;

    #[test]
    fn test_spec_builds_model() {
        let spec = ModelSpec::from_json(SPEC).unwrap();
        let config = spec.build_config().unwrap();
        assert_eq!(config.loss, Some(LossKind::BinaryCrossentropy));
        assert_eq!(config.eval_metrics, vec![MetricKind::Accuracy, MetricKind::F1]);

        let model = spec.into_model().unwrap();
        assert!(model.is_built());
        let layers = model.layers();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[1].units(), 8);
        assert_eq!(layers[2].declared_input_width(), Some(8));
        assert!(layers[2].regularizer().is_some());
    }

    #[test]
    fn test_unknown_loss_in_spec_is_config_error() {
        let mut spec = ModelSpec::from_json(SPEC).unwrap();
        spec.loss = "hinge".to_string();
        let err = spec.into_model().unwrap_err();
        assert!(matches!(err, NnError::UnknownLoss(_)));
    }

    #[test]
    fn test_unknown_layer_kind_is_contract_error() {
        let mut spec = ModelSpec::from_json(SPEC).unwrap();
        spec.layers.push(LayerSpec::empty("conv2d"));
        assert!(spec.into_model().unwrap_err().is_contract());

        let err = LayerSpec::empty("dense").build().unwrap_err();
        assert!(err.is_contract());
    }

    #[test]
    fn test_defaults_and_json_file_roundtrip() {
        let spec = ModelSpec {
            name: "tiny".to_string(),
            layers: vec![LayerSpec::dense(1, ActivationFunction::Identity).with_input_width(3)],
            loss: "mse".to_string(),
            normalization: default_normalization(),
            learning_rate: default_learning_rate(),
            train_metrics: vec![],
            eval_metrics: vec![],
            thresholds: default_thresholds(),
        };
        let path = std::env::temp_dir().join(format!("meik-nn-spec-{}.json", std::process::id()));
        spec.save_json(&path).unwrap();
        let loaded = ModelSpec::load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, spec);

        let minimal = ModelSpec::from_json(r#"{"name":"m","layers":[],"loss":"mae"}"#).unwrap();
        assert_eq!(minimal.normalization, "none");
        assert_eq!(minimal.thresholds, vec![0.5]);
    }
}
