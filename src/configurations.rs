use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs::File;
use std::path::Path;

use failure::ResultExt;
use serde_derive::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::*;
use crate::slot_filler::TaggingScheme;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilisticParserConfig {
    pub intent_classifier_config: LogRegConfig,
    pub tagger_config: CrfTaggerConfig,
    pub data_augmentation_config: DataAugmentationConfig,
    /// Above this number of candidate assignments, builtin slots are
    /// resolved with a greedy matching instead of an exhaustive search
    pub max_exhaustive_assignments: usize,
    pub random_seed: u64,
}

impl Default for ProbabilisticParserConfig {
    fn default() -> Self {
        Self {
            intent_classifier_config: LogRegConfig::default(),
            tagger_config: CrfTaggerConfig::default(),
            data_augmentation_config: DataAugmentationConfig::default(),
            max_exhaustive_assignments: 1000,
            random_seed: 42,
        }
    }
}

impl ProbabilisticParserConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_file = File::open(path.as_ref()).with_context(|_| {
            format!("Cannot open parser configuration file '{:?}'", path.as_ref())
        })?;
        let config = serde_json::from_reader(config_file)
            .with_context(|_| "Cannot deserialize parser configuration")?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRegConfig {
    pub nb_iterations: usize,
    pub learning_rate: f32,
    pub l2_penalty: f32,
    pub sublinear_tf: bool,
    /// Minimum normalized probability for an intent to be returned
    pub probability_threshold: f32,
}

impl Default for LogRegConfig {
    fn default() -> Self {
        Self {
            nb_iterations: 300,
            learning_rate: 1.0,
            l2_penalty: 1e-3,
            sublinear_tf: false,
            probability_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrfTaggerConfig {
    pub tagging_scheme: TaggingScheme,
    pub nb_epochs: usize,
    pub feature_factory_configs: Vec<FeatureFactory>,
}

impl Default for CrfTaggerConfig {
    fn default() -> Self {
        Self {
            tagging_scheme: TaggingScheme::BIO,
            nb_epochs: 15,
            feature_factory_configs: default_feature_factories(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFactory {
    pub factory_name: String,
    pub offsets: Vec<i32>,
    #[serde(default)]
    pub args: HashMap<String, serde_json::Value>,
}

impl FeatureFactory {
    fn new(factory_name: &str, offsets: Vec<i32>, args: serde_json::Value) -> Self {
        let args = args
            .as_object()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self {
            factory_name: factory_name.to_string(),
            offsets,
            args,
        }
    }
}

fn default_feature_factories() -> Vec<FeatureFactory> {
    vec![
        FeatureFactory::new("ngram", vec![-2, -1, 0, 1, 2], json!({"n": 1})),
        FeatureFactory::new("ngram", vec![-2, 1], json!({"n": 2})),
        FeatureFactory::new("shape_ngram", vec![0], json!({"n": 1})),
        FeatureFactory::new("is_digit", vec![-1, 0, 1], json!({})),
        FeatureFactory::new("is_first", vec![-2, -1, 0], json!({})),
        FeatureFactory::new("is_last", vec![0, 1, 2], json!({})),
        FeatureFactory::new("prefix", vec![0], json!({"prefix_size": 2})),
        FeatureFactory::new("suffix", vec![0], json!({"suffix_size": 2})),
    ]
}

/// Shapes the synthetic utterances used to train the taggers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataAugmentationConfigModel")]
pub struct DataAugmentationConfig {
    max_utterances: usize,
    noise_prob: f32,
    min_noise_size: usize,
    max_noise_size: usize,
}

impl DataAugmentationConfig {
    pub fn new(
        max_utterances: usize,
        noise_prob: f32,
        min_noise_size: usize,
        max_noise_size: usize,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&noise_prob) {
            return Err(NluError::InvalidConfiguration(format!(
                "noise probability must be in [0, 1], found {}",
                noise_prob
            ))
            .into());
        }
        if min_noise_size > max_noise_size {
            return Err(NluError::InvalidConfiguration(format!(
                "min noise size ({}) is greater than max noise size ({})",
                min_noise_size, max_noise_size
            ))
            .into());
        }
        Ok(Self {
            max_utterances,
            noise_prob,
            min_noise_size,
            max_noise_size,
        })
    }

    pub fn max_utterances(&self) -> usize {
        self.max_utterances
    }

    pub fn noise_prob(&self) -> f32 {
        self.noise_prob
    }

    pub fn min_noise_size(&self) -> usize {
        self.min_noise_size
    }

    pub fn max_noise_size(&self) -> usize {
        self.max_noise_size
    }
}

impl Default for DataAugmentationConfig {
    fn default() -> Self {
        Self {
            max_utterances: 200,
            noise_prob: 0.0,
            min_noise_size: 0,
            max_noise_size: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct DataAugmentationConfigModel {
    max_utterances: usize,
    #[serde(alias = "noise_probability")]
    noise_prob: f32,
    min_noise_size: usize,
    max_noise_size: usize,
}

impl Default for DataAugmentationConfigModel {
    fn default() -> Self {
        let config = DataAugmentationConfig::default();
        Self {
            max_utterances: config.max_utterances,
            noise_prob: config.noise_prob,
            min_noise_size: config.min_noise_size,
            max_noise_size: config.max_noise_size,
        }
    }
}

impl TryFrom<DataAugmentationConfigModel> for DataAugmentationConfig {
    type Error = String;

    fn try_from(model: DataAugmentationConfigModel) -> ::std::result::Result<Self, String> {
        DataAugmentationConfig::new(
            model.max_utterances,
            model.noise_prob,
            model.min_noise_size,
            model.max_noise_size,
        )
        .map_err(|e| e.to_string())
    }
}
