use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::configurations::LogRegConfig;
use crate::utils::IntentName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassifierModel {
    pub language_code: String,
    pub config: LogRegConfig,
    pub intent_list: Vec<IntentName>,
    pub featurizer: Option<FeaturizerModel>,
    pub intercept: Option<Vec<f32>>,
    /// One row of feature coefficients per intent
    pub coeffs: Option<Vec<Vec<f32>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturizerModel {
    pub sublinear_tf: bool,
    pub vocab: BTreeMap<String, usize>,
    pub idf_diag: Vec<f32>,
}
