use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use crate::configurations::ProbabilisticParserConfig;
use crate::utils::{EntityName, IntentName, SlotName};

/// Configuration document of a persisted probabilistic intent parser
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbabilisticParserModel {
    pub model_version: String,
    pub language_code: String,
    #[serde(flatten)]
    pub config: ProbabilisticParserConfig,
    pub intent_classifier: serde_json::Value,
    pub slot_name_mappings: HashMap<IntentName, HashMap<SlotName, EntityName>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelVersion {
    pub model_version: String,
}
