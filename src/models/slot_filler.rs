use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::configurations::CrfTaggerConfig;
use crate::slot_filler::Tag;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrfTaggerModel {
    pub language_code: String,
    pub config: CrfTaggerConfig,
    pub labels: Vec<Tag>,
    pub initial_weights: Vec<f64>,
    /// `transition_weights[i][j]` scores label `j` following label `i`
    pub transition_weights: Vec<Vec<f64>>,
    pub emission_weights: BTreeMap<String, Vec<f64>>,
}
