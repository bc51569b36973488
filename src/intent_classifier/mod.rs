mod featurizer;
mod log_reg_intent_classifier;
mod logreg;

use failure::{format_err, ResultExt};

pub use self::log_reg_intent_classifier::LogRegIntentClassifier;
use crate::errors::*;
use crate::models::ProcessingUnitMetadata;
use crate::utils::IntentName;

pub trait IntentClassifier: Send + Sync {
    /// Most likely intent, or `None` when no intent is confident enough
    fn get_intent(&self, input: &str) -> Result<Option<IntentName>>;

    /// Serialized state, tagged with its processing unit name
    fn to_json(&self) -> Result<serde_json::Value>;
}

pub fn build_intent_classifier(value: &serde_json::Value) -> Result<Box<dyn IntentClassifier>> {
    let metadata: ProcessingUnitMetadata = serde_json::from_value(value.clone())
        .with_context(|_| "Cannot deserialize intent classifier metadata")?;
    match metadata {
        ProcessingUnitMetadata::LogRegIntentClassifier => {
            Ok(Box::new(LogRegIntentClassifier::from_json(value)?) as _)
        }
        _ => Err(format_err!("{:?} is not an intent classifier", metadata)),
    }
}
