mod configurations;
mod dataset;
mod entity_parser;
pub mod errors;
mod intent_classifier;
mod intent_parser;
mod language;
pub mod models;
mod resources;
mod slot_filler;
mod slot_utils;
#[cfg(test)]
mod testutils;
mod tokenization;
mod utils;

pub const MODEL_VERSION: &str = "0.1.0";

pub use crate::configurations::{
    CrfTaggerConfig, DataAugmentationConfig, FeatureFactory, LogRegConfig,
    ProbabilisticParserConfig,
};
pub use crate::dataset::{augment_utterances, Chunk, Dataset, Entity, EntityValue, Intent, Utterance};
pub use crate::entity_parser::{BuiltinEntity, BuiltinEntityParser, PatternBuiltinEntityParser};
pub use crate::errors::*;
pub use crate::intent_classifier::{build_intent_classifier, IntentClassifier, LogRegIntentClassifier};
pub use crate::intent_parser::{IntentParser, ProbabilisticIntentParser};
pub use crate::language::Language;
pub use crate::resources::SharedResources;
pub use crate::slot_filler::{
    augment_slots, build_tagger, spans_to_tokens_indexes, tags_to_slots, CrfTagger, Tag,
    TagPrefix, Tagger, TaggingScheme,
};
pub use crate::slot_utils::{ParseResult, ParsedSlot};
pub use crate::tokenization::{tokenize, tokenize_light, Token};
pub use crate::utils::{EntityName, IntentName, SlotName};
