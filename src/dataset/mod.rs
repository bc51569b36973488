mod augmentation;

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::ops::Range;
use std::path::Path;

use failure::ResultExt;
use serde_derive::{Deserialize, Serialize};

pub use self::augmentation::augment_utterances;
use crate::errors::*;
use crate::language::Language;
use crate::slot_filler::{positive_tagging, spans_to_tokens_indexes, Tag, TaggingScheme};
use crate::tokenization::{tokenize, Token};
use crate::utils::{EntityName, IntentName, SlotName};

/// Training dataset, in the snips json format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub language: Language,
    pub intents: BTreeMap<IntentName, Intent>,
    #[serde(default)]
    pub entities: BTreeMap<EntityName, Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub data: Vec<Chunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<SlotName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub data: Vec<EntityValue>,
    #[serde(default = "default_true")]
    pub use_synonyms: bool,
    #[serde(default = "default_true")]
    pub automatically_extensible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    pub value: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Dataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset_file = File::open(path.as_ref())
            .with_context(|_| format!("Cannot open dataset file '{:?}'", path.as_ref()))?;
        let dataset = serde_json::from_reader(dataset_file)
            .with_context(|_| "Cannot deserialize dataset")?;
        Ok(dataset)
    }

    /// A dataset is trainable when it has intents and each of them has at
    /// least one valid utterance
    pub fn validate(&self) -> Result<()> {
        if self.intents.is_empty() {
            return Err(NluError::TrainingError("Dataset has no intent".to_string()).into());
        }
        for (intent_name, intent) in self.intents.iter() {
            if self.valid_utterances(intent).next().is_none() {
                return Err(NluError::TrainingError(format!(
                    "Intent '{}' has no valid utterance",
                    intent_name
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn valid_utterances<'a>(&'a self, intent: &'a Intent) -> impl Iterator<Item = &'a Utterance> {
        let language = self.language;
        intent
            .utterances
            .iter()
            .filter(move |utterance| utterance.is_valid(language))
    }

    /// Slot names of each intent, mapped to their entity
    pub fn slot_name_mappings(&self) -> HashMap<IntentName, HashMap<SlotName, EntityName>> {
        self.intents
            .iter()
            .map(|(intent_name, intent)| {
                let mapping = intent
                    .utterances
                    .iter()
                    .flat_map(|utterance| utterance.data.iter())
                    .filter_map(|chunk| match (&chunk.slot_name, &chunk.entity) {
                        (Some(slot_name), Some(entity)) => Some((slot_name.clone(), entity.clone())),
                        _ => None,
                    })
                    .collect();
                (intent_name.clone(), mapping)
            })
            .collect()
    }
}

impl Utterance {
    pub fn text(&self) -> String {
        self.data.iter().map(|chunk| &*chunk.text).collect()
    }

    /// Non-empty text, and every slot chunk carries its entity
    pub fn is_valid(&self, language: Language) -> bool {
        !tokenize(&self.text(), language).is_empty()
            && self
                .data
                .iter()
                .all(|chunk| chunk.slot_name.is_none() || chunk.entity.is_some())
    }

    /// Character ranges of the slot chunks, along with their slot names
    fn slot_ranges(&self) -> Vec<(Range<usize>, &str)> {
        let mut offset = 0;
        let mut ranges = vec![];
        for chunk in self.data.iter() {
            let length = chunk.text.chars().count();
            if let Some(slot_name) = chunk.slot_name.as_ref() {
                ranges.push((offset..offset + length, &**slot_name));
            }
            offset += length;
        }
        ranges
    }

    pub fn to_tagged_sample(
        &self,
        tagging_scheme: TaggingScheme,
        language: Language,
    ) -> (Vec<Token>, Vec<Tag>) {
        let tokens = tokenize(&self.text(), language);
        let mut tags = vec![Tag::Outside; tokens.len()];
        let slot_ranges = self.slot_ranges();
        let spans: Vec<Range<usize>> = slot_ranges.iter().map(|(range, _)| range.clone()).collect();
        let tokens_indexes = spans_to_tokens_indexes(&spans, &tokens);
        for ((_, slot_name), indexes) in slot_ranges.iter().zip(tokens_indexes.iter()) {
            let slot_tags = positive_tagging(tagging_scheme, slot_name, indexes.len());
            for (index, tag) in indexes.iter().zip(slot_tags.into_iter()) {
                tags[*index] = tag;
            }
        }
        (tokens, tags)
    }
}
