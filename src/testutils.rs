use std::collections::HashMap;
use std::iter::FromIterator;
use std::path::Path;
use std::sync::Arc;

use failure::format_err;
use lazy_static::lazy_static;
use ndarray::prelude::*;
use regex::Regex;

use crate::dataset::{Chunk, Dataset, Utterance};
use crate::entity_parser::{BuiltinEntity, BuiltinEntityParser};
use crate::errors::*;
use crate::intent_classifier::IntentClassifier;
use crate::language::Language;
use crate::resources::SharedResources;
use crate::slot_filler::{Tag, Tagger, TaggingScheme};
use crate::tokenization::Token;
use crate::utils::{EntityName, IntentName};

pub fn assert_epsilon_eq_array1(a: &Array1<f32>, b: &Array1<f32>, epsilon: f32) {
    assert_eq!(a.dim(), b.dim());
    for (index, elem_a) in a.indexed_iter() {
        assert!(epsilon_eq(*elem_a, b[index], epsilon))
    }
}

pub fn epsilon_eq(a: f32, b: f32, epsilon: f32) -> bool {
    let diff = a - b;
    diff < epsilon && diff > -epsilon
}

pub struct SharedResourcesBuilder {
    builtin_entity_parser: Arc<dyn BuiltinEntityParser>,
}

impl Default for SharedResourcesBuilder {
    fn default() -> Self {
        Self {
            builtin_entity_parser: Arc::<MockedBuiltinEntityParser>::default(),
        }
    }
}

impl SharedResourcesBuilder {
    pub fn builtin_entity_parser<P: BuiltinEntityParser + 'static>(mut self, parser: P) -> Self {
        self.builtin_entity_parser = Arc::new(parser) as _;
        self
    }

    pub fn build(self) -> SharedResources {
        SharedResources {
            builtin_entity_parser: self.builtin_entity_parser,
        }
    }
}

#[derive(Default)]
pub struct MockedBuiltinEntityParser {
    pub mocked_outputs: HashMap<String, Vec<BuiltinEntity>>,
}

impl BuiltinEntityParser for MockedBuiltinEntityParser {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[EntityName]>,
    ) -> Result<Vec<BuiltinEntity>> {
        Ok(self
            .mocked_outputs
            .get(sentence)
            .cloned()
            .unwrap_or_else(|| vec![])
            .into_iter()
            .filter(|entity| {
                filter_entity_kinds
                    .map(|kinds| kinds.contains(&entity.entity_kind))
                    .unwrap_or(true)
            })
            .collect())
    }
}

impl FromIterator<(String, Vec<BuiltinEntity>)> for MockedBuiltinEntityParser {
    fn from_iter<T: IntoIterator<Item = (String, Vec<BuiltinEntity>)>>(iter: T) -> Self {
        Self {
            mocked_outputs: HashMap::from_iter(iter),
        }
    }
}

type ScoringFn = Box<dyn Fn(&[Tag]) -> Result<f64> + Send + Sync>;

pub struct MockedTagger {
    tagging_scheme: TaggingScheme,
    tags: Vec<Tag>,
    scoring: ScoringFn,
}

impl MockedTagger {
    pub fn new<F>(tagging_scheme: TaggingScheme, scoring: F) -> Self
    where
        F: Fn(&[Tag]) -> Result<f64> + Send + Sync + 'static,
    {
        Self {
            tagging_scheme,
            tags: vec![],
            scoring: Box::new(scoring),
        }
    }

    /// Tags returned for inputs having exactly as many tokens
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }
}

impl Tagger for MockedTagger {
    fn get_tagging_scheme(&self) -> TaggingScheme {
        self.tagging_scheme
    }

    fn get_tags(&self, tokens: &[Token]) -> Result<Vec<Tag>> {
        if tokens.len() == self.tags.len() {
            Ok(self.tags.clone())
        } else {
            Ok(vec![Tag::Outside; tokens.len()])
        }
    }

    fn get_sequence_probability(&self, tokens: &[Token], tags: &[Tag]) -> Result<f64> {
        assert_eq!(tokens.len(), tags.len());
        (self.scoring)(tags)
    }

    fn persist(&self, _path: &Path) -> Result<()> {
        Err(format_err!("MockedTagger cannot be persisted"))
    }
}

pub struct MockedIntentClassifier {
    pub intent: Option<IntentName>,
}

impl IntentClassifier for MockedIntentClassifier {
    fn get_intent(&self, _input: &str) -> Result<Option<IntentName>> {
        Ok(self.intent.clone())
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Err(format_err!("MockedIntentClassifier cannot be serialized"))
    }
}

/// Builds a BIO tagged sample from an utterance annotated like
/// "make me [number_of_cups:2] cups"
pub fn tagged_sample(annotated: &str) -> (Vec<Token>, Vec<Tag>) {
    annotated_utterance(annotated).to_tagged_sample(TaggingScheme::BIO, Language::EN)
}

pub fn annotated_utterance(annotated: &str) -> Utterance {
    lazy_static! {
        static ref SLOT_REGEX: Regex = Regex::new(r"\[(\w+):([^\]]+)\]").unwrap();
    }
    let mut data = vec![];
    let mut last_end = 0;
    for captures in SLOT_REGEX.captures_iter(annotated) {
        let whole = captures.get(0).unwrap();
        if whole.start() > last_end {
            data.push(Chunk {
                text: annotated[last_end..whole.start()].to_string(),
                entity: None,
                slot_name: None,
            });
        }
        data.push(Chunk {
            text: captures[2].to_string(),
            entity: Some("slot_entity".to_string()),
            slot_name: Some(captures[1].to_string()),
        });
        last_end = whole.end();
    }
    if last_end < annotated.len() {
        data.push(Chunk {
            text: annotated[last_end..].to_string(),
            entity: None,
            slot_name: None,
        });
    }
    Utterance { data }
}

pub const BEVERAGE_DATASET: &str = r#"{
  "language": "en",
  "intents": {
    "MakeCoffee": {
      "utterances": [
        {"data": [
          {"text": "make me "},
          {"text": "2", "entity": "snips/number", "slot_name": "number_of_cups"},
          {"text": " cups of coffee"}
        ]},
        {"data": [
          {"text": "i want "},
          {"text": "one", "entity": "snips/number", "slot_name": "number_of_cups"},
          {"text": " coffee please"}
        ]},
        {"data": [{"text": "brew some coffee"}]},
        {"data": [
          {"text": "give me "},
          {"text": "three", "entity": "snips/number", "slot_name": "number_of_cups"},
          {"text": " coffees"}
        ]}
      ]
    },
    "MakeTea": {
      "utterances": [
        {"data": [
          {"text": "make me "},
          {"text": "5", "entity": "snips/number", "slot_name": "number_of_cups"},
          {"text": " cups of "},
          {"text": "hot", "entity": "Temperature", "slot_name": "beverage_temperature"},
          {"text": " tea"}
        ]},
        {"data": [
          {"text": "i want a "},
          {"text": "cold", "entity": "Temperature", "slot_name": "beverage_temperature"},
          {"text": " tea"}
        ]},
        {"data": [
          {"text": "prepare "},
          {"text": "two", "entity": "snips/number", "slot_name": "number_of_cups"},
          {"text": " teas"}
        ]},
        {"data": [{"text": "a cup of tea please"}]}
      ]
    }
  },
  "entities": {
    "Temperature": {
      "data": [
        {"value": "hot", "synonyms": ["warm"]},
        {"value": "cold", "synonyms": ["iced"]}
      ],
      "use_synonyms": true,
      "automatically_extensible": true
    },
    "snips/number": {}
  }
}"#;

pub fn beverage_dataset() -> Dataset {
    serde_json::from_str(BEVERAGE_DATASET).unwrap()
}
