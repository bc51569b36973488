use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use failure::{format_err, ResultExt};
use itertools::Itertools;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::configurations::ProbabilisticParserConfig;
use crate::dataset::{augment_utterances, Dataset};
use crate::entity_parser::is_builtin_entity;
use crate::errors::*;
use crate::intent_classifier::{build_intent_classifier, IntentClassifier, LogRegIntentClassifier};
use crate::language::Language;
use crate::models::{ModelVersion, ProbabilisticParserModel};
use crate::resources::SharedResources;
use crate::slot_filler::{augment_slots, build_tagger, tags_to_slots, CrfTagger, Tagger};
use crate::slot_utils::{ParseResult, ParsedSlot};
use crate::tokenization::{tokenize, Token};
use crate::utils::{extract_zip_archive, EntityName, IntentName, SlotName};

use super::IntentParser;

const CONFIG_FILENAME: &str = "probabilistic_parser_config.json";
const TAGGERS_DIRECTORY: &str = "taggers";

/// Intent parser relying on an intent classifier and on one sequence tagger
/// per intent, whose missing slots are resolved with builtin entities
pub struct ProbabilisticIntentParser {
    config: ProbabilisticParserConfig,
    shared_resources: Arc<SharedResources>,
    state: Option<ParserState>,
}

struct ParserState {
    language: Language,
    intent_classifier: Box<dyn IntentClassifier>,
    taggers: HashMap<IntentName, Box<dyn Tagger>>,
    slot_name_mappings: HashMap<IntentName, HashMap<SlotName, EntityName>>,
}

impl ProbabilisticIntentParser {
    /// Unfitted parser
    pub fn new(config: ProbabilisticParserConfig, shared_resources: Arc<SharedResources>) -> Self {
        Self {
            config,
            shared_resources,
            state: None,
        }
    }

    pub fn from_parts(
        config: ProbabilisticParserConfig,
        shared_resources: Arc<SharedResources>,
        language: Language,
        intent_classifier: Box<dyn IntentClassifier>,
        taggers: HashMap<IntentName, Box<dyn Tagger>>,
        slot_name_mappings: HashMap<IntentName, HashMap<SlotName, EntityName>>,
    ) -> Self {
        Self {
            config,
            shared_resources,
            state: Some(ParserState {
                language,
                intent_classifier,
                taggers,
                slot_name_mappings,
            }),
        }
    }

    pub fn config(&self) -> &ProbabilisticParserConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&ParserState> {
        self.state
            .as_ref()
            .ok_or_else(|| format_err!("ProbabilisticIntentParser must be fitted or loaded first"))
    }
}

impl ProbabilisticIntentParser {
    /// Trains the intent classifier and one tagger per intent. The previous
    /// state is only replaced when the whole training succeeds.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        dataset.validate()?;
        let language = dataset.language;
        let slot_name_mappings = dataset.slot_name_mappings();
        for intent_name in dataset.intents.keys() {
            validate_intent_name(intent_name)?;
        }

        let classifier_samples: Vec<(IntentName, String)> = dataset
            .intents
            .iter()
            .flat_map(|(intent_name, intent)| {
                dataset
                    .valid_utterances(intent)
                    .map(move |utterance| (intent_name.clone(), utterance.text()))
            })
            .collect();
        info!(
            "Fitting intent classifier on {} utterances",
            classifier_samples.len()
        );
        let intent_classifier = LogRegIntentClassifier::fit(
            self.config.intent_classifier_config.clone(),
            language,
            &classifier_samples,
        )?;

        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        let tagging_scheme = self.config.tagger_config.tagging_scheme;
        let mut taggers: HashMap<IntentName, Box<dyn Tagger>> = HashMap::new();
        for intent_name in dataset.intents.keys() {
            let samples = augment_utterances(
                dataset,
                intent_name,
                &self.config.data_augmentation_config,
                &mut rng,
            )
            .iter()
            .map(|utterance| utterance.to_tagged_sample(tagging_scheme, language))
            .collect_vec();
            info!(
                "Fitting tagger of intent '{}' on {} utterances",
                intent_name,
                samples.len()
            );
            let tagger = CrfTagger::fit(self.config.tagger_config.clone(), language, &samples)?;
            taggers.insert(intent_name.clone(), Box::new(tagger) as _);
        }

        self.state = Some(ParserState {
            language,
            intent_classifier: Box::new(intent_classifier) as _,
            taggers,
            slot_name_mappings,
        });
        Ok(())
    }

    /// Slots of the given intent, `None` when the intent has no tagger
    fn resolve_slots(
        &self,
        state: &ParserState,
        input: &str,
        tokens: &[Token],
        intent: &str,
    ) -> Result<Option<Vec<ParsedSlot>>> {
        let tagger = match state.taggers.get(intent) {
            Some(tagger) => tagger,
            None => return Ok(None),
        };
        let empty_mapping = HashMap::new();
        let mapping = state.slot_name_mappings.get(intent).unwrap_or(&empty_mapping);

        let tags = tagger.get_tags(tokens)?;
        if tags.len() != tokens.len() {
            return Err(format_err!(
                "Tagger of intent '{}' returned {} tags for {} tokens",
                intent,
                tags.len(),
                tokens.len()
            ));
        }
        let mut slots = tags_to_slots(input, tokens, &tags, tagger.get_tagging_scheme(), mapping)?;

        let missing_slots: BTreeSet<SlotName> = mapping
            .keys()
            .filter(|slot_name| !slots.iter().any(|slot| &slot.slot_name == *slot_name))
            .cloned()
            .collect();
        let builtin_entity_kinds: Vec<EntityName> = missing_slots
            .iter()
            .filter_map(|slot_name| mapping.get(slot_name))
            .filter(|entity| is_builtin_entity(entity))
            .unique()
            .cloned()
            .collect();
        if !builtin_entity_kinds.is_empty() {
            let builtin_entities = self
                .shared_resources
                .builtin_entity_parser
                .extract_entities(input, Some(&builtin_entity_kinds[..]))?;
            debug!(
                "{} builtin entities for {} missing slots",
                builtin_entities.len(),
                missing_slots.len()
            );
            let augmented_slots = augment_slots(
                input,
                tokens,
                &tags,
                &**tagger,
                mapping,
                builtin_entities,
                &missing_slots,
                self.config.max_exhaustive_assignments,
            )?;
            slots.extend(augmented_slots);
        }
        slots.sort_by_key(|slot| slot.match_range.start);
        Ok(Some(slots))
    }
}

impl IntentParser for ProbabilisticIntentParser {
    fn parse(&self, input: &str) -> Result<Option<ParseResult>> {
        let state = self.state()?;
        let tokens = tokenize(input, state.language);
        if tokens.is_empty() {
            return Ok(None);
        }
        let intent = match state.intent_classifier.get_intent(input)? {
            Some(intent) => intent,
            None => {
                debug!("No intent found for '{}'", input);
                return Ok(None);
            }
        };
        let slots = match self.resolve_slots(state, input, &tokens, &intent)? {
            Some(slots) => slots,
            None => {
                debug!("No tagger registered for intent '{}'", intent);
                return Ok(None);
            }
        };
        Ok(Some(ParseResult {
            input: input.to_string(),
            intent,
            slots,
        }))
    }

    fn get_intent(&self, input: &str) -> Result<Option<IntentName>> {
        let state = self.state()?;
        if tokenize(input, state.language).is_empty() {
            return Ok(None);
        }
        state.intent_classifier.get_intent(input)
    }

    fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<ParsedSlot>> {
        let state = self.state()?;
        if !state.taggers.contains_key(intent) {
            return Err(NluError::UnknownIntent(intent.to_string()).into());
        }
        let tokens = tokenize(input, state.language);
        if tokens.is_empty() {
            return Ok(vec![]);
        }
        Ok(self
            .resolve_slots(state, input, &tokens, intent)?
            .unwrap_or_default())
    }
}

impl ProbabilisticIntentParser {
    /// Writes the configuration document and one tagger directory per intent
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let state = self.state()?;
        for intent_name in state.taggers.keys() {
            validate_intent_name(intent_name)?;
        }
        fs::create_dir_all(path)
            .with_context(|_| format!("Cannot create parser directory '{:?}'", path))?;

        let model = ProbabilisticParserModel {
            model_version: crate::MODEL_VERSION.to_string(),
            language_code: state.language.code().to_string(),
            config: self.config.clone(),
            intent_classifier: state.intent_classifier.to_json()?,
            slot_name_mappings: state.slot_name_mappings.clone(),
        };
        let config_path = path.join(CONFIG_FILENAME);
        let config_file = fs::File::create(&config_path)
            .with_context(|_| format!("Cannot create parser config file '{:?}'", config_path))?;
        serde_json::to_writer_pretty(config_file, &model)
            .with_context(|_| "Cannot serialize ProbabilisticIntentParser")?;

        let taggers_path = path.join(TAGGERS_DIRECTORY);
        if taggers_path.exists() {
            fs::remove_dir_all(&taggers_path)?;
        }
        for (intent_name, tagger) in state.taggers.iter() {
            tagger.persist(&taggers_path.join(intent_name))?;
        }
        info!("ProbabilisticIntentParser persisted in '{:?}'", path);
        Ok(())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let model = Self::load_model(path)?;
        let language = Language::from_str(&model.language_code)
            .map_err(|e| corrupt_store(path, e))?;
        Self::load(path, model, SharedResources::for_language(language))
    }

    pub fn from_path_with_shared_resources<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let model = Self::load_model(path)?;
        Self::load(path, model, shared_resources)
    }

    /// Loads a parser directory packed in a zip archive
    pub fn from_zip<R: io::Read + io::Seek>(reader: R) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("temp_dir_parser_")
            .tempdir()?;
        let parser_dir_path = extract_zip_archive(reader, temp_dir.path())?;
        Self::from_path(parser_dir_path)
    }

    fn load_model(path: &Path) -> Result<ProbabilisticParserModel> {
        let config_path = path.join(CONFIG_FILENAME);
        let content = fs::read_to_string(&config_path).map_err(|e| corrupt_store(path, e))?;
        let model_version: ModelVersion =
            serde_json::from_str(&content).map_err(|e| corrupt_store(path, e))?;
        if model_version.model_version != crate::MODEL_VERSION {
            return Err(NluError::WrongModelVersion {
                model: model_version.model_version,
                runner: crate::MODEL_VERSION,
            }
            .into());
        }
        serde_json::from_str(&content).map_err(|e| corrupt_store(path, e))
    }

    fn load(
        path: &Path,
        model: ProbabilisticParserModel,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let language =
            Language::from_str(&model.language_code).map_err(|e| corrupt_store(path, e))?;
        let intent_classifier = build_intent_classifier(&model.intent_classifier)
            .map_err(|e| corrupt_store(path, error_chain(&e)))?;

        let taggers_path = path.join(TAGGERS_DIRECTORY);
        let mut taggers: HashMap<IntentName, Box<dyn Tagger>> = HashMap::new();
        if taggers_path.is_dir() {
            let entries = fs::read_dir(&taggers_path)
                .map_err(|e| corrupt_store(path, e))?
                .collect::<io::Result<Vec<fs::DirEntry>>>()
                .map_err(|e| corrupt_store(path, e))?;
            for entry in entries.into_iter().sorted_by_key(|entry| entry.file_name()) {
                if !entry.path().is_dir() {
                    continue;
                }
                let intent_name = entry.file_name().into_string().map_err(|name| {
                    corrupt_store(path, format!("Invalid tagger directory name {:?}", name))
                })?;
                let tagger = build_tagger(entry.path()).map_err(|e| {
                    corrupt_store(
                        path,
                        format!("Tagger of intent '{}': {}", intent_name, error_chain(&e)),
                    )
                })?;
                taggers.insert(intent_name, tagger);
            }
        }
        if let Some(intent_name) = model
            .slot_name_mappings
            .keys()
            .find(|intent_name| !taggers.contains_key(*intent_name))
        {
            return Err(corrupt_store(
                path,
                format!("Missing tagger of intent '{}'", intent_name),
            ));
        }
        info!(
            "ProbabilisticIntentParser loaded with {} taggers",
            taggers.len()
        );

        Ok(Self::from_parts(
            model.config,
            shared_resources,
            language,
            intent_classifier,
            taggers,
            model.slot_name_mappings,
        ))
    }
}

/// Intent names are used as directory names in persisted parsers
pub fn validate_intent_name(intent_name: &str) -> Result<()> {
    let is_invalid = intent_name.is_empty()
        || intent_name == "."
        || intent_name == ".."
        || intent_name.contains(|c| c == '/' || c == '\\' || c == '\0');
    if is_invalid {
        Err(NluError::InvalidIntentName(intent_name.to_string()).into())
    } else {
        Ok(())
    }
}

fn error_chain(error: &failure::Error) -> String {
    error.iter_chain().map(|cause| cause.to_string()).join(": ")
}

fn corrupt_store<E: Display>(path: &Path, reason: E) -> failure::Error {
    NluError::CorruptStore {
        path: path.to_string_lossy().into_owned(),
        reason: reason.to_string(),
    }
    .into()
}
