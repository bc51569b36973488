use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::configurations::DataAugmentationConfig;
use crate::dataset::{Chunk, Dataset, Utterance};
use crate::entity_parser::is_builtin_entity;
use crate::tokenization::tokenize_light;

/// Training utterances of an intent, augmented up to `max_utterances`.
///
/// The valid utterances of the intent come first, followed by shuffled copies
/// whose custom entity values are resampled. Noise chunks made of words from
/// the other intents are then inserted with probability `noise_prob`.
pub fn augment_utterances(
    dataset: &Dataset,
    intent_name: &str,
    config: &DataAugmentationConfig,
    rng: &mut StdRng,
) -> Vec<Utterance> {
    let utterances: Vec<&Utterance> = match dataset.intents.get(intent_name) {
        Some(intent) => dataset.valid_utterances(intent).collect(),
        None => return vec![],
    };
    if utterances.is_empty() {
        return vec![];
    }

    let mut augmented: Vec<Utterance> = utterances.iter().map(|u| (*u).clone()).collect();
    while augmented.len() < config.max_utterances() {
        let mut shuffled = utterances.clone();
        shuffled.shuffle(rng);
        for utterance in shuffled {
            if augmented.len() >= config.max_utterances() {
                break;
            }
            augmented.push(resample_entities(dataset, utterance, rng));
        }
    }

    if config.noise_prob() > 0.0 && config.max_noise_size() > 0 {
        let noise = noise_vocabulary(dataset, intent_name);
        if !noise.is_empty() {
            for utterance in augmented.iter_mut() {
                if rng.gen_bool(f64::from(config.noise_prob())) {
                    add_noise(utterance, &noise, config, rng);
                }
            }
        }
    }
    augmented
}

fn resample_entities(dataset: &Dataset, utterance: &Utterance, rng: &mut StdRng) -> Utterance {
    let data = utterance
        .data
        .iter()
        .map(|chunk| {
            let entity = match (&chunk.slot_name, &chunk.entity) {
                (Some(_), Some(entity)) if !is_builtin_entity(entity) => {
                    dataset.entities.get(entity)
                }
                _ => None,
            };
            let values: Vec<&String> = entity
                .map(|entity| {
                    entity
                        .data
                        .iter()
                        .flat_map(|value| {
                            let synonyms: Vec<&String> = if entity.use_synonyms {
                                value.synonyms.iter().collect()
                            } else {
                                vec![]
                            };
                            ::std::iter::once(&value.value).chain(synonyms)
                        })
                        .filter(|value| !value.trim().is_empty())
                        .collect()
                })
                .unwrap_or_default();
            match values.choose(rng) {
                Some(value) => Chunk {
                    text: (*value).clone(),
                    entity: chunk.entity.clone(),
                    slot_name: chunk.slot_name.clone(),
                },
                None => chunk.clone(),
            }
        })
        .collect();
    Utterance { data }
}

/// Words of the utterances of the other intents, in lexical order
fn noise_vocabulary(dataset: &Dataset, intent_name: &str) -> Vec<String> {
    dataset
        .intents
        .iter()
        .filter(|(name, _)| *name != intent_name)
        .flat_map(|(_, intent)| intent.utterances.iter())
        .flat_map(|utterance| tokenize_light(&utterance.text(), dataset.language))
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn add_noise(
    utterance: &mut Utterance,
    noise: &[String],
    config: &DataAugmentationConfig,
    rng: &mut StdRng,
) {
    let size = rng.gen_range(config.min_noise_size()..=config.max_noise_size());
    if size == 0 {
        return;
    }
    let words: Vec<&str> = (0..size)
        .filter_map(|_| noise.choose(rng).map(|w| &**w))
        .collect();
    let position = rng.gen_range(0..=utterance.data.len());
    utterance.data.insert(
        position,
        Chunk {
            text: format!(" {} ", words.join(" ")),
            entity: None,
            slot_name: None,
        },
    );
}
