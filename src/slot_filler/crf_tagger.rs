use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use failure::{bail, ResultExt};
use itertools::Itertools;
use log::debug;

use crate::configurations::CrfTaggerConfig;
use crate::errors::*;
use crate::language::Language;
use crate::models::{CrfTaggerModel, ProcessingUnitMetadata};
use crate::slot_filler::crf_utils::*;
use crate::slot_filler::feature_processor::ProbabilisticFeatureProcessor;
use crate::slot_filler::Tagger;
use crate::tokenization::Token;

const TAGGER_MODEL_FILENAME: &str = "tagger.json";
const METADATA_FILENAME: &str = "metadata.json";

/// Linear-chain tagger scoring tag sequences with emission, transition and
/// initial weights
pub struct CrfTagger {
    language: Language,
    config: CrfTaggerConfig,
    feature_processor: ProbabilisticFeatureProcessor,
    labels: Vec<Tag>,
    initial_weights: Vec<f64>,
    transition_weights: Vec<Vec<f64>>,
    emission_weights: BTreeMap<String, Vec<f64>>,
}

impl CrfTagger {
    pub fn fit(
        config: CrfTaggerConfig,
        language: Language,
        samples: &[(Vec<Token>, Vec<Tag>)],
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(NluError::TrainingError(
                "Cannot fit a tagger without samples".to_string(),
            )
            .into());
        }
        let feature_processor =
            ProbabilisticFeatureProcessor::new(&config.feature_factory_configs)?;
        let labels = collect_labels(samples);
        let label_indexes: HashMap<&Tag, usize> =
            labels.iter().enumerate().map(|(i, l)| (l, i)).collect();

        let mut feature_rows: HashMap<String, usize> = HashMap::new();
        let encoded_samples = samples
            .iter()
            .filter(|(tokens, _)| !tokens.is_empty())
            .map(|(tokens, tags)| {
                if tokens.len() != tags.len() {
                    return Err(NluError::TrainingError(format!(
                        "Found {} tags for {} tokens",
                        tags.len(),
                        tokens.len()
                    ))
                    .into());
                }
                let features = feature_processor
                    .compute_features(tokens)
                    .into_iter()
                    .map(|token_features| {
                        token_features
                            .into_iter()
                            .map(|(name, value)| {
                                let nb_rows = feature_rows.len();
                                *feature_rows
                                    .entry(feature_key(&name, &value))
                                    .or_insert(nb_rows)
                            })
                            .collect_vec()
                    })
                    .collect_vec();
                let gold = tags.iter().map(|t| label_indexes[t]).collect_vec();
                Ok((features, gold))
            })
            .collect::<Result<Vec<_>>>()?;

        let nb_labels = labels.len();
        let mut perceptron = AveragedPerceptron::new(feature_rows.len(), nb_labels);
        for epoch in 0..config.nb_epochs {
            let mut nb_errors = 0;
            for (features, gold) in encoded_samples.iter() {
                perceptron.tick();
                let emissions = perceptron.emissions(features);
                let (initial, transitions) = perceptron.chain_weights();
                let predicted = viterbi(&emissions, &initial, &transitions);
                if predicted != *gold {
                    nb_errors += 1;
                    perceptron.update(features, gold, &predicted);
                }
            }
            debug!("Tagger epoch {}: {} errors", epoch, nb_errors);
        }

        let (initial_weights, transition_weights, emission_rows) = perceptron.averaged();
        let emission_weights = feature_rows
            .into_iter()
            .map(|(key, row)| (key, emission_rows[row].clone()))
            .filter(|(_, weights)| weights.iter().any(|w| *w != 0.0))
            .collect();

        Ok(Self {
            language,
            config,
            feature_processor,
            labels,
            initial_weights,
            transition_weights,
            emission_weights,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let tagger_model_path = path.as_ref().join(TAGGER_MODEL_FILENAME);
        let model_file = File::open(&tagger_model_path).with_context(|_| {
            format!("Cannot open CrfTagger file '{:?}'", &tagger_model_path)
        })?;
        let model: CrfTaggerModel = serde_json::from_reader(model_file)
            .with_context(|_| "Cannot deserialize CrfTagger json data")?;
        Self::from_model(model)
    }

    fn from_model(model: CrfTaggerModel) -> Result<Self> {
        let nb_labels = model.labels.len();
        if nb_labels == 0
            || model.initial_weights.len() != nb_labels
            || model.transition_weights.len() != nb_labels
            || model.transition_weights.iter().any(|w| w.len() != nb_labels)
            || model.emission_weights.values().any(|w| w.len() != nb_labels)
        {
            bail!("Inconsistent CrfTagger weights dimensions")
        }
        let language = Language::from_str(&model.language_code)?;
        let feature_processor =
            ProbabilisticFeatureProcessor::new(&model.config.feature_factory_configs)?;
        Ok(Self {
            language,
            config: model.config,
            feature_processor,
            labels: model.labels,
            initial_weights: model.initial_weights,
            transition_weights: model.transition_weights,
            emission_weights: model.emission_weights,
        })
    }

    pub fn labels(&self) -> &[Tag] {
        &self.labels
    }

    fn compute_emissions(&self, tokens: &[Token]) -> Vec<Vec<f64>> {
        let nb_labels = self.labels.len();
        self.feature_processor
            .compute_features(tokens)
            .into_iter()
            .map(|token_features| {
                let mut scores = vec![0.0; nb_labels];
                for (name, value) in token_features {
                    if let Some(weights) = self.emission_weights.get(&feature_key(&name, &value)) {
                        for (score, weight) in scores.iter_mut().zip(weights.iter()) {
                            *score += weight;
                        }
                    }
                }
                scores
            })
            .collect()
    }

    fn label_index(&self, tag: &Tag) -> usize {
        self.labels
            .iter()
            .position(|label| label == tag)
            .or_else(|| {
                get_substitution_label(&self.labels)
                    .and_then(|substitute| self.labels.iter().position(|l| l == substitute))
            })
            .unwrap_or(0)
    }
}

impl Tagger for CrfTagger {
    fn get_tagging_scheme(&self) -> TaggingScheme {
        self.config.tagging_scheme
    }

    fn get_tags(&self, tokens: &[Token]) -> Result<Vec<Tag>> {
        if tokens.is_empty() {
            return Ok(vec![]);
        }
        let emissions = self.compute_emissions(tokens);
        Ok(
            viterbi(&emissions, &self.initial_weights, &self.transition_weights)
                .into_iter()
                .map(|label| self.labels[label].clone())
                .collect(),
        )
    }

    fn get_sequence_probability(&self, tokens: &[Token], tags: &[Tag]) -> Result<f64> {
        assert_eq!(
            tokens.len(),
            tags.len(),
            "Tags and tokens must have the same length"
        );
        if tokens.is_empty() {
            return Ok(1.0);
        }
        // Tags which were not seen during training are substituted
        let labels = tags.iter().map(|t| self.label_index(t)).collect_vec();
        let emissions = self.compute_emissions(tokens);
        let score = sequence_score(
            &emissions,
            &self.initial_weights,
            &self.transition_weights,
            &labels,
        );
        let log_partition =
            log_partition(&emissions, &self.initial_weights, &self.transition_weights);
        Ok((score - log_partition).exp().min(1.0))
    }

    fn persist(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|_| format!("Cannot create tagger directory '{:?}'", path))?;
        let metadata_path = path.join(METADATA_FILENAME);
        let metadata_file = File::create(&metadata_path).with_context(|_| {
            format!("Cannot create tagger metadata file '{:?}'", metadata_path)
        })?;
        serde_json::to_writer(metadata_file, &ProcessingUnitMetadata::CrfTagger)?;
        let model = CrfTaggerModel {
            language_code: self.language.code().to_string(),
            config: self.config.clone(),
            labels: self.labels.clone(),
            initial_weights: self.initial_weights.clone(),
            transition_weights: self.transition_weights.clone(),
            emission_weights: self.emission_weights.clone(),
        };
        let model_path = path.join(TAGGER_MODEL_FILENAME);
        let model_file = File::create(&model_path)
            .with_context(|_| format!("Cannot create CrfTagger file '{:?}'", model_path))?;
        serde_json::to_writer(model_file, &model)
            .with_context(|_| "Cannot serialize CrfTagger")?;
        Ok(())
    }
}

fn feature_key(name: &str, value: &str) -> String {
    format!("{}={}", name, value)
}

/// Outside label first, then slot labels in lexical order
fn collect_labels(samples: &[(Vec<Token>, Vec<Tag>)]) -> Vec<Tag> {
    let mut labels = vec![Tag::Outside];
    labels.extend(
        samples
            .iter()
            .flat_map(|(_, tags)| tags.iter())
            .filter(|tag| !tag.is_outside())
            .unique()
            .sorted_by_key(|tag| tag.to_string())
            .cloned(),
    );
    labels
}

fn viterbi(emissions: &[Vec<f64>], initial: &[f64], transitions: &[Vec<f64>]) -> Vec<usize> {
    if emissions.is_empty() {
        return vec![];
    }
    let nb_labels = initial.len();
    let mut scores: Vec<f64> = (0..nb_labels)
        .map(|l| initial[l] + emissions[0][l])
        .collect();
    let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(emissions.len());
    for token_emissions in emissions.iter().skip(1) {
        let mut new_scores = vec![0.0; nb_labels];
        let mut pointers = vec![0; nb_labels];
        for label in 0..nb_labels {
            let mut best = (0, ::std::f64::NEG_INFINITY);
            for previous in 0..nb_labels {
                let score = scores[previous] + transitions[previous][label];
                if score > best.1 {
                    best = (previous, score);
                }
            }
            new_scores[label] = best.1 + token_emissions[label];
            pointers[label] = best.0;
        }
        scores = new_scores;
        backpointers.push(pointers);
    }
    let mut best_last = 0;
    for label in 1..nb_labels {
        if scores[label] > scores[best_last] {
            best_last = label;
        }
    }
    let mut path = vec![best_last];
    for pointers in backpointers.iter().rev() {
        let previous = pointers[path[path.len() - 1]];
        path.push(previous);
    }
    path.reverse();
    path
}

fn sequence_score(
    emissions: &[Vec<f64>],
    initial: &[f64],
    transitions: &[Vec<f64>],
    labels: &[usize],
) -> f64 {
    let mut score = initial[labels[0]];
    for (t, label) in labels.iter().enumerate() {
        score += emissions[t][*label];
        if t > 0 {
            score += transitions[labels[t - 1]][*label];
        }
    }
    score
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values
        .iter()
        .cloned()
        .fold(::std::f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

fn log_partition(emissions: &[Vec<f64>], initial: &[f64], transitions: &[Vec<f64>]) -> f64 {
    let nb_labels = initial.len();
    let mut alphas: Vec<f64> = (0..nb_labels)
        .map(|l| initial[l] + emissions[0][l])
        .collect();
    for token_emissions in emissions.iter().skip(1) {
        alphas = (0..nb_labels)
            .map(|label| {
                let incoming = (0..nb_labels)
                    .map(|previous| alphas[previous] + transitions[previous][label])
                    .collect_vec();
                log_sum_exp(&incoming) + token_emissions[label]
            })
            .collect();
    }
    log_sum_exp(&alphas)
}

/// Perceptron weights averaged over all training steps, with lazy updates
struct AveragedPerceptron {
    nb_labels: usize,
    nb_rows: usize,
    weights: Vec<f64>,
    totals: Vec<f64>,
    timestamps: Vec<usize>,
    step: usize,
}

impl AveragedPerceptron {
    fn new(nb_rows: usize, nb_labels: usize) -> Self {
        let size = nb_rows * nb_labels + nb_labels * nb_labels + nb_labels;
        Self {
            nb_labels,
            nb_rows,
            weights: vec![0.0; size],
            totals: vec![0.0; size],
            timestamps: vec![0; size],
            step: 0,
        }
    }

    fn tick(&mut self) {
        self.step += 1;
    }

    fn emission_index(&self, row: usize, label: usize) -> usize {
        row * self.nb_labels + label
    }

    fn transition_index(&self, previous: usize, label: usize) -> usize {
        self.nb_rows * self.nb_labels + previous * self.nb_labels + label
    }

    fn initial_index(&self, label: usize) -> usize {
        self.nb_rows * self.nb_labels + self.nb_labels * self.nb_labels + label
    }

    fn emissions(&self, features: &[Vec<usize>]) -> Vec<Vec<f64>> {
        features
            .iter()
            .map(|rows| {
                (0..self.nb_labels)
                    .map(|label| {
                        rows.iter()
                            .map(|row| self.weights[self.emission_index(*row, label)])
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }

    fn chain_weights(&self) -> (Vec<f64>, Vec<Vec<f64>>) {
        let initial = (0..self.nb_labels)
            .map(|label| self.weights[self.initial_index(label)])
            .collect();
        let transitions = (0..self.nb_labels)
            .map(|previous| {
                (0..self.nb_labels)
                    .map(|label| self.weights[self.transition_index(previous, label)])
                    .collect()
            })
            .collect();
        (initial, transitions)
    }

    fn add(&mut self, index: usize, delta: f64) {
        self.totals[index] += (self.step - self.timestamps[index]) as f64 * self.weights[index];
        self.timestamps[index] = self.step;
        self.weights[index] += delta;
    }

    fn update(&mut self, features: &[Vec<usize>], gold: &[usize], predicted: &[usize]) {
        for t in 0..gold.len() {
            if gold[t] != predicted[t] {
                for row in features[t].iter() {
                    self.add(self.emission_index(*row, gold[t]), 1.0);
                    self.add(self.emission_index(*row, predicted[t]), -1.0);
                }
            }
            if t == 0 {
                if gold[0] != predicted[0] {
                    self.add(self.initial_index(gold[0]), 1.0);
                    self.add(self.initial_index(predicted[0]), -1.0);
                }
            } else if (gold[t - 1], gold[t]) != (predicted[t - 1], predicted[t]) {
                self.add(self.transition_index(gold[t - 1], gold[t]), 1.0);
                self.add(self.transition_index(predicted[t - 1], predicted[t]), -1.0);
            }
        }
    }

    fn averaged(mut self) -> (Vec<f64>, Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let step = self.step.max(1);
        for index in 0..self.weights.len() {
            self.totals[index] += (step - self.timestamps[index]) as f64 * self.weights[index];
            self.timestamps[index] = step;
            self.weights[index] = self.totals[index] / step as f64;
        }
        let (initial, transitions) = self.chain_weights();
        let emissions = (0..self.nb_rows)
            .map(|row| {
                (0..self.nb_labels)
                    .map(|label| self.weights[self.emission_index(row, label)])
                    .collect()
            })
            .collect();
        (initial, transitions, emissions)
    }
}
