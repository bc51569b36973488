use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use failure::format_err;
use ndarray::prelude::*;

use crate::errors::*;
use crate::language::Language;
use crate::models::FeaturizerModel;
use crate::tokenization::tokenize_light;

/// TF-IDF vectorizer over normalized tokens
pub struct Featurizer {
    language: Language,
    sublinear_tf: bool,
    vocabulary: BTreeMap<String, usize>,
    idf_diag: Vec<f32>,
}

impl Featurizer {
    pub fn fit(utterances: &[&str], language: Language, sublinear_tf: bool) -> Self {
        let documents: Vec<HashSet<String>> = utterances
            .iter()
            .map(|u| tokenize_light(u, language).into_iter().collect())
            .collect();
        let vocabulary: BTreeMap<String, usize> = documents
            .iter()
            .flat_map(|tokens| tokens.iter().cloned())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .enumerate()
            .map(|(index, token)| (token, index))
            .collect();

        let nb_documents = documents.len() as f32;
        let mut document_frequencies = vec![0.0_f32; vocabulary.len()];
        for tokens in documents.iter() {
            for token in tokens {
                document_frequencies[vocabulary[token]] += 1.0;
            }
        }
        // Smoothed idf, as if an extra document contained every token once
        let idf_diag = document_frequencies
            .into_iter()
            .map(|df| ((1.0 + nb_documents) / (1.0 + df)).ln() + 1.0)
            .collect();

        Self {
            language,
            sublinear_tf,
            vocabulary,
            idf_diag,
        }
    }

    /// Vocabulary indexes must be a permutation of `0..vocab.len()`, with one
    /// idf value per index
    pub fn from_model(model: FeaturizerModel, language: Language) -> Result<Self> {
        let nb_features = model.vocab.len();
        if model.idf_diag.len() != nb_features {
            return Err(format_err!(
                "Found {} idf values for a vocabulary of {} tokens",
                model.idf_diag.len(),
                nb_features
            ));
        }
        let indexes: BTreeSet<usize> = model.vocab.values().cloned().collect();
        if indexes.len() != nb_features || indexes.iter().any(|i| *i >= nb_features) {
            return Err(format_err!("Invalid featurizer vocabulary indexes"));
        }
        Ok(Self {
            language,
            sublinear_tf: model.sublinear_tf,
            vocabulary: model.vocab,
            idf_diag: model.idf_diag,
        })
    }

    pub fn to_model(&self) -> FeaturizerModel {
        FeaturizerModel {
            sublinear_tf: self.sublinear_tf,
            vocab: self.vocabulary.clone(),
            idf_diag: self.idf_diag.clone(),
        }
    }

    pub fn nb_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// L2-normalized tf-idf vector, all zeros when no token is known
    pub fn transform(&self, input: &str) -> Array1<f32> {
        let mut term_frequencies: HashMap<usize, f32> = HashMap::new();
        for token in tokenize_light(input, self.language) {
            if let Some(index) = self.vocabulary.get(&token) {
                *term_frequencies.entry(*index).or_insert(0.0) += 1.0;
            }
        }
        let mut features = Array1::<f32>::zeros(self.vocabulary.len());
        for (index, tf) in term_frequencies {
            let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
            features[index] = tf * self.idf_diag[index];
        }
        let norm = features.dot(&features).sqrt();
        if norm > 0.0 {
            features /= norm;
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn featurizer_learns_vocabulary_and_idf() {
        // Given
        let utterances = vec!["make me a coffee", "make me a tea"];

        // When
        let featurizer = Featurizer::fit(&utterances, Language::EN, false);

        // Then
        let model = featurizer.to_model();
        let vocabulary: Vec<&str> = model.vocab.keys().map(|k| &**k).collect();
        assert_eq!(vec!["a", "coffee", "make", "me", "tea"], vocabulary);
        assert!(model.idf_diag[model.vocab["coffee"]] > model.idf_diag[model.vocab["make"]]);
    }

    #[test]
    fn transform_is_normalized() {
        // Given
        let featurizer =
            Featurizer::fit(&["make me a coffee", "make me a tea"], Language::EN, true);

        // When
        let features = featurizer.transform("Coffee coffee please");

        // Then
        assert_eq!(5, features.dim());
        assert!((features.dot(&features) - 1.0).abs() < 1e-6);
        assert!(features[1] > 0.99);
    }

    #[test]
    fn from_model_rejects_inconsistent_dimensions() {
        // Given
        let model = Featurizer::fit(&["make me a coffee"], Language::EN, false).to_model();
        let mut out_of_range_index = model.clone();
        out_of_range_index.vocab.insert("coffee".to_string(), 999);
        let mut duplicated_index = model.clone();
        duplicated_index.vocab.insert("coffee".to_string(), 0);
        let mut missing_idf = model.clone();
        missing_idf.idf_diag.pop();

        // When
        let valid_result = Featurizer::from_model(model, Language::EN);
        let out_of_range_result = Featurizer::from_model(out_of_range_index, Language::EN);
        let duplicated_result = Featurizer::from_model(duplicated_index, Language::EN);
        let missing_idf_result = Featurizer::from_model(missing_idf, Language::EN);

        // Then
        assert!(valid_result.is_ok());
        assert!(out_of_range_result.is_err());
        assert!(duplicated_result.is_err());
        assert!(missing_idf_result.is_err());
    }

    #[test]
    fn transform_unknown_tokens_gives_zeros() {
        let featurizer = Featurizer::fit(&["make me a coffee"], Language::EN, false);
        let features = featurizer.transform("hello world");
        assert!(features.iter().all(|f| *f == 0.0));
    }
}
