use std::collections::BTreeSet;
use std::str::FromStr;

use failure::{format_err, ResultExt};
use itertools::Itertools;
use log::debug;
use ndarray::prelude::*;

use crate::configurations::LogRegConfig;
use crate::errors::*;
use crate::intent_classifier::featurizer::Featurizer;
use crate::intent_classifier::logreg::MulticlassLogisticRegression;
use crate::intent_classifier::IntentClassifier;
use crate::language::Language;
use crate::models::{IntentClassifierModel, ProcessingUnitMetadata};
use crate::tokenization::tokenize_light;
use crate::utils::IntentName;

pub struct LogRegIntentClassifier {
    language: Language,
    config: LogRegConfig,
    intent_list: Vec<IntentName>,
    featurizer: Option<Featurizer>,
    logreg: Option<MulticlassLogisticRegression>,
}

impl LogRegIntentClassifier {
    /// Fits the classifier on (intent, utterance text) samples
    pub fn fit(
        config: LogRegConfig,
        language: Language,
        samples: &[(IntentName, String)],
    ) -> Result<Self> {
        let intent_list: Vec<IntentName> = samples
            .iter()
            .map(|(intent, _)| intent.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if intent_list.is_empty() {
            return Err(NluError::TrainingError(
                "Cannot fit an intent classifier without samples".to_string(),
            )
            .into());
        }
        if intent_list.len() == 1 {
            return Ok(Self {
                language,
                config,
                intent_list,
                featurizer: None,
                logreg: None,
            });
        }

        let texts = samples.iter().map(|(_, text)| &**text).collect_vec();
        let featurizer = Featurizer::fit(&texts, language, config.sublinear_tf);
        let mut features = Array2::<f32>::zeros((samples.len(), featurizer.nb_features()));
        for (mut row, text) in features.outer_iter_mut().zip(texts.iter()) {
            row.assign(&featurizer.transform(text));
        }
        let labels = samples
            .iter()
            .map(|(intent, _)| {
                intent_list
                    .iter()
                    .position(|i| i == intent)
                    .ok_or_else(|| format_err!("Unknown intent '{}'", intent))
            })
            .collect::<Result<Vec<usize>>>()?;
        let logreg =
            MulticlassLogisticRegression::fit(&features, &labels, intent_list.len(), &config)?;

        Ok(Self {
            language,
            config,
            intent_list,
            featurizer: Some(featurizer),
            logreg: Some(logreg),
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let model: IntentClassifierModel = serde_json::from_value(value.clone())
            .with_context(|_| "Cannot deserialize LogRegIntentClassifier json data")?;
        let language = Language::from_str(&model.language_code)?;
        let featurizer = model
            .featurizer
            .map(|featurizer| Featurizer::from_model(featurizer, language))
            .transpose()?;

        let logreg = if let (Some(intercept), Some(coeffs)) = (model.intercept, model.coeffs) {
            let arr_intercept = Array::from_vec(intercept);
            let nb_classes = arr_intercept.dim();
            if coeffs.len() != nb_classes {
                return Err(format_err!(
                    "Found {} coefficients rows for {} intents",
                    coeffs.len(),
                    nb_classes
                ));
            }
            let nb_features = coeffs.first().map(|c| c.len()).unwrap_or(0);
            if coeffs.iter().any(|c| c.len() != nb_features) {
                return Err(format_err!("Inconsistent coefficients dimensions"));
            }
            // Note: the serialized coeffs matrix is transposed
            let arr_weights =
                Array::from_shape_fn((nb_features, nb_classes), |(i, j)| coeffs[j][i]);
            MulticlassLogisticRegression::new(arr_intercept, arr_weights).map(Some)
        } else {
            Ok(None)
        }?;

        if model.intent_list.len() > 1 && (featurizer.is_none() || logreg.is_none()) {
            return Err(format_err!(
                "Missing featurizer or coefficients for {} intents",
                model.intent_list.len()
            ));
        }
        if let (Some(featurizer), Some(logreg)) = (featurizer.as_ref(), logreg.as_ref()) {
            if logreg.classes_count() != model.intent_list.len()
                || logreg.coeffs().first().map(|c| c.len()) != Some(featurizer.nb_features())
            {
                return Err(format_err!("Inconsistent intent classifier dimensions"));
            }
        }

        Ok(Self {
            language,
            config: model.config,
            intent_list: model.intent_list,
            featurizer,
            logreg,
        })
    }
}

impl IntentClassifier for LogRegIntentClassifier {
    fn get_intent(&self, input: &str) -> Result<Option<IntentName>> {
        if self.intent_list.is_empty() || tokenize_light(input, self.language).is_empty() {
            return Ok(None);
        }

        if self.intent_list.len() == 1 {
            return Ok(Some(self.intent_list[0].clone()));
        }

        if let (Some(featurizer), Some(logreg)) = (self.featurizer.as_ref(), self.logreg.as_ref()) {
            let features = featurizer.transform(input);
            if features.iter().all(|f| *f == 0.0) {
                debug!("No known vocabulary in '{}'", input);
                return Ok(None);
            }
            let probabilities = logreg.run(&features.view())?;
            let total: f32 = probabilities.sum();

            let mut best: Option<(usize, f32)> = None;
            for (index, probability) in probabilities.iter().enumerate() {
                if best.map(|(_, p)| *probability > p).unwrap_or(true) {
                    best = Some((index, *probability));
                }
            }
            Ok(best.and_then(|(index, probability)| {
                let normalized_probability = if total > 0.0 {
                    probability / total
                } else {
                    0.0
                };
                debug!(
                    "Intent '{}' classified with probability {}",
                    self.intent_list[index], normalized_probability
                );
                if normalized_probability < self.config.probability_threshold {
                    None
                } else {
                    Some(self.intent_list[index].clone())
                }
            }))
        } else {
            Ok(None)
        }
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        let model = IntentClassifierModel {
            language_code: self.language.code().to_string(),
            config: self.config.clone(),
            intent_list: self.intent_list.clone(),
            featurizer: self.featurizer.as_ref().map(|f| f.to_model()),
            intercept: self.logreg.as_ref().map(|l| l.intercept()),
            coeffs: self.logreg.as_ref().map(|l| l.coeffs()),
        };
        let mut value = serde_json::to_value(model)?;
        let metadata = serde_json::to_value(ProcessingUnitMetadata::LogRegIntentClassifier)?;
        if let (Some(object), Some(unit_name)) = (value.as_object_mut(), metadata.get("unit_name"))
        {
            object.insert("unit_name".to_string(), unit_name.clone());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent_classifier::build_intent_classifier;

    fn samples() -> Vec<(IntentName, String)> {
        vec![
            ("MakeCoffee", "make me a coffee"),
            ("MakeCoffee", "i want two cups of coffee"),
            ("MakeCoffee", "brew some coffee"),
            ("MakeCoffee", "coffee please"),
            ("MakeTea", "make me a tea"),
            ("MakeTea", "i want hot tea"),
            ("MakeTea", "prepare some tea please"),
            ("MakeTea", "a cup of tea"),
        ]
        .into_iter()
        .map(|(intent, text)| (intent.to_string(), text.to_string()))
        .collect()
    }

    #[test]
    fn get_intent_works() {
        // Given
        let classifier =
            LogRegIntentClassifier::fit(LogRegConfig::default(), Language::EN, &samples())
                .unwrap();

        // When
        let coffee = classifier.get_intent("some coffee now").unwrap();
        let tea = classifier.get_intent("Tea please").unwrap();

        // Then
        assert_eq!(Some("MakeCoffee".to_string()), coffee);
        assert_eq!(Some("MakeTea".to_string()), tea);
    }

    #[test]
    fn get_intent_returns_none_without_known_vocabulary() {
        // Given
        let classifier =
            LogRegIntentClassifier::fit(LogRegConfig::default(), Language::EN, &samples())
                .unwrap();

        // When
        let unknown = classifier.get_intent("hello world").unwrap();
        let empty = classifier.get_intent("  ").unwrap();

        // Then
        assert_eq!(None, unknown);
        assert_eq!(None, empty);
    }

    #[test]
    fn get_intent_returns_none_below_threshold() {
        // Given
        let config = LogRegConfig {
            probability_threshold: 0.99,
            ..LogRegConfig::default()
        };
        let classifier = LogRegIntentClassifier::fit(config, Language::EN, &samples()).unwrap();

        // When
        let intent = classifier.get_intent("make me a cup").unwrap();

        // Then
        assert_eq!(None, intent);
    }

    #[test]
    fn single_intent_classifier_always_returns_its_intent() {
        // Given
        let samples = vec![("MakeTea".to_string(), "make me a tea".to_string())];
        let classifier =
            LogRegIntentClassifier::fit(LogRegConfig::default(), Language::EN, &samples).unwrap();

        // When
        let intent = classifier.get_intent("something else").unwrap();

        // Then
        assert_eq!(Some("MakeTea".to_string()), intent);
    }

    #[test]
    fn fit_without_samples_fails() {
        let result = LogRegIntentClassifier::fit(LogRegConfig::default(), Language::EN, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn classifier_survives_json_round_trip() {
        // Given
        let classifier =
            LogRegIntentClassifier::fit(LogRegConfig::default(), Language::EN, &samples())
                .unwrap();

        // When
        let value = classifier.to_json().unwrap();
        let reloaded = build_intent_classifier(&value).unwrap();

        // Then
        assert_eq!(
            Some("log_reg_intent_classifier"),
            value.get("unit_name").and_then(|v| v.as_str())
        );
        for text in &["some coffee now", "Tea please", "hello world"] {
            assert_eq!(
                classifier.get_intent(text).unwrap(),
                reloaded.get_intent(text).unwrap()
            );
        }
    }

    #[test]
    fn classifier_with_corrupted_vocabulary_cannot_be_loaded() {
        // Given
        let classifier =
            LogRegIntentClassifier::fit(LogRegConfig::default(), Language::EN, &samples())
                .unwrap();
        let mut value = classifier.to_json().unwrap();
        value["featurizer"]["vocab"]["coffee"] = serde_json::json!(999);

        // When
        let result = build_intent_classifier(&value);

        // Then
        assert!(result.is_err());
    }
}
