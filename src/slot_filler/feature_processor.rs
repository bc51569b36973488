use std::collections::HashMap;

use failure::bail;

use crate::configurations::FeatureFactory;
use crate::errors::*;
use crate::slot_filler::features::*;
use crate::tokenization::Token;

pub struct ProbabilisticFeatureProcessor {
    features: Vec<Box<dyn Feature>>,
}

impl ProbabilisticFeatureProcessor {
    pub fn new(features: &[FeatureFactory]) -> Result<ProbabilisticFeatureProcessor> {
        let features = features
            .iter()
            .map(get_features)
            .collect::<Result<Vec<Vec<_>>>>()?
            .into_iter()
            .flatten()
            .collect();
        Ok(ProbabilisticFeatureProcessor { features })
    }
}

impl ProbabilisticFeatureProcessor {
    pub fn compute_features(&self, input: &[Token]) -> Vec<Vec<(String, String)>> {
        self.features
            .iter()
            .fold(vec![vec![]; input.len()], |mut acc, f| {
                for i in 0..input.len() {
                    if let Some(value) = f.compute(input, i) {
                        for (offset, key) in f.offsets_with_name() {
                            let target = i as i32 - offset;
                            if target >= 0 && target < input.len() as i32 {
                                acc[target as usize].push((key, value.clone()));
                            }
                        }
                    }
                }
                acc
            })
    }
}

pub trait Feature: Send + Sync {
    fn base_name(&self) -> &'static str;
    fn name(&self) -> String {
        self.base_name().to_string()
    }
    fn offsets(&self) -> &[i32];
    fn build_features(
        offsets: &[i32],
        args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>>
    where
        Self: Sized;
    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String>;

    fn offsets_with_name(&self) -> Vec<(i32, String)> {
        self.offsets()
            .iter()
            .map(|i| {
                (
                    *i,
                    if *i == 0 {
                        self.name()
                    } else {
                        format!("{}[{:+}]", self.name(), i)
                    },
                )
            })
            .collect()
    }
}

fn get_features(f: &FeatureFactory) -> Result<Vec<Box<dyn Feature>>> {
    let offsets = &f.offsets;
    match f.factory_name.as_ref() {
        "is_digit" => IsDigitFeature::build_features(offsets, &f.args),
        "length" => LengthFeature::build_features(offsets, &f.args),
        "is_first" => IsFirstFeature::build_features(offsets, &f.args),
        "is_last" => IsLastFeature::build_features(offsets, &f.args),
        "ngram" => NgramFeature::build_features(offsets, &f.args),
        "shape_ngram" => ShapeNgramFeature::build_features(offsets, &f.args),
        "prefix" => PrefixFeature::build_features(offsets, &f.args),
        "suffix" => SuffixFeature::build_features(offsets, &f.args),
        _ => bail!("Feature {} not implemented", f.factory_name),
    }
}
