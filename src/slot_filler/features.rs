use std::collections::HashMap;

use failure::format_err;
use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::*;
use crate::slot_filler::feature_processor::Feature;
use crate::tokenization::Token;

fn get_usize_arg(args: &HashMap<String, serde_json::Value>, arg_name: &str) -> Result<usize> {
    args.get(arg_name)
        .and_then(|value| value.as_u64())
        .map(|value| value as usize)
        .ok_or_else(|| format_err!("Missing or invalid feature argument '{}'", arg_name))
}

pub fn get_shape(string: &str) -> String {
    lazy_static! {
        static ref LOWER_REGEX: Regex = Regex::new(r"^\p{Ll}+$").unwrap();
        static ref UPPER_REGEX: Regex = Regex::new(r"^\p{Lu}+$").unwrap();
        static ref TITLE_REGEX: Regex = Regex::new(r"^\p{Lu}\p{Ll}+$").unwrap();
    }

    if LOWER_REGEX.is_match(string) {
        "xxx".to_string()
    } else if UPPER_REGEX.is_match(string) {
        "XXX".to_string()
    } else if TITLE_REGEX.is_match(string) {
        "Xxx".to_string()
    } else {
        "xX".to_string()
    }
}

fn get_word_chunk(word: &str, chunk_size: usize, from_end: bool) -> Option<String> {
    let nb_chars = word.chars().count();
    if chunk_size == 0 || chunk_size > nb_chars {
        return None;
    }
    let start = if from_end { nb_chars - chunk_size } else { 0 };
    Some(word.chars().skip(start).take(chunk_size).collect())
}

pub struct IsDigitFeature {
    offsets: Vec<i32>,
}

impl Feature for IsDigitFeature {
    fn base_name(&self) -> &'static str {
        "is_digit"
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        _args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        if tokens[token_index].value.chars().all(|c| c.is_digit(10)) {
            Some("1".to_string())
        } else {
            None
        }
    }
}

pub struct LengthFeature {
    offsets: Vec<i32>,
}

impl Feature for LengthFeature {
    fn base_name(&self) -> &'static str {
        "length"
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        _args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        Some(tokens[token_index].value.chars().count().to_string())
    }
}

pub struct IsFirstFeature {
    offsets: Vec<i32>,
}

impl Feature for IsFirstFeature {
    fn base_name(&self) -> &'static str {
        "is_first"
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        _args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
        })])
    }

    fn compute(&self, _tokens: &[Token], token_index: usize) -> Option<String> {
        if token_index == 0 {
            Some("1".to_string())
        } else {
            None
        }
    }
}

pub struct IsLastFeature {
    offsets: Vec<i32>,
}

impl Feature for IsLastFeature {
    fn base_name(&self) -> &'static str {
        "is_last"
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        _args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        if token_index + 1 == tokens.len() {
            Some("1".to_string())
        } else {
            None
        }
    }
}

pub struct NgramFeature {
    offsets: Vec<i32>,
    n: usize,
}

impl Feature for NgramFeature {
    fn base_name(&self) -> &'static str {
        "ngram"
    }

    fn name(&self) -> String {
        format!("{}_{}", self.base_name(), self.n)
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let n = get_usize_arg(args, "n")?;
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
            n,
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        let end = token_index + self.n;
        if self.n == 0 || end > tokens.len() {
            return None;
        }
        Some(
            tokens[token_index..end]
                .iter()
                .map(|t| &*t.normalized_value)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

pub struct ShapeNgramFeature {
    offsets: Vec<i32>,
    n: usize,
}

impl Feature for ShapeNgramFeature {
    fn base_name(&self) -> &'static str {
        "shape_ngram"
    }

    fn name(&self) -> String {
        format!("{}_{}", self.base_name(), self.n)
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let n = get_usize_arg(args, "n")?;
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
            n,
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        let end = token_index + self.n;
        if self.n == 0 || end > tokens.len() {
            return None;
        }
        Some(
            tokens[token_index..end]
                .iter()
                .map(|t| get_shape(&t.value))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

pub struct PrefixFeature {
    offsets: Vec<i32>,
    prefix_size: usize,
}

impl Feature for PrefixFeature {
    fn base_name(&self) -> &'static str {
        "prefix"
    }

    fn name(&self) -> String {
        format!("{}_{}", self.base_name(), self.prefix_size)
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let prefix_size = get_usize_arg(args, "prefix_size")?;
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
            prefix_size,
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        get_word_chunk(&tokens[token_index].normalized_value, self.prefix_size, false)
    }
}

pub struct SuffixFeature {
    offsets: Vec<i32>,
    suffix_size: usize,
}

impl Feature for SuffixFeature {
    fn base_name(&self) -> &'static str {
        "suffix"
    }

    fn name(&self) -> String {
        format!("{}_{}", self.base_name(), self.suffix_size)
    }

    fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn build_features(
        offsets: &[i32],
        args: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let suffix_size = get_usize_arg(args, "suffix_size")?;
        Ok(vec![Box::new(Self {
            offsets: offsets.to_vec(),
            suffix_size,
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Option<String> {
        get_word_chunk(&tokens[token_index].normalized_value, self.suffix_size, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::tokenization::tokenize;
    use maplit::hashmap;
    use serde_json::json;

    #[test]
    fn get_shape_works() {
        // Given
        let inputs = vec!["hello", "Hello", "HELLO", "heLo", "!!"];

        // When
        let actual_shapes: Vec<String> = inputs.iter().map(|i| get_shape(i)).collect();

        // Then
        let expected_shapes = vec!["xxx", "Xxx", "XXX", "xX", "xX"];
        assert_eq!(expected_shapes, actual_shapes);
    }

    #[test]
    fn get_word_chunk_works() {
        assert_eq!(Some("he".to_string()), get_word_chunk("hello", 2, false));
        assert_eq!(Some("llo".to_string()), get_word_chunk("hello", 3, true));
        assert_eq!(None, get_word_chunk("hi", 3, true));
    }

    #[test]
    fn ngram_feature_works() {
        // Given
        let tokens = tokenize("I love House Music", Language::EN);
        let features = NgramFeature::build_features(&[0], &hashmap! {
            "n".to_string() => json!(2)
        })
        .unwrap();

        // When
        let values: Vec<Option<String>> = (0..tokens.len())
            .map(|i| features[0].compute(&tokens, i))
            .collect();

        // Then
        assert_eq!("ngram_2", features[0].name());
        assert_eq!(
            vec![
                Some("i love".to_string()),
                Some("love house".to_string()),
                Some("house music".to_string()),
                None,
            ],
            values
        );
    }

    #[test]
    fn suffix_feature_requires_size() {
        assert!(SuffixFeature::build_features(&[0], &HashMap::new()).is_err());
    }

    #[test]
    fn is_digit_feature_works() {
        let tokens = tokenize("make 2 cups", Language::EN);
        let features = IsDigitFeature::build_features(&[0], &HashMap::new()).unwrap();
        assert_eq!(None, features[0].compute(&tokens, 0));
        assert_eq!(Some("1".to_string()), features[0].compute(&tokens, 1));
    }
}
