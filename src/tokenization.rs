use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::language::Language;

/// A token of the input text, with byte range and char range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub range: Range<usize>,
    pub char_range: Range<usize>,
    pub normalized_value: String,
}

impl Token {
    pub fn new(value: String, range: Range<usize>, char_range: Range<usize>) -> Self {
        let normalized_value = value.to_lowercase();
        Self {
            value,
            range,
            char_range,
            normalized_value,
        }
    }
}

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"\w+|[^\w\s]").unwrap();
}

pub fn tokenize(input: &str, _language: Language) -> Vec<Token> {
    let mut char_offset = 0;
    let mut last_byte = 0;
    TOKEN_REGEX
        .find_iter(input)
        .map(|m| {
            char_offset += input[last_byte..m.start()].chars().count();
            let char_start = char_offset;
            char_offset += m.as_str().chars().count();
            last_byte = m.end();
            Token::new(
                m.as_str().to_string(),
                m.start()..m.end(),
                char_start..char_offset,
            )
        })
        .collect()
}

pub fn tokenize_light(input: &str, language: Language) -> Vec<String> {
    tokenize(input, language)
        .into_iter()
        .map(|token| token.normalized_value)
        .collect()
}
