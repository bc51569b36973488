use std::collections::HashMap;
use std::ops::Range;

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::errors::*;
use crate::language::Language;
use crate::utils::{deduplicate_overlapping_items, ranges_overlap, EntityName};

pub const BUILTIN_PREFIX: &str = "snips/";
pub const DATETIME: &str = "snips/datetime";
pub const NUMBER: &str = "snips/number";
pub const ORDINAL: &str = "snips/ordinal";
pub const PERCENTAGE: &str = "snips/percentage";

pub fn is_builtin_entity(entity: &str) -> bool {
    entity.starts_with(BUILTIN_PREFIX)
}

/// An entity found by a builtin entity parser. `range` is a char range and
/// `value` may carry surrounding whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinEntity {
    pub value: String,
    pub range: Range<usize>,
    pub entity_kind: EntityName,
}

pub trait BuiltinEntityParser: Send + Sync {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[EntityName]>,
    ) -> Result<Vec<BuiltinEntity>>;
}

/// Regex based parser covering a few builtin entity kinds
pub struct PatternBuiltinEntityParser {
    patterns: &'static [(&'static str, Regex)],
}

fn build_patterns(raw_patterns: &[(&'static str, &str)]) -> Vec<(&'static str, Regex)> {
    raw_patterns
        .iter()
        .map(|(kind, pattern)| {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .unwrap();
            (*kind, regex)
        })
        .collect()
}

lazy_static! {
    static ref EN_PATTERNS: Vec<(&'static str, Regex)> = build_patterns(&[
        (
            DATETIME,
            r"\b(?:(?:before|after|at|by|from|until)\s+)?(?:\d{1,2}(?::\d{2})?\s*(?:am|pm)|today|tomorrow|tonight|yesterday|noon|midnight)(?:\s+at\s+\d{1,2}(?::\d{2})?\s*(?:am|pm))?\b",
        ),
        (PERCENTAGE, r"\b\d+(?:[.,]\d+)?\s*(?:%|percent\b)"),
        (
            ORDINAL,
            r"\b(?:\d+(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)\b",
        ),
        (
            NUMBER,
            r"\b(?:\d+(?:[.,]\d+)?|zero|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|twenty|hundred)\b",
        ),
    ]);
    static ref FR_PATTERNS: Vec<(&'static str, Regex)> = build_patterns(&[
        (
            DATETIME,
            r"\b(?:(?:avant|après|à|vers)\s+)?(?:\d{1,2}\s*h(?:\s*\d{2})?|aujourd'hui|demain|ce soir|hier|midi|minuit)\b",
        ),
        (PERCENTAGE, r"\b\d+(?:[.,]\d+)?\s*(?:%|pour ?cent\b)"),
        (
            ORDINAL,
            r"\b(?:\d+(?:er|ère|e|ème)|premier|première|deuxième|troisième|quatrième|cinquième)\b",
        ),
        (
            NUMBER,
            r"\b(?:\d+(?:[.,]\d+)?|zéro|un|une|deux|trois|quatre|cinq|six|sept|huit|neuf|dix|vingt|cent)\b",
        ),
    ]);
}

impl PatternBuiltinEntityParser {
    pub fn new(language: Language) -> Self {
        let patterns: &'static [(&'static str, Regex)] = match language {
            Language::EN => &EN_PATTERNS,
            Language::FR => &FR_PATTERNS,
        };
        Self { patterns }
    }

    pub fn supported_entity_kinds(&self) -> Vec<&'static str> {
        self.patterns.iter().map(|(kind, _)| *kind).collect()
    }
}

impl BuiltinEntityParser for PatternBuiltinEntityParser {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[EntityName]>,
    ) -> Result<Vec<BuiltinEntity>> {
        let byte_to_char: HashMap<usize, usize> = sentence
            .char_indices()
            .enumerate()
            .map(|(char_index, (byte_index, _))| (byte_index, char_index))
            .chain(::std::iter::once((sentence.len(), sentence.chars().count())))
            .collect();
        let entities: Vec<BuiltinEntity> = self
            .patterns
            .iter()
            .filter(|(kind, _)| {
                filter_entity_kinds
                    .map(|kinds| kinds.iter().any(|k| k == kind))
                    .unwrap_or(true)
            })
            .flat_map(|(kind, regex)| {
                regex
                    .find_iter(sentence)
                    .map(|m| BuiltinEntity {
                        value: m.as_str().to_string(),
                        range: byte_to_char[&m.start()]..byte_to_char[&m.end()],
                        entity_kind: kind.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        let mut entities = deduplicate_overlapping_items(
            entities,
            |lhs: &BuiltinEntity, rhs: &BuiltinEntity| ranges_overlap(&lhs.range, &rhs.range),
            |entity: &BuiltinEntity| -(entity.range.len() as i64),
        );
        entities.sort_by_key(|entity| entity.range.start);
        debug!("{} builtin entities found", entities.len());
        Ok(entities)
    }
}
