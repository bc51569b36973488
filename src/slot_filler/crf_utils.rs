use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use failure::{bail, format_err};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::*;
use crate::slot_utils::ParsedSlot;
use crate::tokenization::Token;
use crate::utils::{substring_with_char_range, EntityName, SlotName};

const BEGINNING_PREFIX: &str = "B-";
const INSIDE_PREFIX: &str = "I-";
const LAST_PREFIX: &str = "L-";
const UNIT_PREFIX: &str = "U-";
const OUTSIDE: &str = "O";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TagPrefix {
    Begin,
    Inside,
    Last,
    Unit,
}

impl TagPrefix {
    fn as_str(&self) -> &'static str {
        match self {
            TagPrefix::Begin => BEGINNING_PREFIX,
            TagPrefix::Inside => INSIDE_PREFIX,
            TagPrefix::Last => LAST_PREFIX,
            TagPrefix::Unit => UNIT_PREFIX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Outside,
    Slot {
        prefix: TagPrefix,
        slot_name: SlotName,
    },
}

impl Tag {
    pub fn new<S: Into<SlotName>>(prefix: TagPrefix, slot_name: S) -> Self {
        Tag::Slot {
            prefix,
            slot_name: slot_name.into(),
        }
    }

    pub fn is_outside(&self) -> bool {
        *self == Tag::Outside
    }

    pub fn slot_name(&self) -> Option<&str> {
        match self {
            Tag::Outside => None,
            Tag::Slot { slot_name, .. } => Some(slot_name),
        }
    }

    fn prefix(&self) -> Option<TagPrefix> {
        match self {
            Tag::Outside => None,
            Tag::Slot { prefix, .. } => Some(*prefix),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Tag::Outside => write!(f, "{}", OUTSIDE),
            Tag::Slot { prefix, slot_name } => write!(f, "{}{}", prefix.as_str(), slot_name),
        }
    }
}

impl FromStr for Tag {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == OUTSIDE {
            return Ok(Tag::Outside);
        }
        let prefix = [
            TagPrefix::Begin,
            TagPrefix::Inside,
            TagPrefix::Last,
            TagPrefix::Unit,
        ]
        .iter()
        .find(|prefix| s.starts_with(prefix.as_str()))
        .copied()
        .ok_or_else(|| format_err!("Invalid tag: '{}'", s))?;
        let slot_name = &s[prefix.as_str().len()..];
        if slot_name.is_empty() {
            bail!("Invalid tag, missing slot name: '{}'", s);
        }
        Ok(Tag::new(prefix, slot_name))
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Tag::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaggingScheme {
    IO,
    BIO,
    BILOU,
}

impl TaggingScheme {
    pub fn from_u8(i: u8) -> Result<TaggingScheme> {
        match i {
            0 => Ok(TaggingScheme::IO),
            1 => Ok(TaggingScheme::BIO),
            2 => Ok(TaggingScheme::BILOU),
            _ => bail!("Unknown tagging scheme identifier: {}", i),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            TaggingScheme::IO => 0,
            TaggingScheme::BIO => 1,
            TaggingScheme::BILOU => 2,
        }
    }

    /// Prefix of the tag at `position` within a slot spanning `span_length` tokens
    pub fn prefix(self, position: usize, span_length: usize) -> TagPrefix {
        match self {
            TaggingScheme::IO => TagPrefix::Inside,
            TaggingScheme::BIO => {
                if position == 0 {
                    TagPrefix::Begin
                } else {
                    TagPrefix::Inside
                }
            }
            TaggingScheme::BILOU => {
                if span_length == 1 {
                    TagPrefix::Unit
                } else if position == 0 {
                    TagPrefix::Begin
                } else if position + 1 == span_length {
                    TagPrefix::Last
                } else {
                    TagPrefix::Inside
                }
            }
        }
    }
}

impl Serialize for TaggingScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for TaggingScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
        let id = u8::deserialize(deserializer)?;
        TaggingScheme::from_u8(id).map_err(serde::de::Error::custom)
    }
}

pub fn positive_tagging(tagging_scheme: TaggingScheme, slot_name: &str, slot_size: usize) -> Vec<Tag> {
    (0..slot_size)
        .map(|position| Tag::new(tagging_scheme.prefix(position, slot_size), slot_name))
        .collect()
}

fn same_slot(lhs: &Tag, rhs: &Tag) -> bool {
    match (lhs.slot_name(), rhs.slot_name()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn is_start_of_slot(tags: &[Tag], i: usize, tagging_scheme: TaggingScheme) -> bool {
    if tags[i].is_outside() {
        return false;
    }
    if i == 0 || !same_slot(&tags[i - 1], &tags[i]) {
        return true;
    }
    match tagging_scheme {
        TaggingScheme::IO => false,
        TaggingScheme::BIO => tags[i].prefix() == Some(TagPrefix::Begin),
        TaggingScheme::BILOU => match (tags[i - 1].prefix(), tags[i].prefix()) {
            (_, Some(TagPrefix::Begin)) | (_, Some(TagPrefix::Unit)) => true,
            (Some(TagPrefix::Last), _) | (Some(TagPrefix::Unit), _) => true,
            _ => false,
        },
    }
}

fn is_end_of_slot(tags: &[Tag], i: usize, tagging_scheme: TaggingScheme) -> bool {
    if tags[i].is_outside() {
        return false;
    }
    if i + 1 == tags.len() || !same_slot(&tags[i], &tags[i + 1]) {
        return true;
    }
    is_start_of_slot(tags, i + 1, tagging_scheme)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotRange {
    pub slot_name: SlotName,
    pub token_range: Range<usize>,
    pub char_range: Range<usize>,
}

/// Lenient decoding: a slot tag which does not continue the previous slot
/// starts a new one, whatever its prefix
pub fn tags_to_slot_ranges(
    tokens: &[Token],
    tags: &[Tag],
    tagging_scheme: TaggingScheme,
) -> Vec<SlotRange> {
    let mut slots: Vec<SlotRange> = Vec::with_capacity(tags.len());
    let mut current_slot_start = 0;
    for (i, tag) in tags.iter().enumerate() {
        if is_start_of_slot(tags, i, tagging_scheme) {
            current_slot_start = i;
        }
        if is_end_of_slot(tags, i, tagging_scheme) {
            if let Some(slot_name) = tag.slot_name() {
                slots.push(SlotRange {
                    slot_name: slot_name.to_string(),
                    token_range: current_slot_start..i + 1,
                    char_range: tokens[current_slot_start].char_range.start
                        ..tokens[i].char_range.end,
                });
            }
        }
    }
    slots
}

pub fn tags_to_slots(
    text: &str,
    tokens: &[Token],
    tags: &[Tag],
    tagging_scheme: TaggingScheme,
    intent_slots_mapping: &HashMap<SlotName, EntityName>,
) -> Result<Vec<ParsedSlot>> {
    tags_to_slot_ranges(tokens, tags, tagging_scheme)
        .into_iter()
        .map(|s| {
            Ok(ParsedSlot {
                value: substring_with_char_range(text, &s.char_range),
                entity: intent_slots_mapping
                    .get(&s.slot_name)
                    .ok_or_else(|| {
                        format_err!(
                            "Missing slot to entity mapping for slot name: {}",
                            s.slot_name
                        )
                    })?
                    .to_string(),
                match_range: s.char_range,
                slot_name: s.slot_name,
            })
        })
        .collect()
}

/// Label used in place of a tag unknown to a trained tagger
pub fn get_substitution_label(labels: &[Tag]) -> Option<&Tag> {
    labels
        .iter()
        .find(|label| label.is_outside())
        .or_else(|| labels.first())
}
