use std::ops::Range;

use serde_derive::Serialize;

use crate::utils::{EntityName, IntentName, SlotName};

/// A slot extracted from an input, where `match_range` is a char range and
/// `value` is exactly the input text covered by that range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSlot {
    pub value: String,
    pub match_range: Range<usize>,
    pub entity: EntityName,
    pub slot_name: SlotName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub input: String,
    pub intent: IntentName,
    pub slots: Vec<ParsedSlot>,
}
