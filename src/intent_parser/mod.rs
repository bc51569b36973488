mod probabilistic_intent_parser;

pub use self::probabilistic_intent_parser::ProbabilisticIntentParser;
use crate::errors::*;
pub use crate::slot_utils::{ParseResult, ParsedSlot};
use crate::utils::IntentName;

pub trait IntentParser: Send + Sync {
    /// `None` when the input has no token, no confident intent, or no tagger
    /// for its intent
    fn parse(&self, input: &str) -> Result<Option<ParseResult>>;

    fn get_intent(&self, input: &str) -> Result<Option<IntentName>>;

    fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<ParsedSlot>>;
}
