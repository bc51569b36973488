mod intent_classifier;
mod intent_parser;
mod processing_unit_metadata;
mod slot_filler;

pub use self::intent_classifier::*;
pub use self::intent_parser::*;
pub use self::processing_unit_metadata::*;
pub use self::slot_filler::*;
