mod augmentation;
mod crf_tagger;
pub mod crf_utils;
pub mod feature_processor;
mod features;

use std::fs::File;
use std::path::Path;

use failure::{format_err, ResultExt};

pub use self::augmentation::{augment_slots, spans_to_tokens_indexes};
pub use self::crf_tagger::CrfTagger;
pub use self::crf_utils::{positive_tagging, tags_to_slots, Tag, TagPrefix, TaggingScheme};
use crate::errors::*;
use crate::models::ProcessingUnitMetadata;
use crate::tokenization::Token;

/// Sequence tagger used to fill the slots of a single intent
pub trait Tagger: Send + Sync {
    fn get_tagging_scheme(&self) -> TaggingScheme;

    /// One tag per token
    fn get_tags(&self, tokens: &[Token]) -> Result<Vec<Tag>>;

    /// Probability in [0, 1] of the full tag sequence given the tokens
    fn get_sequence_probability(&self, tokens: &[Token], tags: &[Tag]) -> Result<f64>;

    fn persist(&self, path: &Path) -> Result<()>;
}

pub fn build_tagger<P: AsRef<Path>>(path: P) -> Result<Box<dyn Tagger>> {
    let metadata_path = path.as_ref().join("metadata.json");
    let metadata_file = File::open(&metadata_path)
        .with_context(|_| format!("Cannot open tagger metadata file '{:?}'", metadata_path))?;
    let metadata: ProcessingUnitMetadata = serde_json::from_reader(metadata_file)
        .with_context(|_| "Cannot deserialize tagger metadata")?;
    match metadata {
        ProcessingUnitMetadata::CrfTagger => Ok(Box::new(CrfTagger::from_path(path)?) as _),
        _ => Err(format_err!("{:?} is not a tagger", metadata)),
    }
}
