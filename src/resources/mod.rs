use std::sync::Arc;

use log::info;

use crate::entity_parser::{BuiltinEntityParser, PatternBuiltinEntityParser};
use crate::language::Language;

/// Resources shared by all the processing units of a parser
pub struct SharedResources {
    pub builtin_entity_parser: Arc<dyn BuiltinEntityParser>,
}

impl SharedResources {
    pub fn for_language(language: Language) -> Arc<Self> {
        info!("Loading builtin entity parser for language '{}'", language);
        Arc::new(Self {
            builtin_entity_parser: Arc::new(PatternBuiltinEntityParser::new(language)),
        })
    }
}
