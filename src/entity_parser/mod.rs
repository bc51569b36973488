mod builtin_entity_parser;

pub use self::builtin_entity_parser::*;
