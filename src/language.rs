use std::fmt;
use std::str::FromStr;

use failure::format_err;
use serde_derive::{Deserialize, Serialize};

use crate::errors::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    EN,
    FR,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::EN => "en",
            Language::FR => "fr",
        }
    }
}

impl FromStr for Language {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_ref() {
            "en" => Ok(Language::EN),
            "fr" => Ok(Language::FR),
            _ => Err(format_err!("Unsupported language code: '{}'", s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
