use failure::Fail;

#[derive(Debug, Fail)]
pub enum NluError {
    #[fail(display = "Training failed: {}", _0)]
    TrainingError(String),
    #[fail(display = "Corrupt model store at '{}': {}", path, reason)]
    CorruptStore { path: String, reason: String },
    #[fail(display = "Expected model version {} but found {}", runner, model)]
    WrongModelVersion { model: String, runner: &'static str },
    #[fail(display = "Invalid intent name: '{}'", _0)]
    InvalidIntentName(String),
    #[fail(display = "Invalid configuration: {}", _0)]
    InvalidConfiguration(String),
    #[fail(display = "Unknown intent: '{}'", _0)]
    UnknownIntent(String),
}

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;
