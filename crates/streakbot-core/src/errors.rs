/// Core error type for the streak bot.
///
/// Adapter crates map their transport errors into this type so the pipeline can
/// decide locally which failures fall back and which are only logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
