use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The source could not be brought back; the supervisor decides what happens next.
    #[error("sensor fatal: {0}")]
    SensorFatal(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing device id")]
    MissingDeviceId,
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(&'static str),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
