use thiserror::Error;

/// The result type for all config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(PartialEq, Debug, Clone, Error)]
pub enum ConfigError {
    /// The given required property is missing from the configuration.
    #[error("required property \"{0}\" is missing")]
    MissingProperty(String),
}
