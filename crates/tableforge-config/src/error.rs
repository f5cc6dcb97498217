//! Error type for configuration loading.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more required environment variables were not set and have
    /// no default. Carries every missing name at once, rather than
    /// failing on the first, so an operator can fix them all in one pass.
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    /// A variable was set but couldn't be parsed as its expected type.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue { name: String, value: String, reason: String },
}
