/// Error raised while deriving a device's configuration.
///
/// Both kinds are fatal for the device being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignError {
    /// A required model field was absent when a derivation needed it
    MissingVariable(String),
    /// The model is structurally invalid or ambiguous
    Config(String),
}

impl DesignError {
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingVariable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    #[cfg(test)]
    pub fn is_missing_variable(&self) -> bool {
        matches!(self, Self::MissingVariable(_))
    }

    #[cfg(test)]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl std::fmt::Display for DesignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVariable(msg) => write!(f, "missing variable: {}", msg),
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for DesignError {}

pub type Result<T> = std::result::Result<T, DesignError>;
