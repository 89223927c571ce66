//! Error types and exit codes for termsift.

use thiserror::Error;

/// Exit codes returned by the `termsift` binary.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const PARSE_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
}

/// Main error type for termsift operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The input text does not match the grammar.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Term already registered: {0}")]
    DuplicateTerm(String),

    #[error("Invalid term name: '{0}'")]
    InvalidTermName(String),

    #[error("A default term is already registered: {0}")]
    DefaultTermAlreadySet(String),

    #[error("Filter not registered: {0}")]
    UnknownFilter(String),

    #[error("Sort not registered: {0}")]
    UnknownSort(String),

    #[error("The default filter has already been set: {0}")]
    DefaultFilterAlreadySet(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid encoded query: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl QueryError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            QueryError::Parse { .. } => ExitCode::ParseError,
            QueryError::DuplicateTerm(_)
            | QueryError::InvalidTermName(_)
            | QueryError::DefaultTermAlreadySet(_)
            | QueryError::UnknownFilter(_)
            | QueryError::UnknownSort(_)
            | QueryError::DefaultFilterAlreadySet(_)
            | QueryError::ConfigError(_)
            | QueryError::TomlParse(_)
            | QueryError::YamlParse(_) => ExitCode::ConfigError,
            _ => ExitCode::GeneralError,
        }
    }

    /// Whether this error came from the parser.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, QueryError::Parse { .. })
    }
}

/// Result type alias for termsift operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    ParseError,
    ConfigError,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::ParseError => exit_code::PARSE_ERROR,
            ExitCode::ConfigError => exit_code::CONFIG_ERROR,
        }
    }
}
