use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    ReadFailed { address: u64, message: String },

    #[error("Address {address:#x} is outside the snapshot window [{base:#x}, {end:#x})")]
    AddressOutOfRange { address: u64, base: u64, end: u64 },

    #[error("Region walk stopped after {mapped:#x} of {requested:#x} bytes")]
    PartialMap { mapped: u64, requested: u64 },

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Ambiguous match for '{field}': first={first:#x}, second={}", fmt_candidate(.second))]
    AmbiguousMatch {
        field: String,
        first: u64,
        second: Option<u64>,
    },

    #[error("Unrecognized nation byte {0} (identification fingerprint is likely obsolete)")]
    UnknownNation(u8),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Field '{field}' is {actual}, expected {expected}")]
    FieldKindMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Input injection failed: {0}")]
    InputFailed(String),

    #[error("Config parse error: {0}")]
    ConfigParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn read_failed(address: u64, message: impl Into<String>) -> Self {
        Error::ReadFailed {
            address,
            message: message.into(),
        }
    }

    /// Whether the error means the target itself is gone or unreachable,
    /// as opposed to a single stale field.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotFound(_) | Error::AccessDenied(_) | Error::PartialMap { .. }
        )
    }
}

fn fmt_candidate(candidate: &Option<u64>) -> String {
    match candidate {
        Some(address) => format!("{:#x}", address),
        None => "none".to_string(),
    }
}
