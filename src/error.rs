use crate::boxes::FourCC;

/// Decoding failures: the input does not describe a valid box tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("truncated {what}: needed {needed} bytes, {available} available")]
    Truncated {
        what: String,
        needed: u64,
        available: u64,
    },
    #[error("'{typ}' declares {declared} payload bytes but its contents occupy {consumed}")]
    SizeMismatch {
        typ: FourCC,
        declared: u64,
        consumed: u64,
    },
    #[error("invalid size {size} for box '{typ}'")]
    InvalidSize { typ: FourCC, size: u64 },
    #[error("expected box '{expected}', found '{found}'")]
    TypeMismatch { expected: FourCC, found: FourCC },
    #[error("{remaining} unparsed bytes after box at offset {offset}")]
    TrailingData { offset: u64, remaining: u64 },
    #[error("nesting depth {depth} exceeds maximum of {max}")]
    DepthLimit { depth: usize, max: usize },
    #[error("'{parent}' is missing required child '{child}'")]
    MissingChild { parent: FourCC, child: FourCC },
    #[error("'{parent}' holds {count} '{child}' boxes, at most one allowed")]
    DuplicateChild {
        parent: FourCC,
        child: FourCC,
        count: usize,
    },
}

impl FormatError {
    pub fn is_depth_limit(&self) -> bool {
        matches!(self, FormatError::DepthLimit { .. })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("format: {0}")]
    Format(#[from] FormatError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("no property '{name}' in '{typ}'")]
    PropertyNotFound { typ: FourCC, name: String },
    #[error("no atom at '{0}'")]
    AtomNotFound(String),
    #[error("property '{name}' is {actual}, not {expected}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("value {value} does not fit in {bits} bits for '{name}'")]
    ValueOutOfRange { name: String, value: u64, bits: u32 },
    #[error("'{name}' requires {expected} bytes, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("invalid path '{0}'")]
    InvalidPath(String),
    #[error("'{0}' was modified after generation; call generate() before encoding")]
    NotGenerated(FourCC),
}

impl Error {
    /// Returns the format error carried by this error, if any.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Error::Format(f) => Some(f),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
