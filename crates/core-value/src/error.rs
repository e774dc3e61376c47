//! The flat error taxonomy shared by every layer of the runtime.
//!
//! One variant per failure kind so that callers can match on the cause and
//! messages stay stable for scripts that grep stderr. Location information
//! is attached late: the interpreter wraps whatever bubbles out of a command
//! with the statement's `filename:line:` prefix via [`MapyrusError::at`],
//! never earlier, so inner layers stay location-free.

use thiserror::Error;

/// Result alias used throughout the runtime crates.
pub type Result<T> = std::result::Result<T, MapyrusError>;

#[derive(Debug, Error)]
pub enum MapyrusError {
    // Lexical / parse errors.
    #[error("invalid keyword: {0}")]
    InvalidKeyword(String),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unmatched bracket")]
    UnmatchedBracket,
    #[error("expected '{0}'")]
    ExpectedToken(String),
    #[error("procedure blocks cannot be nested")]
    NestedProc,

    // Type / value errors.
    #[error("variable not defined: {0}")]
    VariableUndefined(String),
    #[error("wrong types for operation")]
    WrongTypes,
    #[error("operation not valid for strings")]
    NotStringOperation,
    #[error("value is not a number")]
    NotNumericOperation,
    #[error("numeric overflow")]
    NumericOverflow,
    #[error("invalid color: {0}")]
    InvalidColor(String),
    #[error("color not found: {0}")]
    ColorNotFound(String),
    #[error("invalid world coordinate units: {0}")]
    InvalidWorldUnits(String),
    #[error("invalid font size")]
    InvalidFontSize,
    #[error("invalid line width")]
    InvalidLineWidth,
    #[error("invalid dash pattern")]
    InvalidDashPattern,
    #[error("invalid legend entry type: {0}")]
    InvalidLegendType(String),

    // Runtime / path errors.
    #[error("no current point to draw from; add a moveto first")]
    NoMoveTo,
    #[error("no current point to begin arc from")]
    NoArcStart,
    #[error("no current point to begin curve from")]
    NoBezierStart,
    #[error("no current point to begin sine wave from")]
    NoSineWaveStart,
    #[error("world coordinate range is zero")]
    ZeroWorldRange,
    #[error("invalid page range")]
    InvalidPageRange,
    #[error("wrong coordinate value")]
    WrongCoordinate,
    #[error("unexpected values: {0}")]
    UnexpectedValues(String),
    #[error("wrong parameters: {0}")]
    WrongParameters(String),
    #[error("procedure not defined: {0}")]
    UndefinedProc(String),
    #[error("no output page defined")]
    NoOutput,

    // Resource errors.
    #[error("{0}")]
    Io(String),
    #[error("failed to process PDF content")]
    FailedPdf,
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    // Control.
    #[error("interrupted")]
    Interrupted,

    /// An error rewrapped with the statement's source location.
    #[error("{file}:{line}: {source}")]
    At {
        file: String,
        line: u32,
        #[source]
        source: Box<MapyrusError>,
    },
}

impl MapyrusError {
    /// Attach `filename:line` once; an error that already carries a location
    /// keeps the innermost one (the statement that actually failed).
    pub fn at(self, file: &str, line: u32) -> Self {
        match self {
            Self::At { .. } | Self::Interrupted => self,
            other => Self::At {
                file: file.to_string(),
                line,
                source: Box::new(other),
            },
        }
    }

    /// The underlying kind, with any location wrapper stripped.
    pub fn root(&self) -> &Self {
        match self {
            Self::At { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for MapyrusError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
