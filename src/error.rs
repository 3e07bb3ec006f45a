//! Error types

use crate::binary::read::ReadEof;
use std::collections::TryReserveError;
use std::fmt;

/// Error returned from font loading, table decoding and CID mapping construction
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum FontError {
    /// The font data violates the format in a way that could not be repaired.
    InvalidFont(ParseError),
    /// Allocation of a decoded array failed.
    OutOfMemory,
    /// CID-keyed interpretation was forced but no mapping strategy applied.
    RangeCheck,
}

impl From<ParseError> for FontError {
    fn from(error: ParseError) -> Self {
        FontError::InvalidFont(error)
    }
}

impl From<ReadEof> for FontError {
    fn from(_error: ReadEof) -> Self {
        FontError::InvalidFont(ParseError::BadEof)
    }
}

impl From<TryReserveError> for FontError {
    fn from(_error: TryReserveError) -> Self {
        FontError::OutOfMemory
    }
}

impl From<std::num::TryFromIntError> for FontError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        FontError::InvalidFont(ParseError::BadValue)
    }
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::InvalidFont(err) => write!(f, "invalid font: {}", err),
            FontError::OutOfMemory => write!(f, "out of memory"),
            FontError::RangeCheck => write!(f, "font cannot be used as a CID font"),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FontError::InvalidFont(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors that originate when parsing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
    LimitExceeded,
    MissingValue,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadVersion => write!(f, "unexpected data version"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::BadIndex => write!(f, "invalid data index"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
            ParseError::MissingValue => write!(f, "an expected data value was missing"),
        }
    }
}

impl std::error::Error for ParseError {}
