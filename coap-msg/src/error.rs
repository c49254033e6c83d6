//! Error taxonomy for the message layer.
//!
//! Plain enums, manually `Display`ed, matching the teacher's
//! `kwap_msg::{OptParseError, MessageParseError}` shape rather than reaching
//! for an error-derive crate.

use core::fmt;

/// Failure constructing an option value (argument validation, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptConstructError {
    /// The value's packed length falls outside the option's declared bounds.
    LengthOutOfBounds { number: u16, min: usize, max: usize, actual: usize },
    /// A numeric value (e.g. Content-Type, Max-Age) exceeds its declared range.
    ValueOutOfRange { number: u16, max: u64, actual: u64 },
    /// Uri-Path/Location values may not start with `/`.
    LeadingSlash { number: u16 },
    /// A Block option's size exponent fell outside `[4, 11]`.
    BlockSizeExponentOutOfRange { actual: u8 },
}

impl fmt::Display for OptConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::LengthOutOfBounds { number, min, max, actual } => {
                write!(f, "option {number}: value length {actual} outside [{min}, {max}]")
            },
            | Self::ValueOutOfRange { number, max, actual } => {
                write!(f, "option {number}: value {actual} exceeds max {max}")
            },
            | Self::LeadingSlash { number } => write!(f, "option {number}: value may not start with '/'"),
            | Self::BlockSizeExponentOutOfRange { actual } => {
                write!(f, "block size exponent {actual} outside [4, 11]")
            },
        }
    }
}

impl std::error::Error for OptConstructError {}

/// Failure decoding an option stream (§4.2, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptDecodeError {
    /// Ran out of bytes while reading a header, extended length, or value.
    UnexpectedEndOfStream,
    /// A critical (odd-numbered) option was not recognized by the registry.
    UnrecognizedCritical { number: u16, value: Vec<u8> },
    /// A recognized option's value failed its own construction validation.
    Invalid(OptConstructError),
}

impl fmt::Display for OptDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::UnexpectedEndOfStream => write!(f, "unexpected end of option stream"),
            | Self::UnrecognizedCritical { number, value } => {
                write!(f, "unrecognized critical option {number} ({} byte value)", value.len())
            },
            | Self::Invalid(e) => write!(f, "invalid option value: {e}"),
        }
    }
}

impl std::error::Error for OptDecodeError {}

impl From<OptConstructError> for OptDecodeError {
    fn from(e: OptConstructError) -> Self {
        Self::Invalid(e)
    }
}

/// Failure encoding an option stream (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptEncodeError {
    /// A single option's packed value length would exceed 270 octets.
    ValueTooLong { number: u16, actual: usize },
}

impl fmt::Display for OptEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::ValueTooLong { number, actual } => {
                write!(f, "option {number}: packed length {actual} exceeds the 270-octet maximum")
            },
        }
    }
}

impl std::error::Error for OptEncodeError {}

/// Failure decoding a packet into a [`crate::Message`] (§4.3, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDecodeError {
    /// Fewer than 4 header octets were supplied.
    UnexpectedEndOfStream,
    /// The high two bits of byte 0 were not `01` (version 1).
    UnsupportedVersion(u8),
    /// Failure decoding the option stream.
    Opt(OptDecodeError),
}

impl fmt::Display for MessageDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::UnexpectedEndOfStream => write!(f, "packet shorter than the 4-octet fixed header"),
            | Self::UnsupportedVersion(v) => write!(f, "unsupported protocol version {v}"),
            | Self::Opt(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MessageDecodeError {}

impl From<OptDecodeError> for MessageDecodeError {
    fn from(e: OptDecodeError) -> Self {
        Self::Opt(e)
    }
}

/// Failure encoding a [`crate::Message`] into a packet (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEncodeError {
    /// The option-stream entry count (including fence-posts) would overflow
    /// the header's 4-bit count field. See SPEC_FULL.md REDESIGN FLAGS #1.
    TooManyOptions(usize),
    /// An option's packed value was too long to encode.
    Opt(OptEncodeError),
}

impl fmt::Display for MessageEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::TooManyOptions(n) => write!(f, "{n} option-stream entries exceed the 14-entry header limit"),
            | Self::Opt(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MessageEncodeError {}

impl From<OptEncodeError> for MessageEncodeError {
    fn from(e: OptEncodeError) -> Self {
        Self::Opt(e)
    }
}

/// Failure decoding an `application/link-format` body (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecodeError {
    /// Expected an angle-bracket-quoted URI reference and didn't find one.
    ExpectedUri,
    /// Expected a parameter name token after `;`.
    ExpectedParamName,
    /// A parameter declared `=value` but the value didn't match its shape.
    ExpectedParamValue { param: String },
    /// A double-quoted value was opened with `"` but never closed.
    UnterminatedValue,
}

impl fmt::Display for LinkDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::ExpectedUri => write!(f, "expected `<uri-reference>`"),
            | Self::ExpectedParamName => write!(f, "expected a parameter name"),
            | Self::ExpectedParamValue { param } => write!(f, "expected a value for parameter `{param}`"),
            | Self::UnterminatedValue => write!(f, "quoted value is missing its closing `\"`"),
        }
    }
}

impl std::error::Error for LinkDecodeError {}

/// Attempted to add an option number that is already present on the message.
///
/// See SPEC_FULL.md REDESIGN FLAGS #4 (multi-instance options).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateOption(pub u16);

impl fmt::Display for DuplicateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option {} is already present on this message", self.0)
    }
}

impl std::error::Error for DuplicateOption {}

/// Failure assembling a [`crate::message::MessageBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBuildError {
    Option(OptConstructError),
    Duplicate(DuplicateOption),
}

impl fmt::Display for MessageBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::Option(e) => write!(f, "{e}"),
            | Self::Duplicate(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MessageBuildError {}

impl From<OptConstructError> for MessageBuildError {
    fn from(e: OptConstructError) -> Self {
        Self::Option(e)
    }
}

impl From<DuplicateOption> for MessageBuildError {
    fn from(e: DuplicateOption) -> Self {
        Self::Duplicate(e)
    }
}
