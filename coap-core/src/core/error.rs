//! Error types for the endpoint (§7). Manual enums and `Display` impls,
//! matching `kwap::core::error::Error` rather than reaching for an
//! error-derive crate.

use std::fmt;
use std::io;

use coap_msg::MessageEncodeError;

/// Failure queuing or transmitting a message.
#[derive(Debug)]
pub enum SendError {
    Io(io::Error),
    Encode(MessageEncodeError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::Io(e) => write!(f, "{e}"),
            | Self::Encode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SendError {}

impl From<io::Error> for SendError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<MessageEncodeError> for SendError {
    fn from(e: MessageEncodeError) -> Self {
        Self::Encode(e)
    }
}

/// A [`crate::core::ReceptionRecord`] was replied to more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyReplied;

impl fmt::Display for AlreadyReplied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "this reception record has already been replied to")
    }
}

impl std::error::Error for AlreadyReplied {}

/// Failure reading from or reacting to a replied message during a reply.
#[derive(Debug)]
pub enum ReplyError {
    AlreadyReplied(AlreadyReplied),
    Send(SendError),
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::AlreadyReplied(e) => write!(f, "{e}"),
            | Self::Send(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReplyError {}

impl From<AlreadyReplied> for ReplyError {
    fn from(e: AlreadyReplied) -> Self {
        Self::AlreadyReplied(e)
    }
}

impl From<SendError> for ReplyError {
    fn from(e: SendError) -> Self {
        Self::Send(e)
    }
}

/// Failure driving the event loop forward one step.
#[derive(Debug)]
pub enum ProcessError {
    Io(io::Error),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ProcessError {}

impl From<io::Error> for ProcessError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
