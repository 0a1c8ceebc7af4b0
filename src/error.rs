use std::fmt;

use crate::addr::AddrError;

/// Errors the dispatcher can encounter while serving one message.
///
/// Only `ChannelClosed` is fatal; everything else is absorbed at the
/// dispatcher boundary and logged.
#[derive(Debug)]
pub enum RouterError {
    Malformed(String),
    Addr(AddrError),
    UnknownNeighbor(String),
    ChannelClosed(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouterError::Malformed(reason) => write!(f, "malformed message: {}", reason),
            RouterError::Addr(err) => write!(f, "{}", err),
            RouterError::UnknownNeighbor(name) => write!(f, "unknown neighbor '{}'", name),
            RouterError::ChannelClosed(name) => write!(f, "channel to '{}' closed", name),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<AddrError> for RouterError {
    fn from(err: AddrError) -> Self {
        RouterError::Addr(err)
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::Malformed(err.to_string())
    }
}
