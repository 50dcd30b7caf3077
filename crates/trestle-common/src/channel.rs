//! Channel naming rules.
//!
//! A channel is a named one-way message path from content to host. Names
//! containing the reserved `trestle` prefix belong to the bridge itself;
//! the four console channels below are always subscribed and carry
//! forwarded `console.*` output.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;

/// Reserved name fragment. Host applications may not register channels
/// whose name contains it.
pub const RESERVED_PREFIX: &str = "trestle";

/// Built-in console-forwarding channels, one per console level.
pub const LOG_CHANNELS: [&str; 4] = [
    "trestlelog",
    "trestledebug",
    "trestleerror",
    "trestleinfo",
];

/// Console level carried by a reserved log channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Debug,
    Error,
    Info,
}

impl ConsoleLevel {
    /// The reserved channel name that carries this level.
    pub fn channel(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "trestlelog",
            ConsoleLevel::Debug => "trestledebug",
            ConsoleLevel::Error => "trestleerror",
            ConsoleLevel::Info => "trestleinfo",
        }
    }

    /// Map an inbound channel name back to a console level, if it is one
    /// of the reserved log channels.
    pub fn from_channel(name: &str) -> Option<Self> {
        match name {
            "trestlelog" => Some(ConsoleLevel::Log),
            "trestledebug" => Some(ConsoleLevel::Debug),
            "trestleerror" => Some(ConsoleLevel::Error),
            "trestleinfo" => Some(ConsoleLevel::Info),
            _ => None,
        }
    }
}

/// A validated, host-registerable channel name.
///
/// Construction rejects empty names and names containing the reserved
/// prefix, so a `ChannelName` held by the registry is known-good.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Result<Self, RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName(name));
        }
        if name.contains(RESERVED_PREFIX) {
            return Err(RegistryError::ReservedName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for ChannelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
