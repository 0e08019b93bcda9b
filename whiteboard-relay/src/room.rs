//! Room names.
//!
//! A room is not a stored entity: it is the key that scopes broadcast
//! fan-out. The name is derived once, when a client connects, from the
//! request path with its leading `/` removed.

use std::fmt;

/// Name of the room a connection belongs to for its whole lifetime.
///
/// The empty string is a valid room (the default room reached via `/`),
/// distinct from every named room.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name from an already-stripped string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives the room name from a request path.
    ///
    /// Exactly one leading `/` is removed. Nothing else is interpreted:
    /// nested segments and percent-escapes stay part of the name.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        Self::new(path.strip_prefix('/').unwrap_or(path))
    }

    /// Returns the room name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the default (empty) room.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
