//! Protocol version handling.

use std::fmt;

/// The JSON-RPC protocol version of a message.
///
/// Version 1 messages carry no `"jsonrpc"` key at all; version 2 messages
/// carry `"jsonrpc":"2.0"`. Anything else is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    V1,
    #[default]
    V2,
}

impl Version {
    /// The wire tag of a version 2 message.
    pub const WIRE_V2: &'static str = "2.0";

    /// Maps the optional `"jsonrpc"` field to a version. `None` means the
    /// field was absent (version 1); an unrecognized tag yields `None`.
    pub fn from_wire(tag: Option<&str>) -> Option<Version> {
        match tag {
            None => Some(Version::V1),
            Some(tag) if tag == Self::WIRE_V2 => Some(Version::V2),
            Some(_) => None,
        }
    }

    /// The value of the `"jsonrpc"` field, if the version carries one.
    pub fn wire_tag(self) -> Option<&'static str> {
        match self {
            Version::V1 => None,
            Version::V2 => Some(Self::WIRE_V2),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V1 => write!(f, "1.0"),
            Version::V2 => write!(f, "2.0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tag_mapping() {
        assert_eq!(Version::from_wire(None), Some(Version::V1));
        assert_eq!(Version::from_wire(Some("2.0")), Some(Version::V2));
        assert_eq!(Version::from_wire(Some("1.5")), None);
        assert_eq!(Version::V1.wire_tag(), None);
        assert_eq!(Version::V2.wire_tag(), Some("2.0"));
    }
}
