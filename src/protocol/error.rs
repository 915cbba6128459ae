//! Protocol rejection reasons
//!
//! The wire protocol has no negative acknowledgment; these only feed the log.

/// Why an inbound line was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// P01: Line matches no known command
    UnknownCommand,
    /// P02: `SET:` without exactly three fields
    FieldCount,
    /// P03: Field is not a decimal number of the right width
    InvalidValue,
    /// P04: Channel outside 0..15
    ChannelOutOfRange,
    /// P05: Line is not valid UTF-8
    InvalidEncoding,
}

impl ProtocolError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "P01",
            Self::FieldCount => "P02",
            Self::InvalidValue => "P03",
            Self::ChannelOutOfRange => "P04",
            Self::InvalidEncoding => "P05",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown command",
            Self::FieldCount => "expected 3 fields",
            Self::InvalidValue => "invalid value",
            Self::ChannelOutOfRange => "channel out of range",
            Self::InvalidEncoding => "invalid encoding",
        }
    }
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}
