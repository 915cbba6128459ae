//! Command line parser
//!
//! `CONNECT`, `DISCONNECT`, `SET:<ch>,<threshold>,<keycode>`.

use super::ProtocolError;
use crate::channel::Channel;

pub const CMD_CONNECT: &str = "CONNECT";
pub const CMD_DISCONNECT: &str = "DISCONNECT";
pub const PREFIX_SET: &str = "SET:";
pub const PREFIX_CFG: &str = "CFG:";
pub const PREFIX_RAW: &str = "RAW:";

/// Inbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Set {
        channel: Channel,
        threshold: u16,
        keycode: u8,
    },
}

/// Parse one complete line (terminator already stripped)
pub fn parse_line(line: &str) -> Result<Command, ProtocolError> {
    if line == CMD_CONNECT {
        return Ok(Command::Connect);
    }
    if line == CMD_DISCONNECT {
        return Ok(Command::Disconnect);
    }

    let args = line.strip_prefix(PREFIX_SET).ok_or(ProtocolError::UnknownCommand)?;
    let mut fields = args.split(',');
    let (Some(ch), Some(thr), Some(key), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ProtocolError::FieldCount);
    };

    let channel: i32 = parse_field(ch).ok_or(ProtocolError::InvalidValue)?;
    let channel = u8::try_from(channel)
        .ok()
        .and_then(Channel::new)
        .ok_or(ProtocolError::ChannelOutOfRange)?;
    let threshold = parse_field(thr).ok_or(ProtocolError::InvalidValue)?;
    let keycode = parse_field(key).ok_or(ProtocolError::InvalidValue)?;

    Ok(Command::Set { channel, threshold, keycode })
}

fn parse_field<T: core::str::FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}
