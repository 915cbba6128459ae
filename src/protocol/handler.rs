//! Protocol state machine: bytes in, config changes and telemetry out

use core::fmt::Write;

use super::line_buffer::{Feed, LineBuffer};
use super::parser::{parse_line, Command, PREFIX_CFG, PREFIX_RAW};
use super::ProtocolError;
use crate::channel::{Channel, CHANNEL_COUNT};
use crate::config::{BlobStore, KeymapStore};
use crate::fault::FaultCode;
use crate::hal::uptime_us;
use crate::log_globals::COMMS_LOG_STREAM;
use crate::state::ControllerState;
use crate::{rt_debug, rt_info};

/// Protocol endpoint bound to the shared state and the keymap storage
pub struct ProtocolHandler<'a, S> {
    state: &'a ControllerState,
    store: KeymapStore<S>,
    line: LineBuffer,
}

impl<'a, S: BlobStore> ProtocolHandler<'a, S> {
    pub fn new(state: &'a ControllerState, store: KeymapStore<S>) -> Self {
        Self {
            state,
            store,
            line: LineBuffer::new(),
        }
    }

    /// One protocol tick: consume everything received, then emit one
    /// `RAW:` line if a tool is connected.
    pub fn tick(&mut self, input: &[u8], out: &mut dyn Write) {
        self.feed_bytes(input, out);
        if self.state.is_connected() {
            self.emit_telemetry(out);
        }
    }

    pub fn feed_bytes(&mut self, input: &[u8], out: &mut dyn Write) {
        for &byte in input {
            self.feed(byte, out);
        }
    }

    /// Process a single input byte, executing the line it completes
    pub fn feed(&mut self, byte: u8, out: &mut dyn Write) {
        match self.line.feed(byte) {
            Feed::Pending => {}
            Feed::Terminated | Feed::Overflow => {
                if !self.line.is_empty() {
                    let parsed = self
                        .line
                        .as_str()
                        .ok_or(ProtocolError::InvalidEncoding)
                        .and_then(parse_line);
                    match parsed {
                        Ok(cmd) => self.execute(cmd, out),
                        Err(e) => rt_debug!(COMMS_LOG_STREAM, uptime_us(), "line dropped: {}", e),
                    }
                }
                self.line.clear();
            }
        }
    }

    /// Execute a parsed command
    pub fn execute(&mut self, cmd: Command, out: &mut dyn Write) {
        match cmd {
            Command::Connect => {
                self.state.set_connected(true);
                rt_info!(COMMS_LOG_STREAM, uptime_us(), "Tool connected");
                self.emit_config(out);
            }
            Command::Disconnect => {
                self.state.set_connected(false);
                rt_info!(COMMS_LOG_STREAM, uptime_us(), "Tool disconnected");
            }
            Command::Set { channel, threshold, keycode } => {
                self.apply_set(channel, threshold, keycode);
            }
        }
    }

    fn apply_set(&mut self, channel: Channel, threshold: u16, keycode: u8) {
        let keymap = &self.state.keymap;
        keymap.configure(channel, threshold, keycode);
        rt_info!(
            COMMS_LOG_STREAM,
            uptime_us(),
            "ch {}: threshold={} keycode=0x{:02X}",
            channel,
            threshold,
            keycode
        );

        let faults = &self.state.faults;
        match self.store.save(keymap) {
            Ok(()) => {
                faults.clear_if(FaultCode::StorageWrite);
            }
            Err(e) => faults.set(e.fault_code(), e.fault_data()),
        }
    }

    /// `CFG:<ch>,<threshold>,<keycode>` for every channel, ascending
    pub fn emit_config(&self, out: &mut dyn Write) {
        let entries = self.state.keymap.snapshot();
        for (ch, entry) in entries.iter().enumerate() {
            let _ = write!(out, "{}{},{},{}\n", PREFIX_CFG, ch, entry.threshold, entry.keycode);
        }
    }

    /// `RAW:<v0>,...,<v15>`
    pub fn emit_telemetry(&self, out: &mut dyn Write) {
        let values = self.state.raw.snapshot();
        let _ = out.write_str(PREFIX_RAW);
        for (ch, value) in values.iter().enumerate() {
            let sep = if ch + 1 == CHANNEL_COUNT { "\n" } else { "," };
            let _ = write!(out, "{}{}", value, sep);
        }
    }
}
