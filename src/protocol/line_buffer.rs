//! Line accumulator for protocol input

/// Buffer size including the terminator slot
pub const LINE_SIZE: usize = 128;

/// Longest line that can be held
pub const LINE_MAX: usize = LINE_SIZE - 1;

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Byte stored, line not finished
    Pending,
    /// `\r` or `\n`: the buffered line is complete
    Terminated,
    /// Buffer full: the buffered line is complete and the byte was discarded
    Overflow,
}

/// Line input buffer
pub struct LineBuffer {
    buf: [u8; LINE_MAX],
    len: usize,
}

impl LineBuffer {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; LINE_MAX],
            len: 0,
        }
    }

    /// Feed one input byte
    ///
    /// After `Terminated` or `Overflow` the caller reads the line and
    /// calls [`clear`](Self::clear).
    pub fn feed(&mut self, byte: u8) -> Feed {
        match byte {
            b'\r' | b'\n' => Feed::Terminated,
            _ if self.len >= LINE_MAX => Feed::Overflow,
            _ => {
                self.buf[self.len] = byte;
                self.len += 1;
                Feed::Pending
            }
        }
    }

    /// Clear buffer
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Buffered line as text, `None` if it is not valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Get buffer length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
