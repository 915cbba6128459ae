//! Log rings for the controller tasks.
//!
//! ```text
//! scan task ──┐                          ┌──▶ UART1 TX
//!             ├─ rt_log!() ─▶ LogStream ─┤    (logger task)
//! comms task ─┘   format +    lock-free  └─ drain, may block
//!                 copy only
//! ```
//!
//! A producer formats into a stack buffer and copies it into a ring slot.
//! It never waits: when the ring is full the message is counted and lost.
//! Messages more verbose than a stream's level are skipped before
//! formatting.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Longest message kept; the rest is cut.
pub const MAX_MSG_LEN: usize = 120;

/// Ring capacity of the global streams.
pub const LOG_BUFFER_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

/// One drained message.
#[derive(Clone, Copy)]
pub struct LogEntry {
    timestamp_us: i64,
    level: LogLevel,
    len: u8,
    msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const BLANK: LogEntry = LogEntry {
        timestamp_us: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    fn fill(&mut self, timestamp_us: i64, level: LogLevel, msg: &[u8]) {
        let len = msg.len().min(MAX_MSG_LEN);
        self.timestamp_us = timestamp_us;
        self.level = level;
        self.len = len as u8;
        self.msg[..len].copy_from_slice(&msg[..len]);
    }

    /// Microseconds since boot at the call site.
    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Message text; a cut inside a multi-byte character shows as a marker.
    pub fn message(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<cut>")
    }
}

/// Bounded multi-producer, single-consumer message ring.
///
/// A producer reserves a slot by advancing `write_idx` with a
/// compare-exchange, fills it, then raises the slot's `ready` flag. The
/// consumer only takes the slot at `read_idx` once its flag is up, so a
/// slot still being written holds back everything behind it.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: UnsafeCell<[LogEntry; N]>,
    ready: [AtomicBool; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    level: AtomicU8,
}

// SAFETY: a slot is written only by the producer that reserved it and read
// only by the single consumer after `ready` publishes it.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Empty ring recording `Info` and more severe.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "ring size must be a power of two");

        #[allow(clippy::declare_interior_mutable_const)]
        const IDLE: AtomicBool = AtomicBool::new(false);

        Self {
            slots: UnsafeCell::new([LogEntry::BLANK; N]),
            ready: [IDLE; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Most verbose level still recorded.
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level()
    }

    /// Queue a message without blocking.
    ///
    /// `false` if the level filtered it or the ring was full.
    pub fn push(&self, timestamp_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        if !self.enabled(level) {
            return false;
        }

        let mut claim = self.write_idx.load(Ordering::Relaxed);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if claim.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match self.write_idx.compare_exchange_weak(
                claim,
                claim.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => claim = current,
            }
        }

        let slot = claim as usize & Self::MASK;
        // SAFETY: reserved for this producer alone; the consumer moved
        // read_idx past it before it could be reserved again.
        unsafe { (*self.slots.get())[slot].fill(timestamp_us, level, msg) };
        self.ready[slot].store(true, Ordering::Release);
        true
    }

    /// Take the oldest published message. Logger task only.
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        if read == self.write_idx.load(Ordering::Acquire) {
            return None;
        }

        let slot = read as usize & Self::MASK;
        if !self.ready[slot].load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: published through `ready`; only this consumer reads slots
        let entry = unsafe { (*self.slots.get())[slot] };
        self.ready[slot].store(false, Ordering::Relaxed);
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Messages lost to a full ring since the last reset.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Reserved slots not yet drained.
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        self.write_idx.load(Ordering::Acquire).wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// `fmt::Write` into a fixed byte buffer, cutting what does not fit.
pub struct BufWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BufWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }
}

impl fmt::Write for BufWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let n = s.len().min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + n].copy_from_slice(&s.as_bytes()[..n]);
        self.pos += n;
        Ok(())
    }
}

/// Render `args` into `buf`, returning the bytes used.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: fmt::Arguments<'_>) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = fmt::write(&mut writer, args);
    writer.len()
}

/// Log to a stream without blocking.
///
/// ```ignore
/// rt_log!(LogLevel::Info, SCAN_LOG_STREAM, uptime_us(), "ch {} pressed", ch);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let level = $level;
        if $stream.enabled(level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            $stream.push($timestamp, level, &buf[..len]);
        }
    }};
}

#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_debug {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Debug, $stream, $timestamp, $($arg)*)
    };
}
