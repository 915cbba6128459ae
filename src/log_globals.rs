//! Global log stream instances, one per task.

use crate::logging::LogStream;

/// Scan task: transitions and HID dispatch.
pub static SCAN_LOG_STREAM: LogStream = LogStream::new();

/// Protocol task and startup: configuration, persistence, protocol input.
pub static COMMS_LOG_STREAM: LogStream = LogStream::new();
