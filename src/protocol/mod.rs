//! Line-oriented configuration and telemetry protocol.
//!
//! ```text
//! in   CONNECT               tool attached, answer with 16 CFG lines
//! in   DISCONNECT            tool detached, telemetry stops
//! in   SET:<ch>,<thr>,<key>  update one slot, persist the table
//! out  CFG:<ch>,<thr>,<key>
//! out  RAW:<v0>,...,<v15>    once per tick while attached
//! ```
//!
//! Bad lines are dropped without reply. Zero heap allocation.

pub mod error;
pub mod handler;
pub mod line_buffer;
pub mod parser;

pub use error::ProtocolError;
pub use handler::ProtocolHandler;
pub use line_buffer::{Feed, LineBuffer, LINE_MAX, LINE_SIZE};
pub use parser::{parse_line, Command};
