//! Module: config
//!
//! Purpose: Configuration system for OnionController.
//!
//! Architecture:
//! - board.rs: compile-time pin map and pipeline timing
//! - keymap.rs: the 16-slot key/threshold table (runtime config)
//! - nvs.rs: blob persistence of the keymap
//!
//! Safety: keymap fields are atomics; multi-field updates and table
//! snapshots run inside a critical section.

pub mod board;
pub mod keymap;
pub mod nvs;

pub use board::BoardConfig;
pub use keymap::{KeyEntry, Keymap, DEFAULT_KEYCODES, DEFAULT_THRESHOLD};
pub use nvs::{
    BlobHandle, BlobStore, KeymapStore, LoadResult, NvsError,
    BLOB_LEN, NVS_KEY_KEYMAP, NVS_NAMESPACE,
};
