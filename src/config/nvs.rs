//! NVS persistence for the keymap.
//!
//! The whole table is stored as one blob under a fixed namespace/key.
//! Every save rewrites and commits the full blob; there is no
//! per-entry persistence.
//!
//! # Blob layout
//!
//! 16 records of 6 bytes, channel order:
//!
//! ```text
//! [keycode, 0, threshold_lo, threshold_hi, pressed, 0]
//! ```
//!
//! This is the padded in-memory layout used by earlier firmware, so tables
//! provisioned by it load unchanged.

use crate::channel::CHANNEL_COUNT;
use crate::config::keymap::{KeyEntry, Keymap};
use crate::fault::FaultCode;
use crate::log_globals::COMMS_LOG_STREAM;
use crate::hal::uptime_us;
use crate::{rt_error, rt_info, rt_warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

/// NVS namespace for the controller configuration
pub const NVS_NAMESPACE: &str = "onion_storage";

/// NVS key of the keymap blob
pub const NVS_KEY_KEYMAP: &str = "onion_lut";

/// Bytes per serialized entry
pub const RECORD_LEN: usize = 6;

/// Size of the serialized keymap
pub const BLOB_LEN: usize = RECORD_LEN * CHANNEL_COUNT;

/// Load result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResult {
    /// Stored table loaded into memory
    Restored,
    /// Nothing stored yet; defaults were written to provision storage
    Provisioned,
}

/// NVS operation errors (raw `esp_err_t` codes where the backend has one)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvsError {
    /// Namespace could not be opened
    OpenFailed(i32),
    /// Blob read failed for a reason other than "not found"
    ReadFailed(i32),
    /// Stored blob has the wrong size
    Corrupt { expected: usize, found: usize },
    /// Blob write failed
    WriteFailed(i32),
    /// Commit failed
    CommitFailed(i32),
}

impl NvsError {
    /// Fault code recorded for this error.
    pub fn fault_code(&self) -> FaultCode {
        match self {
            NvsError::OpenFailed(_) => FaultCode::StorageOpen,
            NvsError::ReadFailed(_) => FaultCode::StorageRead,
            NvsError::Corrupt { .. } => FaultCode::StorageCorrupt,
            NvsError::WriteFailed(_) | NvsError::CommitFailed(_) => FaultCode::StorageWrite,
        }
    }

    /// Fault payload: the backend error code, or the bad blob size.
    pub fn fault_data(&self) -> u32 {
        match *self {
            NvsError::OpenFailed(code)
            | NvsError::ReadFailed(code)
            | NvsError::WriteFailed(code)
            | NvsError::CommitFailed(code) => code as u32,
            NvsError::Corrupt { found, .. } => found as u32,
        }
    }
}

impl core::fmt::Display for NvsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NvsError::OpenFailed(code) => write!(f, "open failed ({})", code),
            NvsError::ReadFailed(code) => write!(f, "read failed ({})", code),
            NvsError::Corrupt { expected, found } => {
                write!(f, "corrupt blob ({} bytes, expected {})", found, expected)
            }
            NvsError::WriteFailed(code) => write!(f, "write failed ({})", code),
            NvsError::CommitFailed(code) => write!(f, "commit failed ({})", code),
        }
    }
}

/// Non-volatile key/blob storage.
pub trait BlobStore {
    type Handle: BlobHandle;

    /// Open `namespace` read/write. Dropping the handle closes it.
    fn open(&mut self, namespace: &str) -> Result<Self::Handle, NvsError>;
}

/// An open namespace.
pub trait BlobHandle {
    /// Read `key` into `buf`; `Ok(None)` if the key does not exist.
    fn read_blob<'b>(&mut self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, NvsError>;

    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), NvsError>;

    fn commit(&mut self) -> Result<(), NvsError>;
}

/// Serialize a full table.
pub fn encode_table(entries: &[KeyEntry; CHANNEL_COUNT]) -> [u8; BLOB_LEN] {
    let mut blob = [0u8; BLOB_LEN];
    for (record, entry) in blob.chunks_exact_mut(RECORD_LEN).zip(entries.iter()) {
        let threshold = entry.threshold.to_le_bytes();
        record[0] = entry.keycode;
        record[2] = threshold[0];
        record[3] = threshold[1];
        record[4] = entry.pressed as u8;
    }
    blob
}

/// Deserialize a full table; `None` unless `blob` is exactly [`BLOB_LEN`] bytes.
pub fn decode_table(blob: &[u8]) -> Option<[KeyEntry; CHANNEL_COUNT]> {
    if blob.len() != BLOB_LEN {
        return None;
    }
    let mut entries = [KeyEntry::new(0, 0); CHANNEL_COUNT];
    for (entry, record) in entries.iter_mut().zip(blob.chunks_exact(RECORD_LEN)) {
        *entry = KeyEntry {
            keycode: record[0],
            threshold: u16::from_le_bytes([record[2], record[3]]),
            pressed: record[4] != 0,
        };
    }
    Some(entries)
}

/// Keymap persistence over a [`BlobStore`].
///
/// Owned by one task at a time; `&mut self` serializes storage access.
pub struct KeymapStore<S> {
    storage: S,
}

impl<S: BlobStore> KeymapStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load the stored table into `keymap`.
    ///
    /// A missing blob is provisioned from the current (default) table.
    /// On any error `keymap` is left untouched.
    pub fn load(&mut self, keymap: &Keymap) -> Result<LoadResult, NvsError> {
        let mut handle = self.storage.open(NVS_NAMESPACE).map_err(|e| {
            rt_warn!(COMMS_LOG_STREAM, uptime_us(), "NVS {}: keeping defaults", e);
            e
        })?;

        let mut buf = [0u8; BLOB_LEN];
        let stored = match handle.read_blob(NVS_KEY_KEYMAP, &mut buf) {
            Ok(stored) => stored,
            Err(e) => {
                rt_error!(COMMS_LOG_STREAM, uptime_us(), "NVS {}: keeping defaults", e);
                return Err(e);
            }
        };

        match stored {
            Some(blob) => {
                let entries = decode_table(blob).ok_or(NvsError::Corrupt {
                    expected: BLOB_LEN,
                    found: blob.len(),
                });
                match entries {
                    Ok(entries) => {
                        keymap.restore_config(&entries);
                        rt_info!(COMMS_LOG_STREAM, uptime_us(), "Keymap restored from NVS");
                        Ok(LoadResult::Restored)
                    }
                    Err(e) => {
                        rt_error!(COMMS_LOG_STREAM, uptime_us(), "NVS {}: keeping defaults", e);
                        Err(e)
                    }
                }
            }
            None => {
                rt_info!(COMMS_LOG_STREAM, uptime_us(), "No stored keymap, provisioning NVS");
                write_table(&mut handle, keymap)?;
                Ok(LoadResult::Provisioned)
            }
        }
    }

    /// Write the full table and commit. Not retried on failure.
    pub fn save(&mut self, keymap: &Keymap) -> Result<(), NvsError> {
        let result = self
            .storage
            .open(NVS_NAMESPACE)
            .and_then(|mut handle| write_table(&mut handle, keymap));

        match result {
            Ok(()) => rt_info!(COMMS_LOG_STREAM, uptime_us(), "Keymap saved"),
            Err(e) => rt_error!(COMMS_LOG_STREAM, uptime_us(), "Keymap save {}", e),
        }
        result
    }
}

fn write_table<H: BlobHandle>(handle: &mut H, keymap: &Keymap) -> Result<(), NvsError> {
    let blob = encode_table(&keymap.snapshot());
    handle.write_blob(NVS_KEY_KEYMAP, &blob)?;
    handle.commit()
}

/// Default NVS partition.
#[cfg(target_os = "espidf")]
pub struct EspBlobStore {
    partition: EspDefaultNvsPartition,
}

#[cfg(target_os = "espidf")]
impl EspBlobStore {
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        Self { partition }
    }
}

#[cfg(target_os = "espidf")]
impl BlobStore for EspBlobStore {
    type Handle = EspBlobHandle;

    fn open(&mut self, namespace: &str) -> Result<Self::Handle, NvsError> {
        EspNvs::new(self.partition.clone(), namespace, true)
            .map(EspBlobHandle)
            .map_err(|e| NvsError::OpenFailed(e.code()))
    }
}

/// Open NVS namespace; closed on drop.
#[cfg(target_os = "espidf")]
pub struct EspBlobHandle(EspNvs<NvsDefault>);

#[cfg(target_os = "espidf")]
impl BlobHandle for EspBlobHandle {
    fn read_blob<'b>(&mut self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, NvsError> {
        self.0.get_blob(key, buf).map_err(|e| NvsError::ReadFailed(e.code()))
    }

    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), NvsError> {
        self.0.set_blob(key, data).map_err(|e| NvsError::WriteFailed(e.code()))
    }

    fn commit(&mut self) -> Result<(), NvsError> {
        // EspNvs commits inside set_blob
        Ok(())
    }
}
