//! Last-fault record.
//!
//! Nothing in the pipeline is fatal: storage and dispatch failures degrade
//! to defaults or dropped output and the scan keeps running. The record
//! keeps the most recent failure and a running count for diagnostics.

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;

/// What failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    None = 0,
    /// Namespace could not be opened; defaults in use.
    StorageOpen = 1,
    /// Blob read failed; defaults in use.
    StorageRead = 2,
    /// Stored blob has the wrong size; defaults in use.
    StorageCorrupt = 3,
    /// Write or commit failed; the change lives in RAM only.
    StorageWrite = 4,
    /// HID transport refused a report.
    ReportDropped = 5,
}

impl FaultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::StorageOpen => "storage open",
            FaultCode::StorageRead => "storage read",
            FaultCode::StorageCorrupt => "storage corrupt",
            FaultCode::StorageWrite => "storage write",
            FaultCode::ReportDropped => "report dropped",
        }
    }
}

#[derive(Clone, Copy)]
struct Record {
    active: bool,
    code: FaultCode,
    data: u32,
}

/// Shared fault record, written by whichever task hit the failure.
///
/// Code, payload and active flag change together under a critical section
/// so a reader never pairs one fault's code with another's payload.
///
/// ```ignore
/// if let Err(e) = store.save(&state.keymap) {
///     state.faults.set(e.fault_code(), e.fault_data());
/// }
/// ```
pub struct FaultState {
    last: Mutex<Cell<Record>>,
    /// Faults since boot, never cleared.
    count: AtomicU32,
}

impl FaultState {
    pub const fn new() -> Self {
        Self {
            last: Mutex::new(Cell::new(Record {
                active: false,
                code: FaultCode::None,
                data: 0,
            })),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault, replacing the previous one.
    pub fn set(&self, code: FaultCode, data: u32) {
        critical_section::with(|cs| {
            self.last.borrow(cs).set(Record { active: true, code, data });
        });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.record().active
    }

    /// Code of the last fault, kept after [`clear`](Self::clear).
    #[inline]
    pub fn code(&self) -> FaultCode {
        self.record().code
    }

    /// Payload of the last fault; meaning depends on the code.
    #[inline]
    pub fn data(&self) -> u32 {
        self.record().data
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Drop the active flag, keeping code, payload and count.
    pub fn clear(&self) {
        critical_section::with(|cs| {
            let cell = self.last.borrow(cs);
            cell.set(Record { active: false, ..cell.get() });
        });
    }

    /// Clear only if the active fault has `code`.
    ///
    /// Returns true if it cleared something.
    pub fn clear_if(&self, code: FaultCode) -> bool {
        critical_section::with(|cs| {
            let cell = self.last.borrow(cs);
            let record = cell.get();
            if !record.active || record.code != code {
                return false;
            }
            cell.set(Record { active: false, ..record });
            true
        })
    }

    pub fn snapshot(&self) -> FaultSnapshot {
        let record = self.record();
        FaultSnapshot {
            active: record.active,
            code: record.code,
            data: record.data,
            count: self.count(),
        }
    }

    fn record(&self) -> Record {
        critical_section::with(|cs| self.last.borrow(cs).get())
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}

impl fmt::Display for FaultSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return f.write_str("no faults");
        }
        write!(
            f,
            "{} ({}) data={} count={}",
            self.code.as_str(),
            if self.active { "active" } else { "cleared" },
            self.data,
            self.count
        )
    }
}
