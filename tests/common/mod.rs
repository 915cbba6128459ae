//! Shared fakes for integration tests.
//!
//! - `FakePin`s on a shared address bus, read back by `FakeAdc`
//! - `FakeDelay` counting requested microseconds
//! - `MemoryStore`: in-RAM `BlobStore` with failure injection
//! - `RecordingHid`: keeps every report

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use onion_controller::config::{BlobHandle, BlobStore, NvsError};
use onion_controller::hal::{AnalogInput, Mux};
use onion_controller::{
    ChannelSampler, ControllerState, HidTransport, KeyboardReport, TouchScanner, CHANNEL_COUNT,
};

// --- Mux / ADC ---

/// Address lines as the multiplexer sees them.
#[derive(Clone, Default)]
pub struct AddressBus(Rc<Cell<u8>>);

impl AddressBus {
    pub fn address(&self) -> u8 {
        self.0.get()
    }
}

pub struct FakePin {
    bus: AddressBus,
    bit: u8,
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        let bus = &self.bus.0;
        bus.set(bus.get() & !(1 << self.bit));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let bus = &self.bus.0;
        bus.set(bus.get() | (1 << self.bit));
        Ok(())
    }
}

pub fn fake_mux(bus: &AddressBus) -> Mux<FakePin> {
    Mux::new([0, 1, 2, 3].map(|bit| FakePin { bus: bus.clone(), bit }))
}

/// Analog levels per channel; the channel is whatever the bus selects.
#[derive(Clone)]
pub struct Levels {
    inner: Rc<RefCell<LevelsInner>>,
}

struct LevelsInner {
    levels: [u16; CHANNEL_COUNT],
    /// Per-conversion overrides, consumed first.
    queued: [VecDeque<u16>; CHANNEL_COUNT],
    conversions: usize,
}

impl Levels {
    pub fn new(level: u16) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LevelsInner {
                levels: [level; CHANNEL_COUNT],
                queued: Default::default(),
                conversions: 0,
            })),
        }
    }

    pub fn set(&self, channel: usize, level: u16) {
        self.inner.borrow_mut().levels[channel] = level;
    }

    pub fn set_all(&self, level: u16) {
        self.inner.borrow_mut().levels = [level; CHANNEL_COUNT];
    }

    /// Exact values for the next conversions on `channel`.
    pub fn queue(&self, channel: usize, values: &[u16]) {
        self.inner.borrow_mut().queued[channel].extend(values.iter().copied());
    }

    pub fn conversions(&self) -> usize {
        self.inner.borrow().conversions
    }
}

pub struct FakeAdc {
    bus: AddressBus,
    levels: Levels,
}

impl AnalogInput for FakeAdc {
    fn read_raw(&mut self) -> u16 {
        let channel = self.bus.address() as usize;
        let mut inner = self.levels.inner.borrow_mut();
        inner.conversions += 1;
        match inner.queued[channel].pop_front() {
            Some(value) => value,
            None => inner.levels[channel],
        }
    }
}

/// Busy-wait stand-in that only counts.
#[derive(Clone, Default)]
pub struct FakeDelay(Rc<Cell<u64>>);

impl FakeDelay {
    pub fn total_ns(&self) -> u64 {
        self.0.get()
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns));
    }
}

pub type FakeSampler = ChannelSampler<FakePin, FakeAdc, FakeDelay>;
pub type FakeScanner<'a> = TouchScanner<'a, FakePin, FakeAdc, FakeDelay>;

/// Handles to observe and drive a fake front end.
pub struct Rig {
    pub bus: AddressBus,
    pub levels: Levels,
    pub delay: FakeDelay,
}

impl Rig {
    /// Every channel idles at `level`.
    pub fn new(level: u16) -> Self {
        Self {
            bus: AddressBus::default(),
            levels: Levels::new(level),
            delay: FakeDelay::default(),
        }
    }

    pub fn sampler(&self) -> FakeSampler {
        let adc = FakeAdc { bus: self.bus.clone(), levels: self.levels.clone() };
        ChannelSampler::new(fake_mux(&self.bus), adc, self.delay.clone())
    }

    pub fn scanner<'a>(&self, state: &'a ControllerState) -> FakeScanner<'a> {
        TouchScanner::new(self.sampler(), state)
    }
}

// --- Storage ---

#[derive(Default)]
pub struct StoreInner {
    pub blobs: HashMap<(String, String), Vec<u8>>,
    pub opens: usize,
    pub writes: usize,
    pub commits: usize,
    pub fail_open: Option<i32>,
    pub fail_read: Option<i32>,
    pub fail_write: Option<i32>,
    pub fail_commit: Option<i32>,
}

/// In-RAM NVS. Clones share contents, like reopening the same partition.
#[derive(Clone, Default)]
pub struct MemoryStore(pub Rc<RefCell<StoreInner>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.0.borrow().blobs.get(&(namespace.into(), key.into())).cloned()
    }

    pub fn put(&self, namespace: &str, key: &str, data: &[u8]) {
        self.0.borrow_mut().blobs.insert((namespace.into(), key.into()), data.to_vec());
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes
    }

    pub fn commits(&self) -> usize {
        self.0.borrow().commits
    }

    pub fn inner(&self) -> std::cell::RefMut<'_, StoreInner> {
        self.0.borrow_mut()
    }
}

pub struct MemoryHandle {
    store: MemoryStore,
    namespace: String,
}

impl BlobStore for MemoryStore {
    type Handle = MemoryHandle;

    fn open(&mut self, namespace: &str) -> Result<MemoryHandle, NvsError> {
        let mut inner = self.0.borrow_mut();
        if let Some(code) = inner.fail_open {
            return Err(NvsError::OpenFailed(code));
        }
        inner.opens += 1;
        Ok(MemoryHandle { store: self.clone(), namespace: namespace.into() })
    }
}

impl BlobHandle for MemoryHandle {
    fn read_blob<'b>(&mut self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, NvsError> {
        let inner = self.store.0.borrow();
        if let Some(code) = inner.fail_read {
            return Err(NvsError::ReadFailed(code));
        }
        match inner.blobs.get(&(self.namespace.clone(), key.into())) {
            None => Ok(None),
            Some(data) if data.len() > buf.len() => Err(NvsError::ReadFailed(-1)),
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                Ok(Some(&buf[..data.len()]))
            }
        }
    }

    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), NvsError> {
        let mut inner = self.store.0.borrow_mut();
        if let Some(code) = inner.fail_write {
            return Err(NvsError::WriteFailed(code));
        }
        inner.writes += 1;
        inner.blobs.insert((self.namespace.clone(), key.into()), data.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NvsError> {
        let mut inner = self.store.0.borrow_mut();
        if let Some(code) = inner.fail_commit {
            return Err(NvsError::CommitFailed(code));
        }
        inner.commits += 1;
        Ok(())
    }
}

// --- HID ---

#[derive(Clone, Default)]
pub struct RecordingHid {
    pub reports: Rc<RefCell<Vec<KeyboardReport>>>,
    pub fail: Rc<Cell<bool>>,
}

impl RecordingHid {
    pub fn sent(&self) -> Vec<[u8; 8]> {
        self.reports.borrow().iter().map(|r| r.0).collect()
    }
}

impl HidTransport for RecordingHid {
    type Error = &'static str;

    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), &'static str> {
        if self.fail.get() {
            return Err("link busy");
        }
        self.reports.borrow_mut().push(*report);
        Ok(())
    }
}

// --- Output ---

/// Lines of protocol output, terminators stripped.
pub fn lines(out: &str) -> Vec<&str> {
    out.lines().collect()
}
