//! Keymap: per-channel keycode, touch threshold and debounced state.
//!
//! Field ownership: the scan task writes `pressed`, the protocol task writes
//! `threshold` and `keycode`. Readers of a whole table (persistence,
//! `CFG:` dump) go through [`Keymap::snapshot`].

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use crate::channel::{Channel, CHANNEL_COUNT};

/// Touch threshold applied to every channel until configured.
pub const DEFAULT_THRESHOLD: u16 = 3900;

/// Factory keycodes, by channel.
///
/// W S A D, Space, E H G, Q Tab, Right Left Up Down, 2, Escape.
pub const DEFAULT_KEYCODES: [u8; CHANNEL_COUNT] = [
    0x1A, 0x16, 0x04, 0x07, 0x2C, 0x08, 0x0B, 0x0A,
    0x14, 0x2B, 0x4F, 0x50, 0x52, 0x51, 0x1F, 0x29,
];

/// One keymap slot as plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEntry {
    /// HID usage ID sent for this channel.
    pub keycode: u8,
    /// Raw readings below this level count as touched.
    pub threshold: u16,
    /// Last reported state.
    pub pressed: bool,
}

impl KeyEntry {
    pub const fn new(keycode: u8, threshold: u16) -> Self {
        Self { keycode, threshold, pressed: false }
    }
}

struct KeySlot {
    keycode: AtomicU8,
    threshold: AtomicU16,
    pressed: AtomicBool,
}

impl KeySlot {
    const fn new(entry: KeyEntry) -> Self {
        Self {
            keycode: AtomicU8::new(entry.keycode),
            threshold: AtomicU16::new(entry.threshold),
            pressed: AtomicBool::new(entry.pressed),
        }
    }

    fn load(&self) -> KeyEntry {
        KeyEntry {
            keycode: self.keycode.load(Ordering::Relaxed),
            threshold: self.threshold.load(Ordering::Relaxed),
            pressed: self.pressed.load(Ordering::Relaxed),
        }
    }

    fn store(&self, entry: &KeyEntry) {
        self.keycode.store(entry.keycode, Ordering::Relaxed);
        self.threshold.store(entry.threshold, Ordering::Relaxed);
        self.pressed.store(entry.pressed, Ordering::Relaxed);
    }
}

/// The default table: factory keycodes, uniform threshold, all released.
pub const fn default_entries() -> [KeyEntry; CHANNEL_COUNT] {
    let mut entries = [KeyEntry::new(0, DEFAULT_THRESHOLD); CHANNEL_COUNT];
    let mut i = 0;
    while i < CHANNEL_COUNT {
        entries[i].keycode = DEFAULT_KEYCODES[i];
        i += 1;
    }
    entries
}

/// Shared 16-slot key table, one slot per channel, never reordered.
pub struct Keymap {
    slots: [KeySlot; CHANNEL_COUNT],
}

impl Keymap {
    /// Table holding the factory defaults.
    pub const fn new() -> Self {
        const EMPTY: KeySlot = KeySlot::new(KeyEntry::new(0, DEFAULT_THRESHOLD));
        let mut slots = [EMPTY; CHANNEL_COUNT];
        let defaults = default_entries();
        let mut i = 0;
        while i < CHANNEL_COUNT {
            slots[i] = KeySlot::new(defaults[i]);
            i += 1;
        }
        Self { slots }
    }

    #[inline]
    fn slot(&self, channel: Channel) -> &KeySlot {
        &self.slots[channel.index()]
    }

    pub fn get(&self, channel: Channel) -> KeyEntry {
        self.slot(channel).load()
    }

    #[inline]
    pub fn keycode(&self, channel: Channel) -> u8 {
        self.slot(channel).keycode.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn threshold(&self, channel: Channel) -> u16 {
        self.slot(channel).threshold.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pressed(&self, channel: Channel) -> bool {
        self.slot(channel).pressed.load(Ordering::Relaxed)
    }

    pub fn set_keycode(&self, channel: Channel, keycode: u8) {
        self.slot(channel).keycode.store(keycode, Ordering::Relaxed);
    }

    pub fn set_threshold(&self, channel: Channel, threshold: u16) {
        self.slot(channel).threshold.store(threshold, Ordering::Relaxed);
    }

    /// Debounced state; written by the edge detector only.
    pub fn set_pressed(&self, channel: Channel, pressed: bool) {
        self.slot(channel).pressed.store(pressed, Ordering::Relaxed);
    }

    /// Set threshold and keycode together, never observed half-applied by
    /// [`snapshot`](Self::snapshot).
    pub fn configure(&self, channel: Channel, threshold: u16, keycode: u8) {
        critical_section::with(|_| {
            let slot = self.slot(channel);
            slot.threshold.store(threshold, Ordering::Relaxed);
            slot.keycode.store(keycode, Ordering::Relaxed);
        });
    }

    /// Consistent copy of the whole table.
    pub fn snapshot(&self) -> [KeyEntry; CHANNEL_COUNT] {
        critical_section::with(|_| {
            let mut entries = [KeyEntry::new(0, 0); CHANNEL_COUNT];
            for (entry, slot) in entries.iter_mut().zip(self.slots.iter()) {
                *entry = slot.load();
            }
            entries
        })
    }

    /// Replace the whole table.
    pub fn restore(&self, entries: &[KeyEntry; CHANNEL_COUNT]) {
        critical_section::with(|_| {
            for (slot, entry) in self.slots.iter().zip(entries.iter()) {
                slot.store(entry);
            }
        });
    }

    /// Take keycodes and thresholds from `entries`; every channel starts
    /// released, whatever `pressed` says.
    pub fn restore_config(&self, entries: &[KeyEntry; CHANNEL_COUNT]) {
        critical_section::with(|_| {
            for (slot, entry) in self.slots.iter().zip(entries.iter()) {
                slot.store(&KeyEntry { pressed: false, ..*entry });
            }
        });
    }

    /// Back to factory defaults (in memory only).
    pub fn reset_defaults(&self) {
        self.restore(&default_entries());
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(n: u8) -> Channel {
        Channel::new(n).unwrap()
    }

    #[test]
    fn test_defaults() {
        let keymap = Keymap::new();
        for c in Channel::all() {
            let entry = keymap.get(c);
            assert_eq!(entry.keycode, DEFAULT_KEYCODES[c.index()]);
            assert_eq!(entry.threshold, DEFAULT_THRESHOLD);
            assert!(!entry.pressed);
        }
    }

    #[test]
    fn test_configure_only_touches_one_slot() {
        let keymap = Keymap::new();
        keymap.configure(ch(3), 1800, 0x04);

        assert_eq!(keymap.get(ch(3)), KeyEntry { keycode: 0x04, threshold: 1800, pressed: false });
        assert_eq!(keymap.get(ch(2)), KeyEntry::new(DEFAULT_KEYCODES[2], DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_snapshot_restore() {
        let keymap = Keymap::new();
        keymap.set_pressed(ch(7), true);
        keymap.set_threshold(ch(0), 10);

        let snap = keymap.snapshot();
        let other = Keymap::new();
        other.restore(&snap);
        assert_eq!(other.snapshot(), snap);

        other.reset_defaults();
        assert_eq!(other.snapshot(), default_entries());
    }

    #[test]
    fn test_restore_config_starts_released() {
        let mut entries = default_entries();
        entries[5] = KeyEntry { keycode: 0x2C, threshold: 2100, pressed: true };

        let keymap = Keymap::new();
        keymap.set_pressed(ch(9), true);
        keymap.restore_config(&entries);

        assert_eq!(keymap.get(ch(5)), KeyEntry::new(0x2C, 2100));
        assert!(!keymap.is_pressed(ch(9)));
    }
}
