//! Multiplexer channel index.

/// Number of multiplexer channels (and key slots).
pub const CHANNEL_COUNT: usize = 16;

/// A validated multiplexer channel, 0..=15.
///
/// Every per-channel table in the crate is indexed by position, so the
/// only way to name a slot is through this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Build a channel, rejecting anything outside the 4-bit address space.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// All channels in ascending order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT as u8).map(Channel)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Multiplexer address bits (S0 is bit 0).
    #[inline]
    pub const fn address(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
