//! # Pulse sample
//!
//! Single slot holding the width of the last completed pulse. The edge
//! interrupt is the only writer, the foreground reads it. The width is 16 bits
//! wide and not every target can load that in one instruction, so every access
//! goes through a critical section and a torn value can never be observed.

use core::cell::Cell;

use critical_section::Mutex;

/// Position of a reader in the stream of published samples
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    seen: u32,
}

impl Cursor {
    pub const fn new() -> Self {
        Self { seen: 0 }
    }
}

#[derive(Clone, Copy)]
struct Slot {
    ticks: u16,
    sequence: u32,
}

/// Latest completed pulse width, in timer ticks
pub struct PulseSample {
    slot: Mutex<Cell<Slot>>,
}

impl Default for PulseSample {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseSample {
    /// Empty sample, reads as zero until the first pulse completes
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(Slot {
                ticks: 0,
                sequence: 0,
            })),
        }
    }

    /// Replaces the sample. Only the edge handler publishes.
    pub(crate) fn publish(&self, ticks: u16) {
        critical_section::with(|cs| {
            let slot = self.slot.borrow(cs);
            let sequence = slot.get().sequence.wrapping_add(1);
            slot.set(Slot { ticks, sequence });
        });
    }

    /// Width of the most recently completed pulse
    pub fn read(&self) -> u16 {
        critical_section::with(|cs| self.slot.borrow(cs).get().ticks)
    }

    /// Number of pulses published so far (wrapping)
    pub fn sequence(&self) -> u32 {
        critical_section::with(|cs| self.slot.borrow(cs).get().sequence)
    }

    /// Returns the width only if a pulse completed since `cursor` last
    /// returned one. A stuck input line shows up as `None` here while
    /// [`read`](Self::read) keeps returning the stale width.
    pub fn read_fresh(&self, cursor: &mut Cursor) -> Option<u16> {
        let slot = critical_section::with(|cs| self.slot.borrow(cs).get());
        if slot.sequence == cursor.seen {
            return None;
        }
        cursor.seen = slot.sequence;
        Some(slot.ticks)
    }
}
