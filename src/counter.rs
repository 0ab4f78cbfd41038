//! Virtual wide counter
//!
//! Extends a `BITS` wide hardware counter to 16 bits by counting its overflow
//! events in software. The composite value is
//! `(overflows << BITS) | hardware_count`.

/// Software overflow count of a `BITS` wide hardware counter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WideCounter<const BITS: u32> {
    overflows: u16,
}

impl<const BITS: u32> WideCounter<BITS> {
    /// Mask selecting the bits the hardware counter contributes
    pub const COUNT_MASK: u32 = (1 << BITS) - 1;

    pub const fn new() -> Self {
        Self { overflows: 0 }
    }

    /// Forgets all overflows, called at the start of a pulse
    pub fn reset(&mut self) {
        self.overflows = 0;
    }

    /// Records one hardware counter wrap
    #[inline(always)]
    pub fn overflow(&mut self) {
        self.overflows = self.overflows.saturating_add(1);
    }

    pub const fn overflows(&self) -> u16 {
        self.overflows
    }

    /// Combines the overflow count with the hardware counter value.
    ///
    /// Saturates at `u16::MAX` once the pulse is longer than the virtual
    /// counter can represent.
    pub fn compose(&self, count: u16) -> u16 {
        let wide = ((self.overflows as u32) << BITS) | (count as u32 & Self::COUNT_MASK);
        match u16::try_from(wide) {
            Ok(ticks) => ticks,
            Err(_) => u16::MAX,
        }
    }
}
