//! # Capture hardware
//!
//! The pulse capture logic only ever touches the peripherals through the
//! [`CaptureHardware`] trait: one edge-triggered input line and one small
//! free-running counter with an overflow flag. The chip bindings implement it
//! on top of real registers, [`crate::sim::SimHardware`] implements it in
//! software.

/// Logic level of the input line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Which input transitions raise the edge interrupt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeSense {
    /// Only low to high transitions
    RisingOnly,
    /// Every transition (toggle detection)
    AnyEdge,
}

bitflags::bitflags! {
    /// Interrupt sources of the capture peripheral
    pub struct Interrupt: u8 {
        /// Input line transition
        const EDGE = 1 << 0;
        /// Hardware counter wrapped around
        const OVERFLOW = 1 << 1;
    }
}

/// Named control points of an edge-triggered input plus a short hardware
/// counter.
pub trait CaptureHardware {
    /// Width of the hardware counter in bits. The counter counts
    /// `0..(1 << COUNTER_BITS)` and flags an overflow when it wraps.
    const COUNTER_BITS: u32;

    /// Enables the given interrupt sources
    fn listen(&mut self, interrupts: Interrupt);

    /// Selects which input transitions raise the edge interrupt
    fn set_edge_sense(&mut self, sense: EdgeSense);

    /// Samples the input line
    fn input_level(&mut self) -> Level;

    /// Current hardware counter value
    fn read_count(&self) -> u16;

    /// Sets the hardware counter back to zero
    fn reset_count(&mut self);

    /// Starts (`true`) or stops (`false`) the hardware counter
    fn enable_counter(&mut self, enable: bool);

    fn is_counter_enabled(&self) -> bool;

    /// Reads the counter overflow flag, whether or not the overflow
    /// interrupt has been serviced yet
    fn overflow_pending(&self) -> bool;

    /// Acknowledges a counter overflow
    fn clear_overflow_pending(&mut self);

    /// Acknowledges an input edge. A no-op on parts that clear the flag when
    /// the vector is taken.
    fn clear_edge_pending(&mut self);
}
