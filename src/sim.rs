//! Software model of the capture peripheral
//!
//! Lets the capture state machine run on the host, with the test in control
//! of every tick and every input transition. Like the hardware, the model has
//! a single overflow flag, so overflow interrupts are serviced at least once
//! per counter period.
//!
//! ```rust
//! use rc_signal::capture::{CaptureEvent, EdgeCapture};
//! use rc_signal::hw::Level;
//! use rc_signal::sample::PulseSample;
//! use rc_signal::scaler::Calibration;
//! use rc_signal::sim::SimHardware;
//!
//! const CALIBRATION: Calibration = match Calibration::new(2000, 4000, 255) {
//!     Ok(calibration) => calibration,
//!     Err(_) => panic!("bad calibration"),
//! };
//!
//! static SAMPLE: PulseSample = PulseSample::new();
//!
//! let mut capture: EdgeCapture<_, 8> = EdgeCapture::new(SimHardware::<8>::new(), &SAMPLE);
//! capture.init();
//!
//! // A 3000 tick pulse
//! capture.hardware_mut().set_level(Level::High);
//! capture.handle(CaptureEvent::Edge);
//! for _ in 0..3000 / 256 {
//!     capture.hardware_mut().advance(256);
//!     capture.handle(CaptureEvent::Overflow);
//! }
//! capture.hardware_mut().advance(3000 % 256);
//! capture.hardware_mut().set_level(Level::Low);
//! capture.handle(CaptureEvent::Edge);
//!
//! assert_eq!(SAMPLE.read(), 3000);
//! assert_eq!(CALIBRATION.scale(SAMPLE.read()), 127);
//! ```

use crate::hw::{CaptureHardware, EdgeSense, Interrupt, Level};

/// Simulated input line plus `BITS` wide counter
#[derive(Clone, Debug)]
pub struct SimHardware<const BITS: u32> {
    count: u16,
    running: bool,
    overflow_flag: bool,
    edge_flag: bool,
    raised: u32,
    level: Level,
    sense: EdgeSense,
    listening: Interrupt,
}

impl<const BITS: u32> Default for SimHardware<BITS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BITS: u32> SimHardware<BITS> {
    const MODULUS: u64 = 1 << BITS;

    /// Stopped counter, input low, all interrupts masked
    pub fn new() -> Self {
        Self::with_level(Level::Low)
    }

    /// Like [`new`](Self::new) with the input already at `level`
    pub fn with_level(level: Level) -> Self {
        Self {
            count: 0,
            running: false,
            overflow_flag: false,
            edge_flag: false,
            raised: 0,
            level,
            sense: EdgeSense::RisingOnly,
            listening: Interrupt::empty(),
        }
    }

    /// Lets `ticks` timer ticks elapse. Returns how many times the counter
    /// wrapped; each wrap sets the overflow flag.
    pub fn advance(&mut self, ticks: u32) -> u32 {
        if !self.running {
            return 0;
        }
        let total = self.count as u64 + ticks as u64;
        let wraps = u32::try_from(total / Self::MODULUS).unwrap_or(u32::MAX);
        self.count = (total % Self::MODULUS) as u16;
        if wraps > 0 {
            self.overflow_flag = true;
            if self.listening.contains(Interrupt::OVERFLOW) {
                self.raised = self.raised.saturating_add(wraps);
            }
        }
        wraps
    }

    /// Overflow interrupts raised since the last call and not yet handed out
    pub fn take_overflows(&mut self) -> u32 {
        core::mem::take(&mut self.raised)
    }

    /// Drives the input line. Returns `true` when the transition raises the
    /// edge interrupt under the current edge sense.
    pub fn set_level(&mut self, level: Level) -> bool {
        if level == self.level {
            return false;
        }
        self.level = level;
        let sensed = match self.sense {
            EdgeSense::RisingOnly => level.is_high(),
            EdgeSense::AnyEdge => true,
        };
        let raised = sensed && self.listening.contains(Interrupt::EDGE);
        self.edge_flag |= raised;
        raised
    }

    pub fn edge_sense(&self) -> EdgeSense {
        self.sense
    }

    pub fn listening(&self) -> Interrupt {
        self.listening
    }

    pub fn edge_pending(&self) -> bool {
        self.edge_flag
    }
}

impl<const BITS: u32> CaptureHardware for SimHardware<BITS> {
    const COUNTER_BITS: u32 = BITS;

    fn listen(&mut self, interrupts: Interrupt) {
        self.listening |= interrupts;
    }

    fn set_edge_sense(&mut self, sense: EdgeSense) {
        self.sense = sense;
    }

    fn input_level(&mut self) -> Level {
        self.level
    }

    fn read_count(&self) -> u16 {
        self.count
    }

    fn reset_count(&mut self) {
        self.count = 0;
    }

    fn enable_counter(&mut self, enable: bool) {
        self.running = enable;
    }

    fn is_counter_enabled(&self) -> bool {
        self.running
    }

    fn overflow_pending(&self) -> bool {
        self.overflow_flag
    }

    fn clear_overflow_pending(&mut self) {
        self.overflow_flag = false;
    }

    fn clear_edge_pending(&mut self) {
        self.edge_flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::SimHardware;
    use crate::hw::{CaptureHardware, EdgeSense, Interrupt, Level};

    #[test]
    fn stopped_counter_does_not_move() {
        let mut hw = SimHardware::<8>::new();
        assert_eq!(hw.advance(1000), 0);
        assert_eq!(hw.read_count(), 0);
        assert!(!hw.overflow_pending());
    }

    #[test]
    fn counter_wraps_and_flags_overflow() {
        let mut hw = SimHardware::<8>::new();
        hw.listen(Interrupt::OVERFLOW);
        hw.enable_counter(true);

        assert_eq!(hw.advance(255), 0);
        assert_eq!(hw.read_count(), 255);
        assert!(!hw.overflow_pending());

        assert_eq!(hw.advance(1), 1);
        assert_eq!(hw.read_count(), 0);
        assert!(hw.overflow_pending());

        assert_eq!(hw.advance(600), 2);
        assert_eq!(hw.read_count(), 600 - 512);
        assert_eq!(hw.take_overflows(), 3);
        assert_eq!(hw.take_overflows(), 0);
    }

    #[test]
    fn advance_by_whole_tick_range() {
        let mut hw = SimHardware::<8>::new();
        hw.listen(Interrupt::OVERFLOW);
        hw.enable_counter(true);
        hw.advance(200);

        // (200 + u32::MAX) / 256 wraps, leaving 199 on the counter
        assert_eq!(hw.advance(u32::MAX), 16_777_216);
        assert_eq!(hw.read_count(), 199);
        assert!(hw.overflow_pending());
        assert_eq!(hw.take_overflows(), 16_777_216);

        hw.advance(u32::MAX);
        hw.advance(u32::MAX);
        assert_eq!(hw.take_overflows(), 2 * 16_777_216);
        assert_eq!(hw.read_count(), 197);
    }

    #[test]
    fn masked_overflow_still_sets_flag() {
        let mut hw = SimHardware::<8>::new();
        hw.enable_counter(true);
        assert_eq!(hw.advance(256), 1);
        assert!(hw.overflow_pending());
        assert_eq!(hw.take_overflows(), 0);
    }

    #[test]
    fn edge_sense_filters_transitions() {
        let mut hw = SimHardware::<8>::new();
        hw.listen(Interrupt::EDGE);

        assert!(hw.set_level(Level::High));
        assert!(!hw.set_level(Level::High));
        assert!(!hw.set_level(Level::Low));

        hw.set_edge_sense(EdgeSense::AnyEdge);
        assert!(hw.set_level(Level::High));
        assert!(hw.set_level(Level::Low));
        assert!(hw.edge_pending());

        hw.clear_edge_pending();
        assert!(!hw.edge_pending());
    }

    #[test]
    fn masked_edge_raises_nothing() {
        let mut hw = SimHardware::<8>::new();
        assert!(!hw.set_level(Level::High));
        assert!(!hw.edge_pending());
    }
}
