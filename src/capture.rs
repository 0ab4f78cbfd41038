//! # Edge capture
//!
//! Measures the high time of an RC servo signal with two interrupts:
//!
//! - the *edge* interrupt fires on input transitions. A rising edge restarts
//!   the counter, a falling edge publishes the elapsed ticks into a
//!   [`PulseSample`].
//! - the *overflow* interrupt fires when the short hardware counter wraps and
//!   extends it into a 16 bit [`WideCounter`].
//!
//! At power-up the input is only sensitive to rising edges so the first
//! measured interval is a whole pulse and not the tail of one. After the first
//! rising edge the input switches to toggle detection for good.
//!
//! Both handlers must share one [`EdgeCapture`] and must not preempt each
//! other. The usual way is a `critical_section::Mutex<RefCell<Option<_>>>`
//! borrowed from both interrupt vectors:
//!
//! ```rust,ignore
//! static SAMPLE: PulseSample = PulseSample::new();
//! static CAPTURE: Mutex<RefCell<Option<EdgeCapture<'static, Hw, 8>>>> =
//!     Mutex::new(RefCell::new(None));
//!
//! #[interrupt]
//! fn EXTI0() {
//!     critical_section::with(|cs| {
//!         if let Some(capture) = CAPTURE.borrow_ref_mut(cs).as_mut() {
//!             capture.on_edge();
//!         }
//!     });
//! }
//!
//! #[interrupt]
//! fn TIM2() {
//!     critical_section::with(|cs| {
//!         if let Some(capture) = CAPTURE.borrow_ref_mut(cs).as_mut() {
//!             capture.on_overflow();
//!         }
//!     });
//! }
//! ```

use crate::counter::WideCounter;
use crate::hw::{CaptureHardware, EdgeSense, Interrupt, Level};
use crate::sample::PulseSample;

/// Hardware events driving the capture state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureEvent {
    /// The edge interrupt fired
    Edge,
    /// The counter overflow interrupt fired
    Overflow,
}

/// Position of the capture state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureState {
    pub sense: EdgeSense,
    /// `true` between a rising edge and the following falling edge
    pub running: bool,
}

/// Pulse width capture over one input line and one hardware counter
pub struct EdgeCapture<'a, HW, const BITS: u32> {
    hw: HW,
    counter: WideCounter<BITS>,
    sense: EdgeSense,
    running: bool,
    sample: &'a PulseSample,
}

impl<'a, HW: CaptureHardware, const BITS: u32> EdgeCapture<'a, HW, BITS> {
    /// Takes ownership of the capture hardware. Nothing is configured until
    /// [`init`](Self::init) is called.
    pub fn new(hw: HW, sample: &'a PulseSample) -> Self {
        debug_assert_eq!(HW::COUNTER_BITS, BITS);
        Self {
            hw,
            counter: WideCounter::new(),
            sense: EdgeSense::RisingOnly,
            running: false,
            sample,
        }
    }

    /// Prepares the first capture.
    ///
    /// Must run once, and without the edge or overflow handler able to
    /// preempt it: chip bindings unmask both interrupt lines from here.
    pub fn init(&mut self) {
        self.hw.listen(Interrupt::EDGE);
        self.sense = EdgeSense::RisingOnly;
        self.hw.set_edge_sense(EdgeSense::RisingOnly);
        self.hw.listen(Interrupt::OVERFLOW);
        // Reset again by the first rising edge, overflows until then are harmless
        self.hw.enable_counter(true);

        #[cfg(feature = "defmt")]
        defmt::debug!("rc capture armed, {} bit counter", BITS);
    }

    /// Dispatches one hardware event
    pub fn handle(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Edge => self.on_edge(),
            CaptureEvent::Overflow => self.on_overflow(),
        }
    }

    /// Edge interrupt handler
    pub fn on_edge(&mut self) {
        // Freeze the count first so handler latency is not measured
        self.hw.enable_counter(false);
        self.hw.clear_edge_pending();

        match self.hw.input_level() {
            Level::High => self.rising_edge(),
            Level::Low if self.running => self.falling_edge(),
            // The line went back low before the handler sampled it. Without
            // a running pulse there is nothing to measure.
            Level::Low => {}
        }
    }

    /// Counter overflow interrupt handler
    ///
    /// The interrupt can still be pending in the NVIC after an edge handler
    /// already consumed or dropped the overflow flag. Only a flag that is
    /// still set is counted.
    #[inline(always)]
    pub fn on_overflow(&mut self) {
        if self.hw.overflow_pending() {
            self.hw.clear_overflow_pending();
            self.counter.overflow();
        }
    }

    fn rising_edge(&mut self) {
        if self.sense == EdgeSense::RisingOnly {
            self.sense = EdgeSense::AnyEdge;
            self.hw.set_edge_sense(EdgeSense::AnyEdge);

            #[cfg(feature = "defmt")]
            defmt::debug!("first rising edge, switching to toggle detection");
        }

        self.hw.reset_count();
        // An overflow left from the idle phase belongs to no pulse
        self.hw.clear_overflow_pending();
        self.counter.reset();
        self.running = true;
        self.hw.enable_counter(true);
    }

    fn falling_edge(&mut self) {
        // The counter may have wrapped right before it was stopped, with the
        // overflow interrupt still waiting behind this one
        if self.hw.overflow_pending() {
            self.hw.clear_overflow_pending();
            self.counter.overflow();
        }
        let ticks = self.counter.compose(self.hw.read_count());
        self.sample.publish(ticks);
        // Counter stays stopped, the low phase is not measured
        self.running = false;
    }

    pub fn state(&self) -> CaptureState {
        CaptureState {
            sense: self.sense,
            running: self.running,
        }
    }

    pub fn edge_sense(&self) -> EdgeSense {
        self.sense
    }

    /// Overflows counted since the current pulse started
    pub fn overflows(&self) -> u16 {
        self.counter.overflows()
    }

    pub fn hardware(&self) -> &HW {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut HW {
        &mut self.hw
    }

    /// Stops the counter and releases the hardware
    pub fn release(mut self) -> HW {
        self.hw.enable_counter(false);
        self.hw
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptureEvent, CaptureState, EdgeCapture};
    use crate::hw::{CaptureHardware, EdgeSense, Interrupt, Level};
    use crate::sample::PulseSample;
    use crate::sim::SimHardware;

    type Capture<'a> = EdgeCapture<'a, SimHardware<8>, 8>;

    fn armed(sample: &PulseSample) -> Capture<'_> {
        let mut capture = EdgeCapture::new(SimHardware::new(), sample);
        capture.init();
        capture
    }

    fn edge(capture: &mut Capture<'_>, level: Level) {
        if capture.hardware_mut().set_level(level) {
            capture.handle(CaptureEvent::Edge);
        }
    }

    /// Services every overflow interrupt raised so far
    fn service_overflows(capture: &mut Capture<'_>) {
        for _ in 0..capture.hardware_mut().take_overflows() {
            capture.handle(CaptureEvent::Overflow);
        }
    }

    #[test]
    fn init_arms_rising_edge_detection() {
        let sample = PulseSample::new();
        let capture = armed(&sample);
        let hw = capture.hardware();

        assert!(hw.listening().contains(Interrupt::EDGE | Interrupt::OVERFLOW));
        assert_eq!(hw.edge_sense(), EdgeSense::RisingOnly);
        assert!(hw.is_counter_enabled());
        assert_eq!(
            capture.state(),
            CaptureState {
                sense: EdgeSense::RisingOnly,
                running: false
            }
        );
    }

    #[test]
    fn ignores_falling_edge_before_first_pulse() {
        let sample = PulseSample::new();
        // Power up in the middle of a pulse
        let mut capture: Capture<'_> =
            EdgeCapture::new(SimHardware::with_level(Level::High), &sample);
        capture.init();

        capture.hardware_mut().advance(700);
        edge(&mut capture, Level::Low);

        assert_eq!(sample.sequence(), 0);
        assert_eq!(capture.edge_sense(), EdgeSense::RisingOnly);
    }

    #[test]
    fn rising_edge_restarts_counter() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);
        for _ in 0..3 {
            capture.hardware_mut().advance(256);
            service_overflows(&mut capture);
        }
        assert_eq!(capture.overflows(), 3);

        edge(&mut capture, Level::High);

        assert_eq!(capture.hardware().read_count(), 0);
        assert_eq!(capture.overflows(), 0);
        assert!(capture.hardware().is_counter_enabled());
        assert!(capture.state().running);
        assert_eq!(capture.hardware().edge_sense(), EdgeSense::AnyEdge);
    }

    #[test]
    fn falling_edge_stops_counter_and_publishes() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);

        edge(&mut capture, Level::High);
        capture.hardware_mut().advance(0x42);
        edge(&mut capture, Level::Low);

        assert_eq!(sample.read(), 0x42);
        assert!(!capture.hardware().is_counter_enabled());
        assert!(!capture.state().running);
        assert!(!capture.hardware().edge_pending());

        // Low phase is not measured
        capture.hardware_mut().advance(5000);
        assert_eq!(capture.hardware().read_count(), 0x42);
    }

    #[test]
    fn stale_overflow_flag_is_dropped_at_rising_edge() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);

        // Counter wraps during the idle phase, overflow not yet serviced
        capture.hardware_mut().advance(300);
        assert!(capture.hardware().overflow_pending());

        edge(&mut capture, Level::High);
        assert!(!capture.hardware().overflow_pending());

        capture.hardware_mut().advance(10);
        edge(&mut capture, Level::Low);
        assert_eq!(sample.read(), 10);
    }

    #[test]
    fn overflow_latched_before_rising_edge_is_not_counted() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);

        capture.hardware_mut().advance(300);
        edge(&mut capture, Level::High);
        // Vector was already pending when the rising edge dropped the flag
        service_overflows(&mut capture);
        assert_eq!(capture.overflows(), 0);

        capture.hardware_mut().advance(10);
        edge(&mut capture, Level::Low);
        assert_eq!(sample.read(), 10);
    }

    #[test]
    fn overflow_consumed_by_falling_edge_is_not_counted_again() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);

        edge(&mut capture, Level::High);
        capture.hardware_mut().advance(260);
        edge(&mut capture, Level::Low);
        assert_eq!(sample.read(), 260);
        assert!(!capture.hardware().overflow_pending());

        service_overflows(&mut capture);
        assert_eq!(capture.overflows(), 1);
    }

    #[test]
    fn glitch_before_first_pulse_publishes_nothing() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);
        capture.hardware_mut().advance(700);

        // Short spike: the edge is latched, the line is low again when handled
        assert!(capture.hardware_mut().set_level(Level::High));
        capture.hardware_mut().set_level(Level::Low);
        capture.handle(CaptureEvent::Edge);

        assert_eq!(sample.sequence(), 0);
        assert_eq!(capture.edge_sense(), EdgeSense::RisingOnly);
        assert!(!capture.state().running);

        edge(&mut capture, Level::High);
        capture.hardware_mut().advance(0x80);
        edge(&mut capture, Level::Low);
        assert_eq!(sample.sequence(), 1);
        assert_eq!(sample.read(), 0x80);
    }

    #[test]
    fn glitch_in_low_phase_does_not_republish() {
        let sample = PulseSample::new();
        let mut capture = armed(&sample);

        edge(&mut capture, Level::High);
        capture.hardware_mut().advance(0x42);
        edge(&mut capture, Level::Low);
        assert_eq!(sample.sequence(), 1);

        // Both transitions latch one pending edge, handled once with the line low
        capture.hardware_mut().set_level(Level::High);
        capture.hardware_mut().set_level(Level::Low);
        capture.handle(CaptureEvent::Edge);

        assert_eq!(sample.sequence(), 1);
        assert_eq!(capture.edge_sense(), EdgeSense::AnyEdge);
    }

    #[test]
    fn release_stops_counter() {
        let sample = PulseSample::new();
        let capture = armed(&sample);
        let hw = capture.release();
        assert!(!hw.is_counter_enabled());
    }
}
