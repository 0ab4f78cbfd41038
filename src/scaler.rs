//! # Signal scaler
//!
//! Maps a captured pulse width onto the output duty range. Widths outside the
//! calibrated window are clamped, so a noisy or misbehaving receiver can never
//! produce a duty value outside `0..=duty_max`.
//!
//! ```rust
//! use rc_signal::scaler::Calibration;
//!
//! let calibration = Calibration::new(2000, 4000, 255).unwrap();
//! assert_eq!(calibration.scale(1500), 0);
//! assert_eq!(calibration.scale(3000), 127);
//! assert_eq!(calibration.scale(5000), 255);
//! ```

use embedded_hal::pwm::SetDutyCycle;
use fugit::{HertzU32 as Hertz, MicrosDurationU32};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// `ticks_low` is not below `ticks_high`
    InvertedBounds,
    /// A bound does not fit the 16 bit tick range
    OutOfRange,
}

/// Expected pulse width window and output range
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    ticks_low: u16,
    ticks_high: u16,
    duty_max: u16,
}

impl Calibration {
    /// Pulse widths in `ticks_low..=ticks_high` map linearly to
    /// `0..=duty_max`.
    pub const fn new(ticks_low: u16, ticks_high: u16, duty_max: u16) -> Result<Self, Error> {
        if ticks_low >= ticks_high {
            return Err(Error::InvertedBounds);
        }
        Ok(Self {
            ticks_low,
            ticks_high,
            duty_max,
        })
    }

    /// Builds the window from pulse durations and the capture tick rate.
    ///
    /// Standard RC receivers send 1000 μs to 2000 μs pulses:
    ///
    /// ```rust
    /// use fugit::{ExtU32, RateExtU32};
    /// use rc_signal::scaler::Calibration;
    ///
    /// let calibration =
    ///     Calibration::from_micros(1000.micros(), 2000.micros(), 2.MHz(), 255).unwrap();
    /// assert_eq!(calibration.ticks_low(), 2000);
    /// assert_eq!(calibration.ticks_high(), 4000);
    /// ```
    pub fn from_micros(
        low: MicrosDurationU32,
        high: MicrosDurationU32,
        tick_rate: Hertz,
        duty_max: u16,
    ) -> Result<Self, Error> {
        let ticks = |duration: MicrosDurationU32| {
            let ticks = duration.ticks() as u64 * tick_rate.raw() as u64 / 1_000_000;
            u16::try_from(ticks).map_err(|_| Error::OutOfRange)
        };
        Self::new(ticks(low)?, ticks(high)?, duty_max)
    }

    pub const fn ticks_low(&self) -> u16 {
        self.ticks_low
    }

    pub const fn ticks_high(&self) -> u16 {
        self.ticks_high
    }

    pub const fn duty_max(&self) -> u16 {
        self.duty_max
    }

    /// Converts a pulse width in ticks into a duty value in `0..=duty_max`
    pub const fn scale(&self, ticks: u16) -> u16 {
        let ticks = if ticks > self.ticks_high {
            self.ticks_high
        } else if ticks < self.ticks_low {
            self.ticks_low
        } else {
            ticks
        };
        let shifted = (ticks - self.ticks_low) as u32;
        let span = (self.ticks_high - self.ticks_low) as u32;
        // shifted <= span, so the quotient never exceeds duty_max
        (shifted * self.duty_max as u32 / span) as u16
    }

    /// Scales `ticks` and writes the result to `pwm` as the fraction
    /// `duty / duty_max` of its full duty cycle.
    pub fn apply<P: SetDutyCycle>(&self, pwm: &mut P, ticks: u16) -> Result<(), P::Error> {
        if self.duty_max == 0 {
            return pwm.set_duty_cycle_fully_off();
        }
        pwm.set_duty_cycle_fraction(self.scale(ticks), self.duty_max)
    }
}
