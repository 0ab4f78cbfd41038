//! # RC signal capture for small microcontrollers
//!
//! Measures the pulse width of a single channel RC (hobby radio control) PWM
//! signal with an edge interrupt and a short hardware timer, and turns the
//! measured width into a duty value for a motor-control PWM output.
//!
//! The pieces, leaf first:
//!
//! - [`counter::WideCounter`] extends an 8 bit hardware counter into a 16 bit
//!   tick count by counting overflows.
//! - [`capture::EdgeCapture`] is the edge and overflow interrupt logic. It
//!   publishes each completed pulse into a [`sample::PulseSample`].
//! - [`scaler::Calibration`] clamps and rescales a pulse width into
//!   `0..=duty_max`.
//!
//! All register access goes through [`hw::CaptureHardware`]. The `sim`
//! module, behind the `sim` feature, provides a software implementation for
//! host tests, `stm32` one for the STM32F1 family.
//!
//! # Usage
//!
//! Select your microcontroller with the corresponding feature and enable
//! `rt` for the interrupt vectors:
//!
//! ```toml
//! [dependencies.rc-signal]
//! version = "0.1.0"
//! features = ["stm32f103", "rt", "medium"]
//! ```
//!
//! Without a chip feature only the portable core is built. The host tests
//! need the simulation: `cargo test --features sim`.
//!
//! See `demos/rc_motor.rs` for the interrupt wiring on a blue pill board.

#![no_std]

#[cfg(feature = "stm32f100")]
pub use stm32f1::stm32f100 as pac;

#[cfg(feature = "stm32f101")]
pub use stm32f1::stm32f101 as pac;

#[cfg(feature = "stm32f103")]
pub use stm32f1::stm32f103 as pac;

#[cfg(any(feature = "stm32f105", feature = "stm32f107"))]
pub use stm32f1::stm32f107 as pac;

pub mod capture;
pub mod counter;
pub mod hw;
pub mod prelude;
pub mod sample;
pub mod scaler;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
#[cfg(feature = "chip")]
pub mod stm32;
