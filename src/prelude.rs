pub use crate::hw::CaptureHardware as _rc_signal_hw_CaptureHardware;
#[cfg(feature = "chip")]
pub use crate::stm32::CaptureTimerExt as _rc_signal_stm32_CaptureTimerExt;
pub use fugit::ExtU32 as _fugit_ExtU32;
pub use fugit::RateExtU32 as _fugit_RateExtU32;
