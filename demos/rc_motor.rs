//! Drives a motor PWM output from an RC receiver channel
//!
//! The receiver signal goes to PA0 (EXTI line 0), TIM2 is the capture counter.
//! TIM3 channel 1 on PA6 outputs the scaled duty cycle.
//!
//! The core runs from the 8 MHz HSI, so TIM2 with a prescaler of 3 counts at
//! 2 MHz and a 1000 μs to 2000 μs RC pulse spans 2000 to 4000 ticks.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::convert::Infallible;

use cortex_m::asm;
use cortex_m_rt::entry;
use critical_section::Mutex;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use panic_halt as _;
use rc_signal::{
    capture::EdgeCapture,
    pac::{self, interrupt},
    prelude::*,
    sample::{Cursor, PulseSample},
    scaler::Calibration,
    stm32::TimerCapture,
};

type Capture = EdgeCapture<'static, TimerCapture<pac::TIM2, Pa0, 0>, 8>;

const CALIBRATION: Calibration = match Calibration::new(2000, 4000, 255) {
    Ok(calibration) => calibration,
    Err(_) => panic!("inverted calibration"),
};

static SAMPLE: PulseSample = PulseSample::new();
static CAPTURE: Mutex<RefCell<Option<Capture>>> = Mutex::new(RefCell::new(None));

/// PA0, left in its reset state (floating input)
struct Pa0;

impl digital::ErrorType for Pa0 {
    type Error = Infallible;
}

impl InputPin for Pa0 {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        // NOTE(unsafe) atomic read with no side effects
        let gpioa = unsafe { &*pac::GPIOA::ptr() };
        Ok(gpioa.idr().read().bits() & 1 != 0)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

/// TIM3 channel 1 in PWM mode 1
struct MotorPwm {
    tim: pac::TIM3,
}

impl MotorPwm {
    fn new(tim: pac::TIM3, rcc: &pac::RCC) -> Self {
        rcc.apb1enr().modify(|_, w| w.tim3en().set_bit());
        // 8 MHz / 320 = 25 kHz
        tim.psc().write(|w| w.psc().set(0));
        tim.arr().write(|w| unsafe { w.bits(319) });
        tim.ccmr1_output()
            .modify(|_, w| w.oc1pe().set_bit().oc1m().pwm_mode1());
        tim.ccer().modify(|_, w| w.cc1e().set_bit());
        tim.cr1().modify(|_, w| w.arpe().set_bit().cen().set_bit());
        Self { tim }
    }
}

impl pwm::ErrorType for MotorPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MotorPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.tim.arr().read().bits() as u16 + 1
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.tim.ccr(0).write(|w| unsafe { w.bits(duty as u32) });
        Ok(())
    }
}

#[interrupt]
fn EXTI0() {
    critical_section::with(|cs| {
        if let Some(capture) = CAPTURE.borrow_ref_mut(cs).as_mut() {
            capture.on_edge();
        }
    });
}

#[interrupt]
fn TIM2() {
    critical_section::with(|cs| {
        if let Some(capture) = CAPTURE.borrow_ref_mut(cs).as_mut() {
            capture.on_overflow();
        }
    });
}

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();

    dp.RCC
        .apb2enr()
        .modify(|_, w| w.iopaen().set_bit().afioen().set_bit());
    // EXTI0 from port A is the reset value of AFIO_EXTICR1

    // PA6 as alternate function push-pull, 50 MHz
    dp.GPIOA
        .crl()
        .modify(|r, w| unsafe { w.bits((r.bits() & !(0xf << 24)) | (0xb << 24)) });
    let mut motor = MotorPwm::new(dp.TIM3, &dp.RCC);

    let hw = dp.TIM2.rc_capture::<_, 0>(Pa0, &dp.RCC, 3).unwrap();
    critical_section::with(|cs| {
        let mut capture = EdgeCapture::new(hw, &SAMPLE);
        capture.init();
        CAPTURE.borrow(cs).replace(Some(capture));
    });

    let mut cursor = Cursor::new();
    loop {
        if let Some(ticks) = SAMPLE.read_fresh(&mut cursor) {
            CALIBRATION.apply(&mut motor, ticks).ok();
        }
        asm::wfi();
    }
}
