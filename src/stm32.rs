/*!
  # STM32F1 capture hardware

  Implements [`CaptureHardware`] with a general purpose timer and one EXTI
  line. The timer runs with an auto-reload value of 255, so its counter is
  8 bits wide and raises an update interrupt every 256 ticks.

  | Timer | Update interrupt | Availability           |
  |:-----:|:----------------:|:----------------------:|
  | TIM2  |       TIM2       | all devices            |
  | TIM3  |       TIM3       | all devices            |
  | TIM4  |       TIM4       | `medium` and above     |

  The EXTI line must match the pin number of the input pin. Routing the pin's
  port to the line goes through `AFIO_EXTICRx` and is left to the
  application, as is enabling the AFIO clock.

  | EXTI line | Interrupt  |
  |:---------:|:----------:|
  |   0..=4   | EXTI0..4   |
  |   5..=9   | EXTI9_5    |
  |  10..=15  | EXTI15_10  |
*/

use core::convert::Infallible;

use cortex_m::peripheral::NVIC;
use embedded_hal::digital::InputPin;

use crate::hw::{CaptureHardware, EdgeSense, Interrupt, Level};
use crate::pac::{self, EXTI, RCC};

/// Chip selected at build time
pub const CHIP: &str = env!("RC_SIGNAL_CHIP");

/// Auto-reload value that makes the hardware counter 8 bits wide
const ARR_8BIT: u32 = 0xff;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// `LINE` is not an EXTI line a GPIO pin can drive
    InvalidLine,
}

mod sealed {
    pub trait General {
        fn enable_clock(rcc: &crate::pac::RCC);
        fn set_prescaler(&mut self, psc: u16);
        fn set_auto_reload(&mut self, arr: u32);
        fn trigger_update(&mut self);
        fn enable_counter(&mut self, b: bool);
        fn is_counter_enabled(&self) -> bool;
        fn read_count(&self) -> u16;
        fn reset_counter(&mut self);
        fn listen_update(&mut self, b: bool);
        fn is_update_pending(&self) -> bool;
        fn clear_update_flag(&mut self);
    }
}
use sealed::General;

/// Timers usable as the capture counter
pub trait Instance: General {
    const INTERRUPT: pac::Interrupt;
}

macro_rules! hal {
    ($TIM:ty: [$Interrupt:ident, $timXen:ident]) => {
        impl Instance for $TIM {
            const INTERRUPT: pac::Interrupt = pac::Interrupt::$Interrupt;
        }

        impl General for $TIM {
            #[inline(always)]
            fn enable_clock(rcc: &RCC) {
                rcc.apb1enr().modify(|_, w| w.$timXen().set_bit());
            }
            #[inline(always)]
            fn set_prescaler(&mut self, psc: u16) {
                self.psc().write(|w| w.psc().set(psc));
            }
            #[inline(always)]
            fn set_auto_reload(&mut self, arr: u32) {
                self.arr().write(|w| unsafe { w.bits(arr) });
            }
            #[inline(always)]
            fn trigger_update(&mut self) {
                // Sets the URS bit to prevent an interrupt from being triggered by
                // the UG bit
                self.cr1().modify(|_, w| w.urs().set_bit());
                self.egr().write(|w| w.ug().set_bit());
                self.cr1().modify(|_, w| w.urs().clear_bit());
            }
            #[inline(always)]
            fn enable_counter(&mut self, b: bool) {
                self.cr1().modify(|_, w| w.cen().bit(b));
            }
            #[inline(always)]
            fn is_counter_enabled(&self) -> bool {
                self.cr1().read().cen().bit_is_set()
            }
            #[inline(always)]
            fn read_count(&self) -> u16 {
                self.cnt().read().bits() as u16
            }
            #[inline(always)]
            fn reset_counter(&mut self) {
                self.cnt().reset();
            }
            #[inline(always)]
            fn listen_update(&mut self, b: bool) {
                self.dier().modify(|_, w| w.uie().bit(b));
            }
            #[inline(always)]
            fn is_update_pending(&self) -> bool {
                self.sr().read().uif().bit_is_set()
            }
            #[inline(always)]
            fn clear_update_flag(&mut self) {
                self.sr().modify(|_, w| w.uif().clear_bit());
            }
        }
    };
}

hal!(pac::TIM2: [TIM2, tim2en]);
hal!(pac::TIM3: [TIM3, tim3en]);
#[cfg(feature = "medium")]
hal!(pac::TIM4: [TIM4, tim4en]);

/// Turns a timer into the counter half of a [`TimerCapture`]
pub trait CaptureTimerExt: Instance + Sized {
    /// See [`TimerCapture::new`]
    fn rc_capture<PIN, const LINE: u8>(
        self,
        pin: PIN,
        rcc: &RCC,
        psc: u16,
    ) -> Result<TimerCapture<Self, PIN, LINE>, Error>
    where
        PIN: InputPin<Error = Infallible>;
}

impl<TIM: Instance> CaptureTimerExt for TIM {
    fn rc_capture<PIN, const LINE: u8>(
        self,
        pin: PIN,
        rcc: &RCC,
        psc: u16,
    ) -> Result<TimerCapture<Self, PIN, LINE>, Error>
    where
        PIN: InputPin<Error = Infallible>,
    {
        TimerCapture::new(self, pin, rcc, psc)
    }
}

const fn exti_interrupt(line: u8) -> Option<pac::Interrupt> {
    Some(match line {
        0 => pac::Interrupt::EXTI0,
        1 => pac::Interrupt::EXTI1,
        2 => pac::Interrupt::EXTI2,
        3 => pac::Interrupt::EXTI3,
        4 => pac::Interrupt::EXTI4,
        5..=9 => pac::Interrupt::EXTI9_5,
        10..=15 => pac::Interrupt::EXTI15_10,
        _ => return None,
    })
}

/// Timer plus EXTI line measuring pulses on `PIN`
pub struct TimerCapture<TIM, PIN, const LINE: u8> {
    tim: TIM,
    pin: PIN,
}

impl<TIM, PIN, const LINE: u8> TimerCapture<TIM, PIN, LINE>
where
    TIM: Instance,
    PIN: InputPin<Error = Infallible>,
{
    /// Enables the timer clock and sets it up as an 8 bit counter ticking at
    /// `timer clock / (psc + 1)`. The counter stays stopped until
    /// [`EdgeCapture::init`](crate::capture::EdgeCapture::init).
    pub fn new(mut tim: TIM, pin: PIN, rcc: &RCC, psc: u16) -> Result<Self, Error> {
        if exti_interrupt(LINE).is_none() {
            return Err(Error::InvalidLine);
        }

        TIM::enable_clock(rcc);
        tim.enable_counter(false);
        tim.set_prescaler(psc);
        tim.set_auto_reload(ARR_8BIT);
        // Trigger update event to load the registers
        tim.trigger_update();
        tim.clear_update_flag();
        tim.reset_counter();

        #[cfg(feature = "defmt")]
        defmt::debug!("{}: capture timer prescaler {}, EXTI line {}", CHIP, psc, LINE);

        Ok(Self { tim, pin })
    }

    /// Stops the timer, masks both interrupt sources and returns the
    /// peripherals
    pub fn release(mut self) -> (TIM, PIN) {
        self.tim.enable_counter(false);
        self.tim.listen_update(false);
        self.exti()
            .imr()
            .modify(|r, w| unsafe { w.bits(r.bits() & !(1 << LINE)) });
        (self.tim, self.pin)
    }

    fn exti(&self) -> &pac::exti::RegisterBlock {
        // NOTE(unsafe) only this line's bits are ever modified
        unsafe { &*EXTI::ptr() }
    }
}

impl<TIM, PIN, const LINE: u8> CaptureHardware for TimerCapture<TIM, PIN, LINE>
where
    TIM: Instance,
    PIN: InputPin<Error = Infallible>,
{
    const COUNTER_BITS: u32 = 8;

    fn listen(&mut self, interrupts: Interrupt) {
        if interrupts.contains(Interrupt::EDGE) {
            self.exti()
                .imr()
                .modify(|r, w| unsafe { w.bits(r.bits() | (1 << LINE)) });
            if let Some(irq) = exti_interrupt(LINE) {
                NVIC::unpend(irq);
                // NOTE(unsafe) not used inside a mask based critical section
                unsafe { NVIC::unmask(irq) };
            }
        }
        if interrupts.contains(Interrupt::OVERFLOW) {
            self.tim.clear_update_flag();
            self.tim.listen_update(true);
            NVIC::unpend(TIM::INTERRUPT);
            unsafe { NVIC::unmask(TIM::INTERRUPT) };
        }
    }

    fn set_edge_sense(&mut self, sense: EdgeSense) {
        let exti = self.exti();
        exti.rtsr()
            .modify(|r, w| unsafe { w.bits(r.bits() | (1 << LINE)) });
        match sense {
            EdgeSense::RisingOnly => {
                exti.ftsr()
                    .modify(|r, w| unsafe { w.bits(r.bits() & !(1 << LINE)) });
            }
            EdgeSense::AnyEdge => {
                exti.ftsr()
                    .modify(|r, w| unsafe { w.bits(r.bits() | (1 << LINE)) });
            }
        }
    }

    fn input_level(&mut self) -> Level {
        match self.pin.is_high() {
            Ok(high) => Level::from(high),
            Err(e) => match e {},
        }
    }

    fn read_count(&self) -> u16 {
        self.tim.read_count()
    }

    fn reset_count(&mut self) {
        self.tim.reset_counter();
    }

    fn enable_counter(&mut self, enable: bool) {
        self.tim.enable_counter(enable);
    }

    fn is_counter_enabled(&self) -> bool {
        self.tim.is_counter_enabled()
    }

    fn overflow_pending(&self) -> bool {
        self.tim.is_update_pending()
    }

    fn clear_overflow_pending(&mut self) {
        self.tim.clear_update_flag();
    }

    fn clear_edge_pending(&mut self) {
        // Write 1 to clear
        self.exti().pr().write(|w| unsafe { w.bits(1 << LINE) });
    }
}
