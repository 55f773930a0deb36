//! Keep-alive for the hardware watchdog during long blocking operations.

use embedded_hal::{
    delay::DelayNs,
    digital::{OutputPin, StatefulOutputPin},
};

/// Hardware watchdog as seen by the boot sequence.
pub trait Watchdog {
    /// Extend the reset deadline.
    fn feed(&mut self);

    /// Hold off the reset-generating pulse for `duration_us`.
    fn suppress_pulse(&mut self, duration_us: u32);
}

impl<T: Watchdog + ?Sized> Watchdog for &mut T {
    fn feed(&mut self) {
        T::feed(self)
    }

    fn suppress_pulse(&mut self, duration_us: u32) {
        T::suppress_pulse(self, duration_us)
    }
}

/// External supervisor chip (APX823 style) kept alive through GPIO.
///
/// Every edge on `WDI` restarts the supervisor timeout, while `DIS` held high disables its output pulse.
pub struct ExternalWatchdog<WDI, DIS, D> {
    wdi: WDI,
    dis: DIS,
    delay: D,
}

impl<WDI: StatefulOutputPin, DIS: OutputPin, D: DelayNs> ExternalWatchdog<WDI, DIS, D> {
    pub fn new(wdi: WDI, dis: DIS, delay: D) -> Self {
        info!("External watchdog initialized");
        Self { wdi, dis, delay }
    }

    pub fn release(self) -> (WDI, DIS, D) {
        (self.wdi, self.dis, self.delay)
    }
}

impl<WDI: StatefulOutputPin, DIS: OutputPin, D: DelayNs> Watchdog for ExternalWatchdog<WDI, DIS, D> {
    fn feed(&mut self) {
        if self.wdi.toggle().is_err() {
            error!("Failed to toggle watchdog input");
        }
    }

    fn suppress_pulse(&mut self, duration_us: u32) {
        if self.dis.set_high().is_err() {
            error!("Failed to raise watchdog disable");
            return;
        }
        self.delay.delay_us(duration_us);
        if self.dis.set_low().is_err() {
            error!("Failed to lower watchdog disable");
        }
    }
}
