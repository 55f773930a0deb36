pub mod flash;
pub mod hal;
pub mod volume;

use std::vec::Vec;

use crate::{
    Error, ImageHeader, Slot, image::ImageValidator, recovery::RecoveryTransport,
    watchdog::Watchdog,
};

pub use flash::{ERASE_SIZE, MockFlash, WRITE_SIZE};
pub use hal::{MockDelay, MockPin};
pub use volume::MockVolume;

#[derive(Debug, Default)]
pub struct MockWatchdog {
    pub feeds: usize,
    pub suppressed: Vec<u32>,
}

impl Watchdog for MockWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }

    fn suppress_pulse(&mut self, duration_us: u32) {
        self.suppressed.push(duration_us);
    }
}

/// Validator accepting or rejecting every image with a fixed verdict.
#[derive(Debug)]
pub struct MockValidator {
    pub verdict: Result<(), Error>,
    pub calls: Vec<(Slot, ImageHeader)>,
}

impl MockValidator {
    pub fn accepting() -> Self {
        MockValidator {
            verdict: Ok(()),
            calls: Vec::new(),
        }
    }

    pub fn rejecting(error: Error) -> Self {
        MockValidator {
            verdict: Err(error),
            calls: Vec::new(),
        }
    }
}

impl ImageValidator<MockFlash> for MockValidator {
    async fn validate_and_load(
        &mut self,
        slot: Slot,
        header: &ImageHeader,
        _flash: &mut MockFlash,
    ) -> Result<(), Error> {
        self.calls.push((slot, *header));
        self.verdict
    }
}

/// Recovery transport that panics once it has idled `idle_limit` times, so tests can escape the loop.
#[derive(Debug)]
pub struct MockTransport {
    pub exposed: bool,
    pub idles: usize,
    pub idle_limit: usize,
    pub periods: Vec<u32>,
}

impl MockTransport {
    pub fn new(idle_limit: usize) -> Self {
        MockTransport {
            exposed: false,
            idles: 0,
            idle_limit,
            periods: Vec::new(),
        }
    }
}

impl RecoveryTransport for MockTransport {
    type Error = ();

    async fn expose(&mut self) -> Result<(), ()> {
        self.exposed = true;
        Ok(())
    }

    async fn idle(&mut self, period_ms: u32) {
        assert!(self.exposed, "idling before the volume was exposed");
        self.periods.push(period_ms);
        self.idles += 1;
        if self.idles >= self.idle_limit {
            panic!("recovery idle limit reached");
        }
    }
}
