use std::vec::Vec;

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorKind, ErrorType, OutputPin, StatefulOutputPin},
};

/// Output pin recording every level it is driven to.
#[derive(Debug, Default)]
pub struct MockPin {
    pub high: bool,
    pub history: Vec<bool>,
    pub broken: bool,
}

impl MockPin {
    pub fn broken() -> Self {
        MockPin {
            broken: true,
            ..MockPin::default()
        }
    }

    fn drive(&mut self, high: bool) -> Result<(), ErrorKind> {
        if self.broken {
            return Err(ErrorKind::Other);
        }
        self.high = high;
        self.history.push(high);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

#[derive(Debug, Default)]
pub struct MockDelay {
    pub waited_ns: u64,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waited_ns += u64::from(ns);
    }
}
