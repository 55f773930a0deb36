//! Two-colour status indicator.

use embedded_hal::digital::StatefulOutputPin;

/// What the indicator should show.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedState {
    Off,
    Green,
    Blue,
    Both,
    ToggleGreen,
    ToggleBlue,
    ToggleBoth,
}

/// What to do with a single LED.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Action {
    Off,
    On,
    Toggle,
    Keep,
}

/// `(green, blue)` action per state, indexed by `LedState as usize`.
const ACTIONS: [(Action, Action); 7] = [
    (Action::Off, Action::Off),
    (Action::On, Action::Off),
    (Action::Off, Action::On),
    (Action::On, Action::On),
    (Action::Toggle, Action::Keep),
    (Action::Keep, Action::Toggle),
    (Action::Toggle, Action::Toggle),
];

/// Failed to drive an LED pin.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinError;

pub struct StatusLeds<G, B> {
    green: G,
    blue: B,
}

impl<G: StatefulOutputPin, B: StatefulOutputPin> StatusLeds<G, B> {
    pub fn new(green: G, blue: B) -> Self {
        Self { green, blue }
    }

    pub fn set(&mut self, state: LedState) -> Result<(), PinError> {
        let (green, blue) = ACTIONS[state as usize];
        apply(&mut self.green, green).inspect_err(|_| error!("Failed to drive green LED for {:?}", state))?;
        apply(&mut self.blue, blue).inspect_err(|_| error!("Failed to drive blue LED for {:?}", state))?;
        Ok(())
    }

    pub fn release(self) -> (G, B) {
        (self.green, self.blue)
    }
}

fn apply<P: StatefulOutputPin>(pin: &mut P, action: Action) -> Result<(), PinError> {
    match action {
        Action::Off => pin.set_low(),
        Action::On => pin.set_high(),
        Action::Toggle => pin.toggle(),
        Action::Keep => Ok(()),
    }
    .map_err(|_| PinError)
}
