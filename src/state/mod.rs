use serde::{Deserialize, Serialize};

use crate::Slot;

pub mod simple;

pub use simple::BootStateStore;

/// State as stored by the bootloader.
///
/// Serialized with `postcard` this is exactly three bytes: `active_slot`, `booted_slot`, `upgrade_request`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootState {
    /// The bank that is booted when no upgrade is requested.
    pub active_slot: Slot,

    /// The bank that was actually booted last time.
    ///
    /// Differs from `active_slot` only after a trial boot of the inactive bank that the
    /// application did not confirm by promoting it to `active_slot`.
    pub booted_slot: Slot,

    /// Request to boot the inactive bank once.
    pub upgrade_request: bool,
}

impl BootState {
    /// Record used on a blank partition.
    pub const INITIAL: BootState = BootState {
        active_slot: Slot::ZERO,
        booted_slot: Slot::ZERO,
        upgrade_request: false,
    };

    /// The bank an upgrade is staged into and trial-booted from.
    pub const fn inactive_slot(&self) -> Slot {
        self.active_slot.other()
    }
}

impl Default for BootState {
    fn default() -> Self {
        BootState::INITIAL
    }
}
