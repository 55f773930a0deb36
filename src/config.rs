//! Build-time configuration of the boot sequence.

use crate::Slot;

/// Physical flash region backing a bank.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    /// Flash area identifier as known by the board.
    pub id: u8,
    /// Offset of the region on its flash device.
    pub offset: u32,
    /// Size of the region in bytes.
    pub size: u32,
}

/// Static mapping from bank to flash region.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotMap([Region; 2]);

impl SlotMap {
    pub const fn new(slot0: Region, slot1: Region) -> Self {
        SlotMap([slot0, slot1])
    }

    pub const fn region(&self, slot: Slot) -> Region {
        self.0[slot.index()]
    }
}

/// Tunables of the boot sequence.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Name of the staging file at the root of the removable volume.
    pub staging_file: &'static str,
    /// Number of blocks copied between two watchdog feeds.
    ///
    /// Copying this many blocks must take less than the watchdog timeout.
    pub feed_interval: u32,
    /// Number of consecutive failed reads after which staging gives up.
    pub max_read_failures: u32,
    /// Keep the staging file on the volume when the copy failed, so the next boot retries it.
    pub retain_on_failure: bool,
    /// Period of the recovery idle loop, in milliseconds.
    pub recovery_period_ms: u32,
}

impl Config {
    pub const DEFAULT: Config = Config {
        staging_file: "fw.bin",
        feed_interval: 100,
        max_read_failures: 8,
        retain_on_failure: false,
        recovery_period_ms: 3000,
    };
}

impl Default for Config {
    fn default() -> Self {
        Config::DEFAULT
    }
}
