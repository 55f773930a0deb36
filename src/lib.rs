//! Boot-time decision core for dual-bank firmware updaters.
//!
//! On every power-up the bootloader decides which of two firmware banks to run,
//! optionally staging a freshly delivered image from removable storage into the inactive bank first.
//! The decision is persisted so it survives power loss, and when the chosen image cannot be validated
//! the device falls back to a recovery transport until it is power-cycled.
#![no_std]

#[macro_use]
mod fmt;

pub mod boot;
pub mod config;
pub mod image;
pub mod indicator;
pub mod recovery;
pub mod staging;
pub mod state;
pub mod strategies;
pub mod watchdog;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;

use core::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use config::{Config, Region, SlotMap};
pub use image::{ImageHeader, ImageValidator, LoadDescriptor};
pub use state::BootState;

/// Every way the boot sequence can go wrong.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The persisted-state partition cannot be accessed.
    StorageUnavailable,
    /// The persisted-state partition is accessible, but its contents cannot be decoded.
    StorageCorrupt,
    /// No staging file was found on the removable volume.
    NoImagePresent,
    /// Staging was aborted partway through the copy.
    StagingWriteFailed,
    /// A slot identifier outside of the two valid banks.
    InvalidSlot(u8),
    /// The image in the chosen bank was rejected.
    ValidationFailed,
    /// The image in the chosen bank could not be loaded for execution.
    LoadFailed,
    /// The chosen bank does not contain an image at all.
    NoBootableImage,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::StorageUnavailable => f.write_str("boot state storage unavailable"),
            Error::StorageCorrupt => f.write_str("boot state storage corrupt"),
            Error::NoImagePresent => f.write_str("no staging image present"),
            Error::StagingWriteFailed => f.write_str("staging write failed"),
            Error::InvalidSlot(slot) => write!(f, "invalid slot {}", slot),
            Error::ValidationFailed => f.write_str("validation failed"),
            Error::LoadFailed => f.write_str("load failed"),
            Error::NoBootableImage => f.write_str("no bootable image"),
        }
    }
}

/// One of the two firmware banks.
///
/// Only `Slot::ZERO` and `Slot::ONE` can ever be constructed; raw identifiers coming from
/// persisted state or callers go through [`Slot::new`] and are rejected otherwise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot(u8);

impl Slot {
    pub const ZERO: Slot = Slot(0);
    pub const ONE: Slot = Slot(1);

    pub const fn new(id: u8) -> Result<Self, Error> {
        match id {
            0 | 1 => Ok(Slot(id)),
            _ => Err(Error::InvalidSlot(id)),
        }
    }

    /// The complementary bank.
    pub const fn other(self) -> Slot {
        Slot(1 - self.0)
    }

    pub const fn id(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Slot {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Slot::new(id)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.0
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
