#[cfg(feature = "cortex_m")]
pub mod cortex_m;

use core::convert::Infallible;

use crate::{Error, LoadDescriptor};

/// Bootload mechanism that at the least jumps to the entry of a validated image.
///
/// Optionally could drop TrustZone privileges or mask memory access.
pub trait Boot {
    /// Address to the start of the image body, typically pointing to the vector table.
    unsafe fn boot(addr: *const u32) -> !;
}

/// Hand execution over to the image described by `descriptor`.
///
/// `flash_base` is the address at which the flash device holding the bank is mapped.
///
/// Only returns when the entry address cannot be computed.
///
/// # Safety
/// The image must have been validated and loaded, and nothing of the bootloader may be used afterwards.
pub unsafe fn jump<B: Boot>(descriptor: &LoadDescriptor, flash_base: u32) -> Result<Infallible, Error> {
    let entry = descriptor
        .entry(flash_base)
        .inspect_err(|_| error!("Entry of slot {} is out of range", descriptor.slot.id()))?;
    info!("Jumping to slot {} at {:#x}", descriptor.slot.id(), entry);
    unsafe { B::boot(entry as usize as *const u32) }
}
