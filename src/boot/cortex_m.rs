use cortex_m::peripheral::SCB;

use crate::boot::Boot;

/// Jump into an image on Cortex-M without TrustZone.
///
/// Interrupts are masked and `VTOR` is pointed at the image vector table before the stack pointer is reloaded.
pub struct SimpleCortexM;

impl Boot for SimpleCortexM {
    unsafe fn boot(addr: *const u32) -> ! {
        cortex_m::interrupt::disable();
        unsafe {
            (*SCB::PTR).vtor.write(addr as u32);
            cortex_m::asm::bootload(addr)
        }
    }
}
