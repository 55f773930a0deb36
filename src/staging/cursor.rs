use embedded_storage_async::nor_flash::NorFlash;

use crate::Error;

/// Value of erased NOR flash, used to pad the final block.
pub const ERASED: u8 = 0xff;

/// Progress of one image streaming into a bank.
///
/// Pages are erased right before they are first written to, so a staging run never erases more
/// of the bank than the image covers.
pub struct FlashWriteCursor<'a, F: NorFlash> {
    flash: &'a mut F,
    /// Next flash offset to write, always `WRITE_SIZE` aligned.
    offset: u32,
    /// Everything below this offset has been erased in this run.
    erased_to: u32,
    /// Image bytes accepted, excluding padding.
    written: usize,
    flushed: bool,
}

impl<'a, F: NorFlash> FlashWriteCursor<'a, F> {
    pub fn new(flash: &'a mut F) -> Self {
        Self {
            flash,
            offset: 0,
            erased_to: 0,
            written: 0,
            flushed: false,
        }
    }

    /// Bytes of image data written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Whether the final block has been written.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Write the first `len` bytes of `block`.
    ///
    /// `block` must be a multiple of `WRITE_SIZE` long; only the `last` block may have a `len`
    /// that is not, in which case the tail of `block` is overwritten with padding.
    pub async fn write_block(&mut self, block: &mut [u8], len: usize, last: bool) -> Result<(), Error> {
        if self.flushed {
            error!("Write after the final block");
            return Err(Error::StagingWriteFailed);
        }
        if len > block.len() || (!last && len % F::WRITE_SIZE != 0) {
            error!("Unaligned block of {} bytes", len);
            return Err(Error::StagingWriteFailed);
        }

        let padded = len.next_multiple_of(F::WRITE_SIZE);
        if padded > block.len() {
            error!("Block of {} bytes cannot be padded", len);
            return Err(Error::StagingWriteFailed);
        }
        block[len..padded].fill(ERASED);

        if padded > 0 {
            let end = self.offset as usize + padded;
            self.erase_until(end).await?;
            self.flash
                .write(self.offset, &block[..padded])
                .await
                .map_err(|_| {
                    error!("Flash write of {} bytes at {:#x} failed", padded, self.offset);
                    Error::StagingWriteFailed
                })?;

            self.offset += padded as u32;
            self.written += len;
        }

        self.flushed = last;
        Ok(())
    }

    async fn erase_until(&mut self, end: usize) -> Result<(), Error> {
        if end > self.flash.capacity() {
            error!("Image does not fit in bank of {} bytes", self.flash.capacity());
            return Err(Error::StagingWriteFailed);
        }
        if end <= self.erased_to as usize {
            return Ok(());
        }

        let to = end.next_multiple_of(F::ERASE_SIZE).min(self.flash.capacity()) as u32;
        trace!("Erasing {:#x}..{:#x}", self.erased_to, to);
        self.flash.erase(self.erased_to, to).await.map_err(|_| {
            error!("Flash erase {:#x}..{:#x} failed", self.erased_to, to);
            Error::StagingWriteFailed
        })?;
        self.erased_to = to;

        Ok(())
    }
}
