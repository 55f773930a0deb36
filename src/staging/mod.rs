//! Staging of firmware images from a removable volume into the inactive bank.
//!
//! A staging file is consumed exactly once: after the copy it is removed from the volume,
//! whether or not the copy succeeded, so a bad file cannot trap the device in a staging loop.
//! `Config::retain_on_failure` keeps a file whose copy failed around for another attempt instead.

use embedded_storage_async::nor_flash::NorFlash;

use crate::{Config, Error, Slot, watchdog::Watchdog};

mod cursor;

pub use cursor::{ERASED, FlashWriteCursor};

/// Removable storage volume holding the staging file, typically a FAT filesystem.
///
/// Files are addressed through handles that stay valid until passed to `close`.
#[allow(async_fn_in_trait)]
pub trait Volume {
    type File;
    type Error;

    /// Attach the filesystem. Fails when no medium is present.
    async fn mount(&mut self) -> Result<(), Self::Error>;

    async fn unmount(&mut self);

    /// Open a file at the root of the volume, `None` if it does not exist.
    async fn open(&mut self, name: &str) -> Result<Option<Self::File>, Self::Error>;

    /// Read the next chunk of the file into `buffer`.
    ///
    /// Fills `buffer` completely unless the end of the file is reached.
    async fn read(&mut self, file: &mut Self::File, buffer: &mut [u8]) -> Result<usize, Self::Error>;

    async fn close(&mut self, file: Self::File);

    async fn remove(&mut self, name: &str) -> Result<(), Self::Error>;
}

/// Result of one staging attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StagingOutcome {
    /// The volume could not be mounted; nothing was requested.
    NoVolume,
    /// The volume holds no staging file, or an empty one.
    NoImagePresent,
    /// The complete image was written to the target bank.
    Staged { bytes: usize },
    /// The copy was aborted; the target bank holds a partial image.
    WriteFailed { bytes: usize },
}

impl StagingOutcome {
    pub fn bytes(&self) -> usize {
        match self {
            StagingOutcome::Staged { bytes } | StagingOutcome::WriteFailed { bytes } => *bytes,
            _ => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StagingOutcome::Staged { .. })
    }

    pub fn into_result(self) -> Result<usize, Error> {
        match self {
            StagingOutcome::Staged { bytes } => Ok(bytes),
            StagingOutcome::WriteFailed { .. } => Err(Error::StagingWriteFailed),
            StagingOutcome::NoVolume | StagingOutcome::NoImagePresent => Err(Error::NoImagePresent),
        }
    }
}

/// Copies the staging file from a [`Volume`] into a bank.
pub struct Stager<'a, V: Volume, W: Watchdog> {
    volume: &'a mut V,
    watchdog: &'a mut W,
    config: Config,
}

impl<'a, V: Volume, W: Watchdog> Stager<'a, V, W> {
    pub fn new(volume: &'a mut V, watchdog: &'a mut W, config: Config) -> Self {
        Self {
            volume,
            watchdog,
            config,
        }
    }

    /// Stage the image into `flash`, the bank of `target`.
    ///
    /// `target` must be the inactive bank. `buffer` bounds the block size and must be a
    /// non-zero multiple of the bank's `WRITE_SIZE`.
    pub async fn stage<F: NorFlash>(
        &mut self,
        target: Slot,
        flash: &mut F,
        buffer: &mut [u8],
    ) -> StagingOutcome {
        if buffer.is_empty() || buffer.len() % F::WRITE_SIZE != 0 {
            error!("Staging buffer of {} bytes is not write aligned", buffer.len());
            return StagingOutcome::WriteFailed { bytes: 0 };
        }

        info!("Checking for staging file \"{}\"", self.config.staging_file);
        if self.volume.mount().await.is_err() {
            info!("No removable volume, nothing to stage");
            return StagingOutcome::NoVolume;
        }

        let outcome = self.stage_mounted(target, flash, buffer).await;
        self.volume.unmount().await;
        outcome
    }

    async fn stage_mounted<F: NorFlash>(
        &mut self,
        target: Slot,
        flash: &mut F,
        buffer: &mut [u8],
    ) -> StagingOutcome {
        let name = self.config.staging_file;
        let mut file = match self.volume.open(name).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                info!("No staging file \"{}\" on volume", name);
                return StagingOutcome::NoImagePresent;
            }
            Err(_) => {
                warn!("Failed to open staging file \"{}\"", name);
                return StagingOutcome::NoImagePresent;
            }
        };

        info!("Staging file \"{}\" found, copying into slot {}", name, target.id());
        let copied = self.copy(&mut file, flash, buffer).await;
        self.volume.close(file).await;

        let outcome = match copied {
            Ok(0) => {
                warn!("Staging file is empty");
                StagingOutcome::NoImagePresent
            }
            Ok(bytes) => {
                info!("Wrote {} bytes to slot {}", bytes, target.id());
                StagingOutcome::Staged { bytes }
            }
            Err(bytes) => {
                error!("Staging into slot {} aborted after {} bytes", target.id(), bytes);
                StagingOutcome::WriteFailed { bytes }
            }
        };

        if matches!(outcome, StagingOutcome::WriteFailed { .. }) && self.config.retain_on_failure {
            warn!("Keeping staging file \"{}\" for another attempt", name);
        } else if self.volume.remove(name).await.is_err() {
            error!("Failed to remove staging file \"{}\"", name);
        } else {
            info!("Removed staging file \"{}\"", name);
        }

        outcome
    }

    /// Stream the file block by block, returning the bytes written either way.
    async fn copy<F: NorFlash>(
        &mut self,
        file: &mut V::File,
        flash: &mut F,
        buffer: &mut [u8],
    ) -> Result<usize, usize> {
        let feed_interval = self.config.feed_interval.max(1);
        let mut cursor = FlashWriteCursor::new(flash);
        let mut blocks = 0u32;
        let mut read_failures = 0u32;

        while !cursor.is_flushed() {
            let len = match self.volume.read(file, buffer).await {
                Ok(len) => {
                    read_failures = 0;
                    len
                }
                Err(_) => {
                    read_failures += 1;
                    error!("Failed to read staging file ({} in a row)", read_failures);
                    self.watchdog.feed();
                    if read_failures >= self.config.max_read_failures {
                        return Err(cursor.written());
                    }
                    continue;
                }
            };

            let last = len != buffer.len();
            if cursor.write_block(buffer, len, last).await.is_err() {
                return Err(cursor.written());
            }

            if blocks % feed_interval == 0 {
                info!("Wrote {} B", cursor.written());
                self.watchdog.feed();
            }
            blocks = blocks.wrapping_add(1);
        }

        Ok(cursor.written())
    }
}
