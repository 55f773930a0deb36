//! Simple straightforward implementation of keeping the state.
//!
//! Leverages `sequential-storage` and `postcard` to store and serialize/deserialize the bootloader state.
//! `sequential-storage` appends every new record and only retires the old one afterwards, so a power
//! loss during `write` leaves either the old or the new record readable, never a mixture.

use core::ops::Range;

use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::{
    cache::NoCache,
    map::{SerializationError, Value},
};

use crate::{Error, state::BootState};

/// Key under which the record is stored in the map.
const STATE_KEY: u8 = 0;

/// Scratch space for (de)serialization, comfortably above the three byte record.
const DATA_BUFFER_SIZE: usize = 32;

impl<'a> Value<'a> for BootState {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let buffer = postcard::to_slice(self, buffer).map_err(|e| match e {
            postcard::Error::SerializeBufferFull => SerializationError::BufferTooSmall,
            // Unmapped error.
            _ => SerializationError::Custom(0),
        })?;

        Ok(buffer.len())
    }

    fn deserialize_from(buffer: &'a [u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        postcard::from_bytes(buffer).map_err(|e| match e {
            // Provided buffer is too small.
            postcard::Error::DeserializeUnexpectedEnd => SerializationError::BufferTooSmall,
            // Data type mismatch between Value and what is stored on disk.
            postcard::Error::DeserializeBadVarint
            | postcard::Error::DeserializeBadBool
            | postcard::Error::DeserializeBadChar
            | postcard::Error::DeserializeBadUtf8
            | postcard::Error::DeserializeBadOption
            | postcard::Error::DeserializeBadEnum
            | postcard::Error::DeserializeBadEncoding => SerializationError::InvalidFormat,
            // Out of range slot identifiers end up here.
            _ => SerializationError::InvalidData,
        })
    }
}

/// Handle on the boot state partition, held for the duration of one boot attempt.
///
/// The partition is borrowed for as long as the handle lives; dropping or [`close`](Self::close)-ing
/// the handle releases it on every path out of the boot sequence.
pub struct BootStateStore<'a, F: NorFlash> {
    flash: &'a mut F,
    range: Range<u32>,
    cache: NoCache,
}

impl<'a, F: NorFlash> BootStateStore<'a, F> {
    /// Attach the partition.
    ///
    /// The partition needs at least two erase pages and must answer a read.
    pub async fn open(flash: &'a mut F) -> Result<Self, Error> {
        let pages = flash.capacity() / F::ERASE_SIZE;
        if pages < 2 {
            error!("Boot state partition holds {} pages, need at least 2", pages);
            return Err(Error::StorageUnavailable);
        }

        let mut probe = [0u8; 4];
        let probe_len = F::READ_SIZE.clamp(1, probe.len());
        if flash.read(0, &mut probe[..probe_len]).await.is_err() {
            error!("Boot state partition does not respond");
            return Err(Error::StorageUnavailable);
        }

        let range = 0..(pages * F::ERASE_SIZE) as u32;
        debug!("Opened boot state partition ({} pages)", pages);

        Ok(Self {
            flash,
            range,
            cache: NoCache::new(),
        })
    }

    /// Last persisted record, or [`BootState::INITIAL`] on a blank partition.
    pub async fn read(&mut self) -> Result<BootState, Error> {
        let mut data_buffer = [0u8; DATA_BUFFER_SIZE];

        let state = sequential_storage::map::fetch_item::<u8, BootState, _>(
            &mut *self.flash,
            self.range.clone(),
            &mut self.cache,
            &mut data_buffer,
            &STATE_KEY,
        )
        .await
        .map_err(map_storage_error)?;

        Ok(match state {
            Some(state) => state,
            None => {
                debug!("Boot state partition does not contain a record");
                BootState::INITIAL
            }
        })
    }

    pub async fn write(&mut self, state: &BootState) -> Result<(), Error> {
        let mut data_buffer = [0u8; DATA_BUFFER_SIZE];

        debug!("Storing {:?}", state);

        sequential_storage::map::store_item::<u8, BootState, _>(
            &mut *self.flash,
            self.range.clone(),
            &mut self.cache,
            &mut data_buffer,
            &STATE_KEY,
            state,
        )
        .await
        .map_err(map_storage_error)
    }

    /// Wipe the partition, after which `read` yields the initial record.
    pub async fn erase(&mut self) -> Result<(), Error> {
        warn!("Erasing boot state partition");
        sequential_storage::erase_all(&mut *self.flash, self.range.clone())
            .await
            .map_err(map_storage_error)?;
        self.cache = NoCache::new();
        Ok(())
    }

    /// Release the partition.
    pub fn close(self) {
        debug!("Closed boot state partition");
    }
}

fn map_storage_error<E>(error: sequential_storage::Error<E>) -> Error {
    match error {
        sequential_storage::Error::Storage { .. } => Error::StorageUnavailable,
        _ => Error::StorageCorrupt,
    }
}
