//! Firmware image headers and the validation seam.

use embedded_storage_async::nor_flash::ReadNorFlash;

use crate::{Error, Region, Slot};

/// The image header starts with this magic value, indicating the interpretation of the rest of the header.
pub const IMAGE_MAGIC: u32 = 0x96f3b83d;

/// Image is to be copied to `load_addr` in RAM before execution.
pub const IMAGE_F_RAM_LOAD: u32 = 0x0000_0020;

/// Version of an image, pseudo-semantic.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
    pub build_num: u32,
}

/// Header at the very start of every bank holding an image.
///
/// Little-endian on flash:
///
/// | offset | field              |
/// |--------|--------------------|
/// | 0      | magic              |
/// | 4      | load_addr          |
/// | 8      | hdr_size           |
/// | 10     | protected_tlv_size |
/// | 12     | img_size           |
/// | 16     | flags              |
/// | 20     | version            |
/// | 28     | padding            |
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageHeader {
    /// The address to load this image to. Only used with [`IMAGE_F_RAM_LOAD`].
    pub load_addr: u32,
    /// The size of the header, including padding before the executable image starts.
    pub hdr_size: u16,
    /// The size of the protected TLV area following the image.
    pub protected_tlv_size: u16,
    /// The size of the image, not counting the header.
    pub img_size: u32,
    pub flags: u32,
    pub version: ImageVersion,
}

impl ImageHeader {
    pub const SIZE: usize = 32;

    /// Decode a header, `None` if the magic does not match.
    pub fn parse(raw: &[u8; Self::SIZE]) -> Option<Self> {
        let u16_at = |at: usize| u16::from_le_bytes([raw[at], raw[at + 1]]);
        let u32_at = |at: usize| u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);

        if u32_at(0) != IMAGE_MAGIC {
            return None;
        }

        Some(ImageHeader {
            load_addr: u32_at(4),
            hdr_size: u16_at(8),
            protected_tlv_size: u16_at(10),
            img_size: u32_at(12),
            flags: u32_at(16),
            version: ImageVersion {
                major: raw[20],
                minor: raw[21],
                revision: u16_at(22),
                build_num: u32_at(24),
            },
        })
    }

    /// Read the header of the image in `flash`.
    ///
    /// An erased bank, a bad magic or a header claiming more than the bank holds all mean there is no image.
    pub async fn read<F: ReadNorFlash>(flash: &mut F) -> Result<Self, Error> {
        let mut raw = [0u8; Self::SIZE];
        flash
            .read(0, &mut raw)
            .await
            .map_err(|_| Error::NoBootableImage)?;

        let header = Self::parse(&raw).ok_or(Error::NoBootableImage)?;

        let end = (header.hdr_size as usize).checked_add(header.img_size as usize);
        if (header.hdr_size as usize) < Self::SIZE || end.is_none_or(|end| end > flash.capacity()) {
            warn!("Image header does not fit its bank");
            return Err(Error::NoBootableImage);
        }

        Ok(header)
    }

    /// Whether the image runs from RAM rather than in place.
    pub fn is_ram_load(&self) -> bool {
        self.flags & IMAGE_F_RAM_LOAD != 0
    }
}

/// Everything needed to jump into a validated image.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadDescriptor {
    pub slot: Slot,
    pub region: Region,
    pub header: ImageHeader,
}

impl LoadDescriptor {
    /// Address of the vector table of the image.
    ///
    /// `flash_base` is the address at which the flash device holding the bank is mapped.
    /// An entry beyond the address space is [`Error::LoadFailed`].
    pub fn entry(&self, flash_base: u32) -> Result<u32, Error> {
        let base = if self.header.is_ram_load() {
            Some(self.header.load_addr)
        } else {
            flash_base.checked_add(self.region.offset)
        };

        base.and_then(|base| base.checked_add(u32::from(self.header.hdr_size)))
            .ok_or(Error::LoadFailed)
    }
}

/// Checks an image and makes it ready for execution, for example by hash or signature and by copying it to RAM.
#[allow(async_fn_in_trait)]
pub trait ImageValidator<F: ReadNorFlash> {
    /// Returns [`Error::ValidationFailed`] when the image is rejected and [`Error::LoadFailed`] when it
    /// cannot be prepared for execution.
    async fn validate_and_load(
        &mut self,
        slot: Slot,
        header: &ImageHeader,
        flash: &mut F,
    ) -> Result<(), Error>;
}
