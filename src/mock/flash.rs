use std::{collections::BTreeMap, vec, vec::Vec};

use embedded_storage_async::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

pub const WRITE_SIZE: usize = 4;
pub const ERASE_SIZE: usize = 256;

/// Erase count per page.
#[derive(Debug, Default)]
pub struct WearTracker(BTreeMap<usize, usize>);

impl WearTracker {
    pub const fn new() -> Self {
        WearTracker(BTreeMap::new())
    }

    pub fn increase(&mut self, page: usize) {
        if let Some(wear) = self.0.get_mut(&page) {
            *wear += 1;
        } else {
            self.0.insert(page, 1);
        }
    }

    /// Check wear on all pages for worst wear.
    pub fn check(&self, wear_level: usize) -> bool {
        self.0.values().all(|v| *v <= wear_level)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFlashError {
    Unavailable,
    Injected,
    Kind(NorFlashErrorKind),
}

impl NorFlashError for MockFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            MockFlashError::Kind(kind) => *kind,
            _ => NorFlashErrorKind::Other,
        }
    }
}

/// NOR flash simulator: writes can only clear bits, erases set whole pages to `0xff`.
#[derive(Debug)]
pub struct MockFlash {
    pub data: Vec<u8>,
    pub wear: WearTracker,
    /// Every operation fails.
    pub unavailable: bool,
    /// Number of successful writes after which every write fails.
    pub fail_writes_after: Option<usize>,
    pub writes: usize,
}

impl MockFlash {
    pub fn new(pages: usize) -> Self {
        MockFlash {
            data: vec![0xff; pages * ERASE_SIZE],
            wear: WearTracker::new(),
            unavailable: false,
            fail_writes_after: None,
            writes: 0,
        }
    }

    pub fn unavailable(pages: usize) -> Self {
        MockFlash {
            unavailable: true,
            ..MockFlash::new(pages)
        }
    }

    /// Bank pre-populated with `image` at offset zero.
    pub fn with_image(pages: usize, image: &[u8]) -> Self {
        let mut flash = MockFlash::new(pages);
        flash.data[..image.len()].copy_from_slice(image);
        flash
    }

    fn check(&self, offset: u32, len: usize, align: usize) -> Result<usize, MockFlashError> {
        if self.unavailable {
            return Err(MockFlashError::Unavailable);
        }
        let offset = offset as usize;
        if offset % align != 0 || len % align != 0 {
            return Err(MockFlashError::Kind(NorFlashErrorKind::NotAligned));
        }
        if offset + len > self.data.len() {
            return Err(MockFlashError::Kind(NorFlashErrorKind::OutOfBounds));
        }
        Ok(offset)
    }
}

impl ErrorType for MockFlash {
    type Error = MockFlashError;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.check(offset, bytes.len(), Self::READ_SIZE)?;
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = WRITE_SIZE;
    const ERASE_SIZE: usize = ERASE_SIZE;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if to < from {
            return Err(MockFlashError::Kind(NorFlashErrorKind::OutOfBounds));
        }
        let from = self.check(from, (to - from) as usize, Self::ERASE_SIZE)?;
        let to = to as usize;

        for page in (from..to).step_by(ERASE_SIZE) {
            self.data[page..page + ERASE_SIZE].fill(0xff);
            self.wear.increase(page / ERASE_SIZE);
        }

        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = self.check(offset, bytes.len(), Self::WRITE_SIZE)?;
        if self.fail_writes_after.is_some_and(|limit| self.writes >= limit) {
            return Err(MockFlashError::Injected);
        }

        for (cell, byte) in self.data[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        self.writes += 1;

        Ok(())
    }
}
