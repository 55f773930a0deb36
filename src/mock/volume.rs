use std::vec::Vec;

use crate::staging::Volume;

#[derive(Debug, PartialEq, Eq)]
pub enum MockVolumeError {
    NoMedium,
    NotFound,
    Io,
}

/// Volume with room for a single file.
#[derive(Debug, Default)]
pub struct MockVolume {
    pub present: bool,
    pub mounted: bool,
    pub mounts: usize,
    pub unmounts: usize,
    pub name: &'static str,
    pub file: Option<Vec<u8>>,
    /// Indices of `read` calls that fail without consuming data.
    pub failing_reads: Vec<usize>,
    /// Every read fails.
    pub broken: bool,
    pub reads: usize,
}

pub struct MockFile {
    pos: usize,
}

impl MockVolume {
    pub fn absent() -> Self {
        MockVolume::default()
    }

    pub fn empty() -> Self {
        MockVolume {
            present: true,
            ..MockVolume::default()
        }
    }

    pub fn with_file(name: &'static str, data: &[u8]) -> Self {
        MockVolume {
            present: true,
            name,
            file: Some(data.to_vec()),
            ..MockVolume::default()
        }
    }
}

impl Volume for MockVolume {
    type File = MockFile;
    type Error = MockVolumeError;

    async fn mount(&mut self) -> Result<(), Self::Error> {
        if !self.present {
            return Err(MockVolumeError::NoMedium);
        }
        assert!(!self.mounted, "mounted twice");
        self.mounted = true;
        self.mounts += 1;
        Ok(())
    }

    async fn unmount(&mut self) {
        assert!(self.mounted, "unmounted while not mounted");
        self.mounted = false;
        self.unmounts += 1;
    }

    async fn open(&mut self, name: &str) -> Result<Option<MockFile>, Self::Error> {
        assert!(self.mounted);
        if self.file.is_some() && self.name == name {
            Ok(Some(MockFile { pos: 0 }))
        } else {
            Ok(None)
        }
    }

    async fn read(&mut self, file: &mut MockFile, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let call = self.reads;
        self.reads += 1;
        if self.broken || self.failing_reads.contains(&call) {
            return Err(MockVolumeError::Io);
        }

        let data = self.file.as_ref().ok_or(MockVolumeError::NotFound)?;
        let len = buffer.len().min(data.len() - file.pos);
        buffer[..len].copy_from_slice(&data[file.pos..file.pos + len]);
        file.pos += len;
        Ok(len)
    }

    async fn close(&mut self, _file: MockFile) {}

    async fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
        assert!(self.mounted);
        if self.file.is_some() && self.name == name {
            self.file = None;
            Ok(())
        } else {
            Err(MockVolumeError::NotFound)
        }
    }
}
