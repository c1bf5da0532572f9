use std::fs;
use std::path::PathBuf;

use crate::error::{EmuError, Result};
use crate::logger::Logger;
use crate::peripheral::Peripheral;

/// Read-only store filled from a raw binary image on reset.
///
/// The image is copied from physical offset 0. A short image leaves the
/// rest of the ROM zeroed; a long one is truncated to the capacity. A ROM
/// without an image file keeps whatever `load` put there.
pub struct Rom {
    storage: Vec<u8>,
    image: Option<PathBuf>,
    logger: Logger,
}

impl Rom {
    pub fn new(size: usize, image: Option<PathBuf>, logger: Logger) -> Self {
        Self {
            storage: vec![0; size],
            image,
            logger,
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Zeroes the ROM and copies in as much of `bytes` as fits. Returns the
    /// number of bytes copied.
    pub fn load(&mut self, bytes: &[u8]) -> usize {
        self.storage.fill(0);
        let n = bytes.len().min(self.storage.len());
        self.storage[..n].copy_from_slice(&bytes[..n]);
        if n < bytes.len() {
            self.logger.warn(format_args!(
                "ROM image is {} bytes, only the first {} fit",
                bytes.len(),
                n
            ));
        }
        n
    }
}

impl Peripheral for Rom {
    fn name(&self) -> &'static str {
        "ROM"
    }

    fn reset(&mut self) -> Result<()> {
        let Some(path) = self.image.clone() else {
            self.logger.info("ROM has no image file, contents kept");
            return Ok(());
        };
        let bytes = fs::read(&path).map_err(|source| EmuError::Io {
            path: path.clone(),
            source,
        })?;
        let n = self.load(&bytes);
        self.logger
            .info(format_args!("loaded {} bytes from {}", n, path.display()));
        Ok(())
    }

    fn read(&mut self, address: u32) -> u8 {
        match self.storage.get(address as usize) {
            Some(&data) => data,
            None => {
                self.logger
                    .warn(format_args!("ROM read past end: ${:X}", address));
                0
            }
        }
    }

    fn write(&mut self, address: u32, data: u8) {
        self.logger.error(format_args!(
            "ROM is read-only, ${:02X} to ${:X} dropped",
            data, address
        ));
    }
}
