use crate::error::Result;
use crate::logger::Logger;
use crate::peripheral::Peripheral;

/// General-purpose RAM behind a bus.
pub struct Ram {
    storage: Vec<u8>,
    logger: Logger,
}

impl Ram {
    pub fn new(size: usize, logger: Logger) -> Self {
        Self {
            storage: vec![0; size],
            logger,
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl Peripheral for Ram {
    fn name(&self) -> &'static str {
        "RAM"
    }

    fn reset(&mut self) -> Result<()> {
        self.storage.fill(0);
        Ok(())
    }

    fn read(&mut self, address: u32) -> u8 {
        match self.storage.get(address as usize) {
            Some(&data) => data,
            None => {
                self.logger
                    .warn(format_args!("RAM read past end: ${:X}", address));
                0
            }
        }
    }

    fn write(&mut self, address: u32, data: u8) {
        match self.storage.get_mut(address as usize) {
            Some(cell) => *cell = data,
            None => self
                .logger
                .warn(format_args!("RAM write past end: ${:X}", address)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;

    #[test]
    fn stores_bytes_and_clears_on_reset() {
        let mut ram = Ram::new(0x20, Logger::new(LogLevel::Error));
        assert_eq!(ram.len(), 0x20);
        ram.write(0x1F, 0x99);
        assert_eq!(ram.read(0x1F), 0x99);

        ram.reset().unwrap();
        assert_eq!(ram.read(0x1F), 0x00);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut ram = Ram::new(4, Logger::new(LogLevel::Error));
        ram.write(4, 0xFF);
        assert_eq!(ram.read(4), 0);
        assert_eq!(ram.len(), 4);
    }
}
