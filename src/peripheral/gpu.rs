use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::logger::Logger;
use crate::peripheral::Peripheral;

/// Character output device. A byte written to offset 0 is emitted to the
/// output sink immediately; every other offset is ignored.
pub struct Gpu {
    output: Box<dyn Write + Send>,
    logger: Logger,
}

impl Gpu {
    pub fn new(output: Box<dyn Write + Send>, logger: Logger) -> Self {
        Self { output, logger }
    }
}

impl Peripheral for Gpu {
    fn name(&self) -> &'static str {
        "GPU"
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, address: u32) -> u8 {
        self.logger
            .warn(format_args!("GPU has no readable registers: ${:X}", address));
        0
    }

    fn write(&mut self, address: u32, data: u8) {
        if address != 0 {
            self.logger.warn(format_args!(
                "GPU write of ${:02X} to unused offset ${:X}",
                data, address
            ));
            return;
        }
        let written = self
            .output
            .write_all(&[data])
            .and_then(|()| self.output.flush());
        if let Err(e) = written {
            self.logger.error(format_args!("GPU output: {}", e));
        }
    }
}

/// In-memory output sink that can be inspected while a GPU owns a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::other("output buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
