//! CPU-private RAM: zero page, stack, and scratch space.
//!
//! Accessed synchronously by the MMU; never goes over a bus.

pub struct PrivRam {
    storage: Vec<u8>,
}

impl PrivRam {
    pub fn new(size: usize) -> Self {
        Self {
            storage: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// `offset` comes from a PrivRAM mapping, so it is always below `len()`.
    pub fn read(&self, offset: u32) -> u8 {
        self.storage[offset as usize]
    }

    pub fn write(&mut self, offset: u32, data: u8) {
        self.storage[offset as usize] = data;
    }

    pub fn clear(&mut self) {
        self.storage.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_and_stores_bytes() {
        let mut ram = PrivRam::new(0x2000);
        assert_eq!(ram.len(), 0x2000);
        assert_eq!(ram.read(0x01FF), 0);
        ram.write(0x01FF, 0x42);
        assert_eq!(ram.read(0x01FF), 0x42);
        ram.clear();
        assert_eq!(ram.read(0x01FF), 0);
    }
}
