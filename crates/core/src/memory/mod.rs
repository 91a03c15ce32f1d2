// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// A simple flat memory storage
#[derive(Debug, Clone)]
pub struct LinearMemory {
    pub name: String,
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl LinearMemory {
    pub fn new(name: &str, size: usize, base_addr: u64) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn contains(&self, addr: u64, len: u64) -> bool {
        addr >= self.base_addr && addr + len <= self.base_addr + self.data.len() as u64
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        if self.contains(addr, 1) {
            Some(self.data[(addr - self.base_addr) as usize])
        } else {
            None
        }
    }

    pub fn read_u32(&self, addr: u64) -> Option<u32> {
        if !self.contains(addr, 4) {
            return None;
        }
        let offset = (addr - self.base_addr) as usize;
        let bytes = &self.data[offset..offset + 4];
        // Little Endian
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> bool {
        if !self.contains(addr, 4) {
            return false;
        }
        let offset = (addr - self.base_addr) as usize;
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        true
    }

    /// Store `words` back to back starting at `addr`.
    pub fn load_words(&mut self, addr: u64, words: &[u32]) -> bool {
        if !self.contains(addr, words.len() as u64 * 4) {
            return false;
        }
        for (i, word) in words.iter().enumerate() {
            self.write_u32(addr + i as u64 * 4, *word);
        }
        true
    }

    pub fn words(&self, addr: u64, count: usize) -> Option<Vec<u32>> {
        (0..count as u64).map(|i| self.read_u32(addr + i * 4)).collect()
    }
}
