//! CRC-32 as used by PNG chunk checksums (ISO 3309 / ITU-T V.42).
//!
//! Reflected polynomial `0xEDB88320`, initial value `0xFFFFFFFF`, final
//! complement. The lookup table is built on first use and shared by every
//! caller afterwards.

use std::sync::LazyLock;

const POLYNOMIAL: u32 = 0xEDB8_8320;

static TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| {
    let mut table = [0u32; 256];
    for (n, slot) in table.iter_mut().enumerate() {
        let mut c = n as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 {
                POLYNOMIAL ^ (c >> 1)
            } else {
                c >> 1
            };
        }
        *slot = c;
    }
    table
});

/// Running checksum over one or more byte slices.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let table = &*TABLE;
        for &byte in bytes {
            self.state = table[((self.state ^ byte as u32) & 0xFF) as usize] ^ (self.state >> 8);
        }
    }

    pub fn finalize(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot checksum of `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn check_value() {
        // Standard CRC-32 check value
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn iend_chunk_crc() {
        // Every PNG ends with IEND and this CRC
        assert_eq!(crc32(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut crc = Crc32::new();
        crc.update(b"pHYs");
        crc.update(&[0, 0, 0x2E, 0x23, 0, 0, 0x2E, 0x23, 1]);
        let mut joined = b"pHYs".to_vec();
        joined.extend_from_slice(&[0, 0, 0x2E, 0x23, 0, 0, 0x2E, 0x23, 1]);
        assert_eq!(crc.finalize(), crc32(&joined));
    }

    #[test]
    fn matches_crc32fast() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        for len in [0, 1, 7, 64, 1000, data.len()] {
            let slice = &data[..len];
            assert_eq!(crc32(slice), crc32fast::hash(slice), "len {len}");
        }
    }
}
