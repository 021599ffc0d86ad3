//! CRC-32/ISO-HDLC (IEEE 802.3) accumulator.
//!
//! Reflected polynomial `0xEDB88320`, initial register `0xFFFFFFFF`, output XORed with
//! `0xFFFFFFFF`. Input is processed LSB-first, one bit at a time.

/// Reflected CRC-32/ISO-HDLC polynomial.
pub const POLYNOMIAL: u32 = 0xEDB8_8320;

const INITIAL: u32 = 0xFFFF_FFFF;
const FINAL_XOR: u32 = 0xFFFF_FFFF;

/// Streaming CRC-32 accumulator.
///
/// ```
/// use streamframe_frame::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.finalize(), 0xEC4A_C3D0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    register: u32,
}

impl Crc32 {
    /// Create a fresh accumulator.
    pub const fn new() -> Self {
        Self { register: INITIAL }
    }

    /// Feed `data` into the register. Calls are order-sensitive.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.register ^= u32::from(byte);
            for _ in 0..8 {
                if self.register & 1 != 0 {
                    self.register = (self.register >> 1) ^ POLYNOMIAL;
                } else {
                    self.register >>= 1;
                }
            }
        }
    }

    /// The checksum of everything fed so far. Does not consume or alter the register.
    pub const fn finalize(&self) -> u32 {
        self.register ^ FINAL_XOR
    }

    /// One-shot checksum of `data`.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}
