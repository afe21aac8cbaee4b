//! Bit-level I/O for entropy-coded scan data.
//!
//! Bits are read and written most-significant first. Every 0xFF byte in the
//! entropy-coded segment is followed by a stuffed 0x00 so that it cannot be
//! mistaken for a marker; the writer inserts it and the reader drops it.

use crate::error::{RequantError, Result};

/// Reads bits from entropy-coded bytes, skipping stuffed 0x00 after 0xFF.
pub struct JpegBitReader<'a> {
    source: &'a [u8],
    position: usize,
    bit_offset: u8,
}

impl<'a> JpegBitReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            bit_offset: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<u8> {
        let Some(&byte) = self.source.get(self.position) else {
            return Err(RequantError::StreamExhausted);
        };
        let bit = (byte >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;
        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.position += 1;
            if byte == 0xFF && self.source.get(self.position) == Some(&0x00) {
                self.position += 1;
            }
        }
        Ok(bit)
    }

    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        debug_assert!(count <= 16);
        let mut value = 0u16;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u16;
        }
        Ok(value)
    }

    /// True when nothing but the padding bits of the final byte remain.
    pub fn is_at_end_of_data(&self) -> bool {
        if self.position >= self.source.len() {
            return true;
        }
        if self.bit_offset == 0 {
            return false;
        }
        let mut next = self.position + 1;
        if self.source[self.position] == 0xFF && self.source.get(next) == Some(&0x00) {
            next += 1;
        }
        next >= self.source.len()
    }

    /// Byte offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Packs bits into bytes with JPEG byte stuffing.
#[derive(Default)]
pub struct JpegBitWriter {
    destination: Vec<u8>,
    bit_buffer: u8,
    bits_in_buffer: u8,
}

impl JpegBitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.bit_buffer = (self.bit_buffer << 1) | (bit & 1);
        self.bits_in_buffer += 1;
        if self.bits_in_buffer == 8 {
            self.emit_byte();
        }
    }

    /// Writes the low `length` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u16, length: u8) {
        debug_assert!(length <= 16);
        for shift in (0..length).rev() {
            self.write_bit(((value >> shift) & 1) as u8);
        }
    }

    fn emit_byte(&mut self) {
        let byte = self.bit_buffer;
        self.destination.push(byte);
        if byte == 0xFF {
            self.destination.push(0x00);
        }
        self.bit_buffer = 0;
        self.bits_in_buffer = 0;
    }

    /// Pads a partial byte with zero bits and emits it.
    pub fn flush(&mut self) {
        if self.bits_in_buffer > 0 {
            self.bit_buffer <<= 8 - self.bits_in_buffer;
            self.emit_byte();
        }
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.destination
    }
}
