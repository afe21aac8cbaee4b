//! Huffman coding for JPEG 1 baseline scans.
//! Canonical table construction, symbol encode/decode and DHT payload parsing.

use crate::error::{RequantError, Result};
use crate::jpeg1::bit_io::{JpegBitReader, JpegBitWriter};

/// Represents a Huffman code with its bit value and length.
/// A length of zero marks a symbol absent from the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

/// Table class of a DHT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanClass {
    Dc = 0,
    Ac = 1,
}

impl HuffmanClass {
    pub fn name(self) -> &'static str {
        match self {
            HuffmanClass::Dc => "DC",
            HuffmanClass::Ac => "AC",
        }
    }
}

/// Standard JPEG DC luminance Huffman table lengths (Table K.3).
pub const STD_LUMINANCE_DC_LENGTHS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];

/// Standard JPEG DC luminance Huffman table values (Table K.3).
pub const STD_LUMINANCE_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard JPEG DC chrominance Huffman table lengths (Table K.4).
pub const STD_CHROMINANCE_DC_LENGTHS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];

/// Standard JPEG DC chrominance Huffman table values (Table K.4).
pub const STD_CHROMINANCE_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard JPEG AC luminance Huffman table lengths (Table K.5).
pub const STD_LUMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125];

/// Standard JPEG AC luminance Huffman table values (Table K.5).
#[rustfmt::skip]
pub const STD_LUMINANCE_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16,
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4,
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea,
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Standard JPEG AC chrominance Huffman table lengths (Table K.6).
pub const STD_CHROMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119];

/// Standard JPEG AC chrominance Huffman table values (Table K.6).
#[rustfmt::skip]
pub const STD_CHROMINANCE_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34,
    0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4,
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2,
    0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9,
    0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Canonical Huffman table usable for both encoding and decoding.
#[derive(Clone, Debug)]
pub struct HuffmanTable {
    pub codes: [HuffmanCode; 256],
    pub lengths: [u8; 16],
    pub values: Vec<u8>,

    // Decoding fields, indexed by code length - 1
    min_code: [i32; 16],
    max_code: [i32; 16],
    val_ptr: [i32; 16],
}

impl HuffmanTable {
    /// Builds a table from JPEG DHT lengths and values.
    ///
    /// Codes are assigned densely: within a length they increase by one, and
    /// the running code is shifted left when moving to the next length. The
    /// all-ones code of the longest length is not reserved.
    pub fn build_from_dht(lengths: &[u8; 16], values: &[u8]) -> Result<Self> {
        let total: usize = lengths.iter().map(|&n| n as usize).sum();
        if total != values.len() || total > 256 {
            return Err(RequantError::InvalidHuffmanTable);
        }

        let mut table = Self {
            codes: [HuffmanCode::default(); 256],
            lengths: *lengths,
            values: values.to_vec(),
            min_code: [0; 16],
            max_code: [-1; 16],
            val_ptr: [0; 16],
        };

        let mut code = 0u32;
        let mut val_idx = 0;
        for i in 0..16 {
            let n_codes = lengths[i] as usize;
            if n_codes > 0 {
                table.val_ptr[i] = val_idx as i32;
                table.min_code[i] = code as i32;
                for _ in 0..n_codes {
                    if code >= 1 << (i + 1) {
                        return Err(RequantError::InvalidHuffmanTable);
                    }
                    table.codes[values[val_idx] as usize] = HuffmanCode {
                        value: code as u16,
                        length: (i + 1) as u8,
                    };
                    code += 1;
                    val_idx += 1;
                }
                table.max_code[i] = code as i32 - 1;
            }
            code <<= 1;
        }
        Ok(table)
    }

    pub fn standard_luminance_dc() -> Self {
        Self::standard(&STD_LUMINANCE_DC_LENGTHS, &STD_LUMINANCE_DC_VALUES)
    }

    pub fn standard_luminance_ac() -> Self {
        Self::standard(&STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES)
    }

    pub fn standard_chrominance_dc() -> Self {
        Self::standard(&STD_CHROMINANCE_DC_LENGTHS, &STD_CHROMINANCE_DC_VALUES)
    }

    pub fn standard_chrominance_ac() -> Self {
        Self::standard(&STD_CHROMINANCE_AC_LENGTHS, &STD_CHROMINANCE_AC_VALUES)
    }

    fn standard(lengths: &[u8; 16], values: &[u8]) -> Self {
        match Self::build_from_dht(lengths, values) {
            Ok(table) => table,
            Err(_) => unreachable!("Annex K tables are well formed"),
        }
    }

    /// Returns the code for `symbol`, or `UnknownSymbol` if the table lacks it.
    pub fn encode(&self, symbol: u8) -> Result<HuffmanCode> {
        let code = self.codes[symbol as usize];
        if code.length == 0 {
            return Err(RequantError::UnknownSymbol(symbol));
        }
        Ok(code)
    }

    /// Writes the code for `symbol` to `writer`.
    pub fn write_symbol(&self, symbol: u8, writer: &mut JpegBitWriter) -> Result<()> {
        let code = self.encode(symbol)?;
        writer.write_bits(code.value, code.length);
        Ok(())
    }

    /// Decodes the next symbol, reading one bit at a time.
    pub fn decode(&self, reader: &mut JpegBitReader) -> Result<u8> {
        let mut code = 0i32;
        for i in 0..16 {
            code = (code << 1) | reader.read_bit()? as i32;
            if self.max_code[i] >= 0 && code >= self.min_code[i] && code <= self.max_code[i] {
                let idx = self.val_ptr[i] + (code - self.min_code[i]);
                return Ok(self.values[idx as usize]);
            }
        }
        Err(RequantError::InvalidCode)
    }
}

/// One table definition from a DHT segment.
#[derive(Clone, Debug)]
pub struct HuffmanTableSpec {
    pub class: HuffmanClass,
    pub id: u8,
    pub table: HuffmanTable,
}

/// Splits a DHT payload into its table definitions.
pub fn parse_dht_payload(payload: &[u8]) -> Result<Vec<HuffmanTableSpec>> {
    let mut specs = Vec::new();
    let mut position = 0;
    while position < payload.len() {
        let tc_th = payload[position];
        let class = match tc_th >> 4 {
            0 => HuffmanClass::Dc,
            1 => HuffmanClass::Ac,
            _ => return Err(RequantError::InvalidHuffmanTable),
        };
        let id = tc_th & 0x0F;
        position += 1;

        let lengths: [u8; 16] = payload
            .get(position..position + 16)
            .and_then(|s| s.try_into().ok())
            .ok_or(RequantError::InvalidHuffmanTable)?;
        position += 16;

        let total_values: usize = lengths.iter().map(|&n| n as usize).sum();
        let values = payload
            .get(position..position + total_values)
            .ok_or(RequantError::InvalidHuffmanTable)?;
        position += total_values;

        specs.push(HuffmanTableSpec {
            class,
            id,
            table: HuffmanTable::build_from_dht(&lengths, values)?,
        });
    }
    Ok(specs)
}

/// Computes the magnitude category of an integer (ISO/IEC 10918-1 F.1.2.1).
pub fn category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// Encodes the bits for a given category and value (ISO/IEC 10918-1 F.1.2.1.1).
/// Negative values are written as `(1 << size) + value - 1`.
pub fn amplitude_bits(value: i32, size: u8) -> u16 {
    if size == 0 {
        return 0;
    }
    if value >= 0 {
        value as u16
    } else {
        ((1i32 << size) + value - 1) as u16
    }
}

/// Decodes the value from bits given its category (ISO/IEC 10918-1 F.2.2.1).
pub fn decode_amplitude(bits: u16, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }
    let threshold = 1i32 << (size - 1);
    if (bits as i32) < threshold {
        bits as i32 - ((1i32 << size) - 1)
    } else {
        bits as i32
    }
}

/// Category of `value`, rejecting magnitudes that need more than 15 bits.
pub fn checked_category(value: i32) -> Result<u8> {
    let size = category(value);
    if size > 15 {
        return Err(RequantError::AmplitudeOutOfRange(value));
    }
    Ok(size)
}
