//! Quantization tables for JPEG 1: DQT payload handling, quality scaling and
//! the quantization of DCT coefficients.

use crate::constants::{MAXIMUM_QUALITY, MINIMUM_QUALITY};
use crate::error::{RequantError, Result};
use crate::jpeg1::dct::{BLOCK_DIM, BLOCK_SIZE};
use crate::jpeg1::zigzag;

/// Coefficient block in row-major 8x8 form.
pub type CoefficientMatrix = [[i32; BLOCK_SIZE]; BLOCK_SIZE];

/// Standard JPEG luminance quantization table (Quality 50).
#[rustfmt::skip]
pub const STD_LUMINANCE_QUANT_TABLE: [u16; BLOCK_DIM] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Quality 50).
#[rustfmt::skip]
pub const STD_CHROMINANCE_QUANT_TABLE: [u16; BLOCK_DIM] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Precision of the entries of a quantization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantPrecision {
    Bits8 = 0,
    Bits16 = 1,
}

/// A quantization table in row-major natural order. Entries are never zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    pub id: u8,
    pub precision: QuantPrecision,
    pub values: [[u16; BLOCK_SIZE]; BLOCK_SIZE],
}

impl QuantizationTable {
    /// Builds an 8-bit table from row-major values.
    pub fn from_row_major(id: u8, values: &[u16; BLOCK_DIM]) -> Result<Self> {
        if values.iter().any(|&v| v == 0 || v > 255) {
            return Err(RequantError::InvalidQuantizationTable);
        }
        let mut matrix = [[0u16; BLOCK_SIZE]; BLOCK_SIZE];
        for (i, &v) in values.iter().enumerate() {
            matrix[i / BLOCK_SIZE][i % BLOCK_SIZE] = v;
        }
        Ok(Self {
            id,
            precision: QuantPrecision::Bits8,
            values: matrix,
        })
    }

    pub fn standard_luminance(id: u8) -> Self {
        Self::standard(id, &STD_LUMINANCE_QUANT_TABLE)
    }

    pub fn standard_chrominance(id: u8) -> Self {
        Self::standard(id, &STD_CHROMINANCE_QUANT_TABLE)
    }

    fn standard(id: u8, values: &[u16; BLOCK_DIM]) -> Self {
        match Self::from_row_major(id, values) {
            Ok(table) => table,
            Err(_) => unreachable!("Annex K tables have no zero entries"),
        }
    }

    /// Entries in zigzag order, as stored in a DQT segment.
    pub fn zigzag_values(&self) -> [u16; BLOCK_DIM] {
        match zigzag::to_scan_order(&self.values) {
            Ok(flat) => flat,
            Err(_) => unreachable!("table is always 8x8"),
        }
    }
}

/// Splits a DQT payload into its tables. Each table is one `Pq|Tq` byte
/// followed by 64 zigzag-ordered entries of 1 (Pq = 0) or 2 (Pq = 1) bytes.
pub fn parse_dqt_payload(payload: &[u8]) -> Result<Vec<QuantizationTable>> {
    let mut tables = Vec::new();
    let mut position = 0;
    while position < payload.len() {
        let pq_tq = payload[position];
        position += 1;
        let precision = match pq_tq >> 4 {
            0 => QuantPrecision::Bits8,
            1 => QuantPrecision::Bits16,
            _ => return Err(RequantError::InvalidQuantizationTable),
        };
        let entry_size = if precision == QuantPrecision::Bits16 { 2 } else { 1 };
        let raw = payload
            .get(position..position + BLOCK_DIM * entry_size)
            .ok_or(RequantError::InvalidQuantizationTable)?;
        position += BLOCK_DIM * entry_size;

        let entries: Vec<u16> = match precision {
            QuantPrecision::Bits8 => raw.iter().map(|&b| b as u16).collect(),
            QuantPrecision::Bits16 => raw
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect(),
        };
        if entries.contains(&0) {
            return Err(RequantError::InvalidQuantizationTable);
        }

        tables.push(QuantizationTable {
            id: pq_tq & 0x0F,
            precision,
            values: zigzag::to_matrix(&entries)?,
        });
    }
    Ok(tables)
}

/// Serialises tables into one DQT payload. Scaled tables are always 8-bit.
pub fn dqt_payload(tables: &[QuantizationTable]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(tables.len() * (BLOCK_DIM + 1));
    for table in tables {
        match table.precision {
            QuantPrecision::Bits8 => {
                payload.push(table.id & 0x0F);
                payload.extend(table.zigzag_values().iter().map(|&v| v as u8));
            }
            QuantPrecision::Bits16 => {
                payload.push(0x10 | (table.id & 0x0F));
                for v in table.zigzag_values() {
                    payload.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
    }
    payload
}

/// Scales a quantization table by a quality factor (clamped to 1-100).
///
/// `factor` is `5000 / quality` below 50 and `200 - 2 * quality` from 50 up;
/// each entry becomes `(entry * factor + 50) / 100` truncated and clamped to
/// 1..=255, so quality 50 reproduces the table.
pub fn scale(base_table: &QuantizationTable, quality: u8) -> QuantizationTable {
    let quality = quality.clamp(MINIMUM_QUALITY, MAXIMUM_QUALITY) as f64;
    let factor = if quality < 50.0 { 5000.0 / quality } else { 200.0 - 2.0 * quality };

    let mut values = [[0u16; BLOCK_SIZE]; BLOCK_SIZE];
    for (row, base_row) in values.iter_mut().zip(base_table.values.iter()) {
        for (value, &base) in row.iter_mut().zip(base_row.iter()) {
            let scaled = ((base as f64 * factor + 50.0) / 100.0).floor();
            *value = scaled.clamp(1.0, 255.0) as u16;
        }
    }
    QuantizationTable {
        id: base_table.id,
        precision: QuantPrecision::Bits8,
        values,
    }
}

/// Quantizes coefficients: `round(value / q)`, ties to even.
pub fn quantize_block(block: &CoefficientMatrix, table: &QuantizationTable) -> CoefficientMatrix {
    let mut output = [[0i32; BLOCK_SIZE]; BLOCK_SIZE];
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let q = table.values[y][x] as f64;
            output[y][x] = (block[y][x] as f64 / q).round_ties_even() as i32;
        }
    }
    output
}

/// De-quantizes coefficients: `value * q`. A product outside `i32` is
/// `AmplitudeOutOfRange`.
pub fn dequantize_block(block: &CoefficientMatrix, table: &QuantizationTable) -> Result<CoefficientMatrix> {
    let mut output = [[0i32; BLOCK_SIZE]; BLOCK_SIZE];
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            output[y][x] = block[y][x]
                .checked_mul(table.values[y][x] as i32)
                .ok_or(RequantError::AmplitudeOutOfRange(block[y][x]))?;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(table: &QuantizationTable) -> Vec<u16> {
        table.values.iter().flatten().copied().collect()
    }

    #[test]
    fn test_quality_50_is_identity() {
        let base = QuantizationTable::standard_luminance(0);
        assert_eq!(scale(&base, 50), base);
    }

    #[test]
    fn test_quality_bounds() {
        let base = QuantizationTable::standard_chrominance(1);
        assert!(flat(&scale(&base, 100)).iter().all(|&v| v == 1));
        assert!(flat(&scale(&base, 1)).iter().all(|&v| v == 255));
        // Out-of-range qualities clamp.
        assert_eq!(scale(&base, 0), scale(&base, 1));
        assert_eq!(scale(&base, 200), scale(&base, 100));
    }

    #[test]
    fn test_quality_75_and_25() {
        let base = QuantizationTable::standard_luminance(0);
        let q75 = scale(&base, 75);
        // factor 50: (16 * 50 + 50) / 100 = 8.5 -> 8
        assert_eq!(q75.values[0][0], 8);
        // (11 * 50 + 50) / 100 = 6
        assert_eq!(q75.values[0][1], 6);
        let q25 = scale(&base, 25);
        assert_eq!(q25.values[0][0], 32);
        assert_eq!(q25.values[7][7], 198);
        // 5000 / 30 is not an integer.
        let q30 = scale(&base, 30);
        // (16 * 166.67 + 50) / 100 = 27.17
        assert_eq!(q30.values[0][0], 27);
    }

    #[test]
    fn test_quantize_rounds_half_to_even() {
        let table = QuantizationTable::from_row_major(0, &[4; 64]).unwrap();
        let mut block = [[0i32; 8]; 8];
        block[0][0] = 10; // 2.5 -> 2
        block[0][1] = 6; // 1.5 -> 2
        block[0][2] = -10; // -2.5 -> -2
        block[0][3] = 11; // 2.75 -> 3
        let q = quantize_block(&block, &table);
        assert_eq!(&q[0][..4], &[2, 2, -2, 3]);
        assert_eq!(dequantize_block(&q, &table).unwrap()[0][3], 12);
    }

    #[test]
    fn test_dequantize_overflow_is_an_error() {
        let mut payload = vec![0x10];
        for _ in 0..64 {
            payload.extend_from_slice(&[0xFF, 0xFF]);
        }
        let table = parse_dqt_payload(&payload).unwrap().remove(0);
        let mut block = [[0i32; 8]; 8];
        block[0][0] = 32767;
        assert_eq!(dequantize_block(&block, &table).unwrap()[0][0], 32767 * 65535);
        block[0][0] = 65534;
        assert!(matches!(
            dequantize_block(&block, &table),
            Err(RequantError::AmplitudeOutOfRange(65534))
        ));
    }

    #[test]
    fn test_dqt_payload_roundtrip() {
        let luma = QuantizationTable::standard_luminance(0);
        let chroma = QuantizationTable::standard_chrominance(1);
        let payload = dqt_payload(&[luma.clone(), chroma.clone()]);
        assert_eq!(payload.len(), 130);
        assert_eq!(payload[0], 0x00);
        // Zigzag order: 16, 11, 12, 14, ...
        assert_eq!(&payload[1..5], &[16, 11, 12, 14]);
        assert_eq!(parse_dqt_payload(&payload).unwrap(), vec![luma, chroma]);
    }

    #[test]
    fn test_parse_16_bit_table() {
        let mut payload = vec![0x12];
        for i in 0..64u16 {
            payload.extend_from_slice(&(300 + i).to_be_bytes());
        }
        let tables = parse_dqt_payload(&payload).unwrap();
        assert_eq!(tables[0].id, 2);
        assert_eq!(tables[0].precision, QuantPrecision::Bits16);
        assert_eq!(tables[0].values[0][0], 300);
        assert_eq!(tables[0].values[0][1], 301);
        assert_eq!(tables[0].values[1][0], 302);
        assert_eq!(dqt_payload(&tables), payload);

        let scaled = scale(&tables[0], 50);
        assert_eq!(scaled.precision, QuantPrecision::Bits8);
        assert!(flat(&scaled).iter().all(|&v| v == 255));
    }

    #[test]
    fn test_zero_entry_rejected() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&[1u8; 64]);
        payload[10] = 0;
        assert!(matches!(
            parse_dqt_payload(&payload),
            Err(RequantError::InvalidQuantizationTable)
        ));
        assert!(matches!(
            parse_dqt_payload(&payload[..20]),
            Err(RequantError::InvalidQuantizationTable)
        ));
    }
}
