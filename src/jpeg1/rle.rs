//! Run-length symbol coding of a zigzag-ordered coefficient block.
//!
//! A block is one `Dc` symbol followed by AC symbols. Runs of zeros longer
//! than 15 are split with `ZeroRunMarker` (ZRL, 16 zeros) and trailing zeros
//! collapse into a single `EndOfBlock`.

use crate::error::{RequantError, Result};
use crate::jpeg1::bit_io::{JpegBitReader, JpegBitWriter};
use crate::jpeg1::dct::BLOCK_DIM;
use crate::jpeg1::huffman::{self, HuffmanTable};

/// AC symbol byte for end of block.
pub const EOB_SYMBOL: u8 = 0x00;
/// AC symbol byte for a run of 16 zeros.
pub const ZRL_SYMBOL: u8 = 0xF0;
/// Largest magnitude category an amplitude can be coded with.
pub const MAX_CATEGORY: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// DC value (the differential when read from or written to a scan).
    Dc(i32),
    Ac { run: u8, size: u8, amplitude: i32 },
    ZeroRunMarker,
    EndOfBlock,
}

/// Run-length encodes 64 zigzag-ordered coefficients.
pub fn encode(coefficients: &[i32]) -> Result<Vec<Symbol>> {
    if coefficients.len() != BLOCK_DIM {
        return Err(RequantError::ShapeError {
            expected: BLOCK_DIM,
            actual: coefficients.len(),
        });
    }

    let mut symbols = vec![Symbol::Dc(coefficients[0])];
    let mut run = 0u32;
    for &value in &coefficients[1..] {
        if value == 0 {
            run += 1;
            continue;
        }
        while run > 15 {
            symbols.push(Symbol::ZeroRunMarker);
            run -= 16;
        }
        symbols.push(Symbol::Ac {
            run: run as u8,
            size: huffman::category(value),
            amplitude: value,
        });
        run = 0;
    }
    if run > 0 {
        symbols.push(Symbol::EndOfBlock);
    }
    Ok(symbols)
}

/// Expands a symbol sequence back into 64 zigzag-ordered coefficients.
pub fn decode(symbols: &[Symbol]) -> Result<[i32; BLOCK_DIM]> {
    let mut coefficients = [0i32; BLOCK_DIM];
    let Some((Symbol::Dc(dc), rest)) = symbols.split_first() else {
        return Err(RequantError::InvalidSymbolSequence);
    };
    coefficients[0] = *dc;

    let mut index = 1;
    for symbol in rest {
        match *symbol {
            Symbol::ZeroRunMarker => index = (index + 16).min(BLOCK_DIM),
            Symbol::EndOfBlock => break,
            Symbol::Ac { run, amplitude, .. } => {
                index = (index + run as usize).min(BLOCK_DIM);
                if index < BLOCK_DIM {
                    coefficients[index] = amplitude;
                    index += 1;
                }
            }
            Symbol::Dc(_) => return Err(RequantError::InvalidSymbolSequence),
        }
    }
    Ok(coefficients)
}

/// Outcome of reading one block from an entropy-coded scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRead {
    Complete(Vec<Symbol>),
    /// The stream ran out where only final-byte padding (or nothing) was left.
    EndOfStream,
}

/// Reads one block's symbols: DC category and amplitude, then AC run/size
/// symbols until end of block or 64 coefficients.
///
/// Running out of bits is `EndOfStream` when the block began in the padding
/// of the last byte, and `TruncatedStream` otherwise.
pub fn read_block(
    reader: &mut JpegBitReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Result<BlockRead> {
    let started_at_end = reader.is_at_end_of_data();
    match read_block_symbols(reader, dc_table, ac_table) {
        Ok(symbols) => Ok(BlockRead::Complete(symbols)),
        Err(RequantError::StreamExhausted) if started_at_end => Ok(BlockRead::EndOfStream),
        Err(RequantError::StreamExhausted) => Err(RequantError::TruncatedStream),
        Err(e) => Err(e),
    }
}

fn read_block_symbols(
    reader: &mut JpegBitReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Result<Vec<Symbol>> {
    let mut symbols = Vec::with_capacity(8);

    let dc_category = dc_table.decode(reader)?;
    if dc_category > MAX_CATEGORY {
        return Err(RequantError::InvalidCode);
    }
    let dc_bits = reader.read_bits(dc_category)?;
    symbols.push(Symbol::Dc(huffman::decode_amplitude(dc_bits, dc_category)));

    let mut count = 1;
    while count < BLOCK_DIM {
        let symbol = ac_table.decode(reader)?;
        match symbol {
            EOB_SYMBOL => {
                symbols.push(Symbol::EndOfBlock);
                break;
            }
            ZRL_SYMBOL => {
                symbols.push(Symbol::ZeroRunMarker);
                count += 16;
            }
            _ => {
                let run = symbol >> 4;
                let size = symbol & 0x0F;
                let bits = reader.read_bits(size)?;
                symbols.push(Symbol::Ac {
                    run,
                    size,
                    amplitude: huffman::decode_amplitude(bits, size),
                });
                count += run as usize + 1;
            }
        }
    }
    Ok(symbols)
}

/// Writes a block's symbols as Huffman codes followed by raw amplitude bits.
/// Nothing after an `EndOfBlock` is written.
pub fn write_block(
    symbols: &[Symbol],
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    writer: &mut JpegBitWriter,
) -> Result<()> {
    let Some((Symbol::Dc(dc), rest)) = symbols.split_first() else {
        return Err(RequantError::InvalidSymbolSequence);
    };
    let size = huffman::checked_category(*dc)?;
    dc_table.write_symbol(size, writer)?;
    writer.write_bits(huffman::amplitude_bits(*dc, size), size);

    for symbol in rest {
        match *symbol {
            Symbol::ZeroRunMarker => ac_table.write_symbol(ZRL_SYMBOL, writer)?,
            Symbol::EndOfBlock => {
                ac_table.write_symbol(EOB_SYMBOL, writer)?;
                break;
            }
            Symbol::Ac { run, amplitude, .. } => {
                let size = huffman::checked_category(amplitude)?;
                ac_table.write_symbol((run << 4) | size, writer)?;
                writer.write_bits(huffman::amplitude_bits(amplitude, size), size);
            }
            Symbol::Dc(_) => return Err(RequantError::InvalidSymbolSequence),
        }
    }
    Ok(())
}
