//! JPEG 1 (Baseline) coefficient codec (ISO/IEC 10918-1 / ITU-T T.81)
//!
//! The pieces needed to decode and re-encode a sequential Huffman scan
//! without leaving the coefficient domain:
//! - Bit I/O with 0xFF/0x00 byte stuffing.
//! - Canonical Huffman tables, standard and file-defined.
//! - Run-length symbol coding of zigzag-ordered blocks.
//! - Quantization tables and quality scaling.
//! - An 8x8 DCT for the optional spatial requantization path.

pub mod bit_io;
pub mod dct;
pub mod huffman;
pub mod quantization;
pub mod rle;
pub mod zigzag;

pub use bit_io::{JpegBitReader, JpegBitWriter};
pub use huffman::{HuffmanClass, HuffmanTable};
pub use quantization::QuantizationTable;
pub use rle::Symbol;
