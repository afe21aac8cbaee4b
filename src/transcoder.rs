//! Coefficient-domain requantization of a sequential Huffman JPEG.
//!
//! The [`Transcoder`] walks a fixed sequence of stages: parse the file,
//! resolve the tables each scan component uses, decode every block, move the
//! coefficients from the original quantization tables to quality-scaled ones,
//! entropy-code the blocks again and rebuild the file around the new scan.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_QUALITY, MAXIMUM_QUALITY, MINIMUM_QUALITY, SEQUENTIAL_SPECTRAL_END,
    SEQUENTIAL_SPECTRAL_START, SUPPORTED_SAMPLE_PRECISION,
};
use crate::error::{RequantError, Result};
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::{self, FrameHeader, HuffmanTables, MAX_TABLE_ID, ParsedJpeg};
use crate::jpeg_stream_writer;
use crate::jpeg1::bit_io::{JpegBitReader, JpegBitWriter};
use crate::jpeg1::dct::{self, BLOCK_DIM, BLOCK_SIZE};
use crate::jpeg1::huffman::HuffmanClass;
use crate::jpeg1::quantization::{self, CoefficientMatrix, QuantizationTable};
use crate::jpeg1::rle::{self, BlockRead, Symbol};
use crate::jpeg1::zigzag;

/// How coefficients move from the original to the scaled tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequantizationPath {
    /// Dequantize with the original table, quantize with the scaled one.
    #[default]
    Coefficient,
    /// Round-trip every block through the pixel domain before quantizing.
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// 1..=100; values outside the range are clamped.
    pub quality: u8,
    pub path: RequantizationPath,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            path: RequantizationPath::Coefficient,
        }
    }
}

impl TranscodeOptions {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    /// The quality actually applied to the tables.
    pub fn effective_quality(&self) -> u8 {
        self.quality.clamp(MINIMUM_QUALITY, MAXIMUM_QUALITY)
    }
}

/// Summary of a completed transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeReport {
    pub quality: u8,
    pub blocks: usize,
    pub input_size: usize,
    pub output_size: usize,
}

/// Pipeline stages, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TranscodeStage {
    Created,
    Parsed,
    TablesResolved,
    Decoded,
    Requantized,
    Reencoded,
    Written,
}

/// A scan component together with the tables it is coded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: u8,
    pub h_samp_factor: u8,
    pub v_samp_factor: u8,
    pub quant_table_id: u8,
    pub dc_table_id: u8,
    pub ac_table_id: u8,
    /// Absolute DC of the previous block of this component.
    pub dc_predictor: i32,
}

/// One decoded block: 64 zigzag-ordered coefficients with an absolute DC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    pub component: usize,
    pub coefficients: [i32; BLOCK_DIM],
}

/// Runs the requantization stages over one in-memory file.
///
/// DC coefficients are requantized as absolute values: the per-component
/// predictor is added back after decoding and the difference is taken again
/// against the requantized values before encoding. A pipeline that scales
/// the coded DC differences directly produces different output for any scan
/// with more than one block per component.
pub struct Transcoder<'a> {
    source: &'a [u8],
    options: TranscodeOptions,
    stage: TranscodeStage,
    parsed: ParsedJpeg,
    components: Vec<Component>,
    huffman_tables: HuffmanTables,
    original_tables: [Option<QuantizationTable>; MAX_TABLE_ID],
    scaled_tables: [Option<QuantizationTable>; MAX_TABLE_ID],
    expected_blocks: usize,
    blocks: Vec<DecodedBlock>,
    entropy_data: Vec<u8>,
}

impl<'a> Transcoder<'a> {
    pub fn new(source: &'a [u8], options: TranscodeOptions) -> Self {
        Self {
            source,
            options,
            stage: TranscodeStage::Created,
            parsed: ParsedJpeg::default(),
            components: Vec::new(),
            huffman_tables: HuffmanTables::default(),
            original_tables: Default::default(),
            scaled_tables: Default::default(),
            expected_blocks: 0,
            blocks: Vec::new(),
            entropy_data: Vec::new(),
        }
    }

    pub fn stage(&self) -> TranscodeStage {
        self.stage
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn blocks(&self) -> &[DecodedBlock] {
        &self.blocks
    }

    /// Tables written to the new DQT segment, in id order.
    pub fn scaled_tables(&self) -> impl Iterator<Item = &QuantizationTable> {
        self.scaled_tables.iter().flatten()
    }

    fn advance(&mut self, from: TranscodeStage, to: TranscodeStage) -> Result<()> {
        if self.stage != from {
            return Err(RequantError::InvalidOperation);
        }
        debug!(stage = ?to, "transcode stage");
        self.stage = to;
        Ok(())
    }

    fn expect_stage(&self, stage: TranscodeStage) -> Result<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(RequantError::InvalidOperation)
        }
    }

    pub fn parse(&mut self) -> Result<()> {
        self.expect_stage(TranscodeStage::Created)?;
        self.parsed = jpeg_stream_reader::parse_jpeg(self.source)?;
        debug!(
            segments = self.parsed.segments.len(),
            entropy_bytes = self.parsed.entropy_data.len(),
            "parsed"
        );
        self.advance(TranscodeStage::Created, TranscodeStage::Parsed)
    }

    /// Builds the scan components and looks up every table they reference,
    /// then scales the quantization tables used by the frame.
    pub fn resolve_tables(&mut self) -> Result<()> {
        self.expect_stage(TranscodeStage::Parsed)?;
        let frame = self.parsed.frame_header()?;
        let scan = self.parsed.scan_header()?;
        check_supported(&frame)?;
        if scan.spectral_start != SEQUENTIAL_SPECTRAL_START
            || scan.spectral_end != SEQUENTIAL_SPECTRAL_END
            || scan.successive_approximation != 0
        {
            return Err(RequantError::UnsupportedFeature("spectral selection or successive approximation"));
        }

        if scan.components.is_empty() {
            return Err(RequantError::UnsupportedFeature("scan without components"));
        }

        self.huffman_tables = self.parsed.huffman_tables()?;
        let mut components = Vec::with_capacity(scan.components.len());
        for selector in &scan.components {
            let frame_component = frame
                .components
                .iter()
                .find(|c| c.id == selector.id)
                .ok_or(RequantError::UnsupportedFeature("scan component missing from frame"))?;
            self.huffman_tables.get(HuffmanClass::Dc, selector.dc_table_dest)?;
            self.huffman_tables.get(HuffmanClass::Ac, selector.ac_table_dest)?;
            components.push(Component {
                id: selector.id,
                h_samp_factor: frame_component.h_samp_factor,
                v_samp_factor: frame_component.v_samp_factor,
                quant_table_id: frame_component.quant_table_dest,
                dc_table_id: selector.dc_table_dest,
                ac_table_id: selector.ac_table_dest,
                dc_predictor: 0,
            });
        }
        if components.len() > 1
            && components.iter().any(|c| c.h_samp_factor != 1 || c.v_samp_factor != 1)
        {
            return Err(RequantError::UnsupportedFeature("interleaved scan with subsampling"));
        }

        let quality = self.options.effective_quality();
        for frame_component in &frame.components {
            let id = frame_component.quant_table_dest;
            let original = self
                .parsed
                .quantization_tables
                .get(id as usize)
                .and_then(Option::as_ref)
                .ok_or(RequantError::MissingQuantizationTable(id))?;
            self.scaled_tables[id as usize] = Some(quantization::scale(original, quality));
            self.original_tables[id as usize] = Some(original.clone());
        }

        self.expected_blocks = expected_block_count(&frame, &components);
        debug!(
            components = components.len(),
            expected_blocks = self.expected_blocks,
            quality,
            "tables resolved"
        );
        self.components = components;
        self.advance(TranscodeStage::Parsed, TranscodeStage::TablesResolved)
    }

    /// Decodes blocks MCU by MCU until the scan data runs out.
    pub fn decode(&mut self) -> Result<()> {
        self.expect_stage(TranscodeStage::TablesResolved)?;
        let mut reader = JpegBitReader::new(&self.parsed.entropy_data);
        let mut blocks = Vec::with_capacity(self.expected_blocks);
        for component in &mut self.components {
            component.dc_predictor = 0;
        }

        'scan: loop {
            if blocks.len() >= self.expected_blocks && reader.is_at_end_of_data() {
                break;
            }
            for (index, component) in self.components.iter_mut().enumerate() {
                let dc_table = self.huffman_tables.get(HuffmanClass::Dc, component.dc_table_id)?;
                let ac_table = self.huffman_tables.get(HuffmanClass::Ac, component.ac_table_id)?;
                let symbols = match rle::read_block(&mut reader, dc_table, ac_table)? {
                    BlockRead::Complete(symbols) => symbols,
                    BlockRead::EndOfStream => break 'scan,
                };
                let mut coefficients = rle::decode(&symbols)?;
                coefficients[0] = coefficients[0]
                    .checked_add(component.dc_predictor)
                    .ok_or(RequantError::AmplitudeOutOfRange(coefficients[0]))?;
                component.dc_predictor = coefficients[0];
                blocks.push(DecodedBlock {
                    component: index,
                    coefficients,
                });
            }
        }

        if blocks.len() != self.expected_blocks {
            warn!(
                decoded = blocks.len(),
                expected = self.expected_blocks,
                "decoded block count does not match the frame size"
            );
        }
        debug!(blocks = blocks.len(), "decoded");
        self.blocks = blocks;
        self.advance(TranscodeStage::TablesResolved, TranscodeStage::Decoded)
    }

    /// Moves every block from its original table to the scaled one.
    pub fn requantize(&mut self) -> Result<()> {
        self.expect_stage(TranscodeStage::Decoded)?;
        for block in &mut self.blocks {
            let table_id = self.components[block.component].quant_table_id as usize;
            let (Some(original), Some(scaled)) =
                (&self.original_tables[table_id], &self.scaled_tables[table_id])
            else {
                return Err(RequantError::MissingQuantizationTable(table_id as u8));
            };
            let matrix = zigzag::to_matrix(&block.coefficients)?;
            let requantized = match self.options.path {
                RequantizationPath::Coefficient => {
                    quantization::quantize_block(&quantization::dequantize_block(&matrix, original)?, scaled)
                }
                RequantizationPath::Spatial => requantize_spatial(&matrix, original, scaled)?,
            };
            block.coefficients = zigzag::to_scan_order(&requantized)?;
        }
        self.advance(TranscodeStage::Decoded, TranscodeStage::Requantized)
    }

    /// Entropy-codes the blocks with the file's own Huffman tables.
    pub fn reencode(&mut self) -> Result<()> {
        self.expect_stage(TranscodeStage::Requantized)?;
        for component in &mut self.components {
            component.dc_predictor = 0;
        }
        let mut writer = JpegBitWriter::new();
        for block in &self.blocks {
            let component = &mut self.components[block.component];
            let dc_table = self.huffman_tables.get(HuffmanClass::Dc, component.dc_table_id)?;
            let ac_table = self.huffman_tables.get(HuffmanClass::Ac, component.ac_table_id)?;

            let mut coefficients = block.coefficients;
            let dc = coefficients[0];
            coefficients[0] = dc
                .checked_sub(component.dc_predictor)
                .ok_or(RequantError::AmplitudeOutOfRange(dc))?;
            component.dc_predictor = dc;

            let symbols: Vec<Symbol> = rle::encode(&coefficients)?;
            rle::write_block(&symbols, dc_table, ac_table, &mut writer)?;
        }
        self.entropy_data = writer.into_bytes();
        debug!(entropy_bytes = self.entropy_data.len(), "re-encoded");
        self.advance(TranscodeStage::Requantized, TranscodeStage::Reencoded)
    }

    /// Assembles the output file.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        self.expect_stage(TranscodeStage::Reencoded)?;
        let tables: Vec<QuantizationTable> = self.scaled_tables().cloned().collect();
        let output = jpeg_stream_writer::rebuild_jpeg(&self.parsed, &tables, &self.entropy_data)?;
        self.advance(TranscodeStage::Reencoded, TranscodeStage::Written)?;
        Ok(output)
    }

    /// Runs every remaining stage from a fresh transcoder.
    pub fn run(&mut self) -> Result<Vec<u8>> {
        self.parse()?;
        self.resolve_tables()?;
        self.decode()?;
        self.requantize()?;
        self.reencode()?;
        self.write()
    }
}

fn check_supported(frame: &FrameHeader) -> Result<()> {
    match JpegMarkerCode::try_from(frame.marker) {
        Ok(JpegMarkerCode::StartOfFrameBaseline) | Ok(JpegMarkerCode::StartOfFrameExtendedSequential) => {}
        _ => {
            return Err(RequantError::UnsupportedFeature(
                "frame type other than sequential Huffman",
            ));
        }
    }
    if frame.precision != SUPPORTED_SAMPLE_PRECISION {
        return Err(RequantError::UnsupportedFeature("sample precision other than 8 bits"));
    }
    Ok(())
}

/// Number of blocks a single scan over `components` holds for this frame.
fn expected_block_count(frame: &FrameHeader, components: &[Component]) -> usize {
    let blocks_across = |samples: u16, factor: u8, max_factor: u8| -> usize {
        let component_samples =
            (samples as usize * factor as usize).div_ceil(max_factor as usize);
        component_samples.div_ceil(BLOCK_SIZE)
    };
    let h_max = frame.max_h_samp_factor();
    let v_max = frame.max_v_samp_factor();

    match components {
        [component] => {
            blocks_across(frame.width, component.h_samp_factor, h_max)
                * blocks_across(frame.height, component.v_samp_factor, v_max)
        }
        _ => {
            let mcus = (frame.width as usize).div_ceil(BLOCK_SIZE * h_max as usize)
                * (frame.height as usize).div_ceil(BLOCK_SIZE * v_max as usize);
            mcus * components.len()
        }
    }
}

/// Dequantize, inverse DCT, clamp to 8-bit samples, forward DCT, quantize.
fn requantize_spatial(
    block: &CoefficientMatrix,
    original: &QuantizationTable,
    scaled: &QuantizationTable,
) -> Result<CoefficientMatrix> {
    let dequantized = quantization::dequantize_block(block, original)?;
    let mut coefficients = [0.0f32; BLOCK_DIM];
    for (value, &c) in coefficients.iter_mut().zip(dequantized.iter().flatten()) {
        *value = c as f32;
    }

    let mut samples = [0.0f32; BLOCK_DIM];
    dct::idct_8x8(&coefficients, &mut samples);
    for sample in samples.iter_mut() {
        *sample = (*sample + 128.0).round().clamp(0.0, 255.0) - 128.0;
    }
    dct::fdct_8x8(&samples, &mut coefficients);

    let mut rounded = [[0i32; BLOCK_SIZE]; BLOCK_SIZE];
    for (i, &c) in coefficients.iter().enumerate() {
        rounded[i / BLOCK_SIZE][i % BLOCK_SIZE] = c.round() as i32;
    }
    Ok(quantization::quantize_block(&rounded, scaled))
}

/// Requantizes a JPEG held in memory.
pub fn transcode(source: &[u8], options: &TranscodeOptions) -> Result<Vec<u8>> {
    Transcoder::new(source, *options).run()
}

/// Requantizes `input` into `output`. The output file is only created once
/// the whole transcode has succeeded.
pub fn transcode_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &TranscodeOptions,
) -> Result<TranscodeReport> {
    let source = fs::read(input.as_ref())?;
    let mut transcoder = Transcoder::new(&source, *options);
    let bytes = transcoder.run()?;
    fs::write(output.as_ref(), &bytes)?;
    Ok(TranscodeReport {
        quality: options.effective_quality(),
        blocks: transcoder.blocks().len(),
        input_size: source.len(),
        output_size: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg1::huffman::{
        STD_LUMINANCE_AC_LENGTHS, STD_LUMINANCE_AC_VALUES, STD_LUMINANCE_DC_LENGTHS,
        STD_LUMINANCE_DC_VALUES,
    };

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, marker];
        bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn dht(class_id: u8, lengths: &[u8; 16], values: &[u8]) -> Vec<u8> {
        let mut payload = vec![class_id];
        payload.extend_from_slice(lengths);
        payload.extend_from_slice(values);
        segment(0xC4, &payload)
    }

    /// A one-block 8x8 grayscale file with DC = 5 and a single AC of 4.
    fn single_block_jpeg(sof: u8, precision: u8) -> Vec<u8> {
        let mut dqt = vec![0x00];
        dqt.extend((1..=64u8).map(|v| v.min(100)));
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(segment(0xDB, &dqt));
        bytes.extend(segment(sof, &[precision, 0, 8, 0, 8, 1, 1, 0x11, 0]));
        bytes.extend(dht(0x00, &STD_LUMINANCE_DC_LENGTHS, &STD_LUMINANCE_DC_VALUES));
        bytes.extend(dht(0x10, &STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES));
        bytes.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        bytes.extend_from_slice(&[0x96, 0x4A]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn test_stages_run_in_order() {
        let source = single_block_jpeg(0xC0, 8);
        let mut transcoder = Transcoder::new(&source, TranscodeOptions::default());
        assert!(matches!(transcoder.decode(), Err(RequantError::InvalidOperation)));
        transcoder.parse().unwrap();
        assert_eq!(transcoder.stage(), TranscodeStage::Parsed);
        assert!(matches!(transcoder.write(), Err(RequantError::InvalidOperation)));
        assert!(matches!(transcoder.parse(), Err(RequantError::InvalidOperation)));
        transcoder.resolve_tables().unwrap();
        transcoder.decode().unwrap();
        assert_eq!(transcoder.blocks().len(), 1);
        assert_eq!(transcoder.blocks()[0].coefficients[..3], [5, 4, 0]);
        transcoder.requantize().unwrap();
        transcoder.reencode().unwrap();
        transcoder.write().unwrap();
        assert_eq!(transcoder.stage(), TranscodeStage::Written);
        assert!(matches!(transcoder.run(), Err(RequantError::InvalidOperation)));
    }

    #[test]
    fn test_components_resolved_from_headers() {
        let source = single_block_jpeg(0xC1, 8);
        let mut transcoder = Transcoder::new(&source, TranscodeOptions::with_quality(75));
        transcoder.parse().unwrap();
        transcoder.resolve_tables().unwrap();
        assert_eq!(
            transcoder.components(),
            &[Component {
                id: 1,
                h_samp_factor: 1,
                v_samp_factor: 1,
                quant_table_id: 0,
                dc_table_id: 0,
                ac_table_id: 0,
                dc_predictor: 0,
            }]
        );
        let scaled: Vec<_> = transcoder.scaled_tables().collect();
        assert_eq!(scaled.len(), 1);
        // (1 * 50 + 50) / 100 = 1
        assert_eq!(scaled[0].values[0][0], 1);
    }

    #[test]
    fn test_unsupported_frames_rejected() {
        for (sof, precision) in [(0xC2, 8), (0xC3, 8), (0xC0, 12)] {
            let source = single_block_jpeg(sof, precision);
            assert!(matches!(
                transcode(&source, &TranscodeOptions::default()),
                Err(RequantError::UnsupportedFeature(_))
            ));
        }
    }

    #[test]
    fn test_missing_tables() {
        let mut source = single_block_jpeg(0xC0, 8);
        // Point the component at quantization table 3.
        let sof = source.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        source[sof + 12] = 3;
        assert!(matches!(
            transcode(&source, &TranscodeOptions::default()),
            Err(RequantError::MissingQuantizationTable(3))
        ));

        let mut source = single_block_jpeg(0xC0, 8);
        let sos = source.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
        source[sos + 6] = 0x11;
        assert!(matches!(
            transcode(&source, &TranscodeOptions::default()),
            Err(RequantError::MissingHuffmanTable { class: "DC", id: 1 })
        ));
    }

    #[test]
    fn test_truncated_scan_is_an_error() {
        let mut source = single_block_jpeg(0xC0, 8);
        // Keep only the first entropy byte: DC decodes, AC runs dry mid-block.
        let eoi = source.len() - 2;
        source.remove(eoi - 1);
        assert!(matches!(
            transcode(&source, &TranscodeOptions::default()),
            Err(RequantError::TruncatedStream)
        ));
    }

    #[test]
    fn test_dc_prediction_across_blocks() {
        // Two blocks of a 16x8 image: DC 5 then DC 7 (difference 2), no AC.
        let mut dqt = vec![0x00];
        dqt.extend_from_slice(&[1u8; 64]);
        let mut source = vec![0xFF, 0xD8];
        source.extend(segment(0xDB, &dqt));
        source.extend(segment(0xC0, &[8, 0, 8, 0, 16, 1, 1, 0x11, 0]));
        source.extend(dht(0x00, &STD_LUMINANCE_DC_LENGTHS, &STD_LUMINANCE_DC_VALUES));
        source.extend(dht(0x10, &STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES));
        source.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        // 100 101 1010 | 011 10 1010 + pad
        source.extend_from_slice(&[0x96, 0x9D, 0x40]);
        source.extend_from_slice(&[0xFF, 0xD9]);

        let mut transcoder = Transcoder::new(&source, TranscodeOptions::default());
        let output = transcoder.run().unwrap();
        let dc: Vec<i32> = transcoder.blocks().iter().map(|b| b.coefficients[0]).collect();
        assert_eq!(dc, vec![5, 7]);
        assert_eq!(output, source);
    }

    /// A grayscale file whose DC and AC tables each hold a single one-bit code.
    fn one_code_tables_jpeg(dqt: &[u8], width: u8, dc_category: u8, entropy: &[u8]) -> Vec<u8> {
        let mut lengths = [0u8; 16];
        lengths[0] = 1;
        let mut source = vec![0xFF, 0xD8];
        source.extend(segment(0xDB, dqt));
        source.extend(segment(0xC0, &[8, 0, 8, 0, width, 1, 1, 0x11, 0]));
        source.extend(dht(0x00, &lengths, &[dc_category]));
        source.extend(dht(0x10, &lengths, &[0x00]));
        source.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        source.extend_from_slice(entropy);
        source.extend_from_slice(&[0xFF, 0xD9]);
        source
    }

    #[test]
    fn test_dc_category_above_15_is_an_error() {
        let mut dqt = vec![0x00];
        dqt.extend_from_slice(&[1u8; 64]);
        // "0" for category 17, then 17 one bits.
        let source = one_code_tables_jpeg(&dqt, 8, 17, &[0x7F, 0xFF, 0x00, 0xC0]);
        assert!(matches!(
            transcode(&source, &TranscodeOptions::default()),
            Err(RequantError::InvalidCode)
        ));
    }

    #[test]
    fn test_dequantized_dc_overflow_is_an_error() {
        let mut dqt = vec![0x10];
        for _ in 0..64 {
            dqt.extend_from_slice(&[0xFF, 0xFF]);
        }
        // Two blocks, each "0" (category 15) + 32767 + "0" (end of block):
        // absolute DC 32767 then 65534, and 65534 * 65535 leaves i32.
        let entropy = [0x7F, 0xFF, 0x00, 0x3F, 0xFF, 0x00, 0x80];
        let source = one_code_tables_jpeg(&dqt, 16, 15, &entropy);

        let mut transcoder = Transcoder::new(&source, TranscodeOptions::default());
        transcoder.parse().unwrap();
        transcoder.resolve_tables().unwrap();
        transcoder.decode().unwrap();
        let dc: Vec<i32> = transcoder.blocks().iter().map(|b| b.coefficients[0]).collect();
        assert_eq!(dc, vec![32767, 65534]);
        assert!(matches!(
            transcoder.requantize(),
            Err(RequantError::AmplitudeOutOfRange(65534))
        ));
    }

    #[test]
    fn test_spatial_path_keeps_flat_block() {
        let table = QuantizationTable::from_row_major(0, &[2; 64]).unwrap();
        let mut block = [[0i32; 8]; 8];
        block[0][0] = -100;
        let requantized = requantize_spatial(&block, &table, &table).unwrap();
        assert_eq!(requantized, block);
    }

    #[test]
    fn test_expected_block_count() {
        let frame = FrameHeader::parse(0xC0, &[8, 0, 17, 0, 20, 1, 1, 0x11, 0]).unwrap();
        let component = Component {
            id: 1,
            h_samp_factor: 1,
            v_samp_factor: 1,
            quant_table_id: 0,
            dc_table_id: 0,
            ac_table_id: 0,
            dc_predictor: 0,
        };
        assert_eq!(expected_block_count(&frame, std::slice::from_ref(&component)), 9);
        assert_eq!(expected_block_count(&frame, &[component.clone(), component]), 18);
    }
}
