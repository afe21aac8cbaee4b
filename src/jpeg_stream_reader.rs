//! JPEG segment parser.
//!
//! Splits a file into its marker segments, the quantization tables, the raw
//! Huffman table payloads, the frame and scan headers and the entropy-coded
//! bytes of the scan.

use tracing::{trace, warn};

use crate::constants::SEGMENT_LENGTH_SIZE;
use crate::error::{RequantError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg1::huffman::{self, HuffmanClass, HuffmanTable};
use crate::jpeg1::quantization::{self, QuantizationTable};

/// Number of table slots addressable by a 4-bit table id.
pub const MAX_TABLE_ID: usize = 16;

/// One marker segment: marker byte and payload without the length field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub marker: u8,
    pub payload: Vec<u8>,
}

/// Component as declared in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameComponent {
    pub id: u8,
    pub h_samp_factor: u8,
    pub v_samp_factor: u8,
    pub quant_table_dest: u8,
}

/// Decoded SOFn payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub marker: u8,
    pub precision: u8,
    pub height: u16,
    pub width: u16,
    pub components: Vec<FrameComponent>,
}

impl FrameHeader {
    pub fn parse(marker: u8, payload: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(payload);
        let precision = reader.read_u8()?;
        let height = reader.read_u16()?;
        let width = reader.read_u16()?;
        let component_count = reader.read_u8()?;
        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let id = reader.read_u8()?;
            let sampling = reader.read_u8()?;
            let quant_table_dest = reader.read_u8()?;
            components.push(FrameComponent {
                id,
                h_samp_factor: sampling >> 4,
                v_samp_factor: sampling & 0x0F,
                quant_table_dest,
            });
        }
        Ok(Self {
            marker,
            precision,
            height,
            width,
            components,
        })
    }

    pub fn max_h_samp_factor(&self) -> u8 {
        self.components.iter().map(|c| c.h_samp_factor).max().unwrap_or(1).max(1)
    }

    pub fn max_v_samp_factor(&self) -> u8 {
        self.components.iter().map(|c| c.v_samp_factor).max().unwrap_or(1).max(1)
    }
}

/// Component selector of a scan header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponent {
    pub id: u8,
    pub dc_table_dest: u8,
    pub ac_table_dest: u8,
}

/// Decoded SOS payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub successive_approximation: u8,
}

impl ScanHeader {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = PayloadReader::new(payload);
        let component_count = reader.read_u8()?;
        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let id = reader.read_u8()?;
            let selector = reader.read_u8()?;
            components.push(ScanComponent {
                id,
                dc_table_dest: selector >> 4,
                ac_table_dest: selector & 0x0F,
            });
        }
        Ok(Self {
            components,
            spectral_start: reader.read_u8()?,
            spectral_end: reader.read_u8()?,
            successive_approximation: reader.read_u8()?,
        })
    }
}

/// Big-endian reader over a segment payload.
struct PayloadReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self { source, position: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let value = *self
            .source
            .get(self.position)
            .ok_or(RequantError::InvalidSegmentLength)?;
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b1 << 8) | b2)
    }
}

/// Everything the transcoder needs from a parsed file.
#[derive(Debug, Clone, Default)]
pub struct ParsedJpeg {
    /// Segments in file order, excluding SOI and EOI.
    pub segments: Vec<Segment>,
    pub quantization_tables: [Option<QuantizationTable>; MAX_TABLE_ID],
    /// Raw DHT payloads in file order.
    pub huffman_payloads: Vec<Vec<u8>>,
    /// Index in `segments` of the start of scan segment.
    pub scan_segment_index: Option<usize>,
    /// Entropy-coded bytes of the scan, still byte-stuffed.
    pub entropy_data: Vec<u8>,
}

impl ParsedJpeg {
    /// The first start of frame segment in the file.
    pub fn frame_segment(&self) -> Result<&Segment> {
        self.segments
            .iter()
            .find(|s| JpegMarkerCode::is_start_of_frame(s.marker))
            .ok_or(RequantError::NoFrameHeader)
    }

    pub fn scan_segment(&self) -> Result<&Segment> {
        self.scan_segment_index
            .map(|i| &self.segments[i])
            .ok_or(RequantError::NoScanHeader)
    }

    pub fn frame_header(&self) -> Result<FrameHeader> {
        let segment = self.frame_segment()?;
        FrameHeader::parse(segment.marker, &segment.payload)
    }

    pub fn scan_header(&self) -> Result<ScanHeader> {
        ScanHeader::parse(&self.scan_segment()?.payload)
    }

    /// Quantization tables present in the file, in id order.
    pub fn defined_quantization_tables(&self) -> impl Iterator<Item = &QuantizationTable> {
        self.quantization_tables.iter().flatten()
    }

    /// Builds the DC and AC tables from every DHT payload; later definitions
    /// of the same class and id replace earlier ones.
    pub fn huffman_tables(&self) -> Result<HuffmanTables> {
        let mut tables = HuffmanTables::default();
        for payload in &self.huffman_payloads {
            for spec in huffman::parse_dht_payload(payload)? {
                let id = spec.id as usize;
                trace!(class = spec.class.name(), id, "Huffman table");
                match spec.class {
                    HuffmanClass::Dc => tables.dc[id] = Some(spec.table),
                    HuffmanClass::Ac => tables.ac[id] = Some(spec.table),
                }
            }
        }
        Ok(tables)
    }
}

/// DC and AC Huffman tables indexed by table id.
#[derive(Debug, Clone, Default)]
pub struct HuffmanTables {
    pub dc: [Option<HuffmanTable>; MAX_TABLE_ID],
    pub ac: [Option<HuffmanTable>; MAX_TABLE_ID],
}

impl HuffmanTables {
    pub fn get(&self, class: HuffmanClass, id: u8) -> Result<&HuffmanTable> {
        let slots = match class {
            HuffmanClass::Dc => &self.dc,
            HuffmanClass::Ac => &self.ac,
        };
        slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or(RequantError::MissingHuffmanTable {
                class: class.name(),
                id,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegStreamReaderState {
    HeaderSection,
    ScanSection,
    EndOfImage,
}

/// Walks the marker structure of a JPEG held in memory.
pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    state: JpegStreamReaderState,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            state: JpegStreamReaderState::HeaderSection,
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let value = *self
            .source
            .get(self.position)
            .ok_or(RequantError::InvalidSegmentLength)?;
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b1 << 8) | b2)
    }

    fn read_start_of_image(&mut self) -> Result<()> {
        if !self.source.starts_with(&[JPEG_MARKER_START_BYTE, JpegMarkerCode::StartOfImage as u8]) {
            return Err(RequantError::NotAJpeg);
        }
        self.position = 2;
        Ok(())
    }

    /// Reads a segment body: big-endian length (counting itself) then payload.
    fn read_segment_payload(&mut self) -> Result<Vec<u8>> {
        let length = self.read_u16()? as usize;
        if length < SEGMENT_LENGTH_SIZE {
            return Err(RequantError::InvalidSegmentLength);
        }
        let end = self.position + length - SEGMENT_LENGTH_SIZE;
        let payload = self
            .source
            .get(self.position..end)
            .ok_or(RequantError::InvalidSegmentLength)?
            .to_vec();
        self.position = end;
        Ok(payload)
    }

    /// Parses the whole file.
    pub fn read(mut self) -> Result<ParsedJpeg> {
        self.read_start_of_image()?;
        let mut parsed = ParsedJpeg::default();

        while self.position < self.source.len() && self.state != JpegStreamReaderState::EndOfImage {
            if self.state == JpegStreamReaderState::ScanSection {
                self.read_entropy_coded_data(&mut parsed)?;
                continue;
            }

            let byte = self.read_u8()?;
            if byte != JPEG_MARKER_START_BYTE {
                warn!(offset = self.position - 1, "skipping stray byte outside of scan data");
                continue;
            }
            let Some(&marker) = self.source.get(self.position) else {
                break;
            };
            self.position += 1;
            if marker == JPEG_MARKER_START_BYTE {
                // Fill byte; the second 0xFF starts the marker.
                self.position -= 1;
                continue;
            }
            self.read_marker_segment(marker, &mut parsed)?;
        }

        if self.state != JpegStreamReaderState::EndOfImage {
            warn!("end of image marker not found");
        }
        Ok(parsed)
    }

    fn read_marker_segment(&mut self, marker: u8, parsed: &mut ParsedJpeg) -> Result<()> {
        match JpegMarkerCode::try_from(marker) {
            Ok(JpegMarkerCode::EndOfImage) => {
                self.state = JpegStreamReaderState::EndOfImage;
                return Ok(());
            }
            Ok(JpegMarkerCode::StartOfImage) => {
                warn!("ignoring repeated start of image marker");
                return Ok(());
            }
            Ok(JpegMarkerCode::StartOfScan) if parsed.scan_segment_index.is_some() => {
                return Err(RequantError::UnsupportedFeature("multiple scans"));
            }
            _ if JpegMarkerCode::is_restart(marker) => {
                return Err(RequantError::UnsupportedFeature("restart markers"));
            }
            _ => {}
        }

        let payload = self.read_segment_payload()?;
        trace!(marker = %JpegMarkerCode::name(marker), length = payload.len(), "segment");
        match JpegMarkerCode::try_from(marker) {
            Ok(JpegMarkerCode::DefineQuantizationTable) => {
                for table in quantization::parse_dqt_payload(&payload)? {
                    let id = table.id as usize;
                    parsed.quantization_tables[id] = Some(table);
                }
            }
            Ok(JpegMarkerCode::DefineHuffmanTable) => {
                parsed.huffman_payloads.push(payload.clone());
            }
            Ok(JpegMarkerCode::StartOfScan) => {
                parsed.scan_segment_index = Some(parsed.segments.len());
                self.state = JpegStreamReaderState::ScanSection;
            }
            _ => {}
        }
        parsed.segments.push(Segment { marker, payload });
        Ok(())
    }

    /// Collects entropy-coded bytes up to the next marker. Stuffed 0xFF00
    /// pairs are kept; the bit reader removes the 0x00.
    fn read_entropy_coded_data(&mut self, parsed: &mut ParsedJpeg) -> Result<()> {
        while self.position < self.source.len() {
            let byte = self.source[self.position];
            if byte != JPEG_MARKER_START_BYTE {
                parsed.entropy_data.push(byte);
                self.position += 1;
                continue;
            }
            match self.source.get(self.position + 1) {
                Some(&0x00) => {
                    parsed.entropy_data.extend_from_slice(&[0xFF, 0x00]);
                    self.position += 2;
                }
                Some(&JPEG_MARKER_START_BYTE) => self.position += 1,
                Some(&marker) if JpegMarkerCode::is_restart(marker) => {
                    return Err(RequantError::UnsupportedFeature("restart markers"));
                }
                Some(_) => {
                    self.state = JpegStreamReaderState::HeaderSection;
                    return Ok(());
                }
                None => {
                    warn!("scan data ends with a lone 0xFF");
                    self.position += 1;
                }
            }
        }
        Ok(())
    }
}

/// Parses a complete JPEG held in memory.
pub fn parse_jpeg(source: &[u8]) -> Result<ParsedJpeg> {
    JpegStreamReader::new(source).read()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, marker];
        bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_not_a_jpeg() {
        assert!(matches!(parse_jpeg(&[0x89, 0x50, 0x4E, 0x47]), Err(RequantError::NotAJpeg)));
        assert!(matches!(parse_jpeg(&[0xFF]), Err(RequantError::NotAJpeg)));
    }

    #[test]
    fn test_parse_segments_and_scan_data() {
        let mut file = vec![0xFF, 0xD8];
        file.extend(segment(0xE0, b"JFIF\0"));
        let mut dqt = vec![0x00];
        dqt.extend_from_slice(&[2u8; 64]);
        file.extend(segment(0xDB, &dqt));
        file.extend(segment(0xC0, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0]));
        file.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        file.extend_from_slice(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xFF, 0xD9]);

        let parsed = parse_jpeg(&file).unwrap();
        let markers: Vec<u8> = parsed.segments.iter().map(|s| s.marker).collect();
        assert_eq!(markers, vec![0xE0, 0xDB, 0xC0, 0xDA]);
        assert_eq!(parsed.scan_segment_index, Some(3));
        assert_eq!(parsed.entropy_data, vec![0x12, 0xFF, 0x00, 0x34]);
        assert_eq!(parsed.quantization_tables[0].as_ref().unwrap().values[3][5], 2);

        let frame = parsed.frame_header().unwrap();
        assert_eq!((frame.width, frame.height, frame.precision), (8, 8, 8));
        assert_eq!(
            frame.components,
            vec![FrameComponent { id: 1, h_samp_factor: 1, v_samp_factor: 1, quant_table_dest: 0 }]
        );
        let scan = parsed.scan_header().unwrap();
        assert_eq!(scan.components[0], ScanComponent { id: 1, dc_table_dest: 0, ac_table_dest: 0 });
        assert_eq!((scan.spectral_start, scan.spectral_end), (0, 63));
    }

    #[test]
    fn test_huffman_tables_are_resolved() {
        let mut dht = vec![0x01];
        dht.extend_from_slice(&huffman::STD_LUMINANCE_DC_LENGTHS);
        dht.extend_from_slice(&huffman::STD_LUMINANCE_DC_VALUES);
        let mut file = vec![0xFF, 0xD8];
        file.extend(segment(0xC4, &dht));
        file.extend_from_slice(&[0xFF, 0xD9]);

        let tables = parse_jpeg(&file).unwrap().huffman_tables().unwrap();
        assert!(tables.get(HuffmanClass::Dc, 1).is_ok());
        assert!(matches!(
            tables.get(HuffmanClass::Ac, 1),
            Err(RequantError::MissingHuffmanTable { class: "AC", id: 1 })
        ));
    }

    #[test]
    fn test_missing_headers() {
        let file = [0xFF, 0xD8, 0xFF, 0xD9];
        let parsed = parse_jpeg(&file).unwrap();
        assert!(matches!(parsed.frame_header(), Err(RequantError::NoFrameHeader)));
        assert!(matches!(parsed.scan_header(), Err(RequantError::NoScanHeader)));
    }

    #[test]
    fn test_bad_segment_length() {
        let file = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x01];
        assert!(matches!(parse_jpeg(&file), Err(RequantError::InvalidSegmentLength)));
        let file = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x01];
        assert!(matches!(parse_jpeg(&file), Err(RequantError::InvalidSegmentLength)));
    }

    #[test]
    fn test_restart_markers_rejected() {
        let mut file = vec![0xFF, 0xD8];
        file.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        file.extend_from_slice(&[0x12, 0xFF, 0xD0, 0x34, 0xFF, 0xD9]);
        assert!(matches!(
            parse_jpeg(&file),
            Err(RequantError::UnsupportedFeature("restart markers"))
        ));
    }

    #[test]
    fn test_second_scan_rejected() {
        let mut file = vec![0xFF, 0xD8];
        file.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        file.push(0x12);
        file.extend(segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
        file.extend_from_slice(&[0xFF, 0xD9]);
        assert!(matches!(
            parse_jpeg(&file),
            Err(RequantError::UnsupportedFeature("multiple scans"))
        ));
    }
}
