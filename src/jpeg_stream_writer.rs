//! JPEG codestream writer.
//!
//! Frames marker segments and reassembles a transcoded file from the parsed
//! segments of the original, the new quantization tables and the new
//! entropy-coded scan data.

use tracing::debug;

use crate::constants::SEGMENT_MAX_DATA_SIZE;
use crate::error::{RequantError, Result};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg_stream_reader::ParsedJpeg;
use crate::jpeg1::quantization::{self, QuantizationTable};

/// A writer for JPEG codestreams that manages marker emission.
#[derive(Default)]
pub struct JpegStreamWriter {
    destination: Vec<u8>,
}

impl JpegStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            destination: Vec::with_capacity(capacity),
        }
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_marker(&mut self, marker: u8) {
        self.write_byte(JPEG_MARKER_START_BYTE);
        self.write_byte(marker);
    }

    pub fn write_start_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::StartOfImage.into());
    }

    pub fn write_end_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::EndOfImage.into());
    }

    /// Writes `0xFF, marker, length, payload` where length counts itself.
    pub fn write_segment(&mut self, marker: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > SEGMENT_MAX_DATA_SIZE {
            return Err(RequantError::InvalidSegmentLength);
        }
        self.write_marker(marker);
        self.write_u16((payload.len() + 2) as u16);
        self.destination.extend_from_slice(payload);
        Ok(())
    }

    pub fn write_dqt(&mut self, tables: &[QuantizationTable]) -> Result<()> {
        self.write_segment(
            JpegMarkerCode::DefineQuantizationTable.into(),
            &quantization::dqt_payload(tables),
        )
    }

    /// Appends already byte-stuffed entropy-coded data.
    pub fn write_entropy_coded_data(&mut self, data: &[u8]) {
        self.destination.extend_from_slice(data);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.destination
    }
}

/// Rebuilds a file in a fixed segment order:
/// SOI, APPn/COM, the new DQT, the frame header, every DHT, remaining
/// segments that preceded the scan, SOS, the entropy-coded data, EOI.
pub fn rebuild_jpeg(
    parsed: &ParsedJpeg,
    tables: &[QuantizationTable],
    entropy_data: &[u8],
) -> Result<Vec<u8>> {
    let frame = parsed.frame_segment()?;
    let scan = parsed.scan_segment()?;
    let scan_index = parsed.scan_segment_index.unwrap_or(parsed.segments.len());

    let mut writer = JpegStreamWriter::with_capacity(
        entropy_data.len() + parsed.segments.iter().map(|s| s.payload.len() + 4).sum::<usize>() + 4,
    );
    writer.write_start_of_image();

    for segment in parsed
        .segments
        .iter()
        .filter(|s| JpegMarkerCode::is_application_or_comment(s.marker))
    {
        writer.write_segment(segment.marker, &segment.payload)?;
    }

    writer.write_dqt(tables)?;
    writer.write_segment(frame.marker, &frame.payload)?;

    let dht: u8 = JpegMarkerCode::DefineHuffmanTable.into();
    for segment in parsed.segments.iter().filter(|s| s.marker == dht) {
        writer.write_segment(segment.marker, &segment.payload)?;
    }

    let dqt: u8 = JpegMarkerCode::DefineQuantizationTable.into();
    for segment in parsed.segments[..scan_index].iter().filter(|s| {
        !JpegMarkerCode::is_application_or_comment(s.marker)
            && s.marker != dqt
            && s.marker != dht
            && s.marker != frame.marker
    }) {
        debug!(marker = %JpegMarkerCode::name(segment.marker), "passing through segment");
        writer.write_segment(segment.marker, &segment.payload)?;
    }

    writer.write_segment(scan.marker, &scan.payload)?;
    writer.write_entropy_coded_data(entropy_data);
    writer.write_end_of_image();
    Ok(writer.into_bytes())
}
