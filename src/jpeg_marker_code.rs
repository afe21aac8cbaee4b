use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Marker codes recognised by the segment parser (ISO/IEC 10918-1, Table B.1).
/// Any other marker byte is carried through as an opaque segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF0: Baseline DCT, Huffman coding.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Extended sequential DCT, Huffman coding.
    StartOfFrameExtendedSequential = 0xC1,
    /// SOF2: Progressive DCT, Huffman coding.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Lossless (sequential), Huffman coding.
    StartOfFrameLossless = 0xC3,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    StartOfFrameDifferentialSequential = 0xC5,
    StartOfFrameDifferentialProgressive = 0xC6,
    StartOfFrameDifferentialLossless = 0xC7,
    StartOfFrameExtendedSequentialArithmetic = 0xC9,
    StartOfFrameProgressiveArithmetic = 0xCA,
    StartOfFrameLosslessArithmetic = 0xCB,

    /// DAC: Defines arithmetic coding conditioning.
    DefineArithmeticCoding = 0xCC,

    StartOfFrameDifferentialSequentialArithmetic = 0xCD,
    StartOfFrameDifferentialProgressiveArithmetic = 0xCE,
    StartOfFrameDifferentialLosslessArithmetic = 0xCF,

    /// RSTm: Restart markers, only valid inside entropy-coded data.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,
    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,
    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,
    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,
    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,
    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    /// APP13: Application data 13: used by PhotoShop IRB
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    /// True for every SOFn marker (0xC0..=0xCF minus DHT, JPG and DAC).
    pub fn is_start_of_frame(marker: u8) -> bool {
        (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
    }

    /// True for APP0..APP15 and COM, the segments kept ahead of the tables on rebuild.
    pub fn is_application_or_comment(marker: u8) -> bool {
        (0xE0..=0xEF).contains(&marker) || marker == JpegMarkerCode::Comment as u8
    }

    pub fn is_restart(marker: u8) -> bool {
        (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
            .contains(&marker)
    }

    /// Short mnemonic used by `info` output and log lines.
    pub fn name(marker: u8) -> String {
        match JpegMarkerCode::try_from(marker) {
            Ok(JpegMarkerCode::DefineHuffmanTable) => "DHT".to_string(),
            Ok(JpegMarkerCode::DefineQuantizationTable) => "DQT".to_string(),
            Ok(JpegMarkerCode::DefineRestartInterval) => "DRI".to_string(),
            Ok(JpegMarkerCode::DefineNumberOfLines) => "DNL".to_string(),
            Ok(JpegMarkerCode::DefineArithmeticCoding) => "DAC".to_string(),
            Ok(JpegMarkerCode::StartOfImage) => "SOI".to_string(),
            Ok(JpegMarkerCode::EndOfImage) => "EOI".to_string(),
            Ok(JpegMarkerCode::StartOfScan) => "SOS".to_string(),
            Ok(JpegMarkerCode::Comment) => "COM".to_string(),
            _ if Self::is_start_of_frame(marker) => format!("SOF{}", marker - 0xC0),
            _ if Self::is_restart(marker) => format!("RST{}", marker - JPEG_RESTART_MARKER_BASE),
            _ if (0xE0..=0xEF).contains(&marker) => format!("APP{}", marker - 0xE0),
            _ => format!("0x{:02X}", marker),
        }
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;
