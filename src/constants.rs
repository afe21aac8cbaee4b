// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

// The maximum size of the data bytes that fit in a segment.
pub const SEGMENT_MAX_DATA_SIZE: usize = u16::MAX as usize - SEGMENT_LENGTH_SIZE;

// Quality 50 leaves a quantization table unchanged.
pub const DEFAULT_QUALITY: u8 = 50;
pub const MINIMUM_QUALITY: u8 = 1;
pub const MAXIMUM_QUALITY: u8 = 100;

// Baseline and extended sequential frames only carry 8-bit samples here.
pub const SUPPORTED_SAMPLE_PRECISION: u8 = 8;

// Spectral selection of a sequential scan.
pub const SEQUENTIAL_SPECTRAL_START: u8 = 0;
pub const SEQUENTIAL_SPECTRAL_END: u8 = 63;
