//! Changes the quality of a sequential Huffman JPEG by rescaling its
//! quantization tables and requantizing the DCT coefficients in place,
//! without decoding to pixels.

pub mod constants;
pub mod error;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;
pub mod transcoder;

pub use error::{RequantError, Result};
pub use jpeg_stream_reader::{ParsedJpeg, parse_jpeg};
pub use jpeg_stream_writer::rebuild_jpeg;
pub use transcoder::{
    Component, RequantizationPath, TranscodeOptions, TranscodeReport, TranscodeStage, Transcoder,
    transcode, transcode_file,
};
