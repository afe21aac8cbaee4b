use thiserror::Error;

/// Errors raised while parsing, decoding, requantizing or rebuilding a JPEG.
#[derive(Error, Debug)]
pub enum RequantError {
    #[error("Not a JPEG file (start of image marker not found)")]
    NotAJpeg,
    #[error("Entropy-coded stream exhausted")]
    StreamExhausted,
    #[error("Entropy-coded stream truncated in the middle of a block")]
    TruncatedStream,
    #[error("No Huffman code matches within 16 bits")]
    InvalidCode,
    #[error("Invalid block shape: expected {expected} elements, got {actual}")]
    ShapeError { expected: usize, actual: usize },
    #[error("Start of frame marker not found")]
    NoFrameHeader,
    #[error("Start of scan marker not found")]
    NoScanHeader,
    #[error("Symbol 0x{0:02X} has no Huffman code")]
    UnknownSymbol(u8),
    #[error("Amplitude {0} does not fit in a 15-bit category")]
    AmplitudeOutOfRange(i32),
    #[error("Invalid Huffman table definition")]
    InvalidHuffmanTable,
    #[error("Invalid quantization table definition")]
    InvalidQuantizationTable,
    #[error("Huffman table {class} {id} not defined")]
    MissingHuffmanTable { class: &'static str, id: u8 },
    #[error("Quantization table {0} not defined")]
    MissingQuantizationTable(u8),
    #[error("Invalid marker segment size")]
    InvalidSegmentLength,
    #[error("Symbol sequence does not start with a DC symbol")]
    InvalidSymbolSequence,
    #[error("Unsupported JPEG feature: {0}")]
    UnsupportedFeature(&'static str),
    #[error("Invalid operation")]
    InvalidOperation,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RequantError>;
