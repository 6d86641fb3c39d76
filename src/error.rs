use thiserror::Error;

use crate::format::tiff::{TagCode, TagType};

/// Failure to fetch bytes from a [`RangeReader`](crate::RangeReader).
#[derive(Debug, Clone, Error)]
pub enum IoError {
    #[error("read failed: {0}")]
    Io(String),

    #[error("S3 request failed: {0}")]
    S3(String),

    /// The source holds fewer bytes than the read asked for.
    #[error("cannot read {requested} bytes at offset {offset}: source is {size} bytes")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// The transfer broke off mid-body.
    #[error("connection lost: {0}")]
    Connection(String),

    #[error("no such file or object: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Io(err.to_string()),
        }
    }
}

/// Reasons a file or directory cannot be decoded at all.
///
/// Returned by [`open`](crate::open) and by chain traversal. Once an
/// [`Image`](crate::Image) exists, later failures are [`TagError`]s.
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    #[error(transparent)]
    Io(#[from] IoError),

    /// First two bytes are neither `II` nor `MM`.
    #[error("not a TIFF file: byte order marker 0x{0:04X}")]
    InvalidMagic(u16),

    /// Version word other than 42 or 43.
    #[error("unsupported TIFF version {0}")]
    InvalidVersion(u16),

    #[error("BigTIFF offset width is {0}, only 8 is supported")]
    InvalidBigTiffOffsetSize(u16),

    #[error("header truncated: {actual} bytes available, {required} needed")]
    FileTooSmall { required: u64, actual: u64 },

    /// Zero, or at or past the end of the file.
    #[error("IFD offset {0} is outside the file")]
    InvalidIfdOffset(u64),

    #[error("IFD at offset {offset} lists {entry_count} entries, which runs past the end of the file")]
    IfdTooLarge { offset: u64, entry_count: u64 },
}

/// Per-call failures when decoding a tag value or resolving geometry.
///
/// None of these invalidate the [`Image`](crate::Image) they came from.
#[derive(Debug, Clone, Error)]
pub enum TagError {
    /// The value bytes could not be read (truncated or unreachable source)
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The declared type code is not one this decoder knows the size of
    #[error("Unknown tag type: {0}")]
    UnknownType(u16),

    /// Requested element type cannot represent the declared type
    #[error("Cannot read {declared} tag as {requested}")]
    TypeMismatch {
        declared: TagType,
        requested: &'static str,
    },

    /// Tag has no elements
    #[error("Tag has a count of zero")]
    EmptyValue,

    /// count * element size does not fit in 64 bits (or in memory)
    #[error("Tag count {count} overflows the value size")]
    CountOverflow { count: u64 },

    /// Rational element with a zero denominator
    #[error("Zero denominator in rational element {index}")]
    ZeroDenominator { index: usize },

    /// A tag required for this operation is absent
    #[error("Missing required tag: {0}")]
    MissingTag(TagCode),

    /// Tile addressing requested on a strip-organized image
    #[error("Image is not tiled")]
    NotTiled,

    /// Element or strile index past the end
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    /// Tile coordinate outside the tile grid
    #[error("Tile ({x}, {y}) sample {sample} is outside the tile grid")]
    TileOutOfRange { x: u32, y: u32, sample: u32 },
}
