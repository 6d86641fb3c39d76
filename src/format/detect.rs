//! Cheap TIFF/BigTIFF sniffing.
//!
//! Looks at the byte order marker and version only, without validating the
//! rest of the header, so it can be used to reject other file types before
//! attempting a full parse.

use crate::error::IoError;
use crate::io::RangeReader;

use super::tiff::parser::{
    BYTE_ORDER_BIG_ENDIAN, BYTE_ORDER_LITTLE_ENDIAN, VERSION_BIGTIFF, VERSION_TIFF,
};
use super::tiff::{ByteOrder, TIFF_HEADER_SIZE};

// =============================================================================
// TiffVariant
// =============================================================================

/// Classic TIFF or BigTIFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffVariant {
    /// 32-bit offsets (version 42)
    Classic,

    /// 64-bit offsets (version 43)
    BigTiff,
}

impl TiffVariant {
    pub const fn name(&self) -> &'static str {
        match self {
            TiffVariant::Classic => "TIFF",
            TiffVariant::BigTiff => "BigTIFF",
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Identify the byte order and variant from the first bytes of a file.
///
/// Returns `None` if the bytes do not start like a TIFF file.
pub fn detect_variant(bytes: &[u8]) -> Option<(ByteOrder, TiffVariant)> {
    if bytes.len() < 4 {
        return None;
    }

    let byte_order = match u16::from_le_bytes([bytes[0], bytes[1]]) {
        BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
        BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
        _ => return None,
    };

    let variant = match byte_order.read_u16(&bytes[2..4]) {
        VERSION_TIFF => TiffVariant::Classic,
        VERSION_BIGTIFF => TiffVariant::BigTiff,
        _ => return None,
    };

    Some((byte_order, variant))
}

/// Check if bytes start with a complete-looking TIFF header.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    bytes.len() >= TIFF_HEADER_SIZE && detect_variant(bytes).is_some()
}

/// Sniff the first bytes of a source.
pub async fn detect_source<R: RangeReader + ?Sized>(
    reader: &R,
) -> Result<Option<(ByteOrder, TiffVariant)>, IoError> {
    let len = reader.size().min(TIFF_HEADER_SIZE as u64) as usize;
    let bytes = reader.read_exact_at(0, len).await?;
    if bytes.len() < TIFF_HEADER_SIZE {
        return Ok(None);
    }
    Ok(detect_variant(&bytes))
}

// =============================================================================
// Tests
// =============================================================================
