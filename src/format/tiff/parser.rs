//! File header decoding.
//!
//! A TIFF file opens with a byte order marker and a version word. The
//! version picks the layout of everything that follows:
//!
//! ```text
//! classic (42):  [order:2][42:2][first IFD:4]
//! BigTIFF (43):  [order:2][43:2][offset width = 8:2][zero:2][first IFD:8]
//! ```
//!
//! The order marker is `II` for little-endian and `MM` for big-endian.

use tracing::warn;

use crate::error::TiffError;

// =============================================================================
// Constants
// =============================================================================

/// `II` marker.
pub(crate) const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// `MM` marker.
pub(crate) const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

pub(crate) const VERSION_TIFF: u16 = 42;

pub(crate) const VERSION_BIGTIFF: u16 = 43;

/// Bytes occupied by a classic header.
pub const TIFF_HEADER_SIZE: usize = 8;

/// Bytes occupied by a BigTIFF header. Reading this many covers both layouts.
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Endianness declared by the header marker.
///
/// Every multi-byte field in the file is stored in this order, tag values
/// included, so decoding goes through the `read_*` helpers below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `II`
    LittleEndian,
    /// `MM`
    BigEndian,
}

/// Copy the first `N` bytes of a slice into an array.
///
/// # Panics
/// Panics if the slice has fewer than `N` bytes. Callers size their buffers
/// from the entry layout before decoding.
#[inline]
fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

impl ByteOrder {
    /// Byte order of the machine running this code.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    /// Whether values in this order must be swapped to match the host.
    #[inline]
    pub fn must_swap(self) -> bool {
        self != Self::native()
    }

    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(array(bytes)),
            ByteOrder::BigEndian => u16::from_be_bytes(array(bytes)),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(array(bytes)),
            ByteOrder::BigEndian => u32::from_be_bytes(array(bytes)),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(array(bytes)),
            ByteOrder::BigEndian => u64::from_be_bytes(array(bytes)),
        }
    }

    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }

    /// Read an offset field: 4 bytes in classic TIFF, 8 in BigTIFF.
    #[inline]
    pub fn read_offset(self, bytes: &[u8], is_bigtiff: bool) -> u64 {
        if is_bigtiff {
            self.read_u64(bytes)
        } else {
            self.read_u32(bytes) as u64
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

fn ensure_len(bytes: &[u8], required: usize) -> Result<(), TiffError> {
    if bytes.len() < required {
        return Err(TiffError::FileTooSmall {
            required: required as u64,
            actual: bytes.len() as u64,
        });
    }
    Ok(())
}

/// Decoded file header.
///
/// Everything directory decoding needs to know up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,

    /// Set for version 43, where counts and offsets are 8 bytes wide.
    pub is_bigtiff: bool,

    /// Where the directory chain starts.
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Decode the header at the start of `bytes`.
    ///
    /// `file_size` bounds the first directory offset, which must be nonzero
    /// and inside the file. A classic header needs 8 bytes and a BigTIFF
    /// header 16; shorter input fails with `FileTooSmall`. A nonzero BigTIFF
    /// reserved word is logged and otherwise ignored.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        ensure_len(bytes, TIFF_HEADER_SIZE)?;

        // II and MM read the same in either order
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);

        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                ensure_len(bytes, BIGTIFF_HEADER_SIZE)?;
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }

                let reserved = byte_order.read_u16(&bytes[6..8]);
                if reserved != 0 {
                    warn!(reserved, "BigTIFF header reserved field is not zero");
                }

                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset == 0 || first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Width of one directory entry: tag, type, count and the value field.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Width of the entry count that opens a directory.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Width of the link to the next directory.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        self.value_offset_size()
    }

    /// Width of an entry's value field. Values up to this size are stored
    /// in the entry itself.
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Width of an entry's count field.
    #[inline]
    pub const fn entry_count_field_size(&self) -> usize {
        self.value_offset_size()
    }
}

// =============================================================================
// Tests
// =============================================================================
