//! Image File Directory decoding.
//!
//! An IFD is an entry count, a table of fixed-size entries and the offset of
//! the next IFD. Entry values are either stored inline in the entry's value
//! field or at an absolute offset elsewhere in the file. Decoding a directory
//! only records which; out-of-line bytes are fetched when a value is read.

use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, TiffHeader};
use super::tags::{TagCode, TagType};

// =============================================================================
// IfdEntry
// =============================================================================

/// A single tag entry of an IFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Raw tag code
    pub code: u16,

    /// Declared field type (`Unknown` for unrecognized type codes)
    pub field_type: TagType,

    /// Number of elements
    pub count: u64,

    /// Raw value/offset field (4 bytes classic, 8 bytes BigTIFF)
    pub value_offset_bytes: Vec<u8>,

    /// Whether the value is stored in `value_offset_bytes`
    pub is_inline: bool,
}

impl IfdEntry {
    /// Parse an entry from its raw bytes.
    ///
    /// `bytes` must hold at least `header.ifd_entry_size()` bytes.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Self {
        let byte_order = header.byte_order;
        let code = byte_order.read_u16(&bytes[0..2]);
        let field_type = TagType::from_u16(byte_order.read_u16(&bytes[2..4]));

        let (count, value_start) = if header.is_bigtiff {
            (byte_order.read_u64(&bytes[4..12]), 12)
        } else {
            (byte_order.read_u32(&bytes[4..8]) as u64, 8)
        };
        let value_end = value_start + header.value_offset_size();
        let value_offset_bytes = bytes[value_start..value_end].to_vec();

        // Unknown types and overflowing counts are treated as out-of-line;
        // reading them fails later instead of here.
        let is_inline = field_type.fits_inline(count, header.is_bigtiff);

        IfdEntry {
            code,
            field_type,
            count,
            value_offset_bytes,
            is_inline,
        }
    }

    /// The tag code as an enumeration.
    #[inline]
    pub fn tag_code(&self) -> TagCode {
        TagCode::from_u16(self.code)
    }

    /// Total size of the value in bytes.
    ///
    /// `None` for unknown field types or if `count * element size` overflows.
    #[inline]
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type.byte_size(self.count)
    }

    /// Absolute offset of an out-of-line value.
    ///
    /// Returns `None` for inline values.
    pub fn value_offset(&self, byte_order: ByteOrder) -> Option<u64> {
        if self.is_inline {
            return None;
        }
        let is_bigtiff = self.value_offset_bytes.len() == 8;
        Some(byte_order.read_offset(&self.value_offset_bytes, is_bigtiff))
    }

    /// The inline value bytes, left-aligned in the value field.
    ///
    /// Returns `None` for out-of-line values.
    pub fn inline_bytes(&self) -> Option<&[u8]> {
        if !self.is_inline {
            return None;
        }
        let size = self.value_byte_size()? as usize;
        Some(&self.value_offset_bytes[..size])
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A decoded Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// Absolute offset of this directory in the file
    pub offset: u64,

    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD (0 = last)
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Total byte size of a directory with `entry_count` entries.
    ///
    /// `None` if the size does not fit in 64 bits.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> Option<u64> {
        entry_count
            .checked_mul(header.ifd_entry_size() as u64)?
            .checked_add(header.ifd_count_size() as u64)?
            .checked_add(header.ifd_next_offset_size() as u64)
    }

    /// Parse a directory from its complete raw bytes.
    ///
    /// `bytes` starts at the entry count and must span the whole directory,
    /// as given by [`Ifd::calculate_size`].
    pub fn parse(bytes: &[u8], header: &TiffHeader, offset: u64) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let count_size = header.ifd_count_size();
        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = read_entry_count(bytes, header);
        let required = Self::calculate_size(entry_count, header)
            .filter(|size| *size <= bytes.len() as u64)
            .ok_or(TiffError::IfdTooLarge {
                offset,
                entry_count,
            })?;

        let entry_size = header.ifd_entry_size();
        let entries = bytes[count_size..]
            .chunks_exact(entry_size)
            .take(entry_count as usize)
            .map(|chunk| IfdEntry::parse(chunk, header))
            .collect();

        let next_start = required as usize - header.ifd_next_offset_size();
        let next_ifd_offset = byte_order.read_offset(&bytes[next_start..], header.is_bigtiff);

        Ok(Ifd {
            offset,
            entries,
            next_ifd_offset,
        })
    }

    /// Read and parse the directory at `offset`.
    ///
    /// Issues two reads: the entry count, then the whole table. The table
    /// size is checked against the source size before it is requested.
    pub async fn read<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
        offset: u64,
    ) -> Result<Self, TiffError> {
        let size = reader.size();
        if offset == 0 || offset >= size {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        let count_bytes = reader
            .read_exact_at(offset, header.ifd_count_size())
            .await?;
        let entry_count = read_entry_count(&count_bytes, header);

        let ifd_size = Self::calculate_size(entry_count, header)
            .filter(|ifd_size| {
                offset
                    .checked_add(*ifd_size)
                    .is_some_and(|end| end <= size)
            })
            .ok_or(TiffError::IfdTooLarge {
                offset,
                entry_count,
            })?;

        let ifd_bytes = reader.read_exact_at(offset, ifd_size as usize).await?;
        let ifd = Self::parse(&ifd_bytes, header, offset)?;

        debug!(
            offset,
            entry_count,
            bigtiff = header.is_bigtiff,
            next = ifd.next_ifd_offset,
            "Decoded IFD"
        );

        Ok(ifd)
    }

    /// First entry with the given tag code.
    pub fn get_entry(&self, tag: TagCode) -> Option<&IfdEntry> {
        self.get_entry_by_id(tag.as_u16())
    }

    /// First entry with the given raw tag code.
    pub fn get_entry_by_id(&self, code: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|entry| entry.code == code)
    }

    /// Number of entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

fn read_entry_count(bytes: &[u8], header: &TiffHeader) -> u64 {
    if header.is_bigtiff {
        header.byte_order.read_u64(bytes)
    } else {
        header.byte_order.read_u16(bytes) as u64
    }
}

// =============================================================================
// Tests
// =============================================================================
