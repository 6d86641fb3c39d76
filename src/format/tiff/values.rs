//! TIFF tag value reading.
//!
//! Values can be stored either inline in the IFD entry (for small values)
//! or at an offset in the file (for larger values like arrays). Nothing is
//! cached: every call fetches the bytes it needs, decodes them in the file's
//! byte order and converts each element into the requested type.
//!
//! # Conversions
//!
//! A tag can be read as any [`TagValue`] type able to hold its declared type
//! without loss of sign or range:
//!
//! - unsigned types (Byte, Short, Long, Long8, IFD, IFD8) widen into any
//!   unsigned integer at least as wide
//! - signed types (SByte, SShort, SLong, SLong8) widen into any signed integer
//!   at least as wide
//! - Float reads as `f32` or `f64`, Double only as `f64`
//! - Rational and SRational read as floats, numerator over denominator
//!
//! Everything else, ASCII and Undefined included, is a type mismatch.

use bytes::Bytes;

use crate::error::TagError;
use crate::io::RangeReader;

use super::ifd::IfdEntry;
use super::parser::{ByteOrder, TiffHeader};
use super::tags::TagType;

// =============================================================================
// Element decoding
// =============================================================================

/// One decoded element in its widest natural form.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Element {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Rational { numerator: i64, denominator: i64 },
}

/// Width class of a declared type, used for compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Unsigned(usize),
    Signed(usize),
    Float,
    Double,
    Rational,
    Other,
}

fn family(field_type: TagType) -> Family {
    match field_type {
        TagType::Byte => Family::Unsigned(1),
        TagType::Short => Family::Unsigned(2),
        TagType::Long | TagType::Ifd => Family::Unsigned(4),
        TagType::Long8 | TagType::Ifd8 => Family::Unsigned(8),
        TagType::SByte => Family::Signed(1),
        TagType::SShort => Family::Signed(2),
        TagType::SLong => Family::Signed(4),
        TagType::SLong8 => Family::Signed(8),
        TagType::Float => Family::Float,
        TagType::Double => Family::Double,
        TagType::Rational | TagType::SRational => Family::Rational,
        TagType::Ascii | TagType::Undefined | TagType::Unknown(_) => Family::Other,
    }
}

/// Decode one element of a numeric type.
///
/// `bytes` holds exactly one element of `field_type`.
fn decode_element(field_type: TagType, bytes: &[u8], byte_order: ByteOrder) -> Option<Element> {
    let element = match field_type {
        TagType::Byte => Element::Unsigned(bytes[0] as u64),
        TagType::Short => Element::Unsigned(byte_order.read_u16(bytes) as u64),
        TagType::Long | TagType::Ifd => Element::Unsigned(byte_order.read_u32(bytes) as u64),
        TagType::Long8 | TagType::Ifd8 => Element::Unsigned(byte_order.read_u64(bytes)),
        TagType::SByte => Element::Signed(bytes[0] as i8 as i64),
        TagType::SShort => Element::Signed(byte_order.read_u16(bytes) as i16 as i64),
        TagType::SLong => Element::Signed(byte_order.read_u32(bytes) as i32 as i64),
        TagType::SLong8 => Element::Signed(byte_order.read_u64(bytes) as i64),
        TagType::Float => Element::Float(byte_order.read_f32(bytes) as f64),
        TagType::Double => Element::Float(byte_order.read_f64(bytes)),
        TagType::Rational => Element::Rational {
            numerator: byte_order.read_u32(&bytes[0..4]) as i64,
            denominator: byte_order.read_u32(&bytes[4..8]) as i64,
        },
        TagType::SRational => Element::Rational {
            numerator: byte_order.read_u32(&bytes[0..4]) as i32 as i64,
            denominator: byte_order.read_u32(&bytes[4..8]) as i32 as i64,
        },
        TagType::Ascii | TagType::Undefined | TagType::Unknown(_) => return None,
    };
    Some(element)
}

// =============================================================================
// TagValue
// =============================================================================

/// Element types a tag value can be read as.
pub trait TagValue: Copy + Send + Sync + 'static {
    /// Type name used in mismatch errors
    const NAME: &'static str;

    /// Whether elements of `field_type` convert into `Self` without loss.
    fn accepts(field_type: TagType) -> bool;

    fn from_unsigned(value: u64) -> Option<Self>;

    fn from_signed(value: i64) -> Option<Self>;

    fn from_float(value: f64) -> Option<Self>;
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl TagValue for $ty {
            const NAME: &'static str = stringify!($ty);

            fn accepts(field_type: TagType) -> bool {
                matches!(family(field_type), Family::Unsigned(size) if size <= std::mem::size_of::<$ty>())
            }

            fn from_unsigned(value: u64) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }

            fn from_signed(_: i64) -> Option<Self> {
                None
            }

            fn from_float(_: f64) -> Option<Self> {
                None
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl TagValue for $ty {
            const NAME: &'static str = stringify!($ty);

            fn accepts(field_type: TagType) -> bool {
                matches!(family(field_type), Family::Signed(size) if size <= std::mem::size_of::<$ty>())
            }

            fn from_unsigned(_: u64) -> Option<Self> {
                None
            }

            fn from_signed(value: i64) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }

            fn from_float(_: f64) -> Option<Self> {
                None
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64);
impl_signed!(i8, i16, i32, i64);

impl TagValue for f32 {
    const NAME: &'static str = "f32";

    fn accepts(field_type: TagType) -> bool {
        matches!(family(field_type), Family::Float | Family::Rational)
    }

    fn from_unsigned(_: u64) -> Option<Self> {
        None
    }

    fn from_signed(_: i64) -> Option<Self> {
        None
    }

    fn from_float(value: f64) -> Option<Self> {
        Some(value as f32)
    }
}

impl TagValue for f64 {
    const NAME: &'static str = "f64";

    fn accepts(field_type: TagType) -> bool {
        matches!(
            family(field_type),
            Family::Float | Family::Double | Family::Rational
        )
    }

    fn from_unsigned(_: u64) -> Option<Self> {
        None
    }

    fn from_signed(_: i64) -> Option<Self> {
        None
    }

    fn from_float(value: f64) -> Option<Self> {
        Some(value)
    }
}

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file.
///
/// Combines a [`RangeReader`] with the header so values are read in the
/// file's byte order and entry layout.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read the raw bytes of an entry's value.
    ///
    /// Inline values come from the entry itself; out-of-line values are
    /// fetched with one read of `count * element size` bytes.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TagError> {
        let element_size = entry
            .field_type
            .element_size()
            .ok_or(TagError::UnknownType(entry.field_type.as_u16()))?;
        if entry.count == 0 {
            return Err(TagError::EmptyValue);
        }
        let size = (element_size as u64)
            .checked_mul(entry.count)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or(TagError::CountOverflow { count: entry.count })?;

        if let Some(bytes) = entry.inline_bytes() {
            return Ok(Bytes::copy_from_slice(bytes));
        }

        let offset = entry
            .value_offset(self.header.byte_order)
            .unwrap_or_default();
        Ok(self.reader.read_exact_at(offset, size).await?)
    }

    /// Read all elements of an entry as `T`.
    ///
    /// The array is fetched in a single read.
    pub async fn read_vec<T: TagValue>(&self, entry: &IfdEntry) -> Result<Vec<T>, TagError> {
        let element_size = self.check_numeric::<T>(entry)?;
        let bytes = self.read_bytes(entry).await?;
        let byte_order = self.header.byte_order;

        bytes
            .chunks_exact(element_size)
            .enumerate()
            .map(|(index, chunk)| convert::<T>(entry.field_type, chunk, byte_order, index))
            .collect()
    }

    /// Read the element at `index` as `T`.
    ///
    /// Only that element is fetched, so this stays cheap for large
    /// offset/byte-count arrays.
    pub async fn read_at<T: TagValue>(&self, entry: &IfdEntry, index: u64) -> Result<T, TagError> {
        let element_size = self.check_numeric::<T>(entry)?;
        if index >= entry.count {
            return Err(TagError::IndexOutOfRange {
                index,
                len: entry.count,
            });
        }
        let byte_order = self.header.byte_order;

        if let Some(bytes) = entry.inline_bytes() {
            // Inline values span at most 8 bytes, so this cannot overflow
            let start = index as usize * element_size;
            let chunk = &bytes[start..start + element_size];
            return convert::<T>(entry.field_type, chunk, byte_order, index as usize);
        }

        let base = entry.value_offset(byte_order).unwrap_or_default();
        let offset = (element_size as u64)
            .checked_mul(index)
            .and_then(|delta| base.checked_add(delta))
            .ok_or(TagError::CountOverflow { count: entry.count })?;
        let chunk = self.reader.read_exact_at(offset, element_size).await?;
        convert::<T>(entry.field_type, &chunk, byte_order, index as usize)
    }

    /// Read an ASCII value as a string.
    ///
    /// A single trailing NUL is stripped; anything before it, interior NULs
    /// included, is kept.
    pub async fn read_string(&self, entry: &IfdEntry) -> Result<String, TagError> {
        if entry.field_type != TagType::Ascii {
            return Err(TagError::TypeMismatch {
                declared: entry.field_type,
                requested: "string",
            });
        }

        let bytes = self.read_bytes(entry).await?;
        let text = bytes.strip_suffix(&[0u8]).unwrap_or(&bytes[..]);
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// Read the value bytes of any known type without conversion.
    ///
    /// Used for UNDEFINED and other opaque data such as JPEGTables.
    pub async fn read_raw_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TagError> {
        self.read_bytes(entry).await
    }

    fn check_numeric<T: TagValue>(&self, entry: &IfdEntry) -> Result<usize, TagError> {
        let element_size = entry
            .field_type
            .element_size()
            .ok_or(TagError::UnknownType(entry.field_type.as_u16()))?;
        if !T::accepts(entry.field_type) {
            return Err(TagError::TypeMismatch {
                declared: entry.field_type,
                requested: T::NAME,
            });
        }
        if entry.count == 0 {
            return Err(TagError::EmptyValue);
        }
        Ok(element_size)
    }
}

fn convert<T: TagValue>(
    field_type: TagType,
    bytes: &[u8],
    byte_order: ByteOrder,
    index: usize,
) -> Result<T, TagError> {
    let converted = match decode_element(field_type, bytes, byte_order) {
        Some(Element::Unsigned(value)) => T::from_unsigned(value),
        Some(Element::Signed(value)) => T::from_signed(value),
        Some(Element::Float(value)) => T::from_float(value),
        Some(Element::Rational {
            numerator,
            denominator,
        }) => {
            if denominator == 0 {
                return Err(TagError::ZeroDenominator { index });
            }
            T::from_float(numerator as f64 / denominator as f64)
        }
        None => None,
    };
    converted.ok_or(TagError::TypeMismatch {
        declared: field_type,
        requested: T::NAME,
    })
}

// =============================================================================
// Tests
// =============================================================================
