//! TIFF and BigTIFF metadata decoding.
//!
//! [`open`] reads the header and the first directory and returns an
//! [`Image`]. Everything else is decoded on request:
//!
//! - entries record whether their value sits inside the entry or at an
//!   offset, and out-of-line bytes are fetched by [`ValueReader`] only when
//!   a value is asked for;
//! - geometry (size, tiling, strips, planes) is derived from tags once, when
//!   the directory is decoded;
//! - striles (strips or tiles) are located as byte ranges and never
//!   decompressed;
//! - [`Image::next`] follows the directory chain and stops at cycles.
//!
//! Byte order and the classic/BigTIFF layout come from [`TiffHeader`] and
//! apply to every multi-byte field in the file.

mod geokeys;
mod ifd;
mod image;
pub(crate) mod parser;
mod tags;
mod values;

pub use geokeys::{GeoKey, GeoKeyDirectory, GeoKeyEntry, GeoKeyValue};
pub use ifd::{Ifd, IfdEntry};
pub use image::{open, Image};
pub use parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{
    compression_name, photometric_interpretation_name, planar_configuration_name,
    sample_format_name, tag_code_name, tag_type_name, Compression, PhotometricInterpretation,
    PlanarConfiguration, Predictor, SampleFormat, TagCode, TagType, UNKNOWN_NAME,
};
pub use values::{TagValue, ValueReader};
