//! File format support.
//!
//! [`tiff`] decodes TIFF/BigTIFF headers, directories and tag values;
//! [`detect`] sniffs a source before a full parse.

pub mod detect;
pub mod tiff;

pub use detect::{detect_source, detect_variant, is_tiff_header, TiffVariant};
