//! # tiffmeta
//!
//! Lazy TIFF and BigTIFF metadata decoding over positioned byte reads.
//!
//! Only the header and image file directories are read eagerly. Tag values
//! stored outside their directory entry are fetched when asked for, so
//! inspecting a multi-gigabyte file on S3 costs a handful of range requests.
//!
//! ## Features
//!
//! - **Both variants**: classic TIFF (32-bit offsets) and BigTIFF (64-bit
//!   offsets), little- and big-endian
//! - **Typed tag values**: read any tag as a vector of a requested numeric
//!   type, as a string or as raw bytes, with widening checked against the
//!   declared type
//! - **Strip and tile addressing**: image geometry, strile counts and the
//!   byte range of any strip or tile
//! - **GeoTIFF keys**: the GeoKeyDirectory with values resolved from the
//!   double and ASCII parameter tags
//! - **Cycle-safe chains**: walks the IFD chain and stops at loops
//!
//! ## Architecture
//!
//! - [`io`] - Range readers for memory, local files and S3, plus block caching
//! - [`mod@format`] - Header sniffing and the TIFF decoder
//! - [`report`] - Text and JSON summaries of decoded images
//! - [`config`] - CLI types for the `tiffmeta` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tiffmeta::{open, FileRangeReader, TagCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = Arc::new(FileRangeReader::open("scene.tif").await?);
//!     let image = open(reader).await?;
//!
//!     println!("{}x{}", image.width(), image.height());
//!     if let Some(entry) = image.tag(TagCode::ImageDescription) {
//!         println!("{}", image.read_tag_as_string(entry).await?);
//!     }
//!
//!     let mut next = image.next().await?;
//!     while let Some(image) = next {
//!         println!("overview {}x{}", image.width(), image.height());
//!         next = image.next().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod report;

// Re-export commonly used types
pub use config::{Cli, Command, DumpConfig, LocateConfig, OutputFormat, SourceArgs};
pub use error::{IoError, TagError, TiffError};
pub use format::tiff::{
    compression_name, open, photometric_interpretation_name, planar_configuration_name,
    sample_format_name, tag_code_name, tag_type_name, ByteOrder, Compression, GeoKey,
    GeoKeyDirectory, GeoKeyEntry, GeoKeyValue, Ifd, IfdEntry, Image, PhotometricInterpretation,
    PlanarConfiguration, Predictor, SampleFormat, TagCode, TagType, TagValue, TiffHeader,
    ValueReader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE, UNKNOWN_NAME,
};
pub use format::{detect_source, detect_variant, is_tiff_header, TiffVariant};
pub use io::{
    create_s3_client, BlockCache, CacheStats, FileRangeReader, MemoryReader, RangeReader,
    ObjectRef, S3RangeReader,
};
pub use report::{ChainReport, ImageReport, TagReport, TagValueReport};
