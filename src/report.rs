//! Human and JSON readable summaries of decoded images.
//!
//! A report is collected once from an [`Image`] and can then be printed with
//! `Display` (the text dump) or serialized with serde (the JSON dump).
//! Values that fail to decode are left out rather than failing the report.

use std::fmt;

use serde::Serialize;

use crate::format::tiff::{
    compression_name, photometric_interpretation_name, planar_configuration_name,
    sample_format_name, tag_code_name, tag_type_name, IfdEntry, Image, TagType,
};
use crate::io::RangeReader;

/// Upper bound on the strile list capacity reserved up front.
const PREALLOCATED_STRILES: u64 = 4096;

// =============================================================================
// Report Types
// =============================================================================

/// All images of one file.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    /// Source identifier (path or URL)
    pub source: String,

    pub images: Vec<ImageReport>,
}

/// A numeric code with its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeReport {
    pub code: u16,
    pub name: &'static str,
}

/// Strip or tile organization of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Organization {
    Strip {
        rows_per_strip: u32,
    },
    Tile {
        tile_width: u32,
        tile_height: u32,
        tiles_per_row: u32,
        tiles_per_col: u32,
    },
}

/// Summary of one image directory.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    /// Position in the IFD chain
    pub index: usize,

    /// Absolute offset of the IFD
    pub offset: u64,

    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub planar_configuration: CodeReport,
    pub compression: CodeReport,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photometric_interpretation: Option<CodeReport>,

    /// Raw predictor code (0 = absent)
    pub predictor: u16,

    pub sample_format: CodeReport,
    pub organization: Organization,
    pub strile_count: u64,

    /// Offsets of the first striles (0 where unreadable)
    pub strile_offsets: Vec<u64>,

    /// Byte counts of the first striles (0 where unreadable)
    pub strile_byte_counts: Vec<u64>,

    pub tags: Vec<TagReport>,

    /// Raw next-IFD offset
    pub next_image_offset: u64,
}

/// Summary of one tag entry.
#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    pub code: u16,
    pub name: &'static str,
    pub field_type: u16,
    pub type_name: &'static str,
    pub count: u64,

    /// Offset of the value when stored out of line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_offset: Option<u64>,

    /// Decoded value, when small enough and of a printable type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TagValueReport>,
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValueReport {
    Text(String),
    Unsigned(Vec<u64>),
    Signed(Vec<i64>),
    Float(Vec<f64>),
}

// =============================================================================
// Collection
// =============================================================================

impl ChainReport {
    /// Gather reports for every image of an already walked chain.
    pub async fn collect<R: RangeReader + ?Sized>(
        source: impl Into<String>,
        images: &[Image<R>],
        max_values: u64,
    ) -> Self {
        let mut reports = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            reports.push(ImageReport::collect(index, image, max_values).await);
        }
        ChainReport {
            source: source.into(),
            images: reports,
        }
    }
}

impl ImageReport {
    /// Gather the report for `image`.
    ///
    /// Tag values are decoded only for tags with fewer than `max_values`
    /// elements, and at most `max_values` strile offsets are listed.
    pub async fn collect<R: RangeReader + ?Sized>(
        index: usize,
        image: &Image<R>,
        max_values: u64,
    ) -> Self {
        let organization = if image.is_tiled() {
            Organization::Tile {
                tile_width: image.tile_width(),
                tile_height: image.tile_height(),
                tiles_per_row: image.tiles_per_row(),
                tiles_per_col: image.tiles_per_col(),
            }
        } else {
            Organization::Strip {
                rows_per_strip: image.rows_per_strip(),
            }
        };

        let listed = image.strile_count().min(max_values);
        let reserve = listed.min(PREALLOCATED_STRILES) as usize;
        let mut strile_offsets = Vec::with_capacity(reserve);
        let mut strile_byte_counts = Vec::with_capacity(reserve);
        for i in 0..listed {
            strile_offsets.push(image.strile_offset(i).await.unwrap_or_default());
            strile_byte_counts.push(image.strile_byte_count(i).await.unwrap_or_default());
        }

        let mut tags = Vec::with_capacity(image.tags().len());
        for entry in image.tags() {
            tags.push(TagReport::collect(image, entry, max_values).await);
        }

        let planar = image.planar_configuration().as_u16();
        let compression = image.compression().as_u16();
        let sample_format = image.sample_format().as_u16();

        ImageReport {
            index,
            offset: image.offset(),
            width: image.width(),
            height: image.height(),
            samples_per_pixel: image.samples_per_pixel(),
            bits_per_sample: image.bits_per_sample(),
            planar_configuration: CodeReport {
                code: planar,
                name: planar_configuration_name(planar),
            },
            compression: CodeReport {
                code: compression,
                name: compression_name(compression),
            },
            photometric_interpretation: image.photometric_interpretation().map(|p| CodeReport {
                code: p.as_u16(),
                name: photometric_interpretation_name(p.as_u16()),
            }),
            predictor: image.predictor(),
            sample_format: CodeReport {
                code: sample_format,
                name: sample_format_name(sample_format),
            },
            organization,
            strile_count: image.strile_count(),
            strile_offsets,
            strile_byte_counts,
            tags,
            next_image_offset: image.next_image_offset(),
        }
    }
}

impl TagReport {
    pub async fn collect<R: RangeReader + ?Sized>(
        image: &Image<R>,
        entry: &IfdEntry,
        max_values: u64,
    ) -> Self {
        let value = if entry.count < max_values {
            decode_value(image, entry).await
        } else {
            None
        };

        TagReport {
            code: entry.code,
            name: tag_code_name(entry.code),
            field_type: entry.field_type.as_u16(),
            type_name: tag_type_name(entry.field_type.as_u16()),
            count: entry.count,
            value_offset: entry.value_offset(image.byte_order()),
            value,
        }
    }
}

async fn decode_value<R: RangeReader + ?Sized>(
    image: &Image<R>,
    entry: &IfdEntry,
) -> Option<TagValueReport> {
    let value = match entry.field_type {
        TagType::Ascii => image.read_tag_as_string(entry).await.map(TagValueReport::Text),
        TagType::Byte
        | TagType::Short
        | TagType::Long
        | TagType::Long8
        | TagType::Ifd
        | TagType::Ifd8 => image.read_tag_as_vec(entry).await.map(TagValueReport::Unsigned),
        TagType::SByte | TagType::SShort | TagType::SLong | TagType::SLong8 => {
            image.read_tag_as_vec(entry).await.map(TagValueReport::Signed)
        }
        TagType::Float | TagType::Double | TagType::Rational | TagType::SRational => {
            image.read_tag_as_vec(entry).await.map(TagValueReport::Float)
        }
        TagType::Undefined | TagType::Unknown(_) => return None,
    };
    value.ok()
}

// =============================================================================
// Text Output
// =============================================================================

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

impl fmt::Display for CodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

impl fmt::Display for TagValueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValueReport::Text(text) => write!(f, "\"{}\"", text),
            TagValueReport::Unsigned(values) => write_list(f, values),
            TagValueReport::Signed(values) => write_list(f, values),
            TagValueReport::Float(values) => write_list(f, values),
        }
    }
}

impl TagValueReport {
    fn len(&self) -> usize {
        match self {
            TagValueReport::Text(_) => 1,
            TagValueReport::Unsigned(values) => values.len(),
            TagValueReport::Signed(values) => values.len(),
            TagValueReport::Float(values) => values.len(),
        }
    }
}

impl fmt::Display for TagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  Code={}({}, 0x{:X}), Type={}({}), Count={}",
            self.name, self.code, self.code, self.type_name, self.field_type, self.count
        )?;
        if let Some(offset) = self.value_offset {
            write!(f, ", Offset of value={}", offset)?;
        }
        match &self.value {
            Some(value @ TagValueReport::Text(_)) => write!(f, ", Value={}", value),
            Some(value) => {
                let plural = if value.len() > 1 { "s" } else { "" };
                write!(f, ", Value{}={}", plural, value)
            }
            None => Ok(()),
        }
    }
}

impl fmt::Display for ImageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD {}, at offset {}:", self.index, self.offset)?;
        writeln!(f, "Width: {}", self.width)?;
        writeln!(f, "Height: {}", self.height)?;
        writeln!(f, "SamplesPerPixel: {}", self.samples_per_pixel)?;
        writeln!(f, "BitsPerSample: {}", self.bits_per_sample)?;
        writeln!(f, "PlanarConfiguration: {}", self.planar_configuration)?;
        writeln!(f, "Compression: {}", self.compression)?;
        match &self.photometric_interpretation {
            Some(photometric) => writeln!(f, "PhotometricInterpretation: {}", photometric)?,
            None => writeln!(f, "PhotometricInterpretation: (absent)")?,
        }
        writeln!(f, "Predictor: {}", self.predictor)?;
        writeln!(f, "SampleFormat: {}", self.sample_format)?;

        let (offsets_label, counts_label) = match self.organization {
            Organization::Strip { rows_per_strip } => {
                writeln!(f, "Organization: strip")?;
                writeln!(f, "Number of strips: {}", self.strile_count)?;
                writeln!(f, "RowsPerStrip: {}", rows_per_strip)?;
                ("StripOffsets", "StripByteCounts")
            }
            Organization::Tile {
                tile_width,
                tile_height,
                tiles_per_row,
                tiles_per_col,
            } => {
                writeln!(f, "Organization: tile")?;
                writeln!(f, "Number of tiles: {}", self.strile_count)?;
                writeln!(f, "TileWidth: {}", tile_width)?;
                writeln!(f, "TileHeight: {}", tile_height)?;
                writeln!(f, "TilesPerRow: {}", tiles_per_row)?;
                writeln!(f, "TilesPerCol: {}", tiles_per_col)?;
                ("TileOffsets", "TileByteCounts")
            }
        };
        let truncated = if (self.strile_offsets.len() as u64) < self.strile_count {
            ",..."
        } else {
            ""
        };

        write!(f, "{}: ", offsets_label)?;
        write_list(f, &self.strile_offsets)?;
        writeln!(f, "{}", truncated)?;
        write!(f, "{}: ", counts_label)?;
        write_list(f, &self.strile_byte_counts)?;
        writeln!(f, "{}", truncated)?;

        writeln!(f, "All tags ({}):", self.tags.len())?;
        for tag in &self.tags {
            writeln!(f, "{}", tag)?;
        }
        Ok(())
    }
}

impl fmt::Display for ChainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.source)?;
        for image in &self.images {
            write!(f, "{}", image)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
