//! Decoded images and the IFD chain.
//!
//! An [`Image`] is one decoded directory plus the shared byte source it came
//! from. Geometry is derived from the directory's tags once, when the image
//! is built; strile offsets and any other tag value are read on demand.
//!
//! # Strile addressing
//!
//! Strip images address `ceil(height / rows_per_strip)` strips per plane,
//! tiled images `tiles_per_row * tiles_per_col` tiles per plane. With a
//! separate planar configuration there is one plane per sample.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{TagError, TiffError};
use crate::io::RangeReader;

use super::ifd::{Ifd, IfdEntry};
use super::parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::tags::{
    Compression, PhotometricInterpretation, PlanarConfiguration, Predictor, SampleFormat, TagCode,
};
use super::values::{TagValue, ValueReader};

// =============================================================================
// Layout
// =============================================================================

/// Geometry tags of one directory, with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    bits_per_sample: u16,
    compression: Compression,
    photometric: Option<PhotometricInterpretation>,
    planar_configuration: PlanarConfiguration,
    predictor: Option<u16>,
    sample_format: SampleFormat,
    rows_per_strip: u32,
    tile_width: Option<u32>,
    tile_height: u32,
}

impl Layout {
    async fn decode<R: RangeReader + ?Sized>(values: &ValueReader<'_, R>, ifd: &Ifd) -> Self {
        let width = first_value(values, ifd, TagCode::ImageWidth).await;
        let height = first_value(values, ifd, TagCode::ImageLength).await;
        let code = |value: Option<u64>| value.and_then(|v| u16::try_from(v).ok());

        let width = width.and_then(|v| u32::try_from(v).ok()).unwrap_or(0);
        let height = height.and_then(|v| u32::try_from(v).ok()).unwrap_or(0);

        let rows_per_strip = first_value(values, ifd, TagCode::RowsPerStrip)
            .await
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(height);

        Layout {
            width,
            height,
            samples_per_pixel: code(first_value(values, ifd, TagCode::SamplesPerPixel).await)
                .unwrap_or(1),
            bits_per_sample: code(first_value(values, ifd, TagCode::BitsPerSample).await)
                .unwrap_or(1),
            compression: code(first_value(values, ifd, TagCode::Compression).await)
                .map_or(Compression::None, Compression::from_u16),
            photometric: code(first_value(values, ifd, TagCode::PhotometricInterpretation).await)
                .map(PhotometricInterpretation::from_u16),
            planar_configuration: code(
                first_value(values, ifd, TagCode::PlanarConfiguration).await,
            )
            .map_or(PlanarConfiguration::Contiguous, PlanarConfiguration::from_u16),
            predictor: code(first_value(values, ifd, TagCode::Predictor).await),
            sample_format: code(first_value(values, ifd, TagCode::SampleFormat).await)
                .map_or(SampleFormat::UnsignedInt, SampleFormat::from_u16),
            rows_per_strip,
            tile_width: first_value(values, ifd, TagCode::TileWidth)
                .await
                .map(|v| u32::try_from(v).unwrap_or(0)),
            tile_height: first_value(values, ifd, TagCode::TileLength)
                .await
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0),
        }
    }
}

/// First element of an unsigned integer tag.
///
/// A tag that is present but unreadable counts as absent.
async fn first_value<R: RangeReader + ?Sized>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
    tag: TagCode,
) -> Option<u64> {
    let entry = ifd.get_entry(tag)?;
    match values.read_at::<u64>(entry, 0).await {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(tag = %tag, error = %err, "Ignoring unreadable geometry tag");
            None
        }
    }
}

// =============================================================================
// Chain history
// =============================================================================

/// Offsets of the directories decoded so far along one chain, newest first.
///
/// Each image holds the link for its own offset, and links are shared with
/// the images before it, so a chain of n images keeps n links in total.
#[derive(Debug)]
struct ChainLink {
    offset: u64,
    prev: Option<Arc<ChainLink>>,
}

impl ChainLink {
    fn contains(&self, offset: u64) -> bool {
        let mut link = Some(self);
        while let Some(current) = link {
            if current.offset == offset {
                return true;
            }
            link = current.prev.as_deref();
        }
        false
    }
}

impl Drop for ChainLink {
    // Unlink iteratively; the default recursive drop can overflow the stack
    // on very long chains.
    fn drop(&mut self) {
        let mut prev = self.prev.take();
        while let Some(link) = prev {
            match Arc::try_unwrap(link) {
                Ok(mut link) => prev = link.prev.take(),
                Err(_) => break,
            }
        }
    }
}

// =============================================================================
// Image
// =============================================================================

/// One decoded image directory of a TIFF file.
///
/// Immutable once built. Every image produced from the same file shares the
/// byte source through an `Arc`; [`Image::next`] follows the IFD chain.
pub struct Image<R: RangeReader + ?Sized> {
    reader: Arc<R>,
    header: TiffHeader,
    ifd: Ifd,
    layout: Layout,
    /// This directory's offset, linked to the ones before it in the chain
    history: Arc<ChainLink>,
}

impl<R: RangeReader + ?Sized> Clone for Image<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            header: self.header,
            ifd: self.ifd.clone(),
            layout: self.layout,
            history: Arc::clone(&self.history),
        }
    }
}

impl<R: RangeReader + ?Sized> fmt::Debug for Image<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("source", &self.reader.identifier())
            .field("offset", &self.ifd.offset)
            .field("bigtiff", &self.header.is_bigtiff)
            .field("entries", &self.ifd.entries.len())
            .field("next_image_offset", &self.ifd.next_ifd_offset)
            .finish()
    }
}

impl<R: RangeReader + ?Sized> Image<R> {
    /// Parse the header and decode the first directory.
    ///
    /// # Errors
    /// Any structural problem with the header or the first IFD. Problems
    /// with individual tag values do not fail here.
    pub async fn open(reader: Arc<R>) -> Result<Self, TiffError> {
        let size = reader.size();
        if size < TIFF_HEADER_SIZE as u64 {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: size,
            });
        }

        let header_len = size.min(BIGTIFF_HEADER_SIZE as u64) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, size)?;

        debug!(
            source = reader.identifier(),
            bigtiff = header.is_bigtiff,
            byte_order = ?header.byte_order,
            first_ifd = header.first_ifd_offset,
            "Opened TIFF"
        );

        let offset = header.first_ifd_offset;
        Self::decode(reader, header, offset, None).await
    }

    async fn decode(
        reader: Arc<R>,
        header: TiffHeader,
        offset: u64,
        prev: Option<Arc<ChainLink>>,
    ) -> Result<Self, TiffError> {
        let ifd = Ifd::read(&*reader, &header, offset).await?;
        let layout = Layout::decode(&ValueReader::new(&*reader, &header), &ifd).await;

        debug!(
            offset,
            width = layout.width,
            height = layout.height,
            tiled = layout.tile_width.is_some(),
            "Decoded image"
        );

        Ok(Image {
            reader,
            header,
            ifd,
            layout,
            history: Arc::new(ChainLink { offset, prev }),
        })
    }

    fn values(&self) -> ValueReader<'_, R> {
        ValueReader::new(&*self.reader, &self.header)
    }

    // -------------------------------------------------------------------------
    // Directory
    // -------------------------------------------------------------------------

    /// The shared byte source.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// Absolute offset of this directory.
    pub fn offset(&self) -> u64 {
        self.ifd.offset
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    pub fn is_big_tiff(&self) -> bool {
        self.header.is_bigtiff
    }

    /// Whether the file's byte order differs from the host's.
    pub fn must_byte_swap(&self) -> bool {
        self.header.byte_order.must_swap()
    }

    /// Raw next-IFD offset as stored in the directory (0 = last).
    ///
    /// Reported as-is even when it points back into the chain.
    pub fn next_image_offset(&self) -> u64 {
        self.ifd.next_ifd_offset
    }

    /// All entries in file order.
    pub fn tags(&self) -> &[IfdEntry] {
        &self.ifd.entries
    }

    /// First entry with the given tag.
    pub fn tag(&self, tag: TagCode) -> Option<&IfdEntry> {
        self.ifd.get_entry(tag)
    }

    /// First entry with the given raw tag code.
    pub fn tag_by_id(&self, code: u16) -> Option<&IfdEntry> {
        self.ifd.get_entry_by_id(code)
    }

    // -------------------------------------------------------------------------
    // Tag values
    // -------------------------------------------------------------------------

    /// Read every element of `entry` as `T`.
    ///
    /// See [`ValueReader`](super::ValueReader) for the allowed conversions.
    pub async fn read_tag_as_vec<T: TagValue>(&self, entry: &IfdEntry) -> Result<Vec<T>, TagError> {
        self.values().read_vec(entry).await
    }

    /// Read an ASCII entry, without its trailing NUL.
    pub async fn read_tag_as_string(&self, entry: &IfdEntry) -> Result<String, TagError> {
        self.values().read_string(entry).await
    }

    /// Read the raw value bytes of an entry of any known type.
    pub async fn read_tag_as_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TagError> {
        self.values().read_raw_bytes(entry).await
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Width in pixels, 0 if the tag is absent.
    pub fn width(&self) -> u32 {
        self.layout.width
    }

    /// Height in pixels, 0 if the tag is absent.
    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.layout.samples_per_pixel
    }

    /// Bits of the first sample.
    pub fn bits_per_sample(&self) -> u16 {
        self.layout.bits_per_sample
    }

    pub fn compression(&self) -> Compression {
        self.layout.compression
    }

    /// `None` when the tag is absent; there is no default.
    pub fn photometric_interpretation(&self) -> Option<PhotometricInterpretation> {
        self.layout.photometric
    }

    pub fn planar_configuration(&self) -> PlanarConfiguration {
        self.layout.planar_configuration
    }

    /// Raw predictor code, 0 when the tag is absent.
    ///
    /// 0 is not a valid predictor, so absence stays distinguishable from an
    /// explicit `Predictor::None` (1).
    pub fn predictor(&self) -> u16 {
        self.layout.predictor.unwrap_or(0)
    }

    /// The predictor, if the directory declares one.
    pub fn explicit_predictor(&self) -> Option<Predictor> {
        self.layout.predictor.map(Predictor::from_u16)
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.layout.sample_format
    }

    /// Whether the image is organized in tiles (a TileWidth tag is present).
    pub fn is_tiled(&self) -> bool {
        self.layout.tile_width.is_some()
    }

    /// Rows per strip, defaulting to the image height.
    pub fn rows_per_strip(&self) -> u32 {
        self.layout.rows_per_strip
    }

    /// Tile width, 0 for strip images.
    pub fn tile_width(&self) -> u32 {
        self.layout.tile_width.unwrap_or(0)
    }

    /// Tile height, 0 for strip images.
    pub fn tile_height(&self) -> u32 {
        self.layout.tile_height
    }

    /// Number of tile columns, 0 for strip images.
    pub fn tiles_per_row(&self) -> u32 {
        match self.tile_width() {
            0 => 0,
            tile_width => self.width().div_ceil(tile_width),
        }
    }

    /// Number of tile rows, 0 for strip images.
    pub fn tiles_per_col(&self) -> u32 {
        match (self.is_tiled(), self.tile_height()) {
            (false, _) | (true, 0) => 0,
            (true, tile_height) => self.height().div_ceil(tile_height),
        }
    }

    fn planes(&self) -> u64 {
        match self.planar_configuration() {
            PlanarConfiguration::Separate => self.samples_per_pixel() as u64,
            _ => 1,
        }
    }

    /// Number of strips or tiles across all planes.
    ///
    /// Saturates at `u64::MAX` when the declared geometry is too large to
    /// count.
    pub fn strile_count(&self) -> u64 {
        let per_plane = if self.is_tiled() {
            self.tiles_per_row() as u64 * self.tiles_per_col() as u64
        } else {
            match self.rows_per_strip() {
                0 => 0,
                rows => self.height().div_ceil(rows) as u64,
            }
        };
        per_plane.saturating_mul(self.planes())
    }

    /// Strile index of the tile at column `x`, row `y` of plane `sample`.
    ///
    /// # Errors
    /// `NotTiled` for strip images, `TileOutOfRange` for coordinates outside
    /// the grid or a sample beyond the plane count.
    pub fn tile_coordinate_to_idx(&self, x: u32, y: u32, sample: u32) -> Result<u64, TagError> {
        if !self.is_tiled() {
            return Err(TagError::NotTiled);
        }
        let tiles_per_row = self.tiles_per_row() as u64;
        let tiles_per_col = self.tiles_per_col() as u64;
        if x as u64 >= tiles_per_row || y as u64 >= tiles_per_col || sample as u64 >= self.planes()
        {
            return Err(TagError::TileOutOfRange { x, y, sample });
        }
        (sample as u64)
            .checked_mul(tiles_per_row * tiles_per_col)
            .and_then(|plane_start| plane_start.checked_add(y as u64 * tiles_per_row + x as u64))
            .ok_or(TagError::TileOutOfRange { x, y, sample })
    }

    // -------------------------------------------------------------------------
    // Strile locator
    // -------------------------------------------------------------------------

    /// Absolute offset of strile `index`.
    pub async fn strile_offset(&self, index: u64) -> Result<u64, TagError> {
        let tag = if self.is_tiled() {
            TagCode::TileOffsets
        } else {
            TagCode::StripOffsets
        };
        self.strile_value(tag, index).await
    }

    /// Compressed byte count of strile `index`.
    pub async fn strile_byte_count(&self, index: u64) -> Result<u64, TagError> {
        let tag = if self.is_tiled() {
            TagCode::TileByteCounts
        } else {
            TagCode::StripByteCounts
        };
        self.strile_value(tag, index).await
    }

    /// Absolute offset of the tile at (`x`, `y`) in plane `sample`.
    pub async fn tile_offset(&self, x: u32, y: u32, sample: u32) -> Result<u64, TagError> {
        let index = self.tile_coordinate_to_idx(x, y, sample)?;
        self.strile_offset(index).await
    }

    /// Compressed byte count of the tile at (`x`, `y`) in plane `sample`.
    pub async fn tile_byte_count(&self, x: u32, y: u32, sample: u32) -> Result<u64, TagError> {
        let index = self.tile_coordinate_to_idx(x, y, sample)?;
        self.strile_byte_count(index).await
    }

    async fn strile_value(&self, tag: TagCode, index: u64) -> Result<u64, TagError> {
        let count = self.strile_count();
        if index >= count {
            return Err(TagError::IndexOutOfRange { index, len: count });
        }
        let entry = self.tag(tag).ok_or(TagError::MissingTag(tag))?;
        self.values().read_at::<u64>(entry, index).await
    }

    // -------------------------------------------------------------------------
    // Chain
    // -------------------------------------------------------------------------

    /// Decode the next image of the chain.
    ///
    /// Returns `Ok(None)` at the end of the chain, and also when the next
    /// offset points back at a directory already visited from the first
    /// image, so cyclic files terminate.
    pub async fn next(&self) -> Result<Option<Self>, TiffError> {
        let offset = self.next_image_offset();
        if offset == 0 {
            return Ok(None);
        }
        if self.history.contains(offset) {
            warn!(
                source = self.reader.identifier(),
                from = self.offset(),
                to = offset,
                "IFD chain loops back to a visited directory, stopping"
            );
            return Ok(None);
        }

        let image = Self::decode(
            Arc::clone(&self.reader),
            self.header,
            offset,
            Some(Arc::clone(&self.history)),
        )
        .await?;
        Ok(Some(image))
    }

    /// This image followed by the rest of the chain, at most `limit` images.
    pub async fn collect_chain(self, limit: usize) -> Result<Vec<Self>, TiffError> {
        let mut images = Vec::new();
        let mut current = Some(self);

        while let Some(image) = current {
            if images.len() == limit {
                warn!(limit, "IFD chain limit reached, ignoring remaining directories");
                break;
            }
            current = image.next().await?;
            images.push(image);
        }

        Ok(images)
    }
}

/// Parse the header of `reader` and decode its first image.
pub async fn open<R: RangeReader + ?Sized>(reader: Arc<R>) -> Result<Image<R>, TiffError> {
    Image::open(reader).await
}

// =============================================================================
// Tests
// =============================================================================
