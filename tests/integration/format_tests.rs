//! Format-level integration tests.
//!
//! Tests verify:
//! - Classic and BigTIFF files parse in both byte orders
//! - Strip geometry and strile addressing of single-strip files
//! - Tile grid geometry and tile addressing
//! - Planar configuration affects strile counts
//! - Structural errors fail at open
//! - Oversized declared geometry and counts fail per call instead of wrapping

use std::sync::Arc;

use tiffmeta::{
    detect_source, open, ByteOrder, Compression, ImageReport, IoError, MemoryReader,
    PhotometricInterpretation, PlanarConfiguration, SampleFormat, TagCode, TagError, TiffError,
    TiffVariant,
};

use super::test_utils::{
    create_single_strip, create_tiled, is_bigtiff_magic, is_tiff_magic, ByteOrderType,
    IfdBuilder, TiffBuilder, ASCII, BITS_PER_SAMPLE, IMAGE_LENGTH, IMAGE_WIDTH, LONG, LONG8,
    PLANAR_CONFIGURATION, PREDICTOR, SAMPLES_PER_PIXEL, SHORT, TILE_LENGTH, TILE_OFFSETS,
    TILE_WIDTH,
};

fn reader(data: Vec<u8>) -> Arc<MemoryReader> {
    Arc::new(MemoryReader::new(data))
}

const VARIANTS: [(ByteOrderType, bool, u64); 4] = [
    (ByteOrderType::LittleEndian, false, 146),
    (ByteOrderType::BigEndian, false, 146),
    (ByteOrderType::LittleEndian, true, 252),
    (ByteOrderType::BigEndian, true, 252),
];

// =============================================================================
// Header Tests
// =============================================================================

#[tokio::test]
async fn test_header_variants() {
    for (order, bigtiff, _) in VARIANTS {
        let data = create_single_strip(order, bigtiff);
        if bigtiff {
            assert!(is_bigtiff_magic(&data));
        } else {
            assert!(is_tiff_magic(&data));
        }

        let image = open(reader(data)).await.unwrap();
        assert_eq!(image.is_big_tiff(), bigtiff);
        let expected_order = match order {
            ByteOrderType::LittleEndian => ByteOrder::LittleEndian,
            ByteOrderType::BigEndian => ByteOrder::BigEndian,
        };
        assert_eq!(image.byte_order(), expected_order);
        assert_eq!(image.must_byte_swap(), expected_order != ByteOrder::native());
        assert_eq!(image.offset(), if bigtiff { 16 } else { 8 });
    }
}

#[tokio::test]
async fn test_detect_source_variants() {
    let classic = MemoryReader::new(create_single_strip(ByteOrderType::BigEndian, false));
    assert_eq!(
        detect_source(&classic).await.unwrap(),
        Some((ByteOrder::BigEndian, TiffVariant::Classic))
    );

    let big = MemoryReader::new(create_single_strip(ByteOrderType::LittleEndian, true));
    assert_eq!(
        detect_source(&big).await.unwrap(),
        Some((ByteOrder::LittleEndian, TiffVariant::BigTiff))
    );
}

#[tokio::test]
async fn test_open_rejects_non_tiff() {
    let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    let err = open(reader(png)).await.unwrap_err();
    assert!(matches!(err, TiffError::InvalidMagic(_)));
}

#[tokio::test]
async fn test_open_rejects_bad_version() {
    let mut data = create_single_strip(ByteOrderType::LittleEndian, false);
    data[2] = 44;
    let err = open(reader(data)).await.unwrap_err();
    assert!(matches!(err, TiffError::InvalidVersion(44)));
}

#[tokio::test]
async fn test_open_rejects_bad_bigtiff_offset_size() {
    let mut data = create_single_strip(ByteOrderType::LittleEndian, true);
    data[4] = 4;
    let err = open(reader(data)).await.unwrap_err();
    assert!(matches!(err, TiffError::InvalidBigTiffOffsetSize(4)));
}

#[tokio::test]
async fn test_open_rejects_tiny_file() {
    let err = open(reader(b"II*\0".to_vec())).await.unwrap_err();
    assert!(matches!(err, TiffError::FileTooSmall { .. }));
}

#[tokio::test]
async fn test_open_rejects_first_ifd_past_end() {
    let mut data = create_single_strip(ByteOrderType::LittleEndian, false);
    data[4..8].copy_from_slice(&10_000u32.to_le_bytes());
    let err = open(reader(data)).await.unwrap_err();
    assert!(matches!(err, TiffError::InvalidIfdOffset(10_000)));
}

#[tokio::test]
async fn test_open_rejects_truncated_ifd() {
    let data = create_single_strip(ByteOrderType::LittleEndian, false);
    // Cut the file inside the entry table
    let err = open(reader(data[..40].to_vec())).await.unwrap_err();
    assert!(matches!(err, TiffError::IfdTooLarge { offset: 8, .. }));
}

// =============================================================================
// Strip Geometry
// =============================================================================

#[tokio::test]
async fn test_single_strip_geometry() {
    for (order, bigtiff, strip_offset) in VARIANTS {
        let image = open(reader(create_single_strip(order, bigtiff)))
            .await
            .unwrap();

        assert_eq!(image.width(), 1);
        assert_eq!(image.height(), 2);
        assert_eq!(image.samples_per_pixel(), 1);
        assert_eq!(image.bits_per_sample(), 8);
        assert_eq!(image.rows_per_strip(), 2);
        assert_eq!(image.strile_count(), 1);
        assert!(!image.is_tiled());
        assert_eq!(image.compression(), Compression::None);
        assert_eq!(
            image.photometric_interpretation(),
            Some(PhotometricInterpretation::MinIsBlack)
        );
        assert_eq!(image.planar_configuration(), PlanarConfiguration::Contiguous);
        assert_eq!(image.sample_format(), SampleFormat::UnsignedInt);

        assert!(matches!(
            image.tile_coordinate_to_idx(0, 0, 0),
            Err(TagError::NotTiled)
        ));

        assert_eq!(image.strile_offset(0).await.unwrap(), strip_offset);
        assert_eq!(image.strile_byte_count(0).await.unwrap(), 2);
        assert!(matches!(
            image.strile_offset(1).await,
            Err(TagError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }
}

#[tokio::test]
async fn test_strip_data_at_offset() {
    let data = create_single_strip(ByteOrderType::BigEndian, true);
    let image = open(reader(data.clone())).await.unwrap();

    let offset = image.strile_offset(0).await.unwrap() as usize;
    let len = image.strile_byte_count(0).await.unwrap() as usize;
    assert_eq!(&data[offset..offset + len], &[0x10, 0x20]);
}

#[tokio::test]
async fn test_geometry_defaults() {
    let mut ifd = IfdBuilder::new();
    ifd.add_entry(IMAGE_WIDTH, SHORT, &[10])
        .add_entry(IMAGE_LENGTH, SHORT, &[7]);
    let image = open(reader(TiffBuilder::new().add_ifd(ifd).build()))
        .await
        .unwrap();

    assert_eq!(image.samples_per_pixel(), 1);
    assert_eq!(image.bits_per_sample(), 1);
    assert_eq!(image.compression(), Compression::None);
    assert_eq!(image.photometric_interpretation(), None);
    assert_eq!(image.planar_configuration(), PlanarConfiguration::Contiguous);
    assert_eq!(image.sample_format(), SampleFormat::UnsignedInt);
    // Absent predictor reads as 0
    assert_eq!(image.predictor(), 0);
    assert_eq!(image.explicit_predictor(), None);
    // RowsPerStrip defaults to the image height
    assert_eq!(image.rows_per_strip(), 7);
    assert_eq!(image.strile_count(), 1);

    // No StripOffsets tag at all
    assert!(matches!(
        image.strile_offset(0).await,
        Err(TagError::MissingTag(TagCode::StripOffsets))
    ));
}

#[tokio::test]
async fn test_missing_dimensions_read_as_zero() {
    let mut ifd = IfdBuilder::new();
    ifd.add_entry(BITS_PER_SAMPLE, SHORT, &[16]);
    let image = open(reader(TiffBuilder::new().add_ifd(ifd).build()))
        .await
        .unwrap();

    assert_eq!(image.width(), 0);
    assert_eq!(image.height(), 0);
    assert_eq!(image.bits_per_sample(), 16);
    assert_eq!(image.strile_count(), 0);
}

#[tokio::test]
async fn test_explicit_predictor() {
    let mut ifd = IfdBuilder::single_strip();
    ifd.add_entry(PREDICTOR, SHORT, &[2]);
    let image = open(reader(TiffBuilder::new().add_ifd(ifd).build()))
        .await
        .unwrap();

    assert_eq!(image.predictor(), 2);
    assert!(image.explicit_predictor().is_some());
}

#[tokio::test]
async fn test_unreadable_geometry_tag_is_absent() {
    // ImageWidth declared as ASCII cannot be read as an integer
    let mut ifd = IfdBuilder::new();
    ifd.add_raw(IMAGE_WIDTH, ASCII, 2, b"9\0")
        .add_entry(IMAGE_LENGTH, LONG, &[4]);
    let image = open(reader(TiffBuilder::new().add_ifd(ifd).build()))
        .await
        .unwrap();

    assert_eq!(image.width(), 0);
    assert_eq!(image.height(), 4);
}

// =============================================================================
// Planar Configuration
// =============================================================================

#[tokio::test]
async fn test_planar_configuration_strile_counts() {
    let contiguous = open(reader(
        TiffBuilder::new()
            .add_ifd(IfdBuilder::rgb_strips(1, 2))
            .build(),
    ))
    .await
    .unwrap();
    let separate = open(reader(
        TiffBuilder::new()
            .with_byte_order(ByteOrderType::BigEndian)
            .add_ifd(IfdBuilder::rgb_strips(2, 2))
            .build(),
    ))
    .await
    .unwrap();

    assert_eq!(contiguous.samples_per_pixel(), 3);
    assert_eq!(separate.samples_per_pixel(), 3);
    assert_eq!(
        contiguous.planar_configuration(),
        PlanarConfiguration::Contiguous
    );
    assert_eq!(separate.planar_configuration(), PlanarConfiguration::Separate);
    assert_eq!(
        contiguous.photometric_interpretation(),
        Some(PhotometricInterpretation::Rgb)
    );

    assert_eq!(contiguous.strile_count(), 2);
    assert_eq!(separate.strile_count(), 6);
    assert_eq!(
        separate.strile_count(),
        contiguous.strile_count() * separate.samples_per_pixel() as u64
    );

    // Plane 2 strips follow plane 0 and 1
    let last = separate.strile_offset(5).await.unwrap();
    let first = separate.strile_offset(0).await.unwrap();
    assert_eq!(last - first, 5 * 8);
    assert_eq!(separate.strile_byte_count(5).await.unwrap(), 8);
}

// =============================================================================
// Tile Geometry
// =============================================================================

#[tokio::test]
async fn test_tile_grid() {
    for order in [ByteOrderType::LittleEndian, ByteOrderType::BigEndian] {
        let image = open(reader(create_tiled(order))).await.unwrap();

        assert!(image.is_tiled());
        assert_eq!(image.width(), 33);
        assert_eq!(image.height(), 46);
        assert_eq!(image.tile_width(), 32);
        assert_eq!(image.tile_height(), 16);
        assert_eq!(image.tiles_per_row(), 2);
        assert_eq!(image.tiles_per_col(), 3);
        assert_eq!(image.strile_count(), 6);
    }
}

#[tokio::test]
async fn test_tile_offsets() {
    let image = open(reader(create_tiled(ByteOrderType::LittleEndian)))
        .await
        .unwrap();

    let expected = [194, 706, 1218, 1730, 2242, 2754];
    let mut previous = 0;
    for y in 0..3 {
        for x in 0..2 {
            let offset = image.tile_offset(x, y, 0).await.unwrap();
            assert!(offset > previous, "tile offsets must increase");
            assert_eq!(offset, expected[(y * 2 + x) as usize]);
            assert_eq!(image.tile_byte_count(x, y, 0).await.unwrap(), 512);
            previous = offset;
        }
    }

    assert!(matches!(
        image.tile_offset(2, 0, 0).await,
        Err(TagError::TileOutOfRange { x: 2, y: 0, sample: 0 })
    ));
    assert!(matches!(
        image.tile_offset(0, 3, 0).await,
        Err(TagError::TileOutOfRange { .. })
    ));
    // Contiguous images have a single plane
    assert!(matches!(
        image.tile_offset(0, 0, 1).await,
        Err(TagError::TileOutOfRange { .. })
    ));
}

#[tokio::test]
async fn test_tile_offsets_vector_matches_locator() {
    let image = open(reader(create_tiled(ByteOrderType::BigEndian)))
        .await
        .unwrap();

    let entry = image.tag(TagCode::TileOffsets).unwrap();
    let offsets = image.read_tag_as_vec::<u64>(entry).await.unwrap();
    assert_eq!(
        offsets.len() as u32,
        image.tiles_per_row() * image.tiles_per_col()
    );

    for y in 0..image.tiles_per_col() {
        for x in 0..image.tiles_per_row() {
            let index = (y * image.tiles_per_row() + x) as usize;
            assert_eq!(image.tile_offset(x, y, 0).await.unwrap(), offsets[index]);
        }
    }

    // Byte counts are stored as SHORT and widen to u64
    let entry = image.tag(TagCode::TileByteCounts).unwrap();
    let counts = image.read_tag_as_vec::<u64>(entry).await.unwrap();
    assert_eq!(counts, vec![512; 6]);
}

#[tokio::test]
async fn test_tile_width_without_length() {
    let mut ifd = IfdBuilder::new();
    ifd.add_entry(IMAGE_WIDTH, LONG, &[100])
        .add_entry(IMAGE_LENGTH, LONG, &[100])
        .add_entry(TILE_WIDTH, LONG, &[16]);
    let image = open(reader(TiffBuilder::new().add_ifd(ifd).build()))
        .await
        .unwrap();

    assert!(image.is_tiled());
    assert_eq!(image.tiles_per_row(), 7);
    assert_eq!(image.tile_height(), 0);
    assert_eq!(image.tiles_per_col(), 0);
    assert_eq!(image.strile_count(), 0);
    assert!(matches!(
        image.tile_coordinate_to_idx(0, 0, 0),
        Err(TagError::TileOutOfRange { .. })
    ));
}

// =============================================================================
// Oversized Geometry
// =============================================================================

/// A 0xFFFFFFFF x 0xFFFFFFFF image cut into 1x1 tiles.
fn huge_tile_grid() -> IfdBuilder {
    let mut ifd = IfdBuilder::new();
    ifd.add_entry(IMAGE_WIDTH, LONG, &[u32::MAX as u64])
        .add_entry(IMAGE_LENGTH, LONG, &[u32::MAX as u64])
        .add_entry(TILE_WIDTH, LONG, &[1])
        .add_entry(TILE_LENGTH, LONG, &[1]);
    ifd
}

#[tokio::test]
async fn test_strile_count_saturates() {
    // Three separate planes of (2^32 - 1)^2 tiles do not fit in u64
    let mut ifd = huge_tile_grid();
    ifd.add_entry(SAMPLES_PER_PIXEL, SHORT, &[3])
        .add_entry(PLANAR_CONFIGURATION, SHORT, &[2]);
    let image = open(reader(TiffBuilder::new().add_ifd(ifd).build()))
        .await
        .unwrap();

    assert_eq!(image.tiles_per_row(), u32::MAX);
    assert_eq!(image.tiles_per_col(), u32::MAX);
    assert_eq!(image.strile_count(), u64::MAX);

    let last = u32::MAX - 1;
    let per_plane = u32::MAX as u64 * u32::MAX as u64;
    assert_eq!(
        image.tile_coordinate_to_idx(last, last, 0).unwrap(),
        per_plane - 1
    );
    assert_eq!(image.tile_coordinate_to_idx(0, 0, 1).unwrap(), per_plane);
    // The third plane starts past u64::MAX
    assert!(matches!(
        image.tile_coordinate_to_idx(0, 0, 2),
        Err(TagError::TileOutOfRange { x: 0, y: 0, sample: 2 })
    ));
    assert!(matches!(
        image.strile_offset(1 << 63).await,
        Err(TagError::MissingTag(TagCode::TileOffsets))
    ));

    let report = ImageReport::collect(0, &image, 4).await;
    assert_eq!(report.strile_count, u64::MAX);
    assert_eq!(report.strile_offsets, vec![0; 4]);
}

#[tokio::test]
async fn test_huge_offset_array_index() {
    // TileOffsets declares u64::MAX LONG8 elements but holds two
    let mut payload = 7u64.to_le_bytes().to_vec();
    payload.extend_from_slice(&9u64.to_le_bytes());
    let mut ifd = huge_tile_grid();
    ifd.add_raw(TILE_OFFSETS, LONG8, u64::MAX, &payload);
    let data = TiffBuilder::new()
        .with_byte_order(ByteOrderType::LittleEndian)
        .with_bigtiff(true)
        .add_ifd(ifd)
        .build();
    let image = open(reader(data)).await.unwrap();

    assert_eq!(image.strile_count(), u32::MAX as u64 * u32::MAX as u64);
    assert_eq!(image.strile_offset(0).await.unwrap(), 7);
    assert_eq!(image.strile_offset(1).await.unwrap(), 9);
    assert!(matches!(
        image.strile_offset(1 << 62).await,
        Err(TagError::CountOverflow { count: u64::MAX })
    ));
    assert!(matches!(
        image.strile_offset(1 << 40).await,
        Err(TagError::Io(IoError::RangeOutOfBounds { .. }))
    ));

    let report = ImageReport::collect(0, &image, 4).await;
    assert_eq!(report.strile_offsets, vec![7, 9, 0, 0]);
}
