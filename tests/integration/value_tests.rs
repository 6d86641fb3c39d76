//! Tag value decoding tests.
//!
//! Tests verify:
//! - ASCII values drop exactly one trailing NUL
//! - Numeric values widen but never narrow
//! - Rationals convert to floating point
//! - Inline and out-of-line values decode alike in both byte orders
//! - Broken values fail per call without affecting the image

use std::sync::Arc;

use tiffmeta::{open, Image, MemoryReader, TagCode, TagError, TagType};

use super::test_utils::{
    create_with_description, ByteOrderType, IfdBuilder, TiffBuilder, ASCII, BYTE, DOUBLE,
    IMAGE_DESCRIPTION, LONG, LONG8, RATIONAL, SHORT, SSHORT, UNDEFINED, X_RESOLUTION,
};

const CUSTOM_TAG: u16 = 65000;

async fn open_ifd(order: ByteOrderType, bigtiff: bool, ifd: IfdBuilder) -> Image<MemoryReader> {
    let data = TiffBuilder::new()
        .with_byte_order(order)
        .with_bigtiff(bigtiff)
        .add_ifd(ifd)
        .build();
    open(Arc::new(MemoryReader::new(data))).await.unwrap()
}

fn with_entry(build: impl FnOnce(&mut IfdBuilder)) -> IfdBuilder {
    let mut ifd = IfdBuilder::single_strip();
    build(&mut ifd);
    ifd
}

// =============================================================================
// Strings
// =============================================================================

#[tokio::test]
async fn test_image_description() {
    for text in ["image_description", "a"] {
        let data = create_with_description(text);
        let image = open(Arc::new(MemoryReader::new(data))).await.unwrap();

        let entry = image.tag(TagCode::ImageDescription).unwrap();
        assert_eq!(entry.count, text.len() as u64 + 1);
        let value = image.read_tag_as_string(entry).await.unwrap();
        assert_eq!(value, text);
        assert_eq!(value.len() as u64, entry.count - 1);
    }
}

#[tokio::test]
async fn test_string_keeps_second_nul() {
    let ifd = with_entry(|ifd| {
        ifd.add_raw(IMAGE_DESCRIPTION, ASCII, 6, b"ab\0\0\0\0");
    });
    let image = open_ifd(ByteOrderType::BigEndian, false, ifd).await;

    let entry = image.tag(TagCode::ImageDescription).unwrap();
    assert_eq!(image.read_tag_as_string(entry).await.unwrap(), "ab\0\0\0");
}

#[tokio::test]
async fn test_string_from_numeric_tag() {
    let image = open_ifd(ByteOrderType::LittleEndian, false, IfdBuilder::single_strip()).await;

    let entry = image.tag(TagCode::ImageWidth).unwrap();
    assert!(matches!(
        image.read_tag_as_string(entry).await,
        Err(TagError::TypeMismatch {
            declared: TagType::Long,
            requested: "string"
        })
    ));
}

// =============================================================================
// Numeric Widening
// =============================================================================

#[tokio::test]
async fn test_widening_in_both_orders() {
    for (order, bigtiff) in [
        (ByteOrderType::LittleEndian, false),
        (ByteOrderType::BigEndian, false),
        (ByteOrderType::LittleEndian, true),
        (ByteOrderType::BigEndian, true),
    ] {
        let ifd = with_entry(|ifd| {
            ifd.add_entry(CUSTOM_TAG, SHORT, &[1, 300, 65535, 7]);
        });
        let image = open_ifd(order, bigtiff, ifd).await;
        let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

        assert_eq!(
            image.read_tag_as_vec::<u16>(entry).await.unwrap(),
            vec![1, 300, 65535, 7]
        );
        assert_eq!(
            image.read_tag_as_vec::<u32>(entry).await.unwrap(),
            vec![1, 300, 65535, 7]
        );
        assert_eq!(
            image.read_tag_as_vec::<u64>(entry).await.unwrap(),
            vec![1, 300, 65535, 7]
        );
        assert!(matches!(
            image.read_tag_as_vec::<u8>(entry).await,
            Err(TagError::TypeMismatch { .. })
        ));
    }
}

#[tokio::test]
async fn test_no_narrowing_from_long8() {
    let ifd = with_entry(|ifd| {
        ifd.add_entry(CUSTOM_TAG, LONG8, &[1 << 40]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, true, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert_eq!(image.read_tag_as_vec::<u64>(entry).await.unwrap(), vec![1 << 40]);
    assert!(matches!(
        image.read_tag_as_vec::<u32>(entry).await,
        Err(TagError::TypeMismatch {
            declared: TagType::Long8,
            ..
        })
    ));
}

#[tokio::test]
async fn test_signed_values() {
    let ifd = with_entry(|ifd| {
        ifd.add_signed(CUSTOM_TAG, SSHORT, &[-5, 12, -32768]);
    });
    let image = open_ifd(ByteOrderType::BigEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert_eq!(
        image.read_tag_as_vec::<i32>(entry).await.unwrap(),
        vec![-5, 12, -32768]
    );
    assert_eq!(
        image.read_tag_as_vec::<i64>(entry).await.unwrap(),
        vec![-5, 12, -32768]
    );
    // Signed values never read as unsigned
    assert!(matches!(
        image.read_tag_as_vec::<u32>(entry).await,
        Err(TagError::TypeMismatch { .. })
    ));
}

#[tokio::test]
async fn test_unsigned_bytes_not_signed() {
    let ifd = with_entry(|ifd| {
        ifd.add_entry(CUSTOM_TAG, BYTE, &[200]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert_eq!(image.read_tag_as_vec::<u8>(entry).await.unwrap(), vec![200]);
    assert!(matches!(
        image.read_tag_as_vec::<i16>(entry).await,
        Err(TagError::TypeMismatch { .. })
    ));
}

// =============================================================================
// Floating Point
// =============================================================================

#[tokio::test]
async fn test_rational_as_float() {
    let ifd = with_entry(|ifd| {
        ifd.add_rationals(X_RESOLUTION, RATIONAL, &[(300, 1), (1, 4)]);
    });
    let image = open_ifd(ByteOrderType::BigEndian, true, ifd).await;
    let entry = image.tag(TagCode::XResolution).unwrap();

    assert_eq!(
        image.read_tag_as_vec::<f64>(entry).await.unwrap(),
        vec![300.0, 0.25]
    );
    assert_eq!(
        image.read_tag_as_vec::<f32>(entry).await.unwrap(),
        vec![300.0f32, 0.25]
    );
    assert!(matches!(
        image.read_tag_as_vec::<u32>(entry).await,
        Err(TagError::TypeMismatch { .. })
    ));
}

#[tokio::test]
async fn test_rational_zero_denominator() {
    let ifd = with_entry(|ifd| {
        ifd.add_rationals(X_RESOLUTION, RATIONAL, &[(72, 1), (5, 0)]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, false, ifd).await;
    let entry = image.tag(TagCode::XResolution).unwrap();

    assert!(matches!(
        image.read_tag_as_vec::<f64>(entry).await,
        Err(TagError::ZeroDenominator { index: 1 })
    ));
}

#[tokio::test]
async fn test_doubles() {
    let ifd = with_entry(|ifd| {
        ifd.add_doubles(CUSTOM_TAG, &[0.5, -1024.125]);
    });
    let image = open_ifd(ByteOrderType::BigEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert_eq!(entry.field_type, TagType::from_u16(DOUBLE));
    assert_eq!(
        image.read_tag_as_vec::<f64>(entry).await.unwrap(),
        vec![0.5, -1024.125]
    );
    // Doubles do not fit in f32 without loss
    assert!(matches!(
        image.read_tag_as_vec::<f32>(entry).await,
        Err(TagError::TypeMismatch { .. })
    ));
}

// =============================================================================
// Raw Bytes
// =============================================================================

#[tokio::test]
async fn test_undefined_bytes() {
    let payload = [0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0x00];
    let ifd = with_entry(|ifd| {
        ifd.add_raw(CUSTOM_TAG, UNDEFINED, payload.len() as u64, &payload);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert_eq!(&image.read_tag_as_bytes(entry).await.unwrap()[..], &payload);
    assert!(matches!(
        image.read_tag_as_vec::<u8>(entry).await,
        Err(TagError::TypeMismatch { .. })
    ));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_zero_count() {
    let ifd = with_entry(|ifd| {
        ifd.add_raw(CUSTOM_TAG, LONG, 0, &[]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert!(matches!(
        image.read_tag_as_vec::<u32>(entry).await,
        Err(TagError::EmptyValue)
    ));
}

#[tokio::test]
async fn test_unknown_type() {
    let ifd = with_entry(|ifd| {
        ifd.add_raw(CUSTOM_TAG, 99, 1, &[1, 2, 3, 4]);
    });
    let image = open_ifd(ByteOrderType::BigEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert_eq!(entry.field_type, TagType::Unknown(99));
    assert!(matches!(
        image.read_tag_as_bytes(entry).await,
        Err(TagError::UnknownType(99))
    ));
    // The rest of the directory is unaffected
    assert_eq!(image.width(), 1);
}

#[tokio::test]
async fn test_count_overflow() {
    let ifd = with_entry(|ifd| {
        ifd.add_raw(CUSTOM_TAG, LONG8, u64::MAX, &[]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, true, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert!(matches!(
        image.read_tag_as_vec::<u64>(entry).await,
        Err(TagError::CountOverflow { count: u64::MAX })
    ));
}

#[tokio::test]
async fn test_value_past_end_of_file() {
    // Declares 1000 LONGs but only 8 bytes follow the table
    let ifd = with_entry(|ifd| {
        ifd.add_raw(CUSTOM_TAG, LONG, 1000, &[0; 8]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, false, ifd).await;
    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();

    assert!(matches!(
        image.read_tag_as_vec::<u32>(entry).await,
        Err(TagError::Io(_))
    ));
    // Failures are local to the call
    assert_eq!(image.height(), 2);
    assert_eq!(image.strile_byte_count(0).await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_tag_uses_first() {
    let ifd = with_entry(|ifd| {
        ifd.add_entry(CUSTOM_TAG, SHORT, &[1]);
        ifd.add_entry(CUSTOM_TAG, SHORT, &[2]);
    });
    let image = open_ifd(ByteOrderType::LittleEndian, false, ifd).await;

    let entry = image.tag_by_id(CUSTOM_TAG).unwrap();
    assert_eq!(image.read_tag_as_vec::<u16>(entry).await.unwrap(), vec![1]);
}
