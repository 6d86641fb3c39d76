//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for TIFF parsing:
//! - Field types that determine how values are encoded
//! - Tag codes that identify metadata fields
//! - The structural enumerations (compression, photometric interpretation,
//!   planar configuration, sample format, predictor)
//!
//! Every enumeration is closed but total: codes this crate does not know map
//! to an `Unknown(code)` variant instead of failing, so new or private codes
//! never stop a directory from being decoded.

/// Declares a `u16`-coded enumeration with an `Unknown` fallback.
macro_rules! code_enum {
    (
        $(#[$enum_attr:meta])*
        pub enum $enum_name:ident {
            $($(#[$attr:meta])* $variant:ident = $value:literal => $display:literal,)*
        }
    ) => {
        $(#[$enum_attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $enum_name {
            $($(#[$attr])* $variant,)*
            /// A code this crate has no name for
            Unknown(u16),
        }

        impl $enum_name {
            /// Map a raw code, falling back to `Unknown` for unrecognized values.
            pub const fn from_u16(value: u16) -> Self {
                match value {
                    $($value => $enum_name::$variant,)*
                    other => $enum_name::Unknown(other),
                }
            }

            /// Get the numeric code.
            pub const fn as_u16(self) -> u16 {
                match self {
                    $($enum_name::$variant => $value,)*
                    $enum_name::Unknown(value) => value,
                }
            }

            /// Display name, or `"(unknown)"` for unrecognized codes.
            pub const fn name(self) -> &'static str {
                match self {
                    $($enum_name::$variant => $display,)*
                    $enum_name::Unknown(_) => UNKNOWN_NAME,
                }
            }

            /// Whether the code is one this crate recognizes.
            pub const fn is_known(self) -> bool {
                !matches!(self, $enum_name::Unknown(_))
            }
        }

        impl From<u16> for $enum_name {
            fn from(value: u16) -> Self {
                Self::from_u16(value)
            }
        }

        impl From<$enum_name> for u16 {
            fn from(value: $enum_name) -> u16 {
                value.as_u16()
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $enum_name::Unknown(value) => write!(f, "Unknown({})", value),
                    known => f.write_str(known.name()),
                }
            }
        }
    };
}

/// Placeholder name for codes without a table entry.
pub const UNKNOWN_NAME: &str = "(unknown)";

// =============================================================================
// TIFF Field Types
// =============================================================================

code_enum! {
    /// TIFF field types that determine how values are encoded.
    ///
    /// The element size decides whether a value fits inline in a directory
    /// entry and how arrays are walked.
    pub enum TagType {
        /// Unsigned 8-bit integer
        Byte = 1 => "Byte",
        /// 8-bit ASCII character, NUL terminated
        Ascii = 2 => "ASCII",
        /// Unsigned 16-bit integer
        Short = 3 => "Short",
        /// Unsigned 32-bit integer
        Long = 4 => "Long",
        /// Two unsigned 32-bit integers: numerator, denominator
        Rational = 5 => "Rational",
        /// Signed 8-bit integer
        SByte = 6 => "SByte",
        /// Opaque byte
        Undefined = 7 => "Undefined",
        /// Signed 16-bit integer
        SShort = 8 => "SShort",
        /// Signed 32-bit integer
        SLong = 9 => "SLong",
        /// Two signed 32-bit integers: numerator, denominator
        SRational = 10 => "SRational",
        /// IEEE 754 single precision
        Float = 11 => "Float",
        /// IEEE 754 double precision
        Double = 12 => "Double",
        /// Unsigned 32-bit offset to a sub-directory
        Ifd = 13 => "IFD",
        /// Unsigned 64-bit integer (BigTIFF)
        Long8 = 16 => "Long8",
        /// Signed 64-bit integer (BigTIFF)
        SLong8 = 17 => "SLong8",
        /// Unsigned 64-bit offset to a sub-directory (BigTIFF)
        Ifd8 = 18 => "IFD8",
    }
}

impl TagType {
    /// Size of a single element in bytes, `None` for unknown types.
    #[inline]
    pub const fn element_size(self) -> Option<usize> {
        match self {
            TagType::Byte | TagType::Ascii | TagType::SByte | TagType::Undefined => Some(1),
            TagType::Short | TagType::SShort => Some(2),
            TagType::Long | TagType::SLong | TagType::Float | TagType::Ifd => Some(4),
            TagType::Rational
            | TagType::SRational
            | TagType::Double
            | TagType::Long8
            | TagType::SLong8
            | TagType::Ifd8 => Some(8),
            TagType::Unknown(_) => None,
        }
    }

    /// Total byte size of `count` elements.
    ///
    /// `None` if the type is unknown or the size overflows 64 bits.
    #[inline]
    pub fn byte_size(self, count: u64) -> Option<u64> {
        (self.element_size()? as u64).checked_mul(count)
    }

    /// Maximum bytes that can be stored inline in a classic TIFF IFD entry.
    pub const INLINE_THRESHOLD_TIFF: u64 = 4;

    /// Maximum bytes that can be stored inline in a BigTIFF IFD entry.
    pub const INLINE_THRESHOLD_BIGTIFF: u64 = 8;

    /// Check if `count` elements of this type fit in the entry's value field.
    ///
    /// Unknown types and overflowing sizes never fit.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF
        } else {
            Self::INLINE_THRESHOLD_TIFF
        };
        self.byte_size(count).is_some_and(|size| size <= threshold)
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

code_enum! {
    /// Tag codes identifying the fields of an image directory.
    ///
    /// Covers the baseline and extension tags, JPEG, EXIF/GPS pointers,
    /// GeoTIFF and GDAL private tags. Anything else is `Unknown`.
    pub enum TagCode {
        NewSubfileType = 254 => "NewSubfileType",
        SubfileType = 255 => "SubfileType",
        ImageWidth = 256 => "ImageWidth",
        /// Image height in pixels
        ImageLength = 257 => "ImageLength",
        BitsPerSample = 258 => "BitsPerSample",
        Compression = 259 => "Compression",
        PhotometricInterpretation = 262 => "PhotometricInterpretation",
        Threshholding = 263 => "Threshholding",
        CellWidth = 264 => "CellWidth",
        CellLength = 265 => "CellLength",
        FillOrder = 266 => "FillOrder",
        DocumentName = 269 => "DocumentName",
        ImageDescription = 270 => "ImageDescription",
        Make = 271 => "Make",
        Model = 272 => "Model",
        StripOffsets = 273 => "StripOffsets",
        Orientation = 274 => "Orientation",
        SamplesPerPixel = 277 => "SamplesPerPixel",
        RowsPerStrip = 278 => "RowsPerStrip",
        StripByteCounts = 279 => "StripByteCounts",
        MinSampleValue = 280 => "MinSampleValue",
        MaxSampleValue = 281 => "MaxSampleValue",
        XResolution = 282 => "XResolution",
        YResolution = 283 => "YResolution",
        PlanarConfiguration = 284 => "PlanarConfiguration",
        PageName = 285 => "PageName",
        XPosition = 286 => "XPosition",
        YPosition = 287 => "YPosition",
        FreeOffsets = 288 => "FreeOffsets",
        FreeByteCounts = 289 => "FreeByteCounts",
        GrayResponseUnit = 290 => "GrayResponseUnit",
        GrayResponseCurve = 291 => "GrayResponseCurve",
        ResolutionUnit = 296 => "ResolutionUnit",
        PageNumber = 297 => "PageNumber",
        TransferFunction = 301 => "TransferFunction",
        Software = 305 => "Software",
        DateTime = 306 => "DateTime",
        Artist = 315 => "Artist",
        HostComputer = 316 => "HostComputer",
        Predictor = 317 => "Predictor",
        WhitePoint = 318 => "WhitePoint",
        PrimaryChromaticities = 319 => "PrimaryChromaticities",
        ColorMap = 320 => "ColorMap",
        HalftoneHints = 321 => "HalftoneHints",
        TileWidth = 322 => "TileWidth",
        /// Tile height in pixels
        TileLength = 323 => "TileLength",
        TileOffsets = 324 => "TileOffsets",
        TileByteCounts = 325 => "TileByteCounts",
        SubIfds = 330 => "SubIFDs",
        InkSet = 332 => "InkSet",
        ExtraSamples = 338 => "ExtraSamples",
        SampleFormat = 339 => "SampleFormat",
        SMinSampleValue = 340 => "SMinSampleValue",
        SMaxSampleValue = 341 => "SMaxSampleValue",
        /// JPEG quantization and Huffman tables shared by all striles
        JpegTables = 347 => "JPEGTables",
        YCbCrCoefficients = 529 => "YCbCrCoefficients",
        YCbCrSubSampling = 530 => "YCbCrSubSampling",
        YCbCrPositioning = 531 => "YCbCrPositioning",
        ReferenceBlackWhite = 532 => "ReferenceBlackWhite",
        Xmp = 700 => "XMP",
        Copyright = 33432 => "Copyright",
        GeoTiffPixelScale = 33550 => "GeoTIFFPixelScale",
        GeoTiffTiePoints = 33922 => "GeoTIFFTiePoints",
        GeoTiffGeoTransMatrix = 34264 => "GeoTIFFGeoTransMatrix",
        ExifIfd = 34665 => "ExifIFD",
        IccProfile = 34675 => "ICCProfile",
        /// Packed GeoTIFF key directory (Short values)
        GeoTiffGeoKeyDirectory = 34735 => "GeoTIFFGeoKeyDirectory",
        GeoTiffDoubleParams = 34736 => "GeoTIFFDoubleParams",
        /// `|`-separated ASCII values referenced by GeoTIFF keys
        GeoTiffAsciiParams = 34737 => "GeoTIFFAsciiParams",
        GpsIfd = 34853 => "GPSIFD",
        GdalMetadata = 42112 => "GDAL_METADATA",
        GdalNodata = 42113 => "GDAL_NODATA",
        LercParameters = 50674 => "LERCParameters",
        RpcCoefficients = 50844 => "RPCCoefficients",
    }
}

// =============================================================================
// Structural Enumerations
// =============================================================================

code_enum! {
    /// Compression scheme of the strile data.
    ///
    /// This crate only locates compressed byte ranges; it never decodes them.
    pub enum Compression {
        None = 1 => "None",
        CcittRle = 2 => "CCITT RLE",
        CcittFax3 = 3 => "CCITT Fax3",
        CcittFax4 = 4 => "CCITT Fax4",
        Lzw = 5 => "LZW",
        /// "Old-style" JPEG
        OldJpeg = 6 => "Old JPEG",
        Jpeg = 7 => "JPEG",
        /// Deflate with the officially registered code
        AdobeDeflate = 8 => "Deflate",
        Jbig = 9 => "JBIG",
        PackBits = 32773 => "PackBits",
        /// Deflate with the legacy libtiff code
        Deflate = 32946 => "Deflate (legacy)",
        Jpeg2000 = 34712 => "JPEG 2000",
        Lerc = 34887 => "LERC",
        Lzma = 34925 => "LZMA",
        Zstd = 50000 => "ZSTD",
        Webp = 50001 => "WEBP",
        JpegXl = 50002 => "JPEG XL",
    }
}

code_enum! {
    /// Color space of the image data.
    pub enum PhotometricInterpretation {
        MinIsWhite = 0 => "MinIsWhite",
        MinIsBlack = 1 => "MinIsBlack",
        Rgb = 2 => "RGB",
        Palette = 3 => "Palette",
        Mask = 4 => "Mask",
        /// Usually CMYK
        Separated = 5 => "Separated",
        YCbCr = 6 => "YCbCr",
        CieLab = 8 => "CIELab",
        IccLab = 9 => "ICCLab",
        ItuLab = 10 => "ITULab",
        Cfa = 32803 => "CFA",
        LogL = 32844 => "LogL",
        LogLuv = 32845 => "LogLuv",
        LinearRaw = 34892 => "LinearRaw",
    }
}

code_enum! {
    /// How the samples of a pixel are laid out.
    pub enum PlanarConfiguration {
        /// Samples of one pixel are interleaved (RGBRGB...)
        Contiguous = 1 => "Contiguous",
        /// Each sample is stored in its own plane
        Separate = 2 => "Separate",
    }
}

code_enum! {
    /// Interpretation of each sample value.
    pub enum SampleFormat {
        UnsignedInt = 1 => "UnsignedInt",
        SignedInt = 2 => "SignedInt",
        IeeeFp = 3 => "IEEEFP",
        Void = 4 => "Void",
        ComplexInt = 5 => "ComplexInt",
        ComplexIeeeFp = 6 => "ComplexIEEEFP",
    }
}

code_enum! {
    /// Pre-compression transform applied to samples.
    pub enum Predictor {
        None = 1 => "None",
        Horizontal = 2 => "Horizontal",
        FloatingPoint = 3 => "FloatingPoint",
    }
}

// =============================================================================
// Raw Code Lookups
// =============================================================================

/// Name of a raw tag code.
pub fn tag_code_name(code: u16) -> &'static str {
    TagCode::from_u16(code).name()
}

/// Name of a raw field type code.
pub fn tag_type_name(code: u16) -> &'static str {
    TagType::from_u16(code).name()
}

/// Name of a raw compression code.
pub fn compression_name(code: u16) -> &'static str {
    Compression::from_u16(code).name()
}

/// Name of a raw photometric interpretation code.
pub fn photometric_interpretation_name(code: u16) -> &'static str {
    PhotometricInterpretation::from_u16(code).name()
}

/// Name of a raw planar configuration code.
pub fn planar_configuration_name(code: u16) -> &'static str {
    PlanarConfiguration::from_u16(code).name()
}

/// Name of a raw sample format code.
pub fn sample_format_name(code: u16) -> &'static str {
    SampleFormat::from_u16(code).name()
}

// =============================================================================
// Tests
// =============================================================================
