//! Command-line configuration for tiffmeta.
//!
//! This module provides the CLI surface of the `tiffmeta` binary:
//! - Subcommands parsed with clap
//! - Environment variables with `TIFFMETA_` prefix for source options
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `TIFFMETA_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `TIFFMETA_S3_REGION` - AWS region (default: us-east-1)
//! - `TIFFMETA_BLOCK_SIZE` - Block size of the read cache in bytes (default: 262144)
//! - `TIFFMETA_CACHE_BLOCKS` - Number of cached blocks (default: 100)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::io::{DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_CAPACITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default number of directories followed along the IFD chain.
pub const DEFAULT_MAX_IFDS: usize = 1000;

/// Tags with at least this many values are listed without their values.
pub const DEFAULT_MAX_VALUES: u64 = 1000;

/// Largest accepted `--max-values`.
pub const MAX_MAX_VALUES: u64 = 1_000_000;

/// Smallest accepted block size (1KB).
pub const MIN_BLOCK_SIZE: usize = 1024;

/// Largest accepted block size (16MB).
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tiffmeta - Inspect TIFF and BigTIFF metadata.
///
/// Decodes image directories, tags and strip/tile locations from local files
/// or S3 objects without reading pixel data.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiffmeta")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Dump every image directory of a file.
    Dump(DumpConfig),

    /// Print the byte range of one strip or tile.
    Locate(LocateConfig),
}

/// Output format for command results.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

// =============================================================================
// Source Options
// =============================================================================

/// Where a file is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    S3(Url),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Path of a local file, or an s3://bucket/key URL.
    pub source: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "TIFFMETA_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "TIFFMETA_S3_REGION")]
    pub s3_region: String,

    /// Block size in bytes for the read cache.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, env = "TIFFMETA_BLOCK_SIZE")]
    pub block_size: usize,

    /// Maximum number of blocks kept in the read cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "TIFFMETA_CACHE_BLOCKS")]
    pub cache_blocks: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SourceArgs {
    /// Validate the source options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.source.is_empty() {
            return Err("A source path or s3:// URL is required".to_string());
        }

        self.location()?;

        if self.cache_blocks == 0 {
            return Err("cache_blocks must be greater than 0".to_string());
        }

        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err("block_size must be between 1KB and 16MB".to_string());
        }

        Ok(())
    }

    /// Resolve the source string to a local path or an S3 URL.
    pub fn location(&self) -> Result<SourceLocation, String> {
        if !self.source.starts_with("s3://") {
            return Ok(SourceLocation::Local(PathBuf::from(&self.source)));
        }

        let url = Url::parse(&self.source)
            .map_err(|e| format!("Invalid S3 URL '{}': {}", self.source, e))?;
        let has_bucket = url.host_str().is_some_and(|host| !host.is_empty());
        let has_key = !url.path().trim_start_matches('/').is_empty();
        if !has_bucket || !has_key {
            return Err(format!(
                "S3 URL '{}' must have the form s3://bucket/key",
                self.source
            ));
        }
        Ok(SourceLocation::S3(url))
    }
}

// =============================================================================
// Dump Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct DumpConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Maximum number of directories to follow along the IFD chain.
    #[arg(long, default_value_t = DEFAULT_MAX_IFDS)]
    pub max_ifds: usize,

    /// Only decode values of tags with fewer elements than this.
    #[arg(long, default_value_t = DEFAULT_MAX_VALUES)]
    pub max_values: u64,
}

impl DumpConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;

        if self.max_ifds == 0 {
            return Err("max_ifds must be greater than 0".to_string());
        }

        if self.max_values > MAX_MAX_VALUES {
            return Err(format!(
                "max_values must be at most {}, got {}",
                MAX_MAX_VALUES, self.max_values
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Locate Command
// =============================================================================

#[derive(Args, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("target")
        .required(true)
        .args(["strile", "tile"]),
))]
pub struct LocateConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Index of the image in the IFD chain.
    #[arg(long, default_value_t = 0)]
    pub ifd: usize,

    /// Strile (strip or tile) index.
    #[arg(long)]
    pub strile: Option<u64>,

    /// Tile column and row.
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    pub tile: Option<Vec<u32>>,

    /// Sample plane of the tile (separate planar configuration only).
    #[arg(long, default_value_t = 0, requires = "tile")]
    pub sample: u32,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// What a locate request points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateTarget {
    Strile(u64),
    Tile { x: u32, y: u32, sample: u32 },
}

impl LocateConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        self.target().map(|_| ())
    }

    /// The requested strile or tile.
    pub fn target(&self) -> Result<LocateTarget, String> {
        match (self.strile, self.tile.as_deref()) {
            (Some(index), None) => Ok(LocateTarget::Strile(index)),
            (None, Some(&[x, y])) => Ok(LocateTarget::Tile {
                x,
                y,
                sample: self.sample,
            }),
            (None, Some(_)) => Err("--tile takes exactly two values: X Y".to_string()),
            _ => Err("Exactly one of --strile or --tile is required".to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
