//! tiffmeta - Inspect TIFF and BigTIFF metadata.
//!
//! This binary dumps image directories and locates strips or tiles in local
//! files and S3 objects.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiffmeta::{
    config::{
        Cli, Command, DumpConfig, LocateConfig, LocateTarget, OutputFormat, SourceArgs,
        SourceLocation,
    },
    create_s3_client, detect_source, open, BlockCache, ChainReport, FileRangeReader, Image,
    RangeReader, S3RangeReader, TagError,
};

type Source = Arc<dyn RangeReader>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Dump(config) => run_dump(config).await,
        Command::Locate(config) => run_locate(config).await,
    }
}

// =============================================================================
// Dump Command
// =============================================================================

async fn run_dump(config: DumpConfig) -> ExitCode {
    init_logging(config.source.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let reader = match open_source(&config.source).await {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let first = match open(Arc::clone(&reader)).await {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}: {}", config.source.source, e);
            return ExitCode::FAILURE;
        }
    };

    let images = match first.collect_chain(config.max_ifds).await {
        Ok(images) => images,
        Err(e) => {
            eprintln!("Error: {}: {}", config.source.source, e);
            return ExitCode::FAILURE;
        }
    };
    info!(images = images.len(), "Decoded IFD chain");

    let report = ChainReport::collect(&config.source.source, &images, config.max_values).await;

    match config.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => {
            if let Err(code) = print_json(&report) {
                return code;
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Locate Command
// =============================================================================

#[derive(Debug, Serialize)]
struct Location {
    ifd: usize,
    strile: u64,
    offset: u64,
    byte_count: u64,
}

async fn run_locate(config: LocateConfig) -> ExitCode {
    init_logging(config.source.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let reader = match open_source(&config.source).await {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let image = match nth_image(reader, config.ifd).await {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}: {}", config.source.source, e);
            return ExitCode::FAILURE;
        }
    };

    // validate() already checked the target
    let Ok(target) = config.target() else {
        return ExitCode::FAILURE;
    };

    let location = match locate(&image, config.ifd, target).await {
        Ok(location) => location,
        Err(e) => {
            eprintln!("Error: IFD {}: {}", config.ifd, e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Text => {
            println!("IFD {}, strile {}:", location.ifd, location.strile);
            println!("  Offset: {}", location.offset);
            println!("  ByteCount: {}", location.byte_count);
        }
        OutputFormat::Json => {
            if let Err(code) = print_json(&location) {
                return code;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Walk the chain to the image at `index`.
async fn nth_image(reader: Source, index: usize) -> Result<Image<dyn RangeReader>, String> {
    let mut image = open(reader).await.map_err(|e| e.to_string())?;
    for i in 0..index {
        image = image
            .next()
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("file has only {} image(s)", i + 1))?;
    }
    Ok(image)
}

async fn locate(
    image: &Image<dyn RangeReader>,
    ifd: usize,
    target: LocateTarget,
) -> Result<Location, TagError> {
    let strile = match target {
        LocateTarget::Strile(index) => index,
        LocateTarget::Tile { x, y, sample } => image.tile_coordinate_to_idx(x, y, sample)?,
    };

    Ok(Location {
        ifd,
        strile,
        offset: image.strile_offset(strile).await?,
        byte_count: image.strile_byte_count(strile).await?,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Open the configured source behind a block cache.
async fn open_source(args: &SourceArgs) -> Result<Source, String> {
    let location = args.location()?;

    let reader: Source = match location {
        SourceLocation::Local(path) => {
            let file = FileRangeReader::open(&path)
                .await
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            Arc::new(BlockCache::with_capacity(
                file,
                args.block_size,
                args.cache_blocks,
            ))
        }
        SourceLocation::S3(url) => {
            let client = create_s3_client(args.s3_endpoint.as_deref(), &args.s3_region).await;
            let object = S3RangeReader::from_url(client, &url)
                .await
                .map_err(|e| format!("{}: {}", url, e))?;
            Arc::new(BlockCache::with_capacity(
                object,
                args.block_size,
                args.cache_blocks,
            ))
        }
    };

    debug!(
        source = reader.identifier(),
        size = reader.size(),
        "Opened source"
    );

    match detect_source(reader.as_ref()).await {
        Ok(Some((byte_order, variant))) => {
            debug!(?byte_order, variant = variant.name(), "Detected TIFF variant");
            Ok(reader)
        }
        Ok(None) => Err(format!("{}: not a TIFF or BigTIFF file", args.source)),
        Err(e) => Err(format!("{}: {}", args.source, e)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so they never mix with the dump on stdout.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiffmeta=debug"
    } else {
        "tiffmeta=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
