//! Volume probe.
//!
//! Issues one load request per locator through a [`VolumeLoader`], back to
//! back, so later locators supersede earlier ones exactly as a viewer
//! scrubbing through datasets would. Every published outcome is reported,
//! followed by the loader counters.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use volume_stream::{
    DimensionOrder, FocusPoint, LoadEvent, LoadRequest, LoadResult, LoaderConfig, Url, VolumeDims,
    VolumeLoader, VolumePipeline,
};

#[derive(Parser, Debug)]
#[command(name = "volume-probe")]
#[command(about = "Load volumes through the background loader and report outcomes")]
struct Args {
    /// Locators to load in order: reserved built-ins, file paths or URLs
    #[arg(required = true)]
    sources: Vec<String>,

    /// Requested width
    #[arg(long, default_value = "256")]
    width: usize,

    /// Requested height
    #[arg(long, default_value = "256")]
    height: usize,

    /// Requested depth
    #[arg(long, default_value = "256")]
    depth: usize,

    /// Element type hint (uint8, uint16, int16, float32, float64)
    #[arg(long, default_value = "uint8")]
    element_type: String,

    /// Focus point as z,y,x
    #[arg(long, value_parser = parse_focus, default_value = "0,0,0")]
    focus: FocusPoint,

    /// Pyramid level of remote arrays
    #[arg(long)]
    level: Option<u32>,

    /// Override the chunk key order of remote arrays (C or yxz)
    #[arg(long, value_parser = parse_order)]
    order: Option<DimensionOrder>,

    /// Override the chunk key separator of remote arrays
    #[arg(long)]
    separator: Option<String>,

    /// Load this locator before accepting requests
    #[arg(long)]
    preload: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "VOLUME_HTTP_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs and the report as JSON
    #[arg(long)]
    json: bool,
}

/// One reported outcome.
#[derive(Debug, Serialize)]
struct Outcome {
    source: String,
    success: bool,
    dims: String,
    element_type: Option<String>,
    bytes: usize,
    min: Option<u8>,
    max: Option<u8>,
    mean: Option<f64>,
    local_focus: [f64; 3],
    error: Option<String>,
}

impl From<&LoadResult> for Outcome {
    fn from(result: &LoadResult) -> Self {
        let data = &result.data;
        let mean = (!data.is_empty())
            .then(|| data.iter().map(|&v| f64::from(v)).sum::<f64>() / data.len() as f64);
        Self {
            source: result.source.to_string(),
            success: result.success,
            dims: result.dims.to_string(),
            element_type: result.element_type.map(|t| t.to_string()),
            bytes: data.len(),
            min: data.iter().copied().min(),
            max: data.iter().copied().max(),
            mean,
            local_focus: [
                result.local_focus.z,
                result.local_focus.y,
                result.local_focus.x,
            ],
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }
}

fn parse_focus(s: &str) -> Result<FocusPoint, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [z, y, x] => Ok(FocusPoint::new(*z, *y, *x)),
        _ => Err(format!("expected z,y,x, got '{}'", s)),
    }
}

fn parse_order(s: &str) -> Result<DimensionOrder, String> {
    s.parse()
}

/// Accept URLs as-is and turn anything else into a `file:` URL.
fn parse_locator(s: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(s) {
        // Single-letter schemes are drive letters.
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = std::fs::canonicalize(Path::new(s))
        .with_context(|| format!("Failed to resolve local path {}", s))?;
    Url::from_file_path(&path)
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URL", path.display()))
}

fn report(outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }
    if outcome.success {
        println!(
            "OK   {} dims={} type={} bytes={} min={} max={} mean={:.2} focus={:?}",
            outcome.source,
            outcome.dims,
            outcome.element_type.as_deref().unwrap_or("unknown"),
            outcome.bytes,
            outcome.min.unwrap_or_default(),
            outcome.max.unwrap_or_default(),
            outcome.mean.unwrap_or_default(),
            outcome.local_focus,
        );
    } else {
        println!(
            "FAIL {} error={}",
            outcome.source,
            outcome.error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so the report on stdout stays parseable.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let mut config = LoaderConfig::from_env();
    if args.timeout.is_some() {
        config.request_timeout_secs = args.timeout;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!(sources = args.sources.len(), "Starting volume probe");

    let pipeline = VolumePipeline::new(config)?;
    let dims = VolumeDims::new(args.width, args.height, args.depth);
    let build_request = |url: Url| {
        let mut request = LoadRequest::new(url, dims)
            .with_element_type(args.element_type.clone())
            .at_focus(args.focus);
        request.level = args.level;
        request.dimension_order = args.order;
        request.dimension_separator = args.separator.clone();
        request
    };

    let loader = match &args.preload {
        Some(locator) => {
            let request = build_request(parse_locator(locator)?);
            let loader = VolumeLoader::preloaded(pipeline, request).await;
            if let Some(result) = loader.published() {
                report(&Outcome::from(result.as_ref()), args.json)?;
            }
            loader
        }
        None => VolumeLoader::new(pipeline),
    };

    let mut events = loader.subscribe();
    for source in &args.sources {
        loader.request_load(build_request(parse_locator(source)?))?;
    }

    let stats = loader.shutdown().await;

    loop {
        match events.recv().await {
            Ok(LoadEvent::Succeeded(result)) | Ok(LoadEvent::Failed(result)) => {
                report(&Outcome::from(result.as_ref()), args.json)?;
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Missed load events");
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!(
        launched = stats.launched,
        published = stats.published,
        failed = stats.failed,
        discarded = stats.discarded,
        "Probe complete"
    );

    if stats.published == 0 {
        anyhow::bail!("No volume was published");
    }
    Ok(())
}
