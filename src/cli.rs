// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running a still photo through a filter list
//! - Resolving an image URL through the acquisition cache

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tryon::backends::LandmarkPoseEstimator;
use tryon::{ArSessionStore, Config, Filter, FilterPipeline, FrameBuffer, FrameDispatcher, LandmarkSet};

/// Default folder name for processed photos
const DEFAULT_SAVE_FOLDER: &str = "tryon";

/// Apply a filter list to a still photo and save the result
pub fn process_image(
    input: PathBuf,
    landmarks: Option<PathBuf>,
    filters: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let image = image::open(&input)?.to_rgba8();
    let frame = FrameBuffer::from_rgba_image(image);
    println!("Input: {} ({}x{})", input.display(), frame.width(), frame.height());

    let faces: Vec<LandmarkSet> = match landmarks {
        Some(path) => read_json(&path)?,
        None => Vec::new(),
    };
    let filters: Vec<Filter> = match filters {
        Some(path) => read_json(&path)?,
        None => Vec::new(),
    };
    println!("Faces: {}, filters: {}", faces.len(), filters.len());

    // No scene renderer on the command line: hair filters pass through
    let sessions = Arc::new(ArSessionStore::new());
    let pipeline = Arc::new(FilterPipeline::new(Arc::new(LandmarkPoseEstimator::new()), None));
    let dispatcher = FrameDispatcher::new(&config.dispatch, Arc::clone(&sessions), pipeline);

    let session = sessions.create();
    for filter in filters {
        sessions.add_filter(&session, filter)?;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let processed = rt.block_on(async { dispatcher.process(&session, frame, faces).await })?;
    dispatcher.shutdown();
    sessions.end(&session)?;

    let output_path = match output {
        Some(path) => path,
        None => {
            let dir = get_default_output_dir();
            std::fs::create_dir_all(&dir)?;
            dir.join(format!("tryon_{}.png", Local::now().format("%Y%m%d_%H%M%S")))
        }
    };

    processed.frame.to_rgba_image()?.save(&output_path)?;
    println!("Path: {:?}", processed.path);
    println!("Saved: {}", output_path.display());
    Ok(())
}

/// Resolve `url` through the image cache and print what came back
#[cfg(feature = "http")]
pub fn fetch_image(url: String, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Duration;
    use tryon::cache::CacheStatus;
    use tryon::constants::FETCH_TIMEOUT;

    let config = Config::load()?;
    let cache = tryon::ImageCache::with_http(config.cache)?;

    let rt = tokio::runtime::Runtime::new()?;
    let handle = rt.block_on(async {
        let first = cache.resolve(&url).await?;
        print_handle(&first);
        if !first.is_low_res() {
            return Ok::<_, tryon::errors::CacheError>(first);
        }

        // Preview came first; wait for the background full load
        let deadline = tokio::time::Instant::now() + FETCH_TIMEOUT;
        while cache.status(&url) == Some(CacheStatus::Loading) && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let full = cache.resolve(&url).await?;
        print_handle(&full);
        Ok(full)
    })?;

    let stats = cache.stats();
    println!("Fetches: {}, hits: {}", stats.fetches, stats.hits);
    cache.shutdown();

    if let Some(path) = output {
        handle.resource.save(&path)?;
        println!("Saved: {}", path.display());
    }
    Ok(())
}

#[cfg(feature = "http")]
fn print_handle(handle: &tryon::ImageHandle) {
    println!(
        "{:?}: {}x{}, ~{} bytes, format {}",
        handle.resolution,
        handle.width,
        handle.height,
        handle.size_estimate,
        handle.format_name().unwrap_or("unknown")
    );
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e).into())
}

/// Get default output directory
fn get_default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}
