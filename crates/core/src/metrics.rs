//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Link pipeline (links processed, deliveries, failures)
//! - Downloaders (attempts, failures, fallbacks)
//! - Transcoding (slideshows, optimizations)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Links accepted for processing.
pub static LINKS_PROCESSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_links_processed_total",
        "Total links accepted for processing",
    )
    .unwrap()
});

/// Pipeline runs that delivered media.
pub static MEDIA_DELIVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_media_delivered_total",
        "Total pipeline runs that delivered media",
    )
    .unwrap()
});

/// Pipeline runs that ended with a failure message, by stage.
pub static PIPELINE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelgrab_pipeline_failures_total",
            "Total pipeline runs that failed",
        ),
        &["stage"], // "fetch", "send"
    )
    .unwrap()
});

/// End-to-end pipeline duration in seconds.
pub static PIPELINE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reelgrab_pipeline_duration_seconds",
            "End-to-end duration of one link run",
        )
        .buckets(vec![1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "delivered", "failed"
    )
    .unwrap()
});

// =============================================================================
// Downloader Metrics
// =============================================================================

/// Download attempts by tool.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelgrab_fetch_attempts_total", "Total download attempts"),
        &["tool"], // "yt-dlp", "gallery-dl"
    )
    .unwrap()
});

/// Download failures by tool.
pub static FETCH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelgrab_fetch_failures_total", "Total download failures"),
        &["tool"],
    )
    .unwrap()
});

/// Gallery fallbacks taken after an ambiguous primary outcome.
pub static GALLERY_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_gallery_fallbacks_total",
        "Total gallery fallbacks after an ambiguous primary download",
    )
    .unwrap()
});

// =============================================================================
// Transcode Metrics
// =============================================================================

/// Slideshows composed from images plus audio.
pub static SLIDESHOWS_COMPOSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_slideshows_composed_total",
        "Total slideshow videos composed",
    )
    .unwrap()
});

/// Videos re-encoded for upload.
pub static VIDEOS_OPTIMIZED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_videos_optimized_total",
        "Total videos re-encoded for upload",
    )
    .unwrap()
});

/// Transient files removed during cleanup.
pub static FILES_CLEANED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_files_cleaned_total",
        "Total transient files removed",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pipeline
        Box::new(LINKS_PROCESSED.clone()),
        Box::new(MEDIA_DELIVERED.clone()),
        Box::new(PIPELINE_FAILURES.clone()),
        Box::new(PIPELINE_DURATION.clone()),
        // Downloaders
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(FETCH_FAILURES.clone()),
        Box::new(GALLERY_FALLBACKS.clone()),
        // Transcoding
        Box::new(SLIDESHOWS_COMPOSED.clone()),
        Box::new(VIDEOS_OPTIMIZED.clone()),
        Box::new(FILES_CLEANED.clone()),
    ]
}
