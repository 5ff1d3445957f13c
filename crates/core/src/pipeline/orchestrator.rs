//! The link pipeline: fetch, rework, deliver, report, clean up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

use super::indicator::LoadingIndicator;
use super::phase::PipelinePhase;
use super::tracker::TransientFileTracker;
use crate::config::Config;
use crate::delivery::{build_caption, escape_html, Messenger, RequestContext, StatusMessage};
use crate::fetch::{FetchError, MediaFetcher};
use crate::media::{MediaFile, MediaKind};
use crate::metrics;
use crate::transcode::{DeliveryOptimizer, SlideshowComposer, Transcoder};

/// One run's terminal state, before the final status edit.
enum RunOutcome {
    Delivered,
    Failed { reason: String, stage: &'static str },
}

/// Orchestrates a single link from URL to delivered media.
///
/// `run` never returns an error: every failure ends as a message in the
/// chat, and tracked files are cleaned up on every path out.
pub struct LinkPipeline {
    fetcher: MediaFetcher,
    transcoder: Option<Arc<dyn Transcoder>>,
    messenger: Arc<dyn Messenger>,
    convert_slideshows: bool,
    temp_dir: PathBuf,
    upload_limit_bytes: u64,
    indicator_interval: Duration,
    indicator_stop_timeout: Duration,
}

impl LinkPipeline {
    /// `transcoder` is `None` when the startup capability probe found no
    /// usable ffmpeg; the pipeline then delivers fetched files as-is.
    pub fn new(
        fetcher: MediaFetcher,
        transcoder: Option<Arc<dyn Transcoder>>,
        messenger: Arc<dyn Messenger>,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            messenger,
            convert_slideshows: config.transcode.convert_slideshows,
            temp_dir: config.downloader.temp_dir.clone(),
            upload_limit_bytes: config.delivery.upload_limit_bytes,
            indicator_interval: Duration::from_millis(config.pipeline.indicator_interval_ms),
            indicator_stop_timeout: Duration::from_millis(
                config.pipeline.indicator_stop_timeout_ms,
            ),
        }
    }

    /// Processes one link end to end.
    pub async fn run(&self, ctx: RequestContext, url: &str) {
        metrics::LINKS_PROCESSED.inc();
        let started = Instant::now();
        let mut tracker = TransientFileTracker::new();

        let status = match self
            .messenger
            .send_status(
                ctx.chat_id,
                &PipelinePhase::Processing.status_text(ctx.presenter.as_deref()),
                ctx.reply_to,
            )
            .await
        {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(error = %e, url, "could not post status message");
                None
            }
        };

        let indicator = status.clone().map(|s| {
            LoadingIndicator::start(
                self.messenger.clone(),
                s,
                PipelinePhase::Processing.status_text(ctx.presenter.as_deref()),
                self.indicator_interval,
                self.indicator_stop_timeout,
            )
        });

        let outcome = self
            .fetch_and_deliver(&ctx, url, indicator.as_ref(), &mut tracker)
            .await;

        if let Some(indicator) = indicator {
            indicator.stop().await;
        }

        match &outcome {
            RunOutcome::Delivered => {
                metrics::MEDIA_DELIVERED.inc();
                metrics::PIPELINE_DURATION
                    .with_label_values(&["delivered"])
                    .observe(started.elapsed().as_secs_f64());
                tracing::info!(url, "media delivered");
                if let Some(status) = &status {
                    if let Err(e) = self.messenger.delete_status(status).await {
                        tracing::debug!(error = %e, "could not delete status message");
                    }
                }
            }
            RunOutcome::Failed { reason, stage } => {
                metrics::PIPELINE_FAILURES.with_label_values(&[stage]).inc();
                metrics::PIPELINE_DURATION
                    .with_label_values(&["failed"])
                    .observe(started.elapsed().as_secs_f64());
                tracing::warn!(url, stage, reason, "pipeline run failed");
                self.report_failure(&ctx, url, reason, status.as_ref()).await;
            }
        }

        let removed = tracker.cleanup().await;
        tracing::debug!(url, removed, "transient cleanup done");
    }

    async fn fetch_and_deliver(
        &self,
        ctx: &RequestContext,
        url: &str,
        indicator: Option<&LoadingIndicator>,
        tracker: &mut TransientFileTracker,
    ) -> RunOutcome {
        let fetched = self
            .fetcher
            .fetch(url, || {
                metrics::GALLERY_FALLBACKS.inc();
                if let Some(ind) = indicator {
                    ind.set_text(PipelinePhase::TryingAlternative.status_text(None));
                }
            })
            .await;

        let result = match fetched {
            Ok(result) => result,
            Err(e) => {
                return RunOutcome::Failed {
                    reason: format!("❌ {}", e.user_message()),
                    stage: "fetch",
                };
            }
        };

        // A downloader can exit clean without producing anything usable.
        if result.files.is_empty() {
            return RunOutcome::Failed {
                reason: format!("❌ {}", FetchError::NoMedia.user_message()),
                stage: "fetch",
            };
        }

        for file in &result.files {
            tracker.track(&file.path);
        }
        let mut files = result.files;

        // A gallery of images plus one audio track becomes a slideshow
        // video when the transcoder is up for it.
        if result.from_gallery && self.convert_slideshows {
            if let Some(transcoder) = &self.transcoder {
                if SlideshowComposer::is_candidate(&files) {
                    if let Some(ind) = indicator {
                        ind.set_text(PipelinePhase::ConvertingSlideshow.status_text(None));
                    }
                    let composer =
                        SlideshowComposer::new(transcoder.clone(), self.temp_dir.clone());
                    if let Some(video) = composer.compose(&files).await {
                        tracker.track(&video.path);
                        files = vec![video];
                    }
                }
            }
        }

        // Any video in the final set gets re-encoded for upload, whether
        // it was fetched directly, came from the gallery fallback, or was
        // just composed. Best-effort: the original goes out if the
        // re-encode fails.
        if let Some(transcoder) = &self.transcoder {
            if let Some(idx) = files.iter().position(|f| f.kind == MediaKind::Video) {
                if let Some(ind) = indicator {
                    ind.set_text(PipelinePhase::Optimizing.status_text(None));
                }
                let optimizer = DeliveryOptimizer::new(transcoder.clone());
                if let Some(optimized) = optimizer.optimize(&files[idx]).await {
                    tracker.track(&optimized.path);
                    files[idx] = optimized;
                }
            }
        }

        if let Some(ind) = indicator {
            ind.set_text(PipelinePhase::Sending.status_text(None));
        }

        let caption = build_caption(ctx.presenter.as_deref(), ctx.extra_text.as_deref());
        match self
            .messenger
            .send_media(ctx, &files, caption.as_deref())
            .await
        {
            Ok(true) => RunOutcome::Delivered,
            Ok(false) => RunOutcome::Failed {
                reason: "⚠️ Downloaded successfully, but failed to send media".to_string(),
                stage: "send",
            },
            Err(e) => RunOutcome::Failed {
                reason: format!("❌ {}", e.user_message(self.upload_limit_bytes)),
                stage: "send",
            },
        }
    }

    /// Edits the status message with the failure and the link. When the
    /// edit fails and there is no original message to point at, posts a
    /// fresh message so the failure is not silent.
    async fn report_failure(
        &self,
        ctx: &RequestContext,
        url: &str,
        reason: &str,
        status: Option<&StatusMessage>,
    ) {
        let safe_url = escape_html(url);
        let text = format!("{reason}\nLink: <a href=\"{safe_url}\">{safe_url}</a>");

        if let Some(status) = status {
            match self.messenger.edit_status(status, &text).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "could not edit final status");
                }
            }
            // In private chats the failure only ever lands as an edit.
            if ctx.reply_to.is_some() {
                return;
            }
        }

        if let Err(e) = self.messenger.send_status(ctx.chat_id, &text, None).await {
            tracing::error!(error = %e, "could not report failure to chat");
        }
    }
}
