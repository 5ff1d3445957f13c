//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use super::error::TranscodeError;
use super::traits::Transcoder;
use crate::config::TranscodeConfig;

/// Outputs at or below this size are treated as ffmpeg debris.
const MIN_OUTPUT_SIZE_BYTES: u64 = 100;

/// Acceptable drift between a composed slideshow and its audio track.
const DURATION_TOLERANCE_SECS: f64 = 0.5;

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscodeConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// Builds the ffconcat list feeding the concat demuxer.
    ///
    /// Each image is held for an equal share of the audio duration, and
    /// the last image is repeated once without a duration so the demuxer
    /// does not cut it short.
    fn build_concat_list(images: &[&Path], duration_per_image: f64) -> String {
        let mut list = String::from("ffconcat version 1.0\n");
        for img in images {
            let safe_path = img.to_string_lossy().replace('\\', "/");
            let _ = writeln!(list, "file '{safe_path}'");
            let _ = writeln!(list, "duration {duration_per_image:.5}");
        }
        if let Some(last) = images.last() {
            let safe_path = last.to_string_lossy().replace('\\', "/");
            let _ = writeln!(list, "file '{safe_path}'");
        }
        list
    }

    /// Parses ffprobe JSON output into a duration. Prefers the container
    /// duration, falls back to the first audio stream.
    fn parse_duration(output: &str) -> Result<f64, TranscodeError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            duration: Option<String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| TranscodeError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .or_else(|| {
                probe
                    .streams
                    .iter()
                    .find(|s| s.codec_type.as_deref() == Some("audio"))
                    .and_then(|s| s.duration.as_ref())
                    .and_then(|d| d.parse::<f64>().ok())
            });

        match duration {
            Some(d) if d > 0.0 => Ok(d),
            _ => Err(TranscodeError::probe_failed(
                "no valid duration in ffprobe output",
            )),
        }
    }

    /// Runs a prepared ffmpeg command and enforces the output contract:
    /// exit 0, output exists and is bigger than debris. Partial outputs
    /// are deleted on any failure.
    async fn run_ffmpeg(&self, mut cmd: Command, output: &Path) -> Result<(), TranscodeError> {
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let timeout_secs = self.config.timeout_secs;
        let result = timeout(
            Duration::from_secs(timeout_secs),
            async {
                let mut stderr_buf = Vec::new();
                if let Some(mut stderr) = child.stderr.take() {
                    use tokio::io::AsyncReadExt;
                    let _ = stderr.read_to_end(&mut stderr_buf).await;
                }
                let status = child.wait().await?;
                Ok::<_, std::io::Error>((status, stderr_buf))
            },
        )
        .await;

        let outcome = match result {
            Ok(Ok((status, stderr_buf))) => {
                if status.success() {
                    self.check_output(output).await
                } else {
                    let stderr = String::from_utf8_lossy(&stderr_buf).trim().to_string();
                    Err(TranscodeError::transcode_failed(
                        format!("ffmpeg exited with code: {:?}", status.code()),
                        (!stderr.is_empty()).then_some(stderr),
                    ))
                }
            }
            Ok(Err(e)) => Err(TranscodeError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                Err(TranscodeError::Timeout { timeout_secs })
            }
        };

        if outcome.is_err() {
            let _ = tokio::fs::remove_file(output).await;
        }
        outcome
    }

    async fn check_output(&self, output: &Path) -> Result<(), TranscodeError> {
        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > MIN_OUTPUT_SIZE_BYTES => Ok(()),
            Ok(meta) => Err(TranscodeError::transcode_failed(
                format!("output file too small ({} bytes)", meta.len()),
                None,
            )),
            Err(_) => Err(TranscodeError::transcode_failed(
                "output file not created",
                None,
            )),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, TranscodeError> {
        if !path.exists() {
            return Err(TranscodeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Self::parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn compose_slideshow(
        &self,
        images: &[&Path],
        audio: &Path,
        output: &Path,
    ) -> Result<(), TranscodeError> {
        if images.is_empty() {
            return Err(TranscodeError::transcode_failed("no images to compose", None));
        }

        let audio_duration = self.probe_duration(audio).await?;
        let duration_per_image = (audio_duration / images.len() as f64).max(0.001);
        tracing::debug!(
            audio_duration,
            images = images.len(),
            duration_per_image,
            "composing slideshow"
        );

        let list_path = std::env::temp_dir().join(format!(
            "ffmpeg_imagelist_{}.txt",
            Uuid::new_v4().simple()
        ));
        let list = Self::build_concat_list(images, duration_per_image);
        tokio::fs::write(&list_path, list).await?;

        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .arg("-i")
            .arg(audio)
            .args([
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-tune",
                "stillimage",
                "-pix_fmt",
                "yuv420p",
                "-vf",
                "pad=ceil(iw/2)*2:ceil(ih/2)*2",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-vsync",
                "vfr",
                "-shortest",
                "-loglevel",
                "warning",
            ])
            .arg(output);

        let result = self.run_ffmpeg(cmd, output).await;
        let _ = tokio::fs::remove_file(&list_path).await;
        result?;

        // Drift check is advisory only.
        match self.probe_duration(output).await {
            Ok(out_duration) => {
                let diff = (out_duration - audio_duration).abs();
                if diff > DURATION_TOLERANCE_SECS {
                    tracing::warn!(
                        out_duration,
                        audio_duration,
                        diff,
                        "slideshow duration drifted from audio"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not verify slideshow duration"),
        }

        Ok(())
    }

    async fn optimize_video(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        if !input.exists() {
            return Err(TranscodeError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.args(["-y", "-i"])
            .arg(input)
            .args([
                "-max_muxing_queue_size",
                "9999",
                "-c:v",
                "libx264",
                "-crf",
                "28",
                "-maxrate",
                "4.5M",
                "-preset",
                "faster",
                "-flags",
                "+global_header",
                "-pix_fmt",
                "yuv420p",
                "-profile:v",
                "baseline",
                "-movflags",
                "+faststart",
                "-c:a",
                "aac",
                "-ac",
                "2",
                "-loglevel",
                "warning",
            ])
            .arg(output);

        self.run_ffmpeg(cmd, output).await
    }

    async fn remux_faststart(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        if !input.exists() {
            return Err(TranscodeError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.args(["-y", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "+faststart", "-loglevel", "warning"])
            .arg(output);

        self.run_ffmpeg(cmd, output).await
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscodeError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(TranscodeError::Io(e));
        }

        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscodeError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(TranscodeError::Io(e));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_duration_from_format() {
        let json = r#"{
            "format": { "duration": "34.5" },
            "streams": []
        }"#;
        let duration = FfmpegTranscoder::parse_duration(json).unwrap();
        assert!((duration - 34.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_stream_fallback() {
        let json = r#"{
            "format": {},
            "streams": [
                { "codec_type": "video", "duration": "99.0" },
                { "codec_type": "audio", "duration": "12.25" }
            ]
        }"#;
        let duration = FfmpegTranscoder::parse_duration(json).unwrap();
        assert!((duration - 12.25).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_rejects_zero() {
        let json = r#"{ "format": { "duration": "0.0" }, "streams": [] }"#;
        assert!(matches!(
            FfmpegTranscoder::parse_duration(json),
            Err(TranscodeError::ProbeFailed { .. })
        ));
    }

    #[test]
    fn test_concat_list_repeats_last_image() {
        let a = PathBuf::from("/tmp/1.jpg");
        let b = PathBuf::from("/tmp/2.jpg");
        let list = FfmpegTranscoder::build_concat_list(&[&a, &b], 2.5);

        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines[0], "ffconcat version 1.0");
        assert_eq!(lines[1], "file '/tmp/1.jpg'");
        assert_eq!(lines[2], "duration 2.50000");
        assert_eq!(lines[3], "file '/tmp/2.jpg'");
        assert_eq!(lines[4], "duration 2.50000");
        assert_eq!(lines[5], "file '/tmp/2.jpg'");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_min_duration_floor() {
        // 0.05s of audio over 100 images would round to 0; the floor keeps
        // the demuxer happy.
        let duration_per_image = (0.05_f64 / 100.0).max(0.001);
        assert!((duration_per_image - 0.001).abs() < f64::EPSILON);
    }
}
