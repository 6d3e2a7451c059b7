//! FFmpeg command construction and render-stage orchestration.
//!
//! This module never spawns a process itself. It builds argv sequences for
//! an external `ffmpeg` binary and drives the segment → concat → subtitle
//! burn sequence against a [`CommandRunner`] the caller supplies — the
//! actual process invocation is an external collaborator, consistent with
//! every other I/O boundary this crate reaches across rather than owns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::segmenter::{SegmentDecision, SegmentMode};
use crate::{CoreError, Result};

/// Output frame geometry and encoder preset shared by all commands a build
/// produces for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub preset: &'static str,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self { width: 1080, height: 1920, preset: "veryfast" }
    }
}

/// Outcome of running one external command: exit status and captured stderr.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stderr: String,
}

/// The narrow interface the renderer needs from whatever actually spawns
/// processes. Implemented against `tokio::process::Command` in the binary;
/// swapped for a recording fake in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String]) -> CommandOutput;
}

/// One segment's render output on disk, ready for the concat manifest.
#[derive(Debug, Clone)]
pub struct RenderedSegment {
    pub start: f64,
    pub end: f64,
    pub mode: SegmentMode,
    pub path: PathBuf,
}

/// Builds ffmpeg argv sequences. Holds no I/O state.
pub struct FfmpegCommandBuilder {
    target: RenderTarget,
}

impl FfmpegCommandBuilder {
    pub fn new(target: RenderTarget) -> Self {
        Self { target }
    }

    /// Chooses the portrait-crop or landscape-blur filter for `segment`.
    pub fn build_segment_command(&self, source_video: &Path, segment: &SegmentDecision, output_path: &Path) -> Vec<String> {
        match segment.mode {
            SegmentMode::Portrait => self.portrait_command(source_video, segment, output_path),
            SegmentMode::LandscapeBlur => self.landscape_blur_command(source_video, segment, output_path),
        }
    }

    /// `ffmpeg -f concat` over the manifest at `concat_file`, stream-copied.
    pub fn build_concat_command(&self, concat_file: &Path, output_path: &Path) -> Vec<String> {
        string_vec([
            "ffmpeg",
            "-y",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
            &path_str(concat_file),
            "-c",
            "copy",
            &path_str(output_path),
        ])
    }

    /// Burns an ASS subtitle track from `source_video` into `output_path`.
    pub fn build_subtitle_burn_command(&self, source_video: &Path, subtitle_path: &Path, output_path: &Path) -> Vec<String> {
        let escaped = path_str(subtitle_path).replace('\\', "/").replace(':', "\\:");
        string_vec([
            "ffmpeg",
            "-y",
            "-i",
            &path_str(source_video),
            "-vf",
            &format!("ass='{escaped}'"),
            "-c:v",
            "libx264",
            "-preset",
            self.target.preset,
            "-c:a",
            "aac",
            &path_str(output_path),
        ])
    }

    fn portrait_command(&self, source_video: &Path, segment: &SegmentDecision, output_path: &Path) -> Vec<String> {
        let crop_filter = format!(
            "crop='min(iw,ih*9/16)':'min(ih,iw*16/9)':x='max(0,min(iw-ow,{:.6}*iw-ow/2))':y='max(0,min(ih-oh,{:.6}*ih-oh/2))',scale={}:{},setsar=1",
            segment.crop_center_x, segment.crop_center_y, self.target.width, self.target.height,
        );
        string_vec([
            "ffmpeg",
            "-y",
            "-ss",
            &format!("{:.3}", segment.start),
            "-to",
            &format!("{:.3}", segment.end),
            "-i",
            &path_str(source_video),
            "-vf",
            &crop_filter,
            "-c:v",
            "libx264",
            "-preset",
            self.target.preset,
            "-crf",
            "21",
            "-c:a",
            "aac",
            &path_str(output_path),
        ])
    }

    fn landscape_blur_command(&self, source_video: &Path, segment: &SegmentDecision, output_path: &Path) -> Vec<String> {
        let (w, h) = (self.target.width, self.target.height);
        let filter_complex = format!(
            "[0:v]scale={w}:{h}:force_original_aspect_ratio=increase,boxblur=20:10[bg];[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease[fg];[bg][fg]overlay=(W-w)/2:(H-h)/2,setsar=1[v]"
        );
        string_vec([
            "ffmpeg",
            "-y",
            "-ss",
            &format!("{:.3}", segment.start),
            "-to",
            &format!("{:.3}", segment.end),
            "-i",
            &path_str(source_video),
            "-filter_complex",
            &filter_complex,
            "-map",
            "[v]",
            "-map",
            "0:a?",
            "-c:v",
            "libx264",
            "-preset",
            self.target.preset,
            "-crf",
            "22",
            "-c:a",
            "aac",
            &path_str(output_path),
        ])
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn string_vec<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Orchestrates one clip's segment → concat → subtitle-burn sequence,
/// always cleaning up its temp directory.
pub struct AdaptiveClipRenderer<'a> {
    builder: FfmpegCommandBuilder,
    runner: &'a dyn CommandRunner,
}

impl<'a> AdaptiveClipRenderer<'a> {
    pub fn new(target: RenderTarget, runner: &'a dyn CommandRunner) -> Self {
        Self { builder: FfmpegCommandBuilder::new(target), runner }
    }

    /// Renders `segments` against `source_video`, producing `output_path`.
    /// Fails with [`CoreError::InvalidInput`] if `segments` is empty, and
    /// with [`CoreError::RenderFailed`] (carrying the failing command's
    /// stderr) if any external command exits non-zero.
    pub async fn render_clip(
        &self,
        source_video: &Path,
        segments: &[SegmentDecision],
        output_path: &Path,
        subtitle_path: Option<&Path>,
    ) -> Result<PathBuf> {
        if segments.is_empty() {
            return Err(CoreError::InvalidInput("segments cannot be empty".into()));
        }
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_dir = output_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!(".autoclipper-render-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&temp_dir)?;

        let result = self.render_inner(source_video, segments, output_path, subtitle_path, &temp_dir).await;
        let _ = std::fs::remove_dir_all(&temp_dir);
        result
    }

    async fn render_inner(
        &self,
        source_video: &Path,
        segments: &[SegmentDecision],
        output_path: &Path,
        subtitle_path: Option<&Path>,
        temp_dir: &Path,
    ) -> Result<PathBuf> {
        let rendered = self.render_segments(source_video, segments, temp_dir).await?;
        let concat_output = temp_dir.join("concat.mp4");
        self.concat_segments(&rendered, &concat_output, temp_dir).await?;

        match subtitle_path {
            None => {
                std::fs::copy(&concat_output, output_path)?;
            }
            Some(subtitle_path) => {
                let command = self.builder.build_subtitle_burn_command(&concat_output, subtitle_path, output_path);
                self.run(&command).await?;
            }
        }
        Ok(output_path.to_path_buf())
    }

    async fn render_segments(
        &self,
        source_video: &Path,
        segments: &[SegmentDecision],
        temp_dir: &Path,
    ) -> Result<Vec<RenderedSegment>> {
        let mut rendered = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let target = temp_dir.join(format!("segment_{index:03}.mp4"));
            let command = self.builder.build_segment_command(source_video, segment, &target);
            self.run(&command).await?;
            rendered.push(RenderedSegment {
                start: segment.start,
                end: segment.end,
                mode: segment.mode,
                path: target,
            });
        }
        Ok(rendered)
    }

    async fn concat_segments(&self, segments: &[RenderedSegment], output_path: &Path, temp_dir: &Path) -> Result<()> {
        let concat_file = temp_dir.join("concat.txt");
        let mut manifest = String::new();
        for item in segments {
            manifest.push_str(&format!("file '{}'\n", item.path.to_string_lossy()));
        }
        std::fs::write(&concat_file, manifest)?;

        let command = self.builder.build_concat_command(&concat_file, output_path);
        self.run(&command).await
    }

    async fn run(&self, command: &[String]) -> Result<()> {
        let output = self.runner.run(command).await;
        if output.success {
            Ok(())
        } else {
            Err(CoreError::RenderFailed(format!(
                "command failed: {}\n{}",
                command.join(" "),
                output.stderr.trim()
            )))
        }
    }
}
