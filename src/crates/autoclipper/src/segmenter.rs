//! Deterministic face-window to segment-decision algorithm.
//!
//! Turns per-frame face samples over a clip range into a stable, gap-free
//! sequence of portrait/landscape render instructions: tile the range into
//! fixed windows, decide a mode per window, merge adjacent equal modes,
//! suppress short flicker segments, then exponentially smooth crop centers.

use crate::{CoreError, Result};

/// A single detected face within one sampled frame, in normalized `[0,1]`
/// frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceBox {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// All faces detected in a single sampled frame.
#[derive(Debug, Clone)]
pub struct FrameFaces {
    pub timestamp: f64,
    pub faces: Vec<FaceBox>,
}

/// Render mode for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    Portrait,
    LandscapeBlur,
}

/// One decided segment: a contiguous time range with a render mode and a
/// damped crop center.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDecision {
    pub start: f64,
    pub end: f64,
    pub mode: SegmentMode,
    pub crop_center_x: f64,
    pub crop_center_y: f64,
    pub face_count: u32,
}

/// Tunable thresholds for the analyzer, clamped to their documented ranges.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    pub segment_duration_sec: f64,
    pub min_switch_duration_sec: f64,
    pub crop_damping: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            segment_duration_sec: 2.0,
            min_switch_duration_sec: 1.2,
            crop_damping: 0.65,
        }
    }
}

impl SegmenterConfig {
    pub fn new(segment_duration_sec: f64, min_switch_duration_sec: f64, crop_damping: f64) -> Self {
        Self {
            segment_duration_sec: segment_duration_sec.max(0.25),
            min_switch_duration_sec: min_switch_duration_sec.max(0.25),
            crop_damping: crop_damping.clamp(0.0, 0.95),
        }
    }
}

/// Runs the full windowing → merge → anti-flicker → smoothing pipeline.
pub struct FaceAnalyzer {
    config: SegmenterConfig,
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

impl FaceAnalyzer {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Produces the final, smoothed segment sequence for `[clip_start, clip_end)`.
    pub fn analyze(
        &self,
        frame_samples: &[FrameFaces],
        clip_start: f64,
        clip_end: f64,
    ) -> Result<Vec<SegmentDecision>> {
        if clip_end <= clip_start {
            return Err(CoreError::InvalidInput(
                "clip_end must be greater than clip_start".into(),
            ));
        }

        let windows = self.window_ranges(clip_start, clip_end);
        let decisions: Vec<SegmentDecision> = windows
            .into_iter()
            .map(|(start, end)| self.analyze_window(frame_samples, start, end))
            .collect();

        let merged = self.merge_adjacent(decisions);
        let stable = self.apply_anti_flicker(merged);
        Ok(self.smooth_crop_centers(stable))
    }

    fn window_ranges(&self, start: f64, end: f64) -> Vec<(f64, f64)> {
        let mut ranges = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let next_edge = (cursor + self.config.segment_duration_sec).min(end);
            ranges.push((cursor, next_edge));
            cursor = next_edge;
        }
        ranges
    }

    fn analyze_window(&self, frame_samples: &[FrameFaces], start: f64, end: f64) -> SegmentDecision {
        let empty_decision = |start: f64, end: f64| SegmentDecision {
            start,
            end,
            mode: SegmentMode::LandscapeBlur,
            crop_center_x: 0.5,
            crop_center_y: 0.5,
            face_count: 0,
        };

        let window: Vec<&FrameFaces> = frame_samples
            .iter()
            .filter(|f| f.timestamp >= start && f.timestamp < end)
            .collect();
        if window.is_empty() {
            return empty_decision(start, end);
        }

        let non_empty: Vec<&FrameFaces> = window.into_iter().filter(|f| !f.faces.is_empty()).collect();
        if non_empty.is_empty() {
            return empty_decision(start, end);
        }

        let count = non_empty.len() as f64;
        let avg_count = non_empty.iter().map(|f| f.faces.len() as f64).sum::<f64>() / count;

        let primaries: Vec<FaceBox> = non_empty
            .iter()
            .map(|f| {
                *f.faces
                    .iter()
                    .max_by(|a, b| a.area().partial_cmp(&b.area()).unwrap())
                    .expect("non-empty faces")
            })
            .collect();

        let avg_area = primaries.iter().map(FaceBox::area).sum::<f64>() / count;
        let center_x = primaries.iter().map(FaceBox::center_x).sum::<f64>() / count;
        let center_y = primaries.iter().map(FaceBox::center_y).sum::<f64>() / count;

        let mode = if avg_count >= 1.5 {
            SegmentMode::LandscapeBlur
        } else if avg_area >= 0.02 {
            SegmentMode::Portrait
        } else {
            SegmentMode::LandscapeBlur
        };

        SegmentDecision {
            start,
            end,
            mode,
            crop_center_x: clamp01(center_x),
            crop_center_y: clamp01(center_y),
            face_count: avg_count.round() as u32,
        }
    }

    fn merge_adjacent(&self, segments: Vec<SegmentDecision>) -> Vec<SegmentDecision> {
        let mut merged: Vec<SegmentDecision> = Vec::with_capacity(segments.len());
        for current in segments {
            match merged.last_mut() {
                Some(prev) if prev.mode == current.mode => {
                    let duration_a = (prev.end - prev.start).max(0.01);
                    let duration_b = (current.end - current.start).max(0.01);
                    let combined = duration_a + duration_b;
                    prev.end = current.end;
                    prev.crop_center_x =
                        (prev.crop_center_x * duration_a + current.crop_center_x * duration_b) / combined;
                    prev.crop_center_y =
                        (prev.crop_center_y * duration_a + current.crop_center_y * duration_b) / combined;
                    prev.face_count =
                        (((prev.face_count as f64) * duration_a + (current.face_count as f64) * duration_b)
                            / combined)
                            .round() as u32;
                }
                _ => merged.push(current),
            }
        }
        merged
    }

    fn apply_anti_flicker(&self, segments: Vec<SegmentDecision>) -> Vec<SegmentDecision> {
        if segments.len() <= 2 {
            return segments;
        }

        let mut stabilized = Vec::with_capacity(segments.len());
        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate() {
            if index == 0 || index == last {
                stabilized.push(segment.clone());
                continue;
            }

            let duration = segment.end - segment.start;
            let prev_mode = segments[index - 1].mode;
            let next_mode = segments[index + 1].mode;

            if duration < self.config.min_switch_duration_sec && prev_mode == next_mode {
                let prev = &segments[index - 1];
                let next = &segments[index + 1];
                stabilized.push(SegmentDecision {
                    start: segment.start,
                    end: segment.end,
                    mode: prev_mode,
                    crop_center_x: (prev.crop_center_x + next.crop_center_x) / 2.0,
                    crop_center_y: (prev.crop_center_y + next.crop_center_y) / 2.0,
                    face_count: ((prev.face_count + next.face_count) as f64 / 2.0).round() as u32,
                });
            } else {
                stabilized.push(segment.clone());
            }
        }

        self.merge_adjacent(stabilized)
    }

    fn smooth_crop_centers(&self, segments: Vec<SegmentDecision>) -> Vec<SegmentDecision> {
        let Some(first) = segments.first() else {
            return Vec::new();
        };

        let mut prev_x = first.crop_center_x;
        let mut prev_y = first.crop_center_y;
        let damping = self.config.crop_damping;

        segments
            .into_iter()
            .map(|segment| {
                let next_x = clamp01(damping * prev_x + (1.0 - damping) * segment.crop_center_x);
                let next_y = clamp01(damping * prev_y + (1.0 - damping) * segment.crop_center_y);
                prev_x = next_x;
                prev_y = next_y;
                SegmentDecision {
                    crop_center_x: next_x,
                    crop_center_y: next_y,
                    ..segment
                }
            })
            .collect()
    }
}
