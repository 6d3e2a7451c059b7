//! ASS/SSA karaoke subtitle emitter.
//!
//! Groups consecutive words into dialogue events and tags each word with a
//! `{\k<cs>}` karaoke duration so a downstream burn-in renders per-word
//! highlight timing.

use std::path::{Path, PathBuf};

use crate::hooks::WordTimestamp;
use crate::{CoreError, Result};

/// ASS `[V4+ Styles]` row. Only one style is ever active per document.
#[derive(Debug, Clone)]
pub struct SubtitleStyle {
    pub name: &'static str,
    pub font_name: &'static str,
    pub font_size: u32,
    pub primary_colour: &'static str,
    pub secondary_colour: &'static str,
    pub outline_colour: &'static str,
    pub back_colour: &'static str,
    pub bold: u8,
    pub italic: u8,
    pub alignment: u8,
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            name: "Karaoke",
            font_name: "Arial",
            font_size: 64,
            primary_colour: "&H00FFFFFF",
            secondary_colour: "&H0000FFFF",
            outline_colour: "&H00000000",
            back_colour: "&H64000000",
            bold: 1,
            italic: 0,
            alignment: 2,
            margin_v: 90,
        }
    }
}

/// Emits ASS v4+ subtitle documents with karaoke timing.
pub struct SubtitleGenerator {
    style: SubtitleStyle,
}

impl SubtitleGenerator {
    pub fn new(style: SubtitleStyle) -> Self {
        Self { style }
    }

    /// Writes the ASS document to `output_path` and returns it. `words`
    /// need not be pre-sorted; `group_size` is clamped to at least 1.
    pub fn generate_ass(&self, words: &[WordTimestamp], output_path: &Path, group_size: usize) -> Result<PathBuf> {
        if words.is_empty() {
            return Err(CoreError::InvalidInput("words cannot be empty for subtitle generation".into()));
        }
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut sorted: Vec<&WordTimestamp> = words.iter().collect();
        sorted.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());

        let events = self.build_events(&sorted, group_size.max(1));
        let document = self.build_document(&events);
        std::fs::write(output_path, document)?;
        Ok(output_path.to_path_buf())
    }

    fn build_events(&self, words: &[&WordTimestamp], group_size: usize) -> Vec<String> {
        words
            .chunks(group_size)
            .map(|group| {
                let start = group.first().unwrap().start;
                let end = group.last().unwrap().end;
                let text = group
                    .iter()
                    .map(|item| {
                        let duration_cs = (((item.end - item.start) * 100.0).round() as i64).max(1);
                        format!("{{\\k{duration_cs}}}{}", item.word)
                    })
                    .collect::<Vec<_>>()
                    .join(" ");

                format!(
                    "Dialogue: 0,{},{},{},,0,0,0,,{}",
                    format_ass_time(start),
                    format_ass_time(end),
                    self.style.name,
                    text
                )
            })
            .collect()
    }

    fn build_document(&self, events: &[String]) -> String {
        let style = &self.style;
        let mut lines = vec![
            "[Script Info]".to_string(),
            "ScriptType: v4.00+".to_string(),
            "Collisions: Normal".to_string(),
            "PlayResX: 1080".to_string(),
            "PlayResY: 1920".to_string(),
            String::new(),
            "[V4+ Styles]".to_string(),
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
             Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, \
             Alignment, MarginL, MarginR, MarginV, Encoding"
                .to_string(),
            format!(
                "Style: {},{},{},{},{},{},{},{},{},0,0,100,100,0,0,1,2,1,{},40,40,{},1",
                style.name,
                style.font_name,
                style.font_size,
                style.primary_colour,
                style.secondary_colour,
                style.outline_colour,
                style.back_colour,
                style.bold,
                style.italic,
                style.alignment,
                style.margin_v,
            ),
            String::new(),
            "[Events]".to_string(),
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text".to_string(),
        ];
        lines.extend(events.iter().cloned());
        lines.join("\n") + "\n"
    }
}

fn format_ass_time(value: f64) -> String {
    let total_cs = ((value * 100.0).round() as i64).max(0);
    let centiseconds = total_cs % 100;
    let total_seconds = total_cs / 100;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{centiseconds:02}")
}
