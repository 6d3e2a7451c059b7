//! Input validation and normalization: YouTube URL vs local file.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::{CoreError, Result};

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be", "www.youtu.be"];
const ALLOWED_LOCAL_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "m4v"];
const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

/// A normalized, validated job input.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSource {
    pub source_type: SourceType,
    pub raw_input: String,
    pub normalized_input: String,
    pub display_name: String,
    pub local_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Youtube,
    Local,
}

/// Strips anything but `[A-Za-z0-9._-]`, collapses repeated `_`, trims
/// leading/trailing `._- `, and falls back to `default` if nothing survives.
pub fn sanitize_filename(name: &str, default: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut last_was_replaced = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            cleaned.push(ch);
            last_was_replaced = false;
        } else if !last_was_replaced {
            cleaned.push('_');
            last_was_replaced = true;
        }
    }

    let collapsed = collapse_underscores(&cleaned);
    let trimmed = collapsed.trim_matches(|c: char| "._- ".contains(c));
    let result = if trimmed.is_empty() { default } else { trimmed };
    result.chars().take(255).collect()
}

fn collapse_underscores(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_underscore = false;
    for ch in value.chars() {
        if ch == '_' {
            if !prev_underscore {
                out.push(ch);
            }
            prev_underscore = true;
        } else {
            out.push(ch);
            prev_underscore = false;
        }
    }
    out
}

/// Validates and normalizes raw job-creation input into a canonical source.
pub struct InputNormalizer {
    max_local_file_bytes: u64,
}

impl InputNormalizer {
    pub fn new(max_local_file_gib: u64) -> Self {
        Self { max_local_file_bytes: max_local_file_gib * BYTES_PER_GIB }
    }

    pub fn normalize(&self, raw_input: &str) -> Result<InputSource> {
        let raw = raw_input.trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidInput("input source cannot be empty".into()));
        }

        if let Some(video_url) = self.try_parse_youtube(raw)? {
            return Ok(InputSource {
                source_type: SourceType::Youtube,
                raw_input: raw_input.to_string(),
                normalized_input: video_url.clone(),
                display_name: sanitize_filename(&video_url, "youtube_video"),
                local_path: None,
            });
        }

        self.normalize_local_path(raw_input, raw)
    }

    fn try_parse_youtube(&self, raw: &str) -> Result<Option<String>> {
        let Ok(url) = url::Url::parse(raw) else {
            return Ok(None);
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return Ok(None);
        }
        let Some(host) = url.host_str() else {
            return Ok(None);
        };
        let host = host.to_lowercase();
        if !YOUTUBE_HOSTS.contains(&host.as_str()) {
            return Ok(None);
        }

        let video_id = if host.ends_with("youtu.be") {
            url.path().trim_matches('/').to_string()
        } else {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        };

        let id_pattern = Regex::new(r"^[A-Za-z0-9_-]{6,20}$").expect("valid static regex");
        if !id_pattern.is_match(&video_id) {
            return Err(CoreError::InvalidInput("invalid YouTube video id".into()));
        }

        Ok(Some(format!("https://www.youtube.com/watch?v={video_id}")))
    }

    fn normalize_local_path(&self, raw_input: &str, raw: &str) -> Result<InputSource> {
        let local_path = expand_home(Path::new(raw));
        let metadata = std::fs::metadata(&local_path)
            .map_err(|_| CoreError::InvalidInput(format!("local file does not exist: {}", local_path.display())))?;

        if !metadata.is_file() {
            return Err(CoreError::InvalidInput(format!("input must be a file: {}", local_path.display())));
        }

        let extension = local_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_LOCAL_EXTENSIONS.contains(&extension.as_str()) {
            return Err(CoreError::InvalidInput(format!(
                "unsupported file extension '.{extension}'. allowed: {ALLOWED_LOCAL_EXTENSIONS:?}"
            )));
        }

        if metadata.len() == 0 {
            return Err(CoreError::InvalidInput("local file is empty".into()));
        }
        if metadata.len() > self.max_local_file_bytes {
            return Err(CoreError::InvalidInput("local file exceeds max supported size".into()));
        }

        let resolved = std::fs::canonicalize(&local_path)
            .map_err(|e| CoreError::InvalidInput(format!("failed to resolve local path: {e}")))?;
        let stem = resolved.file_stem().and_then(|s| s.to_str()).unwrap_or_default();

        Ok(InputSource {
            source_type: SourceType::Local,
            raw_input: raw_input.to_string(),
            normalized_input: resolved.to_string_lossy().into_owned(),
            display_name: sanitize_filename(stem, "local_video"),
            local_path: Some(resolved),
        })
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(stripped),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sanitize_filename_replaces_unsafe_characters_and_collapses_runs() {
        assert_eq!(sanitize_filename("hello world!!.mp4", "file"), "hello_world.mp4");
        assert_eq!(sanitize_filename("   ", "default"), "default");
        assert_eq!(sanitize_filename("../../etc/passwd", "default"), "etc_passwd");
    }

    #[test]
    fn empty_input_is_rejected() {
        let normalizer = InputNormalizer::new(25);
        let err = normalizer.normalize("   ").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn youtube_watch_url_normalizes_to_canonical_form() {
        let normalizer = InputNormalizer::new(25);
        let source = normalizer.normalize("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=5").unwrap();
        assert_eq!(source.source_type, SourceType::Youtube);
        assert_eq!(source.normalized_input, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn youtu_be_short_url_extracts_video_id_from_path() {
        let normalizer = InputNormalizer::new(25);
        let source = normalizer.normalize("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(source.normalized_input, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn youtube_url_with_invalid_video_id_is_rejected() {
        let normalizer = InputNormalizer::new(25);
        let err = normalizer.normalize("https://www.youtube.com/watch?v=a").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn non_youtube_url_falls_through_to_local_path_handling_and_fails_not_found() {
        let normalizer = InputNormalizer::new(25);
        let err = normalizer.normalize("https://example.com/video.mp4").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn local_path_with_disallowed_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.txt");
        std::fs::write(&path, b"not a video").unwrap();

        let normalizer = InputNormalizer::new(25);
        let err = normalizer.normalize(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn empty_local_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::File::create(&path).unwrap();

        let normalizer = InputNormalizer::new(25);
        let err = normalizer.normalize(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn valid_local_file_normalizes_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my clip!.mp4");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"fake video bytes").unwrap();

        let normalizer = InputNormalizer::new(25);
        let source = normalizer.normalize(path.to_str().unwrap()).unwrap();

        assert_eq!(source.source_type, SourceType::Local);
        assert_eq!(source.display_name, "my_clip.mp4");
        assert!(source.local_path.is_some());
    }
}
