//! Multi-signal hook scorer.
//!
//! Combines an LLM-proposed hook's own emotion/semantic/confidence scores
//! with two signals computed directly from word timing: a speech-rate spike
//! detector and an impact-keyword density. Nothing here calls an LLM — the
//! `llm_hooks` input is already-scored candidate spans handed in by the
//! caller.

use std::collections::HashSet;
use std::sync::OnceLock;

/// A single transcript word with its time span, in seconds.
#[derive(Debug, Clone)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// One LLM-proposed hook span awaiting multi-signal scoring.
#[derive(Debug, Clone)]
pub struct LlmHook {
    pub start: f64,
    pub end: f64,
    pub semantic_score: f64,
    pub emotion_score: f64,
    pub confidence: f64,
    pub reason: String,
}

/// A scored, surviving hook candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct HookCandidate {
    pub start: f64,
    pub end: f64,
    pub viral_score: i32,
    pub emotion_score: f64,
    pub speech_spike: bool,
    pub confidence: f64,
    pub reason: String,
}

fn impact_keywords() -> &'static HashSet<&'static str> {
    static KEYWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        [
            "shocking", "secret", "mistake", "truth", "viral", "insane", "gila", "rahasia", "penting", "jangan",
        ]
        .into_iter()
        .collect()
    })
}

const WINDOW_SEC: f64 = 5.0;

struct RateWindow {
    start: f64,
    end: f64,
    rate: f64,
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| ".,!?\"'()[]{}".contains(c))
}

/// Scores and ranks LLM hook candidates using speech-rate and keyword-density
/// signals computed from the transcript's word timings.
pub struct HookScorer;

impl HookScorer {
    /// Returns the top `max_clips` candidates scoring at least `min_viral_score`,
    /// sorted by `viral_score` descending. Returns an empty list if `llm_hooks`
    /// is empty, without inspecting `words`.
    pub fn detect(
        &self,
        words: &[WordTimestamp],
        llm_hooks: &[LlmHook],
        max_clips: usize,
        min_viral_score: i32,
    ) -> Vec<HookCandidate> {
        if llm_hooks.is_empty() {
            return Vec::new();
        }

        let speed_windows = Self::speech_speed_windows(words);
        let keyword_windows = Self::keyword_windows(words);

        let mut candidates: Vec<HookCandidate> = llm_hooks
            .iter()
            .filter(|hook| hook.end > hook.start)
            .filter_map(|hook| {
                let emotion_score = clamp01(hook.emotion_score);
                let semantic_score = clamp01(hook.semantic_score);
                let confidence = clamp01(hook.confidence);
                let speech_spike = Self::has_speech_spike(&speed_windows, hook.start, hook.end);
                let keyword_score = Self::keyword_score_in_range(&keyword_windows, hook.start, hook.end);

                let viral_score = ((0.30 * emotion_score
                    + 0.25 * semantic_score
                    + 0.25 * if speech_spike { 1.0 } else { 0.0 }
                    + 0.20 * keyword_score)
                    * 100.0)
                    .floor() as i32;
                let viral_score = viral_score.clamp(0, 100);

                if viral_score < min_viral_score {
                    return None;
                }

                Some(HookCandidate {
                    start: hook.start,
                    end: hook.end,
                    viral_score,
                    emotion_score,
                    speech_spike,
                    confidence,
                    reason: hook.reason.clone(),
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.viral_score.cmp(&a.viral_score));
        candidates.truncate(max_clips);
        candidates
    }

    fn word_span(words: &[WordTimestamp]) -> Option<(f64, f64)> {
        let start = words.iter().map(|w| w.start).fold(f64::INFINITY, f64::min);
        let end = words.iter().map(|w| w.end).fold(f64::NEG_INFINITY, f64::max);
        (!words.is_empty()).then_some((start, end))
    }

    fn speech_speed_windows(words: &[WordTimestamp]) -> Vec<RateWindow> {
        let Some((start, end)) = Self::word_span(words) else {
            return Vec::new();
        };

        let mut windows = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let window_end = (cursor + WINDOW_SEC).min(end);
            let count = words.iter().filter(|w| w.start >= cursor && w.start < window_end).count();
            let duration = (window_end - cursor).max(0.1);
            windows.push(RateWindow {
                start: cursor,
                end: window_end,
                rate: count as f64 / duration,
            });
            cursor += WINDOW_SEC;
        }
        windows
    }

    fn keyword_windows(words: &[WordTimestamp]) -> Vec<RateWindow> {
        let Some((start, end)) = Self::word_span(words) else {
            return Vec::new();
        };

        let keywords = impact_keywords();
        let mut windows = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let window_end = (cursor + WINDOW_SEC).min(end);
            let window_words: Vec<&WordTimestamp> =
                words.iter().filter(|w| w.start >= cursor && w.start < window_end).collect();

            let rate = if window_words.is_empty() {
                0.0
            } else {
                let hits = window_words
                    .iter()
                    .filter(|w| keywords.contains::<str>(strip_punctuation(&w.word.to_lowercase()).as_ref()))
                    .count();
                hits as f64 / window_words.len() as f64
            };

            windows.push(RateWindow { start: cursor, end: window_end, rate });
            cursor += WINDOW_SEC;
        }
        windows
    }

    fn has_speech_spike(windows: &[RateWindow], start: f64, end: f64) -> bool {
        if windows.is_empty() {
            return false;
        }
        let rates: Vec<f64> = windows.iter().map(|w| w.rate).collect();
        let baseline = rates.iter().sum::<f64>() / rates.len() as f64;
        let deviation = population_stddev(&rates, baseline);
        let threshold = baseline + deviation.max(0.2);

        windows
            .iter()
            .filter(|w| w.start < end && w.end > start)
            .any(|w| w.rate > threshold)
    }

    fn keyword_score_in_range(windows: &[RateWindow], start: f64, end: f64) -> f64 {
        let target: Vec<f64> = windows
            .iter()
            .filter(|w| w.start < end && w.end > start)
            .map(|w| w.rate)
            .collect();
        if target.is_empty() {
            return 0.0;
        }
        clamp01(target.iter().sum::<f64>() / target.len() as f64)
    }
}

fn population_stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> WordTimestamp {
        WordTimestamp { word: text.to_string(), start, end }
    }

    fn hook(start: f64, end: f64, emotion: f64, semantic: f64, confidence: f64) -> LlmHook {
        LlmHook {
            start,
            end,
            semantic_score: semantic,
            emotion_score: emotion,
            confidence,
            reason: "scored by multi-signal detector".to_string(),
        }
    }

    #[test]
    fn empty_llm_hooks_short_circuits_without_inspecting_words() {
        let scorer = HookScorer;
        let out = scorer.detect(&[], &[], 10, 60);
        assert!(out.is_empty());
    }

    #[test]
    fn zero_or_negative_duration_hook_is_discarded() {
        let scorer = HookScorer;
        let words = vec![word("hello", 0.0, 0.5)];
        let hooks = vec![hook(5.0, 5.0, 0.9, 0.9, 0.9)];
        let out = scorer.detect(&words, &hooks, 10, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn high_signal_hook_survives_and_scores_near_ceiling() {
        let scorer = HookScorer;
        let words: Vec<WordTimestamp> = (0..50)
            .map(|i| word("shocking", i as f64 * 0.1, i as f64 * 0.1 + 0.05))
            .collect();
        let hooks = vec![hook(0.0, 3.0, 1.0, 1.0, 1.0)];

        let out = scorer.detect(&words, &hooks, 10, 60);
        assert_eq!(out.len(), 1);
        assert!(out[0].viral_score >= 60);
    }

    #[test]
    fn low_min_viral_score_filters_weak_candidates() {
        let scorer = HookScorer;
        let words = vec![word("ok", 0.0, 0.5), word("fine", 1.0, 1.5)];
        let hooks = vec![hook(0.0, 2.0, 0.1, 0.1, 0.1)];

        let out = scorer.detect(&words, &hooks, 10, 90);
        assert!(out.is_empty());
    }

    #[test]
    fn results_sorted_descending_and_truncated_to_max_clips() {
        let scorer = HookScorer;
        let words = vec![word("hello", 0.0, 0.5)];
        let hooks = vec![
            hook(0.0, 1.0, 0.4, 0.4, 0.4),
            hook(2.0, 3.0, 0.95, 0.95, 0.95),
            hook(4.0, 5.0, 0.6, 0.6, 0.6),
        ];

        let out = scorer.detect(&words, &hooks, 2, 0);
        assert_eq!(out.len(), 2);
        assert!(out[0].viral_score >= out[1].viral_score);
    }

    #[test]
    fn scores_and_speech_spike_are_clamped_and_deterministic() {
        let scorer = HookScorer;
        let words = vec![word("a", 0.0, 0.1), word("b", 0.2, 0.3)];
        let hooks = vec![hook(0.0, 1.0, 2.0, -1.0, 5.0)];

        let out = scorer.detect(&words, &hooks, 10, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].emotion_score, 1.0);
        assert_eq!(out[0].confidence, 1.0);
        assert!((0..=100).contains(&out[0].viral_score));
    }
}
