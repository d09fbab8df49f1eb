//! Определение формата потока timed-text событий
//!
//! YouTube отдаёт субтитры в трёх видах:
//! - обычные реплики, каждое событие это законченная строка;
//! - караоке, где одна строка раскрывается по словам и каждое следующее
//!   событие повторяет предыдущее с добавкой;
//! - прокручиваемые ASR окна с `aAppend` или перекрывающимися событиями.

use serde::Serialize;

use super::types::YoutubeTimedText;
use crate::utils::text::is_cjk_char;

/// Доля перекрывающихся соседних событий, начиная с которой поток
/// считается прокручиваемым ASR
const SCROLLING_OVERLAP_RATIO: f64 = 0.5;

/// Доля пар "текст продолжает предыдущий", начиная с которой поток
/// считается караоке
const KARAOKE_EXTENSION_RATIO: f64 = 0.3;

/// Формат субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtitlesFormat {
    Standard,
    Karaoke,
    ScrollingAsr,
}

impl SubtitlesFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Karaoke => "karaoke",
            Self::ScrollingAsr => "scrolling-asr",
        }
    }
}

impl std::fmt::Display for SubtitlesFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Продолжает ли `next` текст `prev` (равен ему или дописывает слова)
pub(crate) fn extends_text(prev: &str, next: &str) -> bool {
    let prev = prev.trim();
    let next = next.trim();
    if prev.is_empty() || !next.starts_with(prev) {
        return false;
    }

    let rest = &next[prev.len()..];
    let Some(first_added) = rest.chars().next() else {
        return true;
    };

    // Для CJK граница слова не нужна
    first_added.is_whitespace()
        || is_cjk_char(first_added)
        || prev.chars().last().is_some_and(is_cjk_char)
}

/// Классифицировать поток событий (после фильтрации шума)
pub fn detect_format(events: &[YoutubeTimedText]) -> SubtitlesFormat {
    if events.iter().any(|e| e.is_append()) {
        return SubtitlesFormat::ScrollingAsr;
    }

    let text_events: Vec<&YoutubeTimedText> = events.iter().filter(|e| e.has_text()).collect();
    if text_events.len() < 2 {
        return SubtitlesFormat::Standard;
    }

    let pairs = (text_events.len() - 1) as f64;
    let mut extensions = 0usize;
    let mut overlaps = 0usize;

    for pair in text_events.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if extends_text(&prev.text(), &next.text()) {
            extensions += 1;
        }
        if prev.d_duration_ms.is_some() && prev.end_ms() > next.t_start_ms {
            overlaps += 1;
        }
    }

    if extensions as f64 / pairs >= KARAOKE_EXTENSION_RATIO {
        return SubtitlesFormat::Karaoke;
    }

    if overlaps as f64 / pairs > SCROLLING_OVERLAP_RATIO {
        return SubtitlesFormat::ScrollingAsr;
    }

    SubtitlesFormat::Standard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::youtube::types::YoutubeTimedTextSeg as Seg;

    fn event(start: u64, duration: u64, text: &str) -> YoutubeTimedText {
        YoutubeTimedText::new(start, duration, vec![Seg::new(text)])
    }

    #[test]
    fn discrete_cues_are_standard() {
        let events = vec![
            event(0, 1000, "Hello there."),
            event(1000, 1500, "How are you?"),
            event(2500, 1000, "Fine, thanks."),
        ];
        assert_eq!(detect_format(&events), SubtitlesFormat::Standard);
    }

    #[test]
    fn append_events_mean_scrolling_asr() {
        let mut newline = event(500, 0, "\n");
        newline.a_append = Some(1);
        let events = vec![event(0, 3000, "hello"), newline, event(1000, 3000, "world")];
        assert_eq!(detect_format(&events), SubtitlesFormat::ScrollingAsr);
    }

    #[test]
    fn mostly_overlapping_windows_mean_scrolling_asr() {
        let events = vec![
            event(0, 4000, "so today we"),
            event(1500, 4000, "are going to"),
            event(3000, 4000, "talk about rust"),
            event(4500, 4000, "and its ownership"),
        ];
        assert_eq!(detect_format(&events), SubtitlesFormat::ScrollingAsr);
    }

    #[test]
    fn growing_lines_are_karaoke() {
        let events = vec![
            event(0, 500, "Never"),
            event(500, 500, "Never gonna"),
            event(1000, 500, "Never gonna give"),
            event(1500, 500, "Never gonna give you up"),
            event(2000, 500, "Never"),
            event(2500, 500, "Never gonna let"),
        ];
        assert_eq!(detect_format(&events), SubtitlesFormat::Karaoke);
    }

    #[test]
    fn prefix_needs_word_boundary() {
        assert!(extends_text("Never", "Never gonna"));
        assert!(extends_text("Never", "Never"));
        assert!(!extends_text("I", "It is"));
        assert!(extends_text("你好", "你好世界"));
        assert!(!extends_text("", "anything"));
    }

    #[test]
    fn empty_and_textless_streams_are_standard() {
        assert_eq!(detect_format(&[]), SubtitlesFormat::Standard);
        let bare = YoutubeTimedText {
            t_start_ms: 0,
            d_duration_ms: Some(1000),
            ..Default::default()
        };
        assert_eq!(detect_format(&[bare]), SubtitlesFormat::Standard);
    }
}
