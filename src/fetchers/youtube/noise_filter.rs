//! Фильтрация шумовых пометок: [Music], (Applause), ♪ ... ♪
//!
//! Используется частичное совпадение, чтобы сохранить текст вида
//! "[Speaker 1] Hello".

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::YoutubeTimedText;

static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\[.*?\]",
        r"\(.*?\)",
        r"♪.*?♪",
        r"🎵.*?🎵",
        r"🎶.*?🎶",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

fn filter_noise_text(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in NOISE_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").into_owned();
    }
    result
}

/// Удалить шумовые пометки из сегментов; сегменты, оставшиеся пустыми,
/// удаляются целиком. Тайминги событий не меняются.
pub fn filter_noise_from_events(events: &[YoutubeTimedText]) -> Vec<YoutubeTimedText> {
    events
        .iter()
        .map(|event| {
            let Some(segs) = &event.segs else {
                return event.clone();
            };

            let filtered = segs
                .iter()
                .map(|seg| {
                    let mut seg = seg.clone();
                    seg.utf8 = filter_noise_text(&seg.utf8);
                    seg
                })
                .filter(|seg| !seg.utf8.trim().is_empty())
                .collect();

            YoutubeTimedText {
                segs: Some(filtered),
                ..event.clone()
            }
        })
        .collect()
}
