//! Преобразование timed-text событий в плоский список реплик
//!
//! Время начала каждой реплики берётся из событий без изменений. Конец
//! реплики обрезается только там, где она налезает на следующую, чтобы
//! список оставался неперекрывающимся.

use super::format_detector::extends_text;
use super::types::YoutubeTimedText;
use crate::types::{sort_by_start, SubtitlesFragment};
use crate::utils::text::{is_cjk_language, is_mostly_cjk, join_text};

/// Длительность слова, если событие не задаёт ни длительности, ни соседа
const FALLBACK_WORD_DURATION_MS: u64 = 500;

/// Обычные реплики: одно событие, одна реплика
pub fn parse_standard_subtitles(events: &[YoutubeTimedText]) -> Vec<SubtitlesFragment> {
    let fragments = events
        .iter()
        .filter(|e| e.has_text())
        .filter_map(|event| {
            let duration = event.d_duration_ms.unwrap_or(0);
            if duration == 0 {
                return None;
            }
            Some(SubtitlesFragment::new(
                event.t_start_ms,
                event.t_start_ms + duration,
                normalize_text(&event.text()),
            ))
        })
        .collect();

    normalize_timeline(fragments)
}

/// Караоке: серия событий с растущим текстом схлопывается в одну реплику
/// с самым длинным текстом от начала первого события до конца последнего
pub fn parse_karaoke_subtitles(events: &[YoutubeTimedText]) -> Vec<SubtitlesFragment> {
    let mut fragments: Vec<SubtitlesFragment> = Vec::new();

    for event in events.iter().filter(|e| e.has_text()) {
        let text = normalize_text(&event.text());
        let end = event.end_ms().max(event.t_start_ms + 1);

        match fragments.last_mut() {
            Some(current) if extends_text(&current.text, &text) => {
                current.text = text;
                current.end = current.end.max(end);
            }
            _ => fragments.push(SubtitlesFragment::new(event.t_start_ms, end, text)),
        }
    }

    normalize_timeline(fragments)
}

/// Прокручиваемые ASR окна: реплика на каждое слово по `tOffsetMs`
///
/// Слово длится до начала следующего слова. Последнее слово события
/// заканчивается вместе с событием, но не позже начала следующего окна.
/// Служебные события `aAppend` (перевод строки) пропускаются.
pub fn parse_scrolling_asr_subtitles(
    events: &[YoutubeTimedText],
    language_code: &str,
) -> Vec<SubtitlesFragment> {
    let text_events: Vec<&YoutubeTimedText> = events
        .iter()
        .filter(|e| !e.is_append() && e.has_text())
        .collect();

    let mut fragments = Vec::new();

    for (i, event) in text_events.iter().enumerate() {
        let next_event_start = text_events.get(i + 1).map(|e| e.t_start_ms);
        let window_end = match (event.d_duration_ms, next_event_start) {
            (Some(d), Some(next)) if next > event.t_start_ms => (event.t_start_ms + d).min(next),
            (Some(d), _) if d > 0 => event.t_start_ms + d,
            (_, Some(next)) if next > event.t_start_ms => next,
            _ => event.t_start_ms + FALLBACK_WORD_DURATION_MS,
        };

        let Some(segs) = &event.segs else { continue };
        let timed = segs.iter().any(|s| s.t_offset_ms.is_some());

        if !timed {
            let cjk = is_cjk_language(language_code) || is_mostly_cjk(&event.text());
            let text = segs
                .iter()
                .fold(String::new(), |acc, seg| join_text(&acc, &seg.utf8, cjk));
            fragments.push(SubtitlesFragment::new(event.t_start_ms, window_end, text));
            continue;
        }

        let words: Vec<(u64, &str)> = segs
            .iter()
            .map(|s| (event.t_start_ms + s.t_offset_ms.unwrap_or(0), s.utf8.trim()))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        for (j, (start, text)) in words.iter().enumerate() {
            let end = match words.get(j + 1) {
                Some((next_start, _)) if next_start > start => *next_start,
                _ if window_end > *start => window_end,
                _ => start + FALLBACK_WORD_DURATION_MS,
            };
            fragments.push(SubtitlesFragment::new(*start, end, *text));
        }
    }

    normalize_timeline(fragments)
}

/// Переводы строк внутри реплики заменяются пробелами
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Отсортировать, слить реплики с одинаковым началом и обрезать перекрытия
fn normalize_timeline(mut fragments: Vec<SubtitlesFragment>) -> Vec<SubtitlesFragment> {
    sort_by_start(&mut fragments);

    let mut result: Vec<SubtitlesFragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        match result.last_mut() {
            Some(last) if last.start == fragment.start => {
                if !extends_text(&fragment.text, &last.text) {
                    let cjk = is_mostly_cjk(&last.text);
                    last.text = if extends_text(&last.text, &fragment.text) {
                        fragment.text
                    } else {
                        join_text(&last.text, &fragment.text, cjk)
                    };
                }
                last.end = last.end.max(fragment.end);
            }
            Some(last) => {
                if last.end > fragment.start {
                    last.end = fragment.start;
                }
                result.push(fragment);
            }
            None => result.push(fragment),
        }
    }

    result
}
