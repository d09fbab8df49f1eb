//! Модуль оптимизации реплик без AI
//!
//! Короткие фрагменты (слова ASR, обрывки фраз) склеиваются в читаемые
//! строки, слишком длинные реплики делятся. Предпочтительная точка
//! разрыва это знак конца предложения.

use log::debug;

use crate::constants::{MAX_CHARS_CJK, MAX_GAP_MS, MAX_WORDS, MAX_WORDS_EXTENDED};
use crate::types::{sort_by_start, SubtitlesFragment};
use crate::utils::text::{cjk_length, ends_sentence, is_cjk_language, is_mostly_cjk, join_text, word_count};

/// Правила длины строки для конкретной письменности
#[derive(Debug, Clone, Copy)]
struct LengthRules {
    cjk: bool,
    limit: usize,
    extended_limit: usize,
}

impl LengthRules {
    fn for_text(source_language: &str, sample: &str) -> Self {
        let cjk = is_cjk_language(source_language) || is_mostly_cjk(sample);
        if cjk {
            Self {
                cjk,
                limit: MAX_CHARS_CJK,
                extended_limit: MAX_CHARS_CJK,
            }
        } else {
            Self {
                cjk,
                limit: MAX_WORDS,
                extended_limit: MAX_WORDS_EXTENDED,
            }
        }
    }

    fn size(&self, text: &str) -> usize {
        if self.cjk {
            cjk_length(text)
        } else {
            word_count(text)
        }
    }
}

/// Оптимизировать список реплик
///
/// Результат отсортирован по началу и не содержит перекрытий.
pub fn optimize_subtitles(fragments: &[SubtitlesFragment], source_language: &str) -> Vec<SubtitlesFragment> {
    let mut input: Vec<SubtitlesFragment> = fragments
        .iter()
        .filter(|f| f.end > f.start && !f.text.trim().is_empty())
        .map(|f| SubtitlesFragment::new(f.start, f.end, f.text.trim()))
        .collect();
    sort_by_start(&mut input);

    if input.is_empty() {
        return input;
    }

    let sample: String = input.iter().take(50).map(|f| f.text.as_str()).collect();
    let rules = LengthRules::for_text(source_language, &sample);

    let mut pieces: Vec<SubtitlesFragment> = input.into_iter().flat_map(|f| split_long(f, rules)).collect();
    sort_by_start(&mut pieces);

    let mut result: Vec<SubtitlesFragment> = Vec::new();
    let mut buffer: Option<SubtitlesFragment> = None;

    for next in pieces {
        let Some(mut current) = buffer.take() else {
            buffer = Some(next);
            continue;
        };

        if should_merge(&current, &next, rules) {
            current.text = join_text(&current.text, &next.text, rules.cjk);
            current.end = current.end.max(next.end);
            buffer = Some(current);
        } else {
            result.push(current);
            buffer = Some(next);
        }
    }
    result.extend(buffer);

    debug!("Optimized {} fragments into {}", fragments.len(), result.len());
    result
}

fn should_merge(current: &SubtitlesFragment, next: &SubtitlesFragment, rules: LengthRules) -> bool {
    // Перекрытие склеивается всегда, иначе результат перекрывался бы
    if next.start < current.end {
        return true;
    }
    if next.start - current.end > MAX_GAP_MS {
        return false;
    }
    if ends_sentence(&current.text) {
        return false;
    }

    let combined = rules.size(&current.text) + rules.size(&next.text);
    combined <= rules.limit || (combined <= rules.extended_limit && ends_sentence(&next.text))
}

/// Разбить слишком длинную реплику на части, время делится пропорционально длине текста
fn split_long(fragment: SubtitlesFragment, rules: LengthRules) -> Vec<SubtitlesFragment> {
    if rules.size(&fragment.text) <= rules.extended_limit {
        return vec![fragment];
    }

    let units: Vec<String> = if rules.cjk {
        fragment
            .text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect()
    } else {
        fragment.text.split_whitespace().map(String::from).collect()
    };

    let mut chunks: Vec<Vec<String>> = Vec::new();
    let mut chunk: Vec<String> = Vec::new();
    for unit in units {
        let at_break = ends_sentence(&unit);
        chunk.push(unit);
        if chunk.len() >= rules.limit || (at_break && chunk.len() * 2 >= rules.limit) {
            chunks.push(std::mem::take(&mut chunk));
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }

    let duration = fragment.duration();
    if chunks.len() < 2 || duration < chunks.len() as u64 {
        return vec![fragment];
    }

    let separator = if rules.cjk { "" } else { " " };
    let texts: Vec<String> = chunks.iter().map(|c| c.join(separator)).collect();
    let total_len: u64 = texts.iter().map(|t| t.chars().count() as u64).sum::<u64>().max(1);

    let mut pieces = Vec::with_capacity(texts.len());
    let mut start = fragment.start;
    let mut consumed = 0u64;
    let last = texts.len() - 1;
    for (i, text) in texts.into_iter().enumerate() {
        consumed += text.chars().count() as u64;
        let end = if i == last {
            fragment.end
        } else {
            // Не меньше 1 мс на каждую оставшуюся часть
            let proportional = fragment.start + duration * consumed / total_len;
            proportional
                .max(start + 1)
                .min(fragment.end - (last - i) as u64)
        };
        pieces.push(SubtitlesFragment::new(start, end, text));
        start = end;
    }

    pieces
}
