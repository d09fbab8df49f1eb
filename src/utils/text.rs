//! Вспомогательные функции для работы с текстом субтитров

use crate::constants::SENTENCE_TERMINATORS;

/// Языки без пробелов между словами
const CJK_LANGUAGE_PREFIXES: &[&str] = &["zh", "ja", "ko", "yue"];

/// Является ли код языка CJK (`zh-Hans`, `ja`, `ko` ...)
pub fn is_cjk_language(language_code: &str) -> bool {
    let primary = language_code
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    CJK_LANGUAGE_PREFIXES.contains(&primary.as_str())
}

/// Иероглиф, кана или хангыль
pub fn is_cjk_char(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF      // Hiragana, Katakana
        | 0x3400..=0x4DBF    // CJK Extension A
        | 0x4E00..=0x9FFF    // CJK Unified Ideographs
        | 0xAC00..=0xD7AF    // Hangul syllables
        | 0xF900..=0xFAFF    // CJK Compatibility Ideographs
        | 0x20000..=0x2A6DF) // CJK Extension B
}

/// Преобладают ли в тексте CJK символы
pub fn is_mostly_cjk(text: &str) -> bool {
    let mut cjk = 0usize;
    let mut other = 0usize;
    for c in text.chars().filter(|c| c.is_alphanumeric()) {
        if is_cjk_char(c) {
            cjk += 1;
        } else {
            other += 1;
        }
    }
    cjk > 0 && cjk >= other
}

/// Заканчивается ли текст знаком конца предложения
pub fn ends_sentence(text: &str) -> bool {
    // '\n' тоже терминатор, поэтому завершающие пробелы не обрезаем целиком
    let trimmed = text.trim_end_matches([' ', '\t']);
    trimmed
        .chars()
        .last()
        .is_some_and(|c| SENTENCE_TERMINATORS.contains(&c))
}

/// Количество слов, разделённых пробелами
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Длина текста для CJK: символы без пробелов
pub fn cjk_length(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Склеить две части текста с учётом письменности
pub fn join_text(left: &str, right: &str, cjk: bool) -> String {
    let left = left.trim_end();
    let right = right.trim_start();
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    if cjk {
        format!("{}{}", left, right)
    } else {
        format!("{} {}", left, right)
    }
}
