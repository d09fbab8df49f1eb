//! AI пересегментация реплик
//!
//! Фрагменты отправляются модели компактным JSON `[{"s","e","t"}]`, ответ
//! приходит в упрощённом VTT, где время записано в миллисекундах:
//!
//! ```text
//! WEBVTT
//!
//! 1000 --> 1500
//! Hello world.
//! ```

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::error::{ProviderError, Result, SubtitlesError};
use crate::types::SubtitlesFragment;

static CUE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*-->\s*(\d+)$").unwrap());

/// Сегментатор на стороне фонового сервиса (LLM)
#[async_trait]
pub trait AiSegmenter: Send + Sync {
    /// Вернуть упрощённый VTT для фрагментов в формате JSON
    async fn segment(&self, json_content: &str, provider_id: &str) -> std::result::Result<String, ProviderError>;
}

#[derive(Serialize)]
struct AiFragment<'a> {
    s: u64,
    e: u64,
    t: &'a str,
}

/// Схлопнуть пробелы и переводы строк, выбросить пустые фрагменты
pub fn clean_fragments_for_ai(fragments: &[SubtitlesFragment]) -> Vec<SubtitlesFragment> {
    fragments
        .iter()
        .filter_map(|f| {
            let text = f.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                None
            } else {
                Some(SubtitlesFragment { text, ..f.clone() })
            }
        })
        .collect()
}

pub fn format_fragments_to_json(fragments: &[SubtitlesFragment]) -> Result<String> {
    let compact: Vec<AiFragment> = fragments
        .iter()
        .map(|f| AiFragment {
            s: f.start,
            e: f.end,
            t: &f.text,
        })
        .collect();
    Ok(serde_json::to_string(&compact)?)
}

/// Разобрать упрощённый VTT: заголовок до первой строки с `-->`
/// пропускается, реплики без текста отбрасываются
pub fn parse_simplified_vtt_to_fragments(vtt: &str) -> Vec<SubtitlesFragment> {
    let lines: Vec<&str> = vtt.trim().lines().collect();
    let mut fragments = Vec::new();
    let mut index = lines.iter().position(|l| l.contains("-->")).unwrap_or(lines.len());

    while index < lines.len() {
        let line = lines[index].trim();
        index += 1;

        let Some(caps) = CUE_LINE.captures(line) else {
            continue;
        };
        let (Ok(start), Ok(end)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) else {
            continue;
        };

        let mut text_lines = Vec::new();
        while index < lines.len() && !lines[index].trim().is_empty() && !lines[index].contains("-->") {
            text_lines.push(lines[index].trim());
            index += 1;
        }

        if !text_lines.is_empty() && end > start {
            fragments.push(SubtitlesFragment::new(start, end, text_lines.join("\n")));
        }
    }

    fragments
}

/// Пересегментировать блок реплик
///
/// Пустой блок (или пустой после очистки) возвращается как есть. Пустой
/// ответ модели и превышение `timeout` считаются ошибкой.
pub async fn ai_segment_block(
    fragments: &[SubtitlesFragment],
    config: &Config,
    segmenter: &dyn AiSegmenter,
    timeout: Duration,
) -> Result<Vec<SubtitlesFragment>> {
    if fragments.is_empty() {
        return Ok(Vec::new());
    }

    let cleaned = clean_fragments_for_ai(fragments);
    if cleaned.is_empty() {
        return Ok(fragments.to_vec());
    }

    let json_content = format_fragments_to_json(&cleaned)?;
    debug!("Sending {} fragments for AI segmentation", cleaned.len());

    let vtt = match tokio::time::timeout(timeout, segmenter.segment(&json_content, &config.translate.provider_id)).await {
        Ok(Ok(vtt)) => vtt,
        Ok(Err(e)) => {
            warn!("AI segmentation failed: {}", e);
            return Err(SubtitlesError::AiSegmentation(e.message));
        }
        Err(_) => return Err(SubtitlesError::AiSegmentation(format!("timed out after {:?}", timeout))),
    };

    let segmented = parse_simplified_vtt_to_fragments(&vtt);
    if segmented.is_empty() {
        return Err(SubtitlesError::AiSegmentation("AI segmentation returned empty result".into()));
    }

    Ok(segmented)
}
