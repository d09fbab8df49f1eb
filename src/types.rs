//! Основные типы данных конвейера субтитров

use serde::{Deserialize, Serialize};

/// Один фрагмент субтитров (реплика)
///
/// Время в миллисекундах от начала видео. Идентичность фрагмента
/// определяется временем начала `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitlesFragment {
    /// Время начала, мс
    pub start: u64,
    /// Время окончания, мс
    pub end: u64,
    /// Исходный текст
    pub text: String,
    /// Перевод, если уже получен
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl SubtitlesFragment {
    /// Создать фрагмент без перевода
    pub fn new(start: u64, end: u64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            translation: None,
        }
    }

    /// Длительность фрагмента, мс
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Попадает ли момент времени в интервал `[start, end)`
    pub fn contains(&self, time_ms: u64) -> bool {
        self.start <= time_ms && time_ms < self.end
    }

    /// Есть ли непустой перевод
    pub fn has_translation(&self) -> bool {
        self.translation.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Состояние отображения субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SubtitlesState {
    #[default]
    Idle,
    Fetching,
    FetchSuccess,
    Processing,
    Segmenting,
    Error,
}

impl SubtitlesState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::FetchSuccess => "fetchSuccess",
            Self::Processing => "processing",
            Self::Segmenting => "segmenting",
            Self::Error => "error",
        }
    }
}

/// Состояние вместе с необязательным сообщением
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StateData {
    pub state: SubtitlesState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StateData {
    pub fn new(state: SubtitlesState, message: Option<String>) -> Self {
        Self { state, message }
    }
}

/// Якорь вертикальной позиции плавающих субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionAnchor {
    Top,
    Bottom,
}

/// Вертикальная позиция субтитров поверх видео
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubtitlePosition {
    /// Отступ от якоря в процентах высоты плеера
    pub percent: f32,
    pub anchor: PositionAnchor,
}

impl Default for SubtitlePosition {
    fn default() -> Self {
        Self {
            percent: crate::constants::DEFAULT_SUBTITLE_POSITION_PERCENT,
            anchor: PositionAnchor::Bottom,
        }
    }
}

/// Sort fragments by start time (stable)
pub(crate) fn sort_by_start(fragments: &mut [SubtitlesFragment]) {
    fragments.sort_by_key(|f| f.start);
}

/// Find the fragment under the playhead; first match wins on overlaps
pub(crate) fn find_at(fragments: &[SubtitlesFragment], time_ms: u64) -> Option<usize> {
    fragments.iter().position(|f| f.contains(time_ms))
}

/// Convert `HTMLMediaElement.currentTime` seconds into whole milliseconds
pub(crate) fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0) as u64
    } else {
        0
    }
}
