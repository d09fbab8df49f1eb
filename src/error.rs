//! Модуль обработки ошибок конвейера субтитров
//!
//! Все ошибки относятся к текущей сессии субтитров конкретного видео и
//! никогда не являются фатальными для расширения в целом.

use thiserror::Error;

/// Ошибки конвейера субтитров
#[derive(Debug, Error)]
pub enum SubtitlesError {
    /// Видео-элемент не найден на странице
    #[error("Video not found on this page")]
    VideoNotFound,

    /// В адресе страницы нет идентификатора видео
    #[error("Video id not found in the page URL")]
    VideoIdNotFound,

    /// Панель управления плеера не найдена
    #[error("Player controls bar not found")]
    ControlsBarNotFound,

    /// Объект плеера недоступен в контексте страницы
    #[error("Player not found")]
    PlayerNotFound,

    /// Плеер уже показывает другое видео (гонка при SPA-навигации)
    #[error("Player video id does not match the requested video")]
    VideoIdMismatch,

    /// У видео нет дорожек субтитров или ответ пустой
    #[error("No subtitles found for this video")]
    NoSubtitlesFound,

    /// Ответ не пришёл за отведённое время
    #[error("Timed out while fetching subtitles")]
    Timeout,

    /// 403 от CDN субтитров
    #[error("Access to subtitles was denied (HTTP 403)")]
    Forbidden,

    /// 404 от CDN субтитров
    #[error("Subtitles not found on the server (HTTP 404)")]
    NotFound,

    /// 429 от CDN субтитров
    #[error("Too many requests, please try again later (HTTP 429)")]
    RateLimited,

    /// 5xx от CDN субтитров, повторяемая
    #[error("Subtitles server error (HTTP {0})")]
    ServerError(u16),

    /// Неизвестный HTTP статус, повторяемый
    #[error("Unexpected subtitles response (HTTP {0})")]
    UnexpectedStatus(u16),

    /// Тело ответа не соответствует формату timed-text
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Ошибка AI сегментации
    #[error("AI segmentation error: {0}")]
    AiSegmentation(String),

    /// Ошибка перевода всего пакета
    #[error("{0}")]
    Translation(String),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Другая ошибка
    #[error("{0}")]
    Other(String),
}

impl SubtitlesError {
    /// Можно ли повторить запрос после этой ошибки
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServerError(_)
                | Self::UnexpectedStatus(_)
                | Self::InvalidResponse(_)
                | Self::Http(_)
                | Self::Json(_)
        )
    }

    /// Ошибки окружения показываются всплывающим уведомлением,
    /// остальные как состояние поверх видео
    pub fn is_toast(&self) -> bool {
        matches!(self, Self::VideoNotFound | Self::ControlsBarNotFound)
    }

    /// Ошибка для HTTP статуса CDN субтитров
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError(status),
            _ => Self::UnexpectedStatus(status),
        }
    }
}

impl From<&str> for SubtitlesError {
    fn from(s: &str) -> Self {
        SubtitlesError::Other(s.to_string())
    }
}

impl From<String> for SubtitlesError {
    fn from(s: String) -> Self {
        SubtitlesError::Other(s)
    }
}

/// Ошибка внешнего провайдера (LLM или сервиса перевода)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP статус ответа провайдера, если он известен
    pub status_code: Option<u16>,
    /// Текст ошибки
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
        }
    }

    pub fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
        }
    }
}

/// Тип Result для библиотеки
pub type Result<T> = std::result::Result<T, SubtitlesError>;
