//! Модуль конфигурации
//!
//! Пользовательская конфигурация расширения (языки, провайдеры перевода,
//! настройки субтитров) и настраиваемые параметры конвейера.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, SubtitlesError};

/// Режим отображения субтитров
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// Оригинал и перевод
    #[default]
    Bilingual,
    /// Только оригинал
    OriginalOnly,
    /// Только перевод
    TranslationOnly,
}

/// Языковые настройки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    /// Исходный язык, `auto` для автоопределения
    pub source_code: String,
    /// Целевой язык перевода
    pub target_code: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source_code: "auto".to_string(),
            target_code: "en".to_string(),
        }
    }
}

/// Настройки перевода
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TranslateConfig {
    /// Идентификатор выбранного провайдера
    pub provider_id: String,
    /// Передавать ли провайдеру контекст видео
    #[serde(default, rename = "enableAIContentAware")]
    pub enable_ai_content_aware: bool,
}

/// Описание провайдера перевода или LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    /// Тип провайдера (`openai`, `deepl`, `google` ...)
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Стиль субтитров, из которого конвейеру нужен только режим отображения
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubtitlesStyleConfig {
    #[serde(default)]
    pub display_mode: DisplayMode,
}

/// Настройки функции субтитров
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSubtitlesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Пересегментация реплик с помощью AI
    #[serde(default, rename = "aiSegmentation")]
    pub ai_segmentation: bool,
    #[serde(default)]
    pub style: SubtitlesStyleConfig,
}

impl Default for VideoSubtitlesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ai_segmentation: false,
            style: SubtitlesStyleConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Конфигурация расширения в той части, которая нужна конвейеру
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub providers_config: Vec<ProviderConfig>,
    #[serde(default)]
    pub video_subtitles: VideoSubtitlesConfig,
}

impl Config {
    /// Провайдер, выбранный для перевода
    pub fn translate_provider(&self) -> Option<&ProviderConfig> {
        get_provider_config_by_id(&self.providers_config, &self.translate.provider_id)
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.video_subtitles.style.display_mode
    }
}

/// Найти провайдера по идентификатору
pub fn get_provider_config_by_id<'a>(
    providers: &'a [ProviderConfig],
    id: &str,
) -> Option<&'a ProviderConfig> {
    providers.iter().find(|p| p.id == id)
}

/// Источник конфигурации расширения
///
/// Возвращает `None`, если конфигурация ещё не сохранена.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get_local_config(&self) -> Option<Config>;
}

/// Фиксированная конфигурация
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: Option<Config>,
}

impl StaticConfigSource {
    pub fn new(config: Option<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn get_local_config(&self) -> Option<Config> {
        self.config.clone()
    }
}

/// Конфигурация из JSON файла с кэшированием после первого чтения
pub struct FileConfigSource {
    path: PathBuf,
    cached: Mutex<Option<Config>>,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Прочитать конфигурацию с диска, минуя кэш
    pub async fn load(&self) -> Result<Config> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| SubtitlesError::Configuration(format!("{}: {}", self.path.display(), e)))?;
        Ok(config)
    }

    /// Сбросить кэш, следующий запрос перечитает файл
    pub fn invalidate(&self) {
        self.cached.lock().take();
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn get_local_config(&self) -> Option<Config> {
        if let Some(config) = self.cached.lock().clone() {
            return Some(config);
        }

        match self.load().await {
            Ok(config) => {
                debug!("Loaded config from {}", self.path.display());
                *self.cached.lock() = Some(config.clone());
                Some(config)
            }
            Err(e) => {
                warn!("Failed to load config: {}", e);
                None
            }
        }
    }
}

/// Параметры загрузчика субтитров
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub post_message_timeout: Duration,
    pub max_state_wait_attempts: usize,
    pub state_wait_interval: Duration,
    pub max_pot_wait_attempts: usize,
    pub pot_wait_interval: Duration,
    pub max_fetch_retries: usize,
    pub fetch_retry_delay: Duration,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            post_message_timeout: Duration::from_millis(POST_MESSAGE_TIMEOUT_MS),
            max_state_wait_attempts: MAX_STATE_WAIT_ATTEMPTS,
            state_wait_interval: Duration::from_millis(STATE_WAIT_INTERVAL_MS),
            max_pot_wait_attempts: MAX_POT_WAIT_ATTEMPTS,
            pot_wait_interval: Duration::from_millis(POT_WAIT_INTERVAL_MS),
            max_fetch_retries: MAX_FETCH_RETRIES,
            fetch_retry_delay: Duration::from_millis(FETCH_RETRY_DELAY_MS),
        }
    }
}

/// Параметры сегментации и перевода
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Окно обработки AI сегментации вперёд от позиции
    pub process_look_ahead_ms: u64,
    /// Насколько назад от позиции искать несегментированные реплики
    pub segmentation_backward_tolerance_ms: u64,
    pub translate_look_ahead_ms: u64,
    pub translate_look_behind_ms: u64,
    pub translation_batch_size: usize,
    pub ai_segmentation_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            process_look_ahead_ms: PROCESS_LOOK_AHEAD_MS,
            segmentation_backward_tolerance_ms: SEGMENTATION_BACKWARD_TOLERANCE_MS,
            translate_look_ahead_ms: TRANSLATE_LOOK_AHEAD_MS,
            translate_look_behind_ms: TRANSLATE_LOOK_BEHIND_MS,
            translation_batch_size: TRANSLATION_BATCH_SIZE,
            ai_segmentation_timeout: Duration::from_millis(AI_SEGMENTATION_TIMEOUT_MS),
        }
    }
}
