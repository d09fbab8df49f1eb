//! Пакетный перевод реплик
//!
//! Реплики пакета переводятся параллельно и независимо: ошибка одной не
//! мешает остальным. Ошибкой всего пакета считается только ситуация,
//! когда не удалось перевести ни одной реплики.

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, warn};

use crate::config::{Config, LanguageConfig, ProviderConfig};
use crate::error::{ProviderError, Result, SubtitlesError};
use crate::types::SubtitlesFragment;

pub const AI_RATE_LIMITED_MESSAGE: &str = "AI service rate limit reached, please try again later";
pub const AI_AUTH_FAILED_MESSAGE: &str = "AI service authentication failed, please check your API key";
pub const AI_SERVICE_UNAVAILABLE_MESSAGE: &str = "AI service is temporarily unavailable";
pub const AI_NO_RESPONSE_MESSAGE: &str = "AI service returned an empty response";

/// Запрос перевода одной реплики
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTranslateRequest {
    pub text: String,
    pub lang_config: LanguageConfig,
    pub provider_config: ProviderConfig,
    /// Ключ кэша перевода
    pub hash: String,
    /// Пустая строка, если контекст видео не передаётся
    pub video_title: String,
    pub subtitles_context: String,
}

/// Переводчик на стороне фонового сервиса
#[async_trait]
pub trait SubtitlesTranslator: Send + Sync {
    async fn translate(&self, request: SubtitleTranslateRequest) -> std::result::Result<String, ProviderError>;
}

/// Контекст видео для переводчика
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtitlesVideoContext {
    pub video_title: String,
    pub subtitles_text_content: String,
}

/// Результат перевода одной реплики
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentTranslation {
    /// Реплика с заполненным `translation` (пустым при ошибке)
    pub fragment: SubtitlesFragment,
    pub failed: bool,
}

/// Понятное пользователю сообщение об ошибке провайдера
pub fn to_friendly_error_message(error: &ProviderError) -> String {
    match error.status_code {
        Some(429) => return AI_RATE_LIMITED_MESSAGE.to_string(),
        Some(401) | Some(403) => return AI_AUTH_FAILED_MESSAGE.to_string(),
        Some(500) | Some(502) | Some(503) => return AI_SERVICE_UNAVAILABLE_MESSAGE.to_string(),
        _ => {}
    }

    if error.message.contains("No Response") || error.message.contains("Empty response") {
        return AI_NO_RESPONSE_MESSAGE.to_string();
    }

    error.message.clone()
}

/// Ключ кэша: md5 от текста, провайдера, языков и контекста видео
pub fn build_translation_hash(
    text: &str,
    provider: &ProviderConfig,
    lang: &LanguageConfig,
    enable_ai_content_aware: bool,
    context: &SubtitlesVideoContext,
) -> String {
    let mut components = vec![
        text,
        provider.id.as_str(),
        provider.provider.as_str(),
        provider.model.as_deref().unwrap_or(""),
        lang.source_code.as_str(),
        lang.target_code.as_str(),
    ];
    if enable_ai_content_aware {
        components.push("ai-content-aware");
        components.push(&context.video_title);
        components.push(&context.subtitles_text_content);
    }
    format!("{:x}", md5::compute(components.join("\u{1f}").as_bytes()))
}

fn untranslated(fragments: &[SubtitlesFragment]) -> Vec<FragmentTranslation> {
    fragments
        .iter()
        .map(|f| FragmentTranslation {
            fragment: SubtitlesFragment {
                translation: Some(String::new()),
                ..f.clone()
            },
            failed: false,
        })
        .collect()
}

/// Перевести пакет реплик
///
/// Без конфигурации или без выбранного провайдера реплики возвращаются
/// с пустым переводом. Если не удался ни один перевод, возвращается
/// ошибка с сообщением первой неудачи.
pub async fn translate_subtitles(
    fragments: &[SubtitlesFragment],
    context: &SubtitlesVideoContext,
    config: Option<&Config>,
    translator: &dyn SubtitlesTranslator,
) -> Result<Vec<FragmentTranslation>> {
    let Some(config) = config else {
        debug!("No config, skipping translation");
        return Ok(untranslated(fragments));
    };
    let Some(provider) = config.translate_provider() else {
        warn!("Translate provider {} not found", config.translate.provider_id);
        return Ok(untranslated(fragments));
    };

    let content_aware = config.translate.enable_ai_content_aware;
    let requests = fragments.iter().map(|fragment| {
        let request = SubtitleTranslateRequest {
            text: fragment.text.clone(),
            lang_config: config.language.clone(),
            provider_config: provider.clone(),
            hash: build_translation_hash(&fragment.text, provider, &config.language, content_aware, context),
            video_title: if content_aware { context.video_title.clone() } else { String::new() },
            subtitles_context: if content_aware {
                context.subtitles_text_content.clone()
            } else {
                String::new()
            },
        };
        translator.translate(request)
    });

    let results = join_all(requests).await;

    if !results.is_empty() && results.iter().all(|r| r.is_err()) {
        if let Some(Err(first)) = results.first() {
            return Err(SubtitlesError::Translation(to_friendly_error_message(first)));
        }
    }

    Ok(fragments
        .iter()
        .zip(results)
        .map(|(fragment, result)| {
            let (translation, failed) = match result {
                Ok(text) => (text, false),
                Err(e) => {
                    debug!("Translation of fragment at {}ms failed: {}", fragment.start, e);
                    (String::new(), true)
                }
            };
            FragmentTranslation {
                fragment: SubtitlesFragment {
                    translation: Some(translation),
                    ..fragment.clone()
                },
                failed,
            }
        })
        .collect())
}
