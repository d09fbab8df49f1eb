//! Загрузчики субтитров для видеоплатформ

pub mod youtube;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SubtitlesFragment;

/// Источник субтитров текущего видео
#[async_trait]
pub trait SubtitlesFetcher: Send + Sync {
    /// Загрузить и нормализовать субтитры текущего видео
    async fn fetch(&self) -> Result<Vec<SubtitlesFragment>>;

    /// Сбросить кэш загруженных субтитров
    fn cleanup(&self);

    /// Совпадает ли текущая дорожка плеера с уже загруженной
    async fn should_use_same_track(&self) -> bool;

    /// Язык загруженной дорожки, пустая строка до первой загрузки
    fn source_language(&self) -> String;
}
