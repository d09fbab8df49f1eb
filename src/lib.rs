//! Библиотека videonova-subtitles
//!
//! Синхронизированные с видео субтитры YouTube с постепенным переводом:
//! загрузка дорожки через мост страницы, разбор и оптимизация реплик,
//! AI пересегментация по окну вперёд и перевод рядом с курсором.
//! Результат публикуется в реактивное хранилище, которое читает UI.

pub mod bridge;
pub mod config;
pub mod constants;
pub mod content;
pub mod error;
pub mod fetchers;
pub mod location;
pub mod processor;
pub mod store;
pub mod types;
pub mod utils;
pub mod video;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigSource, DisplayMode, FetcherSettings, FileConfigSource, PipelineSettings, StaticConfigSource};
pub use content::{
    youtube_config, AdapterServices, PageEvent, PageHost, SegmentationPipeline, SubtitlesScheduler,
    TranslationCoordinator, UniversalVideoAdapter,
};
pub use error::{ProviderError, Result, SubtitlesError};
pub use fetchers::youtube::YoutubeSubtitlesFetcher;
pub use fetchers::SubtitlesFetcher;
pub use store::{SubtitlesDisplay, SubtitlesStore};
pub use types::{StateData, SubtitlePosition, SubtitlesFragment, SubtitlesState};
pub use video::{SimulatedVideo, VideoElement, VideoEvent};
