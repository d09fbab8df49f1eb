//! Загрузчик субтитров YouTube
//!
//! Данные плеера запрашиваются у страницы через мост `postMessage`, сами
//! субтитры скачиваются с CDN в формате json3 и приводятся к списку
//! неперекрывающихся реплик.

pub mod format_detector;
pub mod http;
pub mod noise_filter;
pub mod parser;
pub mod pot_token;
pub mod track;
pub mod types;
pub mod url_builder;
pub mod video_id;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;

use self::format_detector::{detect_format, SubtitlesFormat};
use self::http::TimedTextClient;
use self::noise_filter::filter_noise_from_events;
use self::parser::{parse_karaoke_subtitles, parse_scrolling_asr_subtitles, parse_standard_subtitles};
use self::pot_token::{extract_pot_token, url_has_pot};
use self::track::{compute_track_hash, select_track};
use self::types::{PlayerData, YoutubeSubtitlesResponse, YoutubeTimedText};
use self::url_builder::build_subtitle_url;
use self::video_id::get_youtube_video_id;
use super::SubtitlesFetcher;
use crate::bridge::client::PageBridgeClient;
use crate::bridge::messages::PlayerDataReply;
use crate::config::{ConfigSource, FetcherSettings};
use crate::error::{Result, SubtitlesError};
use crate::location::PageLocation;
use crate::processor::optimizer::optimize_subtitles;
use crate::types::SubtitlesFragment;

/// Полная обработка сырых событий: шум, формат, парсер, оптимизатор
///
/// Караоке парсится в готовые строки и оптимизатор не проходит. При
/// включённой AI сегментации оптимизатор тоже пропускается: строки
/// соберёт конвейер сегментации.
pub fn process_events(
    events: &[YoutubeTimedText],
    source_language: &str,
    ai_segmentation: bool,
) -> (SubtitlesFormat, Vec<SubtitlesFragment>) {
    let filtered = filter_noise_from_events(events);
    let format = detect_format(&filtered);
    debug!("Detected {} subtitles format ({} events)", format, filtered.len());

    let fragments = match format {
        SubtitlesFormat::Karaoke => return (format, parse_karaoke_subtitles(&filtered)),
        SubtitlesFormat::ScrollingAsr => parse_scrolling_asr_subtitles(&filtered, source_language),
        SubtitlesFormat::Standard => parse_standard_subtitles(&filtered),
    };

    if ai_segmentation {
        (format, fragments)
    } else {
        (format, optimize_subtitles(&fragments, source_language))
    }
}

#[derive(Default)]
struct FetcherCache {
    subtitles: Vec<SubtitlesFragment>,
    source_language: String,
    cached_track_hash: Option<String>,
}

pub struct YoutubeSubtitlesFetcher {
    bridge: PageBridgeClient,
    http: Arc<dyn TimedTextClient>,
    config: Arc<dyn ConfigSource>,
    location: Arc<dyn PageLocation>,
    settings: FetcherSettings,
    cache: Mutex<FetcherCache>,
}

impl YoutubeSubtitlesFetcher {
    pub fn new(
        bridge: PageBridgeClient,
        http: Arc<dyn TimedTextClient>,
        config: Arc<dyn ConfigSource>,
        location: Arc<dyn PageLocation>,
        settings: FetcherSettings,
    ) -> Self {
        Self {
            bridge,
            http,
            config,
            location,
            settings,
            cache: Mutex::new(FetcherCache::default()),
        }
    }

    fn video_id(&self) -> Option<String> {
        self.location.url().as_ref().and_then(get_youtube_video_id)
    }

    async fn compute_track_hash(&self, video_id: &str) -> Option<String> {
        let data = self.bridge.request_player_data(video_id).await.into_data()?;
        let track = select_track(&data.caption_tracks, data.selected_track_language_code.as_deref())?;
        Some(compute_track_hash(video_id, track))
    }

    /// Плеер делает запрос к timed-text только когда видео готово, поэтому
    /// сначала ждём состояния >= 1
    async fn wait_for_player_state(&self, video_id: &str) {
        for _ in 0..self.settings.max_state_wait_attempts {
            let reply = self.bridge.request_player_data(video_id).await;
            if reply.data.as_ref().is_some_and(|d| reply.success && d.player_state >= 1) {
                return;
            }
            tokio::time::sleep(self.settings.state_wait_interval).await;
        }
        debug!("Player for {} did not become ready, continuing anyway", video_id);
    }

    fn has_pot(data: &PlayerData) -> bool {
        data.audio_caption_tracks.iter().any(|t| url_has_pot(&t.url)) || data.cached_timedtext_url.is_some()
    }

    fn reply_error(reply: &PlayerDataReply) -> SubtitlesError {
        match reply.error.as_deref() {
            Some("PLAYER_NOT_FOUND") => SubtitlesError::PlayerNotFound,
            Some("VIDEO_ID_MISMATCH") => SubtitlesError::VideoIdMismatch,
            _ => SubtitlesError::Timeout,
        }
    }

    async fn get_player_data_with_pot(&self, video_id: &str) -> Result<PlayerData> {
        let reply = self.bridge.request_player_data(video_id).await;
        let error = Self::reply_error(&reply);
        let Some(mut player_data) = reply.into_data() else {
            return Err(error);
        };

        if Self::has_pot(&player_data) {
            return Ok(player_data);
        }

        debug!("No POT token yet, enabling native captions");
        self.bridge.ensure_subtitles().await;

        for _ in 0..self.settings.max_pot_wait_attempts {
            tokio::time::sleep(self.settings.pot_wait_interval).await;
            if let Some(data) = self.bridge.request_player_data(video_id).await.into_data() {
                player_data = data;
                if Self::has_pot(&player_data) {
                    return Ok(player_data);
                }
            }
        }

        if let Some(url) = self.bridge.wait_for_timedtext(video_id).await {
            player_data.cached_timedtext_url = Some(url);
        } else {
            warn!("No POT token found for {}, fetching without it", video_id);
        }

        Ok(player_data)
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<YoutubeTimedText>> {
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(SubtitlesError::from_status(response.status));
        }

        let parsed: YoutubeSubtitlesResponse = serde_json::from_str(&response.body)
            .map_err(|e| SubtitlesError::InvalidResponse(e.to_string()))?;
        Ok(parsed.events)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<YoutubeTimedText>> {
        let attempts = self.settings.max_fetch_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.fetch_once(url).await {
                Ok(events) => return Ok(events),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!("Subtitles fetch attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.fetch_retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(SubtitlesError::Timeout))
    }

    async fn process_raw_events(&self, events: &[YoutubeTimedText], source_language: &str) -> Vec<SubtitlesFragment> {
        let ai_segmentation = self
            .config
            .get_local_config()
            .await
            .map(|c| c.video_subtitles.ai_segmentation)
            .unwrap_or(false);

        process_events(events, source_language, ai_segmentation).1
    }
}

#[async_trait]
impl SubtitlesFetcher for YoutubeSubtitlesFetcher {
    async fn fetch(&self) -> Result<Vec<SubtitlesFragment>> {
        let video_id = self.video_id().ok_or(SubtitlesError::VideoIdNotFound)?;

        let current_hash = self.compute_track_hash(&video_id).await;
        {
            let cache = self.cache.lock();
            if current_hash.is_some() && !cache.subtitles.is_empty() && cache.cached_track_hash == current_hash {
                debug!("Reusing cached subtitles for {}", video_id);
                return Ok(cache.subtitles.clone());
            }
        }

        self.wait_for_player_state(&video_id).await;
        let player_data = self.get_player_data_with_pot(&video_id).await?;

        let track = select_track(&player_data.caption_tracks, player_data.selected_track_language_code.as_deref())
            .ok_or(SubtitlesError::NoSubtitlesFound)?;

        let pot = extract_pot_token(track, &player_data);
        let url = build_subtitle_url(track, &player_data, &pot)?;
        let events = self.fetch_with_retry(&url).await?;

        let subtitles = self.process_raw_events(&events, &track.language_code).await;
        if subtitles.is_empty() {
            return Err(SubtitlesError::NoSubtitlesFound);
        }

        info!(
            "Fetched {} subtitles for {} ({}, {})",
            subtitles.len(),
            video_id,
            track.language_code,
            track.kind.as_deref().unwrap_or("manual")
        );

        let mut cache = self.cache.lock();
        cache.source_language = track.language_code.clone();
        cache.subtitles = subtitles.clone();
        cache.cached_track_hash = current_hash.or_else(|| Some(compute_track_hash(&video_id, track)));

        Ok(subtitles)
    }

    fn cleanup(&self) {
        *self.cache.lock() = FetcherCache::default();
    }

    async fn should_use_same_track(&self) -> bool {
        let cached = {
            let cache = self.cache.lock();
            if cache.subtitles.is_empty() {
                return false;
            }
            cache.cached_track_hash.clone()
        };
        let Some(cached) = cached else {
            return false;
        };

        let Some(video_id) = self.video_id() else {
            return false;
        };
        self.compute_track_hash(&video_id).await.as_deref() == Some(cached.as_str())
    }

    fn source_language(&self) -> String {
        self.cache.lock().source_language.clone()
    }
}
