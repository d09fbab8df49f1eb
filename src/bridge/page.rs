//! Сторона страницы: отвечает на запросы контент-скрипта данными плеера
//!
//! Объект плеера живёт только в контексте страницы, поэтому доступ к нему
//! идёт через `PlayerLocator` / `PlayerApi`.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use url::Url;

use super::channel::MessageChannel;
use super::messages::{BridgeRequest, BridgeResponse};
use super::timedtext_observer::TimedtextObserver;
use crate::constants::TIMEDTEXT_WAIT_TIMEOUT_MS;
use crate::fetchers::youtube::types::{AudioCaptionTrack, CaptionTrack, PlayerData};

/// Методы объекта плеера, которые нужны мосту
pub trait PlayerApi: Send + Sync {
    /// `getPlayerResponse()`
    fn player_response(&self) -> Option<Value>;

    /// `getAudioTrack().captionTracks`: сырые объекты `{url, vssId, kind}`
    fn audio_caption_tracks(&self) -> Vec<Value>;

    /// `ytcfg.get('DEVICE')`
    fn device(&self) -> Option<String>;

    /// `innertubeContextClientVersion` из конфигурации плеера
    fn client_version(&self) -> Option<String>;

    /// `getPlayerState()`
    fn player_state(&self) -> Option<i32>;

    /// Язык дорожки, выбранной в меню субтитров плеера
    fn selected_track_language_code(&self) -> Option<String>;

    fn captions_enabled(&self) -> bool;

    fn enable_captions(&self);
}

/// Поиск плеера в документе (`.html5-video-player.playing-mode` ...)
pub trait PlayerLocator: Send + Sync {
    fn find_player(&self) -> Option<Arc<dyn PlayerApi>>;
}

struct ServerInner {
    channel: Arc<dyn MessageChannel>,
    locator: Arc<dyn PlayerLocator>,
    observer: TimedtextObserver,
    timedtext_wait_timeout: Duration,
}

/// Обработчик запросов моста в контексте страницы
pub struct PageBridgeServer {
    inner: Arc<ServerInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PageBridgeServer {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        locator: Arc<dyn PlayerLocator>,
        observer: TimedtextObserver,
    ) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                channel,
                locator,
                observer,
                timedtext_wait_timeout: Duration::from_millis(TIMEDTEXT_WAIT_TIMEOUT_MS),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn with_timedtext_wait_timeout(mut self, timeout: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timedtext_wait_timeout = timeout;
        }
        self
    }

    pub fn observer(&self) -> &TimedtextObserver {
        &self.inner.observer
    }

    /// Начать слушать сообщения окна
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let inner = self.inner.clone();
        let mut rx = inner.channel.subscribe();
        *task = Some(tokio::spawn(async move {
            info!("Page bridge listening");
            loop {
                let message = match rx.recv().await {
                    Ok(message) => message,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                };
                if message.origin != inner.channel.origin() {
                    continue;
                }
                // Ответы и посторонние сообщения не разбираются как запросы
                let Ok(request) = serde_json::from_value::<BridgeRequest>(message.data) else {
                    continue;
                };

                let inner = inner.clone();
                tokio::spawn(async move {
                    let response = inner.handle(request).await;
                    inner.post(&response);
                });
            }
        }));
    }

    /// Остановить обработку запросов и забыть наблюдённые URL
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.inner.observer.clear();
    }
}

impl Drop for PageBridgeServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ServerInner {
    fn post(&self, response: &BridgeResponse) {
        match serde_json::to_value(response) {
            Ok(data) => self.channel.post_message(data, &self.channel.origin()),
            Err(e) => error!("Failed to serialize {}: {}", response.message_type(), e),
        }
    }

    async fn handle(&self, request: BridgeRequest) -> BridgeResponse {
        match request {
            BridgeRequest::PlayerData {
                request_id,
                expected_video_id,
            } => self.get_player_data(&request_id, &expected_video_id),
            BridgeRequest::WaitTimedtext { request_id, video_id } => {
                let url = self
                    .observer
                    .wait_for_url(&video_id, self.timedtext_wait_timeout)
                    .await;
                BridgeResponse::WaitTimedtext { request_id, url }
            }
            BridgeRequest::EnsureSubtitles { request_id } => {
                if let Some(player) = self.locator.find_player() {
                    if !player.captions_enabled() {
                        debug!("Enabling native captions");
                        player.enable_captions();
                    }
                }
                BridgeResponse::EnsureSubtitles { request_id }
            }
        }
    }

    fn get_player_data(&self, request_id: &str, expected_video_id: &str) -> BridgeResponse {
        let Some(player) = self.locator.find_player() else {
            return BridgeResponse::player_data_error(request_id, "PLAYER_NOT_FOUND");
        };

        let response = player.player_response().unwrap_or(Value::Null);
        let video_id = response
            .pointer("/videoDetails/videoId")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if video_id.is_empty() || video_id != expected_video_id {
            return BridgeResponse::player_data_error(request_id, "VIDEO_ID_MISMATCH");
        }

        let origin = self.channel.origin();
        let caption_tracks = response
            .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
            .cloned()
            .map(|tracks| {
                serde_json::from_value::<Vec<CaptionTrack>>(tracks).unwrap_or_else(|e| {
                    error!("Failed to parse caption tracks: {}", e);
                    Vec::new()
                })
            })
            .unwrap_or_default()
            .into_iter()
            .map(|mut track| {
                if !track.base_url.is_empty() && !track.base_url.contains("://") {
                    track.base_url = format!("{}{}", origin, track.base_url);
                }
                track
            })
            .collect();

        let audio_caption_tracks = parse_audio_tracks(&player.audio_caption_tracks());

        BridgeResponse::PlayerData {
            request_id: request_id.to_string(),
            success: true,
            error: None,
            data: Some(PlayerData {
                video_id: video_id.to_string(),
                caption_tracks,
                audio_caption_tracks,
                device: player.device(),
                cver: player.client_version(),
                player_state: player.player_state().unwrap_or(-1),
                selected_track_language_code: player.selected_track_language_code(),
                cached_timedtext_url: self.observer.cached_url(video_id),
            }),
        }
    }
}

fn parse_audio_tracks(raw: &[Value]) -> Vec<AudioCaptionTrack> {
    raw.iter()
        .filter_map(|track| {
            let url = track.get("url").and_then(Value::as_str)?;
            let parsed = match Url::parse(url) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Failed to parse audio caption track URL: {}", e);
                    return None;
                }
            };
            let language_code = parsed
                .query_pairs()
                .find(|(k, _)| k == "lang")
                .map(|(_, v)| v.into_owned());

            Some(AudioCaptionTrack {
                url: url.to_string(),
                vss_id: track
                    .get("vssId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                kind: track.get("kind").and_then(Value::as_str).map(String::from),
                language_code,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::channel::InProcessWindow;
    use crate::bridge::client::PageBridgeClient;
    use crate::test_support::{FakePlayer, FakePlayerLocator, ORIGIN};

    fn setup(player: Option<Arc<FakePlayer>>) -> (PageBridgeServer, PageBridgeClient) {
        let window = Arc::new(InProcessWindow::new(ORIGIN));
        let server = PageBridgeServer::new(
            window.clone(),
            Arc::new(FakePlayerLocator::new(player)),
            TimedtextObserver::new(),
        )
        .with_timedtext_wait_timeout(Duration::from_millis(5000));
        server.start();
        (server, PageBridgeClient::new(window, Duration::from_millis(6000)))
    }

    #[tokio::test]
    async fn reports_missing_player() {
        let (_server, client) = setup(None);
        let reply = client.request_player_data("abc").await;
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("PLAYER_NOT_FOUND"));
    }

    #[tokio::test]
    async fn reports_video_id_mismatch() {
        let (_server, client) = setup(Some(Arc::new(FakePlayer::new("other"))));
        let reply = client.request_player_data("abc").await;
        assert_eq!(reply.error.as_deref(), Some("VIDEO_ID_MISMATCH"));
    }

    #[tokio::test]
    async fn returns_normalized_player_data() {
        let player = Arc::new(
            FakePlayer::new("abc")
                .with_caption_track("/api/timedtext?v=abc&lang=en", "en", None, ".en")
                .with_audio_track("https://www.youtube.com/api/timedtext?v=abc&lang=en&pot=P", ".en")
                .with_audio_track("::not a url::", ".de"),
        );
        player.set_state(1);
        let (server, client) = setup(Some(player));
        server
            .observer()
            .observe("https://www.youtube.com/api/timedtext?v=abc&pot=CACHED");

        let data = client.request_player_data("abc").await.into_data().unwrap();
        assert_eq!(data.player_state, 1);
        assert_eq!(
            data.caption_tracks[0].base_url,
            "https://www.youtube.com/api/timedtext?v=abc&lang=en"
        );
        assert_eq!(data.audio_caption_tracks.len(), 1);
        assert_eq!(data.audio_caption_tracks[0].language_code.as_deref(), Some("en"));
        assert!(data.cached_timedtext_url.unwrap().contains("pot=CACHED"));
    }

    #[tokio::test]
    async fn ensure_turns_captions_on() {
        let player = Arc::new(FakePlayer::new("abc"));
        let (_server, client) = setup(Some(player.clone()));
        assert!(!player.captions_enabled());
        assert!(client.ensure_subtitles().await);
        assert!(player.captions_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_forgets_urls_and_releases_waiters() {
        let (server, _client) = setup(Some(Arc::new(FakePlayer::new("abc"))));
        let observer = server.observer().clone();
        observer.observe("https://www.youtube.com/api/timedtext?v=abc&pot=CACHED");

        let started = tokio::time::Instant::now();
        let waiting = {
            let observer = observer.clone();
            tokio::spawn(async move { observer.wait_for_url("other", Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;

        server.stop();
        assert_eq!(observer.cached_url("abc"), None);
        assert_eq!(waiting.await.unwrap(), None);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_timedtext_times_out_with_null() {
        let (_server, client) = setup(Some(Arc::new(FakePlayer::new("abc"))));
        assert_eq!(client.wait_for_timedtext("abc").await, None);
    }
}
