// Fakes shared by unit and scenario tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::bridge::page::{PlayerApi, PlayerLocator};
use crate::content::adapter::{PageEvent, PageHost};
use crate::error::{ProviderError, Result, SubtitlesError};
use crate::fetchers::youtube::http::{TimedTextClient, TimedTextResponse};
use crate::fetchers::SubtitlesFetcher;
use crate::location::{PageLocation, SharedLocation};
use crate::processor::ai_segmentation::AiSegmenter;
use crate::processor::translator::{SubtitleTranslateRequest, SubtitlesTranslator};
use crate::types::SubtitlesFragment;
use crate::video::{SimulatedVideo, VideoElement};

pub const ORIGIN: &str = "https://www.youtube.com";

/// Player object with scripted state
pub struct FakePlayer {
    video_id: Mutex<String>,
    caption_tracks: Mutex<Vec<Value>>,
    audio_tracks: Mutex<Vec<Value>>,
    pot_after_enable: Mutex<Option<Value>>,
    selected_language: Mutex<Option<String>>,
    state: AtomicI32,
    captions: AtomicBool,
}

impl FakePlayer {
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: Mutex::new(video_id.to_string()),
            caption_tracks: Mutex::new(Vec::new()),
            audio_tracks: Mutex::new(Vec::new()),
            pot_after_enable: Mutex::new(None),
            selected_language: Mutex::new(None),
            state: AtomicI32::new(-1),
            captions: AtomicBool::new(false),
        }
    }

    pub fn with_caption_track(self, base_url: &str, language: &str, kind: Option<&str>, vss_id: &str) -> Self {
        let mut track = json!({"baseUrl": base_url, "languageCode": language, "vssId": vss_id});
        if let Some(kind) = kind {
            track["kind"] = json!(kind);
        }
        self.caption_tracks.lock().push(track);
        self
    }

    pub fn with_audio_track(self, url: &str, vss_id: &str) -> Self {
        self.audio_tracks.lock().push(json!({"url": url, "vssId": vss_id}));
        self
    }

    /// Audio track carrying a POT token shows up only once captions are on
    pub fn with_pot_after_enable(self, url: &str, vss_id: &str) -> Self {
        *self.pot_after_enable.lock() = Some(json!({"url": url, "vssId": vss_id}));
        self
    }

    pub fn set_state(&self, state: i32) {
        self.state.store(state, Ordering::SeqCst);
    }

    pub fn set_video_id(&self, video_id: &str) {
        *self.video_id.lock() = video_id.to_string();
    }

    pub fn set_selected_language(&self, language: Option<&str>) {
        *self.selected_language.lock() = language.map(String::from);
    }
}

impl PlayerApi for FakePlayer {
    fn player_response(&self) -> Option<Value> {
        Some(json!({
            "videoDetails": {"videoId": *self.video_id.lock()},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": *self.caption_tracks.lock()}}
        }))
    }

    fn audio_caption_tracks(&self) -> Vec<Value> {
        self.audio_tracks.lock().clone()
    }

    fn device(&self) -> Option<String> {
        Some("cbrand=apple&cbr=Chrome&cos=Macintosh".to_string())
    }

    fn client_version(&self) -> Option<String> {
        Some("2.20240101.00.00".to_string())
    }

    fn player_state(&self) -> Option<i32> {
        Some(self.state.load(Ordering::SeqCst))
    }

    fn selected_track_language_code(&self) -> Option<String> {
        self.selected_language.lock().clone()
    }

    fn captions_enabled(&self) -> bool {
        self.captions.load(Ordering::SeqCst)
    }

    fn enable_captions(&self) {
        self.captions.store(true, Ordering::SeqCst);
        if let Some(track) = self.pot_after_enable.lock().take() {
            self.audio_tracks.lock().push(track);
        }
    }
}

pub struct FakePlayerLocator {
    player: Mutex<Option<Arc<FakePlayer>>>,
}

impl FakePlayerLocator {
    pub fn new(player: Option<Arc<FakePlayer>>) -> Self {
        Self {
            player: Mutex::new(player),
        }
    }
}

impl PlayerLocator for FakePlayerLocator {
    fn find_player(&self) -> Option<Arc<dyn PlayerApi>> {
        self.player
            .lock()
            .clone()
            .map(|player| player as Arc<dyn PlayerApi>)
    }
}

/// CDN double returning queued responses; 404 once the queue is empty
#[derive(Default)]
pub struct ScriptedTimedTextClient {
    responses: Mutex<VecDeque<TimedTextResponse>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTimedTextClient {
    pub fn new(responses: Vec<TimedTextResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: TimedTextResponse) {
        self.responses.lock().push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.requested.lock().len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl TimedTextClient for ScriptedTimedTextClient {
    async fn get(&self, url: &str) -> Result<TimedTextResponse> {
        self.requested.lock().push(url.to_string());
        Ok(self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| TimedTextResponse::status(404)))
    }
}

/// Translator that upper-cases text, or fails for chosen inputs
pub struct ScriptedTranslator {
    fail_all: Option<ProviderError>,
    fail_on: Vec<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<SubtitleTranslateRequest>>,
}

impl ScriptedTranslator {
    pub fn upper() -> Self {
        Self {
            fail_all: None,
            fail_on: Vec::new(),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            fail_all: Some(error),
            ..Self::upper()
        }
    }

    pub fn fail_on(mut self, text: &str) -> Self {
        self.fail_on.push(text.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SubtitleTranslateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SubtitlesTranslator for ScriptedTranslator {
    async fn translate(&self, request: SubtitleTranslateRequest) -> std::result::Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.fail_all {
            return Err(error.clone());
        }
        if self.fail_on.contains(&request.text) {
            return Err(ProviderError::new(format!("cannot translate {}", request.text)));
        }
        Ok(request.text.to_uppercase())
    }
}

/// Segmenter that answers with the input cues unchanged
#[derive(Default)]
pub struct EchoSegmenter {
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl EchoSegmenter {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiSegmenter for EchoSegmenter {
    async fn segment(&self, json_content: &str, _provider_id: &str) -> std::result::Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let cues: Vec<Value> = serde_json::from_str(json_content).map_err(|e| ProviderError::new(e.to_string()))?;
        let mut vtt = String::from("WEBVTT\n\n");
        for cue in cues {
            vtt.push_str(&format!(
                "{} --> {}\n{}\n\n",
                cue["s"].as_u64().unwrap_or(0),
                cue["e"].as_u64().unwrap_or(0),
                cue["t"].as_str().unwrap_or("")
            ));
        }
        Ok(vtt)
    }
}

pub struct FailingSegmenter {
    error: ProviderError,
    calls: AtomicUsize,
}

impl FailingSegmenter {
    pub fn new(error: ProviderError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiSegmenter for FailingSegmenter {
    async fn segment(&self, _json_content: &str, _provider_id: &str) -> std::result::Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Fetcher returning queued results, for adapter tests that skip the bridge
#[derive(Default)]
pub struct ScriptedFetcher {
    results: Mutex<VecDeque<Result<Vec<SubtitlesFragment>>>>,
    delay: Option<Duration>,
    has_cache: AtomicBool,
    fetches: AtomicUsize,
    cleanups: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(results: Vec<Result<Vec<SubtitlesFragment>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubtitlesFetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<Vec<SubtitlesFragment>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .results
            .lock()
            .pop_front()
            .unwrap_or(Err(SubtitlesError::NoSubtitlesFound));
        if matches!(&result, Ok(subtitles) if !subtitles.is_empty()) {
            self.has_cache.store(true, Ordering::SeqCst);
        }
        result
    }

    fn cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        self.has_cache.store(false, Ordering::SeqCst);
    }

    async fn should_use_same_track(&self) -> bool {
        self.has_cache.load(Ordering::SeqCst)
    }

    fn source_language(&self) -> String {
        "en".to_string()
    }
}

/// DOM double: styles, toasts and the toggle button are recorded
pub struct FakePageHost {
    location: Arc<SharedLocation>,
    video: Option<Arc<SimulatedVideo>>,
    controls_bar: AtomicBool,
    styles: Mutex<HashMap<String, String>>,
    style_injections: AtomicUsize,
    mounted_buttons: Mutex<Vec<String>>,
    toasts: Mutex<Vec<String>>,
    title: Mutex<String>,
    events: broadcast::Sender<PageEvent>,
}

impl FakePageHost {
    pub fn new(location: Arc<SharedLocation>, video: Option<Arc<SimulatedVideo>>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            location,
            video,
            controls_bar: AtomicBool::new(true),
            styles: Mutex::new(HashMap::new()),
            style_injections: AtomicUsize::new(0),
            mounted_buttons: Mutex::new(Vec::new()),
            toasts: Mutex::new(Vec::new()),
            title: Mutex::new("Test video - YouTube".to_string()),
            events,
        }
    }

    pub fn without_controls_bar(self) -> Self {
        self.controls_bar.store(false, Ordering::SeqCst);
        self
    }

    /// Change the URL and fire the SPA navigation event
    pub fn navigate(&self, href: &str, event: &str) {
        self.location.set(href);
        let _ = self.events.send(PageEvent::Navigate(event.to_string()));
    }

    pub fn click_toggle(&self, enabled: bool) {
        let _ = self.events.send(PageEvent::ToggleSubtitles(enabled));
    }

    pub fn style(&self, id: &str) -> Option<String> {
        self.styles.lock().get(id).cloned()
    }

    pub fn style_injections(&self) -> usize {
        self.style_injections.load(Ordering::SeqCst)
    }

    pub fn mounted_buttons(&self) -> Vec<String> {
        self.mounted_buttons.lock().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.toasts.lock().clone()
    }
}

impl PageLocation for FakePageHost {
    fn href(&self) -> String {
        self.location.href()
    }
}

#[async_trait]
impl PageHost for FakePageHost {
    async fn wait_for_video(&self, _video_selector: &str, _container_selector: &str) -> Option<Arc<dyn VideoElement>> {
        self.video.clone().map(|video| video as Arc<dyn VideoElement>)
    }

    async fn wait_for_controls_bar(&self, _selector: &str) -> bool {
        self.controls_bar.load(Ordering::SeqCst)
    }

    fn mount_toggle_button(&self, _controls_selector: &str, container_id: &str) {
        let mut mounted = self.mounted_buttons.lock();
        mounted.retain(|id| id != container_id);
        mounted.push(container_id.to_string());
    }

    fn has_style(&self, id: &str) -> bool {
        self.styles.lock().contains_key(id)
    }

    fn inject_style(&self, id: &str, css: &str) {
        self.style_injections.fetch_add(1, Ordering::SeqCst);
        self.styles.lock().insert(id.to_string(), css.to_string());
    }

    fn remove_style(&self, id: &str) {
        self.styles.lock().remove(id);
    }

    fn document_title(&self) -> String {
        self.title.lock().clone()
    }

    fn show_toast(&self, message: &str) {
        self.toasts.lock().push(message.to_string());
    }

    fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }
}
