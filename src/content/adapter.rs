//! Универсальный адаптер видеоплатформы
//!
//! Связывает загрузчик, планировщик, конвейер сегментации и координатор
//! перевода для одного видео. При SPA-навигации на другое видео всё
//! состояние сессии разбирается и собирается заново.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigSource, PipelineSettings};
use crate::constants::{HIDE_NATIVE_CAPTIONS_STYLE_ID, NAVIGATION_HANDLER_DELAY_MS, TRANSLATE_BUTTON_CONTAINER_ID};
use crate::content::coordinator::{TranslationCoordinator, TranslationCoordinatorOptions};
use crate::content::platforms::PlatformConfig;
use crate::content::scheduler::SubtitlesScheduler;
use crate::content::segmentation::SegmentationPipeline;
use crate::error::SubtitlesError;
use crate::fetchers::SubtitlesFetcher;
use crate::location::PageLocation;
use crate::processor::ai_segmentation::AiSegmenter;
use crate::processor::translator::{SubtitlesTranslator, SubtitlesVideoContext};
use crate::store::SubtitlesStore;
use crate::types::{SubtitlePosition, SubtitlesFragment, SubtitlesState};
use crate::video::VideoElement;

/// События страницы, на которые реагирует адаптер
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Событие SPA-навигации с его именем
    Navigate(String),
    /// Пользователь переключил кнопку перевода
    ToggleSubtitles(bool),
}

/// Поверхность DOM, нужная адаптеру
#[async_trait]
pub trait PageHost: PageLocation {
    /// Дождаться `<video>` внутри контейнера плеера
    async fn wait_for_video(&self, video_selector: &str, container_selector: &str) -> Option<Arc<dyn VideoElement>>;

    /// Дождаться панели управления плеера
    async fn wait_for_controls_bar(&self, selector: &str) -> bool;

    /// Смонтировать кнопку перевода; прежний элемент с тем же id удаляется
    fn mount_toggle_button(&self, controls_selector: &str, container_id: &str);

    fn has_style(&self, id: &str) -> bool;

    fn inject_style(&self, id: &str, css: &str);

    fn remove_style(&self, id: &str);

    fn document_title(&self) -> String;

    fn show_toast(&self, message: &str);

    fn subscribe(&self) -> broadcast::Receiver<PageEvent>;
}

/// Внешние сервисы сессии
pub struct AdapterServices {
    pub fetcher: Arc<dyn SubtitlesFetcher>,
    pub config: Arc<dyn ConfigSource>,
    pub translator: Arc<dyn SubtitlesTranslator>,
    pub segmenter: Arc<dyn AiSegmenter>,
}

#[derive(Default)]
struct AdapterState {
    scheduler: Option<SubtitlesScheduler>,
    original_subtitles: Vec<SubtitlesFragment>,
    processed_fragments: Vec<SubtitlesFragment>,
    segmentation_pipeline: Option<SegmentationPipeline>,
    coordinator: Option<TranslationCoordinator>,
    native_subtitles_hidden: bool,
    cached_video_id: Option<String>,
    /// Номер сессии видео, растёт при навигации
    session: u64,
}

struct AdapterInner {
    platform: PlatformConfig,
    host: Arc<dyn PageHost>,
    services: AdapterServices,
    store: SubtitlesStore,
    settings: PipelineSettings,
    navigation_delay: Duration,
    state: Mutex<AdapterState>,
    shutdown: CancellationToken,
}

#[derive(Clone)]
pub struct UniversalVideoAdapter {
    inner: Arc<AdapterInner>,
}

impl UniversalVideoAdapter {
    pub fn new(platform: PlatformConfig, host: Arc<dyn PageHost>, services: AdapterServices, store: SubtitlesStore) -> Self {
        Self::with_settings(
            platform,
            host,
            services,
            store,
            PipelineSettings::default(),
            Duration::from_millis(NAVIGATION_HANDLER_DELAY_MS),
        )
    }

    /// Собрать адаптер с другими таймингами
    pub fn with_settings(
        platform: PlatformConfig,
        host: Arc<dyn PageHost>,
        services: AdapterServices,
        store: SubtitlesStore,
        settings: PipelineSettings,
        navigation_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                platform,
                host,
                services,
                store,
                settings,
                navigation_delay,
                state: Mutex::new(AdapterState::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Подготовить планировщик и кнопку, подписаться на события страницы
    pub async fn initialize(&self) {
        // Подписка раньше ожиданий DOM, чтобы не пропустить события
        self.setup_event_listeners();
        self.inner.initialize_scheduler().await;
        self.inner.render_translate_button().await;
        info!("Subtitles adapter initialized for {}", self.inner.platform.name);
    }

    pub fn store(&self) -> SubtitlesStore {
        self.inner.store.clone()
    }

    pub fn scheduler(&self) -> Option<SubtitlesScheduler> {
        self.inner.scheduler()
    }

    pub fn coordinator(&self) -> Option<TranslationCoordinator> {
        self.inner.state.lock().coordinator.clone()
    }

    pub fn segmentation_pipeline(&self) -> Option<SegmentationPipeline> {
        self.inner.state.lock().segmentation_pipeline.clone()
    }

    pub fn original_subtitles(&self) -> Vec<SubtitlesFragment> {
        self.inner.state.lock().original_subtitles.clone()
    }

    pub fn processed_fragments(&self) -> Vec<SubtitlesFragment> {
        self.inner.state.lock().processed_fragments.clone()
    }

    pub fn native_subtitles_hidden(&self) -> bool {
        self.inner.state.lock().native_subtitles_hidden
    }

    /// Включить или выключить перевод, как по клику на кнопку
    pub async fn toggle_subtitles(&self, enabled: bool) {
        self.inner.handle_toggle(enabled).await;
    }

    /// Разобрать всю сессию и перестать слушать страницу
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.reset_for_navigation();
    }

    fn setup_event_listeners(&self) {
        let mut events = self.inner.host.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => event,
                };
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Adapter skipped {} page events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };

                match event {
                    PageEvent::Navigate(name) => {
                        if inner.platform.events.navigate == Some(name.as_str()) {
                            inner.on_navigate();
                        }
                    }
                    PageEvent::ToggleSubtitles(enabled) => {
                        // Перевод может долго ждать сети: не блокируем очередь событий
                        tokio::spawn(async move { inner.handle_toggle(enabled).await });
                    }
                }
            }
            debug!("Adapter event listener finished");
        });
    }
}

impl AdapterInner {
    fn scheduler(&self) -> Option<SubtitlesScheduler> {
        self.state.lock().scheduler.clone()
    }

    fn current_video_id(&self) -> Option<String> {
        self.host.url().and_then(|url| self.platform.video_id(&url))
    }

    fn is_stale(&self, session: u64) -> bool {
        self.state.lock().session != session
    }

    async fn initialize_scheduler(&self) {
        let selectors = &self.platform.selectors;
        let Some(video) = self.host.wait_for_video(selectors.video, selectors.player_container).await else {
            warn!("Video element not found");
            self.host.show_toast(&SubtitlesError::VideoNotFound.to_string());
            return;
        };

        let scheduler = SubtitlesScheduler::new(video, self.store.clone());
        scheduler.start();
        scheduler.hide();

        let previous = self.state.lock().scheduler.replace(scheduler);
        if let Some(previous) = previous {
            previous.reset();
            previous.stop();
        }
    }

    async fn render_translate_button(&self) {
        let selector = self.platform.selectors.controls_bar;
        if !self.host.wait_for_controls_bar(selector).await {
            warn!("Controls bar {} not found", selector);
            self.host.show_toast(&SubtitlesError::ControlsBarNotFound.to_string());
            return;
        }
        self.host.mount_toggle_button(selector, TRANSLATE_BUTTON_CONTAINER_ID);
    }

    fn video_id_changed(&self) -> bool {
        let cached = self.state.lock().cached_video_id.clone();
        match (cached, self.current_video_id()) {
            (Some(cached), Some(current)) => cached != current,
            _ => false,
        }
    }

    fn on_navigate(self: &Arc<Self>) {
        if !self.video_id_changed() {
            return;
        }
        debug!("Video changed, resetting subtitles");
        if let Some(scheduler) = self.scheduler() {
            scheduler.reset();
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let delay = self.navigation_delay;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_navigation().await;
                    }
                }
            }
        });
    }

    async fn handle_navigation(&self) {
        // Навигация могла вернуть на то же видео за время задержки
        if !self.video_id_changed() {
            return;
        }
        self.reset_for_navigation();
        self.initialize_scheduler().await;
        self.render_translate_button().await;
    }

    fn reset_for_navigation(&self) {
        let (scheduler, coordinator, pipeline) = {
            let mut state = self.state.lock();
            state.session += 1;
            state.original_subtitles.clear();
            state.processed_fragments.clear();
            state.cached_video_id = None;
            (
                state.scheduler.take(),
                state.coordinator.take(),
                state.segmentation_pipeline.take(),
            )
        };

        if let Some(scheduler) = scheduler {
            scheduler.reset();
            scheduler.stop();
        }
        if let Some(coordinator) = coordinator {
            coordinator.stop();
            coordinator.reset();
        }
        if let Some(pipeline) = pipeline {
            pipeline.stop();
        }

        self.services.fetcher.cleanup();
        self.show_native_subtitles();
        self.store.set_position(SubtitlePosition::default());
    }

    async fn handle_toggle(self: &Arc<Self>, enabled: bool) {
        if enabled {
            if let Some(scheduler) = self.scheduler() {
                scheduler.start();
                scheduler.show();
            }
            self.hide_native_subtitles();
            self.start_translation().await;
        } else {
            if let Some(scheduler) = self.scheduler() {
                scheduler.hide();
            }
            self.show_native_subtitles();
            let coordinator = self.state.lock().coordinator.clone();
            if let Some(coordinator) = coordinator {
                coordinator.stop();
            }
        }
    }

    fn hide_native_subtitles(&self) {
        let mut state = self.state.lock();
        if state.native_subtitles_hidden {
            return;
        }
        state.native_subtitles_hidden = true;
        if self.host.has_style(HIDE_NATIVE_CAPTIONS_STYLE_ID) {
            return;
        }
        let selector = self.platform.selectors.native_subtitles;
        let css = format!(
            "{selector},\n{selector} * {{\n  display: none !important;\n  opacity: 0 !important;\n  visibility: hidden !important;\n}}"
        );
        self.host.inject_style(HIDE_NATIVE_CAPTIONS_STYLE_ID, &css);
    }

    fn show_native_subtitles(&self) {
        let mut state = self.state.lock();
        if !state.native_subtitles_hidden {
            return;
        }
        state.native_subtitles_hidden = false;
        self.host.remove_style(HIDE_NATIVE_CAPTIONS_STYLE_ID);
    }

    fn set_scheduler_state(&self, state: SubtitlesState, message: Option<String>) {
        if let Some(scheduler) = self.scheduler() {
            scheduler.set_state(state, message);
        }
    }

    async fn start_translation(self: &Arc<Self>) {
        let session = {
            let mut state = self.state.lock();
            state.cached_video_id = self.current_video_id();
            state.session
        };

        let same_track = self.services.fetcher.should_use_same_track().await;
        if self.is_stale(session) {
            return;
        }

        let (coordinator, pipeline) = {
            let state = self.state.lock();
            (state.coordinator.clone(), state.segmentation_pipeline.clone())
        };
        if same_track {
            if let Some(coordinator) = coordinator {
                debug!("Resuming translation on the same track");
                coordinator.clear_failed();
                if let Some(pipeline) = pipeline {
                    pipeline.clear_failed_starts();
                }
                coordinator.start(None);
                return;
            }
        }

        let (coordinator, pipeline) = {
            let mut state = self.state.lock();
            state.processed_fragments.clear();
            (state.coordinator.take(), state.segmentation_pipeline.take())
        };
        if let Some(coordinator) = coordinator {
            coordinator.stop();
            coordinator.reset();
        }
        if let Some(pipeline) = pipeline {
            pipeline.stop();
        }
        if let Some(scheduler) = self.scheduler() {
            scheduler.reset();
        }

        self.set_scheduler_state(SubtitlesState::Fetching, None);
        let result = self.services.fetcher.fetch().await;
        if self.is_stale(session) {
            debug!("Dropping subtitles fetched for a previous video");
            return;
        }

        match result {
            Ok(subtitles) if subtitles.is_empty() => {
                self.set_scheduler_state(SubtitlesState::Error, Some(SubtitlesError::NoSubtitlesFound.to_string()));
            }
            Ok(subtitles) => {
                self.set_scheduler_state(SubtitlesState::FetchSuccess, None);
                self.state.lock().original_subtitles = subtitles;
                self.process_subtitles(session).await;
            }
            Err(e) if e.is_toast() => {
                warn!("Subtitles unavailable: {}", e);
                self.host.show_toast(&e.to_string());
            }
            Err(e) => {
                error!("Failed to fetch subtitles: {}", e);
                self.set_scheduler_state(SubtitlesState::Error, Some(e.to_string()));
            }
        }
    }

    async fn process_subtitles(self: &Arc<Self>, session: u64) {
        self.set_scheduler_state(SubtitlesState::Processing, None);

        let config = self.services.config.get_local_config().await;
        if self.is_stale(session) {
            return;
        }
        let Some(scheduler) = self.scheduler() else {
            warn!("No scheduler, translation is not started");
            return;
        };

        let ai_segmentation = config.as_ref().is_some_and(|c| c.video_subtitles.ai_segmentation);
        let original = self.state.lock().original_subtitles.clone();
        let video_context = SubtitlesVideoContext {
            video_title: self.host.document_title(),
            subtitles_text_content: original.iter().map(|f| f.text.as_str()).collect::<String>(),
        };

        let (fragments, pipeline) = if ai_segmentation {
            let pipeline = SegmentationPipeline::new(
                original,
                scheduler.video(),
                self.services.config.clone(),
                self.services.segmenter.clone(),
                self.services.fetcher.source_language(),
                self.settings.clone(),
            );
            (Vec::new(), Some(pipeline))
        } else {
            (original, None)
        };

        // Колбэки молчат, если сессия уже сменилась
        let weak = Arc::downgrade(self);
        let on_translated_scheduler = scheduler.clone();
        let on_translated_session = weak.clone();
        let on_state_scheduler = scheduler.clone();
        let on_state_session = weak;
        let coordinator = TranslationCoordinator::new(TranslationCoordinatorOptions {
            fragments: fragments.clone(),
            segmentation_pipeline: pipeline.clone(),
            video: scheduler.video(),
            translator: self.services.translator.clone(),
            config: self.services.config.clone(),
            settings: self.settings.clone(),
            on_translated: Arc::new(move |fragments: Vec<SubtitlesFragment>| {
                if is_current(&on_translated_session, session) {
                    on_translated_scheduler.supplement_subtitles(fragments);
                }
            }),
            on_state_change: Arc::new(move |state: SubtitlesState, message: Option<String>| {
                if is_current(&on_state_session, session) {
                    on_state_scheduler.set_state(state, message);
                }
            }),
        });

        let (replaced_coordinator, replaced_pipeline) = {
            let mut state = self.state.lock();
            if state.session != session {
                return;
            }
            state.processed_fragments = fragments;
            (
                state.coordinator.replace(coordinator.clone()),
                std::mem::replace(&mut state.segmentation_pipeline, pipeline),
            )
        };
        // Перекрывшиеся включения: предыдущий перевод больше не нужен
        if let Some(replaced) = replaced_coordinator {
            replaced.stop();
            replaced.reset();
        }
        if let Some(replaced) = replaced_pipeline {
            replaced.stop();
        }

        info!("Starting translation (AI segmentation: {})", ai_segmentation);
        coordinator.start(Some(video_context));
    }
}

fn is_current(adapter: &Weak<AdapterInner>, session: u64) -> bool {
    adapter.upgrade().is_some_and(|inner| !inner.is_stale(session))
}

impl Drop for AdapterInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
