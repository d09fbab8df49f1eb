//! Планировщик отображения субтитров
//!
//! Часы берутся у самого видео: на каждый `timeupdate` / `seeking`
//! планировщик ищет реплику под курсором и публикует её в хранилище,
//! только если индекс изменился.

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::constants::ERROR_STATE_AUTO_HIDE_MS;
use crate::store::SubtitlesStore;
use crate::types::{find_at, seconds_to_ms, sort_by_start, StateData, SubtitlesFragment, SubtitlesState};
use crate::video::{VideoElement, VideoEvent};

struct SchedulerState {
    subtitles: Vec<SubtitlesFragment>,
    current_index: Option<usize>,
    is_active: bool,
    current_state: StateData,
    error_auto_hide: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
}

struct SchedulerInner {
    video: Arc<dyn VideoElement>,
    store: SubtitlesStore,
    error_auto_hide_delay: Duration,
    state: Mutex<SchedulerState>,
}

/// Планировщик для одного видео
#[derive(Clone)]
pub struct SubtitlesScheduler {
    inner: Arc<SchedulerInner>,
}

impl SubtitlesScheduler {
    /// Создать планировщик и сразу подписаться на события видео
    ///
    /// Должен вызываться внутри tokio runtime, иначе слушатель не запустится.
    pub fn new(video: Arc<dyn VideoElement>, store: SubtitlesStore) -> Self {
        Self::with_error_auto_hide(video, store, Duration::from_millis(ERROR_STATE_AUTO_HIDE_MS))
    }

    pub fn with_error_auto_hide(video: Arc<dyn VideoElement>, store: SubtitlesStore, delay: Duration) -> Self {
        let scheduler = Self {
            inner: Arc::new(SchedulerInner {
                video,
                store,
                error_auto_hide_delay: delay,
                state: Mutex::new(SchedulerState {
                    subtitles: Vec::new(),
                    current_index: None,
                    is_active: false,
                    current_state: StateData::default(),
                    error_auto_hide: None,
                    listener: None,
                }),
            }),
        };
        scheduler.attach_listeners();
        scheduler
    }

    pub fn video(&self) -> Arc<dyn VideoElement> {
        self.inner.video.clone()
    }

    fn attach_listeners(&self) {
        let mut state = self.inner.state.lock();
        if state.listener.is_some() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("Scheduler created outside of a runtime, video events are not tracked");
            return;
        };

        // Подписка до spawn, чтобы не потерять события между ними
        let mut events = self.inner.video.subscribe();
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        state.listener = Some(handle.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(VideoEvent::TimeUpdate) | Ok(VideoEvent::Seeking) => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.handle_time_update();
                    }
                    Ok(VideoEvent::Seeked) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Scheduler skipped {} video events", skipped);
                        let Some(inner) = weak.upgrade() else { break };
                        inner.handle_time_update();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn detach_listeners(&self) {
        if let Some(listener) = self.inner.state.lock().listener.take() {
            listener.abort();
        }
    }

    pub fn start(&self) {
        self.inner.state.lock().is_active = true;
        self.attach_listeners();
        self.inner.update_visibility();
    }

    pub fn stop(&self) {
        self.inner.state.lock().is_active = false;
        self.detach_listeners();
        self.inner.update_visibility();
    }

    pub fn show(&self) {
        self.inner.state.lock().is_active = true;
        self.inner.update_visibility();
    }

    pub fn hide(&self) {
        self.inner.state.lock().is_active = false;
        self.inner.update_visibility();
    }

    /// Сменить состояние; таймер автоскрытия ошибки перезапускается всегда
    pub fn set_state(&self, new_state: SubtitlesState, message: Option<String>) {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.error_auto_hide.take() {
            timer.abort();
        }

        state.current_state = StateData::new(new_state, message);
        self.inner.publish_state(&state.current_state);

        if new_state != SubtitlesState::Error {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("No runtime for the error auto-hide timer");
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.error_auto_hide_delay;
        state.error_auto_hide = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire_error();
            }
        }));
    }

    pub fn state(&self) -> StateData {
        self.inner.state.lock().current_state.clone()
    }

    /// Вернуться в idle и забыть все реплики
    pub fn reset(&self) {
        self.set_state(SubtitlesState::Idle, None);
        {
            let mut state = self.inner.state.lock();
            state.subtitles.clear();
            state.current_index = None;
        }
        self.inner.store.set_current_subtitle(None);
    }

    /// Влить свежие переводы в список по времени начала
    ///
    /// Если обновилась реплика, которая сейчас на экране, она
    /// публикуется заново, не дожидаясь смены индекса.
    pub fn supplement_subtitles(&self, fragments: Vec<SubtitlesFragment>) {
        if fragments.is_empty() {
            return;
        }

        let current_updated = {
            let mut state = self.inner.state.lock();
            let current_start = state
                .current_index
                .and_then(|i| state.subtitles.get(i))
                .map(|f| f.start);

            let mut current_updated = false;
            for fragment in fragments {
                match state.subtitles.iter_mut().find(|f| f.start == fragment.start) {
                    None => state.subtitles.push(fragment),
                    Some(existing) if fragment.has_translation() => {
                        existing.translation = fragment.translation;
                        if current_start == Some(existing.start) {
                            current_updated = true;
                        }
                    }
                    Some(_) => {}
                }
            }
            sort_by_start(&mut state.subtitles);
            // Индексы сдвинулись после сортировки
            let index = current_start.and_then(|start| state.subtitles.iter().position(|f| f.start == start));
            state.current_index = index;
            current_updated
        };

        self.inner.update_subtitles();

        if current_updated {
            let state = self.inner.state.lock();
            let subtitle = state.current_index.and_then(|i| state.subtitles.get(i)).cloned();
            self.inner.store.set_current_subtitle(subtitle);
        }
    }

    pub fn subtitles(&self) -> Vec<SubtitlesFragment> {
        self.inner.state.lock().subtitles.clone()
    }
}

impl SchedulerInner {
    /// События видео не обрабатываются, пока планировщик скрыт
    fn handle_time_update(&self) {
        if !self.state.lock().is_active {
            return;
        }
        self.update_subtitles();
    }

    fn update_subtitles(&self) {
        let time_ms = seconds_to_ms(self.video.current_time());
        self.store.set_current_time_ms(time_ms);

        let mut state = self.state.lock();
        let index = find_at(&state.subtitles, time_ms);
        if index != state.current_index {
            state.current_index = index;
            let subtitle = index.and_then(|i| state.subtitles.get(i)).cloned();
            self.store.set_current_subtitle(subtitle);
        }
    }

    fn update_visibility(&self) {
        let visible = self.state.lock().is_active;
        self.store.set_visible(visible);
    }

    fn publish_state(&self, data: &StateData) {
        if data.state == SubtitlesState::Idle {
            self.store.set_state(None);
        } else {
            self.store.set_state(Some(data.clone()));
        }
    }

    fn expire_error(&self) {
        let mut state = self.state.lock();
        // Свой собственный handle: забираем без abort
        state.error_auto_hide.take();
        if state.current_state.state == SubtitlesState::Error {
            debug!("Error state expired");
            state.current_state = StateData::default();
            self.publish_state(&state.current_state);
        }
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(listener) = state.listener.take() {
            listener.abort();
        }
        if let Some(timer) = state.error_auto_hide.take() {
            timer.abort();
        }
    }
}
