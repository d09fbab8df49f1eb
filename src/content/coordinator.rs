//! Координатор перевода
//!
//! Переводит реплики рядом с курсором воспроизведения небольшими
//! пакетами. Одновременно в работе не больше одного пакета.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::config::{ConfigSource, DisplayMode, PipelineSettings};
use crate::content::segmentation::SegmentationPipeline;
use crate::processor::translator::{translate_subtitles, SubtitlesTranslator, SubtitlesVideoContext};
use crate::types::{find_at, seconds_to_ms, SubtitlesFragment, SubtitlesState};
use crate::video::{VideoElement, VideoEvent};

/// Состояние перевода одной реплики; отсутствие записи значит «не трогали»
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    InFlight,
    Done,
    Failed,
}

pub type TranslatedCallback = Arc<dyn Fn(Vec<SubtitlesFragment>) + Send + Sync>;
pub type StateChangeCallback = Arc<dyn Fn(SubtitlesState, Option<String>) + Send + Sync>;

pub struct TranslationCoordinatorOptions {
    /// Готовый список реплик, если AI сегментация выключена
    pub fragments: Vec<SubtitlesFragment>,
    pub segmentation_pipeline: Option<SegmentationPipeline>,
    pub video: Arc<dyn VideoElement>,
    pub translator: Arc<dyn SubtitlesTranslator>,
    pub config: Arc<dyn ConfigSource>,
    pub settings: PipelineSettings,
    pub on_translated: TranslatedCallback,
    pub on_state_change: StateChangeCallback,
}

#[derive(Default)]
struct CoordinatorState {
    statuses: HashMap<u64, TranslationStatus>,
    is_translating: bool,
    video_context: SubtitlesVideoContext,
    listener: Option<JoinHandle<()>>,
    /// Растёт при reset: результаты старых пакетов отбрасываются
    epoch: u64,
}

struct CoordinatorInner {
    options: TranslationCoordinatorOptions,
    state: Mutex<CoordinatorState>,
}

#[derive(Clone)]
pub struct TranslationCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl TranslationCoordinator {
    pub fn new(options: TranslationCoordinatorOptions) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                options,
                state: Mutex::new(CoordinatorState::default()),
            }),
        }
    }

    /// Подписаться на события видео, запустить сегментацию и сразу
    /// обработать текущую позицию
    pub fn start(&self, video_context: Option<SubtitlesVideoContext>) {
        if let Some(context) = video_context {
            self.inner.state.lock().video_context = context;
        }
        self.attach_listeners();
        if let Some(pipeline) = &self.inner.options.segmentation_pipeline {
            pipeline.start();
        }
        self.inner.tick();
    }

    pub fn stop(&self) {
        if let Some(listener) = self.inner.state.lock().listener.take() {
            listener.abort();
        }
        if let Some(pipeline) = &self.inner.options.segmentation_pipeline {
            pipeline.stop();
        }
    }

    /// Забыть все статусы; незавершённые пакеты будут проигнорированы
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.statuses.clear();
        state.is_translating = false;
        state.video_context = SubtitlesVideoContext::default();
        state.epoch += 1;
    }

    /// Вернуть реплики с ошибкой перевода в очередь
    pub fn clear_failed(&self) {
        self.inner
            .state
            .lock()
            .statuses
            .retain(|_, status| *status != TranslationStatus::Failed);
    }

    pub fn status(&self, start: u64) -> Option<TranslationStatus> {
        self.inner.state.lock().statuses.get(&start).copied()
    }

    pub fn is_translating(&self) -> bool {
        self.inner.state.lock().is_translating
    }

    /// Обработать текущую позицию видео вне событий
    pub fn tick(&self) {
        self.inner.tick();
    }

    fn attach_listeners(&self) {
        let mut state = self.inner.state.lock();
        if state.listener.is_some() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("No runtime for translation coordinator listeners");
            return;
        };

        let mut events = self.inner.options.video.subscribe();
        let weak = Arc::downgrade(&self.inner);
        state.listener = Some(handle.spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(_)) => VideoEvent::TimeUpdate,
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                match event {
                    VideoEvent::TimeUpdate => inner.tick(),
                    VideoEvent::Seeked => {
                        inner.tick();
                        if let Some(pipeline) = &inner.options.segmentation_pipeline {
                            pipeline.restart();
                        }
                    }
                    VideoEvent::Seeking => {}
                }
            }
        }));
    }
}

impl CoordinatorInner {
    fn fragments(&self) -> Vec<SubtitlesFragment> {
        match &self.options.segmentation_pipeline {
            Some(pipeline) => pipeline.processed_fragments(),
            None => self.options.fragments.clone(),
        }
    }

    fn tick(self: &Arc<Self>) {
        let now = seconds_to_ms(self.options.video.current_time());

        if let Some(pipeline) = &self.options.segmentation_pipeline {
            if !pipeline.is_running() && pipeline.needs_processing_at(now) {
                let processed = pipeline.processed_fragments();
                let current_translated = find_at(&processed, now)
                    .map(|i| self.state.lock().statuses.get(&processed[i].start) == Some(&TranslationStatus::Done))
                    .unwrap_or(false);
                if !current_translated {
                    (self.options.on_state_change)(SubtitlesState::Segmenting, None);
                }
                pipeline.restart();
            }
        }

        self.translate_nearby(now);
    }

    fn translate_nearby(self: &Arc<Self>, now: u64) {
        let fragments = self.fragments();
        let settings = &self.options.settings;
        let window_start = now.saturating_sub(settings.translate_look_behind_ms);
        let window_end = now + settings.translate_look_ahead_ms;

        // Пакет забирается синхронно, до первого await
        let (batch, show_processing, context, epoch) = {
            let mut state = self.state.lock();
            if state.is_translating {
                return;
            }

            let batch: Vec<SubtitlesFragment> = fragments
                .iter()
                .filter(|f| f.start >= window_start && f.start <= window_end && !state.statuses.contains_key(&f.start))
                .take(settings.translation_batch_size)
                .cloned()
                .collect();
            if batch.is_empty() {
                return;
            }

            let show_processing = find_at(&fragments, now)
                .map(|i| state.statuses.get(&fragments[i].start) != Some(&TranslationStatus::Done))
                .unwrap_or(false);

            state.is_translating = true;
            for fragment in &batch {
                state.statuses.insert(fragment.start, TranslationStatus::InFlight);
            }
            (batch, show_processing, state.video_context.clone(), state.epoch)
        };

        if show_processing {
            (self.options.on_state_change)(SubtitlesState::Processing, None);
        }

        let Ok(handle) = Handle::try_current() else {
            warn!("No runtime for the translation batch");
            self.finish_batch(epoch, &batch, |_| TranslationStatus::Failed);
            return;
        };

        let inner = self.clone();
        handle.spawn(async move {
            debug!("Translating batch of {} fragments at {}ms", batch.len(), now);
            let config = inner.options.config.get_local_config().await;
            let translation_only = config.as_ref().map(|c| c.display_mode()) == Some(DisplayMode::TranslationOnly);
            let result = translate_subtitles(&batch, &context, config.as_ref(), inner.options.translator.as_ref()).await;

            match result {
                Ok(results) => {
                    let failed: HashMap<u64, bool> = results.iter().map(|r| (r.fragment.start, r.failed)).collect();
                    let is_current = inner.finish_batch(epoch, &batch, |start| {
                        if failed.get(&start).copied().unwrap_or(true) {
                            TranslationStatus::Failed
                        } else {
                            TranslationStatus::Done
                        }
                    });
                    if !is_current {
                        return;
                    }

                    let translated: Vec<SubtitlesFragment> = results
                        .into_iter()
                        .map(|r| {
                            let mut fragment = r.fragment;
                            if r.failed && translation_only {
                                fragment.translation = Some(fragment.text.clone());
                            }
                            fragment
                        })
                        .collect();
                    (inner.options.on_translated)(translated);
                    (inner.options.on_state_change)(SubtitlesState::Idle, None);
                }
                Err(e) => {
                    warn!("Translation batch at {}ms failed: {}", now, e);
                    if !inner.finish_batch(epoch, &batch, |_| TranslationStatus::Failed) {
                        return;
                    }
                    if translation_only {
                        let originals = batch
                            .iter()
                            .map(|f| SubtitlesFragment {
                                translation: Some(f.text.clone()),
                                ..f.clone()
                            })
                            .collect();
                        (inner.options.on_translated)(originals);
                    }
                    (inner.options.on_state_change)(SubtitlesState::Error, Some(e.to_string()));
                }
            }
        });
    }

    /// Записать итоговые статусы пакета; `false`, если после его запуска
    /// был reset и результат нужно выбросить
    fn finish_batch(&self, epoch: u64, batch: &[SubtitlesFragment], status: impl Fn(u64) -> TranslationStatus) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!("Dropping stale translation batch");
            return false;
        }
        for fragment in batch {
            state.statuses.insert(fragment.start, status(fragment.start));
        }
        state.is_translating = false;
        true
    }
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        if let Some(listener) = self.state.get_mut().listener.take() {
            listener.abort();
        }
    }
}
