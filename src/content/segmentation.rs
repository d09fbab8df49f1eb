//! Конвейер AI сегментации
//!
//! Сырые реплики пересегментируются порциями по окну вперёд от текущей
//! позиции видео. Порция помечается как взятая до вызова модели, чтобы
//! быстрый повторный тик не отправил её второй раз. При ошибке модели
//! порция обрабатывается оптимизатором, чтобы пользователь увидел хоть
//! что-то.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::config::{ConfigSource, PipelineSettings};
use crate::error::SubtitlesError;
use crate::processor::ai_segmentation::{ai_segment_block, AiSegmenter};
use crate::processor::optimizer::optimize_subtitles;
use crate::types::{seconds_to_ms, sort_by_start, SubtitlesFragment};
use crate::utils::text::{is_cjk_language, join_text};
use crate::video::VideoElement;

#[derive(Default)]
struct PipelineState {
    processed: Vec<SubtitlesFragment>,
    segmented_starts: HashSet<u64>,
    failed_starts: HashSet<u64>,
    running: bool,
    stopped: bool,
}

struct PipelineInner {
    raw: Vec<SubtitlesFragment>,
    video: Arc<dyn VideoElement>,
    config: Arc<dyn ConfigSource>,
    segmenter: Arc<dyn AiSegmenter>,
    source_language: String,
    settings: PipelineSettings,
    state: Mutex<PipelineState>,
}

/// Сбрасывает флаг `running`, даже если цикл прервался
struct RunningGuard(Arc<PipelineInner>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.state.lock().running = false;
    }
}

#[derive(Clone)]
pub struct SegmentationPipeline {
    inner: Arc<PipelineInner>,
}

impl SegmentationPipeline {
    pub fn new(
        raw_fragments: Vec<SubtitlesFragment>,
        video: Arc<dyn VideoElement>,
        config: Arc<dyn ConfigSource>,
        segmenter: Arc<dyn AiSegmenter>,
        source_language: impl Into<String>,
        settings: PipelineSettings,
    ) -> Self {
        let source_language = source_language.into();
        let mut raw = raw_fragments;
        sort_by_start(&mut raw);
        let raw = merge_same_start(raw, is_cjk_language(&source_language));

        Self {
            inner: Arc::new(PipelineInner {
                raw,
                video,
                config,
                segmenter,
                source_language,
                settings,
                state: Mutex::new(PipelineState::default()),
            }),
        }
    }

    /// Уже обработанные реплики, отсортированные по началу
    pub fn processed_fragments(&self) -> Vec<SubtitlesFragment> {
        self.inner.state.lock().processed.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Есть ли хоть одна сырая реплика, ещё не взятая в работу
    pub fn has_unprocessed_chunks(&self) -> bool {
        let state = self.inner.state.lock();
        self.inner.raw.iter().any(|f| !state.segmented_starts.contains(&f.start))
    }

    /// Есть ли работа в окне обработки вокруг `time_ms`
    pub fn needs_processing_at(&self, time_ms: u64) -> bool {
        let state = self.inner.state.lock();
        self.inner.find_first_pending(&state, time_ms).is_some()
    }

    pub fn start(&self) {
        self.inner.state.lock().stopped = false;
        self.spawn_loop();
    }

    /// Остановить цикл; текущий вызов модели доработает, но его результат
    /// уже не запустит следующую порцию
    pub fn stop(&self) {
        self.inner.state.lock().stopped = true;
    }

    /// Перезапустить цикл после перемотки или простоя
    pub fn restart(&self) {
        self.spawn_loop();
    }

    /// Вернуть порции с ошибкой модели в очередь на повтор
    pub fn clear_failed_starts(&self) {
        let mut state = self.inner.state.lock();
        let failed = std::mem::take(&mut state.failed_starts);
        for start in &failed {
            state.segmented_starts.remove(start);
        }
        if !failed.is_empty() {
            debug!("Cleared {} failed segmentation starts", failed.len());
        }
    }

    fn spawn_loop(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.running || state.stopped {
                return;
            }
            state.running = true;
        }

        let guard = RunningGuard(self.inner.clone());
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    guard.0.run_loop().await;
                    drop(guard);
                });
            }
            Err(_) => warn!("No runtime for the segmentation loop"),
        }
    }
}

impl PipelineInner {
    async fn run_loop(&self) {
        loop {
            if self.state.lock().stopped {
                debug!("Segmentation loop stopped");
                break;
            }
            let now = seconds_to_ms(self.video.current_time());
            if !self.process_next_chunk(now).await {
                break;
            }
        }
    }

    /// Первая невзятая реплика в окне `[now - tolerance, now + look_ahead - tolerance)`.
    /// Порция от неё заканчивается не дальше `now + look_ahead`
    fn find_first_pending<'a>(&'a self, state: &PipelineState, now: u64) -> Option<&'a SubtitlesFragment> {
        let tolerance = self.settings.segmentation_backward_tolerance_ms;
        let search_start = now.saturating_sub(tolerance);
        let window_end = now + self.settings.process_look_ahead_ms.saturating_sub(tolerance);
        self.raw
            .iter()
            .filter(|f| f.start >= search_start && !state.segmented_starts.contains(&f.start))
            .take_while(|f| f.start < window_end)
            .next()
    }

    fn find_next_chunk(&self, state: &PipelineState, now: u64) -> Vec<SubtitlesFragment> {
        let Some(first) = self.find_first_pending(state, now) else {
            return Vec::new();
        };
        let chunk_end = (first.start + self.settings.process_look_ahead_ms).min(now + self.settings.process_look_ahead_ms);
        self.raw
            .iter()
            .filter(|f| f.start >= first.start && f.start < chunk_end && !state.segmented_starts.contains(&f.start))
            .cloned()
            .collect()
    }

    /// Обработать одну порцию; `false`, если работы в окне нет
    async fn process_next_chunk(&self, now: u64) -> bool {
        let chunk = {
            let mut state = self.state.lock();
            let chunk = self.find_next_chunk(&state, now);
            for fragment in &chunk {
                state.segmented_starts.insert(fragment.start);
            }
            chunk
        };
        let (Some(first), Some(last)) = (chunk.first(), chunk.last()) else {
            return false;
        };
        let span = (first.start, last.end.max(last.start));

        let result = match self.config.get_local_config().await {
            Some(config) => {
                ai_segment_block(&chunk, &config, self.segmenter.as_ref(), self.settings.ai_segmentation_timeout).await
            }
            None => Err(SubtitlesError::Configuration("config is not available".into())),
        };

        let replacement = match result {
            Ok(segmented) => {
                info!(
                    "Segmented {} raw fragments at {}ms into {}",
                    chunk.len(),
                    span.0,
                    segmented.len()
                );
                segmented
            }
            Err(e) => {
                warn!("AI segmentation of chunk at {}ms failed, using optimizer: {}", span.0, e);
                let mut state = self.state.lock();
                for fragment in &chunk {
                    state.failed_starts.insert(fragment.start);
                }
                drop(state);
                optimize_subtitles(&chunk, &self.source_language)
            }
        };

        let mut state = self.state.lock();
        let mut processed = std::mem::take(&mut state.processed);
        processed.retain(|f| f.start < span.0 || f.start > span.1);
        processed.extend(replacement);
        sort_by_start(&mut processed);
        state.processed = merge_same_start(processed, is_cjk_language(&self.source_language));
        true
    }
}

/// Склеить соседние реплики с одинаковым началом (вход отсортирован)
fn merge_same_start(fragments: Vec<SubtitlesFragment>, cjk: bool) -> Vec<SubtitlesFragment> {
    let mut merged: Vec<SubtitlesFragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        match merged.last_mut() {
            Some(last) if last.start == fragment.start => {
                last.text = join_text(&last.text, &fragment.text, cjk);
                last.end = last.end.max(fragment.end);
            }
            _ => merged.push(fragment),
        }
    }
    merged
}
