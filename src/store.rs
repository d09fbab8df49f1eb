//! Реактивное хранилище, которое читает слой UI
//!
//! Каждое значение публикуется через `tokio::sync::watch`: подписчик
//! получает уведомление об изменении и может синхронно прочитать
//! последнее значение.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::types::{StateData, SubtitlePosition, SubtitlesFragment};

/// Снимок всего, что нужно для отрисовки
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitlesDisplay {
    pub subtitle: Option<SubtitlesFragment>,
    pub state_data: Option<StateData>,
    pub is_visible: bool,
}

struct StoreChannels {
    current_time_ms: watch::Sender<u64>,
    current_subtitle: watch::Sender<Option<SubtitlesFragment>>,
    state: watch::Sender<Option<StateData>>,
    visible: watch::Sender<bool>,
    position: watch::Sender<SubtitlePosition>,
}

/// Хранилище субтитров для одной вкладки
#[derive(Clone)]
pub struct SubtitlesStore {
    channels: Arc<StoreChannels>,
}

impl Default for SubtitlesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubtitlesStore {
    pub fn new() -> Self {
        let (current_time_ms, _) = watch::channel(0);
        let (current_subtitle, _) = watch::channel(None);
        let (state, _) = watch::channel(None);
        let (visible, _) = watch::channel(false);
        let (position, _) = watch::channel(SubtitlePosition::default());

        Self {
            channels: Arc::new(StoreChannels {
                current_time_ms,
                current_subtitle,
                state,
                visible,
                position,
            }),
        }
    }

    pub(crate) fn set_current_time_ms(&self, time_ms: u64) {
        self.channels.current_time_ms.send_replace(time_ms);
    }

    pub(crate) fn set_current_subtitle(&self, subtitle: Option<SubtitlesFragment>) {
        self.channels.current_subtitle.send_replace(subtitle);
    }

    pub(crate) fn set_state(&self, state: Option<StateData>) {
        self.channels.state.send_replace(state);
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.channels.visible.send_replace(visible);
    }

    /// Позицию меняет UI при перетаскивании и адаптер при навигации
    pub fn set_position(&self, position: SubtitlePosition) {
        self.channels.position.send_replace(position);
    }

    pub fn current_time_ms(&self) -> u64 {
        *self.channels.current_time_ms.borrow()
    }

    pub fn current_subtitle(&self) -> Option<SubtitlesFragment> {
        self.channels.current_subtitle.borrow().clone()
    }

    /// `None` означает состояние `idle`
    pub fn state(&self) -> Option<StateData> {
        self.channels.state.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        *self.channels.visible.borrow()
    }

    pub fn position(&self) -> SubtitlePosition {
        *self.channels.position.borrow()
    }

    pub fn display(&self) -> SubtitlesDisplay {
        SubtitlesDisplay {
            subtitle: self.current_subtitle(),
            state_data: self.state(),
            is_visible: self.is_visible(),
        }
    }

    pub fn subscribe_current_subtitle(&self) -> watch::Receiver<Option<SubtitlesFragment>> {
        self.channels.current_subtitle.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<Option<StateData>> {
        self.channels.state.subscribe()
    }

    pub fn subscribe_visible(&self) -> watch::Receiver<bool> {
        self.channels.visible.subscribe()
    }

    pub fn subscribe_position(&self) -> watch::Receiver<SubtitlePosition> {
        self.channels.position.subscribe()
    }

    pub fn subscribe_current_time(&self) -> watch::Receiver<u64> {
        self.channels.current_time_ms.subscribe()
    }
}
