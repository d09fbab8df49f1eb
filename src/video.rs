//! Модуль видео-элемента
//!
//! Планировщик и координатор перевода живут по часам самого медиа-элемента:
//! `currentTime` и события `timeupdate`, `seeking`, `seeked`.

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Media events the pipeline listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    TimeUpdate,
    Seeking,
    Seeked,
}

/// Minimal view of an `HTMLVideoElement`
pub trait VideoElement: Send + Sync {
    /// Playback position in seconds
    fn current_time(&self) -> f64;

    /// Subscribe to media events
    fn subscribe(&self) -> broadcast::Receiver<VideoEvent>;
}

/// Video element driven programmatically
pub struct SimulatedVideo {
    current_time: Mutex<f64>,
    events: broadcast::Sender<VideoEvent>,
}

impl Default for SimulatedVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedVideo {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            current_time: Mutex::new(0.0),
            events,
        }
    }

    /// Move the playhead without emitting anything
    pub fn set_time_silently(&self, seconds: f64) {
        *self.current_time.lock() = seconds;
    }

    /// Advance playback and fire `timeupdate`
    pub fn set_current_time(&self, seconds: f64) {
        self.set_time_silently(seconds);
        self.emit(VideoEvent::TimeUpdate);
    }

    /// Jump to a new position, firing `seeking` then `seeked`
    pub fn seek(&self, seconds: f64) {
        self.set_time_silently(seconds);
        self.emit(VideoEvent::Seeking);
        self.emit(VideoEvent::Seeked);
    }

    pub fn emit(&self, event: VideoEvent) {
        // No listeners is fine: nothing is attached yet
        let _ = self.events.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl VideoElement for SimulatedVideo {
    fn current_time(&self) -> f64 {
        *self.current_time.lock()
    }

    fn subscribe(&self) -> broadcast::Receiver<VideoEvent> {
        self.events.subscribe()
    }
}
