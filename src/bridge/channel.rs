//! Канал window.postMessage между content script и контекстом страницы

use serde_json::Value;
use tokio::sync::broadcast;

/// A message as seen by a `message` event listener
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    /// Origin of the sender
    pub origin: String,
    pub data: Value,
}

/// Both sides of the bridge post to and listen on the same window
pub trait MessageChannel: Send + Sync {
    /// `window.location.origin` of this window
    fn origin(&self) -> String;

    /// Post `data` for listeners whose origin matches `target_origin` (`*` for any)
    fn post_message(&self, data: Value, target_origin: &str);

    fn subscribe(&self) -> broadcast::Receiver<WindowMessage>;
}

/// Broadcast-backed window shared by everything in one process
pub struct InProcessWindow {
    origin: String,
    sender: broadcast::Sender<WindowMessage>,
}

impl InProcessWindow {
    pub fn new(origin: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            origin: origin.into(),
            sender,
        }
    }

    /// Deliver a message from an arbitrary origin (another frame, an extension)
    pub fn dispatch(&self, message: WindowMessage) {
        let _ = self.sender.send(message);
    }
}

impl MessageChannel for InProcessWindow {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn post_message(&self, data: Value, target_origin: &str) {
        if target_origin != "*" && target_origin != self.origin {
            log::debug!("Dropping message for foreign origin {}", target_origin);
            return;
        }
        self.dispatch(WindowMessage {
            origin: self.origin.clone(),
            data,
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
        self.sender.subscribe()
    }
}
