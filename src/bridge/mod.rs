//! Мост между контент-скриптом и страницей поверх `postMessage`
//!
//! Контексты не делят память: запросы и ответы ходят сообщениями окна,
//! сопоставляются по `requestId` и ограничены по времени.

pub mod channel;
pub mod client;
pub mod messages;
pub mod page;
pub mod timedtext_observer;

pub use channel::{InProcessWindow, MessageChannel, WindowMessage};
pub use client::PageBridgeClient;
pub use messages::{BridgeRequest, BridgeResponse, PlayerDataReply};
pub use page::{PageBridgeServer, PlayerApi, PlayerLocator};
pub use timedtext_observer::TimedtextObserver;
