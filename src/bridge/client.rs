//! Клиент протокола на стороне контент-скрипта
//!
//! Запрос отправляется через `postMessage`, ответ ищется среди сообщений
//! окна по происхождению, типу и `requestId`. Если ответ не пришёл за
//! отведённое время, запрос завершается пустым результатом.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::channel::MessageChannel;
use super::messages::{BridgeRequest, BridgeResponse, PlayerDataReply};

#[derive(Clone)]
pub struct PageBridgeClient {
    channel: Arc<dyn MessageChannel>,
    timeout: Duration,
}

impl PageBridgeClient {
    pub fn new(channel: Arc<dyn MessageChannel>, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    fn new_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Отправить запрос и дождаться ответа с тем же `requestId`
    pub async fn request(&self, request: BridgeRequest) -> Option<BridgeResponse> {
        let origin = self.channel.origin();
        let request_id = request.request_id().to_string();
        let response_type = request.response_type();

        let data = match serde_json::to_value(&request) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize {} request: {}", request.message_type(), e);
                return None;
            }
        };

        // Подписка до отправки, чтобы не пропустить быстрый ответ
        let mut rx = self.channel.subscribe();
        self.channel.post_message(data, &origin);

        let wait = async {
            loop {
                let message = match rx.recv().await {
                    Ok(message) => message,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Bridge client lagged by {} messages", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                };

                if message.origin != origin
                    || message.data.get("type").and_then(|t| t.as_str()) != Some(response_type)
                    || message.data.get("requestId").and_then(|t| t.as_str()) != Some(request_id.as_str())
                {
                    continue;
                }

                match serde_json::from_value::<BridgeResponse>(message.data) {
                    Ok(response) => return Some(response),
                    Err(e) => {
                        warn!("Malformed {} message: {}", response_type, e);
                        continue;
                    }
                }
            }
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(response) => response,
            Err(_) => {
                debug!("No {} within {:?}", response_type, self.timeout);
                None
            }
        }
    }

    pub async fn request_player_data(&self, expected_video_id: &str) -> PlayerDataReply {
        let request = BridgeRequest::PlayerData {
            request_id: Self::new_request_id(),
            expected_video_id: expected_video_id.to_string(),
        };

        match self.request(request).await {
            Some(BridgeResponse::PlayerData {
                success, error, data, ..
            }) => PlayerDataReply { success, error, data },
            _ => PlayerDataReply::timeout(),
        }
    }

    /// URL запроса плеера к timed-text API, если страница его увидела
    pub async fn wait_for_timedtext(&self, video_id: &str) -> Option<String> {
        let request = BridgeRequest::WaitTimedtext {
            request_id: Self::new_request_id(),
            video_id: video_id.to_string(),
        };

        match self.request(request).await {
            Some(BridgeResponse::WaitTimedtext { url, .. }) => url,
            _ => None,
        }
    }

    /// Включить родные субтитры плеера; `false`, если страница не ответила
    pub async fn ensure_subtitles(&self) -> bool {
        let request = BridgeRequest::EnsureSubtitles {
            request_id: Self::new_request_id(),
        };
        matches!(self.request(request).await, Some(BridgeResponse::EnsureSubtitles { .. }))
    }
}
