//! Сообщения протокола между контент-скриптом и страницей
//!
//! Каждый запрос несёт `requestId`, ответ возвращает его же, по нему
//! ответ сопоставляется с ожидающим запросом.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::fetchers::youtube::types::PlayerData;

/// Запросы контент-скрипта к странице
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeRequest {
    #[serde(rename = "PLAYER_DATA_REQUEST", rename_all = "camelCase")]
    PlayerData {
        request_id: String,
        expected_video_id: String,
    },
    #[serde(rename = "WAIT_TIMEDTEXT_REQUEST", rename_all = "camelCase")]
    WaitTimedtext { request_id: String, video_id: String },
    #[serde(rename = "ENSURE_SUBTITLES_REQUEST", rename_all = "camelCase")]
    EnsureSubtitles { request_id: String },
}

impl BridgeRequest {
    pub fn request_id(&self) -> &str {
        match self {
            Self::PlayerData { request_id, .. }
            | Self::WaitTimedtext { request_id, .. }
            | Self::EnsureSubtitles { request_id } => request_id,
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::PlayerData { .. } => PLAYER_DATA_REQUEST_TYPE,
            Self::WaitTimedtext { .. } => WAIT_TIMEDTEXT_REQUEST_TYPE,
            Self::EnsureSubtitles { .. } => ENSURE_SUBTITLES_REQUEST_TYPE,
        }
    }

    /// Тип ответа, который ожидается на этот запрос
    pub fn response_type(&self) -> &'static str {
        match self {
            Self::PlayerData { .. } => PLAYER_DATA_RESPONSE_TYPE,
            Self::WaitTimedtext { .. } => WAIT_TIMEDTEXT_RESPONSE_TYPE,
            Self::EnsureSubtitles { .. } => ENSURE_SUBTITLES_RESPONSE_TYPE,
        }
    }
}

/// Ответы страницы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeResponse {
    #[serde(rename = "PLAYER_DATA_RESPONSE", rename_all = "camelCase")]
    PlayerData {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<PlayerData>,
    },
    #[serde(rename = "WAIT_TIMEDTEXT_RESPONSE", rename_all = "camelCase")]
    WaitTimedtext {
        request_id: String,
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename = "ENSURE_SUBTITLES_RESPONSE", rename_all = "camelCase")]
    EnsureSubtitles { request_id: String },
}

impl BridgeResponse {
    pub fn request_id(&self) -> &str {
        match self {
            Self::PlayerData { request_id, .. }
            | Self::WaitTimedtext { request_id, .. }
            | Self::EnsureSubtitles { request_id } => request_id,
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::PlayerData { .. } => PLAYER_DATA_RESPONSE_TYPE,
            Self::WaitTimedtext { .. } => WAIT_TIMEDTEXT_RESPONSE_TYPE,
            Self::EnsureSubtitles { .. } => ENSURE_SUBTITLES_RESPONSE_TYPE,
        }
    }

    pub(crate) fn player_data_error(request_id: &str, error: impl Into<String>) -> Self {
        Self::PlayerData {
            request_id: request_id.to_string(),
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }
}

/// Ответ на запрос данных плеера в удобном для загрузчика виде
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDataReply {
    pub success: bool,
    pub error: Option<String>,
    pub data: Option<PlayerData>,
}

impl PlayerDataReply {
    pub fn timeout() -> Self {
        Self {
            success: false,
            error: Some("TIMEOUT".to_string()),
            data: None,
        }
    }

    /// Данные плеера, если ответ успешный
    pub fn into_data(self) -> Option<PlayerData> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}
