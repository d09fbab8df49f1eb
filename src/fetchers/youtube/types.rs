use serde::{Deserialize, Serialize};

/// Caption track name as exposed by the player response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackName {
    Simple {
        #[serde(rename = "simpleText")]
        simple_text: String,
    },
    Runs {
        runs: Vec<TextRun>,
    },
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
}

impl TrackName {
    pub fn text(&self) -> String {
        match self {
            Self::Simple { simple_text } => simple_text.clone(),
            Self::Runs { runs } => runs.iter().map(|r| r.text.as_str()).collect(),
            Self::Plain(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub language_code: String,
    /// `asr` for auto-generated tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub vss_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<TrackName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
}

impl CaptionTrack {
    pub fn is_asr(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    /// Track carries an extra display name (translated or annotated variant)
    pub fn has_name(&self) -> bool {
        self.name.as_ref().is_some_and(|n| !n.text().is_empty())
    }
}

/// Caption track reported by the player's audio track; its URL carries pot/potc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCaptionTrack {
    pub url: String,
    #[serde(default)]
    pub vss_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub video_id: String,
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
    #[serde(default)]
    pub audio_caption_tracks: Vec<AudioCaptionTrack>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub cver: Option<String>,
    /// -1 unstarted, 0 ended, 1 playing, 2 paused, 3 buffering, 5 cued
    #[serde(default = "unknown_player_state")]
    pub player_state: i32,
    #[serde(default)]
    pub selected_track_language_code: Option<String>,
    #[serde(default)]
    pub cached_timedtext_url: Option<String>,
}

fn unknown_player_state() -> i32 {
    -1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeTimedTextSeg {
    pub utf8: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_offset_ms: Option<u64>,
}

impl YoutubeTimedTextSeg {
    pub fn new(utf8: impl Into<String>) -> Self {
        Self {
            utf8: utf8.into(),
            t_offset_ms: None,
        }
    }

    pub fn with_offset(utf8: impl Into<String>, t_offset_ms: u64) -> Self {
        Self {
            utf8: utf8.into(),
            t_offset_ms: Some(t_offset_ms),
        }
    }
}

/// One event of the json3 timed-text payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeTimedText {
    pub t_start_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a_append: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segs: Option<Vec<YoutubeTimedTextSeg>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_win_pos_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w_win_id: Option<u32>,
}

impl YoutubeTimedText {
    pub fn new(t_start_ms: u64, d_duration_ms: u64, segs: Vec<YoutubeTimedTextSeg>) -> Self {
        Self {
            t_start_ms,
            d_duration_ms: Some(d_duration_ms),
            segs: Some(segs),
            ..Default::default()
        }
    }

    pub fn end_ms(&self) -> u64 {
        self.t_start_ms + self.d_duration_ms.unwrap_or(0)
    }

    /// Concatenated seg text, untrimmed
    pub fn text(&self) -> String {
        self.segs
            .as_ref()
            .map(|segs| segs.iter().map(|s| s.utf8.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn has_text(&self) -> bool {
        self.segs
            .as_ref()
            .is_some_and(|segs| segs.iter().any(|s| !s.utf8.trim().is_empty()))
    }

    pub fn is_append(&self) -> bool {
        self.a_append == Some(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeSubtitlesResponse {
    pub events: Vec<YoutubeTimedText>,
}
