// POT token lookup
// The caption CDN refuses json3 requests without the anti-abuse token the
// player attaches to its own timed-text requests.

use log::debug;
use url::Url;

use super::types::{AudioCaptionTrack, CaptionTrack, PlayerData};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PotToken {
    pub pot: Option<String>,
    pub potc: Option<String>,
}

impl PotToken {
    pub fn is_present(&self) -> bool {
        self.pot.is_some()
    }
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn token_from_url(raw: &str) -> Option<PotToken> {
    let url = Url::parse(raw).ok()?;
    let pot = query_param(&url, "pot")?;
    Some(PotToken {
        pot: Some(pot),
        potc: query_param(&url, "potc"),
    })
}

/// Whether the URL carries a `pot` query parameter
pub fn url_has_pot(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| url.query_pairs().any(|(k, _)| k == "pot"))
        .unwrap_or(false)
}

fn match_audio_track<'a>(
    selected: &CaptionTrack,
    tracks: &'a [AudioCaptionTrack],
) -> Option<&'a AudioCaptionTrack> {
    let language = Some(selected.language_code.as_str());

    tracks
        .iter()
        .find(|t| t.vss_id == selected.vss_id)
        .or_else(|| {
            tracks
                .iter()
                .find(|t| t.language_code.as_deref() == language && t.kind == selected.kind)
        })
        .or_else(|| tracks.iter().find(|t| t.language_code.as_deref() == language))
        .or_else(|| tracks.first())
}

/// Find the token for the selected track: the matching audio caption track
/// first, then the cached timed-text URL
pub fn extract_pot_token(selected: &CaptionTrack, player_data: &PlayerData) -> PotToken {
    if let Some(token) = match_audio_track(selected, &player_data.audio_caption_tracks)
        .and_then(|track| token_from_url(&track.url))
    {
        debug!("POT token taken from audio caption track");
        return token;
    }

    if let Some(token) = player_data
        .cached_timedtext_url
        .as_deref()
        .and_then(token_from_url)
    {
        debug!("POT token taken from cached timedtext url");
        return token;
    }

    PotToken::default()
}
