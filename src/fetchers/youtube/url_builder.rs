use url::Url;

use super::pot_token::PotToken;
use super::types::{CaptionTrack, PlayerData};
use crate::error::{Result, SubtitlesError};

const DEVICE_PARAM_KEYS: &[&str] = &["cbrand", "cbr", "cbrver", "cos", "cosver", "cplatform"];

const FIXED_PARAMS: &[(&str, &str)] = &[
    ("fmt", "json3"),
    ("xorb", "2"),
    ("xobt", "3"),
    ("xovt", "3"),
    ("c", "WEB"),
    ("cplayer", "UNIPLAYER"),
];

/// Set a query parameter, replacing any existing values for the key
fn set_param(url: &mut Url, key: &str, value: &str) {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut serializer = url.query_pairs_mut();
    serializer.clear();
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    serializer.append_pair(key, value);
}

/// Build the json3 timed-text URL for a caption track
pub fn build_subtitle_url(track: &CaptionTrack, player_data: &PlayerData, pot: &PotToken) -> Result<String> {
    let mut url = Url::parse(&track.base_url)
        .map_err(|e| SubtitlesError::InvalidResponse(format!("bad caption track url: {}", e)))?;

    for (key, value) in FIXED_PARAMS {
        set_param(&mut url, key, value);
    }

    if let Some(device) = player_data.device.as_deref() {
        let device_params: Vec<(String, String)> = url::form_urlencoded::parse(device.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        for key in DEVICE_PARAM_KEYS {
            if let Some((_, value)) = device_params.iter().find(|(k, v)| k == key && !v.is_empty()) {
                set_param(&mut url, key, value);
            }
        }
    }

    if let Some(cver) = player_data.cver.as_deref().filter(|v| !v.is_empty()) {
        set_param(&mut url, "cver", cver);
    }
    if let Some(value) = pot.pot.as_deref() {
        set_param(&mut url, "pot", value);
    }
    if let Some(value) = pot.potc.as_deref() {
        set_param(&mut url, "potc", value);
    }

    Ok(url.to_string())
}
