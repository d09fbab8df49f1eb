//! Выбор дорожки субтитров

use super::types::CaptionTrack;

/// Выбрать лучшую дорожку
///
/// Порядок приоритета:
/// 1. Дорожка, выбранная пользователем в плеере
/// 2. Ручные субтитры без дополнительного имени (язык оригинала)
/// 3. Любые ручные субтитры
/// 4. Автоматические (ASR)
/// 5. Первая доступная
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    selected_language_code: Option<&str>,
) -> Option<&'a CaptionTrack> {
    if let Some(code) = selected_language_code.filter(|c| !c.is_empty()) {
        if let Some(track) = tracks.iter().find(|t| t.language_code == code) {
            return Some(track);
        }
    }

    tracks
        .iter()
        .find(|t| !t.is_asr() && !t.has_name())
        .or_else(|| tracks.iter().find(|t| !t.is_asr()))
        .or_else(|| tracks.iter().find(|t| t.is_asr()))
        .or_else(|| tracks.first())
}

/// Ключ дорожки: md5 от `videoId:languageCode:kind:vssId`
pub fn compute_track_hash(video_id: &str, track: &CaptionTrack) -> String {
    let key = format!(
        "{}:{}:{}:{}",
        video_id,
        track.language_code,
        track.kind.as_deref().unwrap_or(""),
        track.vss_id
    );
    format!("{:x}", md5::compute(key.as_bytes()))
}
