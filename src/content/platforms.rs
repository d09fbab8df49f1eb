// Platform registry
// Per-site selectors and hooks the adapter needs; only YouTube for now.

use url::Url;

use crate::constants::{YOUTUBE_NATIVE_SUBTITLES_SELECTOR, YOUTUBE_NAVIGATE_EVENT};
use crate::fetchers::youtube::video_id::get_youtube_video_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSelectors {
    pub video: &'static str,
    pub player_container: &'static str,
    pub controls_bar: &'static str,
    pub native_subtitles: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformEvents {
    /// SPA navigation event, if the site has one
    pub navigate: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub name: &'static str,
    pub selectors: PlatformSelectors,
    pub events: PlatformEvents,
    pub get_video_id: Option<fn(&Url) -> Option<String>>,
}

impl PlatformConfig {
    pub fn video_id(&self, url: &Url) -> Option<String> {
        self.get_video_id.and_then(|get| get(url))
    }
}

pub fn youtube_config() -> PlatformConfig {
    PlatformConfig {
        name: "youtube",
        selectors: PlatformSelectors {
            video: "video.html5-main-video",
            player_container: ".html5-video-player",
            controls_bar: ".ytp-right-controls",
            native_subtitles: YOUTUBE_NATIVE_SUBTITLES_SELECTOR,
        },
        events: PlatformEvents {
            navigate: Some(YOUTUBE_NAVIGATE_EVENT),
        },
        get_video_id: Some(get_youtube_video_id),
    }
}
