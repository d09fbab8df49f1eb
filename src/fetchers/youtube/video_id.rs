use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static EMBED_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/embed/([^/?]+)").unwrap());

/// Video id from a page URL: `?v=`, then `/embed/<id>`, then `youtu.be/<id>`
pub fn get_youtube_video_id(url: &Url) -> Option<String> {
    if let Some((_, v)) = url.query_pairs().find(|(k, v)| k == "v" && !v.is_empty()) {
        return Some(v.into_owned());
    }

    if let Some(id) = EMBED_PATH.captures(url.path()).and_then(|caps| caps.get(1)) {
        return Some(id.as_str().to_string());
    }

    if url.host_str() == Some("youtu.be") {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|s| !s.is_empty())
            .map(String::from);
    }

    None
}
