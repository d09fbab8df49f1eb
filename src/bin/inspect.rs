//! Разбор сохранённого ответа CDN субтитров
//!
//! ```text
//! subtitles-inspect <timedtext.json> [language] [--json]
//! ```
//!
//! Печатает найденный формат и итоговые реплики после фильтра шума,
//! парсера и оптимизатора.

use anyhow::{bail, Context, Result};
use log::info;

use videonova_subtitles::fetchers::youtube::process_events;
use videonova_subtitles::fetchers::youtube::types::YoutubeSubtitlesResponse;
use videonova_subtitles::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let Some(path) = positional.first() else {
        bail!("usage: subtitles-inspect <timedtext.json> [language] [--json]");
    };
    let language = positional.get(1).map(|s| s.as_str()).unwrap_or("en");

    let content = tokio::fs::read_to_string(path.as_str())
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let response: YoutubeSubtitlesResponse =
        serde_json::from_str(&content).with_context(|| format!("{} is not a timed-text json3 payload", path))?;

    let (format, fragments) = process_events(&response.events, language, false);
    info!("{} events -> {} cues ({})", response.events.len(), fragments.len(), format);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&fragments)?);
        return Ok(());
    }

    println!("format: {}", format);
    for fragment in &fragments {
        println!("{:>8} --> {:<8} {}", fragment.start, fragment.end, fragment.text.replace('\n', " "));
    }
    Ok(())
}
