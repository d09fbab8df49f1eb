use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::bridge::channel::InProcessWindow;
use crate::bridge::client::PageBridgeClient;
use crate::bridge::page::PageBridgeServer;
use crate::bridge::timedtext_observer::TimedtextObserver;
use crate::config::{Config, ConfigSource, FetcherSettings, PipelineSettings, ProviderConfig, StaticConfigSource, TranslateConfig};
use crate::constants::{HIDE_NATIVE_CAPTIONS_STYLE_ID, TRANSLATE_BUTTON_CONTAINER_ID};
use crate::error::SubtitlesError;
use crate::fetchers::youtube::http::TimedTextResponse;
use crate::fetchers::youtube::YoutubeSubtitlesFetcher;
use crate::fetchers::SubtitlesFetcher;
use crate::location::SharedLocation;
use crate::store::SubtitlesStore;
use crate::test_support::{
    EchoSegmenter, FakePageHost, FakePlayer, FakePlayerLocator, ScriptedFetcher, ScriptedTimedTextClient,
    ScriptedTranslator, ORIGIN,
};
use crate::types::{SubtitlePosition, SubtitlesFragment, SubtitlesState};
use crate::video::SimulatedVideo;

const BODY: &str = r#"{"events":[
    {"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"Hello there."}]},
    {"tStartMs":1000,"dDurationMs":1000,"segs":[{"utf8":"[Music]"}]},
    {"tStartMs":2000,"dDurationMs":1500,"segs":[{"utf8":"General Kenobi."}]}
]}"#;

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

fn config(ai_segmentation: bool) -> Config {
    let mut config = Config {
        translate: TranslateConfig {
            provider_id: "p1".into(),
            enable_ai_content_aware: true,
        },
        providers_config: vec![ProviderConfig {
            id: "p1".into(),
            name: "Test".into(),
            provider: "openai".into(),
            model: Some("gpt-4o-mini".into()),
            api_key: None,
            base_url: None,
        }],
        ..Default::default()
    };
    config.video_subtitles.ai_segmentation = ai_segmentation;
    config
}

struct Page {
    adapter: UniversalVideoAdapter,
    host: Arc<FakePageHost>,
    video: Arc<SimulatedVideo>,
    translator: Arc<ScriptedTranslator>,
    store: SubtitlesStore,
}

fn page_with(fetcher: Arc<dyn SubtitlesFetcher>, location: Arc<SharedLocation>, config: Config) -> Page {
    let video = Arc::new(SimulatedVideo::new());
    let host = Arc::new(FakePageHost::new(location, Some(video.clone())));
    let translator = Arc::new(ScriptedTranslator::upper());
    let store = SubtitlesStore::new();
    let adapter = UniversalVideoAdapter::new(
        youtube_config(),
        host.clone(),
        AdapterServices {
            fetcher,
            config: Arc::new(StaticConfigSource::new(Some(config))),
            translator: translator.clone(),
            segmenter: Arc::new(EchoSegmenter::default()),
        },
        store.clone(),
    );

    Page {
        adapter,
        host,
        video,
        translator,
        store,
    }
}

fn scripted_page(fetcher: Arc<ScriptedFetcher>) -> Page {
    let location = Arc::new(SharedLocation::new(format!("{}/watch?v=abc", ORIGIN)));
    page_with(fetcher, location, config(false))
}

fn lines() -> Vec<SubtitlesFragment> {
    vec![
        SubtitlesFragment::new(0, 1000, "first line"),
        SubtitlesFragment::new(1000, 2000, "second line"),
    ]
}

#[tokio::test]
async fn test_youtube_page_end_to_end() {
    // Страница: плеер, мост postMessage и CDN субтитров
    let window = Arc::new(InProcessWindow::new(ORIGIN));
    let player = FakePlayer::new("abc")
        .with_caption_track("/api/timedtext?v=abc&lang=en", "en", None, ".en")
        .with_audio_track("https://www.youtube.com/api/timedtext?v=abc&lang=en&pot=TOKEN", ".en");
    player.set_state(1);
    let server = PageBridgeServer::new(
        window.clone(),
        Arc::new(FakePlayerLocator::new(Some(Arc::new(player)))),
        TimedtextObserver::new(),
    );
    server.start();

    let location = Arc::new(SharedLocation::new(format!("{}/watch?v=abc", ORIGIN)));
    let http = Arc::new(ScriptedTimedTextClient::new(vec![TimedTextResponse::ok(BODY)]));
    let config_source: Arc<dyn ConfigSource> = Arc::new(StaticConfigSource::new(Some(config(false))));
    let settings = FetcherSettings::default();
    let fetcher = Arc::new(YoutubeSubtitlesFetcher::new(
        PageBridgeClient::new(window, settings.post_message_timeout),
        http.clone(),
        config_source,
        location.clone(),
        settings,
    ));

    let page = page_with(fetcher, location, config(false));
    page.adapter.initialize().await;
    assert_eq!(page.host.mounted_buttons(), vec![TRANSLATE_BUTTON_CONTAINER_ID.to_string()]);
    assert!(!page.store.is_visible());

    page.adapter.toggle_subtitles(true).await;
    settle().await;

    assert_eq!(http.request_count(), 1);
    assert!(http.requested_urls()[0].contains("pot=TOKEN"));
    assert!(page.store.is_visible());
    assert!(page.host.style(HIDE_NATIVE_CAPTIONS_STYLE_ID).is_some());
    assert_eq!(
        page.adapter.processed_fragments().iter().map(|f| f.text.as_str()).collect::<Vec<_>>(),
        vec!["Hello there.", "General Kenobi."]
    );

    page.video.set_current_time(0.5);
    settle().await;
    let current = page.store.current_subtitle().unwrap();
    assert_eq!(current.text, "Hello there.");
    assert_eq!(current.translation.as_deref(), Some("HELLO THERE."));
    assert_eq!(page.store.state(), None);

    // Контекст видео уходит переводчику
    let request = &page.translator.requests()[0];
    assert_eq!(request.video_title, "Test video - YouTube");
    assert_eq!(request.subtitles_context, "Hello there.General Kenobi.");

    page.video.set_current_time(2.5);
    settle().await;
    assert_eq!(
        page.store.current_subtitle().and_then(|s| s.translation),
        Some("GENERAL KENOBI.".to_string())
    );

    page.adapter.shutdown();
    server.stop();
}

#[tokio::test]
async fn test_toggle_off_and_resume_on_same_track() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines())]));
    let page = scripted_page(fetcher.clone());
    page.adapter.initialize().await;

    page.adapter.toggle_subtitles(true).await;
    settle().await;
    assert_eq!(fetcher.fetch_count(), 1);
    assert!(page.adapter.native_subtitles_hidden());

    page.adapter.toggle_subtitles(false).await;
    settle().await;
    assert!(!page.store.is_visible());
    assert!(page.host.style(HIDE_NATIVE_CAPTIONS_STYLE_ID).is_none());
    // Слушают только планировщик, координатор отписан
    assert_eq!(page.video.listener_count(), 1);

    page.adapter.toggle_subtitles(true).await;
    settle().await;
    assert_eq!(fetcher.fetch_count(), 1);
    assert!(page.store.is_visible());
    assert_eq!(page.host.style_injections(), 2);
    assert_eq!(page.video.listener_count(), 2);
}

#[tokio::test]
async fn test_repeated_enable_injects_style_once() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines())]));
    let page = scripted_page(fetcher);
    page.adapter.initialize().await;

    page.adapter.toggle_subtitles(true).await;
    page.adapter.toggle_subtitles(true).await;
    settle().await;
    assert_eq!(page.host.style_injections(), 1);
    let css = page.host.style(HIDE_NATIVE_CAPTIONS_STYLE_ID).unwrap();
    assert!(css.contains(".ytp-caption-window-container"));
    assert!(css.contains("display: none !important"));
}

#[tokio::test]
async fn test_toggle_from_page_button() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines())]));
    let page = scripted_page(fetcher.clone());
    page.adapter.initialize().await;

    page.host.click_toggle(true);
    settle().await;
    assert_eq!(fetcher.fetch_count(), 1);
    assert!(page.store.is_visible());
    assert!(page.adapter.coordinator().is_some());
}

#[tokio::test]
async fn test_fetch_errors_become_overlay_state() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(SubtitlesError::Forbidden), Ok(Vec::new())]));
    let page = scripted_page(fetcher);
    page.adapter.initialize().await;

    page.adapter.toggle_subtitles(true).await;
    let state = page.store.state().unwrap();
    assert_eq!(state.state, SubtitlesState::Error);
    assert_eq!(state.message, Some(SubtitlesError::Forbidden.to_string()));
    assert!(page.host.toasts().is_empty());

    page.adapter.toggle_subtitles(true).await;
    let state = page.store.state().unwrap();
    assert_eq!(state.message, Some(SubtitlesError::NoSubtitlesFound.to_string()));
    assert!(page.adapter.coordinator().is_none());
}

#[tokio::test]
async fn test_environment_errors_become_toasts() {
    let location = Arc::new(SharedLocation::new(format!("{}/watch?v=abc", ORIGIN)));
    let host = Arc::new(FakePageHost::new(location, None).without_controls_bar());
    let adapter = UniversalVideoAdapter::new(
        youtube_config(),
        host.clone(),
        AdapterServices {
            fetcher: Arc::new(ScriptedFetcher::new(vec![Err(SubtitlesError::VideoIdNotFound)])),
            config: Arc::new(StaticConfigSource::new(Some(config(false)))),
            translator: Arc::new(ScriptedTranslator::upper()),
            segmenter: Arc::new(EchoSegmenter::default()),
        },
        SubtitlesStore::new(),
    );

    adapter.initialize().await;
    assert!(adapter.scheduler().is_none());
    assert!(host.mounted_buttons().is_empty());
    assert_eq!(
        host.toasts(),
        vec![
            SubtitlesError::VideoNotFound.to_string(),
            SubtitlesError::ControlsBarNotFound.to_string()
        ]
    );

    // Ошибка получения субтитров не добавляет уведомлений
    adapter.toggle_subtitles(true).await;
    assert_eq!(host.toasts().len(), 2);
}

#[tokio::test]
async fn test_missing_video_id_is_overlay_state() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(SubtitlesError::VideoIdNotFound)]));
    let page = scripted_page(fetcher);
    page.adapter.initialize().await;

    page.adapter.toggle_subtitles(true).await;
    let state = page.store.state().unwrap();
    assert_eq!(state.state, SubtitlesState::Error);
    assert_eq!(state.message, Some(SubtitlesError::VideoIdNotFound.to_string()));
    assert!(page.host.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_rebuilds_session() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines()), Ok(lines())]));
    let page = scripted_page(fetcher.clone());
    page.adapter.initialize().await;
    page.adapter.toggle_subtitles(true).await;
    settle().await;

    let first_scheduler = page.adapter.scheduler().unwrap();
    assert!(!first_scheduler.subtitles().is_empty());
    page.store.set_position(SubtitlePosition {
        percent: 42.0,
        ..Default::default()
    });

    page.host.navigate(&format!("{}/watch?v=def", ORIGIN), "yt-navigate-finish");
    settle().await;
    // Сразу: старые реплики убраны, перестройка ждёт задержку навигации
    assert!(first_scheduler.subtitles().is_empty());
    assert_eq!(fetcher.cleanup_count(), 0);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    settle().await;

    assert_eq!(fetcher.cleanup_count(), 1);
    assert!(page.adapter.coordinator().is_none());
    assert!(page.adapter.original_subtitles().is_empty());
    assert!(page.host.style(HIDE_NATIVE_CAPTIONS_STYLE_ID).is_none());
    assert_eq!(page.store.position(), SubtitlePosition::default());
    assert!(!page.store.is_visible());
    assert_eq!(page.host.mounted_buttons().len(), 1);
    let second_scheduler = page.adapter.scheduler().unwrap();
    assert!(second_scheduler.subtitles().is_empty());

    page.adapter.toggle_subtitles(true).await;
    settle().await;
    assert_eq!(fetcher.fetch_count(), 2);
    assert!(!second_scheduler.subtitles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_to_same_video_keeps_session() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines())]));
    let page = scripted_page(fetcher.clone());
    page.adapter.initialize().await;
    page.adapter.toggle_subtitles(true).await;
    settle().await;

    page.host.navigate(&format!("{}/watch?v=abc&t=30", ORIGIN), "yt-navigate-finish");
    page.host.navigate(&format!("{}/watch?v=def", ORIGIN), "some-other-event");
    tokio::time::advance(Duration::from_millis(2_000)).await;
    settle().await;

    assert_eq!(fetcher.cleanup_count(), 0);
    assert!(page.adapter.coordinator().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_toggles_keep_one_coordinator() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines()), Ok(lines())]).with_delay(Duration::from_secs(5)));
    let page = scripted_page(fetcher.clone());
    page.adapter.initialize().await;

    page.host.click_toggle(true);
    settle().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    page.host.click_toggle(false);
    page.host.click_toggle(true);
    settle().await;
    assert_eq!(fetcher.fetch_count(), 2);

    // Первый запрос завершился и успел перевести текущую реплику
    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;
    let first = page.adapter.coordinator().unwrap();
    assert_eq!(first.status(0), Some(TranslationStatus::Done));

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    let second = page.adapter.coordinator().unwrap();
    assert_eq!(second.status(0), Some(TranslationStatus::Done));
    assert_eq!(first.status(0), None);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_for_previous_video_is_dropped() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(lines())]).with_delay(Duration::from_secs(5)));
    let page = scripted_page(fetcher.clone());
    page.adapter.initialize().await;

    page.host.click_toggle(true);
    settle().await;
    assert_eq!(fetcher.fetch_count(), 1);
    assert_eq!(page.store.state().map(|s| s.state), Some(SubtitlesState::Fetching));

    page.host.navigate(&format!("{}/watch?v=def", ORIGIN), "yt-navigate-finish");
    settle().await;
    tokio::time::advance(Duration::from_millis(1_000)).await;
    settle().await;
    assert_eq!(fetcher.cleanup_count(), 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(page.adapter.original_subtitles().is_empty());
    assert!(page.adapter.coordinator().is_none());
    assert!(page.adapter.scheduler().unwrap().subtitles().is_empty());
}

#[tokio::test]
async fn test_ai_segmentation_path() {
    let words: Vec<SubtitlesFragment> = ["so", "today", "we", "talk."]
        .iter()
        .enumerate()
        .map(|(i, w)| SubtitlesFragment::new(i as u64 * 400, i as u64 * 400 + 400, *w))
        .collect();
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(words)]));
    let location = Arc::new(SharedLocation::new(format!("{}/watch?v=abc", ORIGIN)));
    let page = page_with(fetcher, location, config(true));
    page.adapter.initialize().await;

    page.adapter.toggle_subtitles(true).await;
    settle().await;

    let pipeline = page.adapter.segmentation_pipeline().unwrap();
    assert!(page.adapter.processed_fragments().is_empty());
    assert_eq!(pipeline.processed_fragments().len(), 4);
    assert!(!pipeline.has_unprocessed_chunks());

    page.video.set_current_time(0.1);
    settle().await;
    let current = page.store.current_subtitle().unwrap();
    assert_eq!(current.translation.as_deref(), Some("SO"));
}

#[tokio::test]
async fn test_stalled_segmentation_shows_segmenting() {
    let raw: Vec<SubtitlesFragment> = (0..100)
        .map(|i| SubtitlesFragment::new(i * 1000, i * 1000 + 1000, format!("w{}", i)))
        .collect();
    let video = Arc::new(SimulatedVideo::new());
    let config_source: Arc<dyn ConfigSource> = Arc::new(StaticConfigSource::new(Some(config(true))));
    let segmenter = Arc::new(EchoSegmenter::default());
    let pipeline = SegmentationPipeline::new(
        raw,
        video.clone(),
        config_source.clone(),
        segmenter.clone(),
        "en",
        PipelineSettings::default(),
    );

    let states: Arc<Mutex<Vec<SubtitlesState>>> = Arc::default();
    let sink = states.clone();
    let coordinator = TranslationCoordinator::new(TranslationCoordinatorOptions {
        fragments: Vec::new(),
        segmentation_pipeline: Some(pipeline.clone()),
        video: video.clone(),
        translator: Arc::new(ScriptedTranslator::upper()),
        config: config_source,
        settings: PipelineSettings::default(),
        on_translated: Arc::new(|_: Vec<SubtitlesFragment>| {}),
        on_state_change: Arc::new(move |state: SubtitlesState, _: Option<String>| sink.lock().push(state)),
    });

    coordinator.start(None);
    settle().await;
    assert_eq!(segmenter.call_count(), 1);
    assert!(!states.lock().contains(&SubtitlesState::Segmenting));

    // Курсор дошёл до необработанной части: тик перезапускает цикл
    video.set_current_time(70.0);
    settle().await;
    assert!(states.lock().contains(&SubtitlesState::Segmenting));
    assert_eq!(segmenter.call_count(), 2);
    assert!(pipeline.processed_fragments().iter().any(|f| f.start == 70_000));
}
