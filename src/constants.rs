// Timing, protocol and selector constants shared by the subtitle pipeline

// Timing constants
pub const NAVIGATION_HANDLER_DELAY_MS: u64 = 1_000;
pub const MAX_GAP_MS: u64 = 2_000;
pub const ERROR_STATE_AUTO_HIDE_MS: u64 = 5_000;

// Segmentation constants
pub const MAX_WORDS: usize = 15;
pub const MAX_WORDS_EXTENDED: usize = 25;
pub const MAX_CHARS_CJK: usize = 30;
pub const SENTENCE_TERMINATORS: &[char] = &[
    ',', '.', '。', '?', '？', '！', '!', '；', ';', '…', '؟', '۔', '\n',
];

// Look-ahead windows
pub const PROCESS_LOOK_AHEAD_MS: u64 = 60_000;
pub const SEGMENTATION_BACKWARD_TOLERANCE_MS: u64 = 10_000;
pub const TRANSLATE_LOOK_AHEAD_MS: u64 = 30_000;
pub const TRANSLATE_LOOK_BEHIND_MS: u64 = 5_000;
pub const TRANSLATION_BATCH_SIZE: usize = 8;
pub const AI_SEGMENTATION_TIMEOUT_MS: u64 = 60_000;

// DOM ids
pub const TRANSLATE_BUTTON_CONTAINER_ID: &str = "videonova-subtitles-translate-button-container";
pub const HIDE_NATIVE_CAPTIONS_STYLE_ID: &str = "videonova-hide-native-captions";

// YouTube specific
pub const YOUTUBE_NAVIGATE_EVENT: &str = "yt-navigate-finish";
pub const YOUTUBE_NATIVE_SUBTITLES_SELECTOR: &str = ".ytp-caption-window-container";

// Cross-context message types
pub const PLAYER_DATA_REQUEST_TYPE: &str = "PLAYER_DATA_REQUEST";
pub const PLAYER_DATA_RESPONSE_TYPE: &str = "PLAYER_DATA_RESPONSE";
pub const WAIT_TIMEDTEXT_REQUEST_TYPE: &str = "WAIT_TIMEDTEXT_REQUEST";
pub const WAIT_TIMEDTEXT_RESPONSE_TYPE: &str = "WAIT_TIMEDTEXT_RESPONSE";
pub const ENSURE_SUBTITLES_REQUEST_TYPE: &str = "ENSURE_SUBTITLES_REQUEST";
pub const ENSURE_SUBTITLES_RESPONSE_TYPE: &str = "ENSURE_SUBTITLES_RESPONSE";
pub const POST_MESSAGE_TIMEOUT_MS: u64 = 6_000;
pub const TIMEDTEXT_WAIT_TIMEOUT_MS: u64 = 5_000;

// Player wait / fetch retry constants
pub const MAX_STATE_WAIT_ATTEMPTS: usize = 20;
pub const STATE_WAIT_INTERVAL_MS: u64 = 300;
pub const MAX_FETCH_RETRIES: usize = 5;
pub const FETCH_RETRY_DELAY_MS: u64 = 1_000;
pub const MAX_POT_WAIT_ATTEMPTS: usize = 30;
pub const POT_WAIT_INTERVAL_MS: u64 = 200;

// Subtitle position
pub const DEFAULT_SUBTITLE_POSITION_PERCENT: f32 = 10.0;
