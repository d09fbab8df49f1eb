//! Обработка реплик: оптимизация, AI сегментация и перевод

pub mod ai_segmentation;
pub mod optimizer;
pub mod translator;

pub use ai_segmentation::{ai_segment_block, AiSegmenter};
pub use optimizer::optimize_subtitles;
pub use translator::{translate_subtitles, SubtitleTranslateRequest, SubtitlesTranslator, SubtitlesVideoContext};
