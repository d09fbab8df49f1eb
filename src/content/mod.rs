//! Контентная часть: расписание показа, сегментация, перевод и адаптер
//! видеоплатформы

pub mod adapter;
pub mod coordinator;
pub mod platforms;
pub mod scheduler;
pub mod segmentation;

#[cfg(test)]
mod tests;

pub use adapter::{AdapterServices, PageEvent, PageHost, UniversalVideoAdapter};
pub use coordinator::{TranslationCoordinator, TranslationCoordinatorOptions, TranslationStatus};
pub use platforms::{youtube_config, PlatformConfig};
pub use scheduler::SubtitlesScheduler;
pub use segmentation::SegmentationPipeline;
