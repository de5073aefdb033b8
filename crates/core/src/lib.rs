pub mod alignment;
pub mod catalog;
pub mod error;
pub mod format;
pub mod images;
pub mod keys;
pub mod llm;
pub mod narration;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod reconcile;
pub mod segments;
pub mod timeline;
pub mod types;

pub use alignment::{AlignedText, build_position_map, normalize};
pub use catalog::{DEFAULT_VOICE_MODEL, STYLE_PRESETS, VOICES, find_style_preset, find_voice};
pub use error::{
    BatchGenerationError, CodecError, ConfigurationError, GenerationError, NarrationError,
    ProviderError, Result, SegmentAlignmentError,
};
pub use format::{format_script_text, format_srt, format_timestamp};
pub use images::{BatchProgress, ImageScheduler, SchedulerConfig};
pub use keys::{ApiKeys, EnvKeyStore, FileKeyStore, KeyStore, LayeredKeyStore};
pub use narration::{MediaCodec, Mp3FrameCodec, NarrationService};
pub use output::{
    get_audio_path, get_content_path, get_key_file_path, get_script_path, get_subtitles_path,
    get_timeline_path, new_run_dir,
};
pub use pipeline::{Phase, Progress, ScriptGenerator};
pub use provider::LlmProvider;
pub use reconcile::reconcile;
pub use segments::{SegmentIdentifier, Segmentation};
pub use timeline::{SubtitleTrack, Timeline, build_timeline, total_frames_for};
pub use types::{
    CharacterTiming, ConceptualSegment, GeneratedContent, GeneratedImage, GenerationConfig,
    Script, SegmentIndex, SegmentTiming,
};
