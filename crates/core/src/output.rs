use std::path::{Path, PathBuf};

use uuid::Uuid;

pub fn get_root_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("reelsmith")
}

/// Fresh directory path for one generation run
pub fn new_run_dir() -> PathBuf {
    get_root_data_dir()
        .join("runs")
        .join(Uuid::new_v4().to_string())
}

/// Default location of the per-user key file
pub fn get_key_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("reelsmith")
        .join("keys.toml")
}

pub fn get_script_path(run_dir: &Path) -> PathBuf {
    run_dir.join("script.txt")
}

pub fn get_audio_path(run_dir: &Path) -> PathBuf {
    run_dir.join("narration.mp3")
}

pub fn get_timeline_path(run_dir: &Path) -> PathBuf {
    run_dir.join("timeline.json")
}

pub fn get_subtitles_path(run_dir: &Path) -> PathBuf {
    run_dir.join("subtitles.srt")
}

pub fn get_content_path(run_dir: &Path) -> PathBuf {
    run_dir.join("content.json")
}
