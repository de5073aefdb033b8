use std::{
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use tokio::fs;

use reelsmith_core::{
    GenerationConfig, KeyStore, LlmProvider, MediaCodec, Mp3FrameCodec, Phase, Progress,
    STYLE_PRESETS, SchedulerConfig, ScriptGenerator, SubtitleTrack, build_timeline,
    catalog::{DEFAULT_VOICE_MODEL, find_style_preset, find_voice},
    format::{format_script_text, format_srt, format_timestamp},
    keys::{FileKeyStore, LayeredKeyStore},
    output::{
        get_audio_path, get_content_path, get_key_file_path, get_script_path, get_subtitles_path,
        get_timeline_path, new_run_dir,
    },
    timeline::{DEFAULT_FPS, DEFAULT_MAX_LINE_LENGTH},
    total_frames_for,
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for LlmProvider (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gpt4,
    Claude,
}

impl From<CliProvider> for LlmProvider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gpt4 => LlmProvider::Gpt4,
            CliProvider::Claude => LlmProvider::Claude,
        }
    }
}

#[derive(Parser)]
#[command(name = "reelsmith")]
#[command(about = "Turn a topic into a narrated, illustrated video timeline")]
struct Cli {
    /// What the video is about
    topic: String,

    /// Writing style of the script (e.g. "documentary", "playful")
    #[arg(short, long, default_value = "informative")]
    style: String,

    /// Visual style preset for the illustrations
    #[arg(long, default_value = "Cinematic")]
    preset: String,

    /// Language model used for the script and image prompts
    #[arg(short, long, default_value = "gpt4")]
    provider: CliProvider,

    /// Number of parts the script is written in
    #[arg(short = 'n', long, default_value_t = 3)]
    segments: u32,

    /// Narration voice, by name or id
    #[arg(short, long)]
    voice: String,

    /// Narration voice model id
    #[arg(long, default_value = DEFAULT_VOICE_MODEL)]
    voice_model: String,

    /// Write subtitles alongside the timeline
    #[arg(long)]
    subtitles: bool,

    /// Frames per second of the rendered timeline
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: u32,

    /// Characters per subtitle phrase before breaking at a word boundary
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Image jobs running at once
    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    /// Image requests allowed per minute
    #[arg(long, default_value_t = 100)]
    rate_limit: usize,

    /// Output directory. Defaults to a fresh run directory.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Key profile to use from the key file
    #[arg(short, long, default_value = "default")]
    user: String,

    /// Key file. Defaults to <config dir>/reelsmith/keys.toml
    #[arg(long)]
    keys_file: Option<PathBuf>,

    /// Show debug logs
    #[arg(long)]
    verbose: bool,
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn step_done(phase: Phase) -> &'static str {
    match phase {
        Phase::GeneratingOutline => "Outline generated",
        Phase::GeneratingSegments => "Script written",
        Phase::IdentifyingConceptualSegments => "Conceptual segments identified",
        Phase::GeneratingNarration => "Narration generated",
        Phase::ReconcilingTimings => "Timings aligned",
        Phase::GeneratingImages => "Images generated",
        Phase::Done => "Done",
    }
}

fn init_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let provider: LlmProvider = cli.provider.into();

    // Validate settings and keys before any network call
    let voice = find_voice(&cli.voice)?;
    let preset = find_style_preset(&cli.preset).ok_or_else(|| {
        let names: Vec<&str> = STYLE_PRESETS.iter().map(|p| p.name).collect();
        anyhow!(
            "Unknown style preset: {} (available: {})",
            cli.preset,
            names.join(", ")
        )
    })?;

    let key_file = cli.keys_file.clone().unwrap_or_else(get_key_file_path);
    let keys = LayeredKeyStore::new(FileKeyStore::new(key_file))
        .fetch(&cli.user)
        .await?;
    let scheduler = SchedulerConfig {
        max_concurrency: cli.concurrency,
        requests_per_minute: cli.rate_limit,
        ..SchedulerConfig::default()
    };
    let generator = ScriptGenerator::from_keys(provider, &keys, reqwest::Client::new(), scheduler)?;

    let config = GenerationConfig {
        topic: cli.topic.clone(),
        style: cli.style.clone(),
        style_preset_id: preset.uuid.to_string(),
        llm_provider: provider,
        segment_count: cli.segments,
        voice_id: Some(voice.id.to_string()),
        model_id: Some(cli.voice_model.clone()),
        subtitles: cli.subtitles,
    };

    let run_dir = cli.out.clone().unwrap_or_else(new_run_dir);
    fs::create_dir_all(&run_dir)
        .await
        .with_context(|| format!("Failed to create {}", run_dir.display()))?;

    println!(
        "\n{}  {}\n",
        style("reelsmith").cyan().bold(),
        style("Video Generator").dim()
    );
    println!(
        "{} {} {}",
        style("Topic:").dim(),
        style(&config.topic).bold(),
        style(format!(
            "({}, {}, voice {})",
            provider.name(),
            preset.name,
            voice.name
        ))
        .dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();
    let spinner = create_spinner(Phase::GeneratingOutline.status())?;
    let current = Mutex::new((Phase::GeneratingOutline, Instant::now()));

    let on_progress = |progress: Progress| {
        match progress {
            Progress::Phase(phase) => {
                let Ok(mut current) = current.lock() else {
                    return;
                };
                if current.0 != phase {
                    spinner.println(format!(
                        "{} {} {}",
                        style("✓").green().bold(),
                        step_done(current.0),
                        style(format!("[{}]", format_duration(current.1.elapsed()))).dim()
                    ));
                    *current = (phase, Instant::now());
                }
            }
            Progress::Images(_) => {}
        }
        spinner.set_message(progress.message());
    };

    let result = generator.generate(&config, &on_progress).await;
    spinner.finish_and_clear();
    let content = result?;

    // Size the timeline from the audio itself, falling back to the timings
    let narration_end = content.total_duration;
    let duration = match Mp3FrameCodec.decode_audio_duration(&content.audio.bytes) {
        Ok(seconds) => seconds.max(narration_end),
        Err(e) => {
            warn!("could not read narration length, using timings: {e}");
            narration_end
        }
    };
    let total_frames = total_frames_for(duration, cli.fps);
    let timeline = build_timeline(
        &content.script.conceptual_segments,
        &content.images,
        total_frames,
        cli.fps,
    );

    fs::write(get_script_path(&run_dir), format_script_text(&content.script)).await?;
    fs::write(get_audio_path(&run_dir), &content.audio.bytes).await?;
    fs::write(
        get_timeline_path(&run_dir),
        serde_json::to_string_pretty(&timeline)?,
    )
    .await?;
    fs::write(
        get_content_path(&run_dir),
        serde_json::to_string_pretty(&content)?,
    )
    .await?;

    let mut subtitle_count = None;
    if content.subtitles {
        if let Some(timings) = &content.script.character_timings {
            let track = SubtitleTrack::new(timings, cli.max_line_length);
            fs::write(get_subtitles_path(&run_dir), format_srt(track.phrases())).await?;
            subtitle_count = Some(track.phrases().len());
        }
    }

    println!(
        "{} {} segments, {} images, {} narration, {} frames @ {} fps",
        style("✓").green().bold(),
        content.script.conceptual_segments.len(),
        content.images.len(),
        style(format_timestamp(duration)).yellow(),
        timeline.total_frames,
        timeline.fps
    );
    if let Some(count) = subtitle_count {
        println!("{} {} subtitle phrases", style("✓").green().bold(), count);
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}\n",
        style("Saved:").dim(),
        style(run_dir.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());

    for clip in &timeline.clips {
        println!(
            "[{}] {}",
            format_timestamp(clip.from as f64 / timeline.fps.max(1) as f64),
            clip.theme
        );
    }

    Ok(())
}
