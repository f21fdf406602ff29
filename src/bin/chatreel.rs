use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chatreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reveal schedule derived from a manifest as JSON.
    Schedule(ScheduleArgs),
    /// Rasterize the surface at one timeline time as a PNG.
    Frame(FrameArgs),
    /// Export an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    /// Input manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline time in milliseconds.
    #[arg(long)]
    time_ms: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Base URL of the speech synthesis service.
    #[arg(long, default_value = "http://localhost:5522")]
    synth_url: String,

    /// Voice id for sender-side messages.
    #[arg(long, default_value = "alloy")]
    voice_sender: String,

    /// Voice id for receiver-side messages.
    #[arg(long, default_value = "verse")]
    voice_receiver: String,

    /// Skip the synthesis service: silent audio with text-length-estimated
    /// durations.
    #[arg(long)]
    offline: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Schedule(args) => cmd_schedule(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_manifest(path: &Path) -> anyhow::Result<chatreel::RenderManifest> {
    let f = File::open(path).with_context(|| format!("open manifest '{}'", path.display()))?;
    let manifest = chatreel::RenderManifest::from_json_reader(BufReader::new(f))?;
    manifest.validate()?;
    Ok(manifest)
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.in_path)?;
    let schedule = chatreel::build_schedule(&manifest.messages);
    println!("{}", serde_json::to_string_pretty(&schedule)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.in_path)?;
    let frame = chatreel::present(&manifest, args.time_ms as f64);
    let img = chatreel::RasterCapture::default().rasterize(&frame);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.in_path)?;

    let voices = chatreel::VoiceSelection {
        sender_voice: args.voice_sender,
        receiver_voice: args.voice_receiver,
    };

    let mut http;
    let mut silence;
    let synth: &mut dyn chatreel::SpeechSynthesizer = if args.offline {
        silence = chatreel::SilenceSynthesizer::default();
        &mut silence
    } else {
        http = chatreel::HttpSynthesizer::new(&args.synth_url)?;
        &mut http
    };

    let mut capture = chatreel::RasterCapture::default();
    let mut encoder = chatreel::FfmpegEncoder::new(&args.out, true);
    let cancel = chatreel::CancelToken::new();

    let stats = chatreel::export_video(
        &manifest,
        &voices,
        synth,
        &mut capture,
        &mut encoder,
        &cancel,
    )?;

    eprintln!(
        "wrote {} ({} frames, {} ms)",
        args.out.display(),
        stats.frames,
        stats.duration_ms
    );
    Ok(())
}
