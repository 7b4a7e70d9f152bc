use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "notefall", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Input notes JSON (array of note events).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output width in pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Frame rate.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Fall speed multiplier (1.0 = 40% of screen height per second).
    #[arg(long, default_value_t = 1.0)]
    fall_speed: f32,

    /// Note corner radius in pixels.
    #[arg(long, default_value_t = 8.0)]
    corner_radius: f32,

    /// Skip the static overlay (strike line + lane markers).
    #[arg(long)]
    no_overlay: bool,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Audio file to mux alongside the video.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Seconds appended after the last note so it can fall off screen.
    #[arg(long, default_value_t = 3.0)]
    tail: f64,

    /// Explicit duration in seconds (overrides the derived one).
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

impl From<BackendChoice> for notefall::BackendKind {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Cpu => notefall::BackendKind::Cpu,
            #[cfg(feature = "gpu")]
            BackendChoice::Gpu => notefall::BackendKind::Gpu,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_notes_json(path: &Path) -> anyhow::Result<Vec<notefall::Note>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open notes '{}'", path.display()))?;
    let notes = notefall::notes_from_json(&text).with_context(|| "parse notes JSON")?;
    Ok(notes)
}

fn build_opts(common: &CommonArgs) -> anyhow::Result<notefall::RenderOpts> {
    let canvas = notefall::Canvas::new(common.width, common.height)?;
    let fps = notefall::Fps::whole(common.fps)?;
    let mut opts = notefall::RenderOpts::new(canvas, fps);
    opts.fall_speed_multiplier = common.fall_speed;
    opts.corner_radius = common.corner_radius;
    opts.draw_overlay = !common.no_overlay;
    opts.backend = common.backend.into();
    Ok(opts)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let notes = read_notes_json(&args.common.in_path)?;
    let opts = build_opts(&args.common)?;

    // Same scene compilation as the video path; only the frame loop differs.
    let (scene, _) = notefall::build_scene(&notes, &opts)?;
    let mut ctx = notefall::create_context(opts.backend, scene)?;

    let t = opts.fps.frame_to_secs(notefall::FrameIndex(args.frame));
    ctx.render_frame(t)?;
    let frame = ctx.read_frame()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let notes = read_notes_json(&args.common.in_path)?;
    let mut opts = build_opts(&args.common)?;
    opts.tail_seconds = args.tail;
    opts.duration_override = args.duration;

    let audio = args.audio.map(notefall::AudioInput::new);

    let stats = notefall::render_to_mp4(&notes, &args.out, audio, &opts)?;

    eprintln!(
        "wrote {} ({} frames in {:.2}s)",
        args.out.display(),
        stats.frames,
        stats.elapsed.as_secs_f64()
    );
    Ok(())
}
