//! Frame streaming to the system `ffmpeg` binary.
//!
//! The encoder is an opaque collaborator reached only through this typed
//! interface: spawn, write frames in order, finish. Raw rgb24 frames go down
//! the child's stdin; when ffmpeg cannot keep up the pipe fills and
//! [`FfmpegEncoder::write_frame`] blocks, which is the pipeline's natural
//! backpressure. We use the system binary rather than linking FFmpeg to
//! avoid native dev header/lib requirements.

use std::{
    ffi::OsString,
    io::{Read as _, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::foundation::core::FrameRgb;
use crate::foundation::error::{NotefallError, NotefallResult};

/// A separately supplied audio asset muxed into the output container.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioInput {
    /// Path to the audio file; must exist before the encoder starts.
    pub path: PathBuf,
    /// AAC bitrate, e.g. "192k".
    pub bitrate: String,
}

impl AudioInput {
    /// Audio input with the default 192k AAC bitrate.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bitrate: "192k".to_owned(),
        }
    }
}

/// Fixed encoding settings, passed at start and immutable mid-stream.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeConfig {
    /// Frame width in pixels; must match every written frame exactly.
    pub width: u32,
    /// Frame height in pixels; must match every written frame exactly.
    pub height: u32,
    /// Fixed frame rate for the whole stream.
    pub fps: u32,
    /// Final output path; frames are written to a temporary sibling and
    /// moved into place on success.
    pub out_path: PathBuf,
    /// Overwrite an existing output file.
    pub overwrite: bool,
    /// x264 constant rate factor (0-51, lower = better).
    pub crf: u8,
    /// x264 preset name.
    pub preset: String,
    /// Optional audio asset to mux in.
    pub audio: Option<AudioInput>,
}

impl EncodeConfig {
    /// Validate before any process is spawned.
    pub fn validate(&self) -> NotefallResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(NotefallError::configuration(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // The default settings target yuv420p output for compatibility.
            return Err(NotefallError::configuration(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.fps == 0 {
            return Err(NotefallError::configuration("encode fps must be non-zero"));
        }
        if self.crf > 51 {
            return Err(NotefallError::configuration("crf must be 0-51"));
        }
        Ok(())
    }
}

/// Sensible mp4 defaults matching the drum renderer's historical settings.
pub fn default_mp4_config(
    out_path: impl Into<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> EncodeConfig {
    EncodeConfig {
        width,
        height,
        fps,
        out_path: out_path.into(),
        overwrite: true,
        crf: 18,
        preset: "fast".to_owned(),
        audio: None,
    }
}

/// Probe for a usable `ffmpeg` binary on PATH.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of an output path if needed.
pub fn ensure_parent_dir(path: &Path) -> NotefallResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn part_path(out_path: &Path) -> PathBuf {
    let mut name = out_path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    out_path.with_file_name(name)
}

fn build_args(cfg: &EncodeConfig, tmp_path: &Path) -> Vec<OsString> {
    fn push_strs(args: &mut Vec<OsString>, strs: &[&str]) {
        args.extend(strs.iter().map(OsString::from));
    }

    let mut args: Vec<OsString> = Vec::new();

    push_strs(&mut args, &[if cfg.overwrite { "-y" } else { "-n" }]);
    push_strs(&mut args, &["-loglevel", "error"]);

    // Video input: raw interleaved rgb24 frames on stdin, fixed schedule.
    push_strs(
        &mut args,
        &[
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ],
    );

    if let Some(audio) = &cfg.audio {
        args.push(OsString::from("-i"));
        args.push(audio.path.as_os_str().to_owned());
        // Explicit stream mapping: video from stdin, audio from the file,
        // container cut to the shorter of the two.
        push_strs(
            &mut args,
            &["-map", "0:v:0", "-map", "1:a:0", "-shortest"],
        );
        push_strs(&mut args, &["-c:a", "aac", "-b:a", &audio.bitrate]);
    } else {
        args.push(OsString::from("-an"));
    }

    push_strs(
        &mut args,
        &[
            "-c:v",
            "libx264",
            "-preset",
            &cfg.preset,
            "-crf",
            &cfg.crf.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ],
    );
    args.push(tmp_path.as_os_str().to_owned());

    args
}

/// Owns the external encoder process and its write-only byte stream.
///
/// Frames must be written in generation order; a broken stream surfaces as
/// an explicit [`NotefallError::StreamWrite`] carrying the encoder's last
/// diagnostic output. Dropping an unfinished encoder kills the child so no
/// orphan process survives an aborted render.
#[derive(Debug)]
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    tmp_path: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    diagnostics: Arc<Mutex<String>>,
    stderr_thread: Option<JoinHandle<()>>,
    frames_written: u64,
    finished: bool,
}

impl FfmpegEncoder {
    /// Validate the configuration, fail fast on a missing audio asset and
    /// spawn the system `ffmpeg` binary.
    pub fn spawn(cfg: EncodeConfig) -> NotefallResult<Self> {
        cfg.validate()?;
        if let Some(audio) = &cfg.audio
            && !audio.path.exists()
        {
            return Err(NotefallError::configuration(format!(
                "audio file not found: {}",
                audio.path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(NotefallError::resource_init(
                "ffmpeg is required for mp4 encoding, but was not found on PATH",
            ));
        }

        let mut command = Command::new("ffmpeg");
        command.args(build_args(&cfg, &part_path(&cfg.out_path)));
        Self::spawn_with_command(cfg, command)
    }

    /// Spawn an arbitrary command as the encoder process.
    ///
    /// The encoder is an opaque collaborator: anything that consumes raw
    /// frames on stdin can stand in for `ffmpeg`. The command's stdin is
    /// piped, stdout discarded and stderr captured for diagnostics.
    pub fn spawn_with_command(cfg: EncodeConfig, mut command: Command) -> NotefallResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(NotefallError::configuration(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if let Some(audio) = &cfg.audio
            && !audio.path.exists()
        {
            return Err(NotefallError::configuration(format!(
                "audio file not found: {}",
                audio.path.display()
            )));
        }

        let tmp_path = part_path(&cfg.out_path);
        debug!(command = ?command, "spawning encoder");

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                NotefallError::resource_init(format!(
                    "failed to spawn encoder '{}': {e}",
                    command.get_program().to_string_lossy()
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            NotefallError::resource_init("failed to open encoder stdin (unexpected)")
        })?;

        // Drain stderr continuously so a chatty encoder cannot deadlock on a
        // full pipe, and so diagnostics are available on any failure path.
        let diagnostics = Arc::new(Mutex::new(String::new()));
        let stderr_thread = child.stderr.take().map(|mut stderr| {
            let sink = Arc::clone(&diagnostics);
            std::thread::spawn(move || {
                let mut buf = String::new();
                if stderr.read_to_string(&mut buf).is_ok()
                    && let Ok(mut guard) = sink.lock()
                {
                    guard.push_str(&buf);
                }
            })
        });

        Ok(Self {
            cfg,
            tmp_path,
            child,
            stdin: Some(stdin),
            diagnostics,
            stderr_thread,
            frames_written: 0,
            finished: false,
        })
    }

    /// Number of frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn captured_diagnostics(&self) -> String {
        let text = self
            .diagnostics
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default();
        // Keep the tail; ffmpeg puts the actionable line last.
        let tail: String = text.chars().rev().take(500).collect();
        tail.chars().rev().collect::<String>().trim().to_owned()
    }

    /// Write one frame of raw rgb24 bytes to the encoder stream.
    ///
    /// Blocks when the encoder's input buffer is full; that backpressure is
    /// what throttles frame generation to encoder throughput.
    pub fn write_frame(&mut self, frame: &FrameRgb) -> NotefallResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(NotefallError::frame_shape(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        frame.validate()?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(NotefallError::stream_write(
                "encoder is already finalized",
                String::new(),
            ));
        };

        if let Err(e) = stdin.write_all(&frame.data) {
            // Give the drain thread a moment to capture the death rattle.
            std::thread::sleep(Duration::from_millis(100));
            return Err(NotefallError::stream_write(
                format!(
                    "failed to write frame {} to encoder stdin: {e}",
                    self.frames_written
                ),
                self.captured_diagnostics(),
            ));
        }

        self.frames_written += 1;
        Ok(())
    }

    /// Close the stream, wait for the encoder with a bounded timeout and
    /// move the finished file into place.
    ///
    /// A timeout is fatal: the process is forcibly terminated and an
    /// encoder-exit error is returned.
    pub fn finish(mut self, timeout: Duration) -> NotefallResult<()> {
        drop(self.stdin.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match self.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return Err(
                            self.abort(format!("encoder did not exit within {timeout:?}"))
                        );
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    return Err(self.abort(format!("failed to wait for encoder: {e}")));
                }
            }
        };

        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
        self.finished = true;

        if !status.success() {
            let _ = std::fs::remove_file(&self.tmp_path);
            return Err(NotefallError::encoder_exit(
                format!("encoder exited with status {status}"),
                self.captured_diagnostics(),
            ));
        }

        std::fs::rename(&self.tmp_path, &self.cfg.out_path).with_context(|| {
            format!(
                "failed to move '{}' into place at '{}'",
                self.tmp_path.display(),
                self.cfg.out_path.display()
            )
        })?;
        Ok(())
    }

    /// Terminate a misbehaving encoder and clean up: kill and reap the
    /// child, stop the stderr drain and remove the temporary output file.
    /// Used by every failure branch of [`finish`](Self::finish) so no
    /// orphan process or stray `.part` file outlives the error.
    fn abort(&mut self, msg: String) -> NotefallError {
        self.kill_child();
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
        self.finished = true;
        let _ = std::fs::remove_file(&self.tmp_path);
        NotefallError::encoder_exit(msg, self.captured_diagnostics())
    }

    fn kill_child(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("encoder kill: {e}");
        }
        let _ = self.child.wait();
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Aborted mid-stream: terminate the child, reap it and leave no
        // partial output behind.
        warn!("encoder dropped before finish; terminating the child process");
        drop(self.stdin.take());
        self.kill_child();
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
        let _ = std::fs::remove_file(&self.tmp_path);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
