use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    core::{Fps, FrameIndex},
    error::{ChatreelError, ChatreelResult},
    voiced::AudioSegment,
};

/// Container format of the concatenated audio track handed to the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    RawF32le { sample_rate: u32, channels: u16 },
}

/// Per-message audio segments concatenated end-to-end, in message order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTrack {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl AudioTrack {
    pub fn concat(segments: &[AudioSegment], format: AudioFormat) -> Self {
        let total = segments.iter().map(|s| s.bytes.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for seg in segments {
            bytes.extend_from_slice(&seg.bytes);
        }
        Self { bytes, format }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

impl EncoderConfig {
    pub fn validate(&self) -> ChatreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChatreelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Default settings target yuv420p output for maximum compatibility.
            return Err(ChatreelError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Fps::new(self.fps.0)?;
        Ok(())
    }
}

/// Mux/encode boundary: equally-spaced image frames (implicit timestamp
/// `index * 1000/fps`) plus one concatenated audio track, into one output
/// file. Frames arrive in strictly increasing index order; the core never
/// inspects the encoder's internals beyond this contract.
pub trait VideoEncoder {
    /// Called once before any frames, with the full audio track.
    fn begin(&mut self, cfg: &EncoderConfig, audio: &AudioTrack) -> ChatreelResult<()>;
    /// Push one frame in strictly increasing index order.
    fn push_frame(&mut self, index: FrameIndex, image: &[u8]) -> ChatreelResult<()>;
    /// Finalize the output file. Without this call no valid artifact exists.
    fn finish(&mut self) -> ChatreelResult<()>;
}

/// In-memory encoder for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    cfg: Option<EncoderConfig>,
    audio: Option<AudioTrack>,
    frames: Vec<(FrameIndex, Vec<u8>)>,
    finished: bool,
}

impl InMemoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<EncoderConfig> {
        self.cfg
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, Vec<u8>)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl VideoEncoder for InMemoryEncoder {
    fn begin(&mut self, cfg: &EncoderConfig, audio: &AudioTrack) -> ChatreelResult<()> {
        cfg.validate()?;
        self.cfg = Some(*cfg);
        self.audio = Some(audio.clone());
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, index: FrameIndex, image: &[u8]) -> ChatreelResult<()> {
        if let Some((last, _)) = self.frames.last()
            && index.0 <= last.0
        {
            return Err(ChatreelError::encode(format!(
                "frame index {} pushed out of order (last was {})",
                index.0, last.0
            )));
        }
        self.frames.push((index, image.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> ChatreelResult<()> {
        self.finished = true;
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn ensure_parent_dir(path: &Path) -> ChatreelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// MP4 encoder backed by the system `ffmpeg` binary.
///
/// Frames are piped to stdin as an image2pipe stream; the audio track is
/// staged in a temp file and muxed as a second input. If the encoder is
/// dropped before [`VideoEncoder::finish`], the child is killed and the
/// partial output file removed, so an aborted export leaves no artifact.
pub struct FfmpegEncoder {
    out_path: PathBuf,
    overwrite: bool,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    audio_tmp: Option<PathBuf>,
    next_index: u64,
    /// Set once this attempt has spawned ffmpeg. Drop cleanup must never
    /// touch `out_path` before that: the file may be a pre-existing export
    /// this encoder was not allowed to overwrite.
    started: bool,
    finished: bool,
}

impl FfmpegEncoder {
    pub fn new(out_path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite,
            child: None,
            stdin: None,
            audio_tmp: None,
            next_index: 0,
            started: false,
            finished: false,
        }
    }

    fn stage_audio(&mut self, audio: &AudioTrack) -> ChatreelResult<Option<PathBuf>> {
        if audio.is_empty() {
            return Ok(None);
        }
        let path = std::env::temp_dir().join(format!(
            "chatreel_audio_{}_{}.bin",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        std::fs::write(&path, &audio.bytes).map_err(|e| {
            ChatreelError::encode(format!("write audio temp '{}': {e}", path.display()))
        })?;
        self.audio_tmp = Some(path.clone());
        Ok(Some(path))
    }

    fn cleanup_partial(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(path) = self.audio_tmp.take() {
            let _ = std::fs::remove_file(path);
        }
        if self.started {
            let _ = std::fs::remove_file(&self.out_path);
        }
    }
}

impl VideoEncoder for FfmpegEncoder {
    #[tracing::instrument(skip(self, audio))]
    fn begin(&mut self, cfg: &EncoderConfig, audio: &AudioTrack) -> ChatreelResult<()> {
        cfg.validate()?;
        ensure_parent_dir(&self.out_path)?;

        if !self.overwrite && self.out_path.exists() {
            return Err(ChatreelError::validation(format!(
                "output file '{}' already exists",
                self.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ChatreelError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let audio_path = self.stage_audio(audio)?;

        // System `ffmpeg` rather than a native binding avoids FFmpeg dev
        // header/lib requirements.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.arg(if self.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "image2pipe",
            "-framerate",
            &cfg.fps.0.to_string(),
            "-i",
            "pipe:0",
        ]);

        match (&audio_path, audio.format) {
            (Some(path), AudioFormat::Mp3) => {
                cmd.args(["-f", "mp3", "-i"]).arg(path);
            }
            (
                Some(path),
                AudioFormat::RawF32le {
                    sample_rate,
                    channels,
                },
            ) => {
                cmd.args([
                    "-f",
                    "f32le",
                    "-ar",
                    &sample_rate.to_string(),
                    "-ac",
                    &channels.to_string(),
                    "-i",
                ])
                .arg(path);
            }
            (None, _) => {}
        }

        cmd.args([
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        if audio_path.is_some() {
            cmd.args(["-c:a", "aac", "-shortest"]);
        } else {
            cmd.arg("-an");
        }
        cmd.arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ChatreelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChatreelError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.next_index = 0;
        self.started = true;
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, index: FrameIndex, image: &[u8]) -> ChatreelResult<()> {
        if index.0 != self.next_index {
            return Err(ChatreelError::encode(format!(
                "frame index {} pushed out of order (expected {})",
                index.0, self.next_index
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ChatreelError::encode("encoder has not begun or is finished"));
        };
        stdin.write_all(image).map_err(|e| {
            ChatreelError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.next_index += 1;
        Ok(())
    }

    fn finish(&mut self) -> ChatreelResult<()> {
        drop(self.stdin.take());

        let Some(child) = self.child.take() else {
            return Err(ChatreelError::encode("encoder was never started"));
        };

        let output = child.wait_with_output().map_err(|e| {
            ChatreelError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if let Some(path) = self.audio_tmp.take() {
            let _ = std::fs::remove_file(path);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let _ = std::fs::remove_file(&self.out_path);
            return Err(ChatreelError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        self.finished = true;
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if !self.finished {
            self.cleanup_partial();
        }
    }
}
