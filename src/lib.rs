#![forbid(unsafe_code)]

pub mod capture;
pub mod clock;
pub mod core;
pub mod encode;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod preview;
pub mod schedule;
pub mod surface;
pub mod synth;
pub mod voiced;

pub use capture::{FrameCapture, RasterCapture};
pub use clock::{ClockMode, TimelineClock};
pub use core::{CancelToken, Canvas, Fps, FrameIndex, MessageId, Speaker};
pub use encode::{AudioFormat, AudioTrack, EncoderConfig, FfmpegEncoder, InMemoryEncoder, VideoEncoder};
pub use error::{ChatreelError, ChatreelResult};
pub use manifest::{Background, CanvasSpec, LayoutSettings, Message, Meta, RenderManifest, Tapback};
pub use pipeline::{ExportStats, export_video, frame_times_ms};
pub use preview::PreviewSession;
pub use schedule::{ScheduleEntry, build_schedule, total_duration_ms, visible_count};
pub use surface::{BubbleView, HeightTween, SurfaceFrame, present};
pub use synth::{HttpSynthesizer, SilenceSynthesizer, SpeechSynthesizer, SynthesizedClip, VoiceSelection};
pub use voiced::{AudioSegment, VoicedScript, build_voiced_script};
