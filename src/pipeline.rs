use crate::{
    capture::FrameCapture,
    clock::TimelineClock,
    core::{CancelToken, FrameIndex, Fps},
    encode::{AudioTrack, EncoderConfig, VideoEncoder},
    error::{ChatreelError, ChatreelResult},
    manifest::RenderManifest,
    surface::present,
    synth::{SpeechSynthesizer, VoiceSelection},
    voiced::build_voiced_script,
};

/// Export outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub frames: u64,
    pub duration_ms: u64,
    pub audio_bytes: u64,
}

/// Capture-step timestamps for a duration: `i * 1000/fps` rounded to whole
/// milliseconds and clamped to the duration, stepping while
/// `i * (1000/fps) <= duration_ms`. Always includes a final frame at the
/// duration itself; total count is `floor(duration / frame_interval) + 1`.
pub fn frame_times_ms(fps: Fps, duration_ms: u64) -> Vec<u64> {
    let step = fps.frame_interval_ms();
    let mut times = Vec::new();
    let mut i: u64 = 0;
    while (i as f64) * step <= duration_ms as f64 + 1e-6 {
        times.push(fps.frame_time_ms(i).min(duration_ms));
        i += 1;
    }
    times
}

/// Run one export attempt end to end.
///
/// Sequence: validate the manifest, synthesize every message (strictly in
/// order) to rebuild the schedule from measured durations, then drive a fresh
/// export-mode clock through fixed time steps, capturing one frame per step,
/// and hand the ordered frames plus the concatenated audio to the encoder.
///
/// Every step is sequential: frame `i` reflects the surface evaluated at
/// exactly its clamped step time, and each capture is fully completed before
/// the clock advances; that lockstep is what makes preview/export parity
/// hold. Any failure is terminal for the attempt; nothing is retried and no
/// partial artifact is produced. Cancellation is honored between steps.
#[tracing::instrument(skip_all, fields(messages = manifest.messages.len()))]
pub fn export_video(
    manifest: &RenderManifest,
    voices: &VoiceSelection,
    synth: &mut dyn SpeechSynthesizer,
    capture: &mut dyn FrameCapture,
    encoder: &mut dyn VideoEncoder,
    cancel: &CancelToken,
) -> ChatreelResult<ExportStats> {
    manifest.validate()?;
    cancel.bail_if_canceled()?;

    let voiced = build_voiced_script(&manifest.messages, voices, synth, cancel)?;
    let export_manifest = manifest.with_messages(voiced.messages.clone());
    let audio = AudioTrack::concat(&voiced.segments, voiced.audio_format);
    let duration_ms = voiced.duration_ms;

    let cfg = EncoderConfig {
        width: manifest.canvas.width,
        height: manifest.canvas.height,
        fps: manifest.canvas.fps,
    };
    cfg.validate()?;

    // Fresh clock per attempt; export mode is one-way.
    let mut clock = TimelineClock::export(duration_ms.max(1) as f64)?;

    encoder.begin(&cfg, &audio)?;

    let times = frame_times_ms(cfg.fps, duration_ms);
    tracing::debug!(frames = times.len(), duration_ms, "starting capture loop");

    for (i, &t) in times.iter().enumerate() {
        cancel.bail_if_canceled()?;

        clock.set_export_time(t as f64)?;
        // One full rendering pass at the stepped time, then capture; the
        // capture result is awaited before the clock moves again.
        let frame = present(&export_manifest, clock.time_ms());
        let bytes = capture.capture(&frame)?;
        if bytes.is_empty() {
            return Err(ChatreelError::capture(
                "frame rasterization returned no data",
            ));
        }
        encoder.push_frame(FrameIndex(i as u64), &bytes)?;
    }

    encoder.finish()?;

    Ok(ExportStats {
        frames: times.len() as u64,
        duration_ms,
        audio_bytes: audio.bytes.len() as u64,
    })
}
