use std::time::Instant;

use crate::error::{ChatreelError, ChatreelResult};

/// Hold after the last reveal before an interactive clock wraps back to zero.
pub const LOOP_HOLD_MS: f64 = 1200.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    Interactive,
    Export,
}

/// Single source of timeline time for one render session.
///
/// One time value with mode-gated writers: in interactive mode time advances
/// from a wall-clock anchor via [`TimelineClock::advance_to`]; in export mode
/// the capture loop is the only writer via [`TimelineClock::set_export_time`].
/// Readers never branch on mode; that is what keeps preview and export from
/// diverging. Export mode is one-way: a fresh clock is built per attempt and
/// never toggled back.
#[derive(Debug)]
pub struct TimelineClock {
    mode: ClockMode,
    time_ms: f64,
    playing: bool,
    duration_ms: f64,
    /// Wall-clock anchor plus the timeline time it corresponds to, so that
    /// `time = offset + (now - anchor)` and resuming or seeking never jumps.
    anchor: Option<(Instant, f64)>,
}

impl TimelineClock {
    pub fn interactive(duration_ms: f64) -> ChatreelResult<Self> {
        Self::new(ClockMode::Interactive, duration_ms)
    }

    pub fn export(duration_ms: f64) -> ChatreelResult<Self> {
        Self::new(ClockMode::Export, duration_ms)
    }

    fn new(mode: ClockMode, duration_ms: f64) -> ChatreelResult<Self> {
        if !(duration_ms.is_finite() && duration_ms > 0.0) {
            return Err(ChatreelError::validation(
                "clock duration_ms must be finite and > 0",
            ));
        }
        Ok(Self {
            mode,
            time_ms: 0.0,
            playing: false,
            duration_ms,
            anchor: None,
        })
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Start (or resume) interactive playback. Re-anchors so that time
    /// continues from the current value with no jump. Inert in export mode.
    pub fn play(&mut self, now: Instant) {
        if self.mode == ClockMode::Export || self.playing {
            return;
        }
        self.anchor = Some((now, self.time_ms));
        self.playing = true;
    }

    /// Pause interactive playback, freezing the current time. Inert in export
    /// mode.
    pub fn pause(&mut self) {
        if self.mode == ClockMode::Export {
            return;
        }
        self.playing = false;
        self.anchor = None;
    }

    /// Jump to `time_ms` (clamped to the timeline) and re-anchor so playback,
    /// if running, continues from there. Inert in export mode.
    pub fn seek(&mut self, time_ms: f64, now: Instant) {
        if self.mode == ClockMode::Export {
            return;
        }
        self.time_ms = clamp_time(time_ms, self.duration_ms);
        if self.playing {
            self.anchor = Some((now, self.time_ms));
        }
    }

    /// One interactive scheduling tick: recompute `time = now - anchor`.
    ///
    /// Once the content is fully revealed and [`LOOP_HOLD_MS`] has elapsed,
    /// the clock silently resets to zero and keeps playing (the ambient demo
    /// loop). No-op while paused or in export mode.
    pub fn advance_to(&mut self, now: Instant) {
        if self.mode == ClockMode::Export || !self.playing {
            return;
        }
        let Some((anchor, offset_ms)) = self.anchor else {
            self.anchor = Some((now, self.time_ms));
            return;
        };
        let elapsed_ms = offset_ms + now.saturating_duration_since(anchor).as_secs_f64() * 1000.0;
        if elapsed_ms >= self.duration_ms + LOOP_HOLD_MS {
            self.time_ms = 0.0;
            self.anchor = Some((now, 0.0));
        } else {
            self.time_ms = elapsed_ms;
        }
    }

    /// Export-mode writer, called once per capture step. The only way time
    /// moves during an export; rejected on an interactive clock.
    pub fn set_export_time(&mut self, time_ms: f64) -> ChatreelResult<()> {
        if self.mode != ClockMode::Export {
            return Err(ChatreelError::validation(
                "set_export_time requires an export-mode clock",
            ));
        }
        if !time_ms.is_finite() || time_ms < 0.0 {
            return Err(ChatreelError::validation(
                "export time must be finite and >= 0",
            ));
        }
        self.time_ms = clamp_time(time_ms, self.duration_ms);
        Ok(())
    }
}

fn clamp_time(time_ms: f64, duration_ms: f64) -> f64 {
    time_ms.clamp(0.0, duration_ms)
}
