use std::time::Instant;

use crate::{
    clock::TimelineClock,
    error::ChatreelResult,
    manifest::RenderManifest,
    schedule::total_duration_ms,
    surface::{SurfaceFrame, present},
};

/// Interactive preview of one manifest: an interactive-mode clock plus the
/// presentation surface, evaluated on every tick.
///
/// Uses the same `present` the export path uses: the surface only ever reads
/// time, so whatever a preview shows at time `t`, the export shows at its
/// frame nearest `t`. Export failures never touch a preview: each export runs
/// on its own clock instance.
pub struct PreviewSession {
    manifest: RenderManifest,
    clock: TimelineClock,
}

impl PreviewSession {
    pub fn new(manifest: RenderManifest) -> ChatreelResult<Self> {
        manifest.validate()?;
        let duration_ms = total_duration_ms(&manifest.messages).max(1) as f64;
        Ok(Self {
            clock: TimelineClock::interactive(duration_ms)?,
            manifest,
        })
    }

    pub fn manifest(&self) -> &RenderManifest {
        &self.manifest
    }

    pub fn time_ms(&self) -> f64 {
        self.clock.time_ms()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn play(&mut self, now: Instant) {
        self.clock.play(now);
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn seek(&mut self, time_ms: f64, now: Instant) {
        self.clock.seek(time_ms, now);
    }

    /// One scheduling tick: advance the clock, then evaluate the surface at
    /// the new time.
    pub fn tick(&mut self, now: Instant) -> SurfaceFrame {
        self.clock.advance_to(now);
        self.frame()
    }

    /// Evaluate the surface at the current time without advancing.
    pub fn frame(&self) -> SurfaceFrame {
        present(&self.manifest, self.clock.time_ms())
    }
}
