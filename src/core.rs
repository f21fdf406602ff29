use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ChatreelError, ChatreelResult};

/// Opaque message identifier, unique within one conversation.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Sender,
    Receiver,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Fps(pub u32);

impl Fps {
    pub fn new(fps: u32) -> ChatreelResult<Self> {
        if fps == 0 {
            return Err(ChatreelError::validation("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    pub fn frame_interval_ms(self) -> f64 {
        1000.0 / f64::from(self.0)
    }

    /// Nominal timestamp of frame `i`, rounded to whole milliseconds.
    pub fn frame_time_ms(self, i: u64) -> u64 {
        ((i as f64) * self.frame_interval_ms()).round() as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn validate(self) -> ChatreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChatreelError::validation("canvas width/height must be > 0"));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag shared between an export attempt and its caller.
///
/// The pipeline checks the token between sequential steps (synthesis requests,
/// capture steps); a canceled attempt produces no output artifact.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bail_if_canceled(&self) -> ChatreelResult<()> {
        if self.is_canceled() {
            return Err(ChatreelError::Canceled);
        }
        Ok(())
    }
}
