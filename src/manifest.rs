use std::collections::BTreeSet;
use std::io::Read;

use crate::{
    core::{Canvas, Fps, MessageId, Speaker},
    error::{ChatreelError, ChatreelResult},
    schedule::DEFAULT_DELAY_MS,
};

/// One scripted chat message. Order within the manifest is display order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub speaker: Speaker,
    pub text: String,
    /// Hold time before the *next* message appears. Default 3.0 s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tapback: Option<Tapback>,
}

impl Message {
    /// Effective delay in whole milliseconds: non-finite falls back to the
    /// default, negative clamps to zero.
    pub fn delay_ms(&self) -> u64 {
        match self.delay_seconds {
            Some(s) if s.is_finite() => (s.max(0.0) * 1000.0).round() as u64,
            _ => DEFAULT_DELAY_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tapback {
    Heart,
    ThumbsUp,
    ThumbsDown,
    Haha,
    Exclamation,
    Question,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

impl CanvasSpec {
    pub fn canvas(self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Solid background color. Anything richer is out of scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Background {
    pub rgb: [u8; 3],
}

impl Default for Background {
    fn default() -> Self {
        Self { rgb: [0, 0, 0] }
    }
}

/// Numeric UI metrics expressed at the fixed pre-scale reference width
/// ([`crate::surface::REFERENCE_WIDTH`]). The surface applies one uniform
/// scale factor so a small preview and a full-resolution export lay out
/// identically.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub panel_margin: f64,
    pub bubble_font_size: f64,
    pub bubble_padding: f64,
    pub bubble_corner_radius: f64,
    pub bubble_gap: f64,
    pub max_bubble_width_ratio: f64,
    pub avatar_size: f64,
    pub separator_font_size: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            panel_margin: 12.0,
            bubble_font_size: 17.0,
            bubble_padding: 10.0,
            bubble_corner_radius: 18.0,
            bubble_gap: 6.0,
            max_bubble_width_ratio: 0.72,
            avatar_size: 28.0,
            separator_font_size: 12.0,
        }
    }
}

impl LayoutSettings {
    /// Editor-produced values are clamped into sane ranges rather than
    /// rejected; the manifest stays renderable on the non-fatal path.
    pub fn clamped(self) -> Self {
        Self {
            panel_margin: self.panel_margin.clamp(0.0, 80.0),
            bubble_font_size: self.bubble_font_size.clamp(6.0, 64.0),
            bubble_padding: self.bubble_padding.clamp(0.0, 40.0),
            bubble_corner_radius: self.bubble_corner_radius.clamp(0.0, 40.0),
            bubble_gap: self.bubble_gap.clamp(0.0, 40.0),
            max_bubble_width_ratio: self.max_bubble_width_ratio.clamp(0.3, 0.95),
            avatar_size: self.avatar_size.clamp(0.0, 96.0),
            separator_font_size: self.separator_font_size.clamp(6.0, 32.0),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Meta {
    pub contact_name: String,
    pub time_label: String,
}

/// Immutable snapshot of every input needed to reproduce one render.
///
/// Interactive preview and export are both built from the same manifest value;
/// nothing the presentation surface needs lives outside of it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderManifest {
    pub canvas: CanvasSpec,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    pub layout: LayoutSettings,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub meta: Meta,
}

impl RenderManifest {
    pub fn validate(&self) -> ChatreelResult<()> {
        self.canvas.canvas().validate()?;
        Fps::new(self.canvas.fps.0)?;

        let mut seen = BTreeSet::new();
        for m in &self.messages {
            if !seen.insert(&m.id) {
                return Err(ChatreelError::validation(format!(
                    "duplicate message id '{}'",
                    m.id.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Derive a manifest identical except for its message list. Used by the
    /// export path to swap in speech-measured delays without touching any
    /// other input.
    pub fn with_messages(&self, messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> ChatreelResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChatreelError::validation(format!("serialize manifest: {e}")))
    }

    pub fn from_json(s: &str) -> ChatreelResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| ChatreelError::validation(format!("parse manifest JSON: {e}")))
    }

    pub fn from_json_reader(r: impl Read) -> ChatreelResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ChatreelError::validation(format!("parse manifest JSON: {e}")))
    }
}
