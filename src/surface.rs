use crate::{
    core::{MessageId, Speaker},
    manifest::{RenderManifest, Tapback},
    schedule::{build_schedule, visible_count},
};

/// Pre-scale reference width all layout metrics are authored against. The
/// surface multiplies every metric by `canvas.width / REFERENCE_WIDTH`, so one
/// manifest drives a thumbnail preview and a full-resolution export with the
/// same relative proportions.
pub const REFERENCE_WIDTH: f64 = 390.0;

/// Window after a bubble's reveal time during which it grows to full height.
pub const GROWTH_MS: f64 = 240.0;

/// Discrete steps of the growth tween.
pub const GROWTH_STEPS: u32 = 8;

/// Deterministic visual description of the chat surface at one timeline time.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceFrame {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub separator: SeparatorView,
    pub bubbles: Vec<BubbleView>,
}

/// Time separator shown unconditionally above the first bubble.
#[derive(Clone, Debug, PartialEq)]
pub struct SeparatorView {
    pub label: String,
    pub font_size_px: f64,
    pub center_x_px: f64,
    pub y_px: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BubbleView {
    pub message_id: MessageId,
    pub speaker: Speaker,
    pub text: String,
    pub read_receipt: Option<String>,
    pub tapback: Option<Tapback>,
    pub x_px: f64,
    pub y_px: f64,
    pub width_px: f64,
    pub height_px: f64,
    pub corner_radius_px: f64,
    pub font_size_px: f64,
    pub padding_px: f64,
}

/// Finite height tween: `from` to `to` in `steps` discrete increments. Sampled
/// from timeline time, never from an independent timer, so the grow animation
/// stays identical between preview and export.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightTween {
    pub from_px: f64,
    pub to_px: f64,
    pub steps: u32,
}

impl HeightTween {
    /// Sample at `progress` in `[0, 1]`, quantized to the tween's step count.
    pub fn sample(self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        let steps = self.steps.max(1);
        let quantized = (p * f64::from(steps)).floor() / f64::from(steps);
        self.from_px + (self.to_px - self.from_px) * quantized.min(1.0)
    }
}

/// Evaluate the surface at `time_ms`.
///
/// Pure function of `(manifest, time)`: computes the reveal schedule, counts
/// visible messages, and lays out one bubble per visible message plus the
/// separator. An empty message list renders the separator only.
pub fn present(manifest: &RenderManifest, time_ms: f64) -> SurfaceFrame {
    let layout = manifest.layout.clamped();
    let width = f64::from(manifest.canvas.width);
    let scale = width / REFERENCE_WIDTH;

    let margin = layout.panel_margin * scale;
    let font = layout.bubble_font_size * scale;
    let padding = layout.bubble_padding * scale;
    let radius = layout.bubble_corner_radius * scale;
    let gap = layout.bubble_gap * scale;
    let avatar = layout.avatar_size * scale;
    let sep_font = layout.separator_font_size * scale;
    let max_bubble_w = width * layout.max_bubble_width_ratio;

    let separator = SeparatorView {
        label: manifest.meta.time_label.clone(),
        font_size_px: sep_font,
        center_x_px: width / 2.0,
        y_px: margin,
    };

    let schedule = build_schedule(&manifest.messages);
    let visible = visible_count(&schedule, time_ms);

    let mut bubbles = Vec::with_capacity(visible);
    let mut cursor_y = margin + sep_font * 1.4 + gap;

    for (i, m) in manifest.messages[..visible].iter().enumerate() {
        let (w, full_h) = bubble_extent(&m.text, font, padding, max_bubble_w);

        // Newest bubble grows in over GROWTH_MS after its reveal time.
        let h = if i + 1 == visible {
            let revealed_for = time_ms - schedule[i].reveal_at_ms as f64;
            let tween = HeightTween {
                from_px: 0.0,
                to_px: full_h,
                steps: GROWTH_STEPS,
            };
            tween.sample(revealed_for / GROWTH_MS)
        } else {
            full_h
        };

        let x = match m.speaker {
            Speaker::Sender => width - margin - w,
            Speaker::Receiver => margin + avatar + gap,
        };

        bubbles.push(BubbleView {
            message_id: m.id.clone(),
            speaker: m.speaker,
            text: m.text.clone(),
            read_receipt: m.read_receipt.clone(),
            tapback: m.tapback,
            x_px: x,
            y_px: cursor_y,
            width_px: w,
            height_px: h,
            corner_radius_px: radius.min(full_h / 2.0),
            font_size_px: font,
            padding_px: padding,
        });

        cursor_y += h + gap;
        if m.read_receipt.is_some() {
            cursor_y += font * 0.9;
        }
    }

    SurfaceFrame {
        width: manifest.canvas.width,
        height: manifest.canvas.height,
        background: manifest.background.rgb,
        separator,
        bubbles,
    }
}

/// Estimated bubble box for a text run. No font shaping here: a fixed average
/// advance keeps layout a pure arithmetic function of the manifest, which is
/// what the parity guarantee needs.
fn bubble_extent(text: &str, font: f64, padding: f64, max_bubble_w: f64) -> (f64, f64) {
    let char_w = font * 0.55;
    let line_h = font * 1.3;
    let max_text_w = (max_bubble_w - padding * 2.0).max(char_w);

    let chars = text.chars().count().max(1);
    let chars_per_line = (max_text_w / char_w).floor().max(1.0) as usize;
    let lines = chars.div_ceil(chars_per_line);

    let text_w = if lines > 1 {
        max_text_w
    } else {
        (chars as f64) * char_w
    };

    (
        text_w + padding * 2.0,
        (lines as f64) * line_h + padding * 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fps, MessageId, Speaker};
    use crate::manifest::{Background, CanvasSpec, LayoutSettings, Message, Meta, RenderManifest};

    fn msg(id: &str, speaker: Speaker, delay: Option<f64>) -> Message {
        Message {
            id: MessageId::new(id),
            speaker,
            text: "hello there".to_string(),
            delay_seconds: delay,
            read_receipt: None,
            tapback: None,
        }
    }

    fn manifest(width: u32, messages: Vec<Message>) -> RenderManifest {
        RenderManifest {
            canvas: CanvasSpec {
                width,
                height: width * 2,
                fps: Fps(30),
            },
            background: Background { rgb: [0, 0, 0] },
            layout: LayoutSettings::default(),
            messages,
            meta: Meta {
                contact_name: "Sam".to_string(),
                time_label: "Today 9:41 AM".to_string(),
            },
        }
    }

    #[test]
    fn empty_manifest_renders_separator_only() {
        let frame = present(&manifest(390, vec![]), 5_000.0);
        assert!(frame.bubbles.is_empty());
        assert_eq!(frame.separator.label, "Today 9:41 AM");
    }

    #[test]
    fn bubble_count_follows_schedule() {
        let m = manifest(
            390,
            vec![
                msg("a", Speaker::Sender, Some(2.0)),
                msg("b", Speaker::Receiver, Some(5.0)),
                msg("c", Speaker::Sender, None),
            ],
        );
        assert_eq!(present(&m, 0.0).bubbles.len(), 1);
        assert_eq!(present(&m, 2_500.0).bubbles.len(), 2);
        assert_eq!(present(&m, 6_999.0).bubbles.len(), 2);
        assert_eq!(present(&m, 7_000.0).bubbles.len(), 3);
    }

    #[test]
    fn layout_scales_uniformly_with_canvas_width() {
        let msgs = vec![msg("a", Speaker::Sender, Some(1.0))];
        let small = present(&manifest(390, msgs.clone()), 10_000.0);
        let big = present(&manifest(780, msgs), 10_000.0);

        let a = &small.bubbles[0];
        let b = &big.bubbles[0];
        assert!((b.font_size_px - a.font_size_px * 2.0).abs() < 1e-9);
        assert!((b.padding_px - a.padding_px * 2.0).abs() < 1e-9);
        assert!((b.width_px - a.width_px * 2.0).abs() < 1e-6);
        assert!((b.y_px - a.y_px * 2.0).abs() < 1e-9);
    }

    #[test]
    fn sender_right_aligned_receiver_left_aligned() {
        let m = manifest(
            390,
            vec![
                msg("a", Speaker::Sender, Some(0.0)),
                msg("b", Speaker::Receiver, Some(0.0)),
            ],
        );
        let frame = present(&m, 10_000.0);
        let sender = &frame.bubbles[0];
        let receiver = &frame.bubbles[1];
        assert!((sender.x_px + sender.width_px - (390.0 - 12.0)).abs() < 1e-6);
        assert!(receiver.x_px > 12.0); // offset past the avatar column
        assert!(receiver.x_px < sender.x_px);
    }

    #[test]
    fn newest_bubble_grows_then_settles() {
        let m = manifest(390, vec![msg("a", Speaker::Sender, Some(5.0))]);
        let at_reveal = present(&m, 0.0);
        let settled = present(&m, GROWTH_MS + 1.0);
        assert!(at_reveal.bubbles[0].height_px < settled.bubbles[0].height_px);

        // Settled height is stable afterwards.
        let later = present(&m, 4_000.0);
        assert_eq!(settled.bubbles[0].height_px, later.bubbles[0].height_px);
    }

    #[test]
    fn earlier_bubbles_are_always_full_height() {
        let m = manifest(
            390,
            vec![
                msg("a", Speaker::Sender, Some(1.0)),
                msg("b", Speaker::Receiver, Some(1.0)),
            ],
        );
        // Right at b's reveal, a must already be settled.
        let frame = present(&m, 1_000.0);
        let settled_a = present(&m, 10_000.0);
        assert_eq!(frame.bubbles[0].height_px, settled_a.bubbles[0].height_px);
    }

    #[test]
    fn present_is_pure() {
        let m = manifest(390, vec![msg("a", Speaker::Sender, None)]);
        assert_eq!(present(&m, 1_500.0), present(&m, 1_500.0));
    }

    #[test]
    fn tween_quantizes_to_steps() {
        let tw = HeightTween {
            from_px: 0.0,
            to_px: 80.0,
            steps: 4,
        };
        assert_eq!(tw.sample(0.0), 0.0);
        assert_eq!(tw.sample(0.24), 0.0);
        assert_eq!(tw.sample(0.25), 20.0);
        assert_eq!(tw.sample(0.9), 60.0);
        assert_eq!(tw.sample(1.0), 80.0);
        assert_eq!(tw.sample(7.0), 80.0);
    }
}
