use image::{Rgb, RgbImage, codecs::jpeg::JpegEncoder};

use crate::{
    core::Speaker,
    error::{ChatreelError, ChatreelResult},
    surface::SurfaceFrame,
};

pub const SENDER_BUBBLE_RGB: [u8; 3] = [10, 132, 255];
pub const RECEIVER_BUBBLE_RGB: [u8; 3] = [58, 58, 60];
pub const SEPARATOR_RGB: [u8; 3] = [142, 142, 147];
pub const TAPBACK_RGB: [u8; 3] = [255, 69, 58];

/// Frame capture boundary: rasterize one surface evaluation into lossy image
/// bytes. Called strictly sequentially by the capture loop; each call must be
/// fully completed before the clock advances.
pub trait FrameCapture {
    fn capture(&mut self, frame: &SurfaceFrame) -> ChatreelResult<Vec<u8>>;
}

/// CPU rasterizer: solid background, rounded bubble blocks, separator strip,
/// tapback badges. JPEG output.
pub struct RasterCapture {
    pub jpeg_quality: u8,
}

impl Default for RasterCapture {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl RasterCapture {
    pub fn rasterize(&self, frame: &SurfaceFrame) -> RgbImage {
        let mut img = RgbImage::from_pixel(frame.width, frame.height, Rgb(frame.background));

        // Separator strip, centered. Width tracks the label length so the
        // element scales with the manifest like everything else.
        let sep = &frame.separator;
        let sep_w = (sep.label.chars().count() as f64) * sep.font_size_px * 0.5;
        let sep_h = sep.font_size_px * 1.2;
        fill_rounded_rect(
            &mut img,
            sep.center_x_px - sep_w / 2.0,
            sep.y_px,
            sep_w,
            sep_h,
            sep_h / 2.0,
            SEPARATOR_RGB,
        );

        for b in &frame.bubbles {
            let color = match b.speaker {
                Speaker::Sender => SENDER_BUBBLE_RGB,
                Speaker::Receiver => RECEIVER_BUBBLE_RGB,
            };
            fill_rounded_rect(
                &mut img,
                b.x_px,
                b.y_px,
                b.width_px,
                b.height_px,
                b.corner_radius_px,
                color,
            );

            if b.tapback.is_some() {
                let r = b.font_size_px * 0.6;
                fill_circle(&mut img, b.x_px + b.width_px, b.y_px, r, TAPBACK_RGB);
            }
        }

        img
    }
}

impl FrameCapture for RasterCapture {
    fn capture(&mut self, frame: &SurfaceFrame) -> ChatreelResult<Vec<u8>> {
        let img = self.rasterize(frame);
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.jpeg_quality)
            .encode_image(&img)
            .map_err(|e| ChatreelError::capture(format!("jpeg encode: {e}")))?;
        if out.is_empty() {
            return Err(ChatreelError::capture("jpeg encoder produced no data"));
        }
        Ok(out)
    }
}

fn fill_rounded_rect(img: &mut RgbImage, x: f64, y: f64, w: f64, h: f64, r: f64, rgb: [u8; 3]) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    let (x0, y0, x1, y1) = (x, y, x + w, y + h);

    let px0 = x0.floor().max(0.0) as u32;
    let py0 = y0.floor().max(0.0) as u32;
    let px1 = (x1.ceil() as i64).clamp(0, i64::from(img.width())) as u32;
    let py1 = (y1.ceil() as i64).clamp(0, i64::from(img.height())) as u32;

    for py in py0..py1 {
        for px in px0..px1 {
            let cx = px as f64 + 0.5;
            let cy = py as f64 + 0.5;
            if cx < x0 || cx >= x1 || cy < y0 || cy >= y1 {
                continue;
            }
            // Corner rejection: outside the quarter-circle at each corner.
            let nearest_cx = cx.clamp(x0 + r, x1 - r);
            let nearest_cy = cy.clamp(y0 + r, y1 - r);
            let dx = cx - nearest_cx;
            let dy = cy - nearest_cy;
            if dx * dx + dy * dy > r * r {
                continue;
            }
            img.put_pixel(px, py, Rgb(rgb));
        }
    }
}

fn fill_circle(img: &mut RgbImage, cx: f64, cy: f64, r: f64, rgb: [u8; 3]) {
    if r <= 0.0 {
        return;
    }
    let px0 = (cx - r).floor().max(0.0) as u32;
    let py0 = (cy - r).floor().max(0.0) as u32;
    let px1 = ((cx + r).ceil() as i64).clamp(0, i64::from(img.width())) as u32;
    let py1 = ((cy + r).ceil() as i64).clamp(0, i64::from(img.height())) as u32;

    for py in py0..py1 {
        for px in px0..px1 {
            let dx = px as f64 + 0.5 - cx;
            let dy = py as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(px, py, Rgb(rgb));
            }
        }
    }
}
