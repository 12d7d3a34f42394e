//! Scale-to-fit aspect ratio presentation applied before the effect.
//!
//! The canvas grows along one axis until it has the requested aspect ratio;
//! the frame keeps its pixel size, sits in the middle, and the bars around it
//! stay transparent so the effect can fill them.

use std::fmt;

use image::{imageops, Rgba, RgbaImage};

/// Requested output aspect ratio, written `W:H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        let (w, h) = trimmed
            .split_once([':', '/'])
            .ok_or_else(|| format!("invalid aspect ratio '{trimmed}'; expected W:H (e.g. 9:16)"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid aspect width '{}'", w.trim()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid aspect height '{}'", h.trim()))?;
        if width == 0 || height == 0 {
            return Err("aspect ratio terms must be greater than zero".into());
        }
        Ok(Self { width, height })
    }

    pub fn ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Canvas dimensions for an input frame letterboxed to `aspect`.
pub fn canvas_size(width: u32, height: u32, aspect: AspectRatio) -> (u32, u32) {
    let requested = aspect.ratio();
    let input = f64::from(width) / f64::from(height);
    if requested > input {
        let canvas_width = (f64::from(height) * requested).round() as u32;
        (canvas_width.max(width), height)
    } else {
        let canvas_height = (f64::from(width) / requested).round() as u32;
        (width, canvas_height.max(height))
    }
}

/// Centres `frame` on a transparent canvas of the requested aspect ratio.
pub fn letterbox(frame: &RgbaImage, aspect: AspectRatio) -> RgbaImage {
    let (width, height) = canvas_size(frame.width(), frame.height(), aspect);
    if (width, height) == frame.dimensions() {
        return frame.clone();
    }
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let x = i64::from((width - frame.width()) / 2);
    let y = i64::from((height - frame.height()) / 2);
    imageops::replace(&mut canvas, frame, x, y);
    canvas
}
