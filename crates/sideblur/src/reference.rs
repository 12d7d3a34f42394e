//! CPU rendition of the two-pass effect.
//!
//! Follows the GPU path step for step: quad transform, clamp-to-edge bilinear
//! sampling at texel centres, the 49-tap disc blur and source-over blending
//! onto a cleared canvas. Used to check GPU output and to render without an
//! adapter.

use image::{Rgba, Rgba32FImage};

use crate::error::EffectError;
use crate::lifecycle::FrameState;
use crate::matrix::{self, Mat4};
use crate::types::{
    DrawMode, EngineState, FrameSize, BACKGROUND_SCALE, BLUR_DIRECTIONS, BLUR_QUALITY,
    BLUR_RADIUS_PX, BLUR_SAMPLE_COUNT,
};

type Color = [f32; 4];

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    std::array::from_fn(|i| lerp(a[i], b[i], t))
}

fn texel(image: &Rgba32FImage, x: i64, y: i64) -> Color {
    let x = x.clamp(0, i64::from(image.width()) - 1) as u32;
    let y = y.clamp(0, i64::from(image.height()) - 1) as u32;
    image.get_pixel(x, y).0
}

/// Linear filtering with clamp-to-edge addressing; `(u, v)` has a top-left origin.
pub fn sample_bilinear(image: &Rgba32FImage, u: f32, v: f32) -> Color {
    let x = u * image.width() as f32 - 0.5;
    let y = v * image.height() as f32 - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let top = lerp_color(texel(image, x0, y0), texel(image, x0 + 1, y0), fx);
    let bottom = lerp_color(texel(image, x0, y0 + 1), texel(image, x0 + 1, y0 + 1), fx);
    lerp_color(top, bottom, fy)
}

/// Disc blur around `(u, v)` with the radius normalised by `resolution`.
pub fn blur_at(image: &Rgba32FImage, u: f32, v: f32, resolution: FrameSize) -> Color {
    let [width, height] = resolution.as_vec2();
    let radius = (BLUR_RADIUS_PX / width, BLUR_RADIUS_PX / height);
    let mut sum = sample_bilinear(image, u, v);
    for d in 0..BLUR_DIRECTIONS {
        let angle = std::f32::consts::TAU * d as f32 / BLUR_DIRECTIONS as f32;
        let (sin, cos) = angle.sin_cos();
        for i in 1..=BLUR_QUALITY {
            let reach = i as f32 / BLUR_QUALITY as f32;
            let tap = sample_bilinear(
                image,
                u + cos * radius.0 * reach,
                v + sin * radius.1 * reach,
            );
            for (acc, value) in sum.iter_mut().zip(tap) {
                *acc += value;
            }
        }
    }
    sum.map(|channel| channel / BLUR_SAMPLE_COUNT as f32)
}

fn pass_matrix(mode: DrawMode) -> Mat4 {
    match mode {
        DrawMode::Background => matrix::scale(BACKGROUND_SCALE, BACKGROUND_SCALE, 1.0),
        DrawMode::Foreground => matrix::IDENTITY,
    }
}

/// Maps a canvas pixel centre back onto the transformed quad; `None` when the
/// quad does not cover it.
fn quad_texcoord(m: &Mat4, ndc_x: f32, ndc_y: f32) -> Option<(f32, f32)> {
    let corner = matrix::transform(m, [1.0, 1.0, 0.0, 1.0]);
    let (qx, qy) = (ndc_x / corner[0], ndc_y / corner[1]);
    if qx.abs() > 1.0 || qy.abs() > 1.0 {
        return None;
    }
    Some((qx * 0.5 + 0.5, 0.5 - qy * 0.5))
}

fn blend_source_over(dst: Color, src: Color) -> Color {
    let a = src[3];
    std::array::from_fn(|i| src[i] * a + dst[i] * (1.0 - a))
}

fn draw_pass(
    canvas: &mut Rgba32FImage,
    input: &Rgba32FImage,
    mode: DrawMode,
    resolution: FrameSize,
) {
    let m = pass_matrix(mode);
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    for (px, py, pixel) in canvas.enumerate_pixels_mut() {
        let ndc_x = (px as f32 + 0.5) / width * 2.0 - 1.0;
        let ndc_y = 1.0 - (py as f32 + 0.5) / height * 2.0;
        let Some((u, v)) = quad_texcoord(&m, ndc_x, ndc_y) else {
            continue;
        };
        let src = match mode {
            DrawMode::Background => blur_at(input, u, v, resolution),
            DrawMode::Foreground => sample_bilinear(input, u, v),
        };
        *pixel = Rgba(blend_source_over(pixel.0, src));
    }
}

/// Renders both passes of one frame into a fresh canvas the size of `input`.
pub fn render(input: &Rgba32FImage, resolution: FrameSize, clear: Option<Color>) -> Rgba32FImage {
    let fill = clear.unwrap_or([0.0; 4]);
    let mut canvas = Rgba32FImage::from_pixel(input.width(), input.height(), Rgba(fill));
    draw_pass(&mut canvas, input, DrawMode::Background, resolution);
    draw_pass(&mut canvas, input, DrawMode::Foreground, resolution);
    canvas
}

/// CPU engine with the same configure/draw contract as the GPU one.
#[derive(Debug, Clone, Default)]
pub struct ReferenceEngine {
    frame: FrameState,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, input_width: i32, input_height: i32) -> Result<FrameSize, EffectError> {
        Ok(self.frame.configure(input_width, input_height)?.size)
    }

    pub fn draw_frame(
        &mut self,
        input: &Rgba32FImage,
        _presentation_time_us: i64,
    ) -> Result<Rgba32FImage, EffectError> {
        let size = self.frame.begin_frame()?;
        let output = render(input, size, None);
        self.frame.finish_frame();
        Ok(output)
    }

    pub fn release(&mut self) {
        self.frame.release();
    }

    pub fn state(&self) -> EngineState {
        self.frame.state()
    }
}
