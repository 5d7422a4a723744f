//! Resampling filter kernels.
//!
//! Kernels form a closed set resolved from [`SamplerKind`] when mappings
//! are built, so unknown filter names cannot reach the composition loop.

use retex_spec::SamplerKind;

use crate::buffer::TextureBuffer;
use crate::color::Color;

/// A resolved resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    /// Point sampling; byte-exact for same-size copies.
    #[default]
    Nearest,
    /// Bilinear, texel centers aligned.
    Bilinear,
    /// Catmull-Rom bicubic.
    Bicubic,
}

impl From<SamplerKind> for FilterKind {
    fn from(kind: SamplerKind) -> Self {
        match kind {
            SamplerKind::Nearest => FilterKind::Nearest,
            SamplerKind::Bilinear => FilterKind::Bilinear,
            SamplerKind::Bicubic => FilterKind::Bicubic,
        }
    }
}

impl FilterKind {
    /// Sample a buffer at normalized coordinates. Coordinates wrap, so
    /// tiled textures filter cleanly across their edges.
    pub fn sample(&self, buffer: &TextureBuffer, u: f32, v: f32) -> Color {
        match self {
            FilterKind::Nearest => {
                let x = (u * buffer.width as f32).floor() as i32;
                let y = (v * buffer.height as f32).floor() as i32;
                buffer.get_wrapped(x, y)
            }
            FilterKind::Bilinear => {
                let fx = u * buffer.width as f32 - 0.5;
                let fy = v * buffer.height as f32 - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let x0 = x0 as i32;
                let y0 = y0 as i32;

                let c00 = buffer.get_wrapped(x0, y0);
                let c10 = buffer.get_wrapped(x0 + 1, y0);
                let c01 = buffer.get_wrapped(x0, y0 + 1);
                let c11 = buffer.get_wrapped(x0 + 1, y0 + 1);

                let top = c00.lerp(&c10, tx);
                let bottom = c01.lerp(&c11, tx);
                top.lerp(&bottom, ty)
            }
            FilterKind::Bicubic => {
                let fx = u * buffer.width as f32 - 0.5;
                let fy = v * buffer.height as f32 - 0.5;
                let x0 = fx.floor() as i32;
                let y0 = fy.floor() as i32;
                let tx = fx - fx.floor();
                let ty = fy - fy.floor();

                let mut channels = [0.0f32; 4];
                let wx = [
                    catmull_rom(tx + 1.0),
                    catmull_rom(tx),
                    catmull_rom(1.0 - tx),
                    catmull_rom(2.0 - tx),
                ];
                let wy = [
                    catmull_rom(ty + 1.0),
                    catmull_rom(ty),
                    catmull_rom(1.0 - ty),
                    catmull_rom(2.0 - ty),
                ];
                for (j, wyj) in wy.iter().enumerate() {
                    for (i, wxi) in wx.iter().enumerate() {
                        let c = buffer.get_wrapped(x0 - 1 + i as i32, y0 - 1 + j as i32);
                        let w = wxi * wyj;
                        channels[0] += c.r * w;
                        channels[1] += c.g * w;
                        channels[2] += c.b * w;
                        channels[3] += c.a * w;
                    }
                }
                Color::rgba(
                    channels[0].clamp(0.0, 1.0),
                    channels[1].clamp(0.0, 1.0),
                    channels[2].clamp(0.0, 1.0),
                    channels[3].clamp(0.0, 1.0),
                )
            }
        }
    }
}

/// Catmull-Rom kernel weight for |t| in [0, 2).
fn catmull_rom(t: f32) -> f32 {
    let t = t.abs();
    if t < 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}
