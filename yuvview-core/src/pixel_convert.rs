// PIXEL CONVERT - YUV 4:2:0 to RGB24
//
// Full-range BT.601 style transform with nearest-neighbour chroma
// upsampling (each chroma sample covers a 2x2 block of pixels).
//
// Luma is used as-is: there is no "Y - 16" black-level shift and no
// 255/219 scaling. Frame dumps viewed with this tool have always been
// displayed that way, so the output must stay bit-for-bit identical.

use std::sync::OnceLock;

use crate::frame::{RgbFrame, YuvFrame};

// ============================================================================
// Coefficients
// ============================================================================

pub const CR_TO_R: f32 = 1.402;
pub const CB_TO_G: f32 = 0.344136;
pub const CR_TO_G: f32 = 0.714136;
pub const CB_TO_B: f32 = 1.772;

/// Clamp to the displayable range first, then round to the nearest integer.
#[inline]
fn to_component(value: f32) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

/// Convert a single sample triple.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as f32;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;

    [
        to_component(c + CR_TO_R * e),
        to_component(c - CB_TO_G * d - CR_TO_G * e),
        to_component(c + CB_TO_B * d),
    ]
}

// ============================================================================
// Converter
// ============================================================================

pub struct ColorConverter {
    // Pre-computed chroma contributions, indexed by raw sample value
    v_table_r: [f32; 256],
    u_table_g: [f32; 256],
    v_table_g: [f32; 256],
    u_table_b: [f32; 256],
}

impl ColorConverter {
    pub fn new() -> Self {
        let mut converter = Self {
            v_table_r: [0.0; 256],
            u_table_g: [0.0; 256],
            v_table_g: [0.0; 256],
            u_table_b: [0.0; 256],
        };
        converter.build_tables();
        converter
    }

    fn build_tables(&mut self) {
        for i in 0..256 {
            let uv = i as f32 - 128.0;
            self.v_table_r[i] = CR_TO_R * uv;
            self.u_table_g[i] = CB_TO_G * uv;
            self.v_table_g[i] = CR_TO_G * uv;
            self.u_table_b[i] = CB_TO_B * uv;
        }
    }

    /// Shared instance; the tables never change.
    pub fn shared() -> &'static ColorConverter {
        static CONVERTER: OnceLock<ColorConverter> = OnceLock::new();
        CONVERTER.get_or_init(ColorConverter::new)
    }

    /// Convert a frame. Output has the same width and height as the input.
    pub fn convert(&self, src: &YuvFrame) -> RgbFrame {
        let width = src.width;
        let height = src.height;
        let uv_width = src.chroma_width();

        assert_eq!(src.luma.len(), width * height, "luma plane size");
        assert_eq!(
            src.chroma_u.len(),
            uv_width * src.chroma_height(),
            "U plane size"
        );
        assert_eq!(src.chroma_v.len(), src.chroma_u.len(), "V plane size");

        let mut dst = RgbFrame::new(width, height);
        let rgb = &mut dst.data;

        for y in 0..height {
            let y_row = y * width;
            let uv_row = (y / 2) * uv_width;
            let dst_row = y * width * 3;

            for x in 0..width {
                let c = src.luma[y_row + x] as f32;
                let uv_x = uv_row + x / 2;
                let u_val = src.chroma_u[uv_x] as usize;
                let v_val = src.chroma_v[uv_x] as usize;

                let dst_idx = dst_row + x * 3;
                rgb[dst_idx] = to_component(c + self.v_table_r[v_val]);
                rgb[dst_idx + 1] =
                    to_component(c - self.u_table_g[u_val] - self.v_table_g[v_val]);
                rgb[dst_idx + 2] = to_component(c + self.u_table_b[u_val]);
            }
        }

        dst
    }
}

impl Default for ColorConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a decoded frame to RGB24.
pub fn to_rgb(frame: &YuvFrame) -> RgbFrame {
    ColorConverter::shared().convert(frame)
}
