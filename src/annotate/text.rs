//! Bitmap text for label tags.
//!
//! Glyphs come from the 8x8 public-domain font in `font8x8`, scaled
//! nearest-neighbour into square cells. No font files are loaded at runtime,
//! so rendering is identical on every machine.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use serde::Deserialize;

use super::draw::put_pixel_clipped;

const GLYPH_BITS: i64 = 8;
/// Cell edge in pixels at `scale == 1.0`.
const BASE_CELL_PX: f32 = 16.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Typeface {
    #[default]
    Plain,
    /// Rows are sheared right towards the top of the cell.
    Italic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub typeface: Typeface,
    pub scale: f32,
    /// Stroke width in pixels; every lit glyph pixel is stamped this wide.
    pub thickness: u32,
}

impl TextStyle {
    fn cell(&self) -> i64 {
        ((BASE_CELL_PX * self.scale).round() as i64).max(1)
    }

    fn stamp(&self) -> i64 {
        i64::from(self.thickness.max(1))
    }

    fn slant(&self) -> i64 {
        match self.typeface {
            Typeface::Plain => 0,
            Typeface::Italic => self.cell() / 4,
        }
    }

    /// Pixel footprint `(width, height)` of `text`, excluding any padding.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        let chars = text.chars().count() as i64;
        let extra = self.stamp() - 1;
        let width = chars
            .saturating_mul(self.cell())
            .saturating_add(extra)
            .saturating_add(self.slant());
        let height = self.cell().saturating_add(extra);
        (
            u32::try_from(width).unwrap_or(u32::MAX),
            u32::try_from(height).unwrap_or(u32::MAX),
        )
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Draws `text` with its bottom-left corner at `origin`.
///
/// The glyphs fill exactly the footprint reported by [`TextStyle::measure`]:
/// columns `origin.0 ..` and rows `.. origin.1` (exclusive). Pixels off the
/// canvas are dropped.
pub fn draw_text(
    img: &mut RgbImage,
    text: &str,
    origin: (i64, i64),
    color: Rgb<u8>,
    style: &TextStyle,
) {
    let cell = style.cell();
    let stamp = style.stamp();
    let (_, height) = style.measure(text);
    let top = origin.1.saturating_sub(i64::from(height));
    let italic = style.typeface == Typeface::Italic;

    for (index, c) in text.chars().enumerate() {
        let bits = glyph(c);
        let cell_left = origin.0.saturating_add((index as i64).saturating_mul(cell));
        for gy in 0..cell {
            let row = bits[(gy * GLYPH_BITS / cell) as usize];
            if row == 0 {
                continue;
            }
            let shift = if italic { (cell - 1 - gy) / 4 } else { 0 };
            for gx in 0..cell {
                let bit = gx * GLYPH_BITS / cell;
                if row & (1 << bit) == 0 {
                    continue;
                }
                let px = cell_left.saturating_add(gx + shift);
                let py = top.saturating_add(gy);
                for dy in 0..stamp {
                    for dx in 0..stamp {
                        put_pixel_clipped(img, px.saturating_add(dx), py.saturating_add(dy), color);
                    }
                }
            }
        }
    }
}
