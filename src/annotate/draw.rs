use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

/// Rectangle spanning both corners inclusively, in either order.
///
/// Corners are pulled in to one pixel outside the canvas first. Edges beyond
/// the canvas stay beyond it, so the visible pixels are unchanged while the
/// rectangle stays small enough for `imageproc`'s `i32` arithmetic.
fn rect_between(img: &RgbImage, a: (i64, i64), b: (i64, i64)) -> Option<Rect> {
    let clamp_x = |v: i64| v.clamp(-1, i64::from(img.width()));
    let clamp_y = |v: i64| v.clamp(-1, i64::from(img.height()));
    let (x0, x1) = (clamp_x(a.0.min(b.0)), clamp_x(a.0.max(b.0)));
    let (y0, y1) = (clamp_y(a.1.min(b.1)), clamp_y(a.1.max(b.1)));
    let left = i32::try_from(x0).ok()?;
    let top = i32::try_from(y0).ok()?;
    let width = u32::try_from(x1 - x0 + 1).ok()?;
    let height = u32::try_from(y1 - y0 + 1).ok()?;
    Some(Rect::at(left, top).of_size(width, height))
}

/// Draws a rectangle outline inplace.
///
/// Lines of `thickness` pixels straddle the nominal edge: a 4px outline covers
/// two pixels inside the box, the edge itself and one pixel outside. Anything
/// off the canvas is clipped.
pub fn draw_rect_outline(
    img: &mut RgbImage,
    top_left: (i64, i64),
    bottom_right: (i64, i64),
    color: Rgb<u8>,
    thickness: u32,
) {
    let t = i64::from(thickness.max(1));
    let first = -(t / 2);
    for grow in first..first + t {
        let outer_tl = (top_left.0.saturating_sub(grow), top_left.1.saturating_sub(grow));
        let outer_br = (
            bottom_right.0.saturating_add(grow),
            bottom_right.1.saturating_add(grow),
        );
        if let Some(rect) = rect_between(img, outer_tl, outer_br) {
            draw_hollow_rect_mut(img, rect, color);
        }
    }
}

/// Fills the rectangle between two inclusive corners inplace, clipped to the canvas.
pub fn draw_filled_rect(
    img: &mut RgbImage,
    top_left: (i64, i64),
    bottom_right: (i64, i64),
    color: Rgb<u8>,
) {
    if let Some(rect) = rect_between(img, top_left, bottom_right) {
        draw_filled_rect_mut(img, rect, color);
    }
}

/// Sets one pixel, ignoring coordinates outside the canvas.
#[inline]
pub(crate) fn put_pixel_clipped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}
