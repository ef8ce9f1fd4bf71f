//! Detection overlay.
//!
//! The `Annotator` copies a decoded image and draws, for every detection in
//! arrival order, a box outline and a filled label tag carrying
//! `"<label>: <confidence>%"`. The source raster is returned untouched next to
//! the annotated copy so both can be shown side by side.
//!
//! Coordinates are never validated: boxes and tags that fall partly or fully
//! outside the canvas are clipped. Tags of nearby detections may overlap.

mod color;
mod draw;
mod text;

use image::{Rgb, RgbImage};

use crate::detect::{ClassTally, Detection, DetectionSet};

pub use color::{ColorPolicy, LeafClass};
pub use draw::{draw_filled_rect, draw_rect_outline};
pub use text::{draw_text, TextStyle, Typeface};

/// Gap between a box's top edge and the label baseline.
pub const LABEL_OFFSET_PX: i64 = 10;
/// Padding around the label text inside its tag.
pub const LABEL_PADDING_PX: i64 = 5;

pub const DEFAULT_BOX_THICKNESS: u32 = 4;
pub const DEFAULT_TEXT_THICKNESS: u32 = 2;

/// Per-profile rendering knobs.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub font_scale: f32,
    pub typeface: Typeface,
    pub box_thickness: u32,
    pub text_thickness: u32,
    pub text_color: Rgb<u8>,
}

impl RenderConfig {
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            typeface: self.typeface,
            scale: self.font_scale,
            thickness: self.text_thickness,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_scale: 1.0,
            typeface: Typeface::Plain,
            box_thickness: DEFAULT_BOX_THICKNESS,
            text_thickness: DEFAULT_TEXT_THICKNESS,
            text_color: Rgb([0, 0, 0]),
        }
    }
}

/// Output of one annotation pass.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub original: RgbImage,
    pub annotated: RgbImage,
    pub tally: ClassTally,
}

#[derive(Clone, Debug, Default)]
pub struct Annotator {
    render: RenderConfig,
    colors: ColorPolicy,
}

impl Annotator {
    pub fn new(render: RenderConfig, colors: ColorPolicy) -> Self {
        Self { render, colors }
    }

    pub fn render(&self) -> &RenderConfig {
        &self.render
    }

    /// Annotate a copy of `source`.
    ///
    /// Deterministic: the same image and detections always give the same
    /// bytes and tally. An empty set leaves the copy identical to `source`.
    pub fn annotate(&self, source: RgbImage, detections: &DetectionSet) -> Annotation {
        let mut annotated = source.clone();
        let mut tally = ClassTally::default();
        for detection in detections {
            tally.record(&detection.label);
            self.draw_detection(&mut annotated, detection);
        }
        Annotation {
            original: source,
            annotated,
            tally,
        }
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let color = self.colors.color_for(&detection.label);
        let (top_left, bottom_right) = detection.corners();
        draw_rect_outline(
            canvas,
            top_left,
            bottom_right,
            color,
            self.render.box_thickness,
        );

        let caption = detection.caption();
        let style = self.render.text_style();
        let (text_w, text_h) = style.measure(&caption);
        let anchor = (top_left.0, top_left.1.saturating_sub(LABEL_OFFSET_PX));

        // Tag first so the text stays readable over any background.
        draw_filled_rect(
            canvas,
            (
                anchor.0,
                anchor
                    .1
                    .saturating_sub(i64::from(text_h) + LABEL_PADDING_PX),
            ),
            (
                anchor.0.saturating_add(i64::from(text_w) + LABEL_PADDING_PX),
                anchor.1.saturating_add(LABEL_PADDING_PX),
            ),
            color,
        );
        draw_text(canvas, &caption, anchor, self.render.text_color, &style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

    fn annotator() -> Annotator {
        Annotator::new(
            RenderConfig {
                font_scale: 0.5,
                typeface: Typeface::Italic,
                ..RenderConfig::default()
            },
            ColorPolicy::default(),
        )
    }

    fn canvas() -> RgbImage {
        RgbImage::from_pixel(320, 200, PAPER)
    }

    fn healthy() -> Detection {
        Detection::new("Healthy", (100.0, 100.0), (40.0, 20.0), 0.956)
    }

    #[test]
    fn healthy_box_lands_on_expected_corners() {
        let det = healthy();
        assert_eq!(det.caption(), "Healthy: 95.60%");

        let out = annotator().annotate(canvas(), &DetectionSet::new(vec![det]));
        let green = Rgb([0, 255, 0]);
        assert_eq!(*out.annotated.get_pixel(80, 90), green);
        assert_eq!(*out.annotated.get_pixel(120, 110), green);
        assert_eq!(*out.annotated.get_pixel(120, 90), green);
        assert_eq!(*out.annotated.get_pixel(80, 110), green);
        // 4px line: two pixels inside, one outside.
        assert_eq!(*out.annotated.get_pixel(82, 100), green);
        assert_eq!(*out.annotated.get_pixel(79, 100), green);
        assert_eq!(*out.annotated.get_pixel(83, 100), PAPER);
        assert_eq!(*out.annotated.get_pixel(78, 100), PAPER);
        assert_eq!(*out.annotated.get_pixel(100, 100), PAPER);
        assert_eq!(out.tally.get("Healthy"), 1);
    }

    #[test]
    fn label_tag_sits_above_box() {
        let out = annotator().annotate(canvas(), &DetectionSet::new(vec![healthy()]));
        let green = Rgb([0, 255, 0]);
        // Baseline at y=80; the tag reaches 5px below it and is free of text there.
        assert_eq!(*out.annotated.get_pixel(81, 84), green);
        assert_eq!(*out.annotated.get_pixel(81, 86), PAPER);

        let style = annotator().render().text_style();
        let (w, h) = style.measure("Healthy: 95.60%");
        let right = 80 + w + 5;
        let top = 80 - h - 5;
        assert_eq!(*out.annotated.get_pixel(right, 84), green);
        assert_eq!(*out.annotated.get_pixel(right + 1, 84), PAPER);
        assert_eq!(*out.annotated.get_pixel(81, top), green);
        assert_eq!(*out.annotated.get_pixel(81, top - 1), PAPER);

        let black = out
            .annotated
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == Rgb([0, 0, 0]))
            .count();
        assert!(black > 0, "caption text missing");
    }

    #[test]
    fn unknown_label_uses_fallback_color() {
        let det = Detection::new("Northern Leaf Blight", (60.0, 120.0), (30.0, 30.0), 0.4);
        let policy = ColorPolicy::default();
        let out = annotator().annotate(canvas(), &DetectionSet::new(vec![det]));
        assert_eq!(*out.annotated.get_pixel(45, 105), policy.fallback);
        assert_eq!(*out.annotated.get_pixel(75, 135), policy.fallback);
    }

    #[test]
    fn empty_set_leaves_copy_identical() {
        let mut source = canvas();
        source.put_pixel(3, 4, Rgb([1, 2, 3]));
        let out = annotator().annotate(source.clone(), &DetectionSet::default());
        assert_eq!(out.annotated, source);
        assert_eq!(out.original, source);
        assert!(out.tally.is_empty());
    }

    #[test]
    fn original_is_untouched_and_dimensions_kept() {
        let source = RgbImage::from_pixel(64, 48, PAPER);
        let set = DetectionSet::new(vec![
            Detection::new("Healthy", (10.0, 10.0), (12.0, 12.0), 0.9),
            Detection::new("Gray Leaf Spot", (-40.0, 500.0), (30.0, 30.0), 0.8),
            Detection::new("Gray Leaf Spot", (63.0, 47.0), (400.0, 400.0), 0.7),
            Detection::new("Healthy", (1e12, -1e12), (5.0, 5.0), 0.6),
        ]);
        let out = annotator().annotate(source.clone(), &set);
        assert_eq!(out.original, source);
        assert_eq!(out.annotated.dimensions(), source.dimensions());
        assert_ne!(out.annotated, source);
        assert_eq!(out.tally.total(), set.len());
        assert_eq!(out.tally.get("Gray Leaf Spot"), 2);
    }

    #[test]
    fn annotation_is_deterministic() {
        let set = DetectionSet::new(vec![
            healthy(),
            Detection::new("Gray Leaf Spot", (110.0, 95.0), (50.0, 60.0), 0.5123),
            Detection::new("Rust", (20.0, 180.0), (16.0, 16.0), 0.99),
        ]);
        let a = annotator().annotate(canvas(), &set);
        let b = annotator().annotate(canvas(), &set);
        assert_eq!(a.annotated.as_raw(), b.annotated.as_raw());
        assert_eq!(a.tally, b.tally);
    }

    #[test]
    fn later_detections_draw_over_earlier_ones() {
        let first = Detection::new("Healthy", (50.0, 50.0), (20.0, 20.0), 0.9);
        let second = Detection::new("Gray Leaf Spot", (50.0, 50.0), (20.0, 20.0), 0.9);
        let out = annotator().annotate(canvas(), &DetectionSet::new(vec![first, second]));
        assert_eq!(*out.annotated.get_pixel(40, 40), Rgb([255, 0, 0]));
    }
}
