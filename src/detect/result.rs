use std::collections::BTreeMap;

use serde::Deserialize;

use super::backend::ProviderError;

/// One predicted object instance returned by the hosted model.
///
/// `(x, y)` is the box center; all four geometry fields are in source pixels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "class")]
    pub label: String,
    /// Fraction in `[0, 1]`.
    pub confidence: f64,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        center: (f64, f64),
        size: (f64, f64),
        confidence: f64,
    ) -> Self {
        Self {
            x: center.0,
            y: center.1,
            width: size.0,
            height: size.1,
            label: label.into(),
            confidence,
        }
    }

    /// Integer `(top_left, bottom_right)` corners of the box.
    ///
    /// Geometry is truncated to whole pixels first, then the half extents are
    /// floored, so a 41px wide box centered on 100 spans 80..=120.
    pub fn corners(&self) -> ((i64, i64), (i64, i64)) {
        let x = self.x as i64;
        let y = self.y as i64;
        let half_w = (self.width as i64).div_euclid(2);
        let half_h = (self.height as i64).div_euclid(2);
        (
            (x.saturating_sub(half_w), y.saturating_sub(half_h)),
            (x.saturating_add(half_w), y.saturating_add(half_h)),
        )
    }

    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }

    /// Label tag text, e.g. `Healthy: 95.60%`.
    pub fn caption(&self) -> String {
        format!("{}: {:.2}%", self.label, self.confidence_percent())
    }
}

/// Ordered detections from one inference call on one image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn tally(&self) -> ClassTally {
        let mut tally = ClassTally::default();
        for detection in &self.detections {
            tally.record(&detection.label);
        }
        tally
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

/// Per-class detection counts for a single image.
///
/// Iteration is ordered by label so printed tallies are stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassTally {
    counts: BTreeMap<String, usize>,
}

impl ClassTally {
    pub fn record(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Sum of all counts; equals the length of the tallied set.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

/// Body of a successful inference response.
///
/// Only `predictions` is read; timing and image metadata are ignored.
#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    predictions: Vec<Detection>,
}

/// Parse a provider response body into a detection set.
///
/// A record missing any of `x`, `y`, `width`, `height`, `class` or
/// `confidence` rejects the whole response.
pub fn parse_predictions(body: &[u8]) -> Result<DetectionSet, ProviderError> {
    let response: InferenceResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(DetectionSet::new(response.predictions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_floor_half_extents() {
        let det = Detection::new("Healthy", (100.0, 100.0), (40.0, 20.0), 0.956);
        assert_eq!(det.corners(), ((80, 90), (120, 110)));

        let odd = Detection::new("Healthy", (100.7, 50.2), (41.9, 9.0), 0.5);
        assert_eq!(odd.corners(), ((80, 46), (120, 54)));
    }

    #[test]
    fn caption_uses_two_decimal_percent() {
        let det = Detection::new("Healthy", (100.0, 100.0), (40.0, 20.0), 0.956);
        assert_eq!(det.caption(), "Healthy: 95.60%");

        let low = Detection::new("Gray Leaf Spot", (0.0, 0.0), (1.0, 1.0), 0.0712);
        assert_eq!(low.caption(), "Gray Leaf Spot: 7.12%");
    }

    #[test]
    fn tally_total_matches_set_length() {
        let set: DetectionSet = ["Healthy", "Gray Leaf Spot", "Healthy", "Rust", "Healthy"]
            .iter()
            .map(|label| Detection::new(*label, (10.0, 10.0), (4.0, 4.0), 0.9))
            .collect();

        let tally = set.tally();
        assert_eq!(tally.total(), set.len());
        assert_eq!(tally.get("Healthy"), 3);
        assert_eq!(tally.get("Gray Leaf Spot"), 1);
        assert_eq!(tally.get("Rust"), 1);
        assert_eq!(tally.get("Blight"), 0);
        assert_eq!(tally.len(), 3);
    }

    #[test]
    fn parses_provider_predictions() {
        let body = br#"{
            "time": 0.12,
            "image": {"width": 640, "height": 480},
            "predictions": [
                {"x": 320.5, "y": 240, "width": 64, "height": 32,
                 "class": "Gray Leaf Spot", "confidence": 0.81, "class_id": 0},
                {"x": 10, "y": 12, "width": 8, "height": 6,
                 "class": "Healthy", "confidence": 0.66}
            ]
        }"#;

        let set = parse_predictions(body).unwrap();
        assert_eq!(set.len(), 2);
        let first = set.iter().next().unwrap();
        assert_eq!(first.label, "Gray Leaf Spot");
        assert_eq!(first.x, 320.5);
        assert_eq!(first.corners(), ((288, 224), (352, 256)));
    }

    #[test]
    fn missing_predictions_field_is_empty_set() {
        let set = parse_predictions(br#"{"time": 0.05}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn record_missing_field_is_decode_error() {
        let body = br#"{"predictions": [{"x": 1, "y": 2, "width": 3, "class": "Healthy", "confidence": 0.5}]}"#;
        let err = parse_predictions(body).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
