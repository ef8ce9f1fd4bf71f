use image::Rgb;

/// Disease classes the corn models are trained on.
///
/// Anything the model reports outside this set maps to `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafClass {
    GrayLeafSpot,
    Healthy,
    Other,
}

impl LeafClass {
    /// Exact, case-sensitive match on the label the model reports.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Gray Leaf Spot" => LeafClass::GrayLeafSpot,
            "Healthy" => LeafClass::Healthy,
            _ => LeafClass::Other,
        }
    }
}

/// Box and label-tag colour per class, with a fallback for unknown labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorPolicy {
    pub gray_leaf_spot: Rgb<u8>,
    pub healthy: Rgb<u8>,
    pub fallback: Rgb<u8>,
}

impl ColorPolicy {
    pub fn color_for(&self, label: &str) -> Rgb<u8> {
        self.color_for_class(LeafClass::from_label(label))
    }

    pub fn color_for_class(&self, class: LeafClass) -> Rgb<u8> {
        match class {
            LeafClass::GrayLeafSpot => self.gray_leaf_spot,
            LeafClass::Healthy => self.healthy,
            LeafClass::Other => self.fallback,
        }
    }
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            gray_leaf_spot: Rgb([255, 0, 0]),
            healthy: Rgb([0, 255, 0]),
            fallback: Rgb([255, 255, 0]),
        }
    }
}
