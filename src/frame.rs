//! Uploaded images.
//!
//! An `UploadedImage` is the encoded file exactly as the user supplied it.
//! The encoded bytes go to the inference provider untouched; the decoded RGB
//! raster is what the annotator draws on.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

/// Encoded image plus the name it is reported under.
#[derive(Clone, Debug)]
pub struct UploadedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an image file from disk, named after its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    /// File name without its extension, used to name derived outputs.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Decode to a 3-channel RGB raster.
    ///
    /// Alpha and grayscale inputs are converted; empty rasters are rejected.
    pub fn decode(&self) -> Result<RgbImage> {
        let decoded = image::load_from_memory(&self.bytes)
            .with_context(|| format!("failed to decode image {}", self.name))?;
        let rgb = decoded.into_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(anyhow!("image {} has no pixels", self.name));
        }
        Ok(rgb)
    }
}
