use thiserror::Error;

use crate::frame::UploadedImage;

use super::result::DetectionSet;

/// Failure of a single inference call.
///
/// Every variant is scoped to one image; callers report it and move on to the
/// next image. No partial detections are ever returned alongside an error.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The endpoint answered with anything other than HTTP 200.
    #[error("inference endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("inference request failed: {0}")]
    Transport(String),

    /// HTTP 200 with a body that does not match the prediction contract.
    #[error("invalid inference response: {0}")]
    Decode(String),

    /// The provider cannot be used as configured (missing key, bad URL).
    #[error("inference provider misconfigured: {0}")]
    Config(String),
}

/// Inference provider trait.
///
/// A provider turns one uploaded image into the ordered detections reported
/// by some model. Providers are called sequentially, once per image, and must
/// not carry detections over from one call to the next.
pub trait InferenceProvider: Send {
    /// Provider identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Run inference on the encoded image bytes.
    fn infer(&mut self, image: &UploadedImage) -> Result<DetectionSet, ProviderError>;
}
