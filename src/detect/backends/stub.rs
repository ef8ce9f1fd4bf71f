use std::collections::HashMap;

use crate::detect::backend::{InferenceProvider, ProviderError};
use crate::detect::result::DetectionSet;
use crate::frame::UploadedImage;

/// Canned answer served by [`StubProvider`].
#[derive(Clone, Debug)]
pub enum StubResponse {
    Detections(DetectionSet),
    /// Simulate the endpoint answering with a non-200 status.
    Status(u16),
}

/// Stub provider for tests and replaying saved responses offline.
///
/// Responses are keyed by image name; images without an entry get the
/// fallback response (an empty detection set unless overridden).
pub struct StubProvider {
    responses: HashMap<String, StubResponse>,
    fallback: StubResponse,
    calls: Vec<String>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: StubResponse::Detections(DetectionSet::default()),
            calls: Vec::new(),
        }
    }

    /// Serve `response` for every image without a dedicated entry.
    pub fn with_fallback(mut self, response: StubResponse) -> Self {
        self.fallback = response;
        self
    }

    /// Serve `response` for the image called `name`.
    pub fn respond(mut self, name: impl Into<String>, response: StubResponse) -> Self {
        self.responses.insert(name.into(), response);
        self
    }

    /// Image names seen so far, in call order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, image: &UploadedImage) -> Result<DetectionSet, ProviderError> {
        self.calls.push(image.name.clone());
        let response = self.responses.get(&image.name).unwrap_or(&self.fallback);
        match response {
            StubResponse::Detections(set) => Ok(set.clone()),
            StubResponse::Status(status) => Err(ProviderError::Status { status: *status }),
        }
    }
}
