mod backend;
mod backends;
mod result;

pub use backend::{InferenceProvider, ProviderError};
#[cfg(feature = "provider-roboflow")]
pub use backends::{RoboflowConfig, RoboflowProvider};
pub use backends::{StubProvider, StubResponse};
pub use result::{parse_predictions, ClassTally, Detection, DetectionSet};
