#[cfg(feature = "provider-roboflow")]
pub mod roboflow;
pub mod stub;

#[cfg(feature = "provider-roboflow")]
pub use roboflow::{RoboflowConfig, RoboflowProvider};
pub use stub::{StubProvider, StubResponse};
