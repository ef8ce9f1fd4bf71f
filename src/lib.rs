//! Corn Sight
//!
//! Sends photos of corn leaves to a hosted object-detection model and draws
//! the returned predictions back onto a copy of each photo.
//!
//! # Pipeline
//!
//! For every image, independently:
//!
//! 1. Decode the upload to an RGB raster (`frame`).
//! 2. POST the encoded bytes to the model endpoint (`detect`).
//! 3. Draw a box and a `"<label>: <confidence>%"` tag per detection on a
//!    copy of the raster and count detections per class (`annotate`).
//!
//! A failure in any step fails that image only (`pipeline`).
//!
//! # Module Structure
//!
//! - `annotate`: Annotator, colour policy, box and text drawing
//! - `detect`: Detection data model, provider trait, hosted and stub providers
//! - `frame`: Uploaded images and decoding
//! - `pipeline`: Per-image batch runner
//! - `config`: Deployment profiles from defaults, config file and environment
//! - `ui`, `cli`: Terminal front-end for the `cornsight` binary

pub mod annotate;
pub mod cli;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;
pub mod ui;

pub use annotate::{Annotation, Annotator, ColorPolicy, RenderConfig, Typeface};
pub use config::{AppConfig, ModelMetric, Profile, ProfileKind};
#[cfg(feature = "provider-roboflow")]
pub use detect::{RoboflowConfig, RoboflowProvider};
pub use detect::{
    parse_predictions, ClassTally, Detection, DetectionSet, InferenceProvider, ProviderError,
    StubProvider, StubResponse,
};
pub use frame::UploadedImage;
pub use pipeline::{process_image, run_batch, ImageOutcome, ImageReport};
