//! Per-image detection pipeline.
//!
//! Every image runs decode -> inference -> annotation on its own. A failure
//! in any step is recorded for that image only and the batch moves on; tallies
//! are never merged across images. Reports come back in input order.

use anyhow::{Context, Result};

use crate::annotate::{Annotation, Annotator};
use crate::detect::InferenceProvider;
use crate::frame::UploadedImage;

#[derive(Debug)]
pub enum ImageOutcome {
    Annotated(Box<Annotation>),
    Failed { reason: String },
}

#[derive(Debug)]
pub struct ImageReport {
    pub name: String,
    pub outcome: ImageOutcome,
}

impl ImageReport {
    pub fn failed(name: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            name: name.into(),
            outcome: ImageOutcome::Failed {
                reason: format!("{:#}", err),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ImageOutcome::Annotated(_))
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        match &self.outcome {
            ImageOutcome::Annotated(annotation) => Some(annotation.as_ref()),
            ImageOutcome::Failed { .. } => None,
        }
    }
}

/// Run a batch sequentially, one inference call per image.
pub fn run_batch<P>(
    provider: &mut P,
    annotator: &Annotator,
    images: &[UploadedImage],
) -> Vec<ImageReport>
where
    P: InferenceProvider + ?Sized,
{
    let reports: Vec<ImageReport> = images
        .iter()
        .map(|image| process_image(provider, annotator, image))
        .collect();
    let failed = reports.iter().filter(|r| !r.is_success()).count();
    log::info!(
        "batch finished: {} annotated, {} failed",
        reports.len() - failed,
        failed
    );
    reports
}

/// Process a single image, converting any failure into a failed report.
pub fn process_image<P>(provider: &mut P, annotator: &Annotator, image: &UploadedImage) -> ImageReport
where
    P: InferenceProvider + ?Sized,
{
    match annotate_image(provider, annotator, image) {
        Ok(annotation) => ImageReport {
            name: image.name.clone(),
            outcome: ImageOutcome::Annotated(Box::new(annotation)),
        },
        Err(err) => {
            log::warn!("detection failed for {}: {:#}", image.name, err);
            ImageReport::failed(image.name.clone(), &err)
        }
    }
}

fn annotate_image<P>(provider: &mut P, annotator: &Annotator, image: &UploadedImage) -> Result<Annotation>
where
    P: InferenceProvider + ?Sized,
{
    let source = image.decode()?;
    let detections = provider
        .infer(image)
        .with_context(|| format!("{} inference failed for {}", provider.name(), image.name))?;
    log::info!(
        "{}: {} detections on {}x{}",
        image.name,
        detections.len(),
        source.width(),
        source.height()
    );
    Ok(annotator.annotate(source, &detections))
}
