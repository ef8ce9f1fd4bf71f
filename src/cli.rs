//! cornsight - run corn leaf images through a hosted detector and save the overlays.
//!
//! Every image is handled on its own: one inference call, one annotation
//! pass, one output file. A failed image is reported and the rest continue.

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::collections::HashSet;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::annotate::{Annotator, ColorPolicy};
use crate::config::{AppConfig, ProfileKind};
use crate::detect::{parse_predictions, InferenceProvider, StubProvider, StubResponse};
use crate::frame::UploadedImage;
use crate::pipeline::{process_image, ImageOutcome, ImageReport};
use crate::ui::{tally_lines, Ui, UiMode};

const FAILURE_NOTICE: &str = "Detection failed. Please try again.";

#[derive(Parser, Debug)]
#[command(
    name = "cornsight",
    author,
    version,
    about = "Detect corn leaf disease in photos and draw the results"
)]
struct Args {
    /// Progress output style.
    #[arg(long, global = true, value_enum, env = "CORNSIGHT_UI", default_value = "auto")]
    ui: UiMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run detection on one or more images
    Detect(DetectArgs),

    /// Show the deployment profiles and their model metrics
    Profiles,
}

#[derive(ClapArgs, Debug)]
struct DetectArgs {
    /// Deployment profile selecting the model and label styling.
    #[arg(long, value_enum)]
    profile: ProfileKind,

    /// Directory for the annotated PNGs.
    #[arg(long, env = "CORNSIGHT_OUT_DIR", default_value = "annotated")]
    out_dir: PathBuf,

    /// Replay a saved inference response for every image instead of calling the model.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Images to process (jpg, jpeg, png).
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::new(args.ui, std::io::stderr().is_terminal());

    match args.command {
        Command::Detect(detect_args) => detect(detect_args, &ui),
        Command::Profiles => profiles(&ui),
    }
}

fn detect(args: DetectArgs, ui: &Ui) -> Result<()> {
    let cfg = AppConfig::load()?;
    let stdout = std::io::stdout();
    detect_batch(&args, &cfg, ui, &mut stdout.lock())
}

fn detect_batch(args: &DetectArgs, cfg: &AppConfig, ui: &Ui, out: &mut dyn Write) -> Result<()> {
    let profile = cfg.profile(args.profile);
    let mut provider = build_provider(args, cfg)?;
    let annotator = Annotator::new(profile.render.clone(), ColorPolicy::default());

    std::fs::create_dir_all(&args.out_dir).with_context(|| {
        format!("failed to create output directory {}", args.out_dir.display())
    })?;
    log::info!(
        "profile={} model={} provider={} images={}",
        profile.kind.name(),
        profile.model_id,
        provider.name(),
        args.files.len()
    );

    let mut outputs = OutputNames::new(&args.out_dir);
    let mut succeeded = 0usize;
    for (index, path) in args.files.iter().enumerate() {
        let stage = ui.image_stage(index + 1, args.files.len(), &path.display().to_string());
        let report = detect_one(provider.as_mut(), &annotator, path, &mut outputs);
        stage.finish(&report);
        print_report(out, &report)?;
        if report.is_success() {
            succeeded += 1;
        }
    }

    if succeeded == 0 {
        return Err(anyhow!("detection failed for all {} images", args.files.len()));
    }
    Ok(())
}

/// Output paths handed out in this run.
///
/// Inputs sharing a stem (`a/leaf.jpg`, `b/leaf.jpg`, `leaf.png`) get
/// `leaf_annotated.png`, `leaf_annotated_2.png`, ... instead of overwriting
/// each other.
struct OutputNames {
    dir: PathBuf,
    taken: HashSet<PathBuf>,
}

impl OutputNames {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            taken: HashSet::new(),
        }
    }

    fn reserve(&mut self, stem: &str) -> PathBuf {
        let mut candidate = self.dir.join(format!("{}_annotated.png", stem));
        let mut n = 2usize;
        while self.taken.contains(&candidate) {
            candidate = self.dir.join(format!("{}_annotated_{}.png", stem, n));
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

fn build_provider(args: &DetectArgs, cfg: &AppConfig) -> Result<Box<dyn InferenceProvider>> {
    if let Some(path) = &args.replay {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read replay file {}", path.display()))?;
        let detections = parse_predictions(&raw)
            .with_context(|| format!("invalid replay file {}", path.display()))?;
        log::info!(
            "replaying {} detections from {}",
            detections.len(),
            path.display()
        );
        return Ok(Box::new(
            StubProvider::new().with_fallback(StubResponse::Detections(detections)),
        ));
    }
    live_provider(args, cfg)
}

#[cfg(feature = "provider-roboflow")]
fn live_provider(args: &DetectArgs, cfg: &AppConfig) -> Result<Box<dyn InferenceProvider>> {
    let profile = cfg.profile(args.profile);
    let provider = crate::detect::RoboflowProvider::new(profile.roboflow_config(cfg)?)?;
    Ok(Box::new(provider))
}

#[cfg(not(feature = "provider-roboflow"))]
fn live_provider(_args: &DetectArgs, _cfg: &AppConfig) -> Result<Box<dyn InferenceProvider>> {
    Err(anyhow!(
        "built without the provider-roboflow feature; pass --replay <response.json>"
    ))
}

fn detect_one(
    provider: &mut dyn InferenceProvider,
    annotator: &Annotator,
    path: &Path,
    outputs: &mut OutputNames,
) -> ImageReport {
    let image = match UploadedImage::from_path(path) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("{:#}", err);
            return ImageReport::failed(path.display().to_string(), &err);
        }
    };
    let report = process_image(provider, annotator, &image);
    let Some(annotation) = report.annotation() else {
        return report;
    };

    let out_path = outputs.reserve(image.stem());
    match annotation
        .annotated
        .save(&out_path)
        .with_context(|| format!("failed to write {}", out_path.display()))
    {
        Ok(()) => {
            log::info!("wrote {}", out_path.display());
            report
        }
        Err(err) => {
            log::warn!("{:#}", err);
            ImageReport::failed(image.name, &err)
        }
    }
}

fn print_report(out: &mut dyn Write, report: &ImageReport) -> std::io::Result<()> {
    writeln!(out, "{}", report.name)?;
    match &report.outcome {
        ImageOutcome::Annotated(annotation) => {
            writeln!(out, "Detected Objects Count:")?;
            if annotation.tally.is_empty() {
                writeln!(out, "  (none)")?;
            }
            for line in tally_lines(&annotation.tally) {
                writeln!(out, "  {}", line)?;
            }
        }
        ImageOutcome::Failed { .. } => writeln!(out, "  {}", FAILURE_NOTICE)?,
    }
    Ok(())
}

fn profiles(ui: &Ui) -> Result<()> {
    let cfg = AppConfig::load()?;
    for profile in cfg.profiles() {
        println!(
            "{} (model {}, key {})",
            profile.kind.name(),
            profile.model_id,
            if profile.api_key.is_some() {
                "configured"
            } else {
                "missing"
            }
        );
        for line in ui.metric_bars(&profile.metrics) {
            println!("  {}", line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    const REPLAY: &str = r#"{"predictions":[
        {"x":16,"y":20,"width":10,"height":8,"class":"Healthy","confidence":0.9}
    ]}"#;

    fn write_png(path: &Path) {
        let img = RgbImage::from_pixel(40, 40, Rgb([90, 140, 60]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn args(dir: &TempDir, files: Vec<PathBuf>) -> DetectArgs {
        let replay = dir.path().join("response.json");
        std::fs::write(&replay, REPLAY).unwrap();
        DetectArgs {
            profile: ProfileKind::Drone,
            out_dir: dir.path().join("out"),
            replay: Some(replay),
            files,
        }
    }

    fn run(args: &DetectArgs) -> (Result<()>, String) {
        let ui = Ui::new(UiMode::Plain, false);
        let mut out = Vec::new();
        let result = detect_batch(args, &AppConfig::default(), &ui, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn mixed_batch_succeeds_and_reports_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.png");
        write_png(&good);
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();

        let (result, stdout) = run(&args(&dir, vec![good, broken]));
        assert!(result.is_ok());
        assert_eq!(
            stdout,
            format!(
                "good.png\nDetected Objects Count:\n  Healthy: 1\nbroken.jpg\n  {}\n",
                FAILURE_NOTICE
            )
        );
        assert!(dir.path().join("out/good_annotated.png").is_file());
        assert!(!dir.path().join("out/broken_annotated.png").exists());
    }

    #[test]
    fn all_failures_is_an_error() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();
        let missing = dir.path().join("missing.png");

        let (result, stdout) = run(&args(&dir, vec![broken, missing]));
        assert!(result.is_err());
        assert_eq!(stdout.matches(FAILURE_NOTICE).count(), 2);
    }

    #[test]
    fn same_stem_inputs_keep_separate_outputs() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a/leaf.png");
        let second = dir.path().join("b/leaf.png");
        let third = dir.path().join("leaf.jpg");
        for path in [&first, &second, &third] {
            write_png(path);
        }

        let (result, _) = run(&args(&dir, vec![first, second, third]));
        assert!(result.is_ok());
        let out = dir.path().join("out");
        for name in ["leaf_annotated.png", "leaf_annotated_2.png", "leaf_annotated_3.png"] {
            let saved = image::open(out.join(name)).unwrap();
            assert_eq!((saved.width(), saved.height()), (40, 40));
        }
    }

    #[test]
    fn output_names_skip_taken_paths() {
        let mut names = OutputNames::new(Path::new("out"));
        assert_eq!(names.reserve("leaf"), Path::new("out/leaf_annotated.png"));
        assert_eq!(names.reserve("leaf"), Path::new("out/leaf_annotated_2.png"));
        assert_eq!(names.reserve("stalk"), Path::new("out/stalk_annotated.png"));
        assert_eq!(names.reserve("leaf"), Path::new("out/leaf_annotated_3.png"));
    }
}
