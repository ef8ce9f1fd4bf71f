use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::config::ModelMetric;
use crate::detect::ClassTally;
use crate::pipeline::{ImageOutcome, ImageReport};

const METRIC_BAR_WIDTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    fn pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty | UiMode::Auto => true,
                UiMode::Plain => false,
            }
    }

    /// Progress line for image `index` (1-based) of `total`.
    pub fn image_stage(&self, index: usize, total: usize, name: &str) -> ImageStage {
        let label = format!("[{}/{}] {}", index, total, name);
        let spinner = if self.pretty() {
            let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            let style = ProgressStyle::with_template("{spinner} {msg} {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(label.clone());
            spinner.enable_steady_tick(Duration::from_millis(120));
            Some(spinner)
        } else {
            eprintln!("==> {}", label);
            None
        };
        ImageStage {
            label,
            start: Instant::now(),
            spinner,
            summary: None,
        }
    }

    /// One line per metric: name, value and a bar scaled to 100%.
    pub fn metric_bars(&self, metrics: &[ModelMetric]) -> Vec<String> {
        let name_width = metrics.iter().map(|m| m.name.len()).max().unwrap_or(0);
        metrics
            .iter()
            .map(|metric| {
                let bar = bar(metric.value, METRIC_BAR_WIDTH);
                let bar = match (self.pretty(), parse_hex_color(metric.color)) {
                    (true, Some([r, g, b])) => format!("\x1b[38;2;{r};{g};{b}m{bar}\x1b[0m"),
                    _ => bar,
                };
                format!(
                    "{:<width$}  {:>5.1}%  {}",
                    metric.name,
                    metric.value,
                    bar,
                    width = name_width
                )
            })
            .collect()
    }
}

/// `<label>: <count>` lines, ordered by label.
pub fn tally_lines(tally: &ClassTally) -> Vec<String> {
    tally
        .iter()
        .map(|(label, count)| format!("{}: {}", label, count))
        .collect()
}

fn bar(percent: f32, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f32).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// In-flight progress for one image; prints its outcome when dropped.
pub struct ImageStage {
    label: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    summary: Option<(bool, String)>,
}

impl ImageStage {
    /// Record how the image turned out.
    pub fn finish(mut self, report: &ImageReport) {
        self.summary = Some(stage_summary(report));
    }
}

impl Drop for ImageStage {
    fn drop(&mut self) {
        let (ok, summary) = self
            .summary
            .take()
            .unwrap_or_else(|| (false, "interrupted".to_string()));
        let mark = if ok { "✔" } else { "✘" };
        let message = format!(
            "{} {}: {} ({:.1?})",
            mark,
            self.label,
            summary,
            self.start.elapsed()
        );
        match &self.spinner {
            Some(spinner) => {
                if let Ok(style) = ProgressStyle::with_template("{msg}") {
                    spinner.set_style(style);
                }
                spinner.finish_with_message(message);
            }
            None => eprintln!("{}", message),
        }
    }
}

fn stage_summary(report: &ImageReport) -> (bool, String) {
    match &report.outcome {
        ImageOutcome::Annotated(annotation) => {
            let count = annotation.tally.total();
            let noun = if count == 1 { "detection" } else { "detections" };
            (true, format!("{} {}", count, noun))
        }
        ImageOutcome::Failed { .. } => (false, "failed".to_string()),
    }
}
