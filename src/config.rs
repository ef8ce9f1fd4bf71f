use anyhow::{anyhow, Context, Result};
use image::Rgb;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::annotate::{
    RenderConfig, Typeface, DEFAULT_BOX_THICKNESS, DEFAULT_TEXT_THICKNESS,
};

const DEFAULT_API_URL: &str = "https://detect.roboflow.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const HANDHELD_MODEL_ID: &str = "corn-grayleafspot2/22";
const HANDHELD_FONT_SCALE: f32 = 2.5;
const DRONE_MODEL_ID: &str = "testing-cmpv3/1";
const DRONE_FONT_SCALE: f32 = 0.5;

/// Largest accepted text scale: 1024px glyph cells.
pub const MAX_FONT_SCALE: f32 = 64.0;
/// Largest accepted box or text stroke, in pixels.
pub const MAX_THICKNESS: u32 = 256;

const METRIC_MAP_COLOR: &str = "#A855F7";
const METRIC_PRECISION_COLOR: &str = "#3B82F6";
const METRIC_RECALL_COLOR: &str = "#F59E0B";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    handheld: Option<ProfileConfigFile>,
    drone: Option<ProfileConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProfileConfigFile {
    model_id: Option<String>,
    api_key: Option<String>,
    font_scale: Option<f32>,
    typeface: Option<Typeface>,
    box_thickness: Option<u32>,
    text_thickness: Option<u32>,
}

/// Deployment profile: which model to call and how to draw its results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ProfileKind {
    /// Close-up leaf photos taken by hand.
    Handheld,
    /// Aerial field imagery.
    Drone,
}

impl ProfileKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::Handheld => "handheld",
            ProfileKind::Drone => "drone",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            ProfileKind::Handheld => "CORNSIGHT_HANDHELD",
            ProfileKind::Drone => "CORNSIGHT_DRONE",
        }
    }
}

/// Published evaluation figure for a profile's model, in percent.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMetric {
    pub name: &'static str,
    pub value: f32,
    /// `#RRGGBB` display colour.
    pub color: &'static str,
}

#[derive(Clone, Debug)]
pub struct Profile {
    pub kind: ProfileKind,
    pub model_id: String,
    pub api_key: Option<String>,
    pub render: RenderConfig,
    pub metrics: Vec<ModelMetric>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub handheld: Profile,
    pub drone: Profile,
}

impl AppConfig {
    /// Defaults, then the file named by `CORNSIGHT_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CORNSIGHT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        Self {
            api_url: file.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            handheld: Profile::from_file(ProfileKind::Handheld, file.handheld.unwrap_or_default()),
            drone: Profile::from_file(ProfileKind::Drone, file.drone.unwrap_or_default()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env("CORNSIGHT_API_URL") {
            self.api_url = url;
        }
        if let Some(timeout) = non_empty_env("CORNSIGHT_TIMEOUT_SECS") {
            let seconds: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("CORNSIGHT_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.timeout = Duration::from_secs(seconds);
        }
        self.handheld.apply_env();
        self.drone.apply_env();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(anyhow!("api_url must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(anyhow!("timeout must be greater than zero"));
        }
        self.handheld.validate()?;
        self.drone.validate()?;
        Ok(())
    }

    pub fn profile(&self, kind: ProfileKind) -> &Profile {
        match kind {
            ProfileKind::Handheld => &self.handheld,
            ProfileKind::Drone => &self.drone,
        }
    }

    pub fn profiles(&self) -> [&Profile; 2] {
        [&self.handheld, &self.drone]
    }
}

impl Default for AppConfig {
    /// Built-in profiles with no file and no environment applied.
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

impl Profile {
    fn builtin(kind: ProfileKind) -> Self {
        let (model_id, font_scale, metrics) = match kind {
            ProfileKind::Handheld => (HANDHELD_MODEL_ID, HANDHELD_FONT_SCALE, [83.9, 95.6, 76.0]),
            ProfileKind::Drone => (DRONE_MODEL_ID, DRONE_FONT_SCALE, [80.0, 86.3, 77.5]),
        };
        Self {
            kind,
            model_id: model_id.to_string(),
            api_key: None,
            render: RenderConfig {
                font_scale,
                typeface: Typeface::Italic,
                box_thickness: DEFAULT_BOX_THICKNESS,
                text_thickness: DEFAULT_TEXT_THICKNESS,
                text_color: Rgb([0, 0, 0]),
            },
            metrics: vec![
                ModelMetric {
                    name: "mAP",
                    value: metrics[0],
                    color: METRIC_MAP_COLOR,
                },
                ModelMetric {
                    name: "Precision",
                    value: metrics[1],
                    color: METRIC_PRECISION_COLOR,
                },
                ModelMetric {
                    name: "Recall",
                    value: metrics[2],
                    color: METRIC_RECALL_COLOR,
                },
            ],
        }
    }

    fn from_file(kind: ProfileKind, file: ProfileConfigFile) -> Self {
        let mut profile = Self::builtin(kind);
        if let Some(model_id) = file.model_id {
            profile.model_id = model_id;
        }
        profile.api_key = file.api_key.filter(|key| !key.trim().is_empty());
        if let Some(scale) = file.font_scale {
            profile.render.font_scale = scale;
        }
        if let Some(typeface) = file.typeface {
            profile.render.typeface = typeface;
        }
        if let Some(thickness) = file.box_thickness {
            profile.render.box_thickness = thickness;
        }
        if let Some(thickness) = file.text_thickness {
            profile.render.text_thickness = thickness;
        }
        profile
    }

    fn apply_env(&mut self) {
        let prefix = self.kind.env_prefix();
        if let Some(model_id) = non_empty_env(&format!("{}_MODEL", prefix)) {
            self.model_id = model_id;
        }
        if let Some(api_key) = non_empty_env(&format!("{}_API_KEY", prefix)) {
            self.api_key = Some(api_key);
        }
    }

    fn validate(&self) -> Result<()> {
        let name = self.kind.name();
        if self.model_id.trim().is_empty() {
            return Err(anyhow!("{} profile: model_id must not be empty", name));
        }
        let scale = self.render.font_scale;
        if !(scale.is_finite() && scale > 0.0 && scale <= MAX_FONT_SCALE) {
            return Err(anyhow!(
                "{} profile: font_scale must be in (0, {}], got {}",
                name,
                MAX_FONT_SCALE,
                scale
            ));
        }
        for (field, value) in [
            ("box_thickness", self.render.box_thickness),
            ("text_thickness", self.render.text_thickness),
        ] {
            if !(1..=MAX_THICKNESS).contains(&value) {
                return Err(anyhow!(
                    "{} profile: {} must be in 1..={}, got {}",
                    name,
                    field,
                    MAX_THICKNESS,
                    value
                ));
            }
        }
        Ok(())
    }

    /// API key for live inference; only required when the hosted model is called.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "no API key for the {} profile; set {}_API_KEY or api_key in the config file",
                self.kind.name(),
                self.kind.env_prefix()
            )
        })
    }

    #[cfg(feature = "provider-roboflow")]
    pub fn roboflow_config(&self, app: &AppConfig) -> Result<crate::detect::RoboflowConfig> {
        Ok(crate::detect::RoboflowConfig {
            base_url: app.api_url.clone(),
            model_id: self.model_id.clone(),
            api_key: self.require_api_key()?.to_string(),
            timeout: app.timeout,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
