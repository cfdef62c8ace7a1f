use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub gazetteer: GazetteerConfig,

    #[serde(default)]
    pub geocoder: GeocoderConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerConfig {
    /// Seed CSV to load instead of the bundled dataset.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    #[serde(default = "default_seed_batch_size")]
    pub batch_size: usize,
}

fn default_seed_batch_size() -> usize {
    500
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            batch_size: default_seed_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Matches farther than this are treated as "location unknown".
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: f64,

    /// Cap on cities fetched per geohash prefix lookup.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

fn default_max_distance_km() -> f64 {
    50.0
}

fn default_candidate_limit() -> usize {
    200
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            max_distance_km: default_max_distance_km(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    #[default]
    Nchw,
    Nhwc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Class labels, one per line, in model output order.
    #[serde(default = "default_labels_path")]
    pub labels_path: PathBuf,

    #[serde(default = "default_input_name")]
    pub input_name: String,

    #[serde(default = "default_input_size")]
    pub input_size: u32,

    #[serde(default)]
    pub layout: TensorLayout,

    /// Set when the model emits logits rather than probabilities.
    #[serde(default)]
    pub apply_softmax: bool,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_event_threshold")]
    pub event_threshold: f32,

    #[serde(default = "default_people_threshold")]
    pub people_threshold: f32,

    /// Media items classified per `classify` run.
    #[serde(default = "default_classify_batch_size")]
    pub batch_size: usize,
}

fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("phototag/models")
}

fn default_model_path() -> PathBuf {
    default_models_dir().join("classifier.onnx")
}

fn default_labels_path() -> PathBuf {
    default_models_dir().join("labels.txt")
}

fn default_input_name() -> String {
    "input".to_string()
}

fn default_input_size() -> u32 {
    224
}

fn default_top_k() -> usize {
    5
}

fn default_event_threshold() -> f32 {
    0.85
}

fn default_people_threshold() -> f32 {
    0.90
}

fn default_classify_batch_size() -> usize {
    50
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            labels_path: default_labels_path(),
            input_name: default_input_name(),
            input_size: default_input_size(),
            layout: TensorLayout::default(),
            apply_softmax: false,
            top_k: default_top_k(),
            event_threshold: default_event_threshold(),
            people_threshold: default_people_threshold(),
            batch_size: default_classify_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp", "heic", "heif", "tif", "tiff"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mov", "m4v", "3gp", "mkv", "webm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            video_extensions: default_video_extensions(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("phototag")
        .join("phototag.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            gazetteer: GazetteerConfig::default(),
            geocoder: GeocoderConfig::default(),
            classifier: ClassifierConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `PHOTOTAG_CONFIG` or the default location, writing defaults
    /// on first run.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var_os("PHOTOTAG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("phototag")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
