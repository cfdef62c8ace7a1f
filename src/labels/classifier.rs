//! On-device image classification using ONNX Runtime

use anyhow::Result;
use image::DynamicImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use tracing::info;

use super::LabelScore;
use crate::config::{ClassifierConfig, TensorLayout};

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("failed to read labels from {}: {source}", .path.display())]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file not found: {}", .0.display())]
    MissingModel(PathBuf),
    #[error("model produced no output tensor")]
    NoOutput,
}

/// Anything that turns an image into ranked label scores.
pub trait ImageClassifier {
    /// Top `top_k` labels, highest score first.
    fn classify(&mut self, image: &DynamicImage, top_k: usize) -> Result<Vec<LabelScore>>;
}

pub struct OnnxClassifier {
    session: Session,
    labels: Vec<String>,
    input_name: String,
    input_size: u32,
    layout: TensorLayout,
    apply_softmax: bool,
}

impl OnnxClassifier {
    pub fn open(config: &ClassifierConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ClassifierError::MissingModel(config.model_path.clone()).into());
        }
        let labels = load_labels(&config.labels_path)?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&config.model_path)?;

        info!(model = ?config.model_path, labels = labels.len(), "Classifier loaded");

        Ok(Self {
            session,
            labels,
            input_name: config.input_name.clone(),
            input_size: config.input_size,
            layout: config.layout,
            apply_softmax: config.apply_softmax,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&mut self, image: &DynamicImage, top_k: usize) -> Result<Vec<LabelScore>> {
        let size = self.input_size as usize;
        let input_data = preprocess(image, self.input_size, self.layout);
        let shape = match self.layout {
            TensorLayout::Nchw => [1usize, 3, size, size],
            TensorLayout::Nhwc => [1usize, size, size, 3],
        };
        let input_tensor = Tensor::from_array((shape, input_data.into_boxed_slice()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let output = outputs.iter().next().ok_or(ClassifierError::NoOutput)?;
        let (_shape, scores) = output.1.try_extract_tensor::<f32>()?;

        Ok(rank_labels(scores, &self.labels, top_k, self.apply_softmax))
    }
}

/// Class names, one per line, in model output order.
pub fn load_labels(path: &Path) -> Result<Vec<String>, ClassifierError> {
    let content = std::fs::read_to_string(path).map_err(|source| ClassifierError::Labels {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(|l| l.trim().to_string()).collect())
}

/// Resize to a square input and scale RGB to [0, 1].
pub fn preprocess(image: &DynamicImage, size: u32, layout: TensorLayout) -> Vec<f32> {
    let resized = image.resize_exact(size, size, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let plane = (size * size) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let idx = y as usize * size as usize + x as usize;
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            match layout {
                TensorLayout::Nchw => data[channel * plane + idx] = value,
                TensorLayout::Nhwc => data[idx * 3 + channel] = value,
            }
        }
    }

    data
}

/// Pair scores with label names and keep the `top_k` best.
///
/// Outputs beyond the label list are named `label_<index>`.
pub fn rank_labels(scores: &[f32], labels: &[String], top_k: usize, softmax: bool) -> Vec<LabelScore> {
    let probabilities = if softmax { softmax_of(scores) } else { scores.to_vec() };

    let mut ranked: Vec<LabelScore> = probabilities
        .into_iter()
        .enumerate()
        .map(|(idx, score)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("label_{idx}"));
            LabelScore { label, score }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_k);
    ranked
}

fn softmax_of(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|x| x / sum).collect()
    } else {
        exps
    }
}
