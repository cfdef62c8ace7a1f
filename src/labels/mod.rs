//! Classifier output to semantic tags.

pub mod classifier;
pub mod mapper;
pub mod summary;
pub mod tagger;

use serde::{Deserialize, Serialize};

use crate::db::TagType;

pub use classifier::{ClassifierError, ImageClassifier, OnnxClassifier};
pub use mapper::LabelMapper;
pub use tagger::{AutoTagger, TaggingResult};

/// One classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A tag derived from classifier output, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct AutoTag {
    pub tag_type: TagType,
    pub name: String,
    pub score: f32,
}
