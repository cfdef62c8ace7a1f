//! Types for semantic tags.

use std::fmt;
use std::str::FromStr;

/// Kind of semantic tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Event,
    People,
}

impl TagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Event => "event",
            TagType::People => "people",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tag type: {0}")]
pub struct TagTypeParseError(String);

impl FromStr for TagType {
    type Err = TagTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "event" => Ok(TagType::Event),
            "people" => Ok(TagType::People),
            other => Err(TagTypeParseError(other.to_string())),
        }
    }
}

/// Where a tag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    Manual,
    Model,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::Manual => "manual",
            TagSource::Model => "model",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(TagSource::Manual),
            "model" => Some(TagSource::Model),
            _ => None,
        }
    }
}

/// A stored semantic tag
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub tag_type: TagType,
    pub name: String,
    pub confidence: f64,
    pub source: TagSource,
}

/// Number of media items linked to a tag
#[derive(Debug, Clone, PartialEq)]
pub struct TagCount {
    pub tag_id: i64,
    pub name: String,
    pub tag_type: TagType,
    pub count: i64,
}
