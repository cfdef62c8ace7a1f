//! Per-item label summary stored on the media record.
//!
//! The summary maps a tag type to the tags emitted for it, e.g.
//! `{"event":[{"name":"Wedding","score":0.97}]}`. An item that was looked at
//! but produced nothing stores `{}` so it is not classified again.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AutoTag;

pub const LABEL_EMPTY: &str = "{}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    pub score: f32,
}

pub type LabelSummary = BTreeMap<String, Vec<LabelEntry>>;

pub fn build_label_json(tags: &[AutoTag]) -> Result<String> {
    if tags.is_empty() {
        return Ok(LABEL_EMPTY.to_string());
    }

    let mut summary = LabelSummary::new();
    for tag in tags {
        summary
            .entry(tag.tag_type.as_str().to_string())
            .or_default()
            .push(LabelEntry {
                name: tag.name.clone(),
                score: tag.score,
            });
    }
    Ok(serde_json::to_string(&summary)?)
}

pub fn parse_label_json(json: &str) -> Result<LabelSummary> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TagType;

    #[test]
    fn test_empty_summary() {
        assert_eq!(build_label_json(&[]).unwrap(), "{}");
        assert!(parse_label_json(LABEL_EMPTY).unwrap().is_empty());
    }

    #[test]
    fn test_grouped_by_type() {
        let tags = vec![
            AutoTag { tag_type: TagType::Event, name: "Beach/Sea".to_string(), score: 0.9 },
            AutoTag { tag_type: TagType::People, name: "Person".to_string(), score: 0.95 },
        ];
        let json = build_label_json(&tags).unwrap();
        assert_eq!(
            json,
            r#"{"event":[{"name":"Beach/Sea","score":0.9}],"people":[{"name":"Person","score":0.95}]}"#
        );

        let parsed = parse_label_json(&json).unwrap();
        assert_eq!(parsed["people"][0].name, "Person");
    }

    #[test]
    fn test_malformed_summary_is_an_error() {
        assert!(parse_label_json("not json").is_err());
    }
}
