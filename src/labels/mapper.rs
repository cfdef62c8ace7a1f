//! Rule-based mapping from classifier labels to event and people tags.
//!
//! Labels are normalized (lowercase, anything outside `[a-z0-9 ]` becomes a
//! space) and matched by substring against fixed keyword tables. Each mapper
//! emits at most one tag per call.

use super::{AutoTag, LabelScore};
use crate::db::TagType;

pub const EVENT_THRESHOLD: f32 = 0.85;
pub const PEOPLE_THRESHOLD: f32 = 0.90;
pub const PEOPLE_TAG: &str = "Person";

const PEOPLE_KEYWORDS: &[&str] = &["person", "man", "woman", "boy", "girl", "baby"];

struct EventRule {
    tag: &'static str,
    keywords: &'static [&'static str],
}

/// Order matters: equal scores go to the earlier rule.
const EVENT_RULES: &[EventRule] = &[
    EventRule { tag: "Travel/Tourism", keywords: &["temple", "palace", "castle", "monument", "museum", "landmark"] },
    EventRule { tag: "Nature/Outdoor", keywords: &["forest", "waterfall", "lake", "field", "park", "valley"] },
    EventRule { tag: "City/Street", keywords: &["street", "city", "downtown", "skyscraper", "subway", "metro"] },
    EventRule { tag: "Food/Restaurant", keywords: &["restaurant", "food", "dish", "dining", "table"] },
    EventRule { tag: "Cafe/Dessert", keywords: &["cafe", "coffee", "dessert", "pastry"] },
    EventRule { tag: "Party/Celebration", keywords: &["party", "celebration", "balloon", "birthday"] },
    EventRule { tag: "Wedding", keywords: &["wedding", "bride", "groom"] },
    EventRule { tag: "Family/Kids", keywords: &["family", "child", "kids", "baby", "playground"] },
    EventRule { tag: "Meeting/Work", keywords: &["office", "meeting", "conference", "workstation"] },
    EventRule { tag: "Performance/Stage", keywords: &["concert", "stage", "theater", "performance"] },
    EventRule { tag: "Sports/Fitness", keywords: &["stadium", "gym", "sport", "basketball", "soccer"] },
    EventRule { tag: "Animals/Pets", keywords: &["dog", "cat", "pet", "animal"] },
    EventRule { tag: "Beach/Sea", keywords: &["beach", "seashore", "ocean", "coast"] },
    EventRule { tag: "Mountain/Hiking", keywords: &["mountain", "hiking", "trail", "hill"] },
    EventRule { tag: "Night/Evening", keywords: &["night", "nightscape", "city lights"] },
];

/// Names of all event tags, in rule order.
pub fn event_tag_names() -> impl Iterator<Item = &'static str> {
    EVENT_RULES.iter().map(|rule| rule.tag)
}

pub fn normalize(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ' { c } else { ' ' })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct LabelMapper {
    event_threshold: f32,
    people_threshold: f32,
}

impl Default for LabelMapper {
    fn default() -> Self {
        Self::new(EVENT_THRESHOLD, PEOPLE_THRESHOLD)
    }
}

impl LabelMapper {
    pub fn new(event_threshold: f32, people_threshold: f32) -> Self {
        Self {
            event_threshold,
            people_threshold,
        }
    }

    /// The single strongest event tag among confident labels.
    pub fn map_events(&self, labels: &[LabelScore]) -> Option<AutoTag> {
        let mut best_per_rule: [Option<f32>; EVENT_RULES.len()] = [None; EVENT_RULES.len()];

        for label in labels.iter().filter(|l| l.score >= self.event_threshold) {
            let normalized = normalize(&label.label);
            for (slot, rule) in best_per_rule.iter_mut().zip(EVENT_RULES) {
                let matched = rule.keywords.iter().any(|k| normalized.contains(k));
                if matched && slot.map_or(true, |best| label.score > best) {
                    *slot = Some(label.score);
                }
            }
        }

        let mut winner: Option<(usize, f32)> = None;
        for (index, score) in best_per_rule.iter().enumerate() {
            if let Some(score) = *score {
                if winner.map_or(true, |(_, best)| score > best) {
                    winner = Some((index, score));
                }
            }
        }

        winner.map(|(index, score)| AutoTag {
            tag_type: TagType::Event,
            name: EVENT_RULES[index].tag.to_string(),
            score,
        })
    }

    /// A `Person` tag carrying the score of the first confident people label.
    pub fn map_people(&self, labels: &[LabelScore]) -> Option<AutoTag> {
        labels
            .iter()
            .find(|l| {
                l.score >= self.people_threshold && {
                    let normalized = normalize(&l.label);
                    PEOPLE_KEYWORDS.iter().any(|k| normalized.contains(k))
                }
            })
            .map(|l| AutoTag {
                tag_type: TagType::People,
                name: PEOPLE_TAG.to_string(),
                score: l.score,
            })
    }

    /// Event tag (if any) followed by people tag (if any).
    pub fn map_all(&self, labels: &[LabelScore]) -> Vec<AutoTag> {
        self.map_events(labels)
            .into_iter()
            .chain(self.map_people(labels))
            .collect()
    }
}
