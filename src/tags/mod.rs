//! Linking semantic tags to media items.
//!
//! Tags are found or created by their natural key `(type, name)` and linked
//! with insert-or-ignore, so repeated or concurrent passes over the same item
//! never produce duplicate tags or links. The store's uniqueness constraints
//! are the only coordination; nothing is cached between calls.

use anyhow::Result;
use tracing::{debug, warn};

use crate::db::{TagSource, TagStore, TagType};

pub struct TagRepository<'a, S: TagStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TagStore + ?Sized> TagRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Tag added by the user; confidence is always 1.0.
    pub fn add_manual_tag(&self, media_uri: &str, tag_type: TagType, name: &str) -> Result<Option<i64>> {
        self.attach_tag(media_uri, tag_type, name, 1.0, TagSource::Manual)
    }

    /// Tag derived from classifier output.
    pub fn add_auto_tag(
        &self,
        media_uri: &str,
        tag_type: TagType,
        name: &str,
        confidence: f64,
    ) -> Result<Option<i64>> {
        self.attach_tag(media_uri, tag_type, name, confidence, TagSource::Model)
    }

    /// Find or create the tag and link it to `media_uri`.
    ///
    /// A blank name is ignored and yields `Ok(None)`; otherwise returns the tag id.
    pub fn attach_tag(
        &self,
        media_uri: &str,
        tag_type: TagType,
        name: &str,
        confidence: f64,
        source: TagSource,
    ) -> Result<Option<i64>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let tag_id = match self
            .store
            .insert_tag_or_ignore(tag_type, name, confidence, source)?
        {
            Some(id) => Some(id),
            None => self
                .store
                .find_tag_by_type_and_name(tag_type, name)?
                .map(|tag| tag.id),
        };

        let Some(tag_id) = tag_id else {
            warn!(tag_type = %tag_type, name, "Tag vanished between insert and lookup");
            return Ok(None);
        };

        self.store.link_media_tag(media_uri, tag_id)?;
        debug!(media_uri, tag_type = %tag_type, name, tag_id, "Tag attached");
        Ok(Some(tag_id))
    }
}
