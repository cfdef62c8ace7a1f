use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use super::classifier::ImageClassifier;
use super::mapper::LabelMapper;
use super::summary::{build_label_json, LABEL_EMPTY};
use crate::db::{MediaItem, MediaStore, TagStore};
use crate::tags::TagRepository;

/// Counts from one tagging pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaggingResult {
    /// Items given a label summary, empty or not
    pub processed: usize,
    /// Items that received at least one tag
    pub tagged: usize,
    /// Videos and undecodable images, stored with an empty summary
    pub skipped: usize,
}

/// Classifies unlabeled media and persists the resulting tags.
pub struct AutoTagger<'a, D: MediaStore + TagStore + ?Sized, C: ImageClassifier> {
    store: &'a D,
    classifier: C,
    mapper: LabelMapper,
    top_k: usize,
}

impl<'a, D: MediaStore + TagStore + ?Sized, C: ImageClassifier> AutoTagger<'a, D, C> {
    pub fn new(store: &'a D, classifier: C, mapper: LabelMapper, top_k: usize) -> Self {
        Self {
            store,
            classifier,
            mapper,
            top_k: top_k.max(1),
        }
    }

    /// Process up to `limit` media items that have no label summary yet.
    ///
    /// Videos, undecodable images and classifier failures are logged and
    /// stored with an empty summary so a later pass skips them. Store errors
    /// abort the batch; the summary is written last, so the failing item keeps
    /// no summary and is picked up again by the next pass.
    pub fn tag_batch(&mut self, limit: usize) -> Result<TaggingResult> {
        let items = self.store.get_unlabeled_media(limit)?;
        let mut result = TaggingResult::default();

        for item in &items {
            let tags_added = match self.tag_item(item)? {
                Some(count) => count,
                None => {
                    result.skipped += 1;
                    0
                }
            };

            result.processed += 1;
            if tags_added > 0 {
                result.tagged += 1;
            }
        }

        info!(
            processed = result.processed,
            tagged = result.tagged,
            skipped = result.skipped,
            "Tagging pass finished"
        );
        Ok(result)
    }

    /// Returns `None` when the item was skipped, else the number of tags attached.
    fn tag_item(&mut self, item: &MediaItem) -> Result<Option<usize>> {
        if item.is_video {
            self.store.update_label(&item.uri, LABEL_EMPTY)?;
            return Ok(None);
        }

        let image = match image::open(Path::new(&item.uri)) {
            Ok(image) => image,
            Err(e) => {
                debug!(uri = %item.uri, error = %e, "Cannot decode image");
                self.store.update_label(&item.uri, LABEL_EMPTY)?;
                return Ok(None);
            }
        };

        let labels = match self.classifier.classify(&image, self.top_k) {
            Ok(labels) => labels,
            Err(e) => {
                warn!(uri = %item.uri, error = %e, "Classification failed");
                self.store.update_label(&item.uri, LABEL_EMPTY)?;
                return Ok(None);
            }
        };
        let tags = self.mapper.map_all(&labels);

        let repo = TagRepository::new(self.store);
        for tag in &tags {
            repo.add_auto_tag(&item.uri, tag.tag_type, &tag.name, tag.score as f64)?;
        }

        self.store.update_label(&item.uri, &build_label_json(&tags)?)?;
        Ok(Some(tags.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{media_item, test_db};
    use crate::db::{Database, ScanState, Tag, TagSource, TagType};
    use crate::labels::summary::parse_label_json;
    use crate::labels::LabelScore;
    use image::{DynamicImage, RgbImage};
    use tempfile::tempdir;

    struct StubClassifier {
        labels: Vec<LabelScore>,
        calls: usize,
    }

    impl StubClassifier {
        fn new(labels: &[(&str, f32)]) -> Self {
            Self {
                labels: labels.iter().map(|(l, s)| LabelScore::new(*l, *s)).collect(),
                calls: 0,
            }
        }
    }

    impl ImageClassifier for StubClassifier {
        fn classify(&mut self, _image: &DynamicImage, top_k: usize) -> Result<Vec<LabelScore>> {
            self.calls += 1;
            Ok(self.labels.iter().take(top_k).cloned().collect())
        }
    }

    struct FailingClassifier;

    impl ImageClassifier for FailingClassifier {
        fn classify(&mut self, _image: &DynamicImage, _top_k: usize) -> Result<Vec<LabelScore>> {
            anyhow::bail!("inference backend unavailable")
        }
    }

    fn write_png(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        RgbImage::new(8, 8).save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_tags_image_and_writes_summary() {
        let dir = tempdir().unwrap();
        let uri = write_png(dir.path(), "party.png");
        let db = test_db();
        db.upsert_media(&[media_item(&uri, "2024-05-01", None)]).unwrap();

        let classifier = StubClassifier::new(&[("Birthday cake", 0.93), ("person", 0.95)]);
        let mut tagger = AutoTagger::new(&db, classifier, LabelMapper::default(), 5);
        let result = tagger.tag_batch(10).unwrap();

        assert_eq!(result, TaggingResult { processed: 1, tagged: 1, skipped: 0 });

        let tags = db.get_media_tags(&uri).unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"Party/Celebration"));
        assert!(names.contains(&"Person"));

        let item = db.get_media(&uri).unwrap().unwrap();
        let summary = parse_label_json(item.label_json.as_deref().unwrap()).unwrap();
        assert_eq!(summary["event"][0].name, "Party/Celebration");
        assert_eq!(summary["people"][0].name, "Person");
    }

    #[test]
    fn test_low_scores_store_empty_summary() {
        let dir = tempdir().unwrap();
        let uri = write_png(dir.path(), "plain.png");
        let db = test_db();
        db.upsert_media(&[media_item(&uri, "2024-05-01", None)]).unwrap();

        let classifier = StubClassifier::new(&[("wedding dress", 0.40)]);
        let mut tagger = AutoTagger::new(&db, classifier, LabelMapper::default(), 5);
        let result = tagger.tag_batch(10).unwrap();

        assert_eq!(result.processed, 1);
        assert_eq!(result.tagged, 0);
        assert_eq!(db.count_tags().unwrap(), 0);
        let item = db.get_media(&uri).unwrap().unwrap();
        assert_eq!(item.label_json.as_deref(), Some(LABEL_EMPTY));
    }

    #[test]
    fn test_videos_and_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();
        let broken = broken.to_string_lossy().into_owned();

        let mut video = media_item("/videos/clip.mp4", "2024-05-01", None);
        video.is_video = true;
        let db = test_db();
        db.upsert_media(&[video, media_item(&broken, "2024-05-02", None)]).unwrap();

        let mut tagger = AutoTagger::new(
            &db,
            StubClassifier::new(&[("person", 0.99)]),
            LabelMapper::default(),
            5,
        );
        let result = tagger.tag_batch(10).unwrap();

        assert_eq!(result.skipped, 2);
        assert_eq!(tagger.classifier.calls, 0);
        assert!(db.get_unlabeled_media(10).unwrap().is_empty());
        assert_eq!(db.count_media_tags().unwrap(), 0);
    }

    #[test]
    fn test_classifier_error_does_not_stop_batch() {
        let dir = tempdir().unwrap();
        let a = write_png(dir.path(), "a.png");
        let b = write_png(dir.path(), "b.png");
        let db = test_db();
        db.upsert_media(&[media_item(&a, "2024-05-01", None), media_item(&b, "2024-05-02", None)])
            .unwrap();

        let mut tagger = AutoTagger::new(&db, FailingClassifier, LabelMapper::default(), 5);
        let result = tagger.tag_batch(10).unwrap();

        assert_eq!(result.processed, 2);
        assert_eq!(result.skipped, 2);
        assert!(db.get_unlabeled_media(10).unwrap().is_empty());
    }

    /// Store whose tag links always fail, everything else goes to a real database.
    struct BrokenLinks<'a>(&'a Database);

    impl MediaStore for BrokenLinks<'_> {
        fn upsert_media(&self, items: &[MediaItem]) -> Result<()> {
            self.0.upsert_media(items)
        }

        fn get_media(&self, uri: &str) -> Result<Option<MediaItem>> {
            self.0.get_media(uri)
        }

        fn get_unlabeled_media(&self, limit: usize) -> Result<Vec<MediaItem>> {
            self.0.get_unlabeled_media(limit)
        }

        fn update_label(&self, uri: &str, label_json: &str) -> Result<()> {
            self.0.update_label(uri, label_json)
        }

        fn get_scan_state(&self) -> Result<Option<ScanState>> {
            self.0.get_scan_state()
        }

        fn save_scan_state(&self, state: &ScanState) -> Result<()> {
            self.0.save_scan_state(state)
        }
    }

    impl TagStore for BrokenLinks<'_> {
        fn insert_tag_or_ignore(
            &self,
            tag_type: TagType,
            name: &str,
            confidence: f64,
            source: TagSource,
        ) -> Result<Option<i64>> {
            self.0.insert_tag_or_ignore(tag_type, name, confidence, source)
        }

        fn find_tag_by_id(&self, id: i64) -> Result<Option<Tag>> {
            self.0.find_tag_by_id(id)
        }

        fn find_tag_by_type_and_name(&self, tag_type: TagType, name: &str) -> Result<Option<Tag>> {
            self.0.find_tag_by_type_and_name(tag_type, name)
        }

        fn link_media_tag(&self, _media_uri: &str, _tag_id: i64) -> Result<()> {
            anyhow::bail!("database is locked")
        }

        fn get_media_tags(&self, media_uri: &str) -> Result<Vec<Tag>> {
            self.0.get_media_tags(media_uri)
        }
    }

    #[test]
    fn test_store_failure_leaves_item_for_retry() {
        let dir = tempdir().unwrap();
        let uri = write_png(dir.path(), "wedding.png");
        let db = test_db();
        db.upsert_media(&[media_item(&uri, "2024-05-01", None)]).unwrap();

        let broken = BrokenLinks(&db);
        let mut tagger = AutoTagger::new(
            &broken,
            StubClassifier::new(&[("wedding", 0.97)]),
            LabelMapper::default(),
            5,
        );
        assert!(tagger.tag_batch(10).is_err());

        let item = db.get_media(&uri).unwrap().unwrap();
        assert_eq!(item.label_json, None);
        assert_eq!(db.count_media_tags().unwrap(), 0);

        // The next pass against a healthy store completes the item
        let mut tagger = AutoTagger::new(
            &db,
            StubClassifier::new(&[("wedding", 0.97)]),
            LabelMapper::default(),
            5,
        );
        assert_eq!(tagger.tag_batch(10).unwrap().tagged, 1);
        assert_eq!(db.count_tags().unwrap(), 1);
        assert_eq!(db.count_media_tags().unwrap(), 1);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempdir().unwrap();
        let uri = write_png(dir.path(), "wedding.png");
        let db = test_db();
        db.upsert_media(&[media_item(&uri, "2024-05-01", None)]).unwrap();

        let mut tagger = AutoTagger::new(
            &db,
            StubClassifier::new(&[("wedding", 0.97)]),
            LabelMapper::default(),
            5,
        );
        assert_eq!(tagger.tag_batch(10).unwrap().tagged, 1);

        // A rescan keeps the summary, so the item is not queued again
        db.upsert_media(&[media_item(&uri, "2024-05-01", None)]).unwrap();
        TagRepository::new(&db)
            .add_auto_tag(&uri, TagType::Event, "Wedding", 0.97)
            .unwrap();

        assert_eq!(db.count_tags().unwrap(), 1);
        assert_eq!(db.count_media_tags().unwrap(), 1);
        assert_eq!(tagger.tag_batch(10).unwrap().processed, 0);
    }
}
