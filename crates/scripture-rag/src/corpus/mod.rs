//! Corpus Index
//!
//! Exact verse text keyed by (work_id, chapter, verse), plus the alias table
//! used to resolve loosely spelled work names. Read-only once loaded, so one
//! index can be shared (behind an `Arc`) by any number of routing engines.

mod loader;

pub use loader::{work_id_for_stem, CorpusLoadError, RecordParseError};

use std::collections::{BTreeMap, HashMap};

use crate::config::CorpusConfig;
use crate::fuzzy;
use crate::types::VerseRecord;

type VerseKey = (String, u32, u32);

/// Human-readable work name mapped to its canonical id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAlias {
    /// Lowercase, spaces instead of underscores, e.g. `1 john`.
    pub alias: String,
    pub work_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkMatch<'a> {
    pub work_id: &'a str,
    pub alias: &'a str,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerseLookup<'a> {
    Found(&'a str),
    WorkNotRecognized,
    VerseNotFound,
}

impl VerseLookup<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Verses of a requested range that exist, in verse order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassageLookup<'a> {
    Found {
        work_id: &'a str,
        title: &'a str,
        verses: Vec<&'a VerseRecord>,
    },
    WorkNotRecognized,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub works: usize,
    pub verses: usize,
    pub skipped_non_body: usize,
    pub malformed: Vec<RecordParseError>,
}

#[derive(Debug, Clone)]
pub struct CorpusIndex {
    verses: BTreeMap<VerseKey, VerseRecord>,
    /// Load order; fixes the tie-break for equally scored aliases.
    aliases: Vec<WorkAlias>,
    titles: HashMap<String, String>,
    match_threshold: u8,
}

/// Lowercase and treat underscores as spaces.
pub fn normalize_work_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

impl CorpusIndex {
    pub fn new(match_threshold: u8) -> Self {
        Self {
            verses: BTreeMap::new(),
            aliases: Vec::new(),
            titles: HashMap::new(),
            match_threshold,
        }
    }

    /// Read every work file under `config.root`.
    pub fn load(config: &CorpusConfig) -> Result<(Self, LoadReport), CorpusLoadError> {
        let mut index = Self::new(config.work_match_threshold);
        let mut report = LoadReport::default();

        for path in loader::work_files(&config.root)? {
            let file = loader::read_work_file(&path, &config.body_record_type)?;
            index.register_work(&file.stem);

            report.works += 1;
            report.skipped_non_body += file.skipped_non_body;
            report.malformed.extend(file.malformed);
            for record in file.records {
                index.insert(record);
            }
        }
        report.verses = index.len();

        tracing::info!(
            root = %config.root.display(),
            works = report.works,
            verses = report.verses,
            skipped_non_body = report.skipped_non_body,
            malformed = report.malformed.len(),
            "Corpus loaded"
        );

        Ok((index, report))
    }

    /// Register a work by its file stem, returning the canonical id.
    /// Registering the same work twice keeps the first alias position.
    pub fn register_work(&mut self, stem: &str) -> String {
        let work_id = work_id_for_stem(stem);
        let alias = normalize_work_name(&work_id);
        if !self.aliases.iter().any(|a| a.work_id == work_id) {
            self.aliases.push(WorkAlias {
                alias,
                work_id: work_id.clone(),
            });
            self.titles
                .insert(work_id.clone(), stem.trim().replace('_', " "));
        }
        work_id
    }

    /// Insert a verse; its work is registered first if needed.
    /// A later record with the same key replaces the earlier one.
    pub fn insert(&mut self, record: VerseRecord) {
        if !self.titles.contains_key(&record.work_id) {
            self.register_work(&record.work_id);
        }
        let key = (record.work_id.clone(), record.chapter, record.verse);
        if self.verses.insert(key, record).is_some() {
            tracing::debug!("Duplicate verse key replaced");
        }
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn aliases(&self) -> &[WorkAlias] {
        &self.aliases
    }

    /// Display title for a work id, e.g. `1 John`.
    pub fn title(&self, work_id: &str) -> Option<&str> {
        self.titles.get(work_id).map(String::as_str)
    }

    /// All verses in (work_id, chapter, verse) order.
    pub fn records(&self) -> impl Iterator<Item = &VerseRecord> + '_ {
        self.verses.values()
    }

    /// Best alias for an approximate work name, if it clears the threshold.
    pub fn resolve_work(&self, name: &str) -> Option<WorkMatch<'_>> {
        let normalized = normalize_work_name(name);
        let best = fuzzy::best_match(&normalized, self.aliases.iter().map(|a| &a.alias))?;

        if best.score < self.match_threshold {
            tracing::debug!(
                query = %name,
                best = %best.candidate,
                score = best.score,
                "Work name below match threshold"
            );
            return None;
        }

        let alias = &self.aliases[best.index];
        Some(WorkMatch {
            work_id: &alias.work_id,
            alias: &alias.alias,
            score: best.score,
        })
    }

    pub fn get_verse(&self, work_name: &str, chapter: u32, verse: u32) -> VerseLookup<'_> {
        let Some(work) = self.resolve_work(work_name) else {
            return VerseLookup::WorkNotRecognized;
        };
        match self.verses.get(&(work.work_id.to_string(), chapter, verse)) {
            Some(record) => VerseLookup::Found(&record.text),
            None => VerseLookup::VerseNotFound,
        }
    }

    /// Inclusive verse range within one chapter. Missing verses are skipped;
    /// an empty `verses` list means nothing in the range exists.
    pub fn get_passage(
        &self,
        work_name: &str,
        chapter: u32,
        verse_start: u32,
        verse_end: u32,
    ) -> PassageLookup<'_> {
        let Some(work) = self.resolve_work(work_name) else {
            return PassageLookup::WorkNotRecognized;
        };
        let (start, end) = if verse_start <= verse_end {
            (verse_start, verse_end)
        } else {
            (verse_end, verse_start)
        };

        let from = (work.work_id.to_string(), chapter, start);
        let to = (work.work_id.to_string(), chapter, end);
        let verses = self.verses.range(from..=to).map(|(_, record)| record).collect();

        PassageLookup::Found {
            work_id: work.work_id,
            title: self.title(work.work_id).unwrap_or(work.alias),
            verses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_work(dir: &Path, stem: &str, verses: &[(u32, u32, &str)]) {
        let records: Vec<serde_json::Value> = verses
            .iter()
            .map(|(c, v, text)| {
                serde_json::json!({
                    "type": "paragraph text",
                    "chapterNumber": c,
                    "verseNumber": v,
                    "value": text,
                })
            })
            .collect();
        std::fs::write(
            dir.join(format!("{}.json", stem)),
            serde_json::to_string(&records).unwrap(),
        )
        .unwrap();
    }

    fn sample_index() -> (tempfile::TempDir, CorpusIndex) {
        let dir = tempfile::tempdir().unwrap();
        write_work(
            dir.path(),
            "John",
            &[
                (3, 16, "For God so loved the world"),
                (3, 17, "For God sent not his Son into the world to condemn the world"),
                (3, 18, "He that believeth on him is not condemned"),
            ],
        );
        write_work(dir.path(), "1_John", &[(4, 8, "He that loveth not knoweth not God; for God is love.")]);
        write_work(dir.path(), "Romans", &[(8, 28, "And we know that all things work together for good")]);
        write_work(dir.path(), "Genesis", &[(1, 1, "In the beginning God created the heaven and the earth.")]);

        let config = CorpusConfig {
            root: dir.path().to_path_buf(),
            body_record_type: "paragraph text".to_string(),
            work_match_threshold: 70,
        };
        let (index, report) = CorpusIndex::load(&config).unwrap();
        assert_eq!(report.works, 4);
        assert_eq!(report.verses, 6);
        (dir, index)
    }

    #[test]
    fn test_load_missing_root_is_fatal() {
        let config = CorpusConfig {
            root: "/no/such/corpus".into(),
            body_record_type: "paragraph text".to_string(),
            work_match_threshold: 70,
        };
        assert!(matches!(
            CorpusIndex::load(&config),
            Err(CorpusLoadError::RootMissing { .. })
        ));
    }

    #[test]
    fn test_aliases_follow_file_order() {
        let (_dir, index) = sample_index();
        let aliases: Vec<_> = index.aliases().iter().map(|a| a.alias.as_str()).collect();
        assert_eq!(aliases, vec!["1 john", "genesis", "john", "romans"]);
        assert_eq!(index.title("1_john"), Some("1 John"));
    }

    #[test]
    fn test_every_record_work_has_alias() {
        let (_dir, index) = sample_index();
        for record in index.records() {
            assert!(index.aliases().iter().any(|a| a.work_id == record.work_id));
        }
    }

    #[test]
    fn test_resolve_canonical_id_is_idempotent() {
        let (_dir, index) = sample_index();
        for alias in index.aliases() {
            let resolved = index.resolve_work(&alias.work_id).unwrap();
            assert_eq!(resolved.work_id, alias.work_id);
            assert_eq!(resolved.score, 100);
        }
    }

    #[test]
    fn test_get_verse_exact() {
        let (_dir, index) = sample_index();
        assert_eq!(
            index.get_verse("John", 3, 16),
            VerseLookup::Found("For God so loved the world")
        );
        assert_eq!(
            index.get_verse("1 John", 4, 8),
            VerseLookup::Found("He that loveth not knoweth not God; for God is love.")
        );
    }

    #[test]
    fn test_get_verse_misspelled_work_resolves() {
        let (_dir, index) = sample_index();
        assert!(index.get_verse("Jhon", 3, 16).is_found());
        assert!(index.get_verse("romns", 8, 28).is_found());
    }

    #[test]
    fn test_unrecognized_work_distinct_from_missing_verse() {
        let (_dir, index) = sample_index();
        assert_eq!(index.get_verse("Xyzzy", 3, 16), VerseLookup::WorkNotRecognized);
        assert_eq!(index.get_verse("John", 3, 99), VerseLookup::VerseNotFound);
        assert_eq!(index.get_verse("John", 999, 1), VerseLookup::VerseNotFound);
    }

    #[test]
    fn test_get_passage_skips_missing_verses() {
        let (_dir, index) = sample_index();
        match index.get_passage("john", 3, 15, 40) {
            PassageLookup::Found { work_id, title, verses } => {
                assert_eq!(work_id, "john");
                assert_eq!(title, "John");
                let numbers: Vec<u32> = verses.iter().map(|v| v.verse).collect();
                assert_eq!(numbers, vec![16, 17, 18]);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_get_passage_reversed_bounds() {
        let (_dir, index) = sample_index();
        match index.get_passage("john", 3, 17, 16) {
            PassageLookup::Found { verses, .. } => assert_eq!(verses.len(), 2),
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_insert_registers_unknown_work() {
        let mut index = CorpusIndex::new(70);
        index.insert(VerseRecord {
            work_id: "song_of_songs".to_string(),
            chapter: 2,
            verse: 1,
            text: "I am the rose of Sharon".to_string(),
        });
        assert_eq!(index.aliases()[0].alias, "song of songs");
        assert!(index.get_verse("song of songs", 2, 1).is_found());
    }

    #[test]
    fn test_empty_index_never_fabricates() {
        let index = CorpusIndex::new(70);
        assert!(index.resolve_work("john").is_none());
        assert!(index.is_empty());
    }
}
