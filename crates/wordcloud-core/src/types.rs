//! Word cloud data model.
//!
//! A [`Snapshot`] is the whole cloud: words, directed connections between
//! them, and the time of the last change. It is the unit that gets persisted
//! to disk and pushed to viewers.
//!
//! Word keys are matched case-insensitively everywhere, but the casing a word
//! was first added with is what gets stored and displayed.

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::category::{self, DEFAULT_CATEGORY};
use crate::error::{Error, Result};

/// Smallest word size.
pub const MIN_SIZE: u8 = 1;

/// Largest word size.
pub const MAX_SIZE: u8 = 10;

/// Size used when a caller does not give one.
pub const DEFAULT_SIZE: u8 = 5;

/// Current local time as an ISO-8601 string.
pub fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Case-insensitive key comparison used for words and connection endpoints.
pub fn keys_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Clamp an arbitrary numeric size into `MIN_SIZE..=MAX_SIZE`.
pub fn clamp_size(size: f64) -> u8 {
    if size.is_nan() {
        return DEFAULT_SIZE;
    }
    size.trunc().clamp(MIN_SIZE as f64, MAX_SIZE as f64) as u8
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

// Files from earlier releases store legacy category keys.
fn category_key<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|key| category::canonical_key(&key))
}

fn default_size() -> u8 {
    DEFAULT_SIZE
}

/// A word in the cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category", deserialize_with = "category_key")]
    pub category: String,
    #[serde(default = "default_size")]
    pub size: u8,
    #[serde(default)]
    pub added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// A directed edge between two words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub added: String,
}

impl Connection {
    /// Whether this connection links `source` to `target` (case-insensitive).
    pub fn links(&self, source: &str, target: &str) -> bool {
        keys_match(&self.source, source) && keys_match(&self.target, target)
    }

    /// Whether either endpoint is `word` (case-insensitive).
    pub fn touches(&self, word: &str) -> bool {
        keys_match(&self.source, word) || keys_match(&self.target, word)
    }
}

/// Input for adding or updating a word.
#[derive(Debug, Clone, Default)]
pub struct NewWord {
    pub word: String,
    pub description: String,
    /// Explicit category; auto-detected from word and description when `None`.
    pub category: Option<String>,
    pub size: Option<u8>,
}

impl NewWord {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn size(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }
}

/// Whether an upsert created a new record or changed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Upsert {
    Added,
    Updated,
}

/// Full state of the cloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub words: Vec<Word>,
    /// Older files predate connections; a missing field reads as empty.
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub last_update: Option<String>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a word by key (case-insensitive).
    pub fn find_word(&self, key: &str) -> Option<&Word> {
        self.words.iter().find(|w| keys_match(&w.word, key))
    }

    /// Whether a word with this key exists (case-insensitive).
    pub fn contains_word(&self, key: &str) -> bool {
        self.find_word(key).is_some()
    }

    /// Find a connection by endpoints (case-insensitive).
    pub fn find_connection(&self, source: &str, target: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.links(source, target))
    }

    /// Add a word, or update the attributes of an existing one.
    ///
    /// Surrounding whitespace is stripped from the word. An existing word keeps
    /// the casing it was first added with; description, category and size are
    /// replaced.
    pub fn upsert_word(&mut self, input: NewWord) -> Result<Upsert> {
        let key = input.word.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput("word must not be empty".to_string()));
        }

        let category = input
            .category
            .map(|key| category::canonical_key(&key))
            .unwrap_or_else(|| category::auto_categorize(key, &input.description).to_string());
        let size = input.size.unwrap_or(DEFAULT_SIZE).clamp(MIN_SIZE, MAX_SIZE);

        if let Some(existing) = self.words.iter_mut().find(|w| keys_match(&w.word, key)) {
            existing.description = input.description;
            existing.category = category;
            existing.size = size;
            existing.updated = Some(timestamp());
            return Ok(Upsert::Updated);
        }

        self.words.push(Word {
            word: key.to_string(),
            description: input.description,
            category,
            size,
            added: timestamp(),
            updated: None,
        });
        Ok(Upsert::Added)
    }

    /// Remove a word and every connection that touches it.
    ///
    /// Returns the number of connections removed along with the word.
    pub fn remove_word(&mut self, key: &str) -> Result<usize> {
        let before = self.words.len();
        self.words.retain(|w| !keys_match(&w.word, key));
        if self.words.len() == before {
            return Err(Error::WordNotFound(key.to_string()));
        }

        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(key));
        Ok(before - self.connections.len())
    }

    /// Add a directed connection, or relabel an existing one.
    ///
    /// Both endpoints must already be words. The stored endpoints use the
    /// words' stored casing.
    pub fn add_connection(&mut self, source: &str, target: &str, label: &str) -> Result<Upsert> {
        let source = self
            .find_word(source)
            .map(|w| w.word.clone())
            .ok_or_else(|| Error::WordNotFound(source.to_string()))?;
        let target = self
            .find_word(target)
            .map(|w| w.word.clone())
            .ok_or_else(|| Error::WordNotFound(target.to_string()))?;

        if let Some(existing) = self
            .connections
            .iter_mut()
            .find(|c| c.links(&source, &target))
        {
            existing.label = label.to_string();
            return Ok(Upsert::Updated);
        }

        self.connections.push(Connection {
            source,
            target,
            label: label.to_string(),
            added: timestamp(),
        });
        Ok(Upsert::Added)
    }

    /// Remove the connection from `source` to `target`.
    pub fn remove_connection(&mut self, source: &str, target: &str) -> Result<()> {
        let before = self.connections.len();
        self.connections.retain(|c| !c.links(source, target));
        if self.connections.len() == before {
            return Err(Error::ConnectionNotFound {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    /// Drop all words and connections, returning how many of each were removed.
    pub fn clear(&mut self) -> (usize, usize) {
        let counts = (self.words.len(), self.connections.len());
        self.words.clear();
        self.connections.clear();
        counts
    }

    /// Words ordered by size, largest first. Ties keep insertion order.
    pub fn words_by_size(&self) -> Vec<&Word> {
        let mut words: Vec<&Word> = self.words.iter().collect();
        words.sort_by(|a, b| b.size.cmp(&a.size));
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(words: &[&str]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for word in words {
            snapshot.upsert_word(NewWord::new(*word)).unwrap();
        }
        snapshot
    }

    #[test]
    fn test_upsert_keeps_first_casing_latest_attributes() {
        let mut snapshot = Snapshot::new();
        let first = snapshot
            .upsert_word(NewWord::new("Rust").description("systems").size(3))
            .unwrap();
        let second = snapshot
            .upsert_word(NewWord::new("RUST").description("language").size(9))
            .unwrap();

        assert_eq!(first, Upsert::Added);
        assert_eq!(second, Upsert::Updated);
        assert_eq!(snapshot.words.len(), 1);

        let word = &snapshot.words[0];
        assert_eq!(word.word, "Rust");
        assert_eq!(word.description, "language");
        assert_eq!(word.size, 9);
        assert!(word.updated.is_some());
    }

    #[test]
    fn test_upsert_rejects_empty_word() {
        let mut snapshot = Snapshot::new();
        assert!(matches!(
            snapshot.upsert_word(NewWord::new("  ")),
            Err(Error::InvalidInput(_))
        ));
        assert!(snapshot.words.is_empty());
    }

    #[test]
    fn test_upsert_clamps_size_and_categorizes() {
        let mut snapshot = Snapshot::new();
        snapshot.upsert_word(NewWord::new("Docker").size(42)).unwrap();
        assert_eq!(snapshot.words[0].size, MAX_SIZE);
        assert_eq!(snapshot.words[0].category, "tool");

        snapshot
            .upsert_word(NewWord::new("Kanban").category("method").size(0))
            .unwrap();
        assert_eq!(snapshot.words[1].size, MIN_SIZE);
        assert_eq!(snapshot.words[1].category, "method");
    }

    #[test]
    fn test_clamp_size() {
        assert_eq!(clamp_size(7.9), 7);
        assert_eq!(clamp_size(-3.0), MIN_SIZE);
        assert_eq!(clamp_size(100.0), MAX_SIZE);
        assert_eq!(clamp_size(f64::NAN), DEFAULT_SIZE);
    }

    #[test]
    fn test_remove_word_cascades_connections() {
        let mut snapshot = cloud(&["Go", "Concurrency", "Rust"]);
        snapshot.add_connection("Go", "Concurrency", "enables").unwrap();
        snapshot.add_connection("rust", "GO", "").unwrap();
        snapshot.add_connection("Rust", "Concurrency", "").unwrap();

        let removed = snapshot.remove_word("go").unwrap();

        assert_eq!(removed, 2);
        assert_eq!(snapshot.connections.len(), 1);
        assert!(snapshot.find_word("Go").is_none());
        assert!(snapshot.find_connection("Rust", "Concurrency").is_some());
    }

    #[test]
    fn test_remove_missing_word() {
        let mut snapshot = cloud(&["Go"]);
        assert!(matches!(
            snapshot.remove_word("Rust"),
            Err(Error::WordNotFound(w)) if w == "Rust"
        ));
        assert_eq!(snapshot.words.len(), 1);
    }

    #[test]
    fn test_add_connection_requires_both_words() {
        let mut snapshot = cloud(&["Go"]);
        assert!(snapshot.add_connection("Go", "Missing", "").is_err());
        assert!(snapshot.add_connection("Missing", "Go", "").is_err());
        assert!(snapshot.connections.is_empty());
    }

    #[test]
    fn test_add_connection_uses_stored_casing_and_relabels() {
        let mut snapshot = cloud(&["Go", "Concurrency"]);
        assert_eq!(
            snapshot.add_connection("go", "concurrency", "").unwrap(),
            Upsert::Added
        );
        assert_eq!(
            snapshot.add_connection("GO", "CONCURRENCY", "enables").unwrap(),
            Upsert::Updated
        );

        assert_eq!(snapshot.connections.len(), 1);
        let connection = &snapshot.connections[0];
        assert_eq!(connection.source, "Go");
        assert_eq!(connection.target, "Concurrency");
        assert_eq!(connection.label, "enables");
    }

    #[test]
    fn test_connections_are_directed() {
        let mut snapshot = cloud(&["A", "B"]);
        snapshot.add_connection("A", "B", "").unwrap();
        snapshot.add_connection("B", "A", "").unwrap();
        assert_eq!(snapshot.connections.len(), 2);

        snapshot.remove_connection("b", "a").unwrap();
        assert!(snapshot.find_connection("A", "B").is_some());
        assert!(snapshot.remove_connection("B", "A").is_err());
    }

    #[test]
    fn test_clear() {
        let mut snapshot = cloud(&["A", "B"]);
        snapshot.add_connection("A", "B", "").unwrap();
        assert_eq!(snapshot.clear(), (2, 1));
        assert!(snapshot.words.is_empty());
        assert!(snapshot.connections.is_empty());
    }

    #[test]
    fn test_words_by_size() {
        let mut snapshot = Snapshot::new();
        snapshot.upsert_word(NewWord::new("small").size(2)).unwrap();
        snapshot.upsert_word(NewWord::new("big").size(9)).unwrap();
        snapshot.upsert_word(NewWord::new("mid").size(5)).unwrap();

        let order: Vec<&str> = snapshot
            .words_by_size()
            .iter()
            .map(|w| w.word.as_str())
            .collect();
        assert_eq!(order, vec!["big", "mid", "small"]);
    }

    #[test]
    fn test_missing_connections_field_reads_as_empty() {
        let json = r#"{
            "words": [{"word": "Go", "description": "", "category": "language", "size": 5, "added": "2024-01-01T00:00:00"}],
            "last_update": "2024-01-01T00:00:00"
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.words.len(), 1);
        assert!(snapshot.connections.is_empty());
    }

    #[test]
    fn test_legacy_category_keys_are_normalised() {
        let json = r#"{
            "words": [
                {"word": "Docker", "category": "verktyg", "size": 5, "added": ""},
                {"word": "Mystery", "category": "archive", "size": 5, "added": ""}
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.words[0].category, "tool");
        assert_eq!(snapshot.words[1].category, "archive");

        let mut snapshot = Snapshot::new();
        snapshot
            .upsert_word(NewWord::new("Scrum").category("metod"))
            .unwrap();
        assert_eq!(snapshot.words[0].category, "method");
    }

    #[test]
    fn test_upsert_trims_surrounding_whitespace() {
        let mut snapshot = Snapshot::new();
        snapshot.upsert_word(NewWord::new("Go ")).unwrap();
        assert_eq!(snapshot.words[0].word, "Go");

        assert_eq!(
            snapshot.upsert_word(NewWord::new("  go")).unwrap(),
            Upsert::Updated
        );
        assert_eq!(snapshot.words.len(), 1);
        assert!(snapshot.upsert_word(NewWord::new("   ")).is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let snapshot = cloud(&["Go"]);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value["words"][0]["word"].is_string());
        assert!(value["connections"].is_array());
        assert!(value.get("last_update").is_some());
        // `updated` only appears once a word has been re-added
        assert!(value["words"][0].get("updated").is_none());
    }
}
