//! Content model: practice items and the categories they are grouped in.
//!
//! Items are read-only once loaded. A `ContentSource` hands out a shared
//! slice per category; the slice is never mutated while a session indexes
//! into it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils;

/// One practice unit.
///
/// `character` may be empty (pure pinyin teaching content) and both
/// `character` and `display_pinyin` may span several `\n`-separated lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct WordItem {
    pub character: String,
    /// Plain letters used for matching (informational; validation uses
    /// the transcoded `display_pinyin`)
    pub pinyin: String,
    /// Tone-marked pinyin, one space-separated syllable per character
    #[serde(rename = "displayPinyin")]
    pub display_pinyin: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub definition: String,
}

impl WordItem {
    pub fn new(character: &str, pinyin: &str, display_pinyin: &str) -> Self {
        Self {
            character: character.to_string(),
            pinyin: pinyin.to_string(),
            display_pinyin: display_pinyin.to_string(),
            emoji: String::new(),
            definition: String::new(),
        }
    }

    /// Number of characters (code points) in `character`.
    pub fn char_count(&self) -> usize {
        self.character.chars().count()
    }

    /// Text handed to narration when the whole item is spoken.
    pub fn spoken_text(&self) -> &str {
        &self.character
    }
}

/// Content modes a session can be started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentCategory {
    HomeRow,
    LetterGame,
    InitialsTeaching,
    FinalsTeaching,
    Easy,
    Medium,
    Hard,
    Xiehouyu,
    Article,
    TangPoetry,
    TengwangGeXu,
    EnglishPrimary,
    DailyEnglish,
    ProgrammingVocab,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 14] = [
        Self::HomeRow,
        Self::LetterGame,
        Self::InitialsTeaching,
        Self::FinalsTeaching,
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::Xiehouyu,
        Self::Article,
        Self::TangPoetry,
        Self::TengwangGeXu,
        Self::EnglishPrimary,
        Self::DailyEnglish,
        Self::ProgrammingVocab,
    ];

    /// Stable key used in content documents and progress files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::HomeRow => "homeRow",
            Self::LetterGame => "letterGame",
            Self::InitialsTeaching => "initialsTeaching",
            Self::FinalsTeaching => "finalsTeaching",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Xiehouyu => "xiehouyu",
            Self::Article => "articles",
            Self::TangPoetry => "tangPoetry",
            Self::TengwangGeXu => "tengwangGeXu",
            Self::EnglishPrimary => "englishPrimary",
            Self::DailyEnglish => "dailyEnglish",
            Self::ProgrammingVocab => "programmingVocab",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }

    /// Letter drills run the practice session instead of item typing.
    pub fn is_practice(&self) -> bool {
        matches!(self, Self::HomeRow | Self::LetterGame)
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown content category: {}", s))
    }
}

/// Read-only source of items per category.
pub trait ContentSource {
    /// Items for `category`. Empty when the category has no content.
    fn items(&mut self, category: ContentCategory) -> Arc<[WordItem]>;
}

/// Content loaded from the `{ "easy": [...], "medium": [...] }` JSON
/// layout. Extra per-category files can be registered and are only read
/// the first time their category is requested.
#[derive(Debug, Default)]
pub struct JsonContentSource {
    loaded: HashMap<ContentCategory, Arc<[WordItem]>>,
    deferred: HashMap<ContentCategory, PathBuf>,
}

type RawDocument = HashMap<String, Vec<WordItem>>;

impl JsonContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a content document. Unknown keys are ignored.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let mut source = Self::new();
        source.merge_document(parse_document(json)?);
        Ok(source)
    }

    /// Load a content document from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read content {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("parse content {}", path.display()))
    }

    /// Register a file that holds `category` and is read on first use.
    pub fn defer_file<P: Into<PathBuf>>(&mut self, category: ContentCategory, path: P) {
        self.deferred.insert(category, path.into());
    }

    /// Replace the items of a category.
    pub fn insert(&mut self, category: ContentCategory, items: Vec<WordItem>) {
        self.loaded.insert(category, normalize_items(items).into());
    }

    pub fn has_loaded(&self) -> bool {
        !self.loaded.is_empty()
    }

    fn merge_document(&mut self, doc: RawDocument) {
        for (key, items) in doc {
            match ContentCategory::from_key(&key) {
                Some(category) => self.insert(category, items),
                None => debug!(key = %key, "ignoring unknown content key"),
            }
        }
    }

    fn load_deferred(&mut self, category: ContentCategory) {
        let Some(path) = self.deferred.remove(&category) else {
            return;
        };
        let loaded = std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|json| parse_document(&json));
        match loaded {
            Ok(mut doc) => {
                let items = doc.remove(category.key()).unwrap_or_default();
                debug!(%category, count = items.len(), "loaded deferred content");
                self.insert(category, items);
            }
            Err(e) => warn!(%category, path = %path.display(), "failed to load content: {e:#}"),
        }
    }
}

impl ContentSource for JsonContentSource {
    fn items(&mut self, category: ContentCategory) -> Arc<[WordItem]> {
        if !self.loaded.contains_key(&category) {
            self.load_deferred(category);
        }
        self.loaded
            .get(&category)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

fn parse_document(json: &str) -> anyhow::Result<RawDocument> {
    Ok(serde_json::from_str(json)?)
}

/// Content files mix precomposed and combining tone marks; settle on NFC so
/// every item transcodes the same way.
fn normalize_items(items: Vec<WordItem>) -> Vec<WordItem> {
    items
        .into_iter()
        .map(|mut item| {
            item.display_pinyin = normalize_lines(&item.display_pinyin);
            item.character = normalize_lines(&item.character);
            item
        })
        .collect()
}

fn normalize_lines(text: &str) -> String {
    text.split('\n')
        .map(utils::normalize)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "easy": [
            { "character": "好", "pinyin": "hao", "displayPinyin": "hǎo", "emoji": "👍" }
        ],
        "articles": [
            { "character": "春眠不觉晓，\n处处闻啼鸟。", "pinyin": "", "displayPinyin": "chūn mián bù jué xiǎo\nchù chù wén tí niǎo" }
        ],
        "somethingElse": []
    }"#;

    #[test]
    fn test_parse_document() {
        let mut source = JsonContentSource::from_json_str(DOC).unwrap();
        let easy = source.items(ContentCategory::Easy);
        assert_eq!(easy.len(), 1);
        assert_eq!(easy[0].character, "好");
        assert_eq!(easy[0].emoji, "👍");
        assert_eq!(easy[0].definition, "");

        let article = source.items(ContentCategory::Article);
        assert_eq!(article[0].display_pinyin.lines().count(), 2);

        assert!(source.items(ContentCategory::Hard).is_empty());
    }

    #[test]
    fn test_combining_marks_are_composed() {
        let mut source = JsonContentSource::new();
        // "hǎo" written with a combining caron
        source.insert(
            ContentCategory::Easy,
            vec![WordItem::new("好", "hao", "ha\u{030C}o")],
        );
        assert_eq!(source.items(ContentCategory::Easy)[0].display_pinyin, "hǎo");
    }

    #[test]
    fn test_deferred_file_loaded_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tang_poetry.json");
        std::fs::write(
            &path,
            r#"{ "tangPoetry": [ { "character": "静夜思", "pinyin": "jingyesi", "displayPinyin": "jìng yè sī" } ] }"#,
        )
        .unwrap();

        let mut source = JsonContentSource::new();
        source.defer_file(ContentCategory::TangPoetry, &path);
        assert!(!source.has_loaded());
        assert_eq!(source.items(ContentCategory::TangPoetry)[0].character, "静夜思");
    }

    #[test]
    fn test_missing_deferred_file_yields_empty() {
        let mut source = JsonContentSource::new();
        source.defer_file(ContentCategory::TengwangGeXu, "/nonexistent/tengwang.json");
        assert!(source.items(ContentCategory::TengwangGeXu).is_empty());
    }

    #[test]
    fn test_category_keys_roundtrip() {
        for category in ContentCategory::ALL {
            assert_eq!(category.key().parse::<ContentCategory>(), Ok(category));
        }
        assert!(ContentCategory::LetterGame.is_practice());
        assert!(!ContentCategory::Easy.is_practice());
    }
}
