use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use arena_types::{Subject, WordEntry};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::warn;
use uuid::Uuid;

/// In-memory vocabulary loaded from a tab-separated word list.
///
/// Each line is `word<TAB>meaning<TAB>phonetic<TAB>topic<TAB>grade[<TAB>subject]`.
/// Empty phonetic columns are allowed, `#` starts a comment line and the
/// subject defaults to English.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    words: Vec<WordEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFilter {
    pub grade: Option<i32>,
    pub subject: Option<Subject>,
    pub topic: Option<String>,
}

impl WordFilter {
    pub fn matches(&self, entry: &WordEntry) -> bool {
        self.grade.is_none_or(|grade| entry.grade == grade)
            && self.subject.is_none_or(|subject| entry.subject == subject)
            && self
                .topic
                .as_deref()
                .is_none_or(|topic| entry.topic.eq_ignore_ascii_case(topic))
    }
}

impl WordBank {
    /// Parse a word list, skipping lines that cannot be read.
    pub fn from_tsv(contents: &str) -> Self {
        let mut words = Vec::new();
        let mut seen = HashSet::new();

        for (line_number, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Ok(entry) => {
                    let key = (entry.word.to_lowercase(), entry.subject, entry.grade);
                    if seen.insert(key) {
                        words.push(entry);
                    }
                }
                Err(e) => warn!("Skipping word list line {}: {}", line_number + 1, e),
            }
        }

        Self { words }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read word list {}", path.display()))?;
        let bank = Self::from_tsv(&contents);
        if bank.is_empty() {
            return Err(anyhow!("Word list {} contains no usable words", path.display()));
        }
        Ok(bank)
    }

    pub fn from_entries(words: Vec<WordEntry>) -> Self {
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn entries(&self) -> &[WordEntry] {
        &self.words
    }

    pub fn contains_word(&self, word: &str) -> bool {
        let word = word.trim();
        self.words.iter().any(|entry| entry.word.eq_ignore_ascii_case(word))
    }

    pub fn filtered(&self, filter: &WordFilter) -> Vec<&WordEntry> {
        self.words.iter().filter(|entry| filter.matches(entry)).collect()
    }

    /// Pick up to `count` distinct random words matching `filter`.
    pub fn random_words<R: Rng + ?Sized>(
        &self,
        filter: &WordFilter,
        count: usize,
        rng: &mut R,
    ) -> Vec<WordEntry> {
        let mut candidates = self.filtered(filter);
        candidates.shuffle(rng);
        candidates.into_iter().take(count).cloned().collect()
    }
}

fn parse_line(line: &str) -> Result<WordEntry> {
    let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
    if columns.len() < 5 {
        return Err(anyhow!("expected at least 5 columns, found {}", columns.len()));
    }

    let word = columns[0];
    let meaning = columns[1];
    if word.is_empty() || meaning.is_empty() {
        return Err(anyhow!("word and meaning are required"));
    }
    if !is_word_text(word) {
        return Err(anyhow!("'{}' contains unsupported characters", word));
    }

    let grade: i32 = columns[4]
        .parse()
        .map_err(|_| anyhow!("grade '{}' is not a number", columns[4]))?;
    let subject = match columns.get(5).filter(|s| !s.is_empty()) {
        Some(raw) => Subject::parse(raw).ok_or_else(|| anyhow!("unknown subject '{}'", raw))?,
        None => Subject::English,
    };

    Ok(WordEntry {
        id: Uuid::new_v4(),
        word: word.to_string(),
        meaning: meaning.to_string(),
        phonetic: Some(columns[2].to_string()).filter(|p| !p.is_empty()),
        topic: columns[3].to_string(),
        grade,
        subject,
    })
}

/// Letters plus the punctuation found in real vocabulary ("mother-in-law", "o'clock", "ice cream").
pub fn is_word_text(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphabetic() || c == '-' || c == '\'' || c == ' ')
        && word.chars().any(char::is_alphabetic)
}
