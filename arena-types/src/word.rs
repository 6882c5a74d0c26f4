use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Subject {
    English,
    Math,
    Science,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::English => "english",
            Subject::Math => "math",
            Subject::Science => "science",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "english" => Some(Subject::English),
            "math" => Some(Subject::Math),
            "science" => Some(Subject::Science),
            _ => None,
        }
    }
}

/// Static vocabulary content used to build quiz levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordEntry {
    pub id: Uuid,
    pub word: String,
    pub meaning: String,
    pub phonetic: Option<String>,
    pub topic: String,
    pub grade: i32,
    pub subject: Subject,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StudySession {
    pub words: Vec<WordEntry>,
    pub energy_remaining: i32,
    pub xp_awarded: i32,
}
