#![allow(dead_code)]

use arena_core::{WordBank, WordFilter};
use arena_persistence::NewProfile;
use arena_persistence::connection::connect_to_memory_database;
use arena_server::battle_manager::BattleManager;
use arena_server::config::Config;
use arena_server::state::AppState;
use arena_types::{Profile, Question, Subject, WordEntry};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use uuid::Uuid;

pub const QUESTIONS_PER_BATTLE: usize = 5;

const GRADE_THREE_WORDS: [(&str, &str); 18] = [
    ("apple", "苹果"),
    ("banana", "香蕉"),
    ("bread", "面包"),
    ("orange", "橙子"),
    ("milk", "牛奶"),
    ("rice", "米饭"),
    ("teacher", "老师"),
    ("pencil", "铅笔"),
    ("ruler", "尺子"),
    ("eraser", "橡皮"),
    ("schoolbag", "书包"),
    ("classroom", "教室"),
    ("mother", "母亲"),
    ("father", "父亲"),
    ("sister", "姐妹"),
    ("brother", "兄弟"),
    ("rabbit", "兔子"),
    ("tiger", "老虎"),
];

const MATH_WORDS: [(&str, &str); 4] = [
    ("triangle", "三角形"),
    ("square", "正方形"),
    ("circle", "圆形"),
    ("fraction", "分数"),
];

pub fn word(word: &str, meaning: &str, grade: i32, subject: Subject) -> WordEntry {
    WordEntry {
        id: Uuid::new_v4(),
        word: word.to_string(),
        meaning: meaning.to_string(),
        phonetic: None,
        topic: "test".to_string(),
        grade,
        subject,
    }
}

/// Every meaning is unique so a question's answer can be looked up by its word.
pub fn test_words() -> Vec<WordEntry> {
    GRADE_THREE_WORDS
        .iter()
        .map(|(w, m)| word(w, m, 3, Subject::English))
        .chain(MATH_WORDS.iter().map(|(w, m)| word(w, m, 4, Subject::Math)))
        .collect()
}

pub fn test_config() -> Config {
    Config {
        questions_per_battle: QUESTIONS_PER_BATTLE,
        ..Config::for_development()
    }
}

/// Fresh in-memory database, seeded word list and dev-mode auth.
pub async fn setup_state() -> AppState {
    setup_state_with(test_config()).await
}

pub async fn setup_state_with(config: Config) -> AppState {
    setup_state_with_words(config, test_words()).await
}

pub async fn setup_state_with_words(config: Config, seed: Vec<WordEntry>) -> AppState {
    let db = connect_to_memory_database().await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let words = arena_persistence::WordRepository::new(db.clone());
    words.insert_words(&seed).await.unwrap();
    let entries = words
        .find_words(&WordFilter::default(), None)
        .await
        .unwrap();

    AppState::new(config, db, WordBank::from_entries(entries)).unwrap()
}

/// A battle manager over the same database with no live sessions, as after a restart.
pub fn fresh_battle_manager(state: &AppState) -> BattleManager {
    BattleManager::new(
        state.word_bank.clone(),
        state.profiles.clone(),
        state.matches.clone(),
        state.teams.clone(),
        state.connections.clone(),
        state.config.questions_per_battle,
        state.config.question_time_limit(),
    )
}

/// Dev-mode bearer token for `name`; the id is derived from the name.
pub fn dev_token(name: &str) -> String {
    format!("Bearer {}:{}@test.com:{}", name, name, capitalize(name))
}

pub fn admin_token(name: &str) -> String {
    format!("{}:admin", dev_token(name))
}

pub fn dev_user_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn create_profile(state: &AppState, name: &str, grade: i32) -> Profile {
    state
        .profiles
        .create_profile(
            NewProfile {
                id: dev_user_id(name),
                display_name: capitalize(name),
                grade,
                max_energy: state.config.energy_max,
            },
            Utc::now(),
        )
        .await
        .unwrap()
}

/// Index of the right meaning among a question's choices.
pub fn correct_choice(state: &AppState, question: &Question) -> u32 {
    let entry = state
        .word_bank
        .entries()
        .iter()
        .find(|entry| entry.word == question.word)
        .unwrap();
    question
        .choices
        .iter()
        .position(|choice| *choice == entry.meaning)
        .unwrap() as u32
}

pub fn wrong_choice(state: &AppState, question: &Question) -> u32 {
    let correct = correct_choice(state, question);
    (correct + 1) % question.choices.len() as u32
}
