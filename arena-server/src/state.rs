use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_core::{WordBank, WordFilter};
use arena_persistence::{
    MatchRepository, ProfileRepository, SeasonRepository, SocialRepository, TeamRepository,
    WordRepository,
};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::battle_manager::BattleManager;
use crate::config::{Config, ConfigError};
use crate::matchmaking::RankedQueue;
use crate::realtime::ConnectionManager;

/// Everything a request handler or background task needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub connections: Arc<ConnectionManager>,
    pub battles: Arc<BattleManager>,
    pub ranked_queue: Arc<RankedQueue>,
    pub word_bank: Arc<WordBank>,
    pub profiles: Arc<ProfileRepository>,
    pub matches: Arc<MatchRepository>,
    pub words: Arc<WordRepository>,
    pub teams: Arc<TeamRepository>,
    pub social: Arc<SocialRepository>,
    pub seasons: Arc<SeasonRepository>,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection, word_bank: WordBank) -> Result<Self> {
        let auth = if config.auth_dev_mode {
            warn!("Authentication is running in development mode");
            AuthService::new_dev_mode()
        } else {
            let secret = config
                .auth_jwt_secret
                .as_deref()
                .ok_or(ConfigError::MissingJwtSecret)?;
            AuthService::new(secret)
        };

        let connections = Arc::new(ConnectionManager::new());
        let word_bank = Arc::new(word_bank);
        let profiles = Arc::new(ProfileRepository::new(db.clone()));
        let matches = Arc::new(MatchRepository::new(db.clone()));
        let teams = Arc::new(TeamRepository::new(db.clone()));

        let battles = Arc::new(BattleManager::new(
            word_bank.clone(),
            profiles.clone(),
            matches.clone(),
            teams.clone(),
            connections.clone(),
            config.questions_per_battle,
            config.question_time_limit(),
        ));

        Ok(Self {
            ranked_queue: Arc::new(RankedQueue::new(config.ranked_match_window)),
            auth: Arc::new(auth),
            connections,
            battles,
            word_bank,
            profiles,
            matches,
            words: Arc::new(WordRepository::new(db.clone())),
            teams,
            social: Arc::new(SocialRepository::new(db.clone())),
            seasons: Arc::new(SeasonRepository::new(db)),
            config: Arc::new(config),
        })
    }
}

/// Import the word list into an empty database, then load every stored word.
pub async fn seed_and_load_words(words: &WordRepository, words_file: &str) -> Result<WordBank> {
    if words.count().await? == 0 {
        if Path::new(words_file).exists() {
            let bank = WordBank::from_file(words_file)?;
            let inserted = words
                .insert_words(bank.entries())
                .await
                .with_context(|| format!("Failed to import {}", words_file))?;
            info!("Seeded {} words from {}", inserted, words_file);
        } else {
            warn!("Word list {} not found; battles need words to start", words_file);
        }
    }

    let entries = words.find_words(&WordFilter::default(), None).await?;
    info!("Loaded {} words", entries.len());
    Ok(WordBank::from_entries(entries))
}
