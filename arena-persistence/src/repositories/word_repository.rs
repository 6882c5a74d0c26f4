use anyhow::Result;
use arena_core::WordFilter;
use arena_types::{Subject, WordEntry};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::OnConflict,
};
use tracing::{info, warn};

use crate::entities::{prelude::*, words};

/// Rows per insert statement, well below SQLite's bound parameter limit.
const INSERT_CHUNK: usize = 100;

pub struct WordRepository {
    db: DatabaseConnection,
}

fn model_to_entry(model: words::Model) -> Option<WordEntry> {
    let Some(subject) = Subject::parse(&model.subject) else {
        warn!("Word {} has unknown subject '{}'", model.id, model.subject);
        return None;
    };
    Some(WordEntry {
        id: model.id,
        word: model.word,
        meaning: model.meaning,
        phonetic: model.phonetic,
        topic: model.topic,
        grade: model.grade,
        subject,
    })
}

impl WordRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert words, silently keeping existing rows for the same word, subject and grade.
    /// Returns how many rows were new.
    pub async fn insert_words(&self, entries: &[WordEntry]) -> Result<u64> {
        let mut inserted = 0;
        for chunk in entries.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|entry| words::ActiveModel {
                id: Set(entry.id),
                word: Set(entry.word.clone()),
                meaning: Set(entry.meaning.clone()),
                phonetic: Set(entry.phonetic.clone()),
                topic: Set(entry.topic.clone()),
                grade: Set(entry.grade),
                subject: Set(entry.subject.as_str().to_string()),
            });

            inserted += Words::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        words::Column::Word,
                        words::Column::Subject,
                        words::Column::Grade,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await?;
        }

        if inserted > 0 {
            info!("Inserted {} new words", inserted);
        }
        Ok(inserted)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Words::find().count(&self.db).await?)
    }

    pub async fn find_words(
        &self,
        filter: &WordFilter,
        limit: Option<u64>,
    ) -> Result<Vec<WordEntry>> {
        let mut query = Words::find();
        if let Some(grade) = filter.grade {
            query = query.filter(words::Column::Grade.eq(grade));
        }
        if let Some(subject) = filter.subject {
            query = query.filter(words::Column::Subject.eq(subject.as_str()));
        }
        if let Some(topic) = &filter.topic {
            query = query.filter(words::Column::Topic.eq(topic.as_str()));
        }

        query = query
            .order_by_asc(words::Column::Grade)
            .order_by_asc(words::Column::Word);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let models = query.all(&self.db).await?;

        Ok(models.into_iter().filter_map(model_to_entry).collect())
    }
}
