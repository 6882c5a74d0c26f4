use sea_orm::entity::prelude::*;

/// Scores are kept in the packed legacy integer format so existing rows stay readable.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub status: String,
    pub player1_id: Uuid,
    pub player2_id: Option<Uuid>,
    pub player1_score: i64,
    pub player2_score: i64,
    pub winner_id: Option<Uuid>,
    /// JSON array snapshot of the words used.
    #[sea_orm(column_type = "Text")]
    pub words: String,
    pub created_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
