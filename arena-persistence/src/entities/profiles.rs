use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub display_name: String,
    pub grade: i32,
    pub xp: i32,
    pub level: i32,
    pub coins: i32,
    pub energy: i32,
    pub max_energy: i32,
    pub energy_updated_at: DateTimeWithTimeZone,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub free_wins: i32,
    pub free_matches: i32,
    pub words_studied: i32,
    pub best_win_streak: i32,
    pub rank_points: i32,
    pub rank_tier: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::team_members::Entity")]
    TeamMember,
}

impl Related<super::team_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
