use super::user;
use sea_orm::entity::prelude::*;

/// A directed subscription between two users: `follower` reads what
/// `following` publishes. Self-follows are rejected at the application
/// layer; the database only enforces pair uniqueness.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub follower_id: i32,
    #[sea_orm(primary_key)]
    pub following_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::FollowerId",
        to = "user::Column::Id"
    )]
    Follower,
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::FollowingId",
        to = "user::Column::Id"
    )]
    Following,
}

impl ActiveModelBehavior for ActiveModel {}
