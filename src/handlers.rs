pub mod auth;
pub mod health;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

use sea_orm::{DbErr, SqlErr};

/// True when the database rejected a write because a unique constraint
/// (composite primary key or unique column) already holds the value.
/// The toggle endpoints insert first and translate this into the 400
/// "already ..." client error instead of racing an existence check.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
