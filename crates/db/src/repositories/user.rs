//! User lookups shared by the orchestrators.
//!
//! Operations are attributed to the acting user by username; soft-deleted
//! users resolve to nothing.

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::entities::users;

/// Finds an active (not soft-deleted) user by username.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_active_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .filter(users::Column::DeletedAt.is_null())
        .one(conn)
        .await
}
