use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Stored avatar filename; `default.jpg` until the user uploads one.
    pub image_file: String,
    pub name: Option<String>,
    pub join_date: OffsetDateTime,
}

/// Non-empty fields of a profile edit. `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct ProfileDelta {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_file: Option<String>,
}

impl ProfileDelta {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.image_file.is_none()
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, image_file, name, join_date";

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn create(
    db: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Partial update: only the delta's present fields overwrite stored values.
/// Returns the updated row, or `None` when the user no longer exists.
pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    delta: ProfileDelta,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            username = COALESCE($3, username),
            email = COALESCE($4, email),
            image_file = COALESCE($5, image_file)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(delta.name)
    .bind(delta.username)
    .bind(delta.email)
    .bind(delta.image_file)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn update_password(
    db: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET password_hash = $2
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(password_hash)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_delta_changes_nothing() {
        assert!(ProfileDelta::default().is_empty());
        let delta = ProfileDelta {
            username: Some("bob".into()),
            ..Default::default()
        };
        assert!(!delta.is_empty());
    }
}
